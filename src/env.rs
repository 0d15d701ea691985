use std::{cell::RefCell, ffi::OsStr};

use log::warn;

#[derive(Clone, Copy)]
struct Env {
    step_limit: Option<u64>,
}

thread_local! {
    /// Must only be mutated within `set_env`
    static ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

/// Read environment overrides. Call once, before any getter.
pub fn init() {
    let value = Env {
        step_limit: var_parsed("CELLASM_STEP_LIMIT"),
    };
    set_env(value);
}

/// Default step ceiling set through `CELLASM_STEP_LIMIT`.
pub fn step_limit() -> Option<u64> {
    with_env(|env| env.step_limit)
}

fn set_env(value: Env) {
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        assert!(
            env.is_none(),
            "tried to initialize environment state multiple times"
        );
        *env = Some(value);
    });
}

fn with_env<F, R>(callback: F) -> R
where
    F: Fn(&Env) -> R,
{
    ENV.with(|env| {
        let env = env.borrow();
        let env = env.unwrap_or_else(|| {
            panic!("tried to access environment state before initialization");
        });
        callback(&env)
    })
}

fn var_parsed(name: impl AsRef<OsStr>) -> Option<u64> {
    let name = name.as_ref();
    let value = std::env::var(name).ok()?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("ignoring {}={:?}: {}", name.to_string_lossy(), value, e);
            None
        }
    }
}
