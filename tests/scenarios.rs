use cellasm::{
    assemble, run, Computer, Config, Instruction, Operand, Program, RuntimeError, SymbolKey,
};
use proptest::prelude::*;

fn key(s: &str) -> SymbolKey {
    SymbolKey::encode(s).unwrap()
}

fn program(instrs: Vec<Instruction>) -> Program {
    Program::new(instrs).unwrap()
}

#[test]
fn moves_immediate_into_cell() {
    let prog = program(vec![Instruction::Move(
        Operand::cell(Operand::imm(0)),
        Operand::imm(42),
    )]);
    assert_eq!(run::<i32>(Config::new(1), &prog), Ok(vec![42]));
}

#[test]
fn jump_skips_instructions() {
    let prog = program(vec![
        Instruction::Increment(Operand::cell(Operand::imm(0))),
        Instruction::Jump(key("stop")),
        Instruction::Increment(Operand::cell(Operand::imm(0))),
        Instruction::Label(key("stop")),
    ]);
    assert_eq!(run::<i32>(Config::new(1), &prog), Ok(vec![1]));
}

fn multiply() -> Vec<Instruction> {
    vec![
        Instruction::Declare {
            symbol: key("a"),
            init: 5,
        },
        Instruction::Declare {
            symbol: key("b"),
            init: 10,
        },
        Instruction::Declare {
            symbol: key("c"),
            init: 0,
        },
        Instruction::Label(key("loop")),
        Instruction::Add(Operand::var(key("c")), Operand::var(key("b"))),
        Instruction::Decrement(Operand::var(key("a"))),
        Instruction::JumpIfZero(key("stop")),
        Instruction::Jump(key("loop")),
        Instruction::Label(key("stop")),
    ]
}

#[test]
fn multiplies_by_repeated_addition() {
    let prog = program(multiply());
    assert_eq!(run::<i32>(Config::new(4), &prog), Ok(vec![0, 10, 50, 0]));
    assert_eq!(run::<u8>(Config::new(4), &prog), Ok(vec![0, 10, 50, 0]));
}

#[test]
fn assembled_source_matches_built_program() {
    let src = include_str!("files/multiply.asm");
    assert_eq!(assemble(src).unwrap(), program(multiply()));
}

#[test]
fn infinite_loop_hits_step_limit() {
    let prog = program(vec![
        Instruction::Label(key("top")),
        Instruction::Jump(key("top")),
    ]);
    let config = Config::new(1).with_step_limit(1000);
    assert_eq!(
        run::<i32>(config, &prog),
        Err(RuntimeError::ExecutionLimitExceeded { limit: 1000 })
    );
}

#[test]
fn empty_program_leaves_memory_zeroed() {
    assert_eq!(run::<i64>(Config::new(1), &Program::default()), Ok(vec![0]));
    assert_eq!(run::<i64>(Config::new(0), &Program::default()), Ok(vec![]));
}

#[test]
fn declarations_are_position_independent() {
    let body = vec![
        Instruction::Add(Operand::var(key("x")), Operand::var(key("y"))),
        Instruction::Not(Operand::var(key("y"))),
    ];
    let decls = vec![
        Instruction::Declare {
            symbol: key("x"),
            init: 3,
        },
        Instruction::Declare {
            symbol: key("y"),
            init: 4,
        },
    ];

    let first = program(decls.iter().chain(&body).cloned().collect());
    let last = program(body.iter().chain(&decls).cloned().collect());
    let expected = Ok(vec![7, !4, 0]);
    assert_eq!(run::<i32>(Config::new(3), &first), expected);
    assert_eq!(run::<i32>(Config::new(3), &last), expected);
}

#[test]
fn jump_to_missing_label_fails() {
    let prog = program(vec![
        Instruction::Increment(Operand::cell(Operand::imm(0))),
        Instruction::Jump(key("gone")),
    ]);
    assert_eq!(
        run::<i32>(Config::new(1), &prog),
        Err(RuntimeError::UndefinedLabel { label: key("gone") })
    );
}

#[test]
fn hex_shaped_names_are_symbols() {
    let prog = assemble("decl xa #3\nxa:\ninc [xa]\njmp done\ndone:").unwrap();
    assert_eq!(run::<i32>(Config::new(1), &prog), Ok(vec![4]));

    let prog = assemble("decl x1 #2\nx1:\ndec [x1]\njz xff\njmp x1\nxff:").unwrap();
    assert_eq!(run::<i32>(Config::new(1), &prog), Ok(vec![0]));
}

#[test]
fn hex_literals() {
    let prog = assemble("mov [#0] #x1F\nadd [#0] #-x0f").unwrap();
    assert_eq!(run::<i32>(Config::new(1), &prog), Ok(vec![16]));
}

#[test]
fn computer_is_reusable() {
    let computer = Computer::<i16>::new(Config::new(4));
    let prog = program(multiply());
    let (mem, stats) = computer.boot_with_stats(&prog).unwrap();
    assert_eq!(mem, vec![0, 10, 50, 0]);
    assert_eq!(computer.boot(&prog).unwrap(), mem);
    assert_eq!(stats.jumps, 5);
}

proptest! {
    #[test]
    fn runs_are_deterministic(a in -1000i64..1000, b in 0i64..50) {
        let src = format!(
            "decl a #{a}\ndecl b #{b}\ndecl c #0\nloop: cmp [b] #0\njz done\nadd [c] [a]\ndec [b]\njmp loop\ndone:"
        );
        let prog = assemble(&src).unwrap();
        let first = run::<i64>(Config::new(3), &prog);
        let second = run::<i64>(Config::new(3), &prog);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first, Ok(vec![a, 0, a * b]));
    }
}
