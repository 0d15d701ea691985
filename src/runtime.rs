use std::marker::PhantomData;

use log::{debug, trace};

use crate::cell::{Cell, CellType, Image};
use crate::error::RuntimeError;
use crate::program::{Instruction, Operand, Program};
use crate::state::{Flags, MachineState};
use crate::symbol::SymbolKey;

/// Memory cells used when none are requested.
pub const DEFAULT_CAPACITY: usize = 16;

/// Executed instructions allowed per run when no limit is requested.
pub const DEFAULT_STEP_LIMIT: u64 = 1_000_000;

/// Per-run machine configuration. The cell type is picked separately, either as the type
/// parameter of [`Computer`] or as a [`CellType`] for [`boot_as`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Config {
    /// Number of memory cells.
    pub capacity: usize,
    /// Most instructions a run may execute before it is aborted.
    pub step_limit: u64,
}

impl Config {
    pub fn new(capacity: usize) -> Self {
        Config {
            capacity,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    pub fn with_step_limit(self, step_limit: u64) -> Self {
        Config { step_limit, ..self }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new(DEFAULT_CAPACITY)
    }
}

/// Counters collected over a successful run.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct RunStats {
    /// Instructions executed, not counting those skipped while searching for a label.
    pub steps: u64,
    /// Jumps taken.
    pub jumps: u64,
}

/// Machine over cells of type `C`. Every boot starts from fresh state.
#[derive(Clone, Copy, Debug)]
pub struct Computer<C: Cell> {
    config: Config,
    _cell: PhantomData<C>,
}

impl<C: Cell> Computer<C> {
    pub fn new(config: Config) -> Self {
        Computer {
            config,
            _cell: PhantomData,
        }
    }

    pub fn config(&self) -> Config {
        self.config
    }

    /// Run `program` to completion and return final memory.
    pub fn boot(&self, program: &Program) -> Result<Vec<C>, RuntimeError> {
        self.boot_with_stats(program).map(|(mem, _)| mem)
    }

    pub fn boot_with_stats(&self, program: &Program) -> Result<(Vec<C>, RunStats), RuntimeError> {
        let mut run = RunState::<C>::try_from(program, self.config)?;
        run.run()?;
        let stats = run.stats();
        Ok((run.state.into_memory(), stats))
    }
}

/// Run `program` on a freshly configured machine.
pub fn run<C: Cell>(config: Config, program: &Program) -> Result<Vec<C>, RuntimeError> {
    Computer::<C>::new(config).boot(program)
}

/// Run with a cell type chosen at runtime.
pub fn boot_as(
    cell_type: CellType,
    config: Config,
    program: &Program,
) -> Result<(Image, RunStats), RuntimeError> {
    fn boot<C: Cell>(config: Config, program: &Program) -> Result<(Image, RunStats), RuntimeError> {
        let (mem, stats) = Computer::<C>::new(config).boot_with_stats(program)?;
        Ok((Image::from_cells(&mem), stats))
    }

    match cell_type {
        CellType::I8 => boot::<i8>(config, program),
        CellType::I16 => boot::<i16>(config, program),
        CellType::I32 => boot::<i32>(config, program),
        CellType::I64 => boot::<i64>(config, program),
        CellType::U8 => boot::<u8>(config, program),
        CellType::U16 => boot::<u16>(config, program),
        CellType::U32 => boot::<u32>(config, program),
        CellType::U64 => boot::<u64>(config, program),
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Mode {
    Executing,
    /// Skipping everything up to the matching label.
    Searching(SymbolKey),
}

/// Represents complete program state during a run.
struct RunState<'p, C: Cell> {
    program: &'p Program,
    state: MachineState<C>,
    /// Index of the next instruction
    pc: usize,
    mode: Mode,
    steps: u64,
    step_limit: u64,
    jumps: u64,
}

impl<'p, C: Cell> RunState<'p, C> {
    fn try_from(program: &'p Program, config: Config) -> Result<Self, RuntimeError> {
        let state = MachineState::declare(program, config.capacity)?;
        Ok(RunState {
            program,
            state,
            pc: 0,
            mode: Mode::Executing,
            steps: 0,
            step_limit: config.step_limit,
            jumps: 0,
        })
    }

    fn stats(&self) -> RunStats {
        RunStats {
            steps: self.steps,
            jumps: self.jumps,
        }
    }

    /// Run until the end of the program is reached while executing.
    fn run(&mut self) -> Result<(), RuntimeError> {
        debug!(
            "running {} instructions on {} {} cells",
            self.program.len(),
            self.state.capacity(),
            C::TYPE
        );
        let program = self.program;
        while let Some(instr) = program.get(self.pc) {
            // PC incremented before instruction is performed
            self.pc += 1;
            match self.mode {
                Mode::Searching(target) => {
                    if *instr == Instruction::Label(target) {
                        trace!("found `{target}` at {}", self.pc - 1);
                        self.mode = Mode::Executing;
                    }
                }
                Mode::Executing => {
                    self.tick()?;
                    trace!("{:>5}  {instr}", self.pc - 1);
                    self.execute(instr)?;
                }
            }
        }

        match self.mode {
            Mode::Executing => {
                debug!(
                    "finished after {} steps and {} jumps",
                    self.steps, self.jumps
                );
                Ok(())
            }
            Mode::Searching(label) => Err(RuntimeError::UndefinedLabel { label }),
        }
    }

    fn tick(&mut self) -> Result<(), RuntimeError> {
        if self.steps == self.step_limit {
            debug!("step limit of {} reached at {}", self.step_limit, self.pc - 1);
            return Err(RuntimeError::ExecutionLimitExceeded {
                limit: self.step_limit,
            });
        }
        self.steps += 1;
        Ok(())
    }

    fn execute(&mut self, instr: &Instruction) -> Result<(), RuntimeError> {
        match instr {
            // Both took effect before the run started
            Instruction::Declare { .. } | Instruction::Label(_) => Ok(()),
            Instruction::Jump(label) => {
                self.jump(*label);
                Ok(())
            }
            Instruction::JumpIfZero(label) => {
                if self.state.flags().zf {
                    self.jump(*label);
                }
                Ok(())
            }
            Instruction::JumpIfSign(label) => {
                if self.state.flags().sf {
                    self.jump(*label);
                }
                Ok(())
            }
            Instruction::Move(dst, src) => self.mov(dst, src),
            Instruction::Add(dst, src) => self.arith(dst, src, C::wrapping_add),
            Instruction::Subtract(dst, src) => self.arith(dst, src, C::wrapping_sub),
            Instruction::Increment(dst) => self.arith(dst, &Operand::Immediate(1), C::wrapping_add),
            Instruction::Decrement(dst) => self.arith(dst, &Operand::Immediate(1), C::wrapping_sub),
            Instruction::And(dst, src) => self.bitwise(dst, src, |lhs, rhs| lhs & rhs),
            Instruction::Or(dst, src) => self.bitwise(dst, src, |lhs, rhs| lhs | rhs),
            Instruction::Not(dst) => self.not(dst),
            Instruction::Compare(lhs, rhs) => self.cmp(lhs, rhs),
        }
    }

    /// Restart from the top of the program, looking for `label`.
    fn jump(&mut self, label: SymbolKey) {
        debug!("jump to `{label}` from {}", self.pc - 1);
        self.jumps += 1;
        self.mode = Mode::Searching(label);
        self.pc = 0;
    }

    fn mov(&mut self, dst: &Operand, src: &Operand) -> Result<(), RuntimeError> {
        let val = C::wrap(self.state.rvalue(src)?);
        let slot = self.state.place(dst)?;
        self.state.store(slot, val);
        Ok(())
    }

    /// Add and subtract. Sets both flags.
    fn arith(
        &mut self,
        dst: &Operand,
        src: &Operand,
        op: fn(C, C) -> C,
    ) -> Result<(), RuntimeError> {
        let rhs = C::wrap(self.state.rvalue(src)?);
        let (slot, lhs) = self.state.lvalue(dst)?;
        let res = op(lhs, rhs);
        self.state.store(slot, res);
        self.state.set_flags(Flags {
            zf: res.is_zero(),
            sf: res.is_negative(),
        });
        Ok(())
    }

    /// Bitwise and/or. Sets only the zero flag.
    fn bitwise(
        &mut self,
        dst: &Operand,
        src: &Operand,
        op: fn(C, C) -> C,
    ) -> Result<(), RuntimeError> {
        let rhs = C::wrap(self.state.rvalue(src)?);
        let (slot, lhs) = self.state.lvalue(dst)?;
        let res = op(lhs, rhs);
        self.state.store(slot, res);
        self.set_zero_flag(res);
        Ok(())
    }

    fn not(&mut self, dst: &Operand) -> Result<(), RuntimeError> {
        let (slot, val) = self.state.lvalue(dst)?;
        let res = !val;
        self.state.store(slot, res);
        self.set_zero_flag(res);
        Ok(())
    }

    /// Sign flag means `lhs < rhs`, which is not the same as `lhs - rhs` being negative once
    /// the subtraction overflows.
    fn cmp(&mut self, lhs: &Operand, rhs: &Operand) -> Result<(), RuntimeError> {
        let lhs = self.state.rvalue(lhs)?;
        let rhs = self.state.rvalue(rhs)?;
        self.state.set_flags(Flags {
            zf: lhs == rhs,
            sf: lhs < rhs,
        });
        Ok(())
    }

    fn set_zero_flag(&mut self, val: C) {
        let flags = self.state.flags();
        self.state.set_flags(Flags {
            zf: val.is_zero(),
            ..flags
        });
    }
}
