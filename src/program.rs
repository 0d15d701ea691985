use std::fmt::{self, Display};
use std::str::FromStr;

use crate::cell::Value;
use crate::error::ConstructionError;
use crate::symbol::SymbolKey;

/// Most `CellAt` layers a single operand may have.
pub const MAX_OPERAND_DEPTH: usize = 64;

/// Instruction argument.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Operand {
    /// Constant. Can only be read.
    Immediate(Value),
    /// Memory cell at the address given by the inner operand. Readable and writable.
    CellAt(Box<Operand>),
    /// Slot bound to a declared symbol. Readable only; wrap in [`Operand::CellAt`] to reach
    /// the cell itself.
    SymbolAddress(SymbolKey),
}

impl Operand {
    pub fn imm(value: impl Into<Value>) -> Self {
        Operand::Immediate(value.into())
    }

    pub fn cell(addr: Operand) -> Self {
        Operand::CellAt(Box::new(addr))
    }

    /// Cell bound to `symbol`, ie. `CellAt(SymbolAddress(symbol))`.
    pub fn var(symbol: SymbolKey) -> Self {
        Operand::cell(Operand::SymbolAddress(symbol))
    }

    /// Whether the operand names a location that can be written to.
    pub fn is_lvalue(&self) -> bool {
        matches!(self, Operand::CellAt(_))
    }

    /// Number of `CellAt` layers wrapped around the innermost operand.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut operand = self;
        while let Operand::CellAt(inner) = operand {
            depth += 1;
            operand = inner;
        }
        depth
    }
}

/// Single statement.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Instruction {
    /// Reserve the next memory slot for `symbol`, initialized to `init`. Takes effect before the
    /// program starts running.
    Declare { symbol: SymbolKey, init: Value },
    /// Jump target.
    Label(SymbolKey),
    Jump(SymbolKey),
    /// Jump if the zero flag is set.
    JumpIfZero(SymbolKey),
    /// Jump if the sign flag is set.
    JumpIfSign(SymbolKey),
    Move(Operand, Operand),
    Add(Operand, Operand),
    Subtract(Operand, Operand),
    Increment(Operand),
    Decrement(Operand),
    And(Operand, Operand),
    Or(Operand, Operand),
    Not(Operand),
    /// Set flags from comparing two values without writing anything.
    Compare(Operand, Operand),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InstrKind {
    Declare,
    Label,
    Jump,
    JumpIfZero,
    JumpIfSign,
    Move,
    Add,
    Subtract,
    Increment,
    Decrement,
    And,
    Or,
    Not,
    Compare,
}

impl InstrKind {
    /// Kinds that can be written as a mnemonic. Labels use `name:` instead.
    pub const MNEMONICS: [InstrKind; 13] = [
        InstrKind::Declare,
        InstrKind::Jump,
        InstrKind::JumpIfZero,
        InstrKind::JumpIfSign,
        InstrKind::Move,
        InstrKind::Add,
        InstrKind::Subtract,
        InstrKind::Increment,
        InstrKind::Decrement,
        InstrKind::And,
        InstrKind::Or,
        InstrKind::Not,
        InstrKind::Compare,
    ];

    pub const fn mnemonic(self) -> &'static str {
        match self {
            InstrKind::Declare => "decl",
            InstrKind::Label => "label",
            InstrKind::Jump => "jmp",
            InstrKind::JumpIfZero => "jz",
            InstrKind::JumpIfSign => "js",
            InstrKind::Move => "mov",
            InstrKind::Add => "add",
            InstrKind::Subtract => "sub",
            InstrKind::Increment => "inc",
            InstrKind::Decrement => "dec",
            InstrKind::And => "and",
            InstrKind::Or => "or",
            InstrKind::Not => "not",
            InstrKind::Compare => "cmp",
        }
    }

    /// Number of value operands taken.
    pub const fn operand_count(self) -> usize {
        match self {
            InstrKind::Declare
            | InstrKind::Label
            | InstrKind::Jump
            | InstrKind::JumpIfZero
            | InstrKind::JumpIfSign => 0,
            InstrKind::Increment | InstrKind::Decrement | InstrKind::Not => 1,
            InstrKind::Move
            | InstrKind::Add
            | InstrKind::Subtract
            | InstrKind::And
            | InstrKind::Or
            | InstrKind::Compare => 2,
        }
    }
}

impl FromStr for InstrKind {
    type Err = ConstructionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InstrKind::MNEMONICS
            .into_iter()
            .find(|kind| kind.mnemonic().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConstructionError::UnknownInstruction {
                mnemonic: s.to_owned(),
            })
    }
}

impl Instruction {
    pub fn kind(&self) -> InstrKind {
        match self {
            Instruction::Declare { .. } => InstrKind::Declare,
            Instruction::Label(_) => InstrKind::Label,
            Instruction::Jump(_) => InstrKind::Jump,
            Instruction::JumpIfZero(_) => InstrKind::JumpIfZero,
            Instruction::JumpIfSign(_) => InstrKind::JumpIfSign,
            Instruction::Move(..) => InstrKind::Move,
            Instruction::Add(..) => InstrKind::Add,
            Instruction::Subtract(..) => InstrKind::Subtract,
            Instruction::Increment(_) => InstrKind::Increment,
            Instruction::Decrement(_) => InstrKind::Decrement,
            Instruction::And(..) => InstrKind::And,
            Instruction::Or(..) => InstrKind::Or,
            Instruction::Not(_) => InstrKind::Not,
            Instruction::Compare(..) => InstrKind::Compare,
        }
    }

    /// Operand written to by this instruction.
    pub fn destination(&self) -> Option<&Operand> {
        match self {
            Instruction::Move(dst, _)
            | Instruction::Add(dst, _)
            | Instruction::Subtract(dst, _)
            | Instruction::And(dst, _)
            | Instruction::Or(dst, _)
            | Instruction::Increment(dst)
            | Instruction::Decrement(dst)
            | Instruction::Not(dst) => Some(dst),
            _ => None,
        }
    }

    /// Every value operand, destination first.
    pub fn operands(&self) -> impl Iterator<Item = &Operand> {
        let (lhs, rhs) = match self {
            Instruction::Move(lhs, rhs)
            | Instruction::Add(lhs, rhs)
            | Instruction::Subtract(lhs, rhs)
            | Instruction::And(lhs, rhs)
            | Instruction::Or(lhs, rhs)
            | Instruction::Compare(lhs, rhs) => (Some(lhs), Some(rhs)),
            Instruction::Increment(arg) | Instruction::Decrement(arg) | Instruction::Not(arg) => {
                (Some(arg), None)
            }
            Instruction::Declare { .. }
            | Instruction::Label(_)
            | Instruction::Jump(_)
            | Instruction::JumpIfZero(_)
            | Instruction::JumpIfSign(_) => (None, None),
        };
        lhs.into_iter().chain(rhs)
    }
}

/// Validated, immutable list of instructions.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Program {
    instrs: Vec<Instruction>,
}

impl Program {
    /// Check that every destination operand is writable and no operand is nested deeper than
    /// [`MAX_OPERAND_DEPTH`].
    pub fn new(instrs: Vec<Instruction>) -> Result<Self, ConstructionError> {
        for (index, instr) in instrs.iter().enumerate() {
            if let Some(depth) = instr
                .operands()
                .map(Operand::depth)
                .find(|depth| *depth > MAX_OPERAND_DEPTH)
            {
                return Err(ConstructionError::NestedTooDeep { index, depth });
            }
            match instr.destination() {
                Some(dst) if !dst.is_lvalue() => {
                    return Err(ConstructionError::NotAssignable {
                        index,
                        operand: dst.to_string(),
                    })
                }
                _ => (),
            }
        }
        Ok(Program { instrs })
    }

    pub fn get(&self, idx: usize) -> Option<&Instruction> {
        self.instrs.get(idx)
    }

    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instrs.iter()
    }

    /// Declared symbols in declaration order. This is also slot order for programs that run.
    pub fn declarations(&self) -> impl Iterator<Item = SymbolKey> + '_ {
        self.instrs.iter().filter_map(|instr| match instr {
            Instruction::Declare { symbol, .. } => Some(*symbol),
            _ => None,
        })
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl TryFrom<Vec<Instruction>> for Program {
    type Error = ConstructionError;

    fn try_from(instrs: Vec<Instruction>) -> Result<Self, Self::Error> {
        Program::new(instrs)
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Immediate(value) => write!(f, "#{}", value),
            Operand::CellAt(addr) => write!(f, "[{}]", addr),
            Operand::SymbolAddress(symbol) => write!(f, "{}", symbol),
        }
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.kind().mnemonic();
        match self {
            Instruction::Declare { symbol, init } => write!(f, "{} {} #{}", name, symbol, init),
            Instruction::Label(label) => write!(f, "{}:", label),
            Instruction::Jump(label)
            | Instruction::JumpIfZero(label)
            | Instruction::JumpIfSign(label) => write!(f, "{} {}", name, label),
            Instruction::Increment(arg) | Instruction::Decrement(arg) | Instruction::Not(arg) => {
                write!(f, "{} {}", name, arg)
            }
            Instruction::Move(lhs, rhs)
            | Instruction::Add(lhs, rhs)
            | Instruction::Subtract(lhs, rhs)
            | Instruction::And(lhs, rhs)
            | Instruction::Or(lhs, rhs)
            | Instruction::Compare(lhs, rhs) => write!(f, "{} {}, {}", name, lhs, rhs),
        }
    }
}

impl Display for Program {
    /// Canonical source form: labels flush left, everything else indented.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instr in self {
            match instr {
                Instruction::Label(_) => writeln!(f, "{}", instr)?,
                _ => writeln!(f, "    {}", instr)?,
            }
        }
        Ok(())
    }
}
