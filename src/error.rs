use std::{error::Error, fmt};

use crate::cell::Value;
use crate::program::MAX_OPERAND_DEPTH;
use crate::symbol::{SymbolKey, MAX_IDENT_LEN};

/// Error building a program. Detected once, before anything runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConstructionError {
    InvalidIdentifier {
        ident: String,
        fault: IdentFault,
    },
    UnknownInstruction {
        mnemonic: String,
    },
    /// Destination operand can't be written to.
    NotAssignable {
        index: usize,
        operand: String,
    },
    NestedTooDeep {
        index: usize,
        depth: usize,
    },
}

/// Reason an identifier was rejected by the encoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentFault {
    Empty,
    TooLong,
    BadChar(char),
}

/// Error aborting a run. No memory is returned alongside it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuntimeError {
    DuplicateDeclaration {
        symbol: SymbolKey,
    },
    TooManyDeclarations {
        capacity: usize,
    },
    UndeclaredSymbol {
        symbol: SymbolKey,
    },
    AddressOutOfRange {
        address: Value,
        capacity: usize,
    },
    UndefinedLabel {
        label: SymbolKey,
    },
    ExecutionLimitExceeded {
        limit: u64,
    },
}

impl RuntimeError {
    /// Short diagnostic code, in the same namespace style as the parser's.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateDeclaration { .. } => "run::duplicate_decl",
            Self::TooManyDeclarations { .. } => "run::too_many_decls",
            Self::UndeclaredSymbol { .. } => "run::undeclared",
            Self::AddressOutOfRange { .. } => "run::out_of_range",
            Self::UndefinedLabel { .. } => "run::undefined_label",
            Self::ExecutionLimitExceeded { .. } => "run::step_limit",
        }
    }

    /// What the caller can change to make the run succeed, if anything.
    pub fn help(&self) -> Option<&'static str> {
        match self {
            Self::TooManyDeclarations { .. } | Self::AddressOutOfRange { .. } => {
                Some("try running with more memory cells (`--cells`)")
            }
            Self::ExecutionLimitExceeded { .. } => {
                Some("the program may loop forever; otherwise raise `--step-limit`")
            }
            Self::UndeclaredSymbol { .. } => Some("declare it with `decl NAME #VALUE`"),
            Self::UndefinedLabel { .. } => Some("define the label with `NAME:`"),
            Self::DuplicateDeclaration { .. } => None,
        }
    }
}

impl Error for ConstructionError {}
impl Error for RuntimeError {}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidIdentifier { ident, fault } => {
                write!(f, "Invalid identifier `{}`: {}", ident, fault)
            }
            Self::UnknownInstruction { mnemonic } => {
                write!(f, "Unknown instruction `{}`", mnemonic)
            }
            Self::NotAssignable { index, operand } => write!(
                f,
                "Instruction {} writes to `{}`, which is not a memory cell",
                index, operand
            ),
            Self::NestedTooDeep { index, depth } => write!(
                f,
                "Instruction {} nests cells {} deep, more than the limit of {}",
                index, depth, MAX_OPERAND_DEPTH
            ),
        }
    }
}

impl fmt::Display for IdentFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("identifiers cannot be empty"),
            Self::TooLong => write!(f, "longer than {} characters", MAX_IDENT_LEN),
            Self::BadChar(ch) => write!(f, "`{}` is not a letter or digit", ch.escape_debug()),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateDeclaration { symbol } => {
                write!(f, "Symbol `{}` is declared more than once", symbol)
            }
            Self::TooManyDeclarations { capacity } => write!(
                f,
                "Too many declarations for a memory of {} cells",
                capacity
            ),
            Self::UndeclaredSymbol { symbol } => {
                write!(f, "Symbol `{}` was never declared", symbol)
            }
            Self::AddressOutOfRange { address, capacity } => write!(
                f,
                "Address {} is outside of memory (0 to {})",
                address,
                capacity.saturating_sub(1)
            ),
            Self::UndefinedLabel { label } => {
                write!(f, "Jump to label `{}`, which does not exist", label)
            }
            Self::ExecutionLimitExceeded { limit } => {
                write!(f, "Execution did not finish within {} steps", limit)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_symbol() {
        let label = SymbolKey::encode("stop").unwrap();
        let err = RuntimeError::UndefinedLabel { label };
        assert_eq!(
            err.to_string(),
            "Jump to label `stop`, which does not exist"
        );
        assert_eq!(err.code(), "run::undefined_label");
    }

    #[test]
    fn identifier_faults() {
        let err = SymbolKey::encode("a-b").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid identifier `a-b`: `-` is not a letter or digit"
        );
        let err = SymbolKey::encode("toolong").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid identifier `toolong`: longer than 6 characters"
        );
    }

    #[test]
    fn out_of_range_message() {
        let err = RuntimeError::AddressOutOfRange {
            address: -1,
            capacity: 4,
        };
        assert_eq!(err.to_string(), "Address -1 is outside of memory (0 to 3)");
        assert!(err.help().is_some());
    }
}
