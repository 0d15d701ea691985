//! Interpreter for a small assembly language over a flat memory of integer cells.
//!
//! Programs are lists of [`Instruction`]s, either built directly or assembled from text with
//! [`assemble`]. A run assigns memory slots to declarations, executes the program from the top
//! and returns the final contents of memory.

// Machine
mod cell;
pub use cell::{Cell, CellType, Image, Value};
mod symbol;
pub use symbol::{SymbolKey, SymbolTable, MAX_IDENT_LEN};
mod program;
pub use program::{InstrKind, Instruction, Operand, Program, MAX_OPERAND_DEPTH};
mod state;
pub use state::{Flags, MachineState};
mod runtime;
pub use runtime::{
    boot_as, run, Computer, Config, RunStats, DEFAULT_CAPACITY, DEFAULT_STEP_LIMIT,
};
mod error;
pub use error::{ConstructionError, IdentFault, RuntimeError};

// Parsing
mod lexer;
mod parser;
mod span;
pub use parser::AsmParser;

mod output;
pub use output::Output;

pub mod env;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 8;

/// Assemble source text, attaching it to any diagnostic.
pub fn assemble(src: &str) -> miette::Result<Program> {
    AsmParser::new(src)
        .and_then(AsmParser::parse)
        .map_err(|report| report.with_source_code(src.to_owned()))
}
