use std::cell::RefCell;
use std::str::Chars;

use colored::Colorize;

use crate::cell::{CellType, Image, Value};
use crate::runtime::RunStats;
use crate::symbol::SymbolKey;

/// Where run results are printed.
#[derive(Clone, Copy, Debug)]
pub enum Output {
    /// Results, on stdout
    Normal,
    /// Status and summaries, on stderr. Dropped entirely if `--minimal`.
    Info,
}

struct Decolored<'a> {
    chars: Chars<'a>,
}

impl Output {
    thread_local! {
        static IS_MINIMAL: RefCell<bool> = const { RefCell::new(false) };
    }

    pub fn set_minimal(new_value: bool) -> bool {
        Self::IS_MINIMAL.with(|value| value.replace(new_value))
    }
    pub fn is_minimal() -> bool {
        Self::IS_MINIMAL.with(|value| *value.borrow())
    }

    pub fn print_str(&self, string: &str) {
        match (self, Self::is_minimal()) {
            (Self::Normal, false) => print!("{}", string),
            // Always remove color if `--minimal`
            (Self::Normal, true) => print_colorless(string),
            (Self::Info, false) => eprint!("{}", string),
            (Self::Info, true) => (),
        }
    }

    /// Print final memory, one cell per line. `symbols[i]` is the symbol bound to slot `i`.
    pub fn print_image(&self, image: &Image, symbols: &[SymbolKey]) {
        if Self::is_minimal() {
            for value in image.cells() {
                self.print_str(&format!("{}\n", value));
            }
            return;
        }

        let ty = image.cell_type();
        let hex_width = ty.bits() as usize / 4;
        // slot, hex, decimal and symbol columns with their separators
        let inner = 7 + (hex_width + 4) + 20 + 8;
        self.print_str(&format!("\x1b[2m┌{}┐\x1b[0m\n", "─".repeat(inner)));
        self.print_str(&format!(
            "\x1b[2m│\x1b[0m \x1b[3m{:>4}  {:<w$}  {:>20}  {:<6}\x1b[0m\x1b[2m│\x1b[0m\n",
            "slot",
            "hex",
            ty.name(),
            "symbol",
            w = hex_width + 2,
        ));
        for (slot, value) in image.cells().iter().enumerate() {
            let symbol = symbols
                .get(slot)
                .map(|symbol| symbol.to_string())
                .unwrap_or_default();
            self.print_str("\x1b[2m│\x1b[0m ");
            self.print_str(&format!("\x1b[1m{:>4}\x1b[0m  ", slot));
            self.print_integer(ty, *value);
            self.print_str(&format!("  {:<6}", symbol.cyan()));
            self.print_str("\x1b[2m│\x1b[0m\n");
        }
        self.print_str(&format!("\x1b[2m└{}┘\x1b[0m\n", "─".repeat(inner)));
    }

    pub fn print_integer(&self, ty: CellType, value: Value) {
        if Self::is_minimal() {
            self.print_str(&format!("{}", value));
            return;
        }
        let width = ty.bits() as usize / 4;
        self.print_str(&format!("0x{:0w$x}  ", ty.raw_bits(value), w = width));
        self.print_str(&format!("{:>20}", value));
    }

    pub fn print_stats(&self, stats: &RunStats) {
        self.print_str(&format!(
            "{:>12} {} steps, {} jumps\n",
            "Executed".cyan(),
            stats.steps,
            stats.jumps
        ));
    }
}

impl<'a> Decolored<'a> {
    pub fn new(string: &'a str) -> Self {
        Self {
            chars: string.chars(),
        }
    }
}

impl<'a> Iterator for Decolored<'a> {
    type Item = char;
    fn next(&mut self) -> Option<Self::Item> {
        while let Some(ch) = self.chars.next() {
            // Skip everything between '\x1b' and 'm' (inclusive)
            if ch == '\x1b' {
                while self.chars.next().is_some_and(|ch| ch != 'm') {}
                continue;
            }
            return Some(ch);
        }
        None
    }
}

fn print_colorless(string: &str) {
    print!("{}", Decolored::new(string).collect::<String>());
}
