use log::debug;

use crate::cell::{Cell, Value};
use crate::error::RuntimeError;
use crate::program::{Instruction, Operand, Program};
use crate::symbol::SymbolTable;

/// Condition flags. Written by arithmetic, bitwise and compare instructions; read by conditional
/// jumps.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct Flags {
    /// Zero flag
    pub zf: bool,
    /// Sign flag
    pub sf: bool,
}

/// Memory, flags and symbol bindings of a single run.
pub struct MachineState<C: Cell> {
    mem: Box<[C]>,
    flags: Flags,
    symbols: SymbolTable,
}

impl<C: Cell> MachineState<C> {
    /// Zeroed memory of `capacity` cells with nothing declared.
    pub fn new(capacity: usize) -> Self {
        MachineState {
            mem: vec![C::default(); capacity].into_boxed_slice(),
            flags: Flags::default(),
            symbols: SymbolTable::new(),
        }
    }

    /// Bind every declaration in `program` to a slot and write its initial value.
    ///
    /// Slots are assigned in the order declarations appear, ignoring every other kind of
    /// instruction, so where declarations sit relative to the rest of the program doesn't
    /// matter.
    pub fn declare(program: &Program, capacity: usize) -> Result<Self, RuntimeError> {
        let mut state = MachineState::new(capacity);
        for instr in program {
            let Instruction::Declare { symbol, init } = *instr else {
                continue;
            };
            // Duplicates are reported before running out of room
            if state.symbols.len() == capacity && state.symbols.slot(symbol).is_none() {
                return Err(RuntimeError::TooManyDeclarations { capacity });
            }
            let slot = state
                .symbols
                .bind(symbol)
                .ok_or(RuntimeError::DuplicateDeclaration { symbol })?;
            state.mem[slot] = C::wrap(init);
            debug!("declared `{symbol}` at slot {slot} = {}", state.mem[slot]);
        }
        Ok(state)
    }

    pub fn capacity(&self) -> usize {
        self.mem.len()
    }

    pub fn memory(&self) -> &[C] {
        &self.mem
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Consume the state, keeping only memory.
    pub fn into_memory(self) -> Vec<C> {
        self.mem.into_vec()
    }

    pub(crate) fn set_flags(&mut self, flags: Flags) {
        self.flags = flags;
    }

    /// Value an operand reads as.
    pub fn rvalue(&self, operand: &Operand) -> Result<Value, RuntimeError> {
        match operand {
            Operand::Immediate(value) => Ok(*value),
            Operand::CellAt(addr) => {
                let slot = self.address(addr)?;
                Ok(self.mem[slot].value())
            }
            Operand::SymbolAddress(symbol) => self
                .symbols
                .slot(*symbol)
                .map(|slot| slot as Value)
                .ok_or(RuntimeError::UndeclaredSymbol { symbol: *symbol }),
        }
    }

    /// Slot of the cell an operand refers to.
    ///
    /// # Panics
    ///
    /// If the operand isn't a [`Operand::CellAt`]. [`Program`] rejects these at construction.
    pub(crate) fn place(&self, operand: &Operand) -> Result<usize, RuntimeError> {
        match operand {
            Operand::CellAt(addr) => self.address(addr),
            other => unreachable!("`{other}` used as a destination"),
        }
    }

    /// Current contents of the cell an operand refers to, along with its slot.
    pub(crate) fn lvalue(&self, operand: &Operand) -> Result<(usize, C), RuntimeError> {
        let slot = self.place(operand)?;
        Ok((slot, self.mem[slot]))
    }

    pub(crate) fn store(&mut self, slot: usize, value: C) {
        self.mem[slot] = value;
    }

    /// Read `addr` and check it points into memory.
    fn address(&self, addr: &Operand) -> Result<usize, RuntimeError> {
        let address = self.rvalue(addr)?;
        usize::try_from(address)
            .ok()
            .filter(|slot| *slot < self.capacity())
            .ok_or(RuntimeError::AddressOutOfRange {
                address,
                capacity: self.capacity(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolKey;

    fn key(s: &str) -> SymbolKey {
        SymbolKey::encode(s).unwrap()
    }

    fn decl(s: &str, init: Value) -> Instruction {
        Instruction::Declare {
            symbol: key(s),
            init,
        }
    }

    fn program(instrs: Vec<Instruction>) -> Program {
        Program::new(instrs).unwrap()
    }

    #[test]
    fn memory_starts_zeroed() {
        let state = MachineState::<i16>::declare(&Program::default(), 3).unwrap();
        assert_eq!(state.memory(), &[0, 0, 0]);
        assert_eq!(state.flags(), Flags::default());
    }

    #[test]
    fn declarations_take_slots_in_order() {
        let prog = program(vec![
            Instruction::Increment(Operand::cell(Operand::imm(3))),
            decl("b", 7),
            Instruction::Label(key("x")),
            decl("a", -2),
        ]);
        let state = MachineState::<i32>::declare(&prog, 4).unwrap();
        assert_eq!(state.memory(), &[7, -2, 0, 0]);
        assert_eq!(state.symbols().slot(key("b")), Some(0));
        assert_eq!(state.symbols().slot(key("a")), Some(1));
    }

    #[test]
    fn initializers_wrap_to_cell_width() {
        let prog = program(vec![decl("a", 300), decl("b", -1)]);
        let state = MachineState::<u8>::declare(&prog, 2).unwrap();
        assert_eq!(state.memory(), &[44, 255]);
    }

    #[test]
    fn duplicate_declaration() {
        let prog = program(vec![decl("a", 1), decl("b", 2), decl("a", 3)]);
        assert_eq!(
            MachineState::<i32>::declare(&prog, 8).err(),
            Some(RuntimeError::DuplicateDeclaration { symbol: key("a") })
        );
    }

    #[test]
    fn too_many_declarations() {
        let prog = program(vec![decl("a", 1), decl("b", 2)]);
        assert!(MachineState::<i32>::declare(&prog, 2).is_ok());
        assert_eq!(
            MachineState::<i32>::declare(&prog, 1).err(),
            Some(RuntimeError::TooManyDeclarations { capacity: 1 })
        );
        assert_eq!(
            MachineState::<i32>::declare(&prog, 0).err(),
            Some(RuntimeError::TooManyDeclarations { capacity: 0 })
        );
    }

    #[test]
    fn resolves_operands() {
        let prog = program(vec![decl("a", 2), decl("b", 9), decl("c", 1)]);
        let state = MachineState::<i64>::declare(&prog, 3).unwrap();

        assert_eq!(state.rvalue(&Operand::imm(-4)), Ok(-4));
        assert_eq!(state.rvalue(&Operand::SymbolAddress(key("b"))), Ok(1));
        assert_eq!(state.rvalue(&Operand::var(key("b"))), Ok(9));
        // [[c]] -> [1] -> 9
        assert_eq!(
            state.rvalue(&Operand::cell(Operand::var(key("c")))),
            Ok(9)
        );
        assert_eq!(state.lvalue(&Operand::cell(Operand::imm(2))), Ok((2, 1)));
    }

    #[test]
    fn validated_destinations_resolve() {
        let prog = program(vec![
            decl("a", 0),
            Instruction::Move(Operand::var(key("a")), Operand::imm(1)),
            Instruction::Not(Operand::cell(Operand::imm(1))),
            Instruction::Add(Operand::cell(Operand::var(key("a"))), Operand::imm(1)),
        ]);
        let state = MachineState::<u8>::declare(&prog, 2).unwrap();
        let slots: Vec<_> = prog
            .iter()
            .filter_map(Instruction::destination)
            .map(|dst| state.place(dst))
            .collect();
        assert_eq!(slots, vec![Ok(0), Ok(1), Ok(0)]);
    }

    #[test]
    fn undeclared_symbol() {
        let state = MachineState::<i32>::new(1);
        assert_eq!(
            state.rvalue(&Operand::var(key("nope"))),
            Err(RuntimeError::UndeclaredSymbol {
                symbol: key("nope")
            })
        );
    }

    #[test]
    fn address_out_of_range() {
        let state = MachineState::<u32>::new(2);
        for address in [2, -1, Value::MAX] {
            assert_eq!(
                state.rvalue(&Operand::cell(Operand::imm(address))),
                Err(RuntimeError::AddressOutOfRange {
                    address,
                    capacity: 2
                })
            );
        }
    }
}
