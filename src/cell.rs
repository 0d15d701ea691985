use std::fmt::{self, Debug, Display};
use std::ops::{BitAnd, BitOr, Not};
use std::str::FromStr;

/// Value domain wide enough to hold any cell type without loss.
///
/// Immediates, symbol addresses and cell contents are all read into this domain, so comparisons
/// between operands of different signedness behave mathematically.
pub type Value = i128;

/// Integer type stored in a single memory cell.
pub trait Cell:
    Copy
    + Default
    + Eq
    + Ord
    + Debug
    + Display
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + Not<Output = Self>
{
    const TYPE: CellType;

    /// Widen into the common value domain.
    fn value(self) -> Value;

    /// Truncate a value to the cell width (two's complement).
    fn wrap(value: Value) -> Self;

    fn wrapping_add(self, rhs: Self) -> Self;

    fn wrapping_sub(self, rhs: Self) -> Self;

    fn is_zero(self) -> bool {
        self == Self::default()
    }

    /// Always false for unsigned cells.
    fn is_negative(self) -> bool {
        self.value() < 0
    }
}

macro_rules! impl_cell {
    ( $( $ty:ty => $kind:ident ),* $(,)? ) => {
        $(
            impl Cell for $ty {
                const TYPE: CellType = CellType::$kind;

                #[inline]
                fn value(self) -> Value {
                    self as Value
                }

                #[inline]
                fn wrap(value: Value) -> Self {
                    value as $ty
                }

                #[inline]
                fn wrapping_add(self, rhs: Self) -> Self {
                    <$ty>::wrapping_add(self, rhs)
                }

                #[inline]
                fn wrapping_sub(self, rhs: Self) -> Self {
                    <$ty>::wrapping_sub(self, rhs)
                }
            }
        )*
    };
}

impl_cell! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
}

/// Runtime description of a cell type, used where the type can't be a generic parameter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum CellType {
    I8,
    I16,
    #[default]
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

impl CellType {
    pub const ALL: [CellType; 8] = [
        CellType::I8,
        CellType::I16,
        CellType::I32,
        CellType::I64,
        CellType::U8,
        CellType::U16,
        CellType::U32,
        CellType::U64,
    ];

    pub const fn bits(self) -> u32 {
        match self {
            CellType::I8 | CellType::U8 => 8,
            CellType::I16 | CellType::U16 => 16,
            CellType::I32 | CellType::U32 => 32,
            CellType::I64 | CellType::U64 => 64,
        }
    }

    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            CellType::I8 | CellType::I16 | CellType::I32 | CellType::I64
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            CellType::I8 => "i8",
            CellType::I16 => "i16",
            CellType::I32 => "i32",
            CellType::I64 => "i64",
            CellType::U8 => "u8",
            CellType::U16 => "u16",
            CellType::U32 => "u32",
            CellType::U64 => "u64",
        }
    }

    /// Bit pattern of `value` as stored in a cell of this type.
    pub fn raw_bits(self, value: Value) -> u64 {
        let mask = u64::MAX >> (64 - self.bits());
        (value as u64) & mask
    }
}

impl Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CellType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellType::ALL
            .into_iter()
            .find(|ty| ty.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<_> = CellType::ALL.iter().map(|ty| ty.name()).collect();
                format!("unknown cell type `{s}`, expected one of {}", names.join(", "))
            })
    }
}

/// Final memory contents of a run whose cell type was picked at runtime.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Image {
    cell_type: CellType,
    cells: Vec<Value>,
}

impl Image {
    pub fn from_cells<C: Cell>(cells: &[C]) -> Self {
        Image {
            cell_type: C::TYPE,
            cells: cells.iter().map(|cell| cell.value()).collect(),
        }
    }

    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    pub fn cells(&self) -> &[Value] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
