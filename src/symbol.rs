use std::{
    fmt::{self, Display},
    num::NonZeroU64,
    str::FromStr,
};

use fxhash::FxBuildHasher;
use indexmap::IndexSet;

use crate::error::{ConstructionError, IdentFault};

type FxSet<K> = IndexSet<K, FxBuildHasher>;

/// Longest identifier accepted by the encoder.
pub const MAX_IDENT_LEN: usize = 6;

/// Identifier characters, in digit order.
const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Every character occupies a digit from 1 to 62, so zero never appears as a digit and
/// identifiers of different length can't collide (bijective numeration).
const RADIX: u64 = ALPHABET.len() as u64 + 1;

/// Canonical integer key for a declaration or label name.
///
/// Zero is reserved for the implicit program start and is never produced by [`SymbolKey::encode`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct SymbolKey(NonZeroU64);

impl SymbolKey {
    /// Encode an identifier of 1 to 6 characters from `[0-9a-zA-Z]`.
    pub fn encode(ident: &str) -> Result<Self, ConstructionError> {
        let invalid = |fault| ConstructionError::InvalidIdentifier {
            ident: ident.to_owned(),
            fault,
        };

        if ident.is_empty() {
            return Err(invalid(IdentFault::Empty));
        }
        let mut key = 0u64;
        for (len, ch) in ident.chars().enumerate() {
            if len == MAX_IDENT_LEN {
                return Err(invalid(IdentFault::TooLong));
            }
            let digit = digit_of(ch).ok_or_else(|| invalid(IdentFault::BadChar(ch)))?;
            key = key * RADIX + digit;
        }
        // Non-empty with non-zero digits
        NonZeroU64::new(key)
            .map(SymbolKey)
            .ok_or_else(|| invalid(IdentFault::Empty))
    }

    /// Reconstruct a key from its raw encoding, if it is the encoding of some identifier.
    pub fn from_raw(raw: u64) -> Option<Self> {
        let key = SymbolKey(NonZeroU64::new(raw)?);
        let mut rest = raw;
        let mut len = 0;
        while rest != 0 {
            if rest % RADIX == 0 || len == MAX_IDENT_LEN {
                return None;
            }
            rest /= RADIX;
            len += 1;
        }
        Some(key)
    }

    pub fn raw(self) -> u64 {
        self.0.get()
    }

    /// Recover the identifier this key was encoded from.
    pub fn ident(self) -> String {
        let mut rest = self.raw();
        let mut chars = Vec::with_capacity(MAX_IDENT_LEN);
        while rest != 0 {
            let digit = rest % RADIX;
            // `from_raw` and `encode` guarantee non-zero digits
            chars.push(ALPHABET[(digit - 1) as usize] as char);
            rest /= RADIX;
        }
        chars.iter().rev().collect()
    }
}

fn digit_of(ch: char) -> Option<u64> {
    let idx = match ch {
        '0'..='9' => ch as u64 - '0' as u64,
        'a'..='z' => ch as u64 - 'a' as u64 + 10,
        'A'..='Z' => ch as u64 - 'A' as u64 + 36,
        _ => return None,
    };
    Some(idx + 1)
}

impl FromStr for SymbolKey {
    type Err = ConstructionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SymbolKey::encode(s)
    }
}

impl Display for SymbolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ident())
    }
}

/// Symbol -> memory slot binding. Slots are handed out in order of insertion.
#[derive(Clone, Default, Debug)]
pub struct SymbolTable {
    slots: FxSet<SymbolKey>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            slots: IndexSet::with_hasher(FxBuildHasher::default()),
        }
    }

    /// Bind `key` to the next free slot. Returns `None` if the key is already bound.
    pub fn bind(&mut self, key: SymbolKey) -> Option<usize> {
        let (slot, inserted) = self.slots.insert_full(key);
        inserted.then_some(slot)
    }

    pub fn slot(&self, key: SymbolKey) -> Option<usize> {
        self.slots.get_index_of(&key)
    }

    pub fn symbol(&self, slot: usize) -> Option<SymbolKey> {
        self.slots.get_index(slot).copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// `(slot, symbol)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, SymbolKey)> + '_ {
        self.slots.iter().copied().enumerate()
    }
}
