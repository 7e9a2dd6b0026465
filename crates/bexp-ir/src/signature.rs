//! Content-addressing key for expression nodes.

use std::fmt;

use crate::kind::ExpressionKind;

/// Length of an expression signature in bytes.
pub const SIGNATURE_LEN: usize = 19;

const KIND_OFFSET: usize = 0;
const POSITION_OFFSET: usize = 1;
const IMMEDIATE_OFFSET: usize = 3;
const SYMBOL_HASH_OFFSET: usize = 11;
const PARENT_OFFSET: usize = 15;

/// Fixed-width structural key of an expression node.
///
/// Layout (multi-byte fields little-endian):
///
/// | bytes  | field                    |
/// |--------|--------------------------|
/// | 0      | kind tag                 |
/// | 1..3   | operand position         |
/// | 3..11  | immediate (raw bits)     |
/// | 11..15 | SDBM hash of the symbol  |
/// | 15..19 | parent id, 0 for a root  |
///
/// Only the symbol is hashed. Two distinct symbols whose hashes collide under
/// otherwise identical fields produce the same signature and are merged.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature([u8; SIGNATURE_LEN]);

impl Signature {
    /// Build a signature from the structural fields of a node.
    pub fn new(
        kind: ExpressionKind,
        position: u16,
        immediate: i64,
        symbol: &str,
        parent_id: u32,
    ) -> Self {
        let mut bytes = [0u8; SIGNATURE_LEN];
        bytes[KIND_OFFSET] = kind.tag();
        bytes[POSITION_OFFSET..IMMEDIATE_OFFSET].copy_from_slice(&position.to_le_bytes());
        bytes[IMMEDIATE_OFFSET..SYMBOL_HASH_OFFSET].copy_from_slice(&immediate.to_le_bytes());
        bytes[SYMBOL_HASH_OFFSET..PARENT_OFFSET].copy_from_slice(&sdbm_hash(symbol).to_le_bytes());
        bytes[PARENT_OFFSET..].copy_from_slice(&parent_id.to_le_bytes());
        Self(bytes)
    }

    /// Raw signature bytes.
    pub const fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    pub const fn kind_tag(&self) -> u8 {
        self.0[KIND_OFFSET]
    }

    pub const fn position(&self) -> u16 {
        u16::from_le_bytes([self.0[POSITION_OFFSET], self.0[POSITION_OFFSET + 1]])
    }

    pub fn immediate(&self) -> i64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.0[IMMEDIATE_OFFSET..SYMBOL_HASH_OFFSET]);
        i64::from_le_bytes(raw)
    }

    pub fn symbol_hash(&self) -> u32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.0[SYMBOL_HASH_OFFSET..PARENT_OFFSET]);
        u32::from_le_bytes(raw)
    }

    pub fn parent_id(&self) -> u32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.0[PARENT_OFFSET..]);
        u32::from_le_bytes(raw)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature(")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

/// Order-sensitive 32-bit SDBM hash.
pub fn sdbm_hash(text: &str) -> u32 {
    text.bytes().fold(0u32, |hash, byte| {
        u32::from(byte)
            .wrapping_add(hash << 6)
            .wrapping_add(hash << 16)
            .wrapping_sub(hash)
    })
}
