//! Fluent construction of expression nodes.

use crate::cache::ExpressionCache;
use crate::expr::ExprId;
use crate::kind::ExpressionKind;
use crate::Result;

/// Builder for a single expression node.
#[derive(Clone, Debug)]
pub struct ExpressionBuilder {
    kind: ExpressionKind,
    symbol: String,
    immediate: i64,
    position: u16,
    relocatable: bool,
    parent: Option<ExprId>,
}

impl ExpressionBuilder {
    pub const fn new(kind: ExpressionKind) -> Self {
        Self {
            kind,
            symbol: String::new(),
            immediate: 0,
            position: 0,
            relocatable: false,
            parent: None,
        }
    }

    pub fn operator(symbol: &str) -> Self {
        Self::new(ExpressionKind::Operator).with_symbol(symbol)
    }

    pub fn register(symbol: &str) -> Self {
        Self::new(ExpressionKind::Register).with_symbol(symbol)
    }

    /// Integer immediate; the value is stored as its two's complement bits.
    #[allow(clippy::cast_possible_wrap)]
    pub const fn immediate_int(immediate: u64) -> Self {
        Self::new(ExpressionKind::ImmediateInt).with_immediate(immediate as i64)
    }

    pub fn size_prefix(symbol: &str) -> Self {
        Self::new(ExpressionKind::SizePrefix).with_symbol(symbol)
    }

    /// Size prefix named after the operand width in bytes (`b4` for 32 bits).
    pub fn size_prefix_bits(bits: u32) -> Self {
        Self::size_prefix(&format!("b{}", bits / 8))
    }

    pub fn dereference() -> Self {
        Self::new(ExpressionKind::Dereference).with_symbol("[")
    }

    #[must_use]
    pub fn with_symbol(mut self, symbol: &str) -> Self {
        symbol.clone_into(&mut self.symbol);
        self
    }

    #[must_use]
    pub const fn with_immediate(mut self, immediate: i64) -> Self {
        self.immediate = immediate;
        self
    }

    #[must_use]
    pub const fn at_position(mut self, position: u16) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub const fn relocatable(mut self, relocatable: bool) -> Self {
        self.relocatable = relocatable;
        self
    }

    #[must_use]
    pub const fn with_parent(mut self, parent: ExprId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Create (or reuse) the node in `cache`.
    pub fn build(&self, cache: &mut ExpressionCache) -> Result<ExprId> {
        cache.create(
            self.parent,
            &self.symbol,
            self.immediate,
            self.kind,
            self.position,
            self.relocatable,
        )
    }
}
