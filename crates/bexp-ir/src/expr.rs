//! Expression nodes.

use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::kind::ExpressionKind;

/// Identity of an expression within one cache generation.
///
/// Ids are assigned in first-creation order starting at 1.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct ExprId(NonZeroU32);

impl ExprId {
    pub(crate) fn from_index(index: usize) -> Option<Self> {
        u32::try_from(index)
            .ok()?
            .checked_add(1)
            .and_then(NonZeroU32::new)
            .map(Self)
    }

    /// Numeric id (never 0).
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Position in the cache's node table.
    pub const fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One node of an operand's expression tree.
///
/// Nodes are only created through [`crate::ExpressionCache`] and never change
/// afterwards. The parent is referenced by id, so it stays valid for as long
/// as the cache generation that produced both nodes.
#[derive(Clone, Debug)]
pub struct Expression {
    pub(crate) id: ExprId,
    pub(crate) kind: ExpressionKind,
    pub(crate) symbol: Arc<str>,
    pub(crate) immediate: i64,
    pub(crate) position: u16,
    pub(crate) relocatable: bool,
    pub(crate) parent: Option<ExprId>,
}

impl Expression {
    pub const fn id(&self) -> ExprId {
        self.id
    }

    pub const fn kind(&self) -> ExpressionKind {
        self.kind
    }

    /// Interned symbol text; empty for pure immediates.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub const fn immediate(&self) -> i64 {
        self.immediate
    }

    /// Operand slot index.
    pub const fn position(&self) -> u16 {
        self.position
    }

    pub const fn parent(&self) -> Option<ExprId> {
        self.parent
    }

    pub fn is_symbol(&self) -> bool {
        self.kind == ExpressionKind::Symbol
    }

    pub const fn is_immediate(&self) -> bool {
        self.kind.is_immediate()
    }

    pub fn is_operator(&self) -> bool {
        self.kind == ExpressionKind::Operator
    }

    pub fn is_dereference_operator(&self) -> bool {
        self.kind == ExpressionKind::Dereference
    }

    /// Whether the immediate is a relocatable address rather than a literal.
    pub const fn is_relocation(&self) -> bool {
        self.relocatable
    }
}

/// Renders a single token: `[` for a dereference, the symbol if present,
/// otherwise the immediate in hex. Children are not rendered.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dereference_operator() {
            f.write_str("[")
        } else if !self.symbol.is_empty() {
            f.write_str(&self.symbol)
        } else if self.immediate >= 0 {
            write!(f, "{:x}", self.immediate)
        } else {
            write!(f, "-{:x}", self.immediate.unsigned_abs())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(kind: ExpressionKind, symbol: &str, immediate: i64) -> Expression {
        Expression {
            id: ExprId::from_index(0).unwrap(),
            kind,
            symbol: Arc::from(symbol),
            immediate,
            position: 0,
            relocatable: false,
            parent: None,
        }
    }

    #[test]
    fn test_expr_id_numbering() {
        let id = ExprId::from_index(0).unwrap();
        assert_eq!(id.get(), 1);
        assert_eq!(id.index(), 0);
        assert!(ExprId::from_index(u32::MAX as usize).is_none());
    }

    #[test]
    fn test_render_tokens() {
        assert_eq!(node(ExpressionKind::Dereference, "[", 0).to_string(), "[");
        assert_eq!(node(ExpressionKind::Register, "eax", 0).to_string(), "eax");
        assert_eq!(node(ExpressionKind::ImmediateInt, "", 0x1000).to_string(), "1000");
        assert_eq!(node(ExpressionKind::ImmediateInt, "", -0x10).to_string(), "-10");
        assert_eq!(node(ExpressionKind::ImmediateInt, "", 0).to_string(), "0");
        assert_eq!(
            node(ExpressionKind::ImmediateInt, "", i64::MIN).to_string(),
            "-8000000000000000"
        );
        // Named immediates render by name.
        assert_eq!(node(ExpressionKind::Function, "main", 0x4000).to_string(), "main");
    }
}
