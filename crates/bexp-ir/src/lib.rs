//! Operand expression IR for disassembly export.
//!
//! Operand sub-terms (registers, immediates, operators, dereferences, symbols)
//! are stored once per [`ExpressionCache`] and addressed by [`ExprId`].
//! Instructions refer to them through ordered per-operand id lists.

mod builder;
mod cache;
mod expr;
mod instr;
mod kind;
mod resolve;
mod signature;

pub use builder::*;
pub use cache::*;
pub use expr::*;
pub use instr::*;
pub use kind::*;
pub use resolve::*;
pub use signature::*;

use thiserror::Error;

/// Expression construction errors.
///
/// These signal a malformed call from the decoding layer, not bad input data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("{kind} expression requires a non-empty symbol")]
    EmptySymbol { kind: ExpressionKind },
    #[error("parent expression {0} does not belong to this cache")]
    UnknownParent(ExprId),
    #[error("expression {index} names parent {parent}, which does not precede it")]
    ParentOutOfOrder { index: usize, parent: usize },
    #[error("expression id space exhausted")]
    IdSpaceExhausted,
}

pub type Result<T> = std::result::Result<T, ExpressionError>;
