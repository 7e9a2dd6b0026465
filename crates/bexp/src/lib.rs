//! BEXP - binary export model
//!
//! Builds the in-memory model a binary exporter serializes: a deduplicated
//! operand expression table plus per-function flow graphs, with loop back
//! edges and cross-reference attribution.
//!
//! # Example
//!
//! ```ignore
//! use bexp::{ExportPass, PassConfig};
//!
//! let snapshot = ExportPass::run(PassConfig::default(), functions, xrefs)?;
//! for expr in snapshot.cache.expressions() {
//!     println!("{} {}", expr.id(), expr);
//! }
//! ```

// Re-export from sub-crates
pub use bexp_cfg::{
    BasicBlock, DominatorTree, EdgeKind, FinalizeStats, FlowGraphEdge, Function, FunctionTable,
    FunctionType, ModuleNames, NameKind,
};
pub use bexp_ir::{
    CacheCheckpoint, CacheStats, ExprId, Expression, ExpressionBuilder, ExpressionCache,
    ExpressionError, ExpressionKind, Instruction, Operand, RawExpression, Signature,
    SourceExpression, export_coordinates, sdbm_hash, source_expression,
};

mod config;
pub mod metrics;
mod pipeline;
mod raw;

pub use config::*;
pub use pipeline::*;
pub use raw::*;

use thiserror::Error;

/// Export pass errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("expression error: {0}")]
    Expression(#[from] ExpressionError),
    #[error("duplicate function at {0:#x}")]
    DuplicateFunction(u64),
}

pub type Result<T> = std::result::Result<T, Error>;
