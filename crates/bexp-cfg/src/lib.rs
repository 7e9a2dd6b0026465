//! Function flow graphs for disassembly export.
//!
//! A [`Function`] owns its basic blocks and edges, keeps them in address
//! order and answers structural queries such as loop back edges.

mod block;
mod dominators;
mod edge;
mod function;
mod table;

pub use block::*;
pub use dominators::*;
pub use edge::*;
pub use function::*;
pub use table::*;
