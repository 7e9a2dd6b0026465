//! Disassembler-provided input to an export pass.

use bexp_cfg::{FlowGraphEdge, FunctionType};
use bexp_ir::RawExpression;

/// One decoded instruction. Each operand lists its expression tuples with
/// parents before children.
#[derive(Clone, Debug, Default)]
pub struct RawInstruction {
    pub address: u64,
    pub size: u8,
    pub mnemonic: String,
    pub operands: Vec<Vec<RawExpression>>,
}

impl RawInstruction {
    pub fn new(address: u64, size: u8, mnemonic: impl Into<String>) -> Self {
        Self {
            address,
            size,
            mnemonic: mnemonic.into(),
            operands: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_operand(mut self, operand: Vec<RawExpression>) -> Self {
        self.operands.push(operand);
        self
    }
}

/// Instructions of one basic block.
#[derive(Clone, Debug, Default)]
pub struct RawBasicBlock {
    pub instructions: Vec<RawInstruction>,
}

impl RawBasicBlock {
    pub const fn new(instructions: Vec<RawInstruction>) -> Self {
        Self { instructions }
    }
}

/// One function as reported by the disassembler.
#[derive(Clone, Debug, Default)]
pub struct RawFunction {
    pub entry_point: u64,
    pub name: String,
    pub demangled_name: String,
    pub module_name: Option<String>,
    /// Type reported by the disassembler, if any.
    pub kind: Option<FunctionType>,
    pub library_index: Option<i32>,
    pub blocks: Vec<RawBasicBlock>,
    /// Edges by address; sources may be any address inside the source block.
    pub edges: Vec<FlowGraphEdge>,
}

impl RawFunction {
    pub fn new(entry_point: u64) -> Self {
        Self {
            entry_point,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_module(mut self, module_name: impl Into<String>) -> Self {
        self.module_name = Some(module_name.into());
        self
    }

    #[must_use]
    pub fn with_block(mut self, block: RawBasicBlock) -> Self {
        self.blocks.push(block);
        self
    }

    #[must_use]
    pub fn with_edge(mut self, edge: FlowGraphEdge) -> Self {
        self.edges.push(edge);
        self
    }
}

/// A reference from the instruction at `source` to address `target`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawXref {
    pub source: u64,
    pub target: u64,
}

impl RawXref {
    pub const fn new(source: u64, target: u64) -> Self {
        Self { source, target }
    }
}
