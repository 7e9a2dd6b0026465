//! Functions: basic blocks, edges and metadata.

use std::fmt;
use std::sync::Arc;

use bexp_ir::Instruction;
use tracing::{debug, trace};

use crate::block::BasicBlock;
use crate::dominators::DominatorTree;
use crate::edge::FlowGraphEdge;

/// Function classification. Discriminants are export tags.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
#[repr(u8)]
pub enum FunctionType {
    Standard = 0,
    Library = 1,
    Imported = 2,
    Thunk = 3,
    Invalid = 4,
    /// Never assigned.
    #[default]
    None = 123,
}

impl FunctionType {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Library => "library",
            Self::Imported => "imported",
            Self::Thunk => "thunk",
            Self::Invalid => "invalid",
            Self::None => "none",
        }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which name to return from [`Function::name`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NameKind {
    Mangled,
    Demangled,
}

/// One function's flow graph plus identity and naming metadata.
#[derive(Clone, Debug)]
pub struct Function {
    entry_point: u64,
    basic_blocks: Vec<BasicBlock>,
    edges: Vec<FlowGraphEdge>,
    name: String,
    demangled_name: String,
    module_name: Option<Arc<str>>,
    kind: FunctionType,
    library_index: i32,
}

impl Function {
    pub const fn new(entry_point: u64) -> Self {
        Self {
            entry_point,
            basic_blocks: Vec::new(),
            edges: Vec::new(),
            name: String::new(),
            demangled_name: String::new(),
            module_name: None,
            kind: FunctionType::None,
            library_index: -1,
        }
    }

    /// Drop blocks and edges; entry point, names, module and type are kept.
    pub fn clear(&mut self) {
        self.basic_blocks.clear();
        self.edges.clear();
    }

    /// Append a block. Consistency is restored by [`Self::sort_graph`] and [`Self::fix_edges`].
    pub fn add_basic_block(&mut self, block: BasicBlock) {
        self.basic_blocks.push(block);
    }

    pub fn add_edge(&mut self, edge: FlowGraphEdge) {
        self.edges.push(edge);
    }

    /// Sort blocks by start address and edges by (source, target, kind).
    pub fn sort_graph(&mut self) {
        self.basic_blocks.sort_by_key(BasicBlock::start);
        self.edges.sort_unstable();
    }

    /// Move every edge endpoint to the start of the block containing it.
    ///
    /// Edges with an endpoint outside all blocks are dropped, as are
    /// duplicates created by the move. Returns the number of edges removed.
    pub fn fix_edges(&mut self) -> usize {
        if !self.basic_blocks.is_sorted_by_key(BasicBlock::start) {
            self.basic_blocks.sort_by_key(BasicBlock::start);
        }

        let before = self.edges.len();
        let mut fixed = Vec::with_capacity(before);
        for edge in &self.edges {
            let source = self.basic_block_for_address(edge.source);
            let target = self.basic_block_for_address(edge.target);
            match (source, target) {
                (Some(source), Some(target)) => {
                    fixed.push(FlowGraphEdge::new(source.start(), target.start(), edge.kind));
                }
                _ => trace!(
                    function = self.entry_point,
                    %edge,
                    "dropping edge without matching block"
                ),
            }
        }
        fixed.sort_unstable();
        fixed.dedup();
        self.edges = fixed;

        let dropped = before - self.edges.len();
        if dropped > 0 {
            debug!(function = self.entry_point, dropped, "fixed edges");
        }
        dropped
    }

    /// Edges whose target dominates their source, in edge storage order.
    ///
    /// Dominance is computed from the block containing the entry point; blocks
    /// unreachable from it never yield back edges.
    pub fn back_edges(&self) -> Vec<&FlowGraphEdge> {
        let Some(entry) = self.basic_block_index_for_address(self.entry_point) else {
            debug!(function = self.entry_point, "no entry block");
            return Vec::new();
        };

        let endpoints: Vec<Option<(usize, usize)>> = self
            .edges
            .iter()
            .map(|edge| {
                Some((
                    self.basic_block_index_for_address(edge.source)?,
                    self.basic_block_index_for_address(edge.target)?,
                ))
            })
            .collect();

        let mut successors = vec![Vec::new(); self.basic_blocks.len()];
        for &(source, target) in endpoints.iter().flatten() {
            successors[source].push(target);
        }
        let tree = DominatorTree::compute(&successors, entry);

        self.edges
            .iter()
            .zip(&endpoints)
            .filter(|(_, endpoints)| {
                endpoints.is_some_and(|(source, target)| tree.dominates(target, source))
            })
            .map(|(edge, _)| edge)
            .collect()
    }

    pub const fn entry_point(&self) -> u64 {
        self.entry_point
    }

    pub const fn set_type(&mut self, kind: FunctionType) {
        self.kind = kind;
    }

    /// The assigned type as-is ([`FunctionType::None`] if never assigned).
    pub const fn raw_type(&self) -> FunctionType {
        self.kind
    }

    /// Type derived from structure: entry point 0 is a thunk, no blocks means
    /// imported, anything else is standard.
    pub fn classified_type(&self) -> FunctionType {
        if self.entry_point == 0 {
            FunctionType::Thunk
        } else if self.basic_blocks.is_empty() {
            FunctionType::Imported
        } else {
            FunctionType::Standard
        }
    }

    /// [`Self::raw_type`] when `raw`, otherwise [`Self::classified_type`].
    pub fn function_type(&self, raw: bool) -> FunctionType {
        if raw {
            self.raw_type()
        } else {
            self.classified_type()
        }
    }

    pub fn is_imported(&self) -> bool {
        self.classified_type() == FunctionType::Imported
    }

    pub fn module_name(&self) -> Option<&str> {
        self.module_name.as_deref()
    }

    /// Set the module name. Pass a shared string (see [`crate::ModuleNames`])
    /// so functions of one module share storage.
    pub fn set_module_name(&mut self, name: Arc<str>) {
        self.module_name = Some(name);
    }

    pub fn set_name(&mut self, name: impl Into<String>, demangled_name: impl Into<String>) {
        self.name = name.into();
        self.demangled_name = demangled_name.into();
    }

    /// The requested name, falling back from demangled to mangled to `sub_<ADDR>`.
    pub fn name(&self, kind: NameKind) -> String {
        if kind == NameKind::Demangled && !self.demangled_name.is_empty() {
            return self.demangled_name.clone();
        }
        if !self.name.is_empty() {
            return self.name.clone();
        }
        self.default_name()
    }

    /// Whether the function has a name other than the generated `sub_` one.
    pub fn has_real_name(&self) -> bool {
        !self.name.is_empty() && self.name != self.default_name()
    }

    fn default_name(&self) -> String {
        if self.entry_point <= u64::from(u32::MAX) {
            format!("sub_{:08X}", self.entry_point)
        } else {
            format!("sub_{:016X}", self.entry_point)
        }
    }

    pub const fn library_index(&self) -> i32 {
        self.library_index
    }

    pub const fn set_library_index(&mut self, library_index: i32) {
        self.library_index = library_index;
    }

    pub fn edges(&self) -> &[FlowGraphEdge] {
        &self.edges
    }

    pub fn basic_blocks(&self) -> &[BasicBlock] {
        &self.basic_blocks
    }

    /// Block containing `address`. Blocks must be sorted.
    pub fn basic_block_for_address(&self, address: u64) -> Option<&BasicBlock> {
        self.basic_block_index_for_address(address)
            .map(|idx| &self.basic_blocks[idx])
    }

    /// Instruction starting at `address`. Blocks must be sorted.
    pub fn instruction_at(&self, address: u64) -> Option<&Instruction> {
        self.basic_block_for_address(address)?.instruction_at(address)
    }

    fn basic_block_index_for_address(&self, address: u64) -> Option<usize> {
        let idx = self
            .basic_blocks
            .partition_point(|block| block.start() <= address)
            .checked_sub(1)?;
        self.basic_blocks[idx].contains(address).then_some(idx)
    }

    /// Sort the graph and optionally repair edges. Returns edges dropped.
    pub fn finalize(&mut self, fix_edges: bool) -> usize {
        self.sort_graph();
        if fix_edges { self.fix_edges() } else { 0 }
    }
}
