//! Export pass - raw disassembly → expression table + function graphs.

use bexp_cfg::{BasicBlock, FinalizeStats, Function, FunctionTable};
use bexp_ir::{CacheStats, ExpressionCache, Instruction, SourceExpression, source_expression};
use tracing::{debug, info, trace, trace_span, warn};

use crate::config::PassConfig;
use crate::raw::{RawFunction, RawInstruction, RawXref};
use crate::{Error, Result};

/// A cross-reference attributed to an operand expression of its source instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct XrefAttribution {
    pub source: u64,
    pub target: u64,
    /// `None` if the source instruction is unknown or no expression matched.
    pub expression: Option<SourceExpression>,
}

/// Counters collected over one pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassStats {
    pub cache: CacheStats,
    pub finalize: FinalizeStats,
    pub empty_blocks: usize,
    pub back_edges: usize,
    pub xrefs: usize,
    pub xrefs_unresolved: usize,
}

/// Everything a serializer needs from one pass.
#[derive(Debug)]
pub struct ExportSnapshot {
    pub cache: ExpressionCache,
    pub functions: FunctionTable,
    pub xrefs: Vec<XrefAttribution>,
    pub stats: PassStats,
}

/// One export pass.
///
/// Owns the expression cache for its duration, so separate passes never share
/// expression ids.
pub struct ExportPass {
    config: PassConfig,
    cache: ExpressionCache,
    functions: FunctionTable,
    xrefs: Vec<XrefAttribution>,
    stats: PassStats,
    finalized: bool,
}

impl ExportPass {
    pub fn new(config: PassConfig) -> Self {
        Self::with_cache(config, ExpressionCache::new())
    }

    /// Start a pass on an existing cache (emptied first if `reset_cache` is set).
    pub fn with_cache(config: PassConfig, mut cache: ExpressionCache) -> Self {
        if config.reset_cache {
            cache.clear();
        }
        Self {
            config,
            cache,
            functions: FunctionTable::new(),
            xrefs: Vec::new(),
            stats: PassStats::default(),
            finalized: false,
        }
    }

    /// Build, finalize and attribute in one go.
    pub fn run(
        config: PassConfig,
        functions: impl IntoIterator<Item = RawFunction>,
        xrefs: impl IntoIterator<Item = RawXref>,
    ) -> Result<ExportSnapshot> {
        let mut pass = Self::new(config);
        {
            let _span = trace_span!("add_functions").entered();
            for function in functions {
                pass.add_function(function)?;
            }
        }
        pass.finalize();
        {
            let _span = trace_span!("attribute_xrefs").entered();
            for xref in xrefs {
                pass.attribute_xref(xref);
            }
        }
        Ok(pass.into_snapshot())
    }

    pub const fn config(&self) -> &PassConfig {
        &self.config
    }

    pub const fn cache(&self) -> &ExpressionCache {
        &self.cache
    }

    pub const fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    /// Intern a function's operands and add its blocks and edges.
    ///
    /// On error nothing is added: expressions interned for the rejected
    /// function are rolled back out of the cache.
    pub fn add_function(&mut self, raw: RawFunction) -> Result<()> {
        if self.functions.contains(raw.entry_point) {
            return Err(Error::DuplicateFunction(raw.entry_point));
        }

        let checkpoint = self.cache.checkpoint();
        let function = match self.build_function(raw) {
            Ok(function) => function,
            Err(err) => {
                self.cache.rollback(checkpoint);
                return Err(err);
            }
        };
        trace!(
            function = function.entry_point(),
            blocks = function.basic_blocks().len(),
            edges = function.edges().len(),
            "added function"
        );
        self.functions.insert(function);
        self.finalized = false;
        Ok(())
    }

    fn build_function(&mut self, raw: RawFunction) -> Result<Function> {
        let mut function = Function::new(raw.entry_point);
        function.set_name(raw.name, raw.demangled_name);
        if let Some(module_name) = raw.module_name.as_deref() {
            function.set_module_name(self.functions.intern_module_name(module_name));
        }
        if let Some(kind) = raw.kind {
            function.set_type(kind);
        }
        if let Some(library_index) = raw.library_index {
            function.set_library_index(library_index);
        }

        for block in raw.blocks {
            let instructions = block
                .instructions
                .into_iter()
                .map(|instr| self.lift_instruction(instr))
                .collect::<Result<Vec<_>>>()?;
            match BasicBlock::from_instructions(instructions) {
                Some(block) => function.add_basic_block(block),
                None => {
                    debug!(function = raw.entry_point, "skipping empty basic block");
                    self.stats.empty_blocks += 1;
                }
            }
        }
        for edge in raw.edges {
            function.add_edge(edge);
        }
        Ok(function)
    }

    fn lift_instruction(&mut self, raw: RawInstruction) -> Result<Instruction> {
        let mut instr = Instruction::new(raw.address, raw.size, raw.mnemonic);
        for operand in &raw.operands {
            let operand = self
                .cache
                .intern_operand(operand)
                .inspect_err(|err| warn!(address = raw.address, %err, "rejected operand"))?;
            instr.push_operand(operand);
        }
        Ok(instr)
    }

    /// Sort and repair every function graph and count loop back edges.
    pub fn finalize(&mut self) -> FinalizeStats {
        let stats = self
            .functions
            .finalize(self.config.parallel, self.config.fix_edges);
        if self.config.classify_types {
            for function in self.functions.iter_mut() {
                function.set_type(function.classified_type());
            }
        }
        self.stats.finalize = stats;
        self.stats.back_edges = {
            let _span = trace_span!("back_edges").entered();
            self.functions.iter().map(|f| f.back_edges().len()).sum()
        };
        self.finalized = true;
        stats
    }

    /// Attribute one cross-reference. Finalizes first if needed.
    pub fn attribute_xref(&mut self, xref: RawXref) -> Option<SourceExpression> {
        if !self.finalized {
            self.finalize();
        }
        let expression = self
            .functions
            .instruction_at(xref.source)
            .and_then(|instr| source_expression(&self.cache, instr, xref.target));
        if expression.is_none() {
            trace!(source = xref.source, target = xref.target, "unresolved xref");
            self.stats.xrefs_unresolved += 1;
        }
        self.stats.xrefs += 1;
        self.xrefs.push(XrefAttribution {
            source: xref.source,
            target: xref.target,
            expression,
        });
        expression
    }

    pub fn into_snapshot(mut self) -> ExportSnapshot {
        if !self.finalized {
            self.finalize();
        }
        self.stats.cache = self.cache.stats();
        info!(
            expressions = self.cache.len(),
            functions = self.functions.len(),
            basic_blocks = self.stats.finalize.basic_blocks,
            edges = self.stats.finalize.edges,
            back_edges = self.stats.back_edges,
            xrefs = self.stats.xrefs,
            xrefs_unresolved = self.stats.xrefs_unresolved,
            "export pass complete"
        );
        crate::metrics::record_pass(&self.stats);
        ExportSnapshot {
            cache: self.cache,
            functions: self.functions,
            xrefs: self.xrefs,
            stats: self.stats,
        }
    }
}
