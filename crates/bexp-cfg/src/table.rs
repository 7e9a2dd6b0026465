//! Whole-program function table.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::sync::Arc;

use bexp_ir::Instruction;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use tracing::{debug, trace_span};

use crate::function::Function;

/// Interned module names shared by the functions of a table.
#[derive(Default, Debug)]
pub struct ModuleNames {
    names: FxHashSet<Arc<str>>,
}

impl ModuleNames {
    pub fn intern(&mut self, name: &str) -> Arc<str> {
        if let Some(existing) = self.names.get(name) {
            return Arc::clone(existing);
        }
        let interned: Arc<str> = Arc::from(name);
        self.names.insert(Arc::clone(&interned));
        interned
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Result of finalizing every function in a table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FinalizeStats {
    pub functions: usize,
    pub basic_blocks: usize,
    pub edges: usize,
    pub edges_dropped: usize,
}

/// Functions keyed by entry point.
#[derive(Default, Debug)]
pub struct FunctionTable {
    functions: BTreeMap<u64, Function>,
    module_names: ModuleNames,
    /// (block start, block end, function entry), sorted by block start.
    address_index: Vec<(u64, u64, u64)>,
    /// Running maximum of block ends over `address_index`.
    reach: Vec<u64>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a function, returning the one it replaced (if any).
    pub fn insert(&mut self, function: Function) -> Option<Function> {
        self.functions.insert(function.entry_point(), function)
    }

    pub fn contains(&self, entry_point: u64) -> bool {
        self.functions.contains_key(&entry_point)
    }

    pub fn get(&self, entry_point: u64) -> Option<&Function> {
        self.functions.get(&entry_point)
    }

    pub fn get_mut(&mut self, entry_point: u64) -> Option<&mut Function> {
        self.functions.get_mut(&entry_point)
    }

    pub fn remove(&mut self, entry_point: u64) -> Option<Function> {
        self.functions.remove(&entry_point)
    }

    /// Functions in entry point order.
    pub fn iter(&self) -> btree_map::Values<'_, u64, Function> {
        self.functions.values()
    }

    pub fn iter_mut(&mut self) -> btree_map::ValuesMut<'_, u64, Function> {
        self.functions.values_mut()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Shared copy of a module name.
    pub fn intern_module_name(&mut self, name: &str) -> Arc<str> {
        self.module_names.intern(name)
    }

    pub const fn module_names(&self) -> &ModuleNames {
        &self.module_names
    }

    /// Sort every function's graph, optionally repair edges, and rebuild the
    /// address index used by [`Self::function_containing`].
    pub fn finalize(&mut self, parallel: bool, fix_edges: bool) -> FinalizeStats {
        let _span = trace_span!("finalize_functions", functions = self.functions.len()).entered();
        let edges_dropped: usize = if parallel {
            self.functions
                .par_iter_mut()
                .map(|(_, function)| function.finalize(fix_edges))
                .sum()
        } else {
            self.functions
                .values_mut()
                .map(|function| function.finalize(fix_edges))
                .sum()
        };
        self.rebuild_index();

        let stats = FinalizeStats {
            functions: self.functions.len(),
            basic_blocks: self.address_index.len(),
            edges: self.functions.values().map(|f| f.edges().len()).sum(),
            edges_dropped,
        };
        debug!(
            functions = stats.functions,
            basic_blocks = stats.basic_blocks,
            edges = stats.edges,
            edges_dropped = stats.edges_dropped,
            "finalized function table"
        );
        stats
    }

    fn rebuild_index(&mut self) {
        self.address_index.clear();
        for function in self.functions.values() {
            self.address_index.extend(
                function
                    .basic_blocks()
                    .iter()
                    .map(|block| (block.start(), block.end(), function.entry_point())),
            );
        }
        self.address_index.sort_unstable();

        let mut reach: u64 = 0;
        self.reach.clear();
        self.reach.extend(self.address_index.iter().map(|&(_, end, _)| {
            reach = reach.max(end);
            reach
        }));
    }

    /// Function owning the block that contains `address`.
    ///
    /// Uses the index built by [`Self::finalize`]. Where blocks of several
    /// functions overlap, the containing block with the highest start wins.
    pub fn function_containing(&self, address: u64) -> Option<&Function> {
        let mut idx = self.address_index.partition_point(|&(start, _, _)| start <= address);
        while idx > 0 {
            idx -= 1;
            // No block at or before `idx` reaches `address`.
            if self.reach[idx] <= address {
                break;
            }
            let (_, end, entry) = self.address_index[idx];
            if address < end {
                return self.functions.get(&entry);
            }
        }
        None
    }

    /// Instruction starting at `address` anywhere in the table.
    pub fn instruction_at(&self, address: u64) -> Option<&Instruction> {
        self.function_containing(address)?.instruction_at(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BasicBlock;

    fn function(entry: u64, blocks: &[(u64, u64)]) -> Function {
        let mut function = Function::new(entry);
        for &(start, end) in blocks {
            function.add_basic_block(BasicBlock::new(start, end));
        }
        function
    }

    #[test]
    fn test_module_names_are_shared() {
        let mut table = FunctionTable::new();
        let a = table.intern_module_name("kernel32.dll");
        let b = table.intern_module_name("kernel32.dll");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(table.module_names().len(), 1);
    }

    #[test]
    fn test_function_containing() {
        for parallel in [false, true] {
            let mut table = FunctionTable::new();
            table.insert(function(0x2000, &[(0x2010, 0x2020), (0x2000, 0x2010)]));
            table.insert(function(0x1000, &[(0x1000, 0x1008)]));
            let stats = table.finalize(parallel, true);
            assert_eq!(stats.functions, 2);
            assert_eq!(stats.basic_blocks, 3);

            assert_eq!(table.function_containing(0x1004).unwrap().entry_point(), 0x1000);
            assert_eq!(table.function_containing(0x2018).unwrap().entry_point(), 0x2000);
            assert!(table.function_containing(0x1008).is_none());
            assert!(table.function_containing(0x10).is_none());
        }
    }

    #[test]
    fn test_function_containing_overlapping_blocks() {
        let mut table = FunctionTable::new();
        table.insert(function(0x100, &[(0x100, 0x120)]));
        table.insert(function(0x108, &[(0x108, 0x10c)]));
        table.insert(function(0x200, &[(0x200, 0x204)]));
        table.finalize(false, true);

        // Past the inner block but still inside the wider one.
        assert_eq!(table.function_containing(0x110).unwrap().entry_point(), 0x100);
        assert_eq!(table.function_containing(0x108).unwrap().entry_point(), 0x108);
        assert_eq!(table.function_containing(0x104).unwrap().entry_point(), 0x100);
        assert!(table.function_containing(0x120).is_none());
        assert!(table.function_containing(0x1f0).is_none());
        assert_eq!(table.function_containing(0x202).unwrap().entry_point(), 0x200);
    }

    #[test]
    fn test_iteration_is_by_entry_point() {
        let mut table = FunctionTable::new();
        table.insert(Function::new(0x300));
        table.insert(Function::new(0x100));
        assert!(table.insert(Function::new(0x200)).is_none());
        assert!(table.insert(Function::new(0x200)).is_some());
        let entries: Vec<u64> = table.iter().map(Function::entry_point).collect();
        assert_eq!(entries, vec![0x100, 0x200, 0x300]);
    }
}
