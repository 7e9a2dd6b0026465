//! Deduplicating expression store.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::expr::{ExprId, Expression};
use crate::instr::Operand;
use crate::kind::ExpressionKind;
use crate::signature::Signature;
use crate::{ExpressionError, Result};

/// Interned symbol storage. Equal strings share one allocation.
#[derive(Default, Debug)]
pub struct StringCache {
    strings: FxHashSet<Arc<str>>,
}

impl StringCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the shared copy of `text`, inserting it on first use.
    pub fn intern(&mut self, text: &str) -> Arc<str> {
        if let Some(existing) = self.strings.get(text) {
            return Arc::clone(existing);
        }
        let interned: Arc<str> = Arc::from(text);
        self.strings.insert(Arc::clone(&interned));
        interned
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn clear(&mut self) {
        self.strings.clear();
    }

    /// Drop strings no longer referenced outside the cache.
    fn release_unused(&mut self) {
        self.strings.retain(|text| Arc::strong_count(text) > 1);
    }
}

/// Lookup statistics for one cache generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Distinct nodes created.
    pub created: u64,
    /// Requests answered with an existing node.
    pub deduplicated: u64,
}

/// Cache state to return to with [`ExpressionCache::rollback`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheCheckpoint {
    len: usize,
    stats: CacheStats,
}

/// One expression tuple as produced by a disassembler for a single operand.
///
/// `parent` indexes an earlier tuple of the same operand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawExpression {
    pub kind: ExpressionKind,
    pub symbol: String,
    pub immediate: i64,
    pub position: u16,
    pub relocatable: bool,
    pub parent: Option<usize>,
}

impl RawExpression {
    pub fn new(kind: ExpressionKind, symbol: impl Into<String>, immediate: i64) -> Self {
        Self {
            kind,
            symbol: symbol.into(),
            immediate,
            position: 0,
            relocatable: false,
            parent: None,
        }
    }

    #[must_use]
    pub const fn with_parent(mut self, parent: usize) -> Self {
        self.parent = Some(parent);
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
}

/// Deduplicating store of expression nodes keyed by [`Signature`].
///
/// The cache owns every node; callers hold [`ExprId`]s. Not synchronized:
/// use one cache per analysis thread or serialize access.
#[derive(Default, Debug)]
pub struct ExpressionCache {
    /// Nodes in id order (`id - 1` is the index).
    expressions: Vec<Expression>,
    by_signature: FxHashMap<Signature, ExprId>,
    strings: StringCache,
    stats: CacheStats,
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the node for these fields, creating it if no structurally
    /// identical node exists yet.
    ///
    /// Non-immediate kinds require a non-empty symbol.
    pub fn create(
        &mut self,
        parent: Option<ExprId>,
        symbol: &str,
        immediate: i64,
        kind: ExpressionKind,
        position: u16,
        relocatable: bool,
    ) -> Result<ExprId> {
        if symbol.is_empty() && !kind.is_immediate() {
            return Err(ExpressionError::EmptySymbol { kind });
        }
        if let Some(parent) = parent.filter(|p| p.index() >= self.expressions.len()) {
            return Err(ExpressionError::UnknownParent(parent));
        }

        let parent_id = parent.map_or(0, ExprId::get);
        let signature = Signature::new(kind, position, immediate, symbol, parent_id);
        if let Some(&existing) = self.by_signature.get(&signature) {
            self.stats.deduplicated += 1;
            return Ok(existing);
        }

        let id = ExprId::from_index(self.expressions.len())
            .ok_or(ExpressionError::IdSpaceExhausted)?;
        let symbol = self.strings.intern(symbol);
        trace!(%id, %kind, symbol = %symbol, immediate, position, "new expression");
        self.expressions.push(Expression {
            id,
            kind,
            symbol,
            immediate,
            position,
            relocatable,
            parent,
        });
        self.by_signature.insert(signature, id);
        self.stats.created += 1;
        Ok(id)
    }

    /// Intern one operand's raw tuples (parents before children) and return
    /// the operand as an ordered list of ids.
    pub fn intern_operand(&mut self, raw: &[RawExpression]) -> Result<Operand> {
        let mut ids: Vec<ExprId> = Vec::with_capacity(raw.len());
        for (index, expr) in raw.iter().enumerate() {
            let parent = match expr.parent {
                None => None,
                Some(parent) => match ids.get(parent) {
                    Some(&id) => Some(id),
                    None => return Err(ExpressionError::ParentOutOfOrder { index, parent }),
                },
            };
            ids.push(self.create(
                parent,
                &expr.symbol,
                expr.immediate,
                expr.kind,
                expr.position,
                expr.relocatable,
            )?);
        }
        Ok(Operand::new(ids))
    }

    /// Drop every node and interned string and restart ids at 1.
    ///
    /// All previously returned ids become meaningless.
    pub fn clear(&mut self) {
        debug!(
            expressions = self.expressions.len(),
            strings = self.strings.len(),
            "clearing expression cache"
        );
        self.expressions.clear();
        self.by_signature.clear();
        self.strings.clear();
        self.stats = CacheStats::default();
    }

    /// Mark the current end of the cache.
    pub const fn checkpoint(&self) -> CacheCheckpoint {
        CacheCheckpoint {
            len: self.expressions.len(),
            stats: self.stats,
        }
    }

    /// Forget every node created after `checkpoint`.
    ///
    /// Ids handed out since then become meaningless; ids from before stay valid.
    pub fn rollback(&mut self, checkpoint: CacheCheckpoint) {
        if checkpoint.len >= self.expressions.len() {
            return;
        }
        debug!(
            discarded = self.expressions.len() - checkpoint.len,
            "rolling back expression cache"
        );
        for expr in self.expressions.drain(checkpoint.len..) {
            let signature = Signature::new(
                expr.kind,
                expr.position,
                expr.immediate,
                &expr.symbol,
                expr.parent.map_or(0, ExprId::get),
            );
            self.by_signature.remove(&signature);
        }
        self.strings.release_unused();
        self.stats = checkpoint.stats;
    }

    pub fn get(&self, id: ExprId) -> Option<&Expression> {
        self.expressions.get(id.index())
    }

    /// Parent node of `expression`, if any.
    pub fn parent_of(&self, expression: &Expression) -> Option<&Expression> {
        expression.parent.and_then(|parent| self.get(parent))
    }

    /// Every distinct node exactly once, in id order.
    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    /// Signature to id mapping, for consumers that key nodes by signature.
    pub fn signatures(&self) -> impl Iterator<Item = (&Signature, ExprId)> {
        self.by_signature.iter().map(|(sig, &id)| (sig, id))
    }

    /// Recompute the signature of a stored node.
    pub fn signature_of(&self, id: ExprId) -> Option<Signature> {
        let expr = self.get(id)?;
        Some(Signature::new(
            expr.kind,
            expr.position,
            expr.immediate,
            &expr.symbol,
            expr.parent.map_or(0, ExprId::get),
        ))
    }

    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    /// Number of distinct interned symbols.
    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    pub const fn stats(&self) -> CacheStats {
        self.stats
    }
}
