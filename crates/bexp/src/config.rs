//! Export pass configuration.

/// Export pass configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassConfig {
    /// Finalize functions on the rayon thread pool.
    pub parallel: bool,
    /// Repair edge endpoints and drop unresolvable edges.
    pub fix_edges: bool,
    /// Store each function's structural classification as its assigned type.
    pub classify_types: bool,
    /// Empty a reused expression cache before the pass.
    pub reset_cache: bool,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            fix_edges: true,
            classify_types: false,
            reset_cache: true,
        }
    }
}

impl PassConfig {
    /// Single-threaded configuration with otherwise default settings.
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Default::default()
        }
    }

    #[must_use]
    pub const fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    #[must_use]
    pub const fn with_fix_edges(mut self, enabled: bool) -> Self {
        self.fix_edges = enabled;
        self
    }

    #[must_use]
    pub const fn with_classify_types(mut self, enabled: bool) -> Self {
        self.classify_types = enabled;
        self
    }

    #[must_use]
    pub const fn with_reset_cache(mut self, enabled: bool) -> Self {
        self.reset_cache = enabled;
        self
    }
}
