//! Export pass metrics using metrics-rs.
//!
//! Counters are no-ops until the embedding application installs a recorder.

use metrics::{Unit, counter, describe_counter};

use crate::PassStats;

/// Register metric descriptions. Call once at startup.
pub fn init() {
    describe_counter!(
        "bexp_expressions_created_total",
        Unit::Count,
        "Distinct expression nodes created"
    );
    describe_counter!(
        "bexp_expressions_deduplicated_total",
        Unit::Count,
        "Expression requests answered by an existing node"
    );
    describe_counter!(
        "bexp_edges_dropped_total",
        Unit::Count,
        "Flow graph edges dropped while repairing endpoints"
    );
    describe_counter!(
        "bexp_back_edges_total",
        Unit::Count,
        "Loop back edges found"
    );
    describe_counter!(
        "bexp_xrefs_unresolved_total",
        Unit::Count,
        "Cross-references without a matching operand expression"
    );
}

/// Record the counters of one finished pass.
pub fn record_pass(stats: &PassStats) {
    counter!("bexp_expressions_created_total").increment(stats.cache.created);
    counter!("bexp_expressions_deduplicated_total").increment(stats.cache.deduplicated);
    counter!("bexp_edges_dropped_total").increment(stats.finalize.edges_dropped as u64);
    counter!("bexp_back_edges_total").increment(stats.back_edges as u64);
    counter!("bexp_xrefs_unresolved_total").increment(stats.xrefs_unresolved as u64);
}
