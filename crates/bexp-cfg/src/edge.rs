//! Flow graph edges.

use std::fmt;

/// Control transfer kind of an edge.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
#[repr(u8)]
pub enum EdgeKind {
    ConditionTrue = 1,
    ConditionFalse = 2,
    Unconditional = 3,
    Switch = 4,
}

impl EdgeKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::ConditionTrue => "true",
            Self::ConditionFalse => "false",
            Self::Unconditional => "unconditional",
            Self::Switch => "switch",
        }
    }
}

/// Directed edge between two blocks of one function, by address.
///
/// Ordering is by source, then target, then kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct FlowGraphEdge {
    pub source: u64,
    pub target: u64,
    pub kind: EdgeKind,
}

impl FlowGraphEdge {
    pub const fn new(source: u64, target: u64, kind: EdgeKind) -> Self {
        Self {
            source,
            target,
            kind,
        }
    }
}

impl fmt::Display for FlowGraphEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#x} -> {:#x} ({})",
            self.source,
            self.target,
            self.kind.name()
        )
    }
}
