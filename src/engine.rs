//! Automorphism oracle trait and implementations

mod refinement;

pub use refinement::RefinementOracle;

use std::time::Duration;

use crate::graph::ColoredGraph;

/// Resource limits of an automorphism search
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchLimits {
    /// Wall-clock limit (`None` = unlimited)
    pub time_limit: Option<Duration>,
    /// Memory ceiling in bytes (`None` = unlimited)
    pub memory_limit_bytes: Option<usize>,
}

/// How an automorphism search ended
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SearchStatus {
    /// The generators generate the whole automorphism group
    #[default]
    Complete,
    /// The time limit was hit; the generators are a partial set
    TimedOut,
    /// The memory ceiling was hit; the generators are a partial set
    OutOfMemory,
}

/// Generators found by an automorphism search
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AutomorphismResult {
    /// Vertex permutations, one entry per vertex id
    pub generators: Vec<Vec<usize>>,
    /// How the search ended
    pub status: SearchStatus,
}

/// Computes generators of the automorphism group of a colored graph
///
/// An automorphism is a vertex permutation that preserves colors and the edge
/// set. Implementations must return within the given limits, reporting
/// exhaustion through the status rather than failing.
pub trait AutomorphismOracle {
    /// Returns a generating set of the automorphism group of `graph`
    fn find_automorphisms(&mut self, graph: &ColoredGraph, limits: &SearchLimits) -> AutomorphismResult;
}

/// An oracle returning a preset result
///
/// Useful for tests and for callers that compute automorphisms with an
/// external tool.
#[derive(Clone, Debug, Default)]
pub struct FixedOracle {
    result: AutomorphismResult,
    calls: usize,
}

impl FixedOracle {
    /// Creates an oracle that always returns `generators` as complete
    pub fn new(generators: Vec<Vec<usize>>) -> Self {
        Self::with_status(generators, SearchStatus::Complete)
    }

    /// Creates an oracle that always returns `generators` with `status`
    pub fn with_status(generators: Vec<Vec<usize>>, status: SearchStatus) -> Self {
        Self {
            result: AutomorphismResult { generators, status },
            calls: 0,
        }
    }

    /// Returns how often the oracle was asked
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl AutomorphismOracle for FixedOracle {
    fn find_automorphisms(&mut self, _graph: &ColoredGraph, _limits: &SearchLimits) -> AutomorphismResult {
        self.calls += 1;
        self.result.clone()
    }
}
