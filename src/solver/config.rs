//! Solver configuration.
//!
//! [`SolverConfig`] bounds the search effort and controls parallelism.
//!
//! # Defaults
//!
//! ```
//! use shift_schedule::solver::SolverConfig;
//!
//! let config = SolverConfig::default();
//! assert_eq!(config.node_limit, 1_000_000);
//! assert_eq!(config.time_limit_ms, None);
//! ```
//!
//! # Builder Pattern
//!
//! ```
//! use shift_schedule::solver::SolverConfig;
//!
//! let config = SolverConfig::default()
//!     .with_node_limit(50_000)
//!     .with_time_limit_ms(200)
//!     .with_parallel(false);
//! ```

use serde::{Deserialize, Serialize};

/// Search budget and parallelism settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Maximum number of search nodes expanded (across all workers).
    ///
    /// When reached, the best schedule found so far is returned with
    /// status `Feasible` (or `Unknown` if none was found).
    pub node_limit: u64,

    /// Optional wall-clock limit in milliseconds.
    ///
    /// Checked every few hundred nodes, so the actual runtime may exceed
    /// it slightly.
    pub time_limit_ms: Option<u64>,

    /// Explore independent subtrees on the rayon thread pool.
    ///
    /// Has no effect unless the crate is built with the `parallel` feature.
    pub parallel: bool,

    /// Number of leading free variables enumerated to form subtrees
    /// (up to `2^split_depth` work items) when searching in parallel.
    pub split_depth: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            node_limit: 1_000_000,
            time_limit_ms: None,
            parallel: cfg!(feature = "parallel"),
            split_depth: 4,
        }
    }
}

impl SolverConfig {
    /// Sets the node budget.
    pub fn with_node_limit(mut self, nodes: u64) -> Self {
        self.node_limit = nodes;
        self
    }

    /// Sets the wall-clock limit.
    pub fn with_time_limit_ms(mut self, ms: u64) -> Self {
        self.time_limit_ms = Some(ms);
        self
    }

    /// Enables or disables parallel subtree search.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the subtree split depth.
    pub fn with_split_depth(mut self, depth: usize) -> Self {
        self.split_depth = depth;
        self
    }

    /// Whether subtrees will actually run on worker threads.
    pub fn runs_parallel(&self) -> bool {
        cfg!(feature = "parallel") && self.parallel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = SolverConfig::default();
        assert_eq!(c.node_limit, 1_000_000);
        assert_eq!(c.split_depth, 4);
        assert_eq!(c.parallel, cfg!(feature = "parallel"));
    }

    #[test]
    fn test_builder() {
        let c = SolverConfig::default()
            .with_node_limit(10)
            .with_time_limit_ms(5)
            .with_parallel(false)
            .with_split_depth(2);
        assert_eq!(c.node_limit, 10);
        assert_eq!(c.time_limit_ms, Some(5));
        assert!(!c.runs_parallel());
        assert_eq!(c.split_depth, 2);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let c: SolverConfig = serde_json::from_str(r#"{"node_limit": 42}"#).unwrap();
        assert_eq!(c.node_limit, 42);
        assert_eq!(c.split_depth, 4);
    }
}
