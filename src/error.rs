//! Error types for the preference core.
//!
//! All variants are local logic errors: they are surfaced immediately and
//! never retried. The binary wraps them in `anyhow` at the I/O boundary.

use thiserror::Error;

/// Errors raised by relation algebra, agents, networks and the greedy builder.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreferenceError {
    /// Join or meet attempted on relations over different alternative sets.
    #[error("relations range over different alternative sets ({left} vs {right})")]
    DomainMismatch {
        /// Alternative count of the left operand.
        left: usize,
        /// Alternative count of the right operand.
        right: usize,
    },

    /// Distance requested between differently-sized relations.
    #[error("relations have different sizes ({left} vs {right})")]
    SizeMismatch {
        /// Alternative count of the left operand.
        left: usize,
        /// Alternative count of the right operand.
        right: usize,
    },

    /// A clean view was requested for a relation that is not a DAG.
    #[error("relation is not acyclic once self-loops are removed")]
    CyclicRelation,

    /// A value was supplied in a role it cannot fill.
    #[error("invalid role: {0}")]
    InvalidRole(String),

    /// Aggregation was called without any neighbors.
    #[error("cannot aggregate an empty neighborhood")]
    EmptyNeighborhood,

    /// A node was referenced that is not part of the topology.
    #[error("node not found: {0}")]
    NodeNotFound(usize),

    /// A topology node has no agent bound to it.
    #[error("no agent bound to node {0}")]
    IncompleteProfile(usize),

    /// An edge of the relation has no entry in the weight table.
    #[error("no weight for edge ({from}, {to})")]
    MissingWeight {
        /// Source alternative.
        from: usize,
        /// Target alternative.
        to: usize,
    },

    /// An edge references an alternative outside `0..count`.
    #[error("alternative {alternative} out of range for {count} alternatives")]
    AlternativeOutOfRange {
        /// The offending alternative.
        alternative: usize,
        /// Size of the alternative set.
        count: usize,
    },

    /// A generator was asked for more comparisons than a DAG can hold.
    #[error("requested {requested} comparisons but at most {max} are possible")]
    TooManyComparisons {
        /// Number of comparisons requested.
        requested: usize,
        /// Maximum for the alternative count.
        max: usize,
    },

    /// A numeric parameter is outside its admissible range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Topology parameters cannot produce a valid graph.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),
}

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, PreferenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PreferenceError::DomainMismatch { left: 3, right: 4 };
        assert_eq!(
            err.to_string(),
            "relations range over different alternative sets (3 vs 4)"
        );

        let err = PreferenceError::MissingWeight { from: 0, to: 2 };
        assert_eq!(err.to_string(), "no weight for edge (0, 2)");
    }
}
