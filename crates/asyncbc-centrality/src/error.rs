use asyncbc_core::error::{ErrorCode, PoolError};
use asyncbc_core::graph::NodeId;

/// Errors raised by [`crate::BetweennessEngine`].
#[derive(Debug, thiserror::Error)]
pub enum CentralityError {
    #[error("start node {start} is outside the graph (0..{node_count})")]
    SourceOutOfRange { start: NodeId, node_count: usize },

    #[error("{count} sources from node {start} run past the node count {node_count}")]
    RangePastEnd {
        start: NodeId,
        count: usize,
        node_count: usize,
    },

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(
        "node {node} inconsistent after backward pass from source {source_node}: nsuccs={nsuccs}, delta={delta}"
    )]
    Inconsistent {
        source_node: NodeId,
        node: NodeId,
        nsuccs: u32,
        delta: f64,
    },
}

impl CentralityError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::SourceOutOfRange { .. } | Self::RangePastEnd { .. } => ErrorCode::SourceOutOfRange,
            Self::Pool(err) => err.code(),
            Self::Inconsistent { .. } => ErrorCode::InconsistentState,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_errors_share_a_code() {
        let a = CentralityError::SourceOutOfRange {
            start: 9,
            node_count: 5,
        };
        let b = CentralityError::RangePastEnd {
            start: 2,
            count: 10,
            node_count: 5,
        };
        assert_eq!(a.code(), ErrorCode::SourceOutOfRange);
        assert_eq!(b.code(), ErrorCode::SourceOutOfRange);
        assert!(a.to_string().contains("0..5"));
    }

    #[test]
    fn pool_errors_keep_their_code() {
        let err = CentralityError::from(PoolError::ZeroThreads);
        assert_eq!(err.code(), ErrorCode::InvalidThreadCount);
    }
}
