use std::time::Duration;

use cannon_matrix::MatrixError;
use thiserror::Error;

use crate::comm::Tag;

/// Input shapes the distributed multiply cannot handle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("matrix dimension {n} is not divisible by grid side {side}")]
    Indivisible { n: usize, side: usize },
    #[error("inner dimensions disagree: A is [{a_rows}x{a_cols}], B is [{b_rows}x{b_cols}]")]
    InnerMismatch {
        a_rows: usize,
        a_cols: usize,
        b_rows: usize,
        b_cols: usize,
    },
    #[error("matrix {name} is [{rows}x{cols}], expected a square matrix")]
    NotSquare { name: char, rows: usize, cols: usize },
}

/// Reason the origin refused a run. Carried inside the validation verdict
/// so every worker aborts with the same error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("worker count {workers} is not a perfect square")]
    GridShape { workers: usize },
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Failures of the point-to-point message layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommError {
    #[error("rank {rank} is outside a world of {size} workers")]
    InvalidRank { rank: usize, size: usize },
    #[error("peer {peer} is unreachable")]
    PeerUnreachable { peer: usize },
    #[error("rank {rank} lost every peer while waiting for {tag}")]
    Disconnected { rank: usize, tag: Tag },
    #[error("malformed {tag} message from rank {src}: {reason}")]
    Malformed { src: usize, tag: Tag, reason: String },
    #[error("rank {rank} timed out after {after:?} waiting for {tag}")]
    Timeout { rank: usize, tag: Tag, after: Duration },
    #[error("run aborted by rank {peer}")]
    Aborted { peer: usize },
}

#[derive(Error, Debug)]
pub enum CannonError {
    #[error("worker count {workers} is not a perfect square")]
    GridShape { workers: usize },
    #[error("shape error: {0}")]
    Shape(#[from] ShapeError),
    #[error("communication error: {0}")]
    Communication(#[from] CommError),
    #[error("matrix error: {0}")]
    Matrix(#[from] MatrixError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("origin rank {rank} was started without input matrices")]
    MissingInput { rank: usize },
    #[error("worker {rank} panicked")]
    WorkerPanicked { rank: usize },
    #[error("task stage out of order: {0}")]
    StageOrder(&'static str),
}

impl From<Rejection> for CannonError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::GridShape { workers } => CannonError::GridShape { workers },
            Rejection::Shape(e) => CannonError::Shape(e),
        }
    }
}

impl CannonError {
    /// True when this worker only failed because a peer went away first:
    /// it aborted, dropped its endpoint, or every peer is gone.
    pub fn is_secondary(&self) -> bool {
        matches!(
            self,
            CannonError::Communication(
                CommError::Aborted { .. }
                    | CommError::PeerUnreachable { .. }
                    | CommError::Disconnected { .. }
            )
        )
    }
}

pub type Result<T> = std::result::Result<T, CannonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_maps_to_error_kind() {
        let e: CannonError = Rejection::GridShape { workers: 6 }.into();
        assert!(matches!(e, CannonError::GridShape { workers: 6 }));

        let e: CannonError = Rejection::Shape(ShapeError::Indivisible { n: 5, side: 2 }).into();
        assert!(matches!(
            e,
            CannonError::Shape(ShapeError::Indivisible { n: 5, side: 2 })
        ));
    }

    #[test]
    fn test_messages() {
        let e = CannonError::GridShape { workers: 3 };
        assert_eq!(e.to_string(), "worker count 3 is not a perfect square");
        let e = CannonError::from(ShapeError::Indivisible { n: 5, side: 2 });
        assert_eq!(
            e.to_string(),
            "shape error: matrix dimension 5 is not divisible by grid side 2"
        );
    }

    #[test]
    fn test_secondary() {
        assert!(CannonError::from(CommError::Aborted { peer: 0 }).is_secondary());
        assert!(CannonError::from(CommError::PeerUnreachable { peer: 0 }).is_secondary());
        assert!(CannonError::from(CommError::Disconnected {
            rank: 1,
            tag: Tag::Gather
        })
        .is_secondary());
        assert!(!CannonError::from(CommError::Malformed {
            src: 0,
            tag: Tag::SkewA,
            reason: "short".into()
        })
        .is_secondary());
        assert!(!CannonError::WorkerPanicked { rank: 1 }.is_secondary());
    }
}
