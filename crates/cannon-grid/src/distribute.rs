//! Input validation and the initial scatter of blocks from the origin.

use cannon_matrix::{Element, Matrix, Shape};
use tracing::debug;

use crate::comm::{Communicator, Message, Tag};
use crate::error::{CannonError, CommError, Rejection, Result, ShapeError};
use crate::grid::ProcessGrid;

/// Outcome of validation, decided once by the origin and broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(Rejection),
}

/// The A and B blocks a worker currently holds.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalBlocks<T> {
    pub a: Vec<T>,
    pub b: Vec<T>,
    /// Side length of each block (`n / p`).
    pub size: usize,
}

/// Check that `workers` form a square grid and that `a @ b` can be split
/// evenly across it.
pub fn validate_inputs(workers: usize, a: Shape, b: Shape) -> Verdict {
    let side = match ProcessGrid::side_for(workers) {
        Some(side) => side,
        None => return Verdict::Reject(Rejection::GridShape { workers }),
    };
    let shape_check = || {
        if a.matmul_shape(&b).is_none() {
            return Err(ShapeError::InnerMismatch {
                a_rows: a.rows(),
                a_cols: a.cols(),
                b_rows: b.rows(),
                b_cols: b.cols(),
            });
        }
        for (name, shape) in [('A', a), ('B', b)] {
            if !shape.is_square() {
                return Err(ShapeError::NotSquare {
                    name,
                    rows: shape.rows(),
                    cols: shape.cols(),
                });
            }
        }
        if a.rows() % side != 0 {
            return Err(ShapeError::Indivisible { n: a.rows(), side });
        }
        Ok(())
    };
    match shape_check() {
        Ok(()) => Verdict::Accept,
        Err(e) => Verdict::Reject(e.into()),
    }
}

/// Make every worker hold the origin's verdict before any block moves.
///
/// The origin runs `evaluate` and sends the result to all other ranks;
/// the others wait for it. Runs over the flat rank space, so it works
/// even when no grid can be formed.
pub fn agree_on_verdict<T: Element, C: Communicator<T>>(
    comm: &C,
    origin: usize,
    evaluate: impl FnOnce() -> Verdict,
) -> Result<Verdict> {
    if comm.rank() == origin {
        let verdict = evaluate();
        for dest in (0..comm.size()).filter(|&r| r != origin) {
            comm.send(dest, Tag::Verdict, Message::Verdict(verdict.clone()))?;
        }
        debug!(?verdict, "verdict broadcast");
        return Ok(verdict);
    }

    match comm.recv(origin, Tag::Verdict)? {
        Message::Verdict(verdict) => {
            debug!(?verdict, "verdict received");
            Ok(verdict)
        }
        Message::Block(_) => Err(CommError::Malformed {
            src: origin,
            tag: Tag::Verdict,
            reason: "expected a verdict, got a block".to_string(),
        }
        .into()),
    }
}

/// Send block `(row, col)` of A and B to the worker at `(row, col)`.
///
/// `inputs` must be `Some` on the origin; it is ignored elsewhere. `n` is
/// the shared matrix dimension and must already be validated.
pub fn scatter_blocks<T: Element, C: Communicator<T>>(
    comm: &C,
    grid: &ProcessGrid,
    origin: usize,
    n: usize,
    inputs: Option<(&Matrix<T>, &Matrix<T>)>,
) -> Result<LocalBlocks<T>> {
    let size = n / grid.side();
    let len = size * size;

    if comm.rank() != origin {
        let a = comm.recv_block(origin, Tag::ScatterA, len)?;
        let b = comm.recv_block(origin, Tag::ScatterB, len)?;
        debug!(size, "blocks received");
        return Ok(LocalBlocks { a, b, size });
    }

    let (a, b) = inputs.ok_or(CannonError::MissingInput { rank: origin })?;
    let mut own = None;
    for rank in 0..grid.workers() {
        let (row, col) = grid.coords_of(rank);
        let a_block = a.block(row, col, size)?;
        let b_block = b.block(row, col, size)?;
        if rank == origin {
            own = Some(LocalBlocks {
                a: a_block,
                b: b_block,
                size,
            });
        } else {
            comm.send_block(rank, Tag::ScatterA, a_block)?;
            comm.send_block(rank, Tag::ScatterB, b_block)?;
        }
    }
    debug!(size, workers = grid.workers(), "blocks scattered");
    own.ok_or(CannonError::MissingInput { rank: origin })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::LocalComm;
    use std::thread;

    fn sq(n: usize) -> Shape {
        Shape::square(n)
    }

    #[test]
    fn test_accepts_divisible_square() {
        assert_eq!(validate_inputs(4, sq(4), sq(4)), Verdict::Accept);
        assert_eq!(validate_inputs(9, sq(6), sq(6)), Verdict::Accept);
        assert_eq!(validate_inputs(1, sq(5), sq(5)), Verdict::Accept);
    }

    #[test]
    fn test_rejects_non_square_worker_count() {
        for workers in [0, 2, 3, 5, 6] {
            assert_eq!(
                validate_inputs(workers, sq(4), sq(4)),
                Verdict::Reject(Rejection::GridShape { workers })
            );
        }
    }

    #[test]
    fn test_huge_worker_count_is_rejected_not_overflowed() {
        assert_eq!(
            validate_inputs(usize::MAX, sq(4), sq(4)),
            Verdict::Reject(Rejection::GridShape {
                workers: usize::MAX
            })
        );
    }

    #[test]
    fn test_accepts_empty_matrices() {
        assert_eq!(validate_inputs(4, sq(0), sq(0)), Verdict::Accept);
    }

    #[test]
    fn test_rejects_indivisible_dimension() {
        assert_eq!(
            validate_inputs(4, sq(5), sq(5)),
            Verdict::Reject(Rejection::Shape(ShapeError::Indivisible { n: 5, side: 2 }))
        );
    }

    #[test]
    fn test_rejects_inner_mismatch_and_rectangles() {
        assert!(matches!(
            validate_inputs(4, Shape::new(4, 4), Shape::new(2, 4)),
            Verdict::Reject(Rejection::Shape(ShapeError::InnerMismatch { .. }))
        ));
        assert!(matches!(
            validate_inputs(1, Shape::new(2, 3), Shape::new(3, 2)),
            Verdict::Reject(Rejection::Shape(ShapeError::NotSquare { name: 'A', .. }))
        ));
    }

    #[test]
    fn test_every_worker_sees_origin_verdict() {
        let world = LocalComm::<f64>::world(4);
        let verdicts: Vec<Verdict> = thread::scope(|s| {
            let handles: Vec<_> = world
                .into_iter()
                .map(|comm| {
                    s.spawn(move || {
                        agree_on_verdict(&comm, 2, || {
                            Verdict::Reject(Rejection::GridShape { workers: 4 })
                        })
                        .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(verdicts
            .iter()
            .all(|v| *v == Verdict::Reject(Rejection::GridShape { workers: 4 })));
    }

    #[test]
    fn test_scatter_places_blocks_by_coordinates() {
        let n = 6;
        let a = Matrix::from_fn(n, n, |i, j| (i * n + j) as f64);
        let b = Matrix::from_fn(n, n, |i, j| -((i * n + j) as f64));
        let world = LocalComm::<f64>::world(9);

        let received: Vec<LocalBlocks<f64>> = thread::scope(|s| {
            let handles: Vec<_> = world
                .into_iter()
                .map(|comm| {
                    let (a, b) = (&a, &b);
                    s.spawn(move || {
                        let grid = ProcessGrid::new(9, comm.rank()).unwrap();
                        let inputs = (comm.rank() == 4).then_some((a, b));
                        scatter_blocks(&comm, &grid, 4, n, inputs).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for (rank, blocks) in received.iter().enumerate() {
            let (row, col) = (rank / 3, rank % 3);
            assert_eq!(blocks.size, 2);
            assert_eq!(blocks.a, a.block(row, col, 2).unwrap());
            assert_eq!(blocks.b, b.block(row, col, 2).unwrap());
        }
    }

    #[test]
    fn test_origin_without_inputs() {
        let world = LocalComm::<f64>::world(1);
        let grid = ProcessGrid::new(1, 0).unwrap();
        assert!(matches!(
            scatter_blocks(&world[0], &grid, 0, 2, None),
            Err(CannonError::MissingInput { rank: 0 })
        ));
    }
}
