use cannon_matrix::Element;
use tracing::debug;

use crate::comm::{Communicator, Tag};
use crate::distribute::LocalBlocks;
use crate::error::Result;
use crate::grid::ProcessGrid;

/// Initial alignment before the round loop.
///
/// Row `r` of the A grid rotates left by `r` and column `c` of the B grid
/// rotates up by `c`. Afterwards worker `(r, c)` holds
/// `A[r][(c + r) mod p]` and `B[(r + c) mod p][c]`, so every later shift
/// moves blocks by exactly one position.
pub fn skew_align<T: Element, C: Communicator<T>>(
    comm: &C,
    grid: &ProcessGrid,
    blocks: &mut LocalBlocks<T>,
) -> Result<()> {
    let (row, col) = grid.coords();

    if row != 0 {
        comm.send_recv_replace(&mut blocks.a, grid.left(row), grid.right(row), Tag::SkewA)?;
    }
    if col != 0 {
        comm.send_recv_replace(&mut blocks.b, grid.up(col), grid.down(col), Tag::SkewB)?;
    }
    debug!(row, col, "skew aligned");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::LocalComm;
    use std::thread;

    /// Tag each block with the coordinates it started at: A as
    /// `10 * row + col`, B as `-(10 * row + col)`.
    fn tagged(row: usize, col: usize) -> LocalBlocks<f64> {
        let id = (10 * row + col) as f64;
        LocalBlocks {
            a: vec![id],
            b: vec![-id],
            size: 1,
        }
    }

    #[test]
    fn test_skew_matches_closed_form() {
        for side in 1..=4 {
            let workers = side * side;
            let world = LocalComm::<f64>::world(workers);
            let after: Vec<(ProcessGrid, LocalBlocks<f64>)> = thread::scope(|s| {
                let handles: Vec<_> = world
                    .into_iter()
                    .map(|comm| {
                        s.spawn(move || {
                            let grid = ProcessGrid::new(workers, comm.rank()).unwrap();
                            let mut blocks = tagged(grid.row(), grid.col());
                            skew_align(&comm, &grid, &mut blocks).unwrap();
                            (grid, blocks)
                        })
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });

            for (grid, blocks) in after {
                let (r, c) = grid.coords();
                let a_from = tagged(r, (c + r) % side).a;
                let b_from = tagged((r + c) % side, c).b;
                assert_eq!(blocks.a, a_from, "A at ({}, {}) on side {}", r, c, side);
                assert_eq!(blocks.b, b_from, "B at ({}, {}) on side {}", r, c, side);
            }
        }
    }
}
