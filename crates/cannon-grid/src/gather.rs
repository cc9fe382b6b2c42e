use cannon_matrix::{Element, Matrix};
use tracing::debug;

use crate::comm::{expect_block, Communicator, Tag};
use crate::error::{CommError, Result};
use crate::grid::ProcessGrid;

/// Collect every worker's finished block on the origin.
///
/// Non-origin workers send their block and return `None`. The origin
/// places each block at `(row * n/p, col * n/p)` using the sender's grid
/// coordinates, so the result does not depend on arrival order.
pub fn gather_result<T: Element, C: Communicator<T>>(
    comm: &C,
    grid: &ProcessGrid,
    origin: usize,
    n: usize,
    block: Vec<T>,
) -> Result<Option<Matrix<T>>> {
    let size = n / grid.side();

    if comm.rank() != origin {
        comm.send_block(origin, Tag::Gather, block)?;
        return Ok(None);
    }

    let mut result = Matrix::zeros(n, n);
    let mut placed = vec![false; grid.workers()];
    let (row, col) = grid.coords();
    result.write_block(row, col, size, &block)?;
    placed[origin] = true;

    for _ in 1..grid.workers() {
        let (src, message) = comm.recv_any(Tag::Gather)?;
        if placed[src] {
            return Err(CommError::Malformed {
                src,
                tag: Tag::Gather,
                reason: "duplicate result block".to_string(),
            }
            .into());
        }
        let block = expect_block(src, Tag::Gather, message, size * size)?;
        let (row, col) = grid.coords_of(src);
        result.write_block(row, col, size, &block)?;
        placed[src] = true;
    }
    debug!(n, "result gathered");
    Ok(Some(result))
}
