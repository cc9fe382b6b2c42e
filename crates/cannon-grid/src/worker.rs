//! The per-worker protocol: verdict, scatter, skew, rounds, gather.

use cannon_matrix::{ComputeBackend, Element, Matrix, Shape};
use tracing::{debug, debug_span, warn};

use crate::comm::Communicator;
use crate::distribute::{agree_on_verdict, scatter_blocks, validate_inputs, Verdict};
use crate::error::{CannonError, Result};
use crate::gather::gather_result;
use crate::grid::ProcessGrid;
use crate::shift::ShiftExchanger;
use crate::skew::skew_align;

/// What one worker knows when a run starts.
///
/// Shapes are common knowledge; only the origin holds the matrices.
#[derive(Debug, Clone, Copy)]
pub struct WorkerInput<'a, T: Element> {
    pub a_shape: Shape,
    pub b_shape: Shape,
    pub matrices: Option<(&'a Matrix<T>, &'a Matrix<T>)>,
}

impl<'a, T: Element> WorkerInput<'a, T> {
    /// Input for the origin worker.
    pub fn origin(a: &'a Matrix<T>, b: &'a Matrix<T>) -> Self {
        WorkerInput {
            a_shape: a.shape(),
            b_shape: b.shape(),
            matrices: Some((a, b)),
        }
    }

    /// Input for every other worker.
    pub fn peer(a_shape: Shape, b_shape: Shape) -> Self {
        WorkerInput {
            a_shape,
            b_shape,
            matrices: None,
        }
    }
}

/// Run one worker's share of a distributed multiply.
///
/// Returns `Some(C)` on `origin` and `None` on every other rank. Any
/// failure aborts the run for all peers.
pub fn run_worker<T, C, B>(
    comm: &C,
    backend: &B,
    origin: usize,
    input: WorkerInput<'_, T>,
) -> Result<Option<Matrix<T>>>
where
    T: Element,
    C: Communicator<T>,
    B: ComputeBackend,
{
    let span = debug_span!("worker", rank = comm.rank());
    let _enter = span.enter();

    let outcome = run_protocol(comm, backend, origin, input);
    if let Err(e) = &outcome {
        if !e.is_secondary() {
            warn!(error = %e, "run aborted");
        }
        comm.abort();
    }
    outcome
}

fn run_protocol<T, C, B>(
    comm: &C,
    backend: &B,
    origin: usize,
    input: WorkerInput<'_, T>,
) -> Result<Option<Matrix<T>>>
where
    T: Element,
    C: Communicator<T>,
    B: ComputeBackend,
{
    let workers = comm.size();
    if origin >= workers {
        return Err(CannonError::InvalidConfig(format!(
            "origin {} >= worker count {}",
            origin, workers
        )));
    }

    let verdict = agree_on_verdict(comm, origin, || {
        validate_inputs(workers, input.a_shape, input.b_shape)
    })?;
    if let Verdict::Reject(reason) = verdict {
        return Err(reason.into());
    }

    let grid = ProcessGrid::new(workers, comm.rank())?;
    let n = input.a_shape.rows();
    debug!(
        row = grid.row(),
        col = grid.col(),
        side = grid.side(),
        n,
        backend = backend.name(),
        "joined grid"
    );

    let mut blocks = scatter_blocks(comm, &grid, origin, n, input.matrices)?;
    skew_align(comm, &grid, &mut blocks)?;
    let block = ShiftExchanger::new(comm, &grid, backend, blocks).run()?;
    gather_result(comm, &grid, origin, n, block)
}
