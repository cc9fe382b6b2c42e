use cannon_matrix::{ComputeBackend, Element};
use tracing::debug;

use crate::comm::{Communicator, Tag};
use crate::distribute::LocalBlocks;
use crate::error::Result;
use crate::grid::ProcessGrid;

/// Where a worker is in the round loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    /// Multiply the held blocks into the accumulator.
    Compute { round: usize },
    /// Rotate A one step left and B one step up.
    Shift { round: usize },
    Done,
}

/// Runs the `p` compute rounds of Cannon's algorithm on one worker.
///
/// Entering round `k`, worker `(r, c)` holds `A[r][(c + r + k) mod p]` and
/// `B[(r + c + k) mod p][c]`. A shift only returns once the replacement
/// blocks have arrived, so no worker computes round `k + 1` on stale data.
/// The shift after the last round is skipped.
pub struct ShiftExchanger<'a, T: Element, C: Communicator<T>, B: ComputeBackend> {
    comm: &'a C,
    grid: &'a ProcessGrid,
    backend: &'a B,
    blocks: LocalBlocks<T>,
    accumulator: Vec<T>,
    state: RoundState,
}

impl<'a, T: Element, C: Communicator<T>, B: ComputeBackend> ShiftExchanger<'a, T, C, B> {
    /// Start at round 0 with a zeroed accumulator. `blocks` must already be
    /// skew-aligned.
    pub fn new(comm: &'a C, grid: &'a ProcessGrid, backend: &'a B, blocks: LocalBlocks<T>) -> Self {
        let accumulator = vec![T::ZERO; blocks.size * blocks.size];
        ShiftExchanger {
            comm,
            grid,
            backend,
            blocks,
            accumulator,
            state: RoundState::Compute { round: 0 },
        }
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn blocks(&self) -> &LocalBlocks<T> {
        &self.blocks
    }

    pub fn accumulator(&self) -> &[T] {
        &self.accumulator
    }

    /// Perform the current state's work and advance.
    pub fn step(&mut self) -> Result<RoundState> {
        self.state = match self.state {
            RoundState::Compute { round } => {
                let size = self.blocks.size;
                self.backend.matmul_accumulate(
                    &self.blocks.a,
                    &self.blocks.b,
                    &mut self.accumulator,
                    size,
                    size,
                    size,
                )?;
                debug!(round, "computed");
                if round + 1 == self.grid.side() {
                    RoundState::Done
                } else {
                    RoundState::Shift { round }
                }
            }
            RoundState::Shift { round } => {
                let grid = self.grid;
                self.comm.send_recv_replace(
                    &mut self.blocks.a,
                    grid.left(1),
                    grid.right(1),
                    Tag::ShiftA(round),
                )?;
                self.comm.send_recv_replace(
                    &mut self.blocks.b,
                    grid.up(1),
                    grid.down(1),
                    Tag::ShiftB(round),
                )?;
                debug!(round, "shifted");
                RoundState::Compute { round: round + 1 }
            }
            RoundState::Done => RoundState::Done,
        };
        Ok(self.state)
    }

    /// Run every remaining round and return the finished result block.
    pub fn run(mut self) -> Result<Vec<T>> {
        while self.state != RoundState::Done {
            self.step()?;
        }
        Ok(self.accumulator)
    }
}
