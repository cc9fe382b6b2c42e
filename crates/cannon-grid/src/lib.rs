//! `cannon-grid` - Distributed dense matrix multiplication on a 2D process grid.
//!
//! Workers form a `p x p` torus. The origin validates the inputs and
//! broadcasts the verdict, scatters one A and one B block to every worker,
//! and the blocks are skewed once. Each of the `p` rounds then multiplies
//! the held blocks into a local accumulator and rotates A left and B up by
//! one position. The origin finally gathers the result blocks.
//!
//! All communication goes through a [`Communicator`]; [`LocalComm`]
//! simulates a grid with one thread per worker.

pub mod comm;
pub mod config;
pub mod distribute;
pub mod engine;
pub mod error;
pub mod gather;
pub mod grid;
pub mod shift;
pub mod skew;
pub mod task;
pub mod worker;

pub use comm::{Communicator, LocalComm, Message, Tag};
pub use config::CannonConfig;
pub use distribute::{agree_on_verdict, scatter_blocks, validate_inputs, LocalBlocks, Verdict};
pub use engine::CannonMultiplier;
pub use error::{CannonError, CommError, Rejection, Result, ShapeError};
pub use gather::gather_result;
pub use grid::ProcessGrid;
pub use shift::{RoundState, ShiftExchanger};
pub use skew::skew_align;
pub use task::{run_task, CannonTask, Task};
pub use worker::{run_worker, WorkerInput};
