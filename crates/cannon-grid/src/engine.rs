use std::thread;

use cannon_matrix::{sequential_matmul, ComputeBackend, CpuBackend, Element, Matrix};
use tracing::{info, warn};

use crate::comm::{Communicator, LocalComm};
use crate::config::CannonConfig;
use crate::distribute::{validate_inputs, Verdict};
use crate::error::{CannonError, Result};
use crate::worker::{run_worker, WorkerInput};

/// Multiplies square matrices on a simulated grid of worker threads.
///
/// Each worker gets its own `LocalComm` endpoint and shares nothing else
/// with its peers. With a single worker the sequential reference is used
/// directly.
#[derive(Debug, Clone)]
pub struct CannonMultiplier<B: ComputeBackend = CpuBackend> {
    config: CannonConfig,
    backend: B,
}

impl CannonMultiplier<CpuBackend> {
    pub fn new(config: CannonConfig) -> Self {
        Self::with_backend(config, CpuBackend::new())
    }

    /// Configure from the process environment (see [`CannonConfig::from_env`]).
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(CannonConfig::from_env()?))
    }
}

impl<B: ComputeBackend> CannonMultiplier<B> {
    pub fn with_backend(config: CannonConfig, backend: B) -> Self {
        CannonMultiplier { config, backend }
    }

    pub fn config(&self) -> &CannonConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Compute `a @ b`.
    ///
    /// # Errors
    /// `GridShape` when the worker count is not a perfect square, `Shape`
    /// when the matrices are not square, disagree, or their dimension is
    /// not divisible by the grid side. Communication failures and worker
    /// panics abort the whole run.
    pub fn multiply<T: Element>(&self, a: &Matrix<T>, b: &Matrix<T>) -> Result<Matrix<T>> {
        self.config.validate()?;
        let workers = self.config.workers;
        info!(
            workers,
            n = a.rows(),
            dtype = T::NAME,
            backend = self.backend.name(),
            "multiply"
        );

        if workers == 1 {
            if let Verdict::Reject(reason) = validate_inputs(1, a.shape(), b.shape()) {
                warn!(%reason, "multiply rejected");
                return Err(reason.into());
            }
            return Ok(sequential_matmul(a, b)?);
        }

        let result = self.run_grid(a, b);
        match &result {
            Ok(_) => info!(workers, "multiply finished"),
            Err(e) => warn!(error = %e, "multiply failed"),
        }
        result
    }

    fn run_grid<T: Element>(&self, a: &Matrix<T>, b: &Matrix<T>) -> Result<Matrix<T>> {
        let origin = self.config.origin;
        let world = LocalComm::<T>::world_with_timeout(self.config.workers, self.config.recv_timeout);
        let backend = &self.backend;

        let outcomes: Vec<Result<Option<Matrix<T>>>> = thread::scope(|s| {
            let handles: Vec<_> = world
                .into_iter()
                .map(|comm| {
                    let input = if comm.rank() == origin {
                        WorkerInput::origin(a, b)
                    } else {
                        WorkerInput::peer(a.shape(), b.shape())
                    };
                    s.spawn(move || run_worker(&comm, backend, origin, input))
                })
                .collect();
            handles
                .into_iter()
                .enumerate()
                .map(|(rank, h)| {
                    h.join()
                        .unwrap_or(Err(CannonError::WorkerPanicked { rank }))
                })
                .collect()
        });

        collect_origin(outcomes, origin)
    }
}

/// Pick the origin's matrix, or the error that caused the run to fail.
///
/// Errors that merely report a peer going away are only returned when no
/// worker recorded the underlying cause.
fn collect_origin<T: Element>(
    outcomes: Vec<Result<Option<Matrix<T>>>>,
    origin: usize,
) -> Result<Matrix<T>> {
    let mut result = None;
    let mut primary = None;
    let mut secondary = None;

    for (rank, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(Some(m)) if rank == origin => result = Some(m),
            Ok(_) => {}
            Err(e) if e.is_secondary() => {
                secondary.get_or_insert(e);
            }
            Err(e) => {
                primary.get_or_insert(e);
            }
        }
    }

    match (primary.or(secondary), result) {
        (Some(e), _) => Err(e),
        (None, Some(m)) => Ok(m),
        (None, None) => Err(CannonError::MissingInput { rank: origin }),
    }
}
