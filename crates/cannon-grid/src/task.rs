use cannon_matrix::{ComputeBackend, CpuBackend, Element, Matrix};

use crate::distribute::{validate_inputs, Verdict};
use crate::engine::CannonMultiplier;
use crate::error::{CannonError, Result};

/// Four-stage lifecycle used by tooling that drives a computation.
pub trait Task {
    type Output;

    fn pre_processing(&mut self) -> Result<()>;

    fn validation(&mut self) -> Result<()>;

    fn run(&mut self) -> Result<()>;

    fn post_processing(&mut self) -> Result<Self::Output>;
}

/// Run all four stages of `task` in order.
pub fn run_task<K: Task>(mut task: K) -> Result<K::Output> {
    task.pre_processing()?;
    task.validation()?;
    task.run()?;
    task.post_processing()
}

/// A distributed multiply staged as a [`Task`].
pub struct CannonTask<T: Element, B: ComputeBackend = CpuBackend> {
    multiplier: CannonMultiplier<B>,
    a: Matrix<T>,
    b: Matrix<T>,
    validated: bool,
    result: Option<Matrix<T>>,
}

impl<T: Element, B: ComputeBackend> CannonTask<T, B> {
    pub fn new(multiplier: CannonMultiplier<B>, a: Matrix<T>, b: Matrix<T>) -> Self {
        CannonTask {
            multiplier,
            a,
            b,
            validated: false,
            result: None,
        }
    }
}

impl<T: Element, B: ComputeBackend> Task for CannonTask<T, B> {
    type Output = Matrix<T>;

    fn pre_processing(&mut self) -> Result<()> {
        self.validated = false;
        self.result = None;
        self.multiplier.config().validate()
    }

    fn validation(&mut self) -> Result<()> {
        let workers = self.multiplier.config().workers;
        if let Verdict::Reject(reason) = validate_inputs(workers, self.a.shape(), self.b.shape()) {
            return Err(reason.into());
        }
        self.validated = true;
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        if !self.validated {
            return Err(CannonError::StageOrder("run before validation"));
        }
        self.result = Some(self.multiplier.multiply(&self.a, &self.b)?);
        Ok(())
    }

    fn post_processing(&mut self) -> Result<Matrix<T>> {
        self.result
            .take()
            .ok_or(CannonError::StageOrder("post_processing before run"))
    }
}
