use std::fmt::Debug;

use crate::element::Element;
use crate::error::Result;

/// Trait for pluggable block GEMM kernels.
///
/// Every worker of a distributed run and the sequential reference call the
/// same backend, so results only differ by the order in which partial
/// products are summed. Data is passed as row-major slices.
pub trait ComputeBackend: Send + Sync + Debug {
    /// Returns the name of this backend (e.g., "cpu").
    fn name(&self) -> &str;

    /// Multiply-accumulate: C += A @ B.
    ///
    /// - `a`: row-major data of shape [m, k]
    /// - `b`: row-major data of shape [k, n]
    /// - `c`: row-major accumulator of shape [m, n], updated in place
    fn matmul_accumulate<T: Element>(
        &self,
        a: &[T],
        b: &[T],
        c: &mut [T],
        m: usize,
        k: usize,
        n: usize,
    ) -> Result<()>;

    /// Matrix multiplication: C = A @ B.
    ///
    /// Returns row-major data of shape [m, n].
    fn matmul<T: Element>(&self, a: &[T], b: &[T], m: usize, k: usize, n: usize) -> Result<Vec<T>> {
        let mut c = vec![T::ZERO; m * n];
        self.matmul_accumulate(a, b, &mut c, m, k, n)?;
        Ok(c)
    }
}
