pub mod matmul;

use crate::backend::ComputeBackend;
use crate::element::Element;
use crate::error::Result;

/// Pure-Rust CPU compute backend.
///
/// Implements the block kernel with straightforward loops optimized for
/// correctness rather than peak performance. Intended as a reference
/// implementation and fallback.
#[derive(Debug, Clone, Copy)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        CpuBackend
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu"
    }

    fn matmul_accumulate<T: Element>(
        &self,
        a: &[T],
        b: &[T],
        c: &mut [T],
        m: usize,
        k: usize,
        n: usize,
    ) -> Result<()> {
        matmul::gemm_accumulate(a, b, c, m, k, n)
    }
}
