// Dense multiply-accumulate kernel shared by every worker and the
// sequential reference.

use crate::element::Element;
use crate::error::{MatrixError, Result};

fn check_len(len: usize, rows: usize, cols: usize) -> Result<()> {
    if len != rows * cols {
        return Err(MatrixError::LengthMismatch { len, rows, cols });
    }
    Ok(())
}

/// C += A @ B with the plain i-j-k triple loop.
///
/// Each output cell is summed into a local value over `k` in increasing
/// order and added to the accumulator once. A single call on a zeroed
/// accumulator therefore yields exactly the same bits as a direct product.
pub fn gemm_accumulate<T: Element>(
    a: &[T],
    b: &[T],
    c: &mut [T],
    m: usize,
    k: usize,
    n: usize,
) -> Result<()> {
    check_len(a.len(), m, k)?;
    check_len(b.len(), k, n)?;
    check_len(c.len(), m, n)?;

    for i in 0..m {
        let a_row = &a[i * k..(i + 1) * k];
        for j in 0..n {
            let mut sum = T::ZERO;
            for (p, &a_ip) in a_row.iter().enumerate() {
                sum += a_ip * b[p * n + j];
            }
            c[i * n + j] += sum;
        }
    }
    Ok(())
}
