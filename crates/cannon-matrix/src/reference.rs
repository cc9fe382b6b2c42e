//! Sequential reference multiplication.
//!
//! Used as the single-worker path of the distributed engine and as the
//! oracle its results are checked against.

use crate::cpu::matmul::gemm_accumulate;
use crate::element::Element;
use crate::error::{MatrixError, Result};
use crate::matrix::Matrix;

/// `C[i][j] = sum_k A[i][k] * B[k][j]` with a plain triple loop.
///
/// No blocking and no communication. Requires `a.cols() == b.rows()`.
pub fn sequential_matmul<T: Element>(a: &Matrix<T>, b: &Matrix<T>) -> Result<Matrix<T>> {
    let (m, k) = (a.rows(), a.cols());
    let (k2, n) = (b.rows(), b.cols());
    if k != k2 {
        return Err(MatrixError::MatmulMismatch { m, k, k2, n });
    }

    let mut c = vec![T::ZERO; m * n];
    gemm_accumulate(a.as_slice(), b.as_slice(), &mut c, m, k, n)?;
    Matrix::new(c, m, n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_left() {
        let b = Matrix::from_fn(4, 4, |i, j| (i * 4 + j + 1) as f64);
        let c = sequential_matmul(&Matrix::identity(4), &b).unwrap();
        assert_eq!(c, b);
    }

    #[test]
    fn test_zero_right() {
        let a = Matrix::from_fn(3, 3, |i, j| (i + 2 * j) as f64 - 1.5);
        let c = sequential_matmul(&a, &Matrix::zeros(3, 3)).unwrap();
        assert!(c.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_rectangular_product() {
        // [1,2,3;4,5,6] @ [7,8;9,10;11,12] = [58,64;139,154]
        let a = Matrix::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3).unwrap();
        let b = Matrix::new(vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0], 3, 2).unwrap();
        let c = sequential_matmul(&a, &b).unwrap();
        assert_eq!(c.rows(), 2);
        assert_eq!(c.cols(), 2);
        assert_eq!(c.as_slice(), &[58.0, 64.0, 139.0, 154.0]);
    }

    #[test]
    fn test_f32_fractions() {
        let a = Matrix::new(vec![0.5f32, 0.25, 0.125, 2.0], 2, 2).unwrap();
        let b = Matrix::new(vec![0.1f32, 0.2, 0.3, 0.4], 2, 2).unwrap();
        let c = sequential_matmul(&a, &b).unwrap();
        assert_relative_eq!(c.get(0, 0).unwrap(), 0.125, max_relative = 1e-6);
        assert_relative_eq!(c.get(1, 1).unwrap(), 0.825, max_relative = 1e-6);
    }

    #[test]
    fn test_inner_mismatch() {
        let a = Matrix::<f64>::zeros(2, 3);
        let b = Matrix::<f64>::zeros(2, 3);
        assert!(matches!(
            sequential_matmul(&a, &b),
            Err(MatrixError::MatmulMismatch { k: 3, k2: 2, .. })
        ));
    }
}
