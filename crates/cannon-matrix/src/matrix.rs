use crate::backend::ComputeBackend;
use crate::element::Element;
use crate::error::{MatrixError, Result};
use crate::shape::Shape;

/// A dense row-major matrix.
///
/// Invariant: `data.len() == shape.numel()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T: Element> {
    data: Vec<T>,
    shape: Shape,
}

impl<T: Element> Matrix<T> {
    /// Create a matrix from a flat row-major buffer.
    ///
    /// # Errors
    /// Returns `LengthMismatch` if `data.len() != rows * cols`.
    pub fn new(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        let shape = Shape::new(rows, cols);
        if data.len() != shape.numel() {
            return Err(MatrixError::LengthMismatch {
                len: data.len(),
                rows,
                cols,
            });
        }
        Ok(Matrix { data, shape })
    }

    /// Create a zero-filled matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        let shape = Shape::new(rows, cols);
        Matrix {
            data: vec![T::ZERO; shape.numel()],
            shape,
        }
    }

    /// Create the `n x n` identity matrix.
    pub fn identity(n: usize) -> Self {
        Self::from_fn(n, n, |i, j| if i == j { T::ONE } else { T::ZERO })
    }

    /// Create a matrix whose element `(i, j)` is `f(i, j)`.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let shape = Shape::new(rows, cols);
        let mut data = Vec::with_capacity(shape.numel());
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Matrix { data, shape }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn rows(&self) -> usize {
        self.shape.rows()
    }

    pub fn cols(&self) -> usize {
        self.shape.cols()
    }

    pub fn is_square(&self) -> bool {
        self.shape.is_square()
    }

    /// Element at `(row, col)`, or `None` when out of range.
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row < self.rows() && col < self.cols() {
            Some(self.data[self.shape.offset(row, col)])
        } else {
            None
        }
    }

    /// Returns the underlying row-major data.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Consumes the matrix, returning the flat row-major buffer.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    fn check_block(&self, block_row: usize, block_col: usize, size: usize) -> Result<()> {
        let in_range = (block_row + 1) * size <= self.rows() && (block_col + 1) * size <= self.cols();
        if !in_range {
            return Err(MatrixError::BlockOutOfRange {
                block_row,
                block_col,
                size,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        Ok(())
    }

    /// Copy out the `size x size` block at block coordinates
    /// `(block_row, block_col)`, i.e. starting at element offset
    /// `(block_row * size, block_col * size)`.
    pub fn block(&self, block_row: usize, block_col: usize, size: usize) -> Result<Vec<T>> {
        self.check_block(block_row, block_col, size)?;
        let mut out = Vec::with_capacity(size * size);
        for i in 0..size {
            let start = self.shape.offset(block_row * size + i, block_col * size);
            out.extend_from_slice(&self.data[start..start + size]);
        }
        Ok(out)
    }

    /// Write a row-major `size x size` block at block coordinates
    /// `(block_row, block_col)`. A block of size 0 writes nothing.
    pub fn write_block(
        &mut self,
        block_row: usize,
        block_col: usize,
        size: usize,
        block: &[T],
    ) -> Result<()> {
        self.check_block(block_row, block_col, size)?;
        if block.len() != size * size {
            return Err(MatrixError::LengthMismatch {
                len: block.len(),
                rows: size,
                cols: size,
            });
        }
        if size == 0 {
            return Ok(());
        }
        for (i, row) in block.chunks_exact(size).enumerate() {
            let start = self.shape.offset(block_row * size + i, block_col * size);
            self.data[start..start + size].copy_from_slice(row);
        }
        Ok(())
    }

    /// Matrix multiplication using the given backend.
    ///
    /// self is [m, k], other is [k, n], result is [m, n].
    pub fn matmul<B: ComputeBackend>(&self, other: &Matrix<T>, backend: &B) -> Result<Matrix<T>> {
        let (m, k) = (self.rows(), self.cols());
        let (k2, n) = (other.rows(), other.cols());
        if k != k2 {
            return Err(MatrixError::MatmulMismatch { m, k, k2, n });
        }

        let result = backend.matmul(&self.data, &other.data, m, k, n)?;
        Matrix::new(result, m, n)
    }

    /// Largest absolute element-wise difference, widened to `f64`.
    pub fn max_abs_diff(&self, other: &Matrix<T>) -> Result<f64> {
        if self.shape != other.shape {
            return Err(MatrixError::ShapeMismatch {
                expected: self.shape.dims().to_vec(),
                got: other.shape.dims().to_vec(),
            });
        }
        Ok(self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&x, &y)| (x.to_f64() - y.to_f64()).abs())
            .fold(0.0, f64::max))
    }

    /// Element-wise comparison with relative tolerance `rel_tol`.
    ///
    /// Elements near zero are compared against `rel_tol` absolutely.
    pub fn approx_eq(&self, other: &Matrix<T>, rel_tol: f64) -> bool {
        if self.shape != other.shape {
            return false;
        }
        self.data.iter().zip(&other.data).all(|(&x, &y)| {
            let (x, y) = (x.to_f64(), y.to_f64());
            let scale = x.abs().max(y.abs()).max(1.0);
            (x - y).abs() <= rel_tol * scale
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CpuBackend;

    fn counting(n: usize) -> Matrix<f64> {
        Matrix::from_fn(n, n, |i, j| (i * n + j + 1) as f64)
    }

    #[test]
    fn test_new_matrix() {
        let m = Matrix::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3).unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 3);
        assert_eq!(m.get(1, 2), Some(6.0));
        assert_eq!(m.get(2, 0), None);
        assert_eq!(m.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_new_length_mismatch() {
        let err = Matrix::new(vec![1.0f64, 2.0], 3, 1).unwrap_err();
        assert_eq!(
            err,
            MatrixError::LengthMismatch {
                len: 2,
                rows: 3,
                cols: 1
            }
        );
    }

    #[test]
    fn test_zeros_identity() {
        let z = Matrix::<f32>::zeros(2, 3);
        assert_eq!(z.as_slice(), &[0.0; 6]);

        let i = Matrix::<f64>::identity(3);
        assert_eq!(i.as_slice(), &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_block_extraction() {
        let m = counting(4);
        assert_eq!(m.block(0, 0, 2).unwrap(), vec![1.0, 2.0, 5.0, 6.0]);
        assert_eq!(m.block(1, 0, 2).unwrap(), vec![9.0, 10.0, 13.0, 14.0]);
        assert_eq!(m.block(1, 1, 2).unwrap(), vec![11.0, 12.0, 15.0, 16.0]);
    }

    #[test]
    fn test_block_out_of_range() {
        let m = counting(4);
        assert!(matches!(
            m.block(2, 0, 2),
            Err(MatrixError::BlockOutOfRange { block_row: 2, .. })
        ));
        assert!(m.block(0, 1, 3).is_err());
    }

    #[test]
    fn test_write_block_roundtrip_layout() {
        let src = counting(6);
        let mut dst = Matrix::<f64>::zeros(6, 6);
        for r in 0..3 {
            for c in 0..3 {
                let blk = src.block(r, c, 2).unwrap();
                dst.write_block(r, c, 2, &blk).unwrap();
            }
        }
        assert_eq!(dst, src);
    }

    #[test]
    fn test_empty_blocks() {
        let mut m = Matrix::<f64>::zeros(0, 0);
        assert!(m.block(0, 0, 0).unwrap().is_empty());
        m.write_block(1, 1, 0, &[]).unwrap();
        assert_eq!(m, Matrix::zeros(0, 0));

        let mut m = counting(2);
        m.write_block(0, 0, 0, &[]).unwrap();
        assert_eq!(m, counting(2));
    }

    #[test]
    fn test_write_block_wrong_length() {
        let mut m = Matrix::<f64>::zeros(4, 4);
        assert!(matches!(
            m.write_block(0, 0, 2, &[1.0; 3]),
            Err(MatrixError::LengthMismatch { len: 3, .. })
        ));
    }

    #[test]
    fn test_matmul() {
        let backend = CpuBackend::new();
        let a = Matrix::new(vec![1.0, 2.0, 3.0, 4.0], 2, 2).unwrap();
        let b = Matrix::new(vec![5.0, 6.0, 7.0, 8.0], 2, 2).unwrap();
        let c = a.matmul(&b, &backend).unwrap();
        assert_eq!(c.shape(), Shape::new(2, 2));
        assert_eq!(c.as_slice(), &[19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_matmul_dimension_mismatch() {
        let backend = CpuBackend::new();
        let a = Matrix::new(vec![1.0f64, 2.0, 3.0], 1, 3).unwrap();
        let b = Matrix::new(vec![1.0f64, 2.0, 3.0, 4.0], 2, 2).unwrap();
        assert_eq!(
            a.matmul(&b, &backend).unwrap_err(),
            MatrixError::MatmulMismatch {
                m: 1,
                k: 3,
                k2: 2,
                n: 2
            }
        );
    }

    #[test]
    fn test_approx_eq_and_diff() {
        let a = counting(3);
        let mut data = a.clone().into_vec();
        data[4] += 1e-12;
        let b = Matrix::new(data, 3, 3).unwrap();
        assert!(a.approx_eq(&b, 1e-9));
        assert!(a.max_abs_diff(&b).unwrap() > 0.0);

        let far = Matrix::from_fn(3, 3, |i, j| (i * 3 + j) as f64);
        assert!(!a.approx_eq(&far, 1e-9));
        assert!(!a.approx_eq(&Matrix::zeros(3, 2), 1e-9));
        assert!(a.max_abs_diff(&Matrix::zeros(2, 2)).is_err());
    }
}
