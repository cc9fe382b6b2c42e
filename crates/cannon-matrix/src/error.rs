use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatrixError {
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },
    #[error("buffer length {len} does not match shape [{rows}x{cols}]")]
    LengthMismatch { len: usize, rows: usize, cols: usize },
    #[error("matmul dimension mismatch: [{m}x{k}] @ [{k2}x{n}]")]
    MatmulMismatch {
        m: usize,
        k: usize,
        k2: usize,
        n: usize,
    },
    #[error("block ({block_row}, {block_col}) of size {size} lies outside a [{rows}x{cols}] matrix")]
    BlockOutOfRange {
        block_row: usize,
        block_col: usize,
        size: usize,
        rows: usize,
        cols: usize,
    },
}

pub type Result<T> = std::result::Result<T, MatrixError>;
