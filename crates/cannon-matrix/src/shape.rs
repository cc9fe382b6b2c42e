use std::fmt;

/// Row and column counts of a dense 2D matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    rows: usize,
    cols: usize,
}

impl Shape {
    /// Create a new shape from row and column counts.
    pub fn new(rows: usize, cols: usize) -> Self {
        Shape { rows, cols }
    }

    /// Create a square `n x n` shape.
    pub fn square(n: usize) -> Self {
        Shape { rows: n, cols: n }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of elements (rows * cols).
    pub fn numel(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Flat row-major offset of `(row, col)`.
    pub fn offset(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// Shape of the product `self @ other`, or `None` when the inner
    /// dimensions disagree.
    pub fn matmul_shape(&self, other: &Shape) -> Option<Shape> {
        if self.cols == other.rows {
            Some(Shape::new(self.rows, other.cols))
        } else {
            None
        }
    }

    pub fn dims(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}x{}]", self.rows, self.cols)
    }
}
