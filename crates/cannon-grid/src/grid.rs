use crate::error::{CannonError, Result};

/// Position of one worker on the logical `side x side` torus.
///
/// Ranks map to coordinates row-major: `row = rank / side`,
/// `col = rank % side`. Neighbour lookups wrap around at the edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessGrid {
    side: usize,
    rank: usize,
    row: usize,
    col: usize,
}

impl ProcessGrid {
    /// Place `rank` on the grid formed by `workers` workers.
    ///
    /// # Errors
    /// `GridShape` if `workers` is not a perfect square (zero included),
    /// `InvalidConfig` if `rank >= workers`.
    pub fn new(workers: usize, rank: usize) -> Result<Self> {
        let side = Self::side_for(workers).ok_or(CannonError::GridShape { workers })?;
        if rank >= workers {
            return Err(CannonError::InvalidConfig(format!(
                "rank {} >= worker count {}",
                rank, workers
            )));
        }
        Ok(ProcessGrid {
            side,
            rank,
            row: rank / side,
            col: rank % side,
        })
    }

    /// Grid side `p` with `p * p == workers`, or `None` when `workers` is
    /// not a positive perfect square.
    pub fn side_for(workers: usize) -> Option<usize> {
        if workers == 0 {
            return None;
        }
        let square = |s: usize| s.checked_mul(s);
        let mut side = (workers as f64).sqrt() as usize;
        while square(side).map_or(true, |sq| sq > workers) {
            side -= 1;
        }
        while square(side + 1).is_some_and(|sq| sq <= workers) {
            side += 1;
        }
        (square(side) == Some(workers)).then_some(side)
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn workers(&self) -> usize {
        self.side * self.side
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn col(&self) -> usize {
        self.col
    }

    pub fn coords(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    /// Rank of the worker at `(row, col)`, both taken modulo the side.
    pub fn rank_of(&self, row: usize, col: usize) -> usize {
        (row % self.side) * self.side + (col % self.side)
    }

    /// Coordinates of `rank`.
    pub fn coords_of(&self, rank: usize) -> (usize, usize) {
        (rank / self.side, rank % self.side)
    }

    /// Ranks sharing this worker's row, in column order.
    pub fn row_group(&self) -> Vec<usize> {
        (0..self.side).map(|c| self.rank_of(self.row, c)).collect()
    }

    /// Ranks sharing this worker's column, in row order.
    pub fn col_group(&self) -> Vec<usize> {
        (0..self.side).map(|r| self.rank_of(r, self.col)).collect()
    }

    /// Worker `steps` positions to the left in the row group.
    pub fn left(&self, steps: usize) -> usize {
        let s = steps % self.side;
        self.rank_of(self.row, self.col + self.side - s)
    }

    /// Worker `steps` positions to the right in the row group.
    pub fn right(&self, steps: usize) -> usize {
        self.rank_of(self.row, self.col + steps)
    }

    /// Worker `steps` positions up in the column group.
    pub fn up(&self, steps: usize) -> usize {
        let s = steps % self.side;
        self.rank_of(self.row + self.side - s, self.col)
    }

    /// Worker `steps` positions down in the column group.
    pub fn down(&self, steps: usize) -> usize {
        self.rank_of(self.row + steps, self.col)
    }
}
