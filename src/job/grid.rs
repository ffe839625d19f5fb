//! Row-major result grid.

/// A `rows × columns` matrix of iteration counts stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    columns: usize,
    cells: Vec<u32>,
}

impl Grid {
    /// Allocate a zero-filled grid.
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            cells: vec![0; rows * columns],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Borrow one row.
    ///
    /// # Panics
    ///
    /// Panics if `row >= self.rows()`.
    pub fn row(&self, row: usize) -> &[u32] {
        let start = row * self.columns;
        &self.cells[start..start + self.columns]
    }

    pub(crate) fn row_mut(&mut self, row: usize) -> &mut [u32] {
        let start = row * self.columns;
        &mut self.cells[start..start + self.columns]
    }

    /// Iterate over the rows in order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[u32]> + '_ {
        (0..self.rows).map(move |row| self.row(row))
    }

    /// The value at `(row, column)`, if in bounds.
    pub fn get(&self, row: usize, column: usize) -> Option<u32> {
        if row < self.rows && column < self.columns {
            Some(self.cells[row * self.columns + column])
        } else {
            None
        }
    }

    /// All cells in row-major order.
    pub fn as_slice(&self) -> &[u32] {
        &self.cells
    }
}
