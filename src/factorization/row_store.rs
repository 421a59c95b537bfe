//! Block-growing row storage for the incomplete factorizer
//!
//! The factorizer appends one row per selected pivot and does not know the
//! final rank in advance. Rows are stored contiguously in row-major order and
//! capacity grows in fixed row-block increments, so append cost stays
//! amortized O(1) without pre-allocating the full n×n kernel matrix.

use nalgebra::DMatrix;

/// Contiguous row-major storage growing by `block_rows` rows at a time.
///
/// A `block_rows` of zero disables block reservation and falls back to the
/// underlying vector's amortized doubling.
#[derive(Debug, Clone)]
pub struct RowStore {
    data: Vec<f64>,
    cols: usize,
    rows: usize,
    block_rows: usize,
}

impl RowStore {
    pub fn new(cols: usize, block_rows: usize) -> Self {
        Self {
            data: Vec::with_capacity(block_rows * cols),
            cols,
            rows: 0,
            block_rows,
        }
    }

    /// Append a row.
    ///
    /// # Panics
    /// Panics if `row.len() != cols`.
    pub fn push_row(&mut self, row: &[f64]) {
        assert_eq!(row.len(), self.cols, "row length must match column count");
        if self.block_rows > 0 && self.data.len() + self.cols > self.data.capacity() {
            self.data.reserve(self.block_rows * self.cols);
        }
        self.data.extend_from_slice(row);
        self.rows += 1;
    }

    /// Row `i` as a slice.
    ///
    /// # Panics
    /// Panics if `i >= rows()`.
    pub fn row(&self, i: usize) -> &[f64] {
        assert!(i < self.rows, "row index out of range");
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Consume the store into a dense rows×cols matrix.
    pub fn into_matrix(self) -> DMatrix<f64> {
        DMatrix::from_row_slice(self.rows, self.cols, &self.data)
    }
}
