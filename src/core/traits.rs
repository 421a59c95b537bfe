//! Core traits for Kernel-BP precomputation

use crate::core::Result;
use nalgebra::{DMatrix, RowDVector};

/// Pairwise kernel evaluation over dense sample sets.
///
/// Sample sets are rank-2 matrices with one sample per row. Any type
/// implementing this trait can substitute for the Gaussian kernel without
/// changes to the factorizer or the pipeline.
pub trait KernelFunction {
    /// Gram matrix of `x` against itself: K[i, j] = k(x_i, x_j).
    ///
    /// Implementations exploit symmetry and must return a symmetric PSD
    /// matrix (up to floating-point tolerance).
    fn gram(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>>;

    /// Rectangular kernel matrix between two sample sets:
    /// K[i, j] = k(x_i, y_j).
    fn cross_gram(&self, x: &DMatrix<f64>, y: &DMatrix<f64>) -> Result<DMatrix<f64>>;

    /// Single row of the Gram matrix: k(x_pivot, x_j) for all j.
    ///
    /// Lets the incomplete factorizer evaluate the kernel on demand without
    /// materializing the full n×n matrix.
    fn row(&self, pivot: usize, x: &DMatrix<f64>) -> Result<RowDVector<f64>>;
}
