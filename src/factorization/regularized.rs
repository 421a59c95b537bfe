//! Regularized dense factorizations
//!
//! The pipeline emits two kinds of dense systems: a Cholesky factor of the
//! regularized Gram matrix K + λI (full-rank mode), and a column-pivoted QR
//! of the re-orthogonalized low-rank system W·Wᵀ + K_low + λI (low-rank
//! mode). Both are thin wrappers over nalgebra's decompositions that map
//! decomposition failure onto the crate's numerical error.

use crate::core::{KernelBPError, Result};
use nalgebra::{Cholesky, DMatrix};

/// Lower-triangular L with L·Lᵀ = K + λI.
///
/// Fails with a numerical error when the regularized matrix is not positive
/// definite.
pub fn regularized_cholesky(k: &DMatrix<f64>, lambda: f64) -> Result<DMatrix<f64>> {
    if k.nrows() != k.ncols() {
        return Err(KernelBPError::Shape(format!(
            "Cholesky requires a square matrix, got {}x{}",
            k.nrows(),
            k.ncols()
        )));
    }

    let mut regularized = k.clone();
    for i in 0..regularized.nrows() {
        regularized[(i, i)] += lambda;
    }

    let factor = Cholesky::new(regularized).ok_or_else(|| {
        KernelBPError::Numerical(
            "matrix is not positive definite after regularization".to_string(),
        )
    })?;
    Ok(factor.l())
}

/// Column-pivoted QR decomposition: m[:, pivots] = q·r.
///
/// `pivots` uses the 0-based column index convention: entry k is the index
/// of the original column standing at position k of the pivoted matrix.
#[derive(Debug, Clone)]
pub struct PivotedQr {
    pub q: DMatrix<f64>,
    pub r: DMatrix<f64>,
    pub pivots: Vec<usize>,
}

impl PivotedQr {
    pub fn factorize(m: &DMatrix<f64>) -> Result<Self> {
        if m.nrows() == 0 || m.ncols() == 0 {
            return Err(KernelBPError::Shape(format!(
                "cannot QR-factorize an empty {}x{} matrix",
                m.nrows(),
                m.ncols()
            )));
        }

        let (q, r, permutation) = m.clone().col_piv_qr().unpack();

        // track the column swaps on an index row to recover the pivot vector
        let mut index_row = DMatrix::from_fn(1, m.ncols(), |_, j| j as f64);
        permutation.permute_columns(&mut index_row);
        let pivots = (0..m.ncols())
            .map(|k| index_row[(0, k)] as usize)
            .collect();

        Ok(Self { q, r, pivots })
    }

    /// Column-select of the original matrix by the pivot vector, equal to
    /// q·r up to floating-point error.
    pub fn pivoted(&self, m: &DMatrix<f64>) -> DMatrix<f64> {
        DMatrix::from_fn(m.nrows(), self.pivots.len(), |i, j| {
            m[(i, self.pivots[j])]
        })
    }
}
