//! Incomplete (pivoted greedy) Cholesky factorization
//!
//! Low-rank approximate factorization of a kernel Gram matrix. The Gram
//! matrix is never materialized: each iteration evaluates one kernel row on
//! demand for the greedily selected pivot, subtracts the component already
//! explained by the previous basis rows, and keeps a residual diagonal that
//! drives both pivot selection and termination. Assumes a unit self-kernel,
//! so the residual diagonal starts at one.

use crate::core::{KernelBPError, KernelFunction, Result};
use crate::factorization::RowStore;
use nalgebra::DMatrix;

/// Result of an incomplete Cholesky factorization of rank r over n samples.
#[derive(Debug, Clone)]
pub struct IncompleteCholeskyFactors {
    /// Selected pivot indices, in insertion order.
    pub pivots: Vec<usize>,
    /// Low-rank factor R (r×n) with RᵀR ≈ K.
    pub factor: DMatrix<f64>,
    /// K_low (r×r): the evaluated kernel rows restricted to pivot columns.
    pub pivot_gram: DMatrix<f64>,
    /// Reconstruction weights W (r×n), solving R[:, pivots]·W = R, so that
    /// Wᵀ·K_low·W ≈ K.
    pub weights: DMatrix<f64>,
}

impl IncompleteCholeskyFactors {
    /// Approximation rank r.
    pub fn rank(&self) -> usize {
        self.pivots.len()
    }
}

/// Incomplete Cholesky factorizer over an implicit kernel Gram matrix.
pub struct IncompleteCholesky<'a, K: KernelFunction> {
    kernel: &'a K,
    eta: f64,
    power: u32,
    blocksize: usize,
}

impl<'a, K: KernelFunction> IncompleteCholesky<'a, K> {
    /// Default growth increment for the internal row buffers.
    pub const DEFAULT_BLOCKSIZE: usize = 100;

    /// Create a factorizer with precision cutoff `eta`.
    ///
    /// `eta` must lie in (0, 1), exclusive; smaller means more accurate.
    /// Defaults: `power` 1, `blocksize` 100.
    pub fn new(kernel: &'a K, eta: f64) -> Result<Self> {
        if !(eta > 0.0 && eta < 1.0) {
            return Err(KernelBPError::Parameter(format!(
                "eta must lie in (0, 1), got {}",
                eta
            )));
        }
        Ok(Self {
            kernel,
            eta,
            power: 1,
            blocksize: Self::DEFAULT_BLOCKSIZE,
        })
    }

    /// Raise every kernel evaluation elementwise to this power.
    ///
    /// A power of zero degenerates every kernel value to one.
    pub fn with_power(mut self, power: u32) -> Self {
        self.power = power;
        self
    }

    /// Set the row-block growth increment of the working buffers.
    pub fn with_blocksize(mut self, blocksize: usize) -> Self {
        self.blocksize = blocksize;
        self
    }

    /// Run the greedy pivoted factorization over sample set `x`.
    pub fn factorize(&self, x: &DMatrix<f64>) -> Result<IncompleteCholeskyFactors> {
        let n = x.nrows();
        if n == 0 {
            return Err(KernelBPError::Parameter(
                "cannot factorize an empty sample set".to_string(),
            ));
        }

        // residual diagonal; unit self-kernel assumed
        let mut d = vec![1.0; n];
        let mut pivots = vec![argmax(&d)];

        let mut kernel_rows = RowStore::new(n, self.blocksize);
        let mut factor_rows = RowStore::new(n, self.blocksize);

        let mut residual = 1.0;
        let mut j = 0;
        // the rank can never exceed n; the cap guards against eta below the
        // floating-point residual floor
        while residual > self.eta && j < n {
            let pivot = pivots[j];
            let nu = residual.sqrt();

            let kernel_row: Vec<f64> = if self.power >= 1 {
                let row = self.kernel.row(pivot, x)?;
                row.iter().map(|v| v.powi(self.power as i32)).collect()
            } else {
                vec![1.0; n]
            };

            // component of the pivot row already explained by the basis
            let basis_at_pivot: Vec<f64> =
                (0..j).map(|i| factor_rows.row(i)[pivot]).collect();
            let mut factor_row = vec![0.0; n];
            for col in 0..n {
                let mut explained = 0.0;
                for (i, &weight) in basis_at_pivot.iter().enumerate() {
                    explained += factor_rows.row(i)[col] * weight;
                }
                factor_row[col] = (kernel_row[col] - explained) / nu;
            }

            for col in 0..n {
                d[col] -= factor_row[col] * factor_row[col];
            }

            kernel_rows.push_row(&kernel_row);
            factor_rows.push_row(&factor_row);
            j += 1;

            let next = argmax(&d);
            residual = d[next];
            pivots.push(next);
        }

        // the last pivot is speculative and never evaluated
        pivots.truncate(j);

        let factor = factor_rows.into_matrix();
        let kernel_block = kernel_rows.into_matrix();
        let pivot_gram = select_columns(&kernel_block, &pivots);
        let factor_at_pivots = select_columns(&factor, &pivots);

        let weights = factor_at_pivots
            .lu()
            .solve(&factor)
            .ok_or_else(|| {
                KernelBPError::Numerical(
                    "singular pivot system in incomplete Cholesky reconstruction".to_string(),
                )
            })?;

        Ok(IncompleteCholeskyFactors {
            pivots,
            factor,
            pivot_gram,
            weights,
        })
    }
}

/// Index of the maximum entry, first occurrence on ties.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

fn select_columns(m: &DMatrix<f64>, columns: &[usize]) -> DMatrix<f64> {
    DMatrix::from_fn(m.nrows(), columns.len(), |i, j| m[(i, columns[j])])
}
