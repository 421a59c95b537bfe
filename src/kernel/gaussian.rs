//! Gaussian kernel implementation
//!
//! The Gaussian kernel is defined as: k(x, y) = exp(-0.5 * ||x - y||² / σ²)
//! where σ (sigma) is the bandwidth. A median heuristic is provided for
//! choosing σ from data.

use crate::core::{KernelBPError, KernelFunction, Result};
use nalgebra::{DMatrix, RowDVector};

/// Gaussian kernel: k(x, y) = exp(-0.5 * ||x - y||² / σ²)
///
/// Self-evaluation k(x, x) is always 1, so Gram matrices of a single sample
/// set have a unit diagonal, a property the incomplete factorizer relies on.
#[derive(Debug, Clone, Copy)]
pub struct GaussianKernel {
    sigma: f64,
}

impl GaussianKernel {
    /// Create a new Gaussian kernel with the given bandwidth.
    ///
    /// Fails with a parameter error unless sigma is positive and finite.
    pub fn new(sigma: f64) -> Result<Self> {
        if !(sigma > 0.0 && sigma.is_finite()) {
            return Err(KernelBPError::Parameter(format!(
                "sigma must be positive and finite, got {}",
                sigma
            )));
        }
        Ok(Self { sigma })
    }

    /// Get the bandwidth parameter.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Median heuristic for the bandwidth:
    /// σ = sqrt(0.5 · median(nonzero pairwise Euclidean distances in `x`)).
    ///
    /// Fails when all pairwise distances are zero (the heuristic is
    /// undefined for degenerate sample sets).
    pub fn sigma_median_heuristic(x: &DMatrix<f64>) -> Result<f64> {
        let n = x.nrows();
        let mut distances = Vec::with_capacity(n.saturating_sub(1) * n / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                let dist = squared_row_distance(x, i, x, j).sqrt();
                if dist > 0.0 {
                    distances.push(dist);
                }
            }
        }

        if distances.is_empty() {
            return Err(KernelBPError::Numerical(
                "all pairwise distances are zero, median heuristic is undefined".to_string(),
            ));
        }

        distances.sort_by(|a, b| a.total_cmp(b));
        let mid = distances.len() / 2;
        let median = if distances.len() % 2 == 0 {
            0.5 * (distances[mid - 1] + distances[mid])
        } else {
            distances[mid]
        };

        Ok((0.5 * median).sqrt())
    }

    fn evaluate(&self, squared_distance: f64) -> f64 {
        (-0.5 * squared_distance / (self.sigma * self.sigma)).exp()
    }
}

impl KernelFunction for GaussianKernel {
    fn gram(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        check_samples(x)?;

        let n = x.nrows();
        let mut k = DMatrix::zeros(n, n);
        // k(x, x) = 1; off-diagonal entries are mirrored
        for i in 0..n {
            k[(i, i)] = 1.0;
            for j in (i + 1)..n {
                let value = self.evaluate(squared_row_distance(x, i, x, j));
                k[(i, j)] = value;
                k[(j, i)] = value;
            }
        }
        Ok(k)
    }

    fn cross_gram(&self, x: &DMatrix<f64>, y: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        check_samples(x)?;
        check_samples(y)?;
        if x.ncols() != y.ncols() {
            return Err(KernelBPError::Shape(format!(
                "sample dimension mismatch: {} vs {}",
                x.ncols(),
                y.ncols()
            )));
        }

        let mut k = DMatrix::zeros(x.nrows(), y.nrows());
        for i in 0..x.nrows() {
            for j in 0..y.nrows() {
                k[(i, j)] = self.evaluate(squared_row_distance(x, i, y, j));
            }
        }
        Ok(k)
    }

    fn row(&self, pivot: usize, x: &DMatrix<f64>) -> Result<RowDVector<f64>> {
        check_samples(x)?;
        if pivot >= x.nrows() {
            return Err(KernelBPError::Shape(format!(
                "pivot index {} out of range for {} samples",
                pivot,
                x.nrows()
            )));
        }

        let mut row = RowDVector::zeros(x.nrows());
        for j in 0..x.nrows() {
            row[j] = self.evaluate(squared_row_distance(x, pivot, x, j));
        }
        Ok(row)
    }
}

fn check_samples(x: &DMatrix<f64>) -> Result<()> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(KernelBPError::Shape(format!(
            "sample set must be a non-empty 2d array, got {}x{}",
            x.nrows(),
            x.ncols()
        )));
    }
    Ok(())
}

/// Squared Euclidean distance between row `i` of `x` and row `j` of `y`.
fn squared_row_distance(x: &DMatrix<f64>, i: usize, y: &DMatrix<f64>, j: usize) -> f64 {
    let mut distance_sq = 0.0;
    for c in 0..x.ncols() {
        let diff = x[(i, c)] - y[(j, c)];
        distance_sq += diff * diff;
    }
    distance_sq
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_kernel_creation() {
        let kernel = GaussianKernel::new(0.5).unwrap();
        assert_eq!(kernel.sigma(), 0.5);

        assert!(GaussianKernel::new(0.0).is_err());
        assert!(GaussianKernel::new(-1.0).is_err());
        assert!(GaussianKernel::new(f64::NAN).is_err());
        assert!(GaussianKernel::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_gram_symmetric_with_unit_diagonal() {
        let kernel = GaussianKernel::new(1.3).unwrap();
        let x = DMatrix::from_row_slice(4, 2, &[0.0, 1.0, 2.0, -1.0, 0.5, 0.5, -3.0, 2.0]);
        let k = kernel.gram(&x).unwrap();

        assert_eq!(k.nrows(), 4);
        assert_eq!(k.ncols(), 4);
        for i in 0..4 {
            assert_relative_eq!(k[(i, i)], 1.0);
            for j in 0..4 {
                assert_eq!(k[(i, j)], k[(j, i)]);
                assert!(k[(i, j)] > 0.0 && k[(i, j)] <= 1.0);
            }
        }
    }

    #[test]
    fn test_kernel_value() {
        // k(x, y) = exp(-0.5 * 4 / 4) = exp(-0.5) for ||x - y|| = 2, sigma = 2
        let kernel = GaussianKernel::new(2.0).unwrap();
        let x = DMatrix::from_row_slice(1, 1, &[1.0]);
        let y = DMatrix::from_row_slice(1, 1, &[3.0]);
        let k = kernel.cross_gram(&x, &y).unwrap();
        assert_relative_eq!(k[(0, 0)], (-0.5f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_cross_gram_rectangular() {
        let kernel = GaussianKernel::new(1.0).unwrap();
        let x = DMatrix::from_row_slice(3, 1, &[0.0, 1.0, 2.0]);
        let y = DMatrix::from_row_slice(2, 1, &[0.5, 1.5]);
        let k = kernel.cross_gram(&x, &y).unwrap();

        assert_eq!((k.nrows(), k.ncols()), (3, 2));
        for i in 0..3 {
            for j in 0..2 {
                let diff = x[(i, 0)] - y[(j, 0)];
                assert_relative_eq!(k[(i, j)], (-0.5 * diff * diff).exp(), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_cross_gram_dimension_mismatch() {
        let kernel = GaussianKernel::new(1.0).unwrap();
        let x = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 2.0, 3.0]);
        let y = DMatrix::from_row_slice(2, 1, &[0.5, 1.5]);
        assert!(matches!(
            kernel.cross_gram(&x, &y),
            Err(KernelBPError::Shape(_))
        ));
    }

    #[test]
    fn test_empty_sample_set_is_rejected() {
        let kernel = GaussianKernel::new(1.0).unwrap();
        let empty = DMatrix::<f64>::zeros(0, 1);
        assert!(matches!(kernel.gram(&empty), Err(KernelBPError::Shape(_))));
    }

    #[test]
    fn test_row_matches_gram_row() {
        let kernel = GaussianKernel::new(0.7).unwrap();
        let x = DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 1.0, 1.0, -1.0, 2.0]);
        let k = kernel.gram(&x).unwrap();
        for pivot in 0..3 {
            let row = kernel.row(pivot, &x).unwrap();
            for j in 0..3 {
                assert_relative_eq!(row[j], k[(pivot, j)], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_row_pivot_out_of_range() {
        let kernel = GaussianKernel::new(1.0).unwrap();
        let x = DMatrix::from_row_slice(2, 1, &[0.0, 1.0]);
        assert!(matches!(kernel.row(2, &x), Err(KernelBPError::Shape(_))));
    }

    #[test]
    fn test_sigma_median_heuristic() {
        // distances: |0-1| = 1, |0-3| = 3, |1-3| = 2 -> median 2
        let x = DMatrix::from_row_slice(3, 1, &[0.0, 1.0, 3.0]);
        let sigma = GaussianKernel::sigma_median_heuristic(&x).unwrap();
        assert_relative_eq!(sigma, (0.5 * 2.0f64).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_sigma_median_heuristic_even_count_interpolates() {
        // distances: 1, 2, 3, 1, 2, 1 -> sorted [1, 1, 1, 2, 2, 3], median 1.5
        let x = DMatrix::from_row_slice(4, 1, &[0.0, 1.0, 2.0, 3.0]);
        let sigma = GaussianKernel::sigma_median_heuristic(&x).unwrap();
        assert_relative_eq!(sigma, (0.5 * 1.5f64).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_sigma_median_heuristic_ignores_zero_distances() {
        let x = DMatrix::from_row_slice(3, 1, &[2.0, 2.0, 5.0]);
        let sigma = GaussianKernel::sigma_median_heuristic(&x).unwrap();
        // nonzero distances are [3, 3], median 3
        assert_relative_eq!(sigma, (0.5 * 3.0f64).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_sigma_median_heuristic_degenerate_fails() {
        let x = DMatrix::from_row_slice(3, 1, &[1.0, 1.0, 1.0]);
        assert!(matches!(
            GaussianKernel::sigma_median_heuristic(&x),
            Err(KernelBPError::Numerical(_))
        ));
    }
}
