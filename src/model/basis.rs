use nalgebra::{DMatrix, SymmetricEigen};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};

const EIGEN_TOL: f64 = 1e-9;

/// Cubic P-spline smooth of GDD split into an unpenalized linear part and
/// `basis_dim - 2` penalized columns with identity penalty.
///
/// The B-spline basis uses equally spaced knots over `[lower, upper]` with a
/// second-order difference penalty `S = D'D`. Writing `S = U Λ U'`, the
/// penalized columns are `B U₊ Λ₊^{-1/2}`; the null space of `S` (constant and
/// linear functions) is carried by the intercept and `linear`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothBasis {
    lower: f64,
    upper: f64,
    basis_dim: usize,
    spacing: f64,
    n_penalized: usize,
    /// Row-major `basis_dim x n_penalized`.
    transform: Vec<f64>,
}

impl SmoothBasis {
    pub fn new(lower: f64, upper: f64, basis_dim: usize) -> AnalysisResult<Self> {
        if basis_dim < 4 {
            return Err(AnalysisError::InvalidConfig(format!(
                "smooth basis dimension must be at least 4, got {}",
                basis_dim
            )));
        }
        if !(lower.is_finite() && upper.is_finite()) || upper <= lower {
            return Err(AnalysisError::InvalidConfig(format!(
                "GDD range [{}, {}] is degenerate; a smooth needs two distinct GDD values",
                lower, upper
            )));
        }

        let eig = SymmetricEigen::new(difference_penalty(basis_dim));
        let max_eval = eig.eigenvalues.iter().copied().fold(0.0f64, f64::max);
        let mut keep: Vec<usize> = (0..basis_dim)
            .filter(|&j| eig.eigenvalues[j] > EIGEN_TOL * max_eval)
            .collect();
        keep.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));
        let n_penalized = basis_dim - 2;
        if keep.len() != n_penalized {
            return Err(AnalysisError::InvalidConfig(format!(
                "smoothing penalty has rank {}, expected {}",
                keep.len(),
                n_penalized
            )));
        }

        let mut transform = vec![0.0; basis_dim * n_penalized];
        for (col, &j) in keep.iter().enumerate() {
            let vector = eig.eigenvectors.column(j);
            // Fix the eigenvector sign so the basis is reproducible.
            let sign = if vector.iter().copied().sum::<f64>() < 0.0 {
                -1.0
            } else {
                1.0
            };
            let scale = sign / eig.eigenvalues[j].sqrt();
            for row in 0..basis_dim {
                transform[row * n_penalized + col] = vector[row] * scale;
            }
        }

        Ok(Self {
            lower,
            upper,
            basis_dim,
            spacing: (upper - lower) / (basis_dim - 3) as f64,
            n_penalized,
            transform,
        })
    }

    pub fn basis_dim(&self) -> usize {
        self.basis_dim
    }

    pub fn n_penalized(&self) -> usize {
        self.n_penalized
    }

    pub fn range(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }

    /// GDD rescaled to [-1, 1] over the fitted range.
    pub fn linear(&self, x: f64) -> f64 {
        let center = 0.5 * (self.lower + self.upper);
        let half_width = 0.5 * (self.upper - self.lower);
        (x - center) / half_width
    }

    /// Raw cubic B-spline values; `out.len()` must equal `basis_dim`.
    pub fn bspline(&self, x: f64, out: &mut [f64]) {
        for (j, value) in out.iter_mut().enumerate().take(self.basis_dim) {
            let left = self.lower + (j as f64 - 3.0) * self.spacing;
            *value = cardinal_cubic((x - left) / self.spacing);
        }
    }

    pub fn penalized(&self, x: f64) -> Vec<f64> {
        let mut b = vec![0.0; self.basis_dim];
        self.bspline(x, &mut b);
        let mut out = vec![0.0; self.n_penalized];
        for (row, &bj) in b.iter().enumerate() {
            if bj == 0.0 {
                continue;
            }
            let t = &self.transform[row * self.n_penalized..(row + 1) * self.n_penalized];
            for (o, &w) in out.iter_mut().zip(t) {
                *o += bj * w;
            }
        }
        out
    }
}

/// Uniform cubic B-spline supported on [0, 4).
fn cardinal_cubic(s: f64) -> f64 {
    if !(0.0..4.0).contains(&s) {
        return 0.0;
    }
    if s < 1.0 {
        s * s * s / 6.0
    } else if s < 2.0 {
        (-3.0 * s * s * s + 12.0 * s * s - 12.0 * s + 4.0) / 6.0
    } else if s < 3.0 {
        (3.0 * s * s * s - 24.0 * s * s + 60.0 * s - 44.0) / 6.0
    } else {
        let r = 4.0 - s;
        r * r * r / 6.0
    }
}

fn difference_penalty(k: usize) -> DMatrix<f64> {
    let mut d = DMatrix::<f64>::zeros(k - 2, k);
    for i in 0..k - 2 {
        d[(i, i)] = 1.0;
        d[(i, i + 1)] = -2.0;
        d[(i, i + 2)] = 1.0;
    }
    d.transpose() * d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bspline_partition_of_unity() {
        let basis = SmoothBasis::new(100.0, 700.0, 10).unwrap();
        let mut b = vec![0.0; 10];
        for x in [100.0, 250.5, 433.3, 699.9, 700.0] {
            basis.bspline(x, &mut b);
            let sum: f64 = b.iter().sum();
            assert!((sum - 1.0).abs() < 1e-12, "sum {} at {}", sum, x);
        }
    }

    #[test]
    fn penalized_columns_ignore_linear_trends() {
        // Coefficients linear in the basis index lie in the penalty null space,
        // so projecting them onto the penalized eigenvectors gives zero.
        let basis = SmoothBasis::new(0.0, 1.0, 8).unwrap();
        let m = basis.n_penalized();
        for col in 0..m {
            let dot: f64 = (0..8)
                .map(|row| basis.transform[row * m + col] * (2.0 + 0.5 * row as f64))
                .sum();
            assert!(dot.abs() < 1e-9);
        }
    }

    #[test]
    fn degenerate_range_rejected() {
        assert!(SmoothBasis::new(5.0, 5.0, 10).is_err());
        assert!(SmoothBasis::new(0.0, 1.0, 3).is_err());
    }
}
