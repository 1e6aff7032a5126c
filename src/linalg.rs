//! Dense linear algebra for the small square matrices used by the mixture model.
//!
//! Factorizations come from nalgebra; matrices cross the `ndarray` boundary by
//! copy, which is cheap at D×D. Singularity is judged on the LU pivots relative
//! to the largest one, so the verdict does not depend on the scale of the data.

use crate::error::{ClusterError, Result};
use nalgebra::linalg::LU;
use nalgebra::{Cholesky, DMatrix, Dyn, SymmetricEigen};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// A matrix is singular when its smallest LU pivot is at most this fraction
/// of its largest one.
pub const SINGULARITY_TOLERANCE: f64 = 1e-10;

const SYMMETRY_TOLERANCE: f64 = 1e-9;

fn to_dmatrix(m: &ArrayView2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(m.nrows(), m.ncols(), |i, j| m[[i, j]])
}

fn to_array(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

fn check_square(m: &ArrayView2<f64>) -> Result<usize> {
    let (rows, cols) = m.dim();
    if rows != cols {
        return Err(ClusterError::InvalidDimensions(format!(
            "Expected a square matrix, got {}x{}",
            rows, cols
        )));
    }
    if rows == 0 {
        return Err(ClusterError::InvalidDimensions(
            "Expected a non-empty matrix".to_string(),
        ));
    }
    Ok(rows)
}

struct Factorization {
    lu: LU<f64, Dyn, Dyn>,
    pivot_magnitudes: Vec<f64>,
}

impl Factorization {
    fn new(m: &ArrayView2<f64>) -> Result<Self> {
        check_square(m)?;
        let lu = to_dmatrix(m).lu();
        let pivot_magnitudes = lu.u().diagonal().iter().map(|p| p.abs()).collect();
        Ok(Self {
            lu,
            pivot_magnitudes,
        })
    }

    fn determinant(&self) -> f64 {
        self.lu.determinant()
    }

    fn is_singular(&self) -> bool {
        let largest = self.pivot_magnitudes.iter().cloned().fold(0.0, f64::max);
        let smallest = self
            .pivot_magnitudes
            .iter()
            .cloned()
            .fold(f64::INFINITY, f64::min);

        let finite = self.pivot_magnitudes.iter().all(|p| p.is_finite());
        !finite || largest == 0.0 || smallest <= SINGULARITY_TOLERANCE * largest
    }

    fn singular_error(&self) -> ClusterError {
        ClusterError::SingularMatrix {
            determinant: self.determinant(),
        }
    }
}

/// Determinant of a square matrix
pub fn determinant(m: &ArrayView2<f64>) -> Result<f64> {
    Ok(Factorization::new(m)?.determinant())
}

/// Inverse of a square matrix
///
/// # Errors
///
/// Returns `ClusterError::SingularMatrix` when the smallest LU pivot is within
/// [`SINGULARITY_TOLERANCE`] of the largest, i.e. the matrix is rank deficient
/// up to rounding.
pub fn inverse(m: &ArrayView2<f64>) -> Result<Array2<f64>> {
    let factorization = Factorization::new(m)?;
    if factorization.is_singular() {
        return Err(factorization.singular_error());
    }

    let determinant = factorization.determinant();
    factorization
        .lu
        .try_inverse()
        .map(|inv| to_array(&inv))
        .ok_or(ClusterError::SingularMatrix { determinant })
}

/// Natural log of the determinant of a symmetric positive definite matrix.
///
/// Rank deficiency is checked first and reported as `SingularMatrix`; a
/// full-rank matrix without a Cholesky factor gives `NotPositiveDefinite`.
/// The result stays finite where the determinant itself would underflow.
pub fn log_determinant_spd(m: &ArrayView2<f64>) -> Result<f64> {
    let factorization = Factorization::new(m)?;
    if factorization.is_singular() {
        return Err(factorization.singular_error());
    }

    let cholesky = Cholesky::new(to_dmatrix(m)).ok_or(ClusterError::NotPositiveDefinite {
        determinant: factorization.determinant(),
    })?;
    Ok(2.0 * cholesky.l_dirty().diagonal().iter().map(|l| l.ln()).sum::<f64>())
}

/// Eigen-decomposition of a symmetric matrix.
///
/// Returns eigenvalues in ascending order and the matching unit eigenvectors
/// as the columns of the second array.
pub fn eigh(m: &ArrayView2<f64>) -> Result<(Array1<f64>, Array2<f64>)> {
    let n = check_square(m)?;

    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = (m[[i, j]], m[[j, i]]);
            if (a - b).abs() > SYMMETRY_TOLERANCE * (1.0 + a.abs().max(b.abs())) {
                return Err(ClusterError::InvalidParameter(format!(
                    "Matrix is not symmetric at ({}, {})",
                    i, j
                )));
            }
        }
    }

    let eigen = SymmetricEigen::new(to_dmatrix(m));

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| eigen.eigenvalues[i].total_cmp(&eigen.eigenvalues[j]));

    let eigenvalues = Array1::from_iter(order.iter().map(|&i| eigen.eigenvalues[i]));
    let eigenvectors = Array2::from_shape_fn((n, n), |(row, col)| {
        eigen.eigenvectors[(row, order[col])]
    });

    Ok((eigenvalues, eigenvectors))
}

/// Outer product `a bᵀ`
pub fn outer_product(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> Array2<f64> {
    Array2::from_shape_fn((a.len(), b.len()), |(i, j)| a[i] * b[j])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_determinant() {
        let m = array![[2.0, -3.0, 1.0], [2.0, 0.0, -1.0], [1.0, 4.0, 5.0]];
        assert_relative_eq!(determinant(&m.view()).unwrap(), 49.0, epsilon = 1e-10);

        // Needs a row swap to pivot
        let m = array![[0.0, 1.0], [1.0, 0.0]];
        assert_relative_eq!(determinant(&m.view()).unwrap(), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_roundtrip_identity() {
        let m = array![[4.0, 1.0, 0.5], [1.0, 3.0, 0.2], [0.5, 0.2, 2.0]];
        let inv = inverse(&m.view()).unwrap();
        let product = m.dot(&inv);

        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(product[[i, j]], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_inverse_singular() {
        let m = array![[1.0, 2.0], [2.0, 4.0]];
        let result = inverse(&m.view());
        assert!(matches!(result, Err(ClusterError::SingularMatrix { .. })));
    }

    #[test]
    fn test_inverse_is_scale_invariant() {
        // Perfectly conditioned, tiny determinant
        let m = Array2::<f64>::eye(4) * 1e-4;
        let inv = inverse(&m.view()).unwrap();
        for i in 0..4 {
            assert_relative_eq!(inv[[i, i]], 1e4, epsilon = 1e-6);
        }

        let spd = array![[4.0, 1.0], [1.0, 3.0]];
        for scale in [1e-6, 1.0, 1e6] {
            let scaled = &spd * scale;
            assert!(inverse(&scaled.view()).is_ok(), "scale {}", scale);
        }
    }

    #[test]
    fn test_rank_deficient_is_singular_at_any_scale() {
        // v vᵀ + w wᵀ has rank 2 in three dimensions
        let v = array![0.3, 1.7, -0.9];
        let w = array![1.1, -0.4, 0.6];
        for scale in [1e-3, 1.0, 10.0, 100.0, 1e3] {
            let m = (outer_product(&v.view(), &v.view()) + outer_product(&w.view(), &w.view()))
                * scale;
            assert!(
                matches!(inverse(&m.view()), Err(ClusterError::SingularMatrix { .. })),
                "scale {}",
                scale
            );
            assert!(
                matches!(
                    log_determinant_spd(&m.view()),
                    Err(ClusterError::SingularMatrix { .. })
                ),
                "scale {}",
                scale
            );
        }
    }

    #[test]
    fn test_log_determinant_spd() {
        let m = array![[2.0, 0.5], [0.5, 1.0]];
        assert_relative_eq!(
            log_determinant_spd(&m.view()).unwrap(),
            1.75f64.ln(),
            epsilon = 1e-12
        );

        // Would underflow as a plain determinant
        let tiny = Array2::<f64>::eye(40) * 1e-10;
        assert_relative_eq!(
            log_determinant_spd(&tiny.view()).unwrap(),
            40.0 * 1e-10f64.ln(),
            epsilon = 1e-9
        );

        // Full rank but indefinite
        let indefinite = array![[1.0, 2.0], [2.0, 1.0]];
        assert!(matches!(
            log_determinant_spd(&indefinite.view()),
            Err(ClusterError::NotPositiveDefinite { .. })
        ));
    }

    #[test]
    fn test_non_square_rejected() {
        let m = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        assert!(matches!(
            determinant(&m.view()),
            Err(ClusterError::InvalidDimensions(_))
        ));
        assert!(matches!(
            inverse(&m.view()),
            Err(ClusterError::InvalidDimensions(_))
        ));
    }

    #[test]
    fn test_eigh_2x2() {
        let m = array![[2.0, 1.0], [1.0, 2.0]];
        let (values, vectors) = eigh(&m.view()).unwrap();

        assert_relative_eq!(values[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(values[1], 3.0, epsilon = 1e-12);

        // Eigenvector of 3 is along (1, 1)
        let v = vectors.column(1);
        assert_relative_eq!(v[0].abs(), v[1].abs(), epsilon = 1e-12);
        assert_relative_eq!(v.dot(&v), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_eigh_reconstructs_matrix() {
        let m = array![
            [4.0, 1.0, -2.0, 0.5],
            [1.0, 3.0, 0.0, 1.5],
            [-2.0, 0.0, 5.0, -1.0],
            [0.5, 1.5, -1.0, 2.0]
        ];
        let (values, vectors) = eigh(&m.view()).unwrap();

        for w in values.as_slice().unwrap().windows(2) {
            assert!(w[0] <= w[1]);
        }

        let rebuilt = vectors.dot(&Array2::from_diag(&values)).dot(&vectors.t());
        for (a, b) in rebuilt.iter().zip(m.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_eigh_rejects_asymmetric() {
        let m = array![[1.0, 2.0], [0.0, 1.0]];
        assert!(matches!(
            eigh(&m.view()),
            Err(ClusterError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_outer_product() {
        let a = array![1.0, 2.0];
        let b = array![3.0, 4.0, 5.0];
        let outer = outer_product(&a.view(), &b.view());
        assert_eq!(outer, array![[3.0, 4.0, 5.0], [6.0, 8.0, 10.0]]);
    }
}
