//! Matrix helpers shared by the error calculations.
//!
//! Arrays are stored as `ndarray` types; inversion is delegated to `nalgebra`.

use ndarray::{Array1, Array2};

/// Convert an ndarray Array2 to a nalgebra DMatrix.
#[cfg(feature = "simplex")]
pub fn ndarray_to_nalgebra(arr: &Array2<f64>) -> nalgebra::DMatrix<f64> {
    nalgebra::DMatrix::from_fn(arr.nrows(), arr.ncols(), |i, j| arr[[i, j]])
}

/// Convert a nalgebra DMatrix to an ndarray Array2.
#[cfg(feature = "simplex")]
pub fn nalgebra_to_ndarray(mat: &nalgebra::DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((mat.nrows(), mat.ncols()), |(i, j)| mat[(i, j)])
}

/// Invert a square matrix, `None` when it is singular.
#[cfg(feature = "simplex")]
pub fn invert(arr: &Array2<f64>) -> Option<Array2<f64>> {
    if arr.nrows() != arr.ncols() {
        return None;
    }
    if arr.nrows() == 0 {
        return Some(Array2::zeros((0, 0)));
    }
    ndarray_to_nalgebra(arr)
        .try_inverse()
        .map(|inv| nalgebra_to_ndarray(&inv))
}

/// Calculate correlation matrix from covariance matrix.
///
/// The correlation matrix is calculated as:
///   correl[i,j] = covar[i,j] / sqrt(covar[i,i] * covar[j,j])
///
/// Rows belonging to fixed parameters (zero variance) have zero correlation
/// with everything, including a zero diagonal.
pub fn calculate_correlation(covar: &Array2<f64>) -> Array2<f64> {
    let n = covar.nrows();
    let mut correl = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..n {
            let denom = (covar[[i, i]] * covar[[j, j]]).sqrt();
            if denom > 0.0 {
                correl[[i, j]] = covar[[i, j]] / denom;
            }
        }
    }

    correl
}

/// Extract standard errors from the covariance matrix.
///
/// Standard errors are the square roots of the diagonal elements
/// of the covariance matrix; non-positive variances give 0.
pub fn standard_errors_from_covariance(covar: &Array2<f64>) -> Array1<f64> {
    covar
        .diag()
        .mapv(|v| if v > 0.0 { v.sqrt() } else { 0.0 })
}
