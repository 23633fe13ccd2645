//! Dense symmetric positive-definite linear algebra.
//!
//! Model fitting only ever needs to solve `A x = b` and invert `A` for small
//! symmetric positive-definite matrices (information matrices, `XᵀX`). The
//! factorization is `faer`'s LLᵀ; this module converts to and from `ndarray`
//! and adds a relative pivot check so that near-singular systems are rejected.

use faer::{
    Mat, Side,
    linalg::solvers::{Llt, Solve as _},
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Relative pivot tolerance below which a matrix is treated as singular.
const PIVOT_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum LinalgError {
    #[display("matrix is not square ({rows}x{cols})")]
    NotSquare { rows: usize, cols: usize },
    #[display("dimension mismatch: matrix is {matrix}x{matrix}, vector has {vector} elements")]
    DimensionMismatch { matrix: usize, vector: usize },
    #[display("matrix is not positive definite")]
    NotPositiveDefinite,
    #[display("matrix is numerically singular (squared pivot {pivot} at column {column})")]
    NearSingular { column: usize, pivot: f64 },
}

/// Cholesky factor `L` with `A = L Lᵀ`.
pub struct Cholesky {
    dim: usize,
    factor: Llt<f64>,
}

impl std::fmt::Debug for Cholesky {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cholesky")
            .field("dim", &self.dim)
            .finish_non_exhaustive()
    }
}

impl Cholesky {
    /// Factorizes a symmetric positive-definite matrix.
    ///
    /// Only the lower triangle of `a` is read.
    ///
    /// # Examples
    ///
    /// ```
    /// use mothsurv_stats::linalg::Cholesky;
    /// use ndarray::array;
    ///
    /// let a = array![[4.0, 2.0], [2.0, 3.0]];
    /// let chol = Cholesky::new(a.view()).unwrap();
    /// let x = chol.solve(array![2.0, 1.0].view()).unwrap();
    /// assert!((x[0] - 0.5).abs() < 1e-12);
    /// assert!(x[1].abs() < 1e-12);
    /// ```
    pub fn new(a: ArrayView2<'_, f64>) -> Result<Self, LinalgError> {
        let (rows, cols) = a.dim();
        if rows != cols {
            return Err(LinalgError::NotSquare { rows, cols });
        }
        let dim = rows;
        let scale = (0..dim).map(|i| a[[i, i]].abs()).fold(0.0_f64, f64::max);
        let tolerance = PIVOT_TOLERANCE * scale.max(f64::MIN_POSITIVE);

        let matrix = Mat::<f64>::from_fn(dim, dim, |i, j| a[[i, j]]);
        let factor = matrix
            .as_ref()
            .llt(Side::Lower)
            .map_err(|_| LinalgError::NotPositiveDefinite)?;

        // faer only rejects non-positive pivots
        let lower = factor.L();
        for column in 0..dim {
            let pivot = lower[(column, column)] * lower[(column, column)];
            if pivot.is_nan() || pivot <= tolerance {
                return Err(LinalgError::NearSingular { column, pivot });
            }
        }
        Ok(Self { dim, factor })
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Solves `A x = b`.
    pub fn solve(&self, b: ArrayView1<'_, f64>) -> Result<Array1<f64>, LinalgError> {
        if b.len() != self.dim {
            return Err(LinalgError::DimensionMismatch {
                matrix: self.dim,
                vector: b.len(),
            });
        }
        let rhs = Mat::<f64>::from_fn(self.dim, 1, |i, _| b[i]);
        let x = self.factor.solve(&rhs);
        Ok(Array1::from_shape_fn(self.dim, |i| x[(i, 0)]))
    }

    /// Computes `A⁻¹`.
    #[must_use]
    pub fn inverse(&self) -> Array2<f64> {
        let n = self.dim;
        let inv = self.factor.solve(&Mat::<f64>::identity(n, n));
        // symmetrize away rounding noise
        Array2::from_shape_fn((n, n), |(i, j)| 0.5 * (inv[(i, j)] + inv[(j, i)]))
    }
}

/// Quadratic form `uᵀ A u`.
#[must_use]
pub fn quadratic_form(u: ArrayView1<'_, f64>, a: ArrayView2<'_, f64>) -> f64 {
    u.dot(&a.dot(&u))
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn test_inverse_of_known_matrix() {
        let a = array![[4.0, 12.0, -16.0], [12.0, 37.0, -43.0], [-16.0, -43.0, 98.0]];
        let chol = Cholesky::new(a.view()).unwrap();
        let inv = chol.inverse();
        let identity = a.dot(&inv);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!(
                    (identity[[i, j]] - expected).abs() < 1e-9,
                    "A * A^-1 [{i},{j}] = {}",
                    identity[[i, j]]
                );
            }
        }
        // L = [[2, 0, 0], [6, 1, 0], [-8, 5, 3]]
        assert!((inv[[2, 2]] - 1.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_singular_matrix_is_rejected() {
        let a = array![[1.0, 1.0], [1.0, 1.0]];
        assert!(matches!(
            Cholesky::new(a.view()),
            Err(LinalgError::NotPositiveDefinite | LinalgError::NearSingular { column: 1, .. })
        ));
    }

    #[test]
    fn test_nearly_aliased_columns_are_rejected() {
        // XᵀX of two columns that differ only by rounding noise
        let eps = 1e-9;
        let a = array![[2.0, 2.0 + eps], [2.0 + eps, 2.0 + 2.0 * eps]];
        assert!(Cholesky::new(a.view()).is_err());
    }

    #[test]
    fn test_indefinite_matrix_is_rejected() {
        let a = array![[1.0, 2.0], [2.0, 1.0]];
        assert!(Cholesky::new(a.view()).is_err());
    }

    #[test]
    fn test_not_square() {
        let a = Array2::<f64>::zeros((2, 3));
        assert_eq!(
            Cholesky::new(a.view()).unwrap_err(),
            LinalgError::NotSquare { rows: 2, cols: 3 }
        );
    }

    #[test]
    fn test_solve_dimension_mismatch() {
        let a = array![[2.0, 0.0], [0.0, 2.0]];
        let chol = Cholesky::new(a.view()).unwrap();
        assert!(chol.solve(array![1.0, 2.0, 3.0].view()).is_err());
    }

    #[test]
    fn test_quadratic_form() {
        let a = array![[2.0, 1.0], [1.0, 3.0]];
        let u = array![1.0, 2.0];
        // 2 + 2*1*2 + 3*4 = 18
        assert!((quadratic_form(u.view(), a.view()) - 18.0).abs() < 1e-12);
    }
}
