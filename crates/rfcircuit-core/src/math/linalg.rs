//! Linear algebra operations
//!
//! Dense inversion and LU solves backed by nalgebra. All ndarray <-> nalgebra
//! conversions are contained here so callers only ever see ndarray types.

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};
use num_complex::Complex64;

// ============================================================================
// Conversion helpers (internal)
// ============================================================================

/// Convert ndarray Array2<Complex64> to nalgebra DMatrix<Complex<f64>>
#[inline]
fn to_na_complex(a: &Array2<Complex64>) -> DMatrix<nalgebra::Complex<f64>> {
    let (m, n) = a.dim();
    DMatrix::from_fn(m, n, |i, j| nalgebra::Complex::new(a[[i, j]].re, a[[i, j]].im))
}

/// Convert nalgebra DMatrix<Complex<f64>> to ndarray Array2<Complex64>
#[inline]
fn from_na_complex(m: &DMatrix<nalgebra::Complex<f64>>) -> Array2<Complex64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| {
        Complex64::new(m[(i, j)].re, m[(i, j)].im)
    })
}

/// Convert ndarray Array2<f64> to nalgebra DMatrix<f64>
#[inline]
fn to_na_real(a: &Array2<f64>) -> DMatrix<f64> {
    let (m, n) = a.dim();
    DMatrix::from_fn(m, n, |i, j| a[[i, j]])
}

// ============================================================================
// Matrix inversion
// ============================================================================

/// Invert a complex matrix
///
/// Returns None if matrix is singular or non-square.
pub fn inv_complex(a: &Array2<Complex64>) -> Option<Array2<Complex64>> {
    let (m, n) = a.dim();
    if m != n || m == 0 {
        return None;
    }

    let mat = to_na_complex(a);
    mat.try_inverse().map(|inv| from_na_complex(&inv))
}

// ============================================================================
// Linear solves
// ============================================================================

/// Solve the complex system `A x = b` by LU decomposition
///
/// Returns None if the matrix is singular, non-square, or the solution is
/// not finite.
pub fn solve_complex(a: &Array2<Complex64>, b: &Array1<Complex64>) -> Option<Array1<Complex64>> {
    let (m, n) = a.dim();
    if m != n || m == 0 || b.len() != m {
        return None;
    }

    let rhs = DVector::from_fn(m, |i, _| nalgebra::Complex::new(b[i].re, b[i].im));
    let x = to_na_complex(a).lu().solve(&rhs)?;
    let x: Array1<Complex64> = x.iter().map(|v| Complex64::new(v.re, v.im)).collect();
    x.iter().all(|v| v.is_finite()).then_some(x)
}

/// Solve the real system `A x = b` by LU decomposition
pub fn solve_real(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let (m, n) = a.dim();
    if m != n || m == 0 || b.len() != m {
        return None;
    }

    let rhs = DVector::from_fn(m, |i, _| b[i]);
    let x = to_na_real(a).lu().solve(&rhs)?;
    let x: Array1<f64> = x.iter().copied().collect();
    x.iter().all(|v| v.is_finite()).then_some(x)
}
