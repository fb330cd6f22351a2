//! Matrix operation helpers
//!
//! Small per-frequency helpers shared by the parameter transforms and the
//! ABCD cascade. All matrices are `[nfreq, n, n]` stacks of complex values.

use ndarray::{s, Array1, Array2, Array3, ArrayView2};
use num_complex::Complex64;

use crate::constants::NEAR_ZERO;
use crate::math::linalg;

/// 2x2 complex matrix in row-major `[[m11, m12], [m21, m22]]` form
pub type Mat2 = [[Complex64; 2]; 2];

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// NaN-filled complex value marking a singular point
pub const NAN_C: Complex64 = Complex64::new(f64::NAN, f64::NAN);

/// The 2x2 identity
pub const IDENTITY_2X2: Mat2 = [[ONE, ZERO], [ZERO, ONE]];

/// Create a diagonal matrix from a slice of values
#[inline]
pub fn diag_matrix(values: &[Complex64]) -> Array2<Complex64> {
    let n = values.len();
    let mut m = Array2::<Complex64>::zeros((n, n));
    for (i, v) in values.iter().enumerate() {
        m[[i, i]] = *v;
    }
    m
}

/// Diagonal matrix of sqrt(z0)
#[inline]
pub fn sqrt_z0_matrix(z0: &Array1<Complex64>) -> Array2<Complex64> {
    let vals: Vec<Complex64> = z0.iter().map(|z| z.sqrt()).collect();
    diag_matrix(&vals)
}

/// Diagonal matrix of 1/sqrt(z0)
#[inline]
pub fn inv_sqrt_z0_matrix(z0: &Array1<Complex64>) -> Array2<Complex64> {
    let vals: Vec<Complex64> = z0.iter().map(|z| ONE / z.sqrt()).collect();
    diag_matrix(&vals)
}

/// Diagonal matrix of z0
#[inline]
pub fn z0_diag_matrix(z0: &Array1<Complex64>) -> Array2<Complex64> {
    let vals: Vec<Complex64> = z0.iter().copied().collect();
    diag_matrix(&vals)
}

/// Invert a 2x2 complex matrix
///
/// Returns None if matrix is singular (determinant near zero).
#[inline]
pub fn invert_2x2(m: &Mat2) -> Option<Mat2> {
    let [[a, b], [c, d]] = *m;
    let det = a * d - b * c;

    if det.norm() < NEAR_ZERO || !det.is_finite() {
        return None;
    }

    let inv_det = ONE / det;
    Some([[d * inv_det, -b * inv_det], [-c * inv_det, a * inv_det]])
}

/// Multiply two 2x2 complex matrices
#[inline]
pub fn mul_2x2(a: &Mat2, b: &Mat2) -> Mat2 {
    [
        [
            a[0][0] * b[0][0] + a[0][1] * b[1][0],
            a[0][0] * b[0][1] + a[0][1] * b[1][1],
        ],
        [
            a[1][0] * b[0][0] + a[1][1] * b[1][0],
            a[1][0] * b[0][1] + a[1][1] * b[1][1],
        ],
    ]
}

/// Determinant of a 2x2 complex matrix
#[inline]
pub fn det_2x2(m: &Mat2) -> Complex64 {
    m[0][0] * m[1][1] - m[0][1] * m[1][0]
}

/// Invert any square complex matrix, using the closed form for 2x2
pub fn invert(m: &ArrayView2<Complex64>) -> Option<Array2<Complex64>> {
    if m.dim() == (2, 2) {
        let inv = invert_2x2(&read_2x2(m))?;
        return Some(from_2x2(&inv));
    }
    linalg::inv_complex(&m.to_owned())
}

/// Copy a 2x2 view into a [`Mat2`]
#[inline]
pub fn read_2x2(m: &ArrayView2<Complex64>) -> Mat2 {
    [[m[[0, 0]], m[[0, 1]]], [m[[1, 0]], m[[1, 1]]]]
}

/// Convert a [`Mat2`] into an owned ndarray matrix
#[inline]
pub fn from_2x2(m: &Mat2) -> Array2<Complex64> {
    Array2::from_shape_fn((2, 2), |(i, j)| m[i][j])
}

/// Frequency slice `f` of a 2x2 stack
#[inline]
pub fn slice_2x2(p: &Array3<Complex64>, f: usize) -> Mat2 {
    read_2x2(&p.slice(s![f, .., ..]))
}

/// Stack of 2x2 identities, one per frequency
pub fn identity_stack(nfreq: usize) -> Array3<Complex64> {
    Array3::from_shape_fn((nfreq, 2, 2), |(_, i, j)| if i == j { ONE } else { ZERO })
}

/// Build a 2x2 stack by evaluating `f` at every frequency index
pub fn stack_2x2<F>(nfreq: usize, mut f: F) -> Array3<Complex64>
where
    F: FnMut(usize) -> Mat2,
{
    let mut out = Array3::<Complex64>::zeros((nfreq, 2, 2));
    for k in 0..nfreq {
        let m = f(k);
        for i in 0..2 {
            for j in 0..2 {
                out[[k, i, j]] = m[i][j];
            }
        }
    }
    out
}

/// Map each 2x2 frequency slice; `None` marks the point singular (NaN-filled)
pub fn map_2x2<F>(p: &Array3<Complex64>, f: F) -> Array3<Complex64>
where
    F: Fn(&Mat2) -> Option<Mat2>,
{
    stack_2x2(p.shape()[0], |k| {
        f(&slice_2x2(p, k)).unwrap_or([[NAN_C; 2]; 2])
    })
}

/// Per-frequency product `a[f] * b[f]` (order matters)
pub fn cascade_2x2(a: &Array3<Complex64>, b: &Array3<Complex64>) -> Array3<Complex64> {
    let nfreq = a.shape()[0].min(b.shape()[0]);
    stack_2x2(nfreq, |k| mul_2x2(&slice_2x2(a, k), &slice_2x2(b, k)))
}

/// `num / den`, or None when the denominator vanishes
#[inline]
pub fn checked_div(num: Complex64, den: Complex64) -> Option<Complex64> {
    if den.norm() < NEAR_ZERO || !den.is_finite() {
        None
    } else {
        Some(num / den)
    }
}
