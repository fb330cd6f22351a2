//! Network parameter transformation functions
//!
//! Conversions between S, Z, Y and ABCD parameters, all operating on
//! `[nfreq, nports, nports]` stacks. S-parameters use the pseudo-wave
//! definition with per-port reference impedance `z0`:
//! `a = (V + z0 I) / (2 sqrt(z0))`, `b = (V - z0 I) / (2 sqrt(z0))`.
//!
//! A frequency point where a conversion is singular is filled with NaN
//! rather than aborting the sweep; [`singular_points`] lists those points.

use ndarray::{s, Array1, Array2, Array3};
use num_complex::Complex64;

use super::matrix_ops::{
    checked_div, det_2x2, diag_matrix, invert, map_2x2, sqrt_z0_matrix, inv_sqrt_z0_matrix,
    z0_diag_matrix, Mat2, NAN_C,
};

const ONE: Complex64 = Complex64::new(1.0, 0.0);
const TWO: Complex64 = Complex64::new(2.0, 0.0);

/// Apply a per-frequency n-port conversion, NaN-filling failed points
fn map_nport<F>(p: &Array3<Complex64>, f: F) -> Array3<Complex64>
where
    F: Fn(&Array2<Complex64>) -> Option<Array2<Complex64>>,
{
    let nfreq = p.shape()[0];
    let nports = p.shape()[1];
    let mut out = Array3::<Complex64>::zeros((nfreq, nports, nports));

    for k in 0..nfreq {
        let slice = p.slice(s![k, .., ..]).to_owned();
        match f(&slice) {
            Some(m) => out.slice_mut(s![k, .., ..]).assign(&m),
            None => out.slice_mut(s![k, .., ..]).fill(NAN_C),
        }
    }
    out
}

// ============================================================================
// S <-> Z <-> Y (any port count)
// ============================================================================

/// Convert S-parameters to Z-parameters
///
/// Formula: Z = F * (I + S) * inv(I - S) * F, where F = diag(sqrt(z0))
pub fn s2z(s: &Array3<Complex64>, z0: &Array1<Complex64>) -> Array3<Complex64> {
    let nports = s.shape()[1];
    debug_assert_eq!(nports, z0.len(), "z0 length must match number of ports");

    let identity = Array2::<Complex64>::eye(nports);
    let f_mat = sqrt_z0_matrix(z0);

    map_nport(s, |s_f| {
        let inv_i_minus_s = invert(&(&identity - s_f).view())?;
        Some(f_mat.dot(&(&identity + s_f)).dot(&inv_i_minus_s).dot(&f_mat))
    })
}

/// Convert Z-parameters to S-parameters
///
/// Formula: S = F^-1 * (Z - G) * inv(Z + G) * F, where G = diag(z0)
pub fn z2s(z: &Array3<Complex64>, z0: &Array1<Complex64>) -> Array3<Complex64> {
    debug_assert_eq!(z.shape()[1], z0.len());

    let f_mat = sqrt_z0_matrix(z0);
    let inv_f_mat = inv_sqrt_z0_matrix(z0);
    let g = z0_diag_matrix(z0);

    map_nport(z, |z_f| {
        let inv_term = invert(&(z_f + &g).view())?;
        Some(inv_f_mat.dot(&(z_f - &g)).dot(&inv_term).dot(&f_mat))
    })
}

/// Convert S-parameters to Y-parameters
///
/// Formula: Y = F^-1 * (I - S) * inv(I + S) * F^-1
pub fn s2y(s: &Array3<Complex64>, z0: &Array1<Complex64>) -> Array3<Complex64> {
    let nports = s.shape()[1];
    debug_assert_eq!(nports, z0.len());

    let identity = Array2::<Complex64>::eye(nports);
    let g_mat = inv_sqrt_z0_matrix(z0);

    map_nport(s, |s_f| {
        let inv_i_plus_s = invert(&(&identity + s_f).view())?;
        Some(g_mat.dot(&(&identity - s_f)).dot(&inv_i_plus_s).dot(&g_mat))
    })
}

/// Convert Y-parameters to S-parameters
///
/// Formula: S = (I - Y') * inv(I + Y'), where Y' = F * Y * F
pub fn y2s(y: &Array3<Complex64>, z0: &Array1<Complex64>) -> Array3<Complex64> {
    let nports = y.shape()[1];
    debug_assert_eq!(nports, z0.len());

    let identity = Array2::<Complex64>::eye(nports);
    let f_mat = sqrt_z0_matrix(z0);

    map_nport(y, |y_f| {
        let y_prime = f_mat.dot(y_f).dot(&f_mat);
        let inv_term = invert(&(&identity + &y_prime).view())?;
        Some((&identity - &y_prime).dot(&inv_term))
    })
}

/// Convert Z-parameters to Y-parameters (per-frequency inverse)
pub fn z2y(z: &Array3<Complex64>) -> Array3<Complex64> {
    map_nport(z, |z_f| invert(&z_f.view()))
}

/// Convert Y-parameters to Z-parameters (per-frequency inverse)
pub fn y2z(y: &Array3<Complex64>) -> Array3<Complex64> {
    map_nport(y, |y_f| invert(&y_f.view()))
}

/// Change the reference impedance of S-parameters from `z_old` to `z_new`
///
/// With `P = diag((z + z') / (2 sqrt(z z')))` and
/// `Q = diag((z - z') / (2 sqrt(z z')))`:
/// `S' = (Q + P S) * inv(P + Q S)`.
/// Defined for every passive network, including a through connection.
pub fn renormalize_s(
    s: &Array3<Complex64>,
    z_old: &Array1<Complex64>,
    z_new: &Array1<Complex64>,
) -> Array3<Complex64> {
    debug_assert_eq!(z_old.len(), z_new.len());

    let scale: Vec<Complex64> = z_old
        .iter()
        .zip(z_new.iter())
        .map(|(z, zn)| TWO * z.sqrt() * zn.sqrt())
        .collect();
    let p_vals: Vec<Complex64> = z_old
        .iter()
        .zip(z_new.iter())
        .zip(scale.iter())
        .map(|((z, zn), k)| (z + zn) / k)
        .collect();
    let q_vals: Vec<Complex64> = z_old
        .iter()
        .zip(z_new.iter())
        .zip(scale.iter())
        .map(|((z, zn), k)| (z - zn) / k)
        .collect();
    let p = diag_matrix(&p_vals);
    let q = diag_matrix(&q_vals);

    map_nport(s, |s_f| {
        let denom = invert(&(&p + &q.dot(s_f)).view())?;
        Some((&q + &p.dot(s_f)).dot(&denom))
    })
}

// ============================================================================
// ABCD (2-port only)
// ============================================================================

/// Convert ABCD parameters to S-parameters
///
/// With `Δ = A z02 + B + C z01 z02 + D z01`:
/// - S11 = (A z02 + B - C z01 z02 - D z01) / Δ
/// - S12 = 2 (AD - BC) sqrt(z01) sqrt(z02) / Δ
/// - S21 = 2 sqrt(z01) sqrt(z02) / Δ
/// - S22 = (-A z02 + B - C z01 z02 + D z01) / Δ
pub fn a2s(a: &Array3<Complex64>, z0: &Array1<Complex64>) -> Array3<Complex64> {
    let (z01, z02) = port_pair(z0);
    let root = z01.sqrt() * z02.sqrt();

    map_2x2(a, |m| {
        let [[a, b], [c, d]] = *m;
        let delta = a * z02 + b + c * z01 * z02 + d * z01;
        let inv = checked_div(ONE, delta)?;
        Some([
            [
                (a * z02 + b - c * z01 * z02 - d * z01) * inv,
                TWO * det_2x2(m) * root * inv,
            ],
            [
                TWO * root * inv,
                (-a * z02 + b - c * z01 * z02 + d * z01) * inv,
            ],
        ])
    })
}

/// Convert S-parameters to ABCD parameters
///
/// Singular where S21 = 0 (no transmission).
pub fn s2a(s: &Array3<Complex64>, z0: &Array1<Complex64>) -> Array3<Complex64> {
    let (z01, z02) = port_pair(z0);
    let r1 = z01.sqrt();
    let r2 = z02.sqrt();

    map_2x2(s, |m| {
        let [[s11, s12], [s21, s22]] = *m;
        let inv = checked_div(ONE, TWO * s21)?;
        let cross = s12 * s21;
        Some([
            [
                r1 / r2 * ((ONE + s11) * (ONE - s22) + cross) * inv,
                r1 * r2 * ((ONE + s11) * (ONE + s22) - cross) * inv,
            ],
            [
                ((ONE - s11) * (ONE - s22) - cross) * inv / (r1 * r2),
                r2 / r1 * ((ONE - s11) * (ONE + s22) + cross) * inv,
            ],
        ])
    })
}

/// Convert ABCD parameters to Z-parameters
///
/// Z11 = A/C, Z12 = (AD - BC)/C, Z21 = 1/C, Z22 = D/C; singular where C = 0.
pub fn a2z(a: &Array3<Complex64>) -> Array3<Complex64> {
    map_2x2(a, abcd_to_z)
}

/// Convert Z-parameters to ABCD parameters; singular where Z21 = 0
pub fn z2a(z: &Array3<Complex64>) -> Array3<Complex64> {
    map_2x2(z, |m| {
        let [[z11, _], [z21, z22]] = *m;
        let inv = checked_div(ONE, z21)?;
        Some([[z11 * inv, det_2x2(m) * inv], [inv, z22 * inv]])
    })
}

/// Convert ABCD parameters to Y-parameters
///
/// Y11 = D/B, Y12 = -(AD - BC)/B, Y21 = -1/B, Y22 = A/B; singular where B = 0.
pub fn a2y(a: &Array3<Complex64>) -> Array3<Complex64> {
    map_2x2(a, abcd_to_y)
}

/// Convert Y-parameters to ABCD parameters; singular where Y21 = 0
pub fn y2a(y: &Array3<Complex64>) -> Array3<Complex64> {
    map_2x2(y, y_to_abcd)
}

/// Single-point ABCD -> Z
pub fn abcd_to_z(m: &Mat2) -> Option<Mat2> {
    let [[a, _], [c, d]] = *m;
    let inv = checked_div(ONE, c)?;
    Some([[a * inv, det_2x2(m) * inv], [inv, d * inv]])
}

/// Single-point ABCD -> Y
pub fn abcd_to_y(m: &Mat2) -> Option<Mat2> {
    let [[a, b], [_, d]] = *m;
    let inv = checked_div(ONE, b)?;
    Some([[d * inv, -det_2x2(m) * inv], [-inv, a * inv]])
}

/// Single-point Y -> ABCD
pub fn y_to_abcd(m: &Mat2) -> Option<Mat2> {
    let [[y11, _], [y21, y22]] = *m;
    let inv = checked_div(-ONE, y21)?;
    Some([[y22 * inv, inv], [det_2x2(m) * inv, y11 * inv]])
}

/// Frequency indices where any entry is NaN or infinite
pub fn singular_points(p: &Array3<Complex64>) -> Vec<usize> {
    (0..p.shape()[0])
        .filter(|&k| p.slice(s![k, .., ..]).iter().any(|v| !v.is_finite()))
        .collect()
}

#[inline]
fn port_pair(z0: &Array1<Complex64>) -> (Complex64, Complex64) {
    debug_assert_eq!(z0.len(), 2, "ABCD conversions are 2-port only");
    (z0[0], z0[1])
}
