//! Network property checks
//!
//! Methods on [`Network`] test the S-parameters. The free functions apply
//! the same kind of test to any `[nfreq, 2, 2]` parameter stack (Z, Y, S or
//! ABCD) and skip singular points.

use ndarray::Array3;
use num_complex::Complex64;

use super::core::Network;
use crate::constants::PROPERTY_TOL;
use crate::math::matrix_ops::{slice_2x2, Mat2};
use crate::math::transforms::singular_points;

impl Network {
    /// Test if network is reciprocal
    ///
    /// A network is reciprocal if S = S^T (transpose).
    pub fn is_reciprocal(&self, tol: Option<f64>) -> bool {
        reciprocity_error(&self.s) <= tol.unwrap_or(PROPERTY_TOL)
    }

    /// Test if network is passive
    ///
    /// Passive when the largest singular value of S is at most one, i.e. the
    /// largest eigenvalue of S^H S is at most one.
    pub fn is_passive(&self, tol: Option<f64>) -> bool {
        let tol = tol.unwrap_or(PROPERTY_TOL);
        (0..self.nfreq()).all(|f| s_matrix_passive(&slice_2x2(&self.s, f), tol))
    }

    /// Test if network is lossless
    ///
    /// A network is lossless if S is unitary: S^H * S = I
    pub fn is_lossless(&self, tol: Option<f64>) -> bool {
        let tol = tol.unwrap_or(PROPERTY_TOL);
        for f in 0..self.nfreq() {
            for i in 0..2 {
                for j in 0..2 {
                    let sum: Complex64 = (0..2)
                        .map(|k| self.s[[f, k, i]].conj() * self.s[[f, k, j]])
                        .sum();
                    let expected = if i == j { 1.0 } else { 0.0 };
                    if (sum.re - expected).abs() > tol || sum.im.abs() > tol {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Test if the network looks the same from both ports (S11 = S22)
    pub fn is_symmetric(&self, tol: Option<f64>) -> bool {
        let tol = tol.unwrap_or(PROPERTY_TOL);
        (0..self.nfreq()).all(|f| (self.s[[f, 0, 0]] - self.s[[f, 1, 1]]).norm() <= tol)
    }

    /// Frequency indices where the S-parameters are singular
    pub fn singular_points(&self) -> Vec<usize> {
        singular_points(&self.s)
    }
}

/// Largest eigenvalue of the Hermitian matrix `S^H S`
fn max_gram_eigenvalue(m: &Mat2) -> f64 {
    let (a0, a1) = (m[0][0], m[1][0]);
    let (b0, b1) = (m[0][1], m[1][1]);
    let g00 = a0.norm_sqr() + a1.norm_sqr();
    let g11 = b0.norm_sqr() + b1.norm_sqr();
    let g01 = a0.conj() * b0 + a1.conj() * b1;
    let half_trace = 0.5 * (g00 + g11);
    let det = g00 * g11 - g01.norm_sqr();
    half_trace + (half_trace * half_trace - det).max(0.0).sqrt()
}

/// Passivity of a single S-matrix: largest singular value at most `1 + tol`
pub fn s_matrix_passive(m: &Mat2, tol: f64) -> bool {
    let lambda = max_gram_eigenvalue(m);
    lambda.is_nan() || lambda <= 1.0 + tol
}

/// `|P12 - P21|`, relative to the larger of the two once they exceed one
///
/// Used for whole sweeps, where Z and Y entries span many decades.
pub fn point_reciprocity_error(m: &Mat2) -> f64 {
    let scale = m[0][1].norm().max(m[1][0].norm()).max(1.0);
    (m[0][1] - m[1][0]).norm() / scale
}

/// Largest [`point_reciprocity_error`] over the finite frequency points
pub fn reciprocity_error(p: &Array3<Complex64>) -> f64 {
    (0..p.shape()[0])
        .map(|f| point_reciprocity_error(&slice_2x2(p, f)))
        .filter(|e| !e.is_nan())
        .fold(0.0, f64::max)
}

/// Passivity heuristic on the diagonal: `Re(P11) > -tol` and `Re(P22) > -tol`
///
/// Meaningful for Z and Y parameters. Singular points are skipped.
pub fn diagonal_real_parts_nonnegative(p: &Array3<Complex64>, tol: f64) -> bool {
    (0..p.shape()[0]).all(|f| {
        let (p11, p22) = (p[[f, 0, 0]], p[[f, 1, 1]]);
        !(p11.is_finite() && p22.is_finite()) || (p11.re > -tol && p22.re > -tol)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::Frequency;
    use ndarray::Array1;

    fn network(s11: Complex64, s21: Complex64, s12: Complex64, s22: Complex64) -> Network {
        let mut s = Array3::<Complex64>::zeros((1, 2, 2));
        s[[0, 0, 0]] = s11;
        s[[0, 1, 0]] = s21;
        s[[0, 0, 1]] = s12;
        s[[0, 1, 1]] = s22;
        let z0 = Array1::from_elem(2, Complex64::new(50.0, 0.0));
        Network::new(Frequency::single(1e9).unwrap(), s, z0).unwrap()
    }

    #[test]
    fn test_is_reciprocal() {
        let half = Complex64::new(0.5, 0.1);
        let zero = Complex64::new(0.0, 0.0);
        assert!(network(zero, half, half, zero).is_reciprocal(None));
        assert!(!network(zero, half, half * 0.9, zero).is_reciprocal(None));
    }

    #[test]
    fn test_is_passive() {
        let zero = Complex64::new(0.0, 0.0);
        let third = Complex64::new(1.0 / 3.0, 0.0);
        let two_thirds = Complex64::new(2.0 / 3.0, 0.0);
        assert!(network(third, two_thirds, two_thirds, third).is_passive(None));
        // an amplifier: |S21| = 2
        let gain = Complex64::new(2.0, 0.0);
        assert!(!network(zero, gain, zero, zero).is_passive(None));
    }

    #[test]
    fn test_thru_is_lossless_and_symmetric() {
        let zero = Complex64::new(0.0, 0.0);
        let one = Complex64::new(1.0, 0.0);
        let thru = network(zero, one, one, zero);
        assert!(thru.is_lossless(None));
        assert!(thru.is_symmetric(None));
        assert!(thru.singular_points().is_empty());
    }

    #[test]
    fn test_stack_helpers() {
        let mut p = Array3::<Complex64>::zeros((2, 2, 2));
        p[[0, 0, 1]] = Complex64::new(1.0, 0.0);
        p[[0, 1, 0]] = Complex64::new(1.0, 0.0);
        p[[1, 0, 0]] = Complex64::new(f64::NAN, 0.0);
        assert_eq!(reciprocity_error(&p), 0.0);
        assert!(diagonal_real_parts_nonnegative(&p, 1e-12));

        p[[0, 1, 1]] = Complex64::new(-1.0, 0.0);
        assert!(!diagonal_real_parts_nonnegative(&p, 1e-12));
    }
}
