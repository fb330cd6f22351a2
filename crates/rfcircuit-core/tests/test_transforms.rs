//! Parameter transforms between ABCD, Z, Y and S

use approx::assert_relative_eq;
use ndarray::{array, Array3};
use num_complex::Complex64;
use rfcircuit_core::math::matrix_ops::{mul_2x2, stack_2x2, Mat2};
use rfcircuit_core::math::transforms::{
    a2s, a2y, a2z, renormalize_s, s2a, s2z, y2z, z2s, z2y,
};
use rfcircuit_core::{Frequency, Network};

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

fn assert_stack_eq(a: &Array3<Complex64>, b: &Array3<Complex64>, tol: f64) {
    assert_eq!(a.shape(), b.shape());
    for (x, y) in a.iter().zip(b.iter()) {
        assert_relative_eq!(x.re, y.re, epsilon = tol);
        assert_relative_eq!(x.im, y.im, epsilon = tol);
    }
}

/// A lossy, non-symmetric reciprocal S stack at two frequencies
fn sample_s() -> Array3<Complex64> {
    array![
        [[c(0.2, -0.1), c(0.6, 0.3)], [c(0.6, 0.3), c(-0.15, 0.25)]],
        [[c(-0.05, 0.4), c(0.5, -0.45)], [c(0.5, -0.45), c(0.3, 0.1)]],
    ]
}

#[test]
fn test_s_abcd_round_trip_with_unequal_ports() {
    let z0 = array![c(50.0, 0.0), c(75.0, 0.0)];
    let s = sample_s();
    let back = a2s(&s2a(&s, &z0), &z0);
    assert_stack_eq(&s, &back, 1e-9);
}

#[test]
fn test_z_y_round_trip() {
    let z = array![[[c(110.0, 5.0), c(100.0, 0.0)], [c(100.0, 0.0), c(120.0, -3.0)]]];
    let back = y2z(&z2y(&z));
    assert_stack_eq(&z, &back, 1e-9);
}

#[test]
fn test_s_z_round_trip() {
    let z0 = array![c(50.0, 0.0), c(75.0, 0.0)];
    let s = sample_s();
    let back = z2s(&s2z(&s, &z0), &z0);
    assert_stack_eq(&s, &back, 1e-9);
}

#[test]
fn test_t_network_abcd_to_z_and_y() {
    // Series 10, shunt 100, series 20
    let abcd = array![[[c(1.1, 0.0), c(32.0, 0.0)], [c(0.01, 0.0), c(1.2, 0.0)]]];
    let z = a2z(&abcd);
    assert_relative_eq!(z[[0, 0, 0]].re, 110.0, epsilon = 1e-9);
    assert_relative_eq!(z[[0, 0, 1]].re, 100.0, epsilon = 1e-9);
    assert_relative_eq!(z[[0, 1, 0]].re, 100.0, epsilon = 1e-9);
    assert_relative_eq!(z[[0, 1, 1]].re, 120.0, epsilon = 1e-9);

    let y = a2y(&abcd);
    assert_stack_eq(&y, &z2y(&z), 1e-12);
}

#[test]
fn test_renormalization_matches_direct_conversion() {
    let abcd = array![[[c(1.0, 0.0), c(30.0, 10.0)], [c(0.0, 0.002), c(1.0, 0.0)]]];
    let z50 = array![c(50.0, 0.0), c(50.0, 0.0)];
    let z_ports = array![c(50.0, 0.0), c(75.0, 0.0)];

    let renormalized = renormalize_s(&a2s(&abcd, &z50), &z50, &z_ports);
    let direct = a2s(&abcd, &z_ports);
    assert_stack_eq(&renormalized, &direct, 1e-9);
}

/// Lossy RLC-like ladders with 1 to 3 L-sections per frequency point
///
/// Series impedances and shunt admittances have positive real parts, so
/// every slice is passive and reciprocal. Seeded LCG for reproducibility.
fn generated_abcd(seed: u64, nfreq: usize) -> Array3<Complex64> {
    let mut state = seed;
    let mut next = move |lo: f64, hi: f64| -> f64 {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        lo + (hi - lo) * ((state >> 33) as f64 / (1u64 << 31) as f64)
    };

    stack_2x2(nfreq, |_| {
        let sections = 1 + (next(0.0, 3.0) as usize).min(2);
        let one = c(1.0, 0.0);
        let mut m: Mat2 = [[one, c(0.0, 0.0)], [c(0.0, 0.0), one]];
        for _ in 0..sections {
            let z = c(next(1.0, 200.0), next(-300.0, 300.0));
            let y = c(next(1e-4, 2e-2), next(-2e-2, 2e-2));
            m = mul_2x2(&m, &[[one + z * y, z], [y, one]]);
        }
        m
    })
}

fn assert_stack_close(a: &Array3<Complex64>, b: &Array3<Complex64>) {
    assert_eq!(a.shape(), b.shape());
    for (x, y) in a.iter().zip(b.iter()) {
        assert_relative_eq!(x.re, y.re, epsilon = 1e-9, max_relative = 1e-9);
        assert_relative_eq!(x.im, y.im, epsilon = 1e-9, max_relative = 1e-9);
    }
}

#[test]
fn test_generated_ladders_round_trip() {
    let z0 = array![c(50.0, 0.0), c(75.0, 0.0)];
    for seed in [1, 7, 42, 2024] {
        let abcd = generated_abcd(seed, 16);

        let s = a2s(&abcd, &z0);
        assert_stack_close(&a2s(&s2a(&s, &z0), &z0), &s);

        let z = a2z(&abcd);
        assert_stack_close(&y2z(&z2y(&z)), &z);
        assert_stack_close(&s2z(&z2s(&z, &z0), &z0), &z);

        let freq = Frequency::linear_hz(1e6, 1e9, 16).unwrap();
        let network = Network::from_abcd(freq, &abcd, z0.clone()).unwrap();
        assert!(network.is_reciprocal(Some(1e-9)));
        assert!(network.is_passive(Some(1e-9)));
        assert_stack_close(network.through_abcd().s(), network.s());
    }
}
