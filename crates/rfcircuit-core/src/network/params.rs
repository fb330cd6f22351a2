//! Network parameter properties (S, Z, Y, ABCD)
//!
//! Provides access to the other parameter representations of a network.

use ndarray::{Array1, Array3};
use num_complex::Complex64;

use super::core::Network;
use crate::frequency::Frequency;
use crate::math::transforms::{s2a, s2y, s2z};

impl Network {
    /// Get reference impedance
    pub fn z0(&self) -> &Array1<Complex64> {
        &self.z0
    }

    /// Get S-parameters
    pub fn s(&self) -> &Array3<Complex64> {
        &self.s
    }

    /// Get frequency object
    pub fn frequency(&self) -> &Frequency {
        &self.frequency
    }

    /// Get frequency vector in Hz
    pub fn f(&self) -> &[f64] {
        self.frequency.f()
    }

    /// Get Z-parameters (impedance)
    pub fn z(&self) -> Array3<Complex64> {
        s2z(&self.s, &self.z0)
    }

    /// Get Y-parameters (admittance)
    pub fn y(&self) -> Array3<Complex64> {
        s2y(&self.s, &self.z0)
    }

    /// Get ABCD parameters (chain/cascade parameters)
    ///
    /// ABCD matrix organization: [[A, B], [C, D]]. Points without
    /// transmission (S21 = 0) are NaN.
    pub fn a(&self) -> Array3<Complex64> {
        s2a(&self.s, &self.z0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_series_resistor_parameters() {
        // 50 ohm in series between 50 ohm ports
        let freq = Frequency::single(1e9).unwrap();
        let mut s = Array3::<Complex64>::zeros((1, 2, 2));
        s[[0, 0, 0]] = Complex64::new(1.0 / 3.0, 0.0);
        s[[0, 1, 1]] = Complex64::new(1.0 / 3.0, 0.0);
        s[[0, 0, 1]] = Complex64::new(2.0 / 3.0, 0.0);
        s[[0, 1, 0]] = Complex64::new(2.0 / 3.0, 0.0);

        let z0 = Array1::from_elem(2, Complex64::new(50.0, 0.0));
        let ntwk = Network::new(freq, s, z0).unwrap();

        let a = ntwk.a();
        assert_relative_eq!(a[[0, 0, 0]].re, 1.0, epsilon = 1e-10);
        assert_relative_eq!(a[[0, 0, 1]].re, 50.0, epsilon = 1e-9);
        assert_relative_eq!(a[[0, 1, 0]].norm(), 0.0, epsilon = 1e-12);

        let y = ntwk.y();
        assert_relative_eq!(y[[0, 0, 0]].re, 0.02, epsilon = 1e-12);
        assert_relative_eq!(y[[0, 0, 1]].re, -0.02, epsilon = 1e-12);
    }
}
