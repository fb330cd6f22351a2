//! Core Network struct and constructors

use ndarray::{Array1, Array3};
use num_complex::Complex64;

use crate::error::AnalysisError;
use crate::frequency::Frequency;
use crate::math::transforms::{a2s, y2s, z2s};

/// A two-port network stored as S-parameters
#[derive(Debug, Clone)]
pub struct Network {
    /// Frequency data
    pub frequency: Frequency,
    /// S-parameter data [nfreq, 2, 2]
    pub s: Array3<Complex64>,
    /// Reference impedance (per port)
    pub z0: Array1<Complex64>,
}

impl Network {
    /// Create a new Network from S-parameters
    ///
    /// The S stack must be `[nfreq, 2, 2]` with one reference impedance per
    /// port and one frequency per slice.
    pub fn new(
        frequency: Frequency,
        s: Array3<Complex64>,
        z0: Array1<Complex64>,
    ) -> Result<Self, AnalysisError> {
        let shape = s.shape();
        if shape[1] != 2 || shape[2] != 2 {
            return Err(AnalysisError::InvalidFrequency(format!(
                "expected a 2-port stack, got {}x{}",
                shape[1], shape[2]
            )));
        }
        if shape[0] != frequency.npoints() {
            return Err(AnalysisError::InvalidFrequency(format!(
                "{} frequency points but {} parameter slices",
                frequency.npoints(),
                shape[0]
            )));
        }
        if z0.len() != 2 {
            return Err(AnalysisError::InvalidFrequency(format!(
                "expected 2 reference impedances, got {}",
                z0.len()
            )));
        }
        Ok(Self { frequency, s, z0 })
    }

    /// Create from ABCD parameters
    pub fn from_abcd(
        frequency: Frequency,
        abcd: &Array3<Complex64>,
        z0: Array1<Complex64>,
    ) -> Result<Self, AnalysisError> {
        let s = a2s(abcd, &z0);
        Self::new(frequency, s, z0)
    }

    /// Create from Z-parameters
    pub fn from_z(
        frequency: Frequency,
        z: &Array3<Complex64>,
        z0: Array1<Complex64>,
    ) -> Result<Self, AnalysisError> {
        let s = z2s(z, &z0);
        Self::new(frequency, s, z0)
    }

    /// Create from Y-parameters
    pub fn from_y(
        frequency: Frequency,
        y: &Array3<Complex64>,
        z0: Array1<Complex64>,
    ) -> Result<Self, AnalysisError> {
        let s = y2s(y, &z0);
        Self::new(frequency, s, z0)
    }

    /// Get the number of frequency points
    #[inline]
    pub fn nfreq(&self) -> usize {
        self.s.shape()[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::{FrequencyUnit, SweepType};

    #[test]
    fn test_network_creation() {
        let freq = Frequency::new(1.0, 10.0, 10, FrequencyUnit::GHz, SweepType::Linear).unwrap();

        let s = Array3::<Complex64>::zeros((10, 2, 2));
        let z0 = Array1::from_elem(2, Complex64::new(50.0, 0.0));
        let ntwk = Network::new(freq, s, z0).unwrap();

        assert_eq!(ntwk.nfreq(), 10);
        assert_eq!(ntwk.z0[0].re, 50.0);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let freq = Frequency::single(1e9).unwrap();
        let z0 = Array1::from_elem(2, Complex64::new(50.0, 0.0));
        assert!(Network::new(freq.clone(), Array3::zeros((3, 2, 2)), z0.clone()).is_err());
        assert!(Network::new(freq, Array3::zeros((1, 3, 3)), z0).is_err());
    }
}
