//! Network operations
//!
//! Cascade, port flip and reference impedance change.

use ndarray::{array, Array1};
use num_complex::Complex64;

use super::core::Network;
use crate::error::AnalysisError;
use crate::math::matrix_ops::cascade_2x2;
use crate::math::transforms::{a2s, renormalize_s, s2a};

impl Network {
    /// Cascade with another network (self ** other)
    ///
    /// Connects port 2 of self to port 1 of other through their ABCD
    /// parameters. The result keeps port 1 of self and port 2 of other.
    pub fn cascade(&self, other: &Network) -> Result<Network, AnalysisError> {
        if self.nfreq() != other.nfreq() {
            return Err(AnalysisError::InvalidFrequency(format!(
                "cannot cascade {} points with {} points",
                self.nfreq(),
                other.nfreq()
            )));
        }

        let abcd = cascade_2x2(&self.a(), &other.a());
        let z0 = array![self.z0[0], other.z0[1]];
        Network::from_abcd(self.frequency.clone(), &abcd, z0)
    }

    /// Flip the ports of a 2-port network (swap port 1 and port 2)
    pub fn flipped(&self) -> Network {
        let mut s = self.s.clone();
        for f in 0..self.nfreq() {
            // new[i,j] = old[1-i, 1-j]
            s[[f, 0, 0]] = self.s[[f, 1, 1]];
            s[[f, 0, 1]] = self.s[[f, 1, 0]];
            s[[f, 1, 0]] = self.s[[f, 0, 1]];
            s[[f, 1, 1]] = self.s[[f, 0, 0]];
        }

        Network {
            frequency: self.frequency.clone(),
            s,
            z0: array![self.z0[1], self.z0[0]],
        }
    }

    /// The same network expressed in new port reference impedances
    pub fn renormalized(&self, z_new: &Array1<Complex64>) -> Network {
        Network {
            frequency: self.frequency.clone(),
            s: renormalize_s(&self.s, &self.z0, z_new),
            z0: z_new.clone(),
        }
    }

    /// ABCD round trip back to S in the current reference, mainly to check
    /// conversion consistency
    pub fn through_abcd(&self) -> Network {
        Network {
            frequency: self.frequency.clone(),
            s: a2s(&s2a(&self.s, &self.z0), &self.z0),
            z0: self.z0.clone(),
        }
    }
}
