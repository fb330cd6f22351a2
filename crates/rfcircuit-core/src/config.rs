//! Analysis options
//!
//! Every knob has a default in [`crate::constants`]; callers override
//! individual values with the `with_*` setters.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_REFERENCE_FREQUENCY, DEFAULT_TRANSIENT_POINTS, DEFAULT_TRANSIENT_STOP, DEFAULT_Z0,
    DIODE_STANDIN_RESISTANCE, IMMITTANCE_LIMIT, WIRE_RESISTANCE,
};

/// Options shared by the parameter calculators and nodal solvers
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AnalysisOptions {
    /// System reference impedance (ohms). Stubs are renormalized to it.
    pub system_z0: f64,
    /// Reference impedance for a port without a matching `Port` line
    pub port_z0: f64,
    /// Resistance substituted for wires
    pub wire_resistance: f64,
    /// Clamp for resonant impedances/admittances
    pub immittance_limit: f64,
    /// Reference frequency (Hz) for lines and stubs declared without one
    pub reference_frequency: f64,
    /// Fixed resistance used for diodes outside the DC state search
    pub diode_resistance: f64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            system_z0: DEFAULT_Z0,
            port_z0: DEFAULT_Z0,
            wire_resistance: WIRE_RESISTANCE,
            immittance_limit: IMMITTANCE_LIMIT,
            reference_frequency: DEFAULT_REFERENCE_FREQUENCY,
            diode_resistance: DIODE_STANDIN_RESISTANCE,
        }
    }
}

impl AnalysisOptions {
    pub fn with_system_z0(mut self, z0: f64) -> Self {
        self.system_z0 = z0;
        self
    }

    pub fn with_port_z0(mut self, z0: f64) -> Self {
        self.port_z0 = z0;
        self
    }

    pub fn with_wire_resistance(mut self, r: f64) -> Self {
        self.wire_resistance = r;
        self
    }

    pub fn with_immittance_limit(mut self, limit: f64) -> Self {
        self.immittance_limit = limit;
        self
    }

    pub fn with_reference_frequency(mut self, f_hz: f64) -> Self {
        self.reference_frequency = f_hz;
        self
    }

    pub fn with_diode_resistance(mut self, r: f64) -> Self {
        self.diode_resistance = r;
        self
    }
}

/// Time window for transient analysis
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TransientOptions {
    /// Stop time in seconds (the window always starts at t = 0)
    pub stop: f64,
    /// Number of time points including t = 0 and `stop`
    pub points: usize,
}

impl Default for TransientOptions {
    fn default() -> Self {
        Self {
            stop: DEFAULT_TRANSIENT_STOP,
            points: DEFAULT_TRANSIENT_POINTS,
        }
    }
}

impl TransientOptions {
    pub fn new(stop: f64, points: usize) -> Self {
        Self { stop, points }
    }

    /// Time step between consecutive points
    pub fn step(&self) -> f64 {
        if self.points < 2 {
            0.0
        } else {
            self.stop / (self.points - 1) as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = AnalysisOptions::default();
        assert_eq!(opts.system_z0, 50.0);
        assert_eq!(opts.wire_resistance, 1e-6);

        let tran = TransientOptions::default();
        assert_eq!(tran.points, 1000);
        assert!((tran.step() - 0.05 / 999.0).abs() < 1e-15);
    }

    #[test]
    fn test_builder_setters() {
        let opts = AnalysisOptions::default()
            .with_system_z0(75.0)
            .with_wire_resistance(1e-3)
            .with_reference_frequency(2.4e9);
        assert_eq!(opts.system_z0, 75.0);
        assert_eq!(opts.wire_resistance, 1e-3);
        assert_eq!(opts.reference_frequency, 2.4e9);
        assert_eq!(opts.port_z0, 50.0);
    }
}
