//! Frequency module - represents a frequency grid
//!
//! Sweeps are stored in Hz regardless of the unit they were declared in.

use std::f64::consts::PI;
use std::str::FromStr;

use crate::error::AnalysisError;

/// Frequency unit enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrequencyUnit {
    #[default]
    Hz,
    KHz,
    MHz,
    GHz,
    THz,
}

impl FrequencyUnit {
    /// Get the multiplier to convert to Hz
    pub fn multiplier(&self) -> f64 {
        match self {
            FrequencyUnit::Hz => 1.0,
            FrequencyUnit::KHz => 1e3,
            FrequencyUnit::MHz => 1e6,
            FrequencyUnit::GHz => 1e9,
            FrequencyUnit::THz => 1e12,
        }
    }
}

impl FromStr for FrequencyUnit {
    type Err = AnalysisError;

    /// Parse from string (case-insensitive)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hz" => Ok(FrequencyUnit::Hz),
            "khz" => Ok(FrequencyUnit::KHz),
            "mhz" => Ok(FrequencyUnit::MHz),
            "ghz" => Ok(FrequencyUnit::GHz),
            "thz" => Ok(FrequencyUnit::THz),
            other => Err(AnalysisError::InvalidFrequency(format!(
                "unknown unit `{other}`"
            ))),
        }
    }
}

/// Sweep type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SweepType {
    #[default]
    Linear,
    Log,
}

/// A frequency grid
#[derive(Debug, Clone, PartialEq)]
pub struct Frequency {
    /// Frequency vector in Hz
    f: Vec<f64>,
    /// Unit the grid was declared in
    unit: FrequencyUnit,
}

impl Frequency {
    /// Create a grid with start/stop/npoints
    ///
    /// # Arguments
    /// * `start` - Start frequency in the specified unit
    /// * `stop` - Stop frequency in the specified unit
    /// * `npoints` - Number of frequency points (at least one)
    /// * `unit` - Frequency unit
    /// * `sweep_type` - Linear or logarithmic sweep
    ///
    /// # Example
    /// ```
    /// use rfcircuit_core::frequency::{Frequency, FrequencyUnit, SweepType};
    /// let freq = Frequency::new(0.1, 2.0, 501, FrequencyUnit::GHz, SweepType::Linear).unwrap();
    /// assert_eq!(freq.npoints(), 501);
    /// ```
    pub fn new(
        start: f64,
        stop: f64,
        npoints: usize,
        unit: FrequencyUnit,
        sweep_type: SweepType,
    ) -> Result<Self, AnalysisError> {
        if npoints == 0 {
            return Err(AnalysisError::InvalidFrequency(
                "grid needs at least one point".into(),
            ));
        }
        if !start.is_finite() || !stop.is_finite() || start < 0.0 || stop < start {
            return Err(AnalysisError::InvalidFrequency(format!(
                "expected 0 <= start <= stop, got start = {start}, stop = {stop}"
            )));
        }

        let mult = unit.multiplier();
        let start_hz = start * mult;
        let stop_hz = stop * mult;

        let f = match sweep_type {
            _ if npoints == 1 => vec![start_hz],
            SweepType::Linear => {
                let step = (stop_hz - start_hz) / (npoints - 1) as f64;
                (0..npoints).map(|i| start_hz + i as f64 * step).collect()
            }
            SweepType::Log => {
                if start_hz <= 0.0 {
                    return Err(AnalysisError::InvalidFrequency(
                        "logarithmic sweep must start above 0 Hz".into(),
                    ));
                }
                let log_start = start_hz.ln();
                let log_step = (stop_hz.ln() - log_start) / (npoints - 1) as f64;
                (0..npoints)
                    .map(|i| (log_start + i as f64 * log_step).exp())
                    .collect()
            }
        };

        Ok(Self { f, unit })
    }

    /// Linear grid from `start` to `stop` (both in Hz)
    pub fn linear_hz(start: f64, stop: f64, npoints: usize) -> Result<Self, AnalysisError> {
        Self::new(start, stop, npoints, FrequencyUnit::Hz, SweepType::Linear)
    }

    /// Single-point grid
    pub fn single(f_hz: f64) -> Result<Self, AnalysisError> {
        Self::linear_hz(f_hz, f_hz, 1)
    }

    /// Get frequency vector in Hz
    #[inline]
    pub fn f(&self) -> &[f64] {
        &self.f
    }

    /// Angular frequency ω = 2πf for every point
    pub fn omega(&self) -> Vec<f64> {
        self.f.iter().map(|&f| 2.0 * PI * f).collect()
    }

    /// Get the number of frequency points
    #[inline]
    pub fn npoints(&self) -> usize {
        self.f.len()
    }

    /// Get the start frequency in Hz
    #[inline]
    pub fn start(&self) -> f64 {
        self.f.first().copied().unwrap_or(0.0)
    }

    /// Get the stop frequency in Hz
    #[inline]
    pub fn stop(&self) -> f64 {
        self.f.last().copied().unwrap_or(0.0)
    }

    /// Unit the grid was declared in
    #[inline]
    pub fn unit(&self) -> FrequencyUnit {
        self.unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_create_linear_sweep() {
        let freq = Frequency::new(0.1, 2.0, 501, FrequencyUnit::GHz, SweepType::Linear).unwrap();

        assert_eq!(freq.npoints(), 501);
        assert_relative_eq!(freq.start(), 0.1e9, epsilon = 1.0);
        assert_relative_eq!(freq.stop(), 2e9, epsilon = 1.0);
        assert_eq!(freq.unit(), FrequencyUnit::GHz);
    }

    #[test]
    fn test_create_log_sweep() {
        let freq = Frequency::new(1.0, 10.0, 10, FrequencyUnit::GHz, SweepType::Log).unwrap();

        assert_relative_eq!(freq.start(), 1e9, epsilon = 1.0);
        assert_relative_eq!(freq.stop(), 10e9, epsilon = 1.0);

        let ratios: Vec<f64> = freq.f().windows(2).map(|w| w[1] / w[0]).collect();
        for r in &ratios[1..] {
            assert_relative_eq!(*r, ratios[0], epsilon = 1e-10);
        }
    }

    #[test]
    fn test_invalid_grids() {
        assert!(Frequency::new(1.0, 2.0, 0, FrequencyUnit::GHz, SweepType::Linear).is_err());
        assert!(Frequency::new(2.0, 1.0, 5, FrequencyUnit::GHz, SweepType::Linear).is_err());
        assert!(Frequency::new(0.0, 1.0, 5, FrequencyUnit::GHz, SweepType::Log).is_err());
    }

    #[test]
    fn test_single_point_and_omega() {
        let freq = Frequency::single(1e9).unwrap();
        assert_eq!(freq.npoints(), 1);
        assert_relative_eq!(freq.omega()[0], 2.0 * PI * 1e9, epsilon = 1e-3);
    }

    #[test]
    fn test_frequency_unit_from_str() {
        assert_eq!("ghz".parse::<FrequencyUnit>().unwrap(), FrequencyUnit::GHz);
        assert_eq!("GHz".parse::<FrequencyUnit>().unwrap(), FrequencyUnit::GHz);
        assert_eq!("MHz".parse::<FrequencyUnit>().unwrap(), FrequencyUnit::MHz);
        assert!("invalid".parse::<FrequencyUnit>().is_err());
    }
}
