//! Numerical constants for circuit analysis
//!
//! Tolerances, electrical defaults and the stand-in values used for
//! idealized elements.

/// Tolerance for detecting near-zero values in division and singularity checks.
/// Used to prevent division by zero and detect ill-conditioned matrices.
pub const NEAR_ZERO: f64 = 1e-15;

/// Default tolerance for property checks (passivity, reciprocity).
/// This is the tolerance used when None is passed to property check functions.
pub const PROPERTY_TOL: f64 = 1e-12;

/// Largest impedance or admittance magnitude handed to the cascade.
/// Resonant stubs and lines at θ = 90° produce unbounded immittances; they
/// are clamped to this magnitude with their direction preserved.
pub const IMMITTANCE_LIMIT: f64 = 1e12;

/// Reciprocity tolerance for whole sweeps, relative to the entry magnitude
pub const SWEEP_RECIPROCITY_TOL: f64 = 1e-9;

/// System (port) reference impedance in ohms
pub const DEFAULT_Z0: f64 = 50.0;

/// Reference frequency for lines and stubs given without one, in Hz
pub const DEFAULT_REFERENCE_FREQUENCY: f64 = 1e9;

/// Resistance used for a wire. Never an ideal short.
pub const WIRE_RESISTANCE: f64 = 1e-6;

/// Resistance of a conducting diode in the on/off state search
pub const DIODE_ON_RESISTANCE: f64 = 1e-3;

/// Resistance of a blocking diode in the on/off state search
pub const DIODE_OFF_RESISTANCE: f64 = 1e9;

/// Linear stand-in resistance for a diode outside the DC state search
pub const DIODE_STANDIN_RESISTANCE: f64 = 0.7;

/// Forward voltage above which an OFF diode is inconsistent
pub const DIODE_FORWARD_VOLTAGE: f64 = 0.7;

/// Reverse voltage below which an ON diode is inconsistent
pub const DIODE_REVERSE_MARGIN: f64 = -0.1;

/// Number of diodes enumerated exhaustively (2^n states)
pub const MAX_SEARCH_DIODES: usize = 4;

/// Conductance from every node to ground in nodal analysis
pub const GMIN: f64 = 1e-12;

/// Default transient stop time in seconds
pub const DEFAULT_TRANSIENT_STOP: f64 = 0.05;

/// Default number of transient time points
pub const DEFAULT_TRANSIENT_POINTS: usize = 1000;
