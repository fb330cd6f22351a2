//! Frequency-dependent element builder
//!
//! Turns individual components into per-frequency models: a one-port
//! reflection coefficient for two-terminal elements, or an ABCD stack for
//! transmission lines. Placement helpers then wrap a one-port as a series or
//! shunt two-port.

use ndarray::{Array1, Array3};
use num_complex::Complex64;

use crate::config::AnalysisOptions;
use crate::frequency::Frequency;
use crate::math::matrix_ops::stack_2x2;
use crate::netlist::{ComponentKind, LineSpec};

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const J: Complex64 = Complex64::new(0.0, 1.0);

/// Bound an impedance or admittance to `limit` in magnitude
///
/// Values beyond the limit (including infinities) keep their direction in
/// the complex plane. NaN collapses to zero.
pub fn clamp_immittance(v: Complex64, limit: f64) -> Complex64 {
    if v.is_nan() {
        return ZERO;
    }
    if v.is_finite() {
        let mag = v.norm();
        return if mag > limit { v * (limit / mag) } else { v };
    }
    let dir = Complex64::new(unit_sign(v.re), unit_sign(v.im));
    dir * (limit / dir.norm())
}

fn unit_sign(x: f64) -> f64 {
    if x.is_infinite() {
        x.signum()
    } else {
        0.0
    }
}

/// `num / den` bounded by `limit`, never NaN for a finite numerator
fn bounded_ratio(num: Complex64, den: Complex64, limit: f64) -> Complex64 {
    let ratio = num / den;
    if ratio.is_finite() {
        return clamp_immittance(ratio, limit);
    }
    let mag = num.norm();
    if mag == 0.0 {
        ZERO
    } else {
        num * (limit / mag)
    }
}

/// A one-port described by its reflection coefficient in its own reference
///
/// Passive elements always have a finite reflection coefficient, even where
/// their impedance or admittance is unbounded, so this is the form carried
/// until the element is placed.
#[derive(Debug, Clone, PartialEq)]
pub struct OnePort {
    gamma: Array1<Complex64>,
    z0: Complex64,
}

impl OnePort {
    pub fn new(gamma: Array1<Complex64>, z0: Complex64) -> Self {
        Self { gamma, z0 }
    }

    /// From an impedance per frequency
    pub fn from_impedance(z: impl IntoIterator<Item = Complex64>, z0: Complex64) -> Self {
        let gamma = z.into_iter().map(|z| (z - z0) / (z + z0)).collect();
        Self { gamma, z0 }
    }

    /// From an admittance per frequency
    pub fn from_admittance(y: impl IntoIterator<Item = Complex64>, z0: Complex64) -> Self {
        let gamma = y
            .into_iter()
            .map(|y| (ONE - z0 * y) / (ONE + z0 * y))
            .collect();
        Self { gamma, z0 }
    }

    #[inline]
    pub fn gamma(&self) -> &Array1<Complex64> {
        &self.gamma
    }

    /// Reference impedance of [`OnePort::gamma`]
    #[inline]
    pub fn z0(&self) -> Complex64 {
        self.z0
    }

    pub fn nfreq(&self) -> usize {
        self.gamma.len()
    }

    /// Express the same element in a new reference impedance
    pub fn renormalized(&self, z_new: Complex64) -> OnePort {
        if z_new == self.z0 {
            return self.clone();
        }
        let (sum, diff) = (self.z0 + z_new, self.z0 - z_new);
        let gamma = self
            .gamma
            .mapv(|g| (diff + sum * g) / (sum + diff * g));
        OnePort { gamma, z0: z_new }
    }

    /// Impedance per frequency, bounded by `limit`
    pub fn impedance(&self, limit: f64) -> Array1<Complex64> {
        self.gamma
            .mapv(|g| bounded_ratio(self.z0 * (ONE + g), ONE - g, limit))
    }

    /// Admittance per frequency, bounded by `limit`
    pub fn admittance(&self, limit: f64) -> Array1<Complex64> {
        self.gamma
            .mapv(|g| bounded_ratio(ONE - g, self.z0 * (ONE + g), limit))
    }
}

/// Per-frequency model of a component
#[derive(Debug, Clone, PartialEq)]
pub enum ElementModel {
    /// Two-terminal element, placed later as series or shunt
    OnePort(OnePort),
    /// Intrinsic two-port, as ABCD parameters `[nfreq, 2, 2]`
    TwoPort(Array3<Complex64>),
}

/// ABCD parameters of a lossless transmission line
///
/// `A = D = cos θ`, `B = j Zc sin θ`, `C = j sin θ / Zc`, with
/// `θ(f) = θ_ref · f / f_ref`.
pub fn line_abcd(spec: &LineSpec, freq: &Frequency, default_f_ref: f64) -> Array3<Complex64> {
    let zc = Complex64::new(spec.z0, 0.0);
    let f = freq.f();
    stack_2x2(f.len(), |k| {
        let theta = spec.theta_at(f[k], default_f_ref);
        let (sin, cos) = theta.sin_cos();
        [
            [Complex64::new(cos, 0.0), J * zc * sin],
            [J * sin / zc, Complex64::new(cos, 0.0)],
        ]
    })
}

/// Input of a line terminated in an open (`shorted = false`) or short circuit
///
/// Referenced to the line's characteristic impedance: `Γ = ±e^{-j2θ}`.
/// The open case gives `Zin = -j Zc cot θ`, the shorted case `Zin = j Zc tan θ`.
pub fn stub_one_port(
    spec: &LineSpec,
    freq: &Frequency,
    default_f_ref: f64,
    shorted: bool,
) -> OnePort {
    let load = if shorted { -ONE } else { ONE };
    let gamma = freq
        .f()
        .iter()
        .map(|&f| load * Complex64::from_polar(1.0, -2.0 * spec.theta_at(f, default_f_ref)))
        .collect();
    OnePort::new(gamma, Complex64::new(spec.z0, 0.0))
}

/// Build the model of a single component at every frequency
///
/// Returns `None` for kinds with no two-port meaning (ports, grounds,
/// controlled sources). An independent voltage source is zeroed to a wire,
/// an independent current source to an open circuit, and a diode is its
/// fixed resistor stand-in.
pub fn element_model(
    kind: &ComponentKind,
    freq: &Frequency,
    options: &AnalysisOptions,
) -> Option<ElementModel> {
    let z_sys = Complex64::new(options.system_z0, 0.0);
    let omega = freq.omega();
    let resistor =
        |r: f64| OnePort::from_impedance(omega.iter().map(|_| Complex64::new(r, 0.0)), z_sys);

    let model = match kind {
        ComponentKind::Resistor(r) => ElementModel::OnePort(resistor(*r)),
        ComponentKind::Wire | ComponentKind::VoltageSource(_) => {
            ElementModel::OnePort(resistor(options.wire_resistance))
        }
        ComponentKind::Diode => ElementModel::OnePort(resistor(options.diode_resistance)),
        ComponentKind::Inductor(l) => ElementModel::OnePort(OnePort::from_impedance(
            omega.iter().map(|&w| J * (w * l)),
            z_sys,
        )),
        ComponentKind::Capacitor(c) => ElementModel::OnePort(OnePort::from_admittance(
            omega.iter().map(|&w| J * (w * c)),
            z_sys,
        )),
        ComponentKind::CurrentSource(_) => {
            ElementModel::OnePort(OnePort::new(Array1::from_elem(omega.len(), ONE), z_sys))
        }
        ComponentKind::TransmissionLine(spec) => {
            ElementModel::TwoPort(line_abcd(spec, freq, options.reference_frequency))
        }
        ComponentKind::OpenStub(spec) => ElementModel::OnePort(stub_one_port(
            spec,
            freq,
            options.reference_frequency,
            false,
        )),
        ComponentKind::ShortStub(spec) => ElementModel::OnePort(stub_one_port(
            spec,
            freq,
            options.reference_frequency,
            true,
        )),
        ComponentKind::Port { .. }
        | ComponentKind::Ground
        | ComponentKind::Vcvs { .. }
        | ComponentKind::Vccs { .. }
        | ComponentKind::Cccs { .. }
        | ComponentKind::Ccvs { .. } => return None,
    };
    Some(model)
}

/// Series placement: `[[1, Z], [0, 1]]`
pub fn series_abcd(element: &OnePort, limit: f64) -> Array3<Complex64> {
    let z = element.impedance(limit);
    stack_2x2(z.len(), |k| [[ONE, z[k]], [ZERO, ONE]])
}

/// Shunt placement: `[[1, 0], [Y, 1]]`
///
/// The element is first renormalized to the system impedance so that its
/// admittance is read in the system basis.
pub fn shunt_abcd(element: &OnePort, z_system: Complex64, limit: f64) -> Array3<Complex64> {
    let y = element.renormalized(z_system).admittance(limit);
    stack_2x2(y.len(), |k| [[ONE, ZERO], [y[k], ONE]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::IMMITTANCE_LIMIT;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn spec(z0: f64, theta: f64) -> LineSpec {
        LineSpec {
            z0,
            theta_deg: theta,
            f_ref: Some(1e9),
        }
    }

    #[test]
    fn test_line_abcd_quarter_wave() {
        let freq = Frequency::single(1e9).unwrap();
        let a = line_abcd(&spec(50.0, 90.0), &freq, 1e9);
        assert_relative_eq!(a[[0, 0, 0]].norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(a[[0, 0, 1]].im, 50.0, epsilon = 1e-9);
        assert_relative_eq!(a[[0, 1, 0]].im, 1.0 / 50.0, epsilon = 1e-12);
        // lossless reciprocal: AD - BC = 1
        let det = a[[0, 0, 0]] * a[[0, 1, 1]] - a[[0, 0, 1]] * a[[0, 1, 0]];
        assert_relative_eq!(det.re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_open_stub_input_impedance() {
        // Zin = -j Zc cot(θ); θ = 45° -> -j Zc
        let freq = Frequency::single(1e9).unwrap();
        let stub = stub_one_port(&spec(57.74, 45.0), &freq, 1e9, false);
        let z = stub.impedance(IMMITTANCE_LIMIT);
        assert_relative_eq!(z[0].re, 0.0, epsilon = 1e-9);
        assert_relative_eq!(z[0].im, -57.74, epsilon = 1e-9);
    }

    #[test]
    fn test_short_stub_input_impedance() {
        // Zin = j Zc tan(θ); θ = 30°
        let freq = Frequency::single(1e9).unwrap();
        let stub = stub_one_port(&spec(75.0, 30.0), &freq, 1e9, true);
        let z = stub.impedance(IMMITTANCE_LIMIT);
        assert_relative_eq!(z[0].im, 75.0 * (PI / 6.0).tan(), epsilon = 1e-9);
    }

    #[test]
    fn test_renormalization_preserves_impedance() {
        let freq = Frequency::single(1e9).unwrap();
        let stub = stub_one_port(&spec(75.0, 30.0), &freq, 1e9, false);
        let z_native = stub.impedance(IMMITTANCE_LIMIT);
        let z_system = stub.renormalized(Complex64::new(50.0, 0.0)).impedance(IMMITTANCE_LIMIT);
        assert_relative_eq!(z_native[0].im, z_system[0].im, epsilon = 1e-9);
    }

    #[test]
    fn test_shunt_open_stub_uses_stub_admittance() {
        // Y = j tan(θ) / Zc, independent of the system impedance
        let freq = Frequency::single(1e9).unwrap();
        let stub = stub_one_port(&spec(75.0, 30.0), &freq, 1e9, false);
        let a = shunt_abcd(&stub, Complex64::new(50.0, 0.0), IMMITTANCE_LIMIT);
        assert_relative_eq!(a[[0, 1, 0]].im, (PI / 6.0).tan() / 75.0, epsilon = 1e-12);
        assert_eq!(a[[0, 0, 1]], ZERO);
    }

    #[test]
    fn test_quarter_wave_stubs_stay_finite() {
        let freq = Frequency::single(1e9).unwrap();

        // open quarter-wave stub: input is a short, admittance clamped
        let open = stub_one_port(&spec(50.0, 90.0), &freq, 1e9, false);
        let y = open.admittance(IMMITTANCE_LIMIT);
        assert!(y[0].is_finite());
        assert!(y[0].norm() <= IMMITTANCE_LIMIT * (1.0 + 1e-12));
        assert!(open.impedance(IMMITTANCE_LIMIT)[0].norm() < 1e-9);

        // short quarter-wave stub: input is an open, admittance vanishes
        let short = stub_one_port(&spec(50.0, 90.0), &freq, 1e9, true);
        assert!(short.admittance(IMMITTANCE_LIMIT)[0].norm() < 1e-9);
        assert!(short.impedance(IMMITTANCE_LIMIT)[0].is_finite());
    }

    #[test]
    fn test_capacitor_at_dc_is_open() {
        let freq = Frequency::single(0.0).unwrap();
        let model = element_model(
            &ComponentKind::Capacitor(1e-12),
            &freq,
            &AnalysisOptions::default(),
        )
        .unwrap();
        let ElementModel::OnePort(cap) = model else {
            panic!("capacitor should be a one-port");
        };
        assert_relative_eq!(cap.gamma()[0].re, 1.0, epsilon = 1e-15);
        let a = series_abcd(&cap, IMMITTANCE_LIMIT);
        assert!(a[[0, 0, 1]].is_finite());
        assert_relative_eq!(a[[0, 0, 1]].norm(), IMMITTANCE_LIMIT, max_relative = 1e-12);
    }

    #[test]
    fn test_clamp_immittance() {
        let inf = Complex64::new(0.0, f64::INFINITY);
        assert_eq!(clamp_immittance(inf, 1e6), Complex64::new(0.0, 1e6));
        assert_eq!(clamp_immittance(Complex64::new(3.0, 4.0), 1e6), Complex64::new(3.0, 4.0));
        assert_eq!(clamp_immittance(Complex64::new(f64::NAN, 0.0), 1e6), ZERO);
    }
}
