//! Nodal analysis - DC operating point, AC phasors and transient waveforms
//!
//! All three analyses assemble a modified nodal system from the same netlist
//! the two-port calculators read. Explicit grounds are the reference node;
//! every other node gets a gmin conductance to ground so that floating parts
//! of the circuit stay solvable. Ports and ground lines are directives and
//! take no part.

mod ac;
mod dc;
mod mna;
mod transient;

use num_complex::Complex64;

pub use ac::{ac_analysis, AcSolution};
pub use dc::{dc_operating_point, DcSolution, DiodeState};
pub use mna::{ElementReading, MnaSystem};
pub use transient::{transient_analysis, TransientSolution, Waveform};

use crate::config::AnalysisOptions;
use crate::netlist::ComponentKind;
use mna::Stamp;

/// Conductance of a resistor, never steeper than a wire
fn resistor_admittance(r: f64, options: &AnalysisOptions) -> Complex64 {
    let r = if r.abs() < options.wire_resistance {
        options.wire_resistance
    } else {
        r
    };
    Complex64::new(1.0 / r, 0.0)
}

/// Zero-frequency stamp of a resistive or distributed element
///
/// A lossless line and a shorted stub conduct like a wire; an open stub
/// blocks. Returns `None` for every other kind.
fn static_stamp(kind: &ComponentKind, options: &AnalysisOptions) -> Option<Stamp> {
    let wire = resistor_admittance(options.wire_resistance, options);
    let stamp = match kind {
        ComponentKind::Resistor(r) => Stamp::Admittance(resistor_admittance(*r, options)),
        ComponentKind::Wire | ComponentKind::TransmissionLine(_) | ComponentKind::ShortStub(_) => {
            Stamp::Admittance(wire)
        }
        ComponentKind::OpenStub(_) => Stamp::Open,
        _ => return None,
    };
    Some(stamp)
}
