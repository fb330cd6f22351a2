//! AC small-signal phasor analysis

use indexmap::IndexMap;
use log::info;
use num_complex::Complex64;

use super::mna::{assemble, ElementReading, Layout, Stamp};
use super::{resistor_admittance, static_stamp};
use crate::config::AnalysisOptions;
use crate::constants::GMIN;
use crate::elements::{element_model, ElementModel};
use crate::error::AnalysisError;
use crate::frequency::Frequency;
use crate::math::conversions::{complex_2_degree, complex_2_magnitude};
use crate::math::matrix_ops::slice_2x2;
use crate::math::transforms::abcd_to_y;
use crate::netlist::{Component, ComponentKind, Netlist, Node};

/// Result of [`ac_analysis`]
#[derive(Debug, Clone)]
pub struct AcSolution {
    /// Analysis frequency in Hz
    pub frequency: f64,
    pub node_voltages: IndexMap<Node, Complex64>,
    pub elements: IndexMap<String, ElementReading<Complex64>>,
}

impl AcSolution {
    /// Node voltage phasor; grounds and unknown nodes read 0
    pub fn voltage(&self, node: &Node) -> Complex64 {
        self.node_voltages.get(node).copied().unwrap_or_default()
    }

    pub fn element(&self, name: &str) -> Option<&ElementReading<Complex64>> {
        self.elements.get(name)
    }
}

impl ElementReading<Complex64> {
    /// Voltage as `(magnitude, phase in degrees)`
    pub fn voltage_polar(&self) -> (f64, f64) {
        (complex_2_magnitude(self.voltage), complex_2_degree(self.voltage))
    }

    /// Current as `(magnitude, phase in degrees)`
    pub fn current_polar(&self) -> (f64, f64) {
        (complex_2_magnitude(self.current), complex_2_degree(self.current))
    }
}

fn ac_stamp(c: &Component, freq: &Frequency, options: &AnalysisOptions) -> Stamp {
    let omega = freq.omega()[0];
    let j = Complex64::new(0.0, 1.0);
    match &c.kind {
        ComponentKind::Resistor(_) | ComponentKind::Wire => {
            static_stamp(&c.kind, options).unwrap_or(Stamp::Open)
        }
        ComponentKind::Capacitor(cap) => Stamp::Admittance(j * omega * *cap),
        ComponentKind::Inductor(l) => Stamp::Branch {
            impedance: j * omega * *l,
            voltage: Complex64::new(0.0, 0.0),
        },
        ComponentKind::Diode => Stamp::Admittance(resistor_admittance(options.diode_resistance, options)),
        ComponentKind::VoltageSource(src) => Stamp::Branch {
            impedance: Complex64::new(0.0, 0.0),
            voltage: src.phasor(),
        },
        ComponentKind::CurrentSource(src) => Stamp::Source(src.phasor()),
        ComponentKind::TransmissionLine(_) | ComponentKind::OpenStub(_) | ComponentKind::ShortStub(_) => {
            match element_model(&c.kind, freq, options) {
                Some(ElementModel::OnePort(op)) => {
                    Stamp::Admittance(op.admittance(options.immittance_limit)[0])
                }
                Some(ElementModel::TwoPort(abcd)) => abcd_to_y(&slice_2x2(&abcd, 0))
                    .map(Stamp::TwoPort)
                    .unwrap_or_else(|| static_stamp(&c.kind, options).unwrap_or(Stamp::Open)),
                None => Stamp::Open,
            }
        }
        _ => Stamp::Open,
    }
}

/// Solve for node and element phasors at `frequency` Hz
///
/// Independent sources contribute their AC phasor (a sine source without an
/// explicit AC magnitude contributes its amplitude at zero phase). Lines and
/// stubs enter with their exact admittances; diodes are the linear stand-in.
pub fn ac_analysis(
    netlist: &Netlist,
    frequency: f64,
    options: &AnalysisOptions,
) -> Result<AcSolution, AnalysisError> {
    let freq = Frequency::single(frequency)?;
    let layout = Layout::new(netlist);
    let assembly = assemble(netlist, &layout, GMIN, |c| ac_stamp(c, &freq, options))?;
    let x = assembly.system.solve("AC")?;
    info!("AC solution at {frequency} Hz: {} unknowns", x.len());

    Ok(AcSolution {
        frequency,
        node_voltages: layout.node_voltages(&x),
        elements: assembly.readings(&layout, &x),
    })
}
