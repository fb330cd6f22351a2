//! Two-port parameter analysis
//!
//! [`compute_parameters`] validates the requested ports, builds the ladder
//! topology, cascades it over the frequency grid and converts the result to
//! Z, Y, S or ABCD parameters. Singular points and property checks are
//! reported on the result rather than failing the request.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexSet;
use log::{info, warn};
use ndarray::{array, Array1, Array3};
use num_complex::Complex64;

use crate::cascade::{build_cascade, chain_ends, CascadeStep};
use crate::config::AnalysisOptions;
use crate::constants::{PROPERTY_TOL, SWEEP_RECIPROCITY_TOL};
use crate::error::AnalysisError;
use crate::frequency::Frequency;
use crate::math::conversions::{complex_2_db, complex_2_degree};
use crate::math::matrix_ops::{checked_div, det_2x2, map_2x2, slice_2x2};
use crate::math::transforms::{a2s, a2y, a2z, singular_points};
use crate::netlist::{ComponentKind, Netlist, Node};
use crate::network::{diagonal_real_parts_nonnegative, reciprocity_error, s_matrix_passive, Network};
use crate::topology::{build_topology, Topology};

/// Two-port representation to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    Z,
    Y,
    S,
    Abcd,
}

impl ParameterKind {
    /// Entry prefix used in diagnostics (`Z`, `Y`, `S`, `A`)
    pub fn symbol(self) -> &'static str {
        match self {
            ParameterKind::Z => "Z",
            ParameterKind::Y => "Y",
            ParameterKind::S => "S",
            ParameterKind::Abcd => "A",
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterKind::Z => "z",
            ParameterKind::Y => "y",
            ParameterKind::S => "s",
            ParameterKind::Abcd => "abcd",
        };
        f.write_str(name)
    }
}

impl FromStr for ParameterKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "z" => Ok(ParameterKind::Z),
            "y" => Ok(ParameterKind::Y),
            "s" => Ok(ParameterKind::S),
            "abcd" | "a" => Ok(ParameterKind::Abcd),
            _ => Err(AnalysisError::UnknownParameterKind(s.to_string())),
        }
    }
}

/// Port terminals: port 1 between `p1n1` (+) and `p1n2` (-), port 2 likewise
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    pub p1n1: Node,
    pub p1n2: Node,
    pub p2n1: Node,
    pub p2n2: Node,
}

impl PortSpec {
    pub fn new(p1n1: &str, p1n2: &str, p2n1: &str, p2n2: &str) -> Self {
        Self {
            p1n1: Node::new(p1n1),
            p1n2: Node::new(p1n2),
            p2n1: Node::new(p2n1),
            p2n2: Node::new(p2n2),
        }
    }

    fn nodes(&self) -> [&Node; 4] {
        [&self.p1n1, &self.p1n2, &self.p2n1, &self.p2n2]
    }
}

/// One complex parameter entry with its derived forms
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterEntry {
    pub value: Complex64,
}

impl ParameterEntry {
    pub fn re(&self) -> f64 {
        self.value.re
    }

    pub fn im(&self) -> f64 {
        self.value.im
    }

    pub fn magnitude(&self) -> f64 {
        self.value.norm()
    }

    pub fn db(&self) -> f64 {
        complex_2_db(self.value)
    }

    pub fn phase_deg(&self) -> f64 {
        complex_2_degree(self.value)
    }
}

/// Result of [`compute_parameters`]
#[derive(Debug, Clone)]
pub struct ParameterSweep {
    pub kind: ParameterKind,
    pub frequency: Frequency,
    /// `[nfreq, 2, 2]`, in the requested port order
    pub data: Array3<Complex64>,
    /// Port reference impedances
    pub z0: Array1<Complex64>,
    pub reciprocal: bool,
    pub passive: bool,
    /// Frequency indices with NaN/inf entries
    pub singular_points: Vec<usize>,
    /// Components that did not take part in the two-port
    pub skipped: Vec<String>,
    /// Ports were reversed relative to the ladder chain
    pub flipped: bool,
    /// Cascade trace
    pub steps: Vec<CascadeStep>,
}

impl ParameterSweep {
    pub fn len(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entry `(row, col)` at frequency index `k` (zero-based)
    pub fn entry(&self, k: usize, row: usize, col: usize) -> ParameterEntry {
        ParameterEntry {
            value: self.data[[k, row, col]],
        }
    }

    /// All four entries at frequency index `k`
    pub fn entries(&self, k: usize) -> [[ParameterEntry; 2]; 2] {
        let m = slice_2x2(&self.data, k);
        m.map(|row| row.map(|value| ParameterEntry { value }))
    }

    /// The sweep as a network (S-parameters in the port impedances)
    pub fn to_network(&self) -> Result<Network, AnalysisError> {
        let freq = self.frequency.clone();
        match self.kind {
            ParameterKind::S => Network::new(freq, self.data.clone(), self.z0.clone()),
            ParameterKind::Z => Network::from_z(freq, &self.data, self.z0.clone()),
            ParameterKind::Y => Network::from_y(freq, &self.data, self.z0.clone()),
            ParameterKind::Abcd => Network::from_abcd(freq, &self.data, self.z0.clone()),
        }
    }
}

/// Ports checked against a netlist, with the topology they imply
pub(crate) struct ResolvedPorts {
    pub topology: Topology,
    /// Port 1 sits at the end of the ladder chain and port 2 at its start
    pub flipped: bool,
    /// Reference impedance of port 1 and port 2
    pub z0: Array1<Complex64>,
}

/// Validate `ports` and build the topology they imply
pub(crate) fn resolve_ports(
    netlist: &Netlist,
    ports: &PortSpec,
    options: &AnalysisOptions,
) -> Result<ResolvedPorts, AnalysisError> {
    let mut available: IndexSet<Node> = netlist.nodes();
    available.insert(Node::reference());
    available.extend(netlist.implicit_grounds().iter().cloned());

    let mut missing: Vec<String> = Vec::new();
    for node in ports.nodes() {
        if !available.contains(node) && !missing.iter().any(|m| m == node.as_str()) {
            missing.push(node.to_string());
        }
    }
    if !missing.is_empty() {
        let mut listed: Vec<&Node> = available.iter().collect();
        listed.sort_by_key(|n| n.key());
        return Err(AnalysisError::PortNotFound {
            missing,
            available: listed.into_iter().map(Node::to_string).collect(),
        });
    }

    let signal_nodes: Vec<Node> = [&ports.p1n1, &ports.p2n1]
        .into_iter()
        .filter(|n| !netlist.explicit_grounds().contains(*n))
        .cloned()
        .collect();
    let topology = build_topology(netlist, &signal_nodes);
    if topology.element_count() == 0 {
        return Err(AnalysisError::EmptyCircuit);
    }

    let (input, output) = chain_ends(&topology);
    let flipped = input != output
        && output.as_ref() == Some(&ports.p1n1)
        && input.as_ref() == Some(&ports.p2n1);
    let on_chain = |n: &Node| input.as_ref() == Some(n) || output.as_ref() == Some(n);
    if !on_chain(&ports.p1n1) || !on_chain(&ports.p2n1) {
        warn!(
            "ports at nodes {} and {} are not the ends of the ladder ({:?} -> {:?})",
            ports.p1n1, ports.p2n1, input, output
        );
    }

    let z0 = array![
        port_impedance(netlist, &ports.p1n1, &ports.p1n2, options),
        port_impedance(netlist, &ports.p2n1, &ports.p2n2, options)
    ];
    Ok(ResolvedPorts {
        topology,
        flipped,
        z0,
    })
}

/// Impedance of the `Port` line on `(plus, minus)`, or the configured default
fn port_impedance(netlist: &Netlist, plus: &Node, minus: &Node, options: &AnalysisOptions) -> Complex64 {
    let impedance_of = |exact: bool| {
        netlist.ports().find_map(|c| {
            let (a, b) = c.terminals()?;
            let matches = a == plus && (!exact || b == minus);
            match c.kind {
                ComponentKind::Port { impedance, .. } if matches => Some(impedance),
                _ => None,
            }
        })
    };
    let z = impedance_of(true)
        .or_else(|| impedance_of(false))
        .flatten()
        .unwrap_or(options.port_z0);
    Complex64::new(z, 0.0)
}

/// Swap port 1 and port 2 of a Z, Y or S stack
fn flip_ports(p: &Array3<Complex64>) -> Array3<Complex64> {
    map_2x2(p, |m| Some([[m[1][1], m[1][0]], [m[0][1], m[0][0]]]))
}

/// ABCD of the same two-port driven from the other side
fn reverse_abcd(a: &Array3<Complex64>) -> Array3<Complex64> {
    map_2x2(a, |m| {
        let inv = checked_div(Complex64::new(1.0, 0.0), det_2x2(m))?;
        Some([[m[1][1] * inv, m[0][1] * inv], [m[1][0] * inv, m[0][0] * inv]])
    })
}

/// Compute two-port parameters of `netlist` over `frequency`
///
/// Port nodes must exist in the circuit (`"0"` and implicit grounds count).
/// The circuit is treated as a ladder between the ports; see
/// [`crate::cascade`].
pub fn compute_parameters(
    netlist: &Netlist,
    frequency: &Frequency,
    ports: &PortSpec,
    kind: ParameterKind,
    options: &AnalysisOptions,
) -> Result<ParameterSweep, AnalysisError> {
    let resolved = resolve_ports(netlist, ports, options)?;
    let cascade = build_cascade(netlist, &resolved.topology, frequency, options);
    info!(
        "{} parameters: {} elements over {} points ({:.4e} to {:.4e} Hz)",
        kind,
        cascade.element_count(),
        frequency.npoints(),
        frequency.start(),
        frequency.stop()
    );

    let z0 = resolved.z0;
    let flipped = resolved.flipped;
    let chain_z0 = if flipped { array![z0[1], z0[0]] } else { z0.clone() };
    let oriented = |p: Array3<Complex64>| if flipped { flip_ports(&p) } else { p };

    let data = match kind {
        ParameterKind::S => oriented(cascade.s_parameters(&chain_z0)),
        ParameterKind::Z => oriented(a2z(&cascade.abcd)),
        ParameterKind::Y => oriented(a2y(&cascade.abcd)),
        ParameterKind::Abcd if flipped => reverse_abcd(&cascade.abcd),
        ParameterKind::Abcd => cascade.abcd.clone(),
    };

    let singular = singular_points(&data);
    if !singular.is_empty() {
        warn!(
            "{} parameters singular at {} of {} points",
            kind,
            singular.len(),
            frequency.npoints()
        );
    }

    let reciprocal = match kind {
        ParameterKind::Abcd => (0..data.shape()[0])
            .map(|k| (det_2x2(&slice_2x2(&data, k)) - Complex64::new(1.0, 0.0)).norm())
            .filter(|e| !e.is_nan())
            .all(|e| e <= SWEEP_RECIPROCITY_TOL),
        _ => reciprocity_error(&data) <= SWEEP_RECIPROCITY_TOL,
    };
    let passive = match kind {
        ParameterKind::Z | ParameterKind::Y => diagonal_real_parts_nonnegative(&data, PROPERTY_TOL),
        ParameterKind::S => all_passive(&data),
        ParameterKind::Abcd => all_passive(&a2s(&data, &z0)),
    };

    Ok(ParameterSweep {
        kind,
        frequency: frequency.clone(),
        data,
        z0,
        reciprocal,
        passive,
        singular_points: singular,
        skipped: cascade.skipped,
        flipped,
        steps: cascade.steps,
    })
}

fn all_passive(s: &Array3<Complex64>) -> bool {
    (0..s.shape()[0]).all(|k| s_matrix_passive(&slice_2x2(s, k), 1e-9))
}
