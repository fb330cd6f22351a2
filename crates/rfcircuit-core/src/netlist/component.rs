//! Circuit components and nodes

use std::f64::consts::PI;
use std::fmt;

use num_complex::Complex64;

use crate::math::conversions::magdeg_2_reim;

/// A circuit node, identified by its textual label
///
/// Numeric labels order numerically and come before every non-numeric label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node(String);

/// Ordering key for [`Node`]: `(0, n)` for numeric labels, `(1, 0)` otherwise
pub type NodeKey = (u8, u64);

impl Node {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// The explicit reference node `"0"`
    pub fn reference() -> Self {
        Self("0".to_string())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the explicit reference node `"0"`
    #[inline]
    pub fn is_reference(&self) -> bool {
        self.0 == "0"
    }

    /// Sort key; non-numeric labels compare equal to each other
    pub fn key(&self) -> NodeKey {
        match self.0.parse::<u64>() {
            Ok(n) => (0, n),
            Err(_) => (1, 0),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::new(s)
    }
}

/// Transmission line / stub description
///
/// The electrical length scales linearly with frequency:
/// `θ(f) = theta_deg * f / f_ref`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSpec {
    /// Characteristic impedance Zc in ohms
    pub z0: f64,
    /// Electrical length at `f_ref`, in degrees
    pub theta_deg: f64,
    /// Reference frequency in Hz; `None` uses the configured default
    pub f_ref: Option<f64>,
}

impl LineSpec {
    /// Electrical length in radians at `f` Hz
    pub fn theta_at(&self, f: f64, default_f_ref: f64) -> f64 {
        let f_ref = self.f_ref.unwrap_or(default_f_ref);
        (self.theta_deg * f / f_ref).to_radians()
    }
}

/// Sinusoidal source term `offset + amplitude * sin(2π f t)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sine {
    pub offset: f64,
    pub amplitude: f64,
    pub frequency: f64,
}

/// Independent source description
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SourceSpec {
    pub dc: f64,
    pub ac_magnitude: f64,
    pub ac_phase_deg: f64,
    pub sine: Option<Sine>,
}

impl SourceSpec {
    /// Constant source of value `dc`
    pub fn dc(value: f64) -> Self {
        Self {
            dc: value,
            ..Self::default()
        }
    }

    /// Small-signal phasor used in AC analysis
    ///
    /// A sine source without an explicit AC magnitude contributes its
    /// amplitude at zero phase.
    pub fn phasor(&self) -> Complex64 {
        if self.ac_magnitude != 0.0 {
            magdeg_2_reim(self.ac_magnitude, self.ac_phase_deg)
        } else if let Some(sine) = self.sine {
            Complex64::new(sine.amplitude, 0.0)
        } else {
            Complex64::new(0.0, 0.0)
        }
    }

    /// Instantaneous value at time `t` (transient analysis)
    pub fn value_at(&self, t: f64) -> f64 {
        match self.sine {
            Some(s) => self.dc + s.offset + s.amplitude * (2.0 * PI * s.frequency * t).sin(),
            None => self.dc,
        }
    }
}

/// Closed set of supported component kinds
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentKind {
    Resistor(f64),
    Capacitor(f64),
    Inductor(f64),
    /// Connection modelled as a very small resistor
    Wire,
    TransmissionLine(LineSpec),
    OpenStub(LineSpec),
    ShortStub(LineSpec),
    /// Port declaration; `impedance: None` uses the configured default
    Port {
        number: Option<usize>,
        impedance: Option<f64>,
    },
    /// Declares its node as an explicit ground
    Ground,
    VoltageSource(SourceSpec),
    CurrentSource(SourceSpec),
    /// Voltage-controlled voltage source
    Vcvs { control: (Node, Node), gain: f64 },
    /// Voltage-controlled current source
    Vccs { control: (Node, Node), gain: f64 },
    /// Current-controlled current source (control = voltage source name)
    Cccs { control: String, gain: f64 },
    /// Current-controlled voltage source (control = voltage source name)
    Ccvs { control: String, gain: f64 },
    Diode,
}

impl ComponentKind {
    /// Human-readable kind name used in diagnostics
    pub fn label(&self) -> &'static str {
        match self {
            ComponentKind::Resistor(_) => "resistor",
            ComponentKind::Capacitor(_) => "capacitor",
            ComponentKind::Inductor(_) => "inductor",
            ComponentKind::Wire => "wire",
            ComponentKind::TransmissionLine(_) => "transmission line",
            ComponentKind::OpenStub(_) => "open stub",
            ComponentKind::ShortStub(_) => "short stub",
            ComponentKind::Port { .. } => "port",
            ComponentKind::Ground => "ground",
            ComponentKind::VoltageSource(_) => "voltage source",
            ComponentKind::CurrentSource(_) => "current source",
            ComponentKind::Vcvs { .. } => "VCVS",
            ComponentKind::Vccs { .. } => "VCCS",
            ComponentKind::Cccs { .. } => "CCCS",
            ComponentKind::Ccvs { .. } => "CCVS",
            ComponentKind::Diode => "diode",
        }
    }

    /// Kinds that describe circuit topology rather than a circuit element
    pub fn is_directive(&self) -> bool {
        matches!(self, ComponentKind::Port { .. } | ComponentKind::Ground)
    }
}

/// A named circuit element with its nodes (a pair, or a single node for ground)
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: String,
    pub kind: ComponentKind,
    pub nodes: Vec<Node>,
    /// Source line (1-based)
    pub line: usize,
}

impl Component {
    pub fn new(name: impl Into<String>, kind: ComponentKind, nodes: Vec<Node>) -> Self {
        Self {
            name: name.into(),
            kind,
            nodes,
            line: 0,
        }
    }

    /// The two main terminals, if the component has them
    pub fn terminals(&self) -> Option<(&Node, &Node)> {
        match self.nodes.as_slice() {
            [a, b, ..] => Some((a, b)),
            _ => None,
        }
    }
}
