//! Error types
//!
//! Hard failures are returned as `Err`. Conditions that only degrade part of
//! a result (a singular frequency point, one unevaluable matrix entry) are
//! reported alongside the value instead.

use thiserror::Error;

/// Errors raised while reading a netlist
///
/// Every variant except [`ParseError::NoComponents`] describes a single line
/// that was skipped; those are collected on the parsed netlist.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    // ============ Line-level issues ============
    /// Too few tokens for the component kind
    #[error("line {line}: {kind} `{text}` needs at least {expected} fields, found {found}")]
    MalformedLine {
        line: usize,
        kind: &'static str,
        expected: usize,
        found: usize,
        text: String,
    },

    /// Name prefix does not map to a supported component
    #[error("line {line}: unsupported component `{name}`")]
    UnknownComponent { line: usize, name: String },

    /// Numeric field could not be read
    #[error("line {line}: invalid value `{token}`: {reason}")]
    InvalidValue {
        line: usize,
        token: String,
        reason: String,
    },

    /// Component name already defined earlier in the netlist
    #[error("line {line}: duplicate component name `{name}`")]
    DuplicateName { line: usize, name: String },

    /// Malformed `f start stop count unit` directive
    #[error("line {line}: invalid frequency directive: {message}")]
    InvalidDirective { line: usize, message: String },

    // ============ Netlist-level failure ============
    /// Nothing usable was left after skipping bad lines
    #[error("netlist contains no usable components ({} line(s) skipped)", .issues.len())]
    NoComponents { issues: Vec<ParseError> },
}

impl ParseError {
    /// Source line of a line-level issue
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::MalformedLine { line, .. }
            | ParseError::UnknownComponent { line, .. }
            | ParseError::InvalidValue { line, .. }
            | ParseError::DuplicateName { line, .. }
            | ParseError::InvalidDirective { line, .. } => Some(*line),
            ParseError::NoComponents { .. } => None,
        }
    }
}

/// Syntax errors in a textual symbolic expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("unexpected `{token}` at position {position}")]
    UnexpectedToken { token: String, position: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unknown function `{0}`")]
    UnknownFunction(String),
}

/// Failure to evaluate a single parameter entry at one frequency
///
/// The entry degrades to `0 + 0j`; the cause is kept as a diagnostic.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not finite")]
    NonFinite,

    #[error("unbound variable `{0}`")]
    UnboundVariable(String),

    #[error("frequency {frequency} Hz outside sampled range [{start}, {stop}] Hz")]
    OutOfRange { frequency: f64, start: f64, stop: f64 },
}

/// Failures of the nodal (DC/AC/transient) solvers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodalError {
    #[error("{analysis} system is singular")]
    SingularSystem { analysis: &'static str },

    #[error("no consistent diode on/off state among {tried} candidates")]
    NoConsistentDiodeState { tried: usize },

    #[error("element `{element}` is controlled by unknown voltage source `{source_name}`")]
    UnknownControlSource { element: String, source_name: String },

    #[error("invalid time window: stop = {stop} s, points = {points}")]
    InvalidTimeWindow { stop: f64, points: usize },
}

/// Failures of a whole analysis request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Requested port nodes are not part of the circuit
    #[error("port node(s) {missing:?} not found; available nodes: {available:?}")]
    PortNotFound {
        missing: Vec<String>,
        available: Vec<String>,
    },

    /// No element contributes to the two-port
    #[error("circuit has no network elements between the ports")]
    EmptyCircuit,

    #[error("invalid frequency grid: {0}")]
    InvalidFrequency(String),

    #[error("unknown parameter kind `{0}` (expected z, y, s or abcd)")]
    UnknownParameterKind(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Nodal(#[from] NodalError),
}

/// Result alias for analysis entry points
pub type Result<T> = std::result::Result<T, AnalysisError>;
