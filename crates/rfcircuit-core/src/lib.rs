//! rfcircuit-core: two-port and nodal analysis of RF circuits
//!
//! Reads a textual netlist of lumped elements, transmission lines and stubs,
//! and computes its Z, Y, S or ABCD parameters over a frequency grid by
//! cascading the elements as a ladder. Modified nodal analysis covers DC,
//! AC and transient solutions of the same netlist.
//!
//! ## Modules
//!
//! - `netlist` - Netlist parsing, nodes and ground inference
//! - `frequency` - Frequency grid representation
//! - `elements` - Per-frequency element models (one-ports, line ABCD)
//! - `topology` - Series/shunt classification of a netlist
//! - `cascade` - ABCD cascade of a ladder topology
//! - `analysis` - Two-port parameter requests ([`compute_parameters`])
//! - `network` - Two-port network held as S-parameters
//! - `expr` / `symbolic` - Closed-form Z/Y expressions in `s`
//! - `nodal` - DC operating point, AC phasors, transient waveforms
//! - `math` - Conversions and parameter transforms
//!
//! ## Example
//! ```
//! use rfcircuit_core::{compute_parameters, parse_netlist, AnalysisOptions, Frequency, ParameterKind, PortSpec};
//!
//! let netlist = parse_netlist("R1 1 2 50\nPort1 1 0\nPort2 2 0").unwrap();
//! let freq = Frequency::linear_hz(1e6, 1e9, 11).unwrap();
//! let s = compute_parameters(
//!     &netlist,
//!     &freq,
//!     &PortSpec::new("1", "0", "2", "0"),
//!     ParameterKind::S,
//!     &AnalysisOptions::default(),
//! )
//! .unwrap();
//! assert!((s.entry(0, 1, 0).re() - 2.0 / 3.0).abs() < 1e-12);
//! ```

pub mod analysis;
pub mod cascade;
pub mod config;
pub mod constants;
pub mod elements;
pub mod error;
pub mod expr;
pub mod frequency;
pub mod math;
pub mod netlist;
pub mod network;
pub mod nodal;
pub mod symbolic;
pub mod topology;

pub use analysis::{compute_parameters, ParameterEntry, ParameterKind, ParameterSweep, PortSpec};
pub use config::{AnalysisOptions, TransientOptions};
pub use error::{AnalysisError, EvalError, ExprError, NodalError, ParseError};
pub use expr::Expr;
pub use frequency::Frequency;
pub use netlist::{parse_netlist, Netlist, Node};
pub use network::Network;
pub use nodal::{ac_analysis, dc_operating_point, transient_analysis};
pub use symbolic::{evaluate_at, y_parameters_symbolic, z_parameters_symbolic, TwoPortExpression};
