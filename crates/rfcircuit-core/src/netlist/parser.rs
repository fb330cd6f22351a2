//! Line-oriented netlist parser
//!
//! One component per line: `<name> <node> <node> [fields...]`. The kind is
//! taken from the name prefix. Lines that cannot be read are skipped and
//! reported together at the end; parsing only fails when nothing usable
//! remains.

use log::{debug, warn};

use super::component::{Component, ComponentKind, LineSpec, Node, Sine, SourceSpec};
use super::value::{is_unit_token, parse_value, parse_value_with_unit};
use super::Netlist;
use crate::error::ParseError;
use crate::frequency::{Frequency, FrequencyUnit, SweepType};

/// Component kinds as recognized from a name prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prefix {
    Port,
    Ground,
    Line,
    OpenStub,
    ShortStub,
    Resistor,
    Capacitor,
    Inductor,
    Wire,
    VoltageSource,
    CurrentSource,
    Vcvs,
    Vccs,
    Cccs,
    Ccvs,
    Diode,
}

impl Prefix {
    fn classify(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        for (p, kind) in [
            ("VCVS", Prefix::Vcvs),
            ("VCCS", Prefix::Vccs),
            ("CCVS", Prefix::Ccvs),
            ("CCCS", Prefix::Cccs),
        ] {
            if upper.starts_with(p) {
                return Some(kind);
            }
        }
        let kind = match upper.chars().next()? {
            'P' => Prefix::Port,
            'G' => Prefix::Ground,
            'T' => Prefix::Line,
            'O' => Prefix::OpenStub,
            'S' => Prefix::ShortStub,
            'R' => Prefix::Resistor,
            'C' => Prefix::Capacitor,
            'L' => Prefix::Inductor,
            'W' => Prefix::Wire,
            'V' => Prefix::VoltageSource,
            'I' => Prefix::CurrentSource,
            'E' => Prefix::Vcvs,
            'F' => Prefix::Cccs,
            'H' => Prefix::Ccvs,
            'D' => Prefix::Diode,
            _ => return None,
        };
        Some(kind)
    }

    /// Minimum number of whitespace-separated fields, name included
    fn min_tokens(self) -> usize {
        match self {
            Prefix::Ground => 2,
            Prefix::Port | Prefix::Wire | Prefix::Diode => 3,
            Prefix::Resistor
            | Prefix::Capacitor
            | Prefix::Inductor
            | Prefix::VoltageSource
            | Prefix::CurrentSource => 4,
            Prefix::Line | Prefix::OpenStub | Prefix::ShortStub => 5,
            Prefix::Cccs | Prefix::Ccvs => 5,
            Prefix::Vcvs | Prefix::Vccs => 6,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Prefix::Port => "port",
            Prefix::Ground => "ground",
            Prefix::Line => "transmission line",
            Prefix::OpenStub => "open stub",
            Prefix::ShortStub => "short stub",
            Prefix::Resistor => "resistor",
            Prefix::Capacitor => "capacitor",
            Prefix::Inductor => "inductor",
            Prefix::Wire => "wire",
            Prefix::VoltageSource => "voltage source",
            Prefix::CurrentSource => "current source",
            Prefix::Vcvs => "VCVS",
            Prefix::Vccs => "VCCS",
            Prefix::Cccs => "CCCS",
            Prefix::Ccvs => "CCVS",
            Prefix::Diode => "diode",
        }
    }
}

/// Parse netlist text
///
/// # Example
/// ```
/// use rfcircuit_core::netlist::parse_netlist;
///
/// let netlist = parse_netlist("R1 1 2 50\nC1 2 0 1pF\n# comment\nbogus line").unwrap();
/// assert_eq!(netlist.len(), 2);
/// assert_eq!(netlist.issues().len(), 1);
/// ```
pub fn parse_netlist(text: &str) -> Result<Netlist, ParseError> {
    let mut netlist = Netlist::default();
    let mut issues = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw);
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        if tokens[0] == "f" {
            match parse_frequency_directive(line_no, &tokens) {
                Ok(freq) => netlist.frequency = Some(freq),
                Err(e) => {
                    warn!("skipping {e}");
                    issues.push(e);
                }
            }
            continue;
        }

        match parse_component(line_no, line, &tokens) {
            Ok(component) if netlist.components.contains_key(&component.name) => {
                let e = ParseError::DuplicateName {
                    line: line_no,
                    name: component.name,
                };
                warn!("skipping {e}");
                issues.push(e);
            }
            Ok(component) => {
                debug!(
                    "line {}: {} `{}` on nodes {:?}",
                    line_no,
                    component.kind.label(),
                    component.name,
                    component.nodes.iter().map(Node::as_str).collect::<Vec<_>>()
                );
                netlist.insert(component);
            }
            Err(e) => {
                warn!("skipping {e}");
                issues.push(e);
            }
        }
    }

    if netlist.is_empty() {
        return Err(ParseError::NoComponents { issues });
    }
    if !issues.is_empty() {
        warn!(
            "{} netlist line(s) skipped: {}",
            issues.len(),
            issues
                .iter()
                .filter_map(ParseError::line)
                .map(|l| l.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    netlist.issues = issues;
    netlist.detect_implicit_grounds();
    Ok(netlist)
}

/// Remove full-line and trailing comments
fn strip_comment(raw: &str) -> &str {
    let line = raw.trim();
    if line.starts_with('*') || line.starts_with('!') || line.starts_with("//") {
        return "";
    }
    let end = line.find(['#', ';']).unwrap_or(line.len());
    line[..end].trim()
}

/// `f <start> <stop> <count> [unit]`
fn parse_frequency_directive(line: usize, tokens: &[&str]) -> Result<Frequency, ParseError> {
    let invalid = |message: String| ParseError::InvalidDirective { line, message };

    if tokens.len() < 4 {
        return Err(invalid(format!(
            "expected `f start stop count unit`, found {} field(s)",
            tokens.len()
        )));
    }
    let unit = match tokens.get(4) {
        Some(u) => u.parse::<FrequencyUnit>().map_err(|e| invalid(e.to_string()))?,
        None => FrequencyUnit::Hz,
    };
    let start = parse_value(tokens[1]).map_err(&invalid)?;
    let stop = parse_value(tokens[2]).map_err(&invalid)?;
    let count = tokens[3]
        .parse::<usize>()
        .map_err(|_| invalid(format!("invalid point count `{}`", tokens[3])))?;

    Frequency::new(start, stop, count, unit, SweepType::Linear).map_err(|e| invalid(e.to_string()))
}

fn parse_component(line: usize, text: &str, tokens: &[&str]) -> Result<Component, ParseError> {
    let name = tokens[0];
    let prefix = Prefix::classify(name).ok_or_else(|| ParseError::UnknownComponent {
        line,
        name: name.to_string(),
    })?;

    if tokens.len() < prefix.min_tokens() {
        return Err(ParseError::MalformedLine {
            line,
            kind: prefix.label(),
            expected: prefix.min_tokens(),
            found: tokens.len(),
            text: text.to_string(),
        });
    }

    let value = |idx: usize| -> Result<f64, ParseError> {
        let unit = tokens.get(idx + 1).copied().filter(|t| is_unit_token(t));
        parse_value_with_unit(tokens[idx], unit).map_err(|reason| ParseError::InvalidValue {
            line,
            token: tokens[idx].to_string(),
            reason,
        })
    };
    let pair = || vec![Node::new(tokens[1]), Node::new(tokens[2])];

    let (kind, nodes) = match prefix {
        Prefix::Resistor => (ComponentKind::Resistor(value(3)?), pair()),
        Prefix::Capacitor => (ComponentKind::Capacitor(value(3)?), pair()),
        Prefix::Inductor => (ComponentKind::Inductor(value(3)?), pair()),
        Prefix::Wire => (ComponentKind::Wire, pair()),
        Prefix::Diode => (ComponentKind::Diode, pair()),
        Prefix::Line | Prefix::OpenStub | Prefix::ShortStub => {
            let spec = LineSpec {
                z0: value(3)?,
                theta_deg: value(4)?,
                f_ref: if tokens.len() > 5 { Some(value(5)?) } else { None },
            };
            let kind = match prefix {
                Prefix::Line => ComponentKind::TransmissionLine(spec),
                Prefix::OpenStub => ComponentKind::OpenStub(spec),
                _ => ComponentKind::ShortStub(spec),
            };
            (kind, pair())
        }
        Prefix::Port => {
            let impedance = if tokens.len() > 3 { Some(value(3)?) } else { None };
            let number = port_number(name);
            (ComponentKind::Port { number, impedance }, pair())
        }
        Prefix::Ground => (ComponentKind::Ground, vec![Node::new(tokens[1])]),
        Prefix::VoltageSource => (
            ComponentKind::VoltageSource(parse_source(line, &tokens[3..])?),
            pair(),
        ),
        Prefix::CurrentSource => (
            ComponentKind::CurrentSource(parse_source(line, &tokens[3..])?),
            pair(),
        ),
        Prefix::Vcvs | Prefix::Vccs => {
            let control = (Node::new(tokens[3]), Node::new(tokens[4]));
            let gain = value(5)?;
            let kind = if prefix == Prefix::Vcvs {
                ComponentKind::Vcvs { control, gain }
            } else {
                ComponentKind::Vccs { control, gain }
            };
            (kind, pair())
        }
        Prefix::Cccs | Prefix::Ccvs => {
            let control = tokens[3].to_string();
            let gain = value(4)?;
            let kind = if prefix == Prefix::Cccs {
                ComponentKind::Cccs { control, gain }
            } else {
                ComponentKind::Ccvs { control, gain }
            };
            (kind, pair())
        }
    };

    Ok(Component {
        name: name.to_string(),
        kind,
        nodes,
        line,
    })
}

/// Trailing digits of a port name (`Port2` -> 2, `P1` -> 1)
fn port_number(name: &str) -> Option<usize> {
    let digits: String = name
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().ok()
}

/// Source fields: `[DC] v`, `AC mag [phase]`, `SIN(offset amp freq)`, in any combination
fn parse_source(line: usize, fields: &[&str]) -> Result<SourceSpec, ParseError> {
    let joined = fields.join(" ").replace(['(', ')', ','], " ");
    let tokens: Vec<&str> = joined.split_whitespace().collect();
    let num = |i: usize| -> Result<f64, ParseError> {
        let token = tokens.get(i).copied().unwrap_or("");
        parse_value(token).map_err(|reason| ParseError::InvalidValue {
            line,
            token: token.to_string(),
            reason,
        })
    };

    let mut spec = SourceSpec::default();
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i].to_ascii_uppercase().as_str() {
            "DC" => {
                spec.dc = num(i + 1)?;
                i += 2;
            }
            "AC" => {
                spec.ac_magnitude = num(i + 1)?;
                i += 2;
                if let Some(Ok(phase)) = tokens.get(i).map(|t| parse_value(t)) {
                    spec.ac_phase_deg = phase;
                    i += 1;
                }
            }
            "SIN" => {
                spec.sine = Some(Sine {
                    offset: num(i + 1)?,
                    amplitude: num(i + 2)?,
                    frequency: num(i + 3)?,
                });
                i += 4;
            }
            _ => {
                spec.dc = num(i)?;
                i += 1;
            }
        }
    }
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_prefix_classification() {
        assert_eq!(Prefix::classify("Port1"), Some(Prefix::Port));
        assert_eq!(Prefix::classify("Ground"), Some(Prefix::Ground));
        assert_eq!(Prefix::classify("TL1"), Some(Prefix::Line));
        assert_eq!(Prefix::classify("os2"), Some(Prefix::OpenStub));
        assert_eq!(Prefix::classify("SS1"), Some(Prefix::ShortStub));
        assert_eq!(Prefix::classify("CCVS1"), Some(Prefix::Ccvs));
        assert_eq!(Prefix::classify("C1"), Some(Prefix::Capacitor));
        assert_eq!(Prefix::classify("X1"), None);
    }

    #[test]
    fn test_port_number() {
        assert_eq!(port_number("Port2"), Some(2));
        assert_eq!(port_number("P10"), Some(10));
        assert_eq!(port_number("Pin"), None);
    }

    #[test]
    fn test_source_forms() {
        let dc = parse_source(1, &["5"]).unwrap();
        assert_eq!(dc.dc, 5.0);

        let ac = parse_source(1, &["AC", "1", "30"]).unwrap();
        assert_eq!(ac.ac_magnitude, 1.0);
        assert_eq!(ac.ac_phase_deg, 30.0);

        let sine = parse_source(1, &["SIN(0", "2", "1k)"]).unwrap();
        let s = sine.sine.unwrap();
        assert_eq!(s.amplitude, 2.0);
        assert_relative_eq!(s.frequency, 1000.0, epsilon = 1e-9);

        let combined = parse_source(1, &["DC", "1", "AC", "0.5"]).unwrap();
        assert_eq!(combined.dc, 1.0);
        assert_eq!(combined.ac_magnitude, 0.5);

        assert!(parse_source(1, &["AC"]).is_err());
    }

    #[test]
    fn test_comment_stripping() {
        assert_eq!(strip_comment("  * spice comment"), "");
        assert_eq!(strip_comment("R1 1 2 50 ; trailing"), "R1 1 2 50");
        assert_eq!(strip_comment("# whole line"), "");
    }
}
