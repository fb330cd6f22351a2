//! DC operating point

use indexmap::IndexMap;
use log::{debug, info, warn};
use num_complex::Complex64;

use super::mna::{assemble, ElementReading, Layout, Stamp};
use super::{resistor_admittance, static_stamp};
use crate::config::AnalysisOptions;
use crate::constants::{
    DIODE_FORWARD_VOLTAGE, DIODE_OFF_RESISTANCE, DIODE_ON_RESISTANCE, DIODE_REVERSE_MARGIN, GMIN,
    MAX_SEARCH_DIODES,
};
use crate::error::{AnalysisError, NodalError};
use crate::netlist::{Component, ComponentKind, Netlist, Node};

/// Assumed conduction state of an ideal diode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiodeState {
    On,
    Off,
}

/// Result of [`dc_operating_point`]
#[derive(Debug, Clone)]
pub struct DcSolution {
    /// Voltages of the non-ground nodes
    pub node_voltages: IndexMap<Node, f64>,
    /// Voltage and current of every element, by name
    pub elements: IndexMap<String, ElementReading<f64>>,
    /// State chosen for each diode (empty without diodes)
    pub diode_states: IndexMap<String, DiodeState>,
}

impl DcSolution {
    /// Node voltage; grounds and unknown nodes read 0
    pub fn voltage(&self, node: &Node) -> f64 {
        self.node_voltages.get(node).copied().unwrap_or(0.0)
    }

    pub fn element(&self, name: &str) -> Option<&ElementReading<f64>> {
        self.elements.get(name)
    }
}

/// Stamp of one element at DC
///
/// Sources hold their DC term plus any sine offset. Diodes without an
/// assigned state use the linear stand-in.
fn dc_stamp(c: &Component, options: &AnalysisOptions, diodes: &IndexMap<String, DiodeState>) -> Stamp {
    if let Some(stamp) = static_stamp(&c.kind, options) {
        return stamp;
    }
    let zero = Complex64::new(0.0, 0.0);
    match &c.kind {
        ComponentKind::Inductor(_) => Stamp::Branch {
            impedance: zero,
            voltage: zero,
        },
        ComponentKind::VoltageSource(src) => Stamp::Branch {
            impedance: zero,
            voltage: Complex64::new(src.value_at(0.0), 0.0),
        },
        ComponentKind::CurrentSource(src) => Stamp::Source(Complex64::new(src.value_at(0.0), 0.0)),
        ComponentKind::Diode => {
            let r = match diodes.get(&c.name) {
                Some(DiodeState::On) => DIODE_ON_RESISTANCE,
                Some(DiodeState::Off) => DIODE_OFF_RESISTANCE,
                None => options.diode_resistance,
            };
            Stamp::Admittance(resistor_admittance(r, options))
        }
        _ => Stamp::Open,
    }
}

/// Solve the circuit once for a fixed set of diode states
fn solve_with(
    netlist: &Netlist,
    layout: &Layout,
    options: &AnalysisOptions,
    diodes: &IndexMap<String, DiodeState>,
) -> Result<DcSolution, NodalError> {
    let assembly = assemble(netlist, layout, GMIN, |c| dc_stamp(c, options, diodes))?;
    let x = assembly.system.solve_real("DC")?;
    let xc = x.mapv(|v| Complex64::new(v, 0.0));
    let elements = assembly
        .readings(layout, &xc)
        .into_iter()
        .map(|(name, r)| (name, r.map(|v| v.re)))
        .collect();
    Ok(DcSolution {
        node_voltages: layout.node_voltages(&x),
        elements,
        diode_states: diodes.clone(),
    })
}

/// Diode states encoded by `mask`: bit `i` set means diode `i` conducts
///
/// Diodes beyond the searched ones stay off.
fn diode_states(diodes: &[&Component], mask: usize) -> IndexMap<String, DiodeState> {
    diodes
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let on = i < MAX_SEARCH_DIODES && mask & (1 << i) != 0;
            let state = if on { DiodeState::On } else { DiodeState::Off };
            (d.name.clone(), state)
        })
        .collect()
}

/// Every ON diode is not reverse biased and every OFF diode is not forward biased
fn consistent(diodes: &[&Component], solution: &DcSolution) -> bool {
    diodes.iter().all(|d| {
        let Some((anode, cathode)) = d.terminals() else {
            return true;
        };
        let vd = solution.voltage(anode) - solution.voltage(cathode);
        match solution.diode_states.get(&d.name) {
            Some(DiodeState::On) => vd >= DIODE_REVERSE_MARGIN,
            Some(DiodeState::Off) => vd <= DIODE_FORWARD_VOLTAGE,
            None => true,
        }
    })
}

/// Compute the DC operating point of `netlist`
///
/// Capacitors are open, inductors are shorts carrying a branch current, and
/// sources hold their DC value. Diodes are ideal switches: every on/off
/// combination of the first [`MAX_SEARCH_DIODES`] diodes is tried in turn
/// (ON as a small resistor, OFF as a large one) until one is consistent with
/// the voltages it produces.
///
/// # Errors
/// `NoConsistentDiodeState` when no combination is consistent,
/// `SingularSystem` when a diode-free circuit cannot be solved.
pub fn dc_operating_point(
    netlist: &Netlist,
    options: &AnalysisOptions,
) -> Result<DcSolution, AnalysisError> {
    let layout = Layout::new(netlist);
    let diodes: Vec<&Component> = netlist
        .components()
        .filter(|c| matches!(c.kind, ComponentKind::Diode))
        .collect();

    if diodes.is_empty() {
        return Ok(solve_with(netlist, &layout, options, &IndexMap::new())?);
    }

    let searched = diodes.len().min(MAX_SEARCH_DIODES);
    if diodes.len() > MAX_SEARCH_DIODES {
        warn!(
            "{} diodes; searching the first {} and holding the rest off",
            diodes.len(),
            MAX_SEARCH_DIODES
        );
    }

    let tried = 1usize << searched;
    for mask in 0..tried {
        let states = diode_states(&diodes, mask);
        let solution = match solve_with(netlist, &layout, options, &states) {
            Ok(solution) => solution,
            Err(e) => {
                debug!("diode state {mask:#b}: {e}");
                continue;
            }
        };
        if consistent(&diodes, &solution) {
            info!("consistent diode state {mask:#b}: {:?}", solution.diode_states);
            return Ok(solution);
        }
        debug!("diode state {mask:#b} is inconsistent");
    }

    Err(NodalError::NoConsistentDiodeState { tried }.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::parse_netlist;
    use approx::assert_relative_eq;

    fn node(s: &str) -> Node {
        Node::from(s)
    }

    #[test]
    fn test_divider_with_inductor_and_capacitor() {
        let netlist = parse_netlist(
            "V1 1 0 10\n\
             L1 1 2 1m\n\
             R1 2 3 1k\n\
             R2 3 0 1k\n\
             C1 3 0 1u",
        )
        .unwrap();
        let sol = dc_operating_point(&netlist, &AnalysisOptions::default()).unwrap();

        assert_relative_eq!(sol.voltage(&node("2")), 10.0, epsilon = 1e-6);
        assert_relative_eq!(sol.voltage(&node("3")), 5.0, epsilon = 1e-6);
        let l1 = sol.element("L1").unwrap();
        assert_relative_eq!(l1.current, 5e-3, epsilon = 1e-9);
        assert_relative_eq!(l1.voltage, 0.0, epsilon = 1e-9);
        assert_relative_eq!(sol.element("C1").unwrap().current, 0.0);
        assert_relative_eq!(sol.element("V1").unwrap().current, -5e-3, epsilon = 1e-9);
    }

    #[test]
    fn test_current_source_and_vccs() {
        // 1 mA into node 1 over 1k; VCCS1 draws 2 mS * V(1) out of node 2 over 500 R
        let netlist = parse_netlist(
            "I1 0 1 1m\n\
             R1 1 0 1k\n\
             VCCS1 2 0 1 0 2m\n\
             R2 2 0 500",
        )
        .unwrap();
        let sol = dc_operating_point(&netlist, &AnalysisOptions::default()).unwrap();
        assert_relative_eq!(sol.voltage(&node("1")), 1.0, epsilon = 1e-6);
        assert_relative_eq!(sol.voltage(&node("2")), -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_forward_diode_conducts() {
        let netlist = parse_netlist("V1 1 0 5\nR1 1 2 1k\nD1 2 0").unwrap();
        let sol = dc_operating_point(&netlist, &AnalysisOptions::default()).unwrap();
        assert_eq!(sol.diode_states["D1"], DiodeState::On);
        assert!(sol.voltage(&node("2")).abs() < 1e-3);
    }

    #[test]
    fn test_reverse_diode_blocks() {
        let netlist = parse_netlist("V1 1 0 5\nR1 1 2 1k\nD1 0 2").unwrap();
        let sol = dc_operating_point(&netlist, &AnalysisOptions::default()).unwrap();
        assert_eq!(sol.diode_states["D1"], DiodeState::Off);
        assert_relative_eq!(sol.voltage(&node("2")), 5.0, epsilon = 1e-4);
    }

    #[test]
    fn test_unknown_control_source() {
        let netlist = parse_netlist("V1 1 0 1\nR1 1 0 1k\nF1 2 0 Vx 2\nR2 2 0 1k").unwrap();
        let err = dc_operating_point(&netlist, &AnalysisOptions::default()).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::Nodal(NodalError::UnknownControlSource {
                element: "F1".into(),
                source_name: "Vx".into(),
            })
        );
    }
}
