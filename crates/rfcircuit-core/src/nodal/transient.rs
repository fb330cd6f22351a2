//! Transient analysis with backward-Euler companion models

use indexmap::IndexMap;
use log::{debug, info};
use num_complex::Complex64;

use super::mna::{assemble, Layout, Stamp};
use super::{resistor_admittance, static_stamp};
use crate::config::{AnalysisOptions, TransientOptions};
use crate::constants::GMIN;
use crate::error::{AnalysisError, NodalError};
use crate::netlist::{Component, ComponentKind, Netlist, Node};

/// Voltage and current samples of one element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Waveform {
    pub voltage: Vec<f64>,
    pub current: Vec<f64>,
}

/// Result of [`transient_analysis`]
#[derive(Debug, Clone)]
pub struct TransientSolution {
    /// Sample times in seconds, from 0 to the stop time
    pub time: Vec<f64>,
    pub node_voltages: IndexMap<Node, Vec<f64>>,
    /// Waveforms of the resistors, inductors and capacitors
    pub elements: IndexMap<String, Waveform>,
}

impl TransientSolution {
    pub fn voltage(&self, node: &Node) -> Option<&[f64]> {
        self.node_voltages.get(node).map(Vec::as_slice)
    }

    pub fn element(&self, name: &str) -> Option<&Waveform> {
        self.elements.get(name)
    }
}

/// Energy-storage state carried between time steps
#[derive(Debug, Default)]
struct History {
    capacitor_voltage: IndexMap<String, f64>,
    inductor_current: IndexMap<String, f64>,
}

/// Element stamp for the step ending at `t`
///
/// `step = None` is the initial point: capacitors hold 0 V (a wire) and
/// inductors carry no current.
fn transient_stamp(
    c: &Component,
    t: f64,
    step: Option<f64>,
    history: &History,
    options: &AnalysisOptions,
) -> Stamp {
    if let Some(stamp) = static_stamp(&c.kind, options) {
        return stamp;
    }
    let real = |v: f64| Complex64::new(v, 0.0);
    match (&c.kind, step) {
        (ComponentKind::Capacitor(_), None) => {
            Stamp::Admittance(resistor_admittance(options.wire_resistance, options))
        }
        (ComponentKind::Capacitor(cap), Some(h)) => {
            let g = cap / h;
            let v_prev = history.capacitor_voltage.get(&c.name).copied().unwrap_or(0.0);
            Stamp::Norton {
                admittance: real(g),
                history: real(g * v_prev),
            }
        }
        (ComponentKind::Inductor(_), None) => Stamp::FixedCurrent(real(0.0)),
        (ComponentKind::Inductor(l), Some(h)) => {
            let r = l / h;
            let i_prev = history.inductor_current.get(&c.name).copied().unwrap_or(0.0);
            Stamp::Branch {
                impedance: real(r),
                voltage: real(-r * i_prev),
            }
        }
        (ComponentKind::VoltageSource(src), _) => Stamp::Branch {
            impedance: real(0.0),
            voltage: real(src.value_at(t)),
        },
        (ComponentKind::CurrentSource(src), _) => Stamp::Source(real(src.value_at(t))),
        (ComponentKind::Diode, _) => {
            Stamp::Admittance(resistor_admittance(options.diode_resistance, options))
        }
        _ => Stamp::Open,
    }
}

fn is_recorded(kind: &ComponentKind) -> bool {
    matches!(
        kind,
        ComponentKind::Resistor(_) | ComponentKind::Inductor(_) | ComponentKind::Capacitor(_)
    )
}

/// Simulate `netlist` from a zero initial state over `window`
///
/// Samples are evenly spaced from `t = 0` to `window.stop`. Sources follow
/// `dc + offset + amplitude * sin(2π f t)`. Lines and stubs keep their DC
/// behaviour; diodes are the linear stand-in.
///
/// # Errors
/// `InvalidTimeWindow` unless the stop time is positive and there are at
/// least two points; `SingularSystem` if any step cannot be solved.
pub fn transient_analysis(
    netlist: &Netlist,
    window: &TransientOptions,
    options: &AnalysisOptions,
) -> Result<TransientSolution, AnalysisError> {
    if !(window.stop.is_finite() && window.stop > 0.0) || window.points < 2 {
        return Err(NodalError::InvalidTimeWindow {
            stop: window.stop,
            points: window.points,
        }
        .into());
    }
    let h = window.step();
    let layout = Layout::new(netlist);
    info!(
        "transient: {} points, step {:.3e} s, stop {:.3e} s",
        window.points, h, window.stop
    );

    let mut history = History::default();
    let mut time = Vec::with_capacity(window.points);
    let mut node_voltages: IndexMap<Node, Vec<f64>> = IndexMap::new();
    let mut elements: IndexMap<String, Waveform> = netlist
        .components()
        .filter(|c| is_recorded(&c.kind))
        .map(|c| (c.name.clone(), Waveform::default()))
        .collect();

    for k in 0..window.points {
        let t = k as f64 * h;
        let step = (k > 0).then_some(h);
        let assembly = assemble(netlist, &layout, GMIN, |c| {
            transient_stamp(c, t, step, &history, options)
        })?;
        let x = assembly.system.solve_real("transient")?;
        let readings = assembly.readings(&layout, &x.mapv(|v| Complex64::new(v, 0.0)));

        for c in netlist.components() {
            let Some(r) = readings.get(&c.name) else { continue };
            match c.kind {
                ComponentKind::Capacitor(_) => {
                    history.capacitor_voltage.insert(c.name.clone(), r.voltage.re);
                }
                ComponentKind::Inductor(_) => {
                    history.inductor_current.insert(c.name.clone(), r.current.re);
                }
                _ => {}
            }
            if let Some(w) = elements.get_mut(&c.name) {
                w.voltage.push(r.voltage.re);
                w.current.push(r.current.re);
            }
        }
        for (node, v) in layout.node_voltages(&x) {
            node_voltages.entry(node).or_default().push(v);
        }
        time.push(t);
    }
    debug!("transient: {} waveforms recorded", elements.len());

    Ok(TransientSolution {
        time,
        node_voltages,
        elements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::parse_netlist;
    use approx::assert_relative_eq;

    #[test]
    fn test_rc_charging() {
        // tau = 1 ms; sample at 5 tau
        let netlist = parse_netlist("V1 1 0 1\nR1 1 2 1k\nC1 2 0 1u").unwrap();
        let window = TransientOptions::new(5e-3, 5001);
        let sol = transient_analysis(&netlist, &window, &AnalysisOptions::default()).unwrap();

        assert_eq!(sol.time.len(), 5001);
        let vc = &sol.element("C1").unwrap().voltage;
        assert!(vc[0].abs() < 1e-6);
        // backward Euler with h = tau / 1000 tracks 1 - e^{-t/tau} closely
        let tau_index = 1000;
        assert_relative_eq!(vc[tau_index], 1.0 - (-1.0f64).exp(), epsilon = 1e-3);
        assert_relative_eq!(*vc.last().unwrap(), 1.0 - (-5.0f64).exp(), epsilon = 1e-3);

        // initial current is V/R
        let ir = &sol.element("R1").unwrap().current;
        assert_relative_eq!(ir[0], 1e-3, epsilon = 1e-6);
        assert!(sol.element("V1").is_none());
    }

    #[test]
    fn test_rl_current_rise() {
        // tau = L/R = 1 ms
        let netlist = parse_netlist("V1 1 0 2\nR1 1 2 1k\nL1 2 0 1").unwrap();
        let window = TransientOptions::new(3e-3, 3001);
        let sol = transient_analysis(&netlist, &window, &AnalysisOptions::default()).unwrap();

        let il = &sol.element("L1").unwrap().current;
        assert!(il[0].abs() < 1e-12);
        let expected = 2e-3 * (1.0 - (-3.0f64).exp());
        assert_relative_eq!(*il.last().unwrap(), expected, epsilon = 1e-5);
    }

    #[test]
    fn test_sine_source_follows_time() {
        let netlist = parse_netlist("V1 1 0 SIN(0 1 1k)\nR1 1 0 1k").unwrap();
        let window = TransientOptions::new(1e-3, 5);
        let sol = transient_analysis(&netlist, &window, &AnalysisOptions::default()).unwrap();

        let v = sol.voltage(&Node::from("1")).unwrap();
        assert_relative_eq!(v[1], 1.0, epsilon = 1e-9);
        assert_relative_eq!(v[3], -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_window() {
        let netlist = parse_netlist("R1 1 0 1k").unwrap();
        let err = transient_analysis(
            &netlist,
            &TransientOptions::new(1e-3, 1),
            &AnalysisOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::Nodal(NodalError::InvalidTimeWindow {
                stop: 1e-3,
                points: 1
            })
        );
    }
}
