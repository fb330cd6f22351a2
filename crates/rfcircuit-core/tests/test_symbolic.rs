//! Closed-form Z/Y parameters and frequency evaluation

use approx::assert_relative_eq;
use num_complex::Complex64;
use rfcircuit_core::analysis::ParameterKind;
use rfcircuit_core::{
    compute_parameters, evaluate_at, parse_netlist, y_parameters_symbolic, z_parameters_symbolic,
    AnalysisError, AnalysisOptions, Expr, Frequency, PortSpec, TwoPortExpression,
};
use std::f64::consts::PI;

const T_NETWORK: &str = "R1 1 2 10\nR2 2 0 100\nR3 2 3 20\nP1 1 0\nP2 3 0";

#[test]
fn test_resistive_t_network() {
    let netlist = parse_netlist(T_NETWORK).unwrap();
    let ports = PortSpec::new("1", "0", "3", "0");
    let z = z_parameters_symbolic(&netlist, &ports, &AnalysisOptions::default()).unwrap();
    assert_eq!(z.kind(), ParameterKind::Z);

    // frequency independent
    for f in [1.0, 1e6, 1e9] {
        let at = evaluate_at(&z, f);
        assert!(at.is_complete());
        assert_relative_eq!(at.values[0][0].re, 110.0, epsilon = 1e-9);
        assert_relative_eq!(at.values[0][1].re, 100.0, epsilon = 1e-9);
        assert_relative_eq!(at.values[1][0].re, 100.0, epsilon = 1e-9);
        assert_relative_eq!(at.values[1][1].re, 120.0, epsilon = 1e-9);
        assert!(at.properties.reciprocal);
        assert!(at.properties.passive);
    }
}

#[test]
fn test_reversed_ports_swap_entries() {
    let netlist = parse_netlist(T_NETWORK).unwrap();
    let ports = PortSpec::new("3", "0", "1", "0");
    let z = z_parameters_symbolic(&netlist, &ports, &AnalysisOptions::default()).unwrap();
    let at = evaluate_at(&z, 1e6);
    assert_relative_eq!(at.values[0][0].re, 120.0, epsilon = 1e-9);
    assert_relative_eq!(at.values[1][1].re, 110.0, epsilon = 1e-9);
}

#[test]
fn test_shunt_rlc_resonance() {
    // Parallel LC to ground behind a series resistor: at resonance the shunt
    // vanishes and Y22 = 1/R
    let netlist = parse_netlist(
        "R1 1 2 50\n\
         L1 2 0 10n\n\
         C1 2 0 1p\n\
         P1 1 0\n\
         P2 2 0",
    )
    .unwrap();
    let ports = PortSpec::new("1", "0", "2", "0");
    let y = y_parameters_symbolic(&netlist, &ports, &AnalysisOptions::default()).unwrap();

    let f0 = 1.0 / (2.0 * PI * (10e-9f64 * 1e-12).sqrt());
    let at = evaluate_at(&y, f0);
    assert_relative_eq!(at.values[1][1].re, 0.02, epsilon = 1e-9);
    assert_relative_eq!(at.values[1][1].im, 0.0, epsilon = 1e-6);
    assert_relative_eq!(at.values[0][1].re, -0.02, epsilon = 1e-9);
    assert!(at.properties.reciprocal);

    // off resonance the shunt loads port 2
    let below = evaluate_at(&y, f0 / 2.0);
    assert!(below.values[1][1].im.abs() > 1e-3);
}

#[test]
fn test_sweep_evaluates_as_grid() {
    let netlist = parse_netlist(T_NETWORK).unwrap();
    let ports = PortSpec::new("1", "0", "3", "0");
    let freq = Frequency::linear_hz(1e6, 2e6, 3).unwrap();
    let sweep = compute_parameters(
        &netlist,
        &freq,
        &ports,
        ParameterKind::Y,
        &AnalysisOptions::default(),
    )
    .unwrap();

    let grid = TwoPortExpression::from(&sweep);
    let at = evaluate_at(&grid, 1.25e6);
    assert!(at.is_complete());
    // Y of a resistive network: det(Z) = 110 * 120 - 100^2 = 3200
    assert_relative_eq!(at.values[0][0].re, 120.0 / 3200.0, epsilon = 1e-12);
    assert_relative_eq!(at.values[0][1].re, -100.0 / 3200.0, epsilon = 1e-12);

    let outside = evaluate_at(&grid, 5e6);
    assert_eq!(outside.diagnostics.len(), 4);
    assert_eq!(outside.values, [[Complex64::new(0.0, 0.0); 2]; 2]);
}

#[test]
fn test_unknown_port_node() {
    let netlist = parse_netlist(T_NETWORK).unwrap();
    let err = z_parameters_symbolic(
        &netlist,
        &PortSpec::new("1", "0", "9", "0"),
        &AnalysisOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, AnalysisError::PortNotFound { .. }));
}

#[test]
fn test_textual_expression() {
    let z: Expr = "50 + 1/(s*1e-12)".parse().unwrap();
    assert!(z.depends_on_s());
    let f = 1e9;
    let v = z.eval_at(f).unwrap();
    assert_relative_eq!(v.re, 50.0, epsilon = 1e-9);
    assert_relative_eq!(v.im, -1.0 / (2.0 * PI * f * 1e-12), epsilon = 1e-6);
}
