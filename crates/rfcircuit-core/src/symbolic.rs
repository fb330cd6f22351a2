//! Symbolic two-port calculators and the frequency evaluator
//!
//! The ladder is rebuilt with every element expressed in the Laplace
//! variable `s`, multiplied in the same order as the numeric cascade. The
//! resulting Z or Y entries can then be evaluated at any frequency with
//! [`evaluate_at`], which also accepts a sampled sweep. Evaluation never
//! fails as a whole: an entry that cannot be computed becomes `0 + 0j` and
//! its cause is recorded.

use std::f64::consts::PI;

use log::warn;
use ndarray::Array3;
use num_complex::Complex64;

use crate::analysis::{resolve_ports, ParameterKind, ParameterSweep, PortSpec};
use crate::cascade::{ladder_order, LadderStep};
use crate::config::AnalysisOptions;
use crate::constants::PROPERTY_TOL;
use crate::error::{AnalysisError, EvalError};
use crate::expr::Expr;
use crate::math::matrix_ops::{det_2x2, Mat2};
use crate::netlist::{ComponentKind, LineSpec, Netlist};
use crate::network::s_matrix_passive;
use crate::topology::{SeriesBranch, ShuntElement, Topology};

/// 2x2 matrix of expressions, `[[P11, P12], [P21, P22]]`
pub type ExprMatrix = [[Expr; 2]; 2];

/// A two-port that can be evaluated at an arbitrary frequency
#[derive(Debug, Clone)]
pub enum TwoPortExpression {
    /// Closed-form entries in `s`
    Symbolic {
        kind: ParameterKind,
        entries: Box<ExprMatrix>,
    },
    /// Sampled sweep, linearly interpolated between points
    Grid {
        kind: ParameterKind,
        frequency: Vec<f64>,
        data: Array3<Complex64>,
    },
}

impl TwoPortExpression {
    pub fn kind(&self) -> ParameterKind {
        match self {
            TwoPortExpression::Symbolic { kind, .. } | TwoPortExpression::Grid { kind, .. } => *kind,
        }
    }
}

impl From<&ParameterSweep> for TwoPortExpression {
    fn from(sweep: &ParameterSweep) -> Self {
        TwoPortExpression::Grid {
            kind: sweep.kind,
            frequency: sweep.frequency.f().to_vec(),
            data: sweep.data.clone(),
        }
    }
}

/// Why one matrix entry fell back to zero
#[derive(Debug, Clone, PartialEq)]
pub struct EntryDiagnostic {
    pub row: usize,
    pub col: usize,
    pub error: EvalError,
}

/// Diagnostic properties of one evaluated matrix
///
/// Attached to results as metadata; they never reject a result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoPortProperties {
    pub reciprocal: bool,
    pub reciprocity_error: f64,
    pub passive: bool,
    pub determinant: Complex64,
    /// Sign of the determinant's real part (`-1`, `0` or `1`)
    pub determinant_sign: f64,
}

impl TwoPortProperties {
    /// Properties of a matrix of the given kind
    ///
    /// Reciprocity is `|P12 - P21| < ε` in absolute terms (for ABCD,
    /// `|det - 1| < ε`).
    /// Passivity is `Re(P11) > -ε` and `Re(P22) > -ε` for Z and Y, a
    /// singular-value bound for S, and is not judged for ABCD.
    pub fn of(kind: ParameterKind, m: &Mat2) -> Self {
        let determinant = det_2x2(m);
        let reciprocity_error = match kind {
            ParameterKind::Abcd => (determinant - Complex64::new(1.0, 0.0)).norm(),
            _ => (m[0][1] - m[1][0]).norm(),
        };
        let passive = match kind {
            ParameterKind::Z | ParameterKind::Y => {
                m[0][0].re > -PROPERTY_TOL && m[1][1].re > -PROPERTY_TOL
            }
            ParameterKind::S => s_matrix_passive(m, 1e-9),
            ParameterKind::Abcd => true,
        };
        let determinant_sign = if determinant.re == 0.0 {
            0.0
        } else {
            determinant.re.signum()
        };
        Self {
            reciprocal: reciprocity_error < PROPERTY_TOL,
            reciprocity_error,
            passive,
            determinant,
            determinant_sign,
        }
    }
}

/// A two-port evaluated at one frequency
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedTwoPort {
    pub kind: ParameterKind,
    pub frequency: f64,
    pub values: Mat2,
    pub diagnostics: Vec<EntryDiagnostic>,
    pub properties: TwoPortProperties,
}

impl EvaluatedTwoPort {
    pub fn is_complete(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Evaluate a two-port at `frequency` Hz
///
/// Symbolic entries are evaluated at `s = j 2π f`. Grid entries are linearly
/// interpolated; frequencies outside the sampled range are `OutOfRange`.
pub fn evaluate_at(expr: &TwoPortExpression, frequency: f64) -> EvaluatedTwoPort {
    let zero = Complex64::new(0.0, 0.0);
    let mut values = [[zero; 2]; 2];
    let mut diagnostics = Vec::new();

    for row in 0..2 {
        for col in 0..2 {
            let result = match expr {
                TwoPortExpression::Symbolic { entries, .. } => entries[row][col].eval_at(frequency),
                TwoPortExpression::Grid {
                    frequency: grid,
                    data,
                    ..
                } => interpolate(grid, data, row, col, frequency),
            };
            match result {
                Ok(v) => values[row][col] = v,
                Err(error) => {
                    warn!(
                        "{}{}{} at {} Hz: {}; using 0",
                        expr.kind().symbol(),
                        row + 1,
                        col + 1,
                        frequency,
                        error
                    );
                    diagnostics.push(EntryDiagnostic { row, col, error });
                }
            }
        }
    }

    EvaluatedTwoPort {
        kind: expr.kind(),
        frequency,
        properties: TwoPortProperties::of(expr.kind(), &values),
        values,
        diagnostics,
    }
}

fn interpolate(
    grid: &[f64],
    data: &Array3<Complex64>,
    row: usize,
    col: usize,
    f: f64,
) -> Result<Complex64, EvalError> {
    let (Some(&start), Some(&stop)) = (grid.first(), grid.last()) else {
        return Err(EvalError::OutOfRange {
            frequency: f,
            start: f64::NAN,
            stop: f64::NAN,
        });
    };
    let slack = 1e-9 * stop.abs().max(1.0);
    if !(f >= start - slack && f <= stop + slack) {
        return Err(EvalError::OutOfRange {
            frequency: f,
            start,
            stop,
        });
    }

    let hi = grid.partition_point(|&g| g < f).min(grid.len() - 1);
    let value = if hi == 0 || grid[hi] == f {
        data[[hi, row, col]]
    } else {
        let lo = hi - 1;
        let t = (f - grid[lo]) / (grid[hi] - grid[lo]);
        data[[lo, row, col]] * (1.0 - t) + data[[hi, row, col]] * t
    };
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvalError::NonFinite)
    }
}

// ============================================================================
// Symbolic ladder
// ============================================================================

/// Symbolic model of one element
enum SymbolicModel {
    Impedance(Expr),
    Admittance(Expr),
    Line { zc: f64, theta: Expr },
}

/// Electrical length in radians as a function of `s`
///
/// `θ = θ_ref · f / f_ref` with `f = s / (j 2π)`.
fn theta_expr(spec: &LineSpec, default_f_ref: f64) -> Expr {
    let f_ref = spec.f_ref.unwrap_or(default_f_ref);
    let k = Complex64::new(0.0, -spec.theta_deg.to_radians() / (2.0 * PI * f_ref));
    &Expr::s() * &Expr::constant(k)
}

fn symbolic_model(kind: &ComponentKind, options: &AnalysisOptions) -> Option<SymbolicModel> {
    let s = Expr::s();
    let model = match kind {
        ComponentKind::Resistor(r) => SymbolicModel::Impedance(Expr::real(*r)),
        ComponentKind::Wire | ComponentKind::VoltageSource(_) => {
            SymbolicModel::Impedance(Expr::real(options.wire_resistance))
        }
        ComponentKind::Diode => SymbolicModel::Impedance(Expr::real(options.diode_resistance)),
        ComponentKind::Inductor(l) => SymbolicModel::Impedance(&s * &Expr::real(*l)),
        ComponentKind::Capacitor(c) => SymbolicModel::Admittance(&s * &Expr::real(*c)),
        ComponentKind::CurrentSource(_) => SymbolicModel::Admittance(Expr::zero()),
        ComponentKind::TransmissionLine(spec) => SymbolicModel::Line {
            zc: spec.z0,
            theta: theta_expr(spec, options.reference_frequency),
        },
        ComponentKind::OpenStub(spec) => {
            SymbolicModel::Admittance(open_stub_admittance(spec.z0, &theta_expr(spec, options.reference_frequency)))
        }
        ComponentKind::ShortStub(spec) => {
            SymbolicModel::Impedance(short_stub_impedance(spec.z0, &theta_expr(spec, options.reference_frequency)))
        }
        ComponentKind::Port { .. }
        | ComponentKind::Ground
        | ComponentKind::Vcvs { .. }
        | ComponentKind::Vccs { .. }
        | ComponentKind::Cccs { .. }
        | ComponentKind::Ccvs { .. } => return None,
    };
    Some(model)
}

/// `Y = j tan θ / Zc`
fn open_stub_admittance(zc: f64, theta: &Expr) -> Expr {
    &(&Expr::j() * &theta.tan()) / &Expr::real(zc)
}

/// `Z = j Zc tan θ`
fn short_stub_impedance(zc: f64, theta: &Expr) -> Expr {
    &(&Expr::j() * &Expr::real(zc)) * &theta.tan()
}

impl SymbolicModel {
    fn impedance(&self) -> Expr {
        match self {
            SymbolicModel::Impedance(z) => z.clone(),
            SymbolicModel::Admittance(y) => &Expr::one() / y,
            // not reached: lines are placed through their ABCD
            SymbolicModel::Line { .. } => Expr::zero(),
        }
    }

    fn admittance(&self) -> Expr {
        match self {
            SymbolicModel::Impedance(z) => &Expr::one() / z,
            SymbolicModel::Admittance(y) => y.clone(),
            SymbolicModel::Line { .. } => Expr::zero(),
        }
    }
}

fn identity() -> ExprMatrix {
    [[Expr::one(), Expr::zero()], [Expr::zero(), Expr::one()]]
}

fn series_matrix(z: Expr) -> ExprMatrix {
    [[Expr::one(), z], [Expr::zero(), Expr::one()]]
}

fn shunt_matrix(y: Expr) -> ExprMatrix {
    [[Expr::one(), Expr::zero()], [y, Expr::one()]]
}

fn line_matrix(zc: f64, theta: &Expr) -> ExprMatrix {
    let (cos, sin) = (theta.cos(), theta.sin());
    let zc = Expr::real(zc);
    let j = Expr::j();
    [
        [cos.clone(), &(&j * &zc) * &sin],
        [&(&j * &sin) / &zc, cos],
    ]
}

fn mul(a: &ExprMatrix, b: &ExprMatrix) -> ExprMatrix {
    let entry = |i: usize, k: usize| &(&a[i][0] * &b[0][k]) + &(&a[i][1] * &b[1][k]);
    [[entry(0, 0), entry(0, 1)], [entry(1, 0), entry(1, 1)]]
}

fn det(m: &ExprMatrix) -> Expr {
    &(&m[0][0] * &m[1][1]) - &(&m[0][1] * &m[1][0])
}

/// ABCD -> Y: `[[D/B, -Δ/B], [-1/B, A/B]]`
fn abcd_to_y(m: &ExprMatrix) -> ExprMatrix {
    let b = &m[0][1];
    [
        [&m[1][1] / b, &(-&det(m)) / b],
        [&(-&Expr::one()) / b, &m[0][0] / b],
    ]
}

/// ABCD -> Z: `[[A/C, Δ/C], [1/C, D/C]]`
fn abcd_to_z(m: &ExprMatrix) -> ExprMatrix {
    let c = &m[1][0];
    [
        [&m[0][0] / c, &det(m) / c],
        [&Expr::one() / c, &m[1][1] / c],
    ]
}

/// Y -> ABCD: `[[-Y22/Y21, -1/Y21], [-ΔY/Y21, -Y11/Y21]]`
fn y_to_abcd(y: &ExprMatrix) -> ExprMatrix {
    let y21 = &y[1][0];
    let neg = |e: &Expr| -e;
    [
        [&neg(&y[1][1]) / y21, &neg(&Expr::one()) / y21],
        [&neg(&det(y)) / y21, &neg(&y[0][0]) / y21],
    ]
}

fn flip(m: ExprMatrix) -> ExprMatrix {
    let [[p11, p12], [p21, p22]] = m;
    [[p22, p21], [p12, p11]]
}

struct SymbolicBuilder<'a> {
    netlist: &'a Netlist,
    options: &'a AnalysisOptions,
}

impl SymbolicBuilder<'_> {
    fn model(&self, name: &str) -> Option<(SymbolicModel, &ComponentKind)> {
        let component = self.netlist.get(name)?;
        Some((symbolic_model(&component.kind, self.options)?, &component.kind))
    }

    fn shunt(&self, shunt: &ShuntElement) -> Option<ExprMatrix> {
        let (model, kind) = self.model(&shunt.name)?;
        let y = match (model, kind) {
            (SymbolicModel::Line { zc, theta }, _) => {
                if shunt.explicit_ground {
                    &Expr::one() / &short_stub_impedance(zc, &theta)
                } else {
                    open_stub_admittance(zc, &theta)
                }
            }
            (model, _) => model.admittance(),
        };
        Some(shunt_matrix(y))
    }

    fn series(&self, branch: &SeriesBranch) -> Option<ExprMatrix> {
        let models: Vec<SymbolicModel> = branch
            .members
            .iter()
            .filter_map(|name| self.model(name).map(|(m, _)| m))
            .collect();

        match models.as_slice() {
            [] => None,
            [SymbolicModel::Line { zc, theta }] => Some(line_matrix(*zc, theta)),
            [one] => Some(series_matrix(one.impedance())),
            many if many.iter().all(|m| !matches!(m, SymbolicModel::Line { .. })) => {
                let y = many
                    .iter()
                    .fold(Expr::zero(), |acc, m| &acc + &m.admittance());
                Some(series_matrix(&Expr::one() / &y))
            }
            many => {
                let zero = || [[Expr::zero(), Expr::zero()], [Expr::zero(), Expr::zero()]];
                let total = many.iter().fold(zero(), |acc, m| {
                    let abcd = match m {
                        SymbolicModel::Line { zc, theta } => line_matrix(*zc, theta),
                        other => series_matrix(other.impedance()),
                    };
                    let y = abcd_to_y(&abcd);
                    [
                        [&acc[0][0] + &y[0][0], &acc[0][1] + &y[0][1]],
                        [&acc[1][0] + &y[1][0], &acc[1][1] + &y[1][1]],
                    ]
                });
                Some(y_to_abcd(&total))
            }
        }
    }
}

/// Symbolic ABCD matrix of the ladder described by `topology`
pub fn abcd_symbolic(netlist: &Netlist, topology: &Topology, options: &AnalysisOptions) -> ExprMatrix {
    let builder = SymbolicBuilder { netlist, options };
    ladder_order(topology)
        .into_iter()
        .filter_map(|step| match step {
            LadderStep::Shunt(shunt) => builder.shunt(shunt),
            LadderStep::Series { branch, .. } => builder.series(branch),
        })
        .fold(identity(), |acc, m| mul(&acc, &m))
}

fn parameters_symbolic(
    netlist: &Netlist,
    ports: &PortSpec,
    options: &AnalysisOptions,
    kind: ParameterKind,
) -> Result<TwoPortExpression, AnalysisError> {
    let resolved = resolve_ports(netlist, ports, options)?;
    let abcd = abcd_symbolic(netlist, &resolved.topology, options);
    let entries = match kind {
        ParameterKind::Z => abcd_to_z(&abcd),
        ParameterKind::Y => abcd_to_y(&abcd),
        _ => abcd,
    };
    let entries = if resolved.flipped { flip(entries) } else { entries };
    Ok(TwoPortExpression::Symbolic {
        kind,
        entries: Box::new(entries),
    })
}

/// Symbolic Z-parameters between the requested ports
pub fn z_parameters_symbolic(
    netlist: &Netlist,
    ports: &PortSpec,
    options: &AnalysisOptions,
) -> Result<TwoPortExpression, AnalysisError> {
    parameters_symbolic(netlist, ports, options, ParameterKind::Z)
}

/// Symbolic Y-parameters between the requested ports
pub fn y_parameters_symbolic(
    netlist: &Netlist,
    ports: &PortSpec,
    options: &AnalysisOptions,
) -> Result<TwoPortExpression, AnalysisError> {
    parameters_symbolic(netlist, ports, options, ParameterKind::Y)
}
