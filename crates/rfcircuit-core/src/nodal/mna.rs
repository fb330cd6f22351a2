//! Modified nodal analysis (MNA) system
//!
//! Unknowns are the voltages of the non-ground nodes followed by one branch
//! current per voltage-defined element (independent voltage sources,
//! inductors, VCVS and CCVS). Row `i < num_nodes` is Kirchhoff's current law
//! at node `i` (currents leaving the node through elements on the left,
//! injected currents on the right); the remaining rows are branch equations.

use indexmap::IndexMap;
use log::debug;
use ndarray::{Array1, Array2};
use num_complex::Complex64;

use crate::error::NodalError;
use crate::math::linalg::{solve_complex, solve_real};
use crate::math::matrix_ops::Mat2;
use crate::netlist::{Component, ComponentKind, Netlist, Node};

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// MNA system `A x = b`
#[derive(Debug, Clone)]
pub struct MnaSystem {
    matrix: Array2<Complex64>,
    rhs: Array1<Complex64>,
    num_nodes: usize,
    num_branches: usize,
}

impl MnaSystem {
    /// Create an all-zero system
    ///
    /// # Arguments
    /// * `num_nodes` - Number of nodes excluding ground
    /// * `num_branches` - Number of branch current variables
    pub fn new(num_nodes: usize, num_branches: usize) -> Self {
        let size = num_nodes + num_branches;
        Self {
            matrix: Array2::zeros((size, size)),
            rhs: Array1::zeros(size),
            num_nodes,
            num_branches,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.num_nodes + self.num_branches
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn num_branches(&self) -> usize {
        self.num_branches
    }

    pub fn matrix(&self) -> &Array2<Complex64> {
        &self.matrix
    }

    pub fn rhs(&self) -> &Array1<Complex64> {
        &self.rhs
    }

    #[inline]
    fn branch_row(&self, branch: usize) -> usize {
        self.num_nodes + branch
    }

    /// Admittance `y` between nodes `i` and `j` (`None` is ground)
    pub fn stamp_admittance(&mut self, i: Option<usize>, j: Option<usize>, y: Complex64) {
        if let Some(i) = i {
            self.matrix[[i, i]] += y;
        }
        if let Some(j) = j {
            self.matrix[[j, j]] += y;
        }
        if let (Some(i), Some(j)) = (i, j) {
            self.matrix[[i, j]] -= y;
            self.matrix[[j, i]] -= y;
        }
    }

    pub fn stamp_conductance(&mut self, i: Option<usize>, j: Option<usize>, g: f64) {
        self.stamp_admittance(i, j, Complex64::new(g, 0.0));
    }

    /// Current source driving `current` out of node `from`, through the
    /// source, into node `to`
    pub fn stamp_current_source(&mut self, from: Option<usize>, to: Option<usize>, current: Complex64) {
        if let Some(i) = from {
            self.rhs[i] -= current;
        }
        if let Some(j) = to {
            self.rhs[j] += current;
        }
    }

    /// Two-port given by its Y matrix, both ports referenced to ground
    pub fn stamp_two_port(&mut self, p1: Option<usize>, p2: Option<usize>, y: &Mat2) {
        let nodes = [p1, p2];
        for (r, row) in nodes.iter().enumerate() {
            for (c, col) in nodes.iter().enumerate() {
                if let (Some(i), Some(j)) = (row, col) {
                    self.matrix[[*i, *j]] += y[r][c];
                }
            }
        }
    }

    /// Branch current entering the element at `pos` and leaving it at `neg`
    fn couple_branch(&mut self, pos: Option<usize>, neg: Option<usize>, branch: usize) {
        let row = self.branch_row(branch);
        if let Some(i) = pos {
            self.matrix[[i, row]] += ONE;
        }
        if let Some(j) = neg {
            self.matrix[[j, row]] -= ONE;
        }
    }

    /// Branch equation `V(pos) - V(neg) - impedance * I = voltage`
    ///
    /// An independent voltage source is the `impedance = 0` case.
    pub fn stamp_branch(
        &mut self,
        pos: Option<usize>,
        neg: Option<usize>,
        branch: usize,
        impedance: Complex64,
        voltage: Complex64,
    ) {
        self.couple_branch(pos, neg, branch);
        let row = self.branch_row(branch);
        if let Some(i) = pos {
            self.matrix[[row, i]] += ONE;
        }
        if let Some(j) = neg {
            self.matrix[[row, j]] -= ONE;
        }
        self.matrix[[row, row]] -= impedance;
        self.rhs[row] += voltage;
    }

    pub fn stamp_voltage_source(
        &mut self,
        pos: Option<usize>,
        neg: Option<usize>,
        branch: usize,
        voltage: Complex64,
    ) {
        self.stamp_branch(pos, neg, branch, ZERO, voltage);
    }

    /// Branch whose current is held at `current`
    pub fn stamp_branch_current(
        &mut self,
        pos: Option<usize>,
        neg: Option<usize>,
        branch: usize,
        current: Complex64,
    ) {
        self.couple_branch(pos, neg, branch);
        let row = self.branch_row(branch);
        self.matrix[[row, row]] += ONE;
        self.rhs[row] += current;
    }

    /// `V(pos) - V(neg) = gain * (V(cpos) - V(cneg))`
    pub fn stamp_vcvs(
        &mut self,
        pos: Option<usize>,
        neg: Option<usize>,
        cpos: Option<usize>,
        cneg: Option<usize>,
        branch: usize,
        gain: f64,
    ) {
        self.stamp_voltage_source(pos, neg, branch, ZERO);
        let row = self.branch_row(branch);
        if let Some(i) = cpos {
            self.matrix[[row, i]] -= gain;
        }
        if let Some(j) = cneg {
            self.matrix[[row, j]] += gain;
        }
    }

    /// Current `gm * (V(cpos) - V(cneg))` from `pos` through the element to `neg`
    pub fn stamp_vccs(
        &mut self,
        pos: Option<usize>,
        neg: Option<usize>,
        cpos: Option<usize>,
        cneg: Option<usize>,
        gm: f64,
    ) {
        for (out, sign) in [(pos, 1.0), (neg, -1.0)] {
            let Some(r) = out else { continue };
            if let Some(c) = cpos {
                self.matrix[[r, c]] += sign * gm;
            }
            if let Some(c) = cneg {
                self.matrix[[r, c]] -= sign * gm;
            }
        }
    }

    /// Current `gain * I(control)` from `pos` through the element to `neg`
    pub fn stamp_cccs(&mut self, pos: Option<usize>, neg: Option<usize>, control: usize, gain: f64) {
        let col = self.branch_row(control);
        if let Some(i) = pos {
            self.matrix[[i, col]] += gain;
        }
        if let Some(j) = neg {
            self.matrix[[j, col]] -= gain;
        }
    }

    /// `V(pos) - V(neg) = gain * I(control)`
    pub fn stamp_ccvs(
        &mut self,
        pos: Option<usize>,
        neg: Option<usize>,
        branch: usize,
        control: usize,
        gain: f64,
    ) {
        self.stamp_voltage_source(pos, neg, branch, ZERO);
        let row = self.branch_row(branch);
        let col = self.branch_row(control);
        self.matrix[[row, col]] -= gain;
    }

    /// Conductance `g` from every node to ground
    pub fn add_gmin(&mut self, g: f64) {
        for i in 0..self.num_nodes {
            self.matrix[[i, i]] += g;
        }
    }

    /// Solve by complex LU decomposition
    pub fn solve(&self, analysis: &'static str) -> Result<Array1<Complex64>, NodalError> {
        solve_complex(&self.matrix, &self.rhs).ok_or(NodalError::SingularSystem { analysis })
    }

    /// Solve a system whose entries are all real
    ///
    /// Imaginary parts are ignored; DC and transient systems never have any.
    pub fn solve_real(&self, analysis: &'static str) -> Result<Array1<f64>, NodalError> {
        let a = self.matrix.mapv(|v| v.re);
        let b = self.rhs.mapv(|v| v.re);
        solve_real(&a, &b).ok_or(NodalError::SingularSystem { analysis })
    }
}

/// Index assignment for node voltages and branch currents
#[derive(Debug, Clone)]
pub(crate) struct Layout {
    nodes: IndexMap<Node, usize>,
    branches: IndexMap<String, usize>,
}

/// Elements that carry their own branch current unknown
fn has_branch(kind: &ComponentKind) -> bool {
    matches!(
        kind,
        ComponentKind::VoltageSource(_)
            | ComponentKind::Inductor(_)
            | ComponentKind::Vcvs { .. }
            | ComponentKind::Ccvs { .. }
    )
}

impl Layout {
    /// Number every non-ground node and every branch element of `netlist`
    ///
    /// Only explicit grounds are the reference; a dangling node is an
    /// ordinary node held near 0 V by gmin.
    pub fn new(netlist: &Netlist) -> Self {
        let mut nodes = IndexMap::new();
        let mut branches = IndexMap::new();
        for c in netlist.components().filter(|c| !c.kind.is_directive()) {
            let control = match &c.kind {
                ComponentKind::Vcvs { control, .. } | ComponentKind::Vccs { control, .. } => {
                    vec![&control.0, &control.1]
                }
                _ => Vec::new(),
            };
            for node in c.nodes.iter().chain(control) {
                if !netlist.explicit_grounds().contains(node) && !nodes.contains_key(node) {
                    nodes.insert(node.clone(), nodes.len());
                }
            }
            if has_branch(&c.kind) {
                branches.insert(c.name.clone(), branches.len());
            }
        }
        debug!("MNA layout: {} nodes, {} branch currents", nodes.len(), branches.len());
        Self { nodes, branches }
    }

    pub fn system(&self) -> MnaSystem {
        MnaSystem::new(self.nodes.len(), self.branches.len())
    }

    pub fn node(&self, node: &Node) -> Option<usize> {
        self.nodes.get(node).copied()
    }

    pub fn branch(&self, name: &str) -> Option<usize> {
        self.branches.get(name).copied()
    }

    /// Voltage of `node` in solution `x`; grounds read 0
    pub fn voltage<T: Copy + Default>(&self, x: &Array1<T>, node: &Node) -> T {
        self.node(node).map(|i| x[i]).unwrap_or_default()
    }

    pub fn branch_current<T: Copy + Default>(&self, x: &Array1<T>, name: &str) -> T {
        self.branch(name)
            .map(|k| x[self.nodes.len() + k])
            .unwrap_or_default()
    }

    /// Every non-ground node voltage in layout order
    pub fn node_voltages<T: Copy>(&self, x: &Array1<T>) -> IndexMap<Node, T> {
        self.nodes.iter().map(|(n, &i)| (n.clone(), x[i])).collect()
    }
}

/// How one two-terminal element enters the system in a given analysis
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Stamp {
    Open,
    Admittance(Complex64),
    /// Element current `admittance * v - history` (companion model)
    Norton { admittance: Complex64, history: Complex64 },
    /// `v - impedance * i = voltage` on the element's branch current
    Branch { impedance: Complex64, voltage: Complex64 },
    /// Branch current fixed at a value
    FixedCurrent(Complex64),
    /// Independent current from the first terminal through the source to the second
    Source(Complex64),
    /// Y matrix, both terminals referenced to ground
    TwoPort(Mat2),
}

/// Voltage across and current through one element
///
/// Current is positive flowing into the first terminal and out of the
/// second (through a source this is opposite to the current it delivers).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ElementReading<T> {
    pub voltage: T,
    pub current: T,
}

impl<T> ElementReading<T> {
    pub(crate) fn map<U>(self, f: impl Fn(T) -> U) -> ElementReading<U> {
        ElementReading {
            voltage: f(self.voltage),
            current: f(self.current),
        }
    }
}

/// An assembled system and the stamp each element received
pub(crate) struct Assembly<'a> {
    pub system: MnaSystem,
    stamps: Vec<(&'a Component, Option<Stamp>)>,
}

/// Build the MNA system of `netlist` with `model` giving each element's stamp
///
/// Controlled sources are stamped from their kind; `model` is not asked about
/// them. `model` only returns branch stamps for elements [`Layout::new`]
/// numbered a branch for.
pub(crate) fn assemble<'a>(
    netlist: &'a Netlist,
    layout: &Layout,
    gmin: f64,
    mut model: impl FnMut(&Component) -> Stamp,
) -> Result<Assembly<'a>, NodalError> {
    let mut system = layout.system();
    let mut stamps = Vec::new();

    for c in netlist.components().filter(|c| !c.kind.is_directive()) {
        let Some((a, b)) = c.terminals() else { continue };
        let (pos, neg) = (layout.node(a), layout.node(b));

        let controlled = match &c.kind {
            ComponentKind::Vcvs { control, gain } => {
                let Some(branch) = layout.branch(&c.name) else { continue };
                let (cp, cn) = (layout.node(&control.0), layout.node(&control.1));
                system.stamp_vcvs(pos, neg, cp, cn, branch, *gain);
                true
            }
            ComponentKind::Vccs { control, gain } => {
                let (cp, cn) = (layout.node(&control.0), layout.node(&control.1));
                system.stamp_vccs(pos, neg, cp, cn, *gain);
                true
            }
            ComponentKind::Cccs { control, gain } => {
                let source = control_branch(layout, c, control)?;
                system.stamp_cccs(pos, neg, source, *gain);
                true
            }
            ComponentKind::Ccvs { control, gain } => {
                let Some(branch) = layout.branch(&c.name) else { continue };
                let source = control_branch(layout, c, control)?;
                system.stamp_ccvs(pos, neg, branch, source, *gain);
                true
            }
            _ => false,
        };
        if controlled {
            stamps.push((c, None));
            continue;
        }

        let stamp = model(c);
        match stamp {
            Stamp::Open => {}
            Stamp::Admittance(y) => system.stamp_admittance(pos, neg, y),
            Stamp::Norton { admittance, history } => {
                system.stamp_admittance(pos, neg, admittance);
                system.stamp_current_source(neg, pos, history);
            }
            Stamp::Branch { impedance, voltage } => {
                let Some(branch) = layout.branch(&c.name) else { continue };
                system.stamp_branch(pos, neg, branch, impedance, voltage);
            }
            Stamp::FixedCurrent(i) => {
                let Some(branch) = layout.branch(&c.name) else { continue };
                system.stamp_branch_current(pos, neg, branch, i);
            }
            Stamp::Source(i) => system.stamp_current_source(pos, neg, i),
            Stamp::TwoPort(y) => system.stamp_two_port(pos, neg, &y),
        }
        stamps.push((c, Some(stamp)));
    }

    system.add_gmin(gmin);
    Ok(Assembly { system, stamps })
}

fn control_branch(layout: &Layout, c: &Component, control: &str) -> Result<usize, NodalError> {
    layout.branch(control).ok_or_else(|| NodalError::UnknownControlSource {
        element: c.name.clone(),
        source_name: control.to_string(),
    })
}

impl Assembly<'_> {
    /// Voltage and current of every element for solution `x`
    pub fn readings(
        &self,
        layout: &Layout,
        x: &Array1<Complex64>,
    ) -> IndexMap<String, ElementReading<Complex64>> {
        let mut out = IndexMap::with_capacity(self.stamps.len());
        for (c, stamp) in &self.stamps {
            let Some((a, b)) = c.terminals() else { continue };
            let v = layout.voltage(x, a) - layout.voltage(x, b);
            let current = match (stamp, &c.kind) {
                (Some(Stamp::Open), _) => ZERO,
                (Some(Stamp::Admittance(y)), _) => y * v,
                (Some(Stamp::Norton { admittance, history }), _) => admittance * v - history,
                (Some(Stamp::Branch { .. } | Stamp::FixedCurrent(_)), _) => {
                    layout.branch_current(x, &c.name)
                }
                (Some(Stamp::Source(i)), _) => *i,
                (Some(Stamp::TwoPort(y)), _) => {
                    y[0][0] * layout.voltage(x, a) + y[0][1] * layout.voltage(x, b)
                }
                (None, ComponentKind::Vccs { control, gain }) => {
                    (layout.voltage(x, &control.0) - layout.voltage(x, &control.1)) * *gain
                }
                (None, ComponentKind::Cccs { control, gain }) => {
                    layout.branch_current(x, control) * *gain
                }
                (None, _) => layout.branch_current(x, &c.name),
            };
            out.insert(c.name.clone(), ElementReading { voltage: v, current });
        }
        out
    }
}
