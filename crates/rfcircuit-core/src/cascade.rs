//! Ladder cascade
//!
//! Multiplies the ABCD matrices of a [`Topology`] in chain order. Shunt
//! elements sit at nodes and are inserted once the chain has reached their
//! node; series branches are walked outward from the first node, each one
//! entered from the end the chain already reached. The same order drives
//! the symbolic calculators.

use std::collections::HashSet;

use indexmap::IndexMap;
use log::{debug, warn};
use ndarray::{Array1, Array3};
use num_complex::Complex64;

use crate::config::AnalysisOptions;
use crate::elements::{element_model, series_abcd, shunt_abcd, stub_one_port, ElementModel, OnePort};
use crate::frequency::Frequency;
use crate::math::matrix_ops::{cascade_2x2, identity_stack};
use crate::math::transforms::{a2s, a2y, renormalize_s, y2a};
use crate::netlist::{ComponentKind, Netlist, Node};
use crate::topology::{SeriesBranch, ShuntElement, Topology};

/// How an element sits in the ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Series,
    Shunt,
}

/// One multiplication of the cascade, for tracing
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeStep {
    pub placement: Placement,
    /// Components combined in this step (several for a parallel branch)
    pub names: Vec<String>,
    /// Shunt node, or the chain-side node of a series branch
    pub node: Node,
    /// Far node of a series branch
    pub to: Option<Node>,
}

/// Cascaded ABCD parameters of a ladder network
#[derive(Debug, Clone)]
pub struct Cascade {
    /// ABCD stack `[nfreq, 2, 2]`
    pub abcd: Array3<Complex64>,
    pub steps: Vec<CascadeStep>,
    /// Node at the start of the chain
    pub input: Option<Node>,
    /// Node at the end of the chain
    pub output: Option<Node>,
    /// Elements left out (degenerate or without a two-port model)
    pub skipped: Vec<String>,
    system_z0: Complex64,
    element_count: usize,
}

impl Cascade {
    /// Number of components that took part in the cascade
    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// S-parameters with the given port reference impedances
    ///
    /// A lone element is converted at the system impedance and then
    /// renormalized to the ports. Any other ladder converts its cascaded
    /// ABCD directly.
    pub fn s_parameters(&self, port_z0: &Array1<Complex64>) -> Array3<Complex64> {
        if self.element_count == 1 {
            debug!("single element: converting at system z0 and renormalizing");
            let z_sys = Array1::from_elem(2, self.system_z0);
            let s = a2s(&self.abcd, &z_sys);
            if port_z0.iter().all(|z| *z == self.system_z0) {
                return s;
            }
            return renormalize_s(&s, &z_sys, port_z0);
        }
        a2s(&self.abcd, port_z0)
    }
}

/// One element of the ladder in application order
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LadderStep<'a> {
    Shunt(&'a ShuntElement),
    /// A series branch entered at `from` and left at `to`
    Series {
        branch: &'a SeriesBranch,
        from: &'a Node,
        to: &'a Node,
    },
}

/// Series branches in chain order, each oriented away from the chain
///
/// The walk starts at the first branch in node order. Next comes the first
/// remaining branch that touches a node the chain has reached, entered from
/// that node; when none does, a new segment starts at the first remaining
/// branch.
fn oriented_chain(topology: &Topology) -> Vec<(&SeriesBranch, &Node, &Node)> {
    let mut remaining: Vec<&SeriesBranch> = topology.series.iter().collect();
    let mut reached: HashSet<&Node> = HashSet::new();
    let mut chain = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let next = remaining
            .iter()
            .position(|b| reached.contains(&b.from) || reached.contains(&b.to))
            .unwrap_or(0);
        let branch = remaining.remove(next);
        let (from, to) = if reached.contains(&branch.to) && !reached.contains(&branch.from) {
            (&branch.to, &branch.from)
        } else {
            (&branch.from, &branch.to)
        };
        reached.insert(from);
        reached.insert(to);
        chain.push((branch, from, to));
    }
    chain
}

/// Order in which the ladder elements are multiplied
///
/// Shunts wait at their node until the series chain reaches it: before each
/// branch, shunts at the node it is entered from (and at its far node, if an
/// earlier branch already ended there) are emitted, then the branch itself.
/// Shunts left over (at the end of the chain, or at nodes the chain never
/// reached) follow in node order. This is a ladder approximation; it does
/// not solve arbitrary topologies.
pub fn ladder_order(topology: &Topology) -> Vec<LadderStep<'_>> {
    let mut pending: IndexMap<&Node, Vec<&ShuntElement>> = IndexMap::new();
    for shunt in &topology.shunts {
        pending.entry(&shunt.node).or_default().push(shunt);
    }

    let mut processed: HashSet<&Node> = HashSet::new();
    let reference = Node::reference();
    processed.insert(&reference);

    let mut order = Vec::with_capacity(topology.series.len() + topology.shunts.len());
    for (branch, from, to) in oriented_chain(topology) {
        for node in [from, to] {
            if node == from || processed.contains(node) {
                if let Some(shunts) = pending.shift_remove(node) {
                    order.extend(shunts.into_iter().map(LadderStep::Shunt));
                }
            }
        }
        order.push(LadderStep::Series { branch, from, to });
        processed.insert(from);
        processed.insert(to);
    }

    for (node, shunts) in pending {
        if !processed.contains(node) && !topology.series.is_empty() {
            warn!("shunt elements at node {} are not on the series chain", node);
        }
        order.extend(shunts.into_iter().map(LadderStep::Shunt));
    }
    order
}

/// Cascade the elements of `topology` over `freq`
pub fn build_cascade(
    netlist: &Netlist,
    topology: &Topology,
    freq: &Frequency,
    options: &AnalysisOptions,
) -> Cascade {
    let z_sys = Complex64::new(options.system_z0, 0.0);
    let builder = StepBuilder {
        netlist,
        freq,
        options,
        z_sys,
    };

    let mut chain = Chain {
        abcd: identity_stack(freq.npoints()),
        steps: Vec::new(),
        skipped: topology
            .degenerate
            .iter()
            .chain(topology.unsupported.iter())
            .cloned()
            .collect(),
        element_count: 0,
    };

    for step in ladder_order(topology) {
        match step {
            LadderStep::Shunt(shunt) => chain.push_shunt(&builder, shunt),
            LadderStep::Series { branch, from, to } => {
                chain.push_series(&builder, branch, from, to)
            }
        }
    }

    let (input, output) = chain_ends(topology);
    Cascade {
        abcd: chain.abcd,
        steps: chain.steps,
        input,
        output,
        skipped: chain.skipped,
        system_z0: z_sys,
        element_count: chain.element_count,
    }
}

/// First and last node of the series chain (the shunt nodes if there is none)
pub fn chain_ends(topology: &Topology) -> (Option<Node>, Option<Node>) {
    let chain = oriented_chain(topology);
    let input = chain
        .first()
        .map(|(_, from, _)| (*from).clone())
        .or_else(|| topology.shunts.first().map(|s| s.node.clone()));
    let output = chain
        .last()
        .map(|(_, _, to)| (*to).clone())
        .or_else(|| topology.shunts.last().map(|s| s.node.clone()));
    (input, output)
}

/// Running product of the cascade
struct Chain {
    abcd: Array3<Complex64>,
    steps: Vec<CascadeStep>,
    skipped: Vec<String>,
    element_count: usize,
}

impl Chain {
    fn push_shunt(&mut self, builder: &StepBuilder<'_>, shunt: &ShuntElement) {
        let Some(m) = builder.shunt(shunt) else {
            self.skipped.push(shunt.name.clone());
            return;
        };
        debug!("cascade: shunt {} at node {}", shunt.name, shunt.node);
        self.abcd = cascade_2x2(&self.abcd, &m);
        self.element_count += 1;
        self.steps.push(CascadeStep {
            placement: Placement::Shunt,
            names: vec![shunt.name.clone()],
            node: shunt.node.clone(),
            to: None,
        });
    }

    fn push_series(&mut self, builder: &StepBuilder<'_>, branch: &SeriesBranch, from: &Node, to: &Node) {
        let Some(m) = builder.series(branch) else {
            self.skipped.extend(branch.members.iter().cloned());
            return;
        };
        debug!(
            "cascade: series {} from {} to {}",
            branch.members.join("||"),
            from,
            to
        );
        self.abcd = cascade_2x2(&self.abcd, &m);
        self.element_count += branch.members.len();
        self.steps.push(CascadeStep {
            placement: Placement::Series,
            names: branch.members.clone(),
            node: from.clone(),
            to: Some(to.clone()),
        });
    }
}

/// Builds the placed ABCD stack of individual ladder steps
struct StepBuilder<'a> {
    netlist: &'a Netlist,
    freq: &'a Frequency,
    options: &'a AnalysisOptions,
    z_sys: Complex64,
}

impl StepBuilder<'_> {
    fn model(&self, name: &str) -> Option<(ElementModel, &ComponentKind)> {
        let component = self.netlist.get(name)?;
        let model = element_model(&component.kind, self.freq, self.options)?;
        Some((model, &component.kind))
    }

    fn shunt(&self, shunt: &ShuntElement) -> Option<Array3<Complex64>> {
        let limit = self.options.immittance_limit;
        let (model, kind) = self.model(&shunt.name)?;
        let one_port = match (model, kind) {
            (ElementModel::OnePort(op), _) => op,
            (ElementModel::TwoPort(_), ComponentKind::TransmissionLine(spec)) => {
                let shorted = shunt.explicit_ground;
                debug!(
                    "line {} to ground treated as {} stub",
                    shunt.name,
                    if shorted { "short" } else { "open" }
                );
                stub_one_port(spec, self.freq, self.options.reference_frequency, shorted)
            }
            (ElementModel::TwoPort(_), _) => return None,
        };
        Some(shunt_abcd(&one_port, self.z_sys, limit))
    }

    fn series(&self, branch: &SeriesBranch) -> Option<Array3<Complex64>> {
        let limit = self.options.immittance_limit;
        let models: Vec<ElementModel> = branch
            .members
            .iter()
            .filter_map(|name| self.model(name).map(|(m, _)| m))
            .collect();

        match models.as_slice() {
            [] => None,
            [ElementModel::OnePort(op)] => Some(series_abcd(op, limit)),
            [ElementModel::TwoPort(abcd)] => Some(abcd.clone()),
            many if many.iter().all(|m| matches!(m, ElementModel::OnePort(_))) => {
                // parallel one-ports: admittances add
                let mut total = Array1::<Complex64>::zeros(self.freq.npoints());
                for m in many {
                    if let ElementModel::OnePort(op) = m {
                        total = total + op.renormalized(self.z_sys).admittance(limit);
                    }
                }
                let combined = OnePort::from_admittance(total, self.z_sys);
                Some(series_abcd(&combined, limit))
            }
            many => {
                let mut total = Array3::<Complex64>::zeros((self.freq.npoints(), 2, 2));
                for m in many {
                    let abcd = match m {
                        ElementModel::OnePort(op) => series_abcd(op, limit),
                        ElementModel::TwoPort(abcd) => abcd.clone(),
                    };
                    total = total + a2y(&abcd);
                }
                Some(y2a(&total))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::IMMITTANCE_LIMIT;
    use crate::netlist::parse_netlist;
    use crate::topology::build_topology;
    use approx::assert_relative_eq;

    fn cascade_of(text: &str, freq: &Frequency) -> Cascade {
        let netlist = parse_netlist(text).unwrap();
        let topology = build_topology(&netlist, &[]);
        build_cascade(&netlist, &topology, freq, &AnalysisOptions::default())
    }

    #[test]
    fn test_shunt_after_series_at_far_node() {
        let freq = Frequency::single(1e9).unwrap();
        let c = cascade_of("R1 1 2 10\nR2 2 0 100\nR3 1 0 1k\nP1 1 0\nP2 2 0", &freq);

        let order: Vec<(Placement, &str)> = c
            .steps
            .iter()
            .map(|s| (s.placement, s.names[0].as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (Placement::Shunt, "R3"),
                (Placement::Series, "R1"),
                (Placement::Shunt, "R2"),
            ]
        );
        assert_eq!(c.input, Some(Node::from("1")));
        assert_eq!(c.output, Some(Node::from("2")));

        // [[1,0],[1/1000,1]] * [[1,10],[0,1]] * [[1,0],[1/100,1]]
        let a = &c.abcd;
        assert_relative_eq!(a[[0, 0, 0]].re, 1.1, epsilon = 1e-9);
        assert_relative_eq!(a[[0, 0, 1]].re, 10.0, epsilon = 1e-9);
        assert_relative_eq!(a[[0, 1, 0]].re, 0.001 + 0.011, epsilon = 1e-12);
        assert_relative_eq!(a[[0, 1, 1]].re, 1.01, epsilon = 1e-9);
    }

    #[test]
    fn test_relabelled_ladder_matches_monotonic_twin() {
        let freq = Frequency::single(1e6).unwrap();
        let twin = cascade_of(
            "R1 1 2 10\nR2 2 3 10\nRa 2 0 100\nRb 3 0 100\nP1 1 0\nP2 3 0",
            &freq,
        );
        let relabelled = cascade_of(
            "R1 1 3 10\nR2 3 2 10\nRa 3 0 100\nRb 2 0 100\nP1 1 0\nP2 2 0",
            &freq,
        );

        let names = |c: &Cascade| -> Vec<String> {
            c.steps.iter().map(|s| s.names.join("||")).collect()
        };
        assert_eq!(names(&twin), vec!["R1", "Ra", "R2", "Rb"]);
        assert_eq!(names(&relabelled), names(&twin));

        let r2 = &relabelled.steps[2];
        assert_eq!(r2.node, Node::from("3"));
        assert_eq!(r2.to, Some(Node::from("2")));
        assert_eq!(relabelled.input, Some(Node::from("1")));
        assert_eq!(relabelled.output, Some(Node::from("2")));

        // [[1.31, 21], [0.021, 1.1]]
        for (x, y) in relabelled.abcd.iter().zip(twin.abcd.iter()) {
            assert_relative_eq!(x.re, y.re, epsilon = 1e-12);
            assert_relative_eq!(x.im, y.im, epsilon = 1e-12);
        }
        assert_relative_eq!(relabelled.abcd[[0, 0, 0]].re, 1.31, epsilon = 1e-12);
        assert_relative_eq!(relabelled.abcd[[0, 0, 1]].re, 21.0, epsilon = 1e-12);
        assert_relative_eq!(relabelled.abcd[[0, 1, 0]].re, 0.021, epsilon = 1e-12);
        assert_relative_eq!(relabelled.abcd[[0, 1, 1]].re, 1.1, epsilon = 1e-12);
    }

    #[test]
    fn test_chain_walks_to_connected_branch() {
        // node order alone would visit 2-3 before the chain reaches it
        let netlist = parse_netlist("R1 1 4 10\nR2 2 3 10\nR3 3 4 10\nRa 1 0 50\nRb 2 0 50").unwrap();
        let topology = build_topology(&netlist, &[]);
        let walk: Vec<(&str, &str)> = ladder_order(&topology)
            .into_iter()
            .filter_map(|step| match step {
                LadderStep::Series { from, to, .. } => Some((from.as_str(), to.as_str())),
                LadderStep::Shunt(_) => None,
            })
            .collect();
        assert_eq!(walk, vec![("1", "4"), ("4", "3"), ("3", "2")]);
        assert_eq!(chain_ends(&topology), (Some(Node::from("1")), Some(Node::from("2"))));
    }

    #[test]
    fn test_parallel_series_branch() {
        let freq = Frequency::single(1e6).unwrap();
        let c = cascade_of("R1 1 2 100\nR2 2 1 100\nRs 1 0 50\nRl 2 0 50", &freq);
        let series = c
            .steps
            .iter()
            .find(|s| s.placement == Placement::Series)
            .unwrap();
        assert_eq!(series.names, vec!["R1", "R2"]);
        assert_eq!(c.element_count(), 4);

        // B of the series branch is 50 ohm; the surrounding shunts leave it unchanged
        assert_relative_eq!(c.abcd[[0, 0, 1]].re, 50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_grounded_line_becomes_short_stub() {
        // θ = 45° shorted line: Y = -j cot(θ) / Zc = -j / 50
        let freq = Frequency::single(1e9).unwrap();
        let c = cascade_of("T1 1 0 50 45 1GHz\nR1 1 2 1\nP1 1 0\nP2 2 0", &freq);
        let shunt = &c.steps[0];
        assert_eq!(shunt.placement, Placement::Shunt);
        assert_eq!(shunt.names, vec!["T1"]);
        assert_relative_eq!(c.abcd[[0, 1, 0]].im, -1.0 / 50.0, epsilon = 1e-12);
    }

    #[test]
    fn test_single_element_shortcut_matches_direct_conversion() {
        let freq = Frequency::linear_hz(1e8, 3e9, 11).unwrap();
        let c = cascade_of("L1 1 2 10n\nP1 1 0 75\nP2 2 0 75", &freq);
        assert_eq!(c.element_count(), 1);

        let z75 = Array1::from_elem(2, Complex64::new(75.0, 0.0));
        let shortcut = c.s_parameters(&z75);
        let direct = a2s(&c.abcd, &z75);
        for (x, y) in shortcut.iter().zip(direct.iter()) {
            assert_relative_eq!(x.re, y.re, epsilon = 1e-9);
            assert_relative_eq!(x.im, y.im, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_quarter_wave_open_stub_shorts_the_node() {
        let freq = Frequency::single(1e9).unwrap();
        let c = cascade_of("R1 1 2 50\nOS1 2 9 50 90 1GHz\nP1 1 0\nP2 2 0", &freq);
        let c_entry = c.abcd[[0, 1, 0]];
        assert!(c_entry.is_finite());
        assert_relative_eq!(c_entry.norm(), IMMITTANCE_LIMIT, max_relative = 1e-6);
    }

    #[test]
    fn test_empty_topology_is_thru() {
        let freq = Frequency::single(1e9).unwrap();
        let c = cascade_of("P1 1 0\nP2 2 0\nE1 2 0 1 0 2", &freq);
        assert_eq!(c.element_count(), 0);
        assert_eq!(c.skipped, vec!["E1"]);
        assert_relative_eq!(c.abcd[[0, 0, 0]].re, 1.0);
        assert_relative_eq!(c.abcd[[0, 1, 1]].re, 1.0);
    }
}
