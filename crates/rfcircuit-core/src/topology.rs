//! Topology builder
//!
//! Classifies each two-port element of a netlist as series (between two
//! signal nodes) or shunt (from a signal node to ground) and orders them for
//! the ladder cascade.

use indexmap::IndexMap;
use log::{debug, warn};

use crate::netlist::{Component, ComponentKind, Netlist, Node};

/// Elements between the same pair of nodes, combined in parallel
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesBranch {
    /// Endpoint with the lower sort key; the cascade orients the branch
    pub from: Node,
    pub to: Node,
    /// Component names in netlist order
    pub members: Vec<String>,
}

/// An element from `node` to ground
#[derive(Debug, Clone, PartialEq)]
pub struct ShuntElement {
    pub name: String,
    pub node: Node,
    /// The grounded end is `"0"` or a `Ground` node rather than a dangling one
    pub explicit_ground: bool,
}

/// Ordered series/shunt decomposition of a netlist
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    pub series: Vec<SeriesBranch>,
    pub shunts: Vec<ShuntElement>,
    /// Elements with both ends grounded; they contribute nothing
    pub degenerate: Vec<String>,
    /// Components with no two-port model (controlled sources)
    pub unsupported: Vec<String>,
}

impl Topology {
    /// Number of elements that contribute to the cascade
    pub fn element_count(&self) -> usize {
        self.series.iter().map(|b| b.members.len()).sum::<usize>() + self.shunts.len()
    }
}

/// True for components that map onto a two-terminal ladder element
pub fn is_ladder_element(kind: &ComponentKind) -> bool {
    matches!(
        kind,
        ComponentKind::Resistor(_)
            | ComponentKind::Capacitor(_)
            | ComponentKind::Inductor(_)
            | ComponentKind::Wire
            | ComponentKind::TransmissionLine(_)
            | ComponentKind::OpenStub(_)
            | ComponentKind::ShortStub(_)
            | ComponentKind::VoltageSource(_)
            | ComponentKind::CurrentSource(_)
            | ComponentKind::Diode
    )
}

/// Classify and sort the ladder elements of `netlist`
///
/// A node counts as ground if it is an explicit ground, or an implicit one
/// not listed in `signal_nodes` (requested port terminals stay signal nodes
/// even when nothing else touches them).
pub fn build_topology(netlist: &Netlist, signal_nodes: &[Node]) -> Topology {
    let explicit = |n: &Node| netlist.explicit_grounds().contains(n);
    let is_ground =
        |n: &Node| explicit(n) || (netlist.implicit_grounds().contains(n) && !signal_nodes.contains(n));

    let mut topology = Topology::default();
    let mut branches: IndexMap<(Node, Node), SeriesBranch> = IndexMap::new();

    for component in netlist.components() {
        if component.kind.is_directive() {
            continue;
        }
        if !is_ladder_element(&component.kind) {
            warn!(
                "{} `{}` has no two-port model; ignored",
                component.kind.label(),
                component.name
            );
            topology.unsupported.push(component.name.clone());
            continue;
        }
        let Some((a, b)) = component.terminals() else {
            continue;
        };

        match (is_ground(a), is_ground(b)) {
            (true, true) => {
                warn!("`{}` connects ground to ground; treated as no-op", component.name);
                topology.degenerate.push(component.name.clone());
            }
            (false, true) | (true, false) => {
                let (node, gnd) = if is_ground(b) { (a, b) } else { (b, a) };
                debug!("SHUNT: {} at node {}", component.name, node);
                topology.shunts.push(ShuntElement {
                    name: component.name.clone(),
                    node: node.clone(),
                    explicit_ground: explicit(gnd),
                });
            }
            (false, false) => {
                debug!("SERIES: {} from {} to {}", component.name, a, b);
                add_series(&mut branches, component, a, b);
            }
        }
    }

    topology.series = branches.into_values().collect();
    topology
        .series
        .sort_by_key(|br| (br.from.key(), br.to.key()));
    topology.shunts.sort_by_key(|s| s.node.key());
    topology
}

fn add_series(
    branches: &mut IndexMap<(Node, Node), SeriesBranch>,
    component: &Component,
    a: &Node,
    b: &Node,
) {
    let (from, to) = if b.key() < a.key() { (b, a) } else { (a, b) };
    let pair = if from.as_str() <= to.as_str() {
        (from.clone(), to.clone())
    } else {
        (to.clone(), from.clone())
    };
    branches
        .entry(pair)
        .or_insert_with(|| SeriesBranch {
            from: from.clone(),
            to: to.clone(),
            members: Vec::new(),
        })
        .members
        .push(component.name.clone());
}
