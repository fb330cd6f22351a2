//! Netlist module - textual circuit descriptions
//!
//! Parses netlist text into an ordered set of named components and infers
//! which nodes act as ground.

mod component;
mod parser;
mod value;

use indexmap::{IndexMap, IndexSet};

pub use component::{Component, ComponentKind, LineSpec, Node, NodeKey, Sine, SourceSpec};
pub use parser::parse_netlist;
pub use value::{is_unit_token, parse_value, parse_value_with_unit, unit_multiplier};

use crate::error::ParseError;
use crate::frequency::Frequency;

/// A parsed circuit
///
/// Components keep netlist order. Ground comes in two flavours: explicit
/// (node `"0"` and nodes named by `Ground` lines) and implicit (nodes that
/// only a single component touches).
#[derive(Debug, Clone)]
pub struct Netlist {
    pub(crate) components: IndexMap<String, Component>,
    pub(crate) explicit_grounds: IndexSet<Node>,
    pub(crate) implicit_grounds: IndexSet<Node>,
    pub(crate) frequency: Option<Frequency>,
    pub(crate) issues: Vec<ParseError>,
}

impl Default for Netlist {
    fn default() -> Self {
        let mut explicit_grounds = IndexSet::new();
        explicit_grounds.insert(Node::reference());
        Self {
            components: IndexMap::new(),
            explicit_grounds,
            implicit_grounds: IndexSet::new(),
            frequency: None,
            issues: Vec::new(),
        }
    }
}

impl std::str::FromStr for Netlist {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_netlist(s)
    }
}

impl Netlist {
    /// Build a netlist from already-constructed components
    pub fn from_components(components: impl IntoIterator<Item = Component>) -> Self {
        let mut netlist = Self::default();
        for c in components {
            netlist.insert(c);
        }
        netlist.detect_implicit_grounds();
        netlist
    }

    pub(crate) fn insert(&mut self, component: Component) {
        if matches!(component.kind, ComponentKind::Ground) {
            self.explicit_grounds.extend(component.nodes.iter().cloned());
        }
        self.components.insert(component.name.clone(), component);
    }

    /// Flag nodes referenced exactly once as implicit grounds
    ///
    /// Every node occurrence of every component counts, ports and ground
    /// lines included. Explicit grounds are never implicit.
    pub(crate) fn detect_implicit_grounds(&mut self) {
        let mut counts: IndexMap<&Node, usize> = IndexMap::new();
        for node in self.components.values().flat_map(|c| c.nodes.iter()) {
            *counts.entry(node).or_insert(0) += 1;
        }
        self.implicit_grounds = counts
            .into_iter()
            .filter(|(node, count)| *count == 1 && !self.explicit_grounds.contains(*node))
            .map(|(node, _)| node.clone())
            .collect();
    }

    /// Components in netlist order
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    pub fn get(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    /// Number of components, directives (ports, grounds) included
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// `"0"` plus every node named by a `Ground` line
    pub fn explicit_grounds(&self) -> &IndexSet<Node> {
        &self.explicit_grounds
    }

    /// Nodes touched by exactly one component
    pub fn implicit_grounds(&self) -> &IndexSet<Node> {
        &self.implicit_grounds
    }

    pub fn is_ground(&self, node: &Node) -> bool {
        self.explicit_grounds.contains(node) || self.implicit_grounds.contains(node)
    }

    /// Every node referenced by a component, in order of first appearance
    pub fn nodes(&self) -> IndexSet<Node> {
        self.components
            .values()
            .flat_map(|c| c.nodes.iter().cloned())
            .collect()
    }

    /// Frequency grid from an `f` directive, if present
    pub fn frequency(&self) -> Option<&Frequency> {
        self.frequency.as_ref()
    }

    /// Lines skipped while parsing
    pub fn issues(&self) -> &[ParseError] {
        &self.issues
    }

    /// Port declarations in netlist order
    pub fn ports(&self) -> impl Iterator<Item = &Component> {
        self.components
            .values()
            .filter(|c| matches!(c.kind, ComponentKind::Port { .. }))
    }
}
