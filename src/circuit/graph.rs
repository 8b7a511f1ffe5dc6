//! Circuit graph structure.

use std::collections::HashMap;

use super::types::{is_reference, Branch, BranchId, Element, REFERENCE_NODE};
use crate::error::{Result, SimError};

/// A complete circuit ready for simulation.
///
/// Nodes are kept in first-appearance order; that order fixes the voltage
/// slots of the unknown vector. Branch indices are assigned densely in
/// insertion order and never change afterwards.
#[derive(Debug, Clone, Default)]
pub struct Circuit {
    /// Title carried through to the output file
    pub title: String,

    /// Non-reference node labels in slot order
    pub nodes: Vec<String>,

    /// All branches, indexed by their `BranchId`
    pub branches: Vec<Branch>,

    /// Labels already registered, used to dedupe while building
    node_map: HashMap<String, usize>,
}

impl Circuit {
    /// Create an empty circuit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty circuit with a title.
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Declare a non-reference node explicitly, fixing its slot position.
    pub fn declare_node(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if is_reference(&name) {
            return Err(SimError::ReferenceListed { node: name });
        }
        if self.node_map.contains_key(&name) {
            return Err(SimError::DuplicateNode { node: name });
        }
        self.register_node(&name);
        Ok(())
    }

    fn register_node(&mut self, name: &str) {
        if is_reference(name) || self.node_map.contains_key(name) {
            return;
        }
        self.node_map.insert(name.to_string(), self.nodes.len());
        self.nodes.push(name.to_string());
    }

    /// Add a branch between two terminals and return its index.
    pub fn add_branch(
        &mut self,
        name: impl Into<String>,
        plus: impl Into<String>,
        minus: impl Into<String>,
        element: Element,
    ) -> BranchId {
        let plus = plus.into();
        let minus = minus.into();
        self.register_node(&plus);
        self.register_node(&minus);

        let index = BranchId(self.branches.len());
        self.branches.push(Branch {
            index,
            name: name.into(),
            plus,
            minus,
            element,
        });
        index
    }

    /// Add a resistor.
    pub fn resistor(&mut self, name: &str, plus: &str, minus: &str, ohms: f64) -> BranchId {
        self.add_branch(name, plus, minus, Element::resistor(ohms))
    }

    /// Add a capacitor.
    pub fn capacitor(&mut self, name: &str, plus: &str, minus: &str, farads: f64) -> BranchId {
        self.add_branch(name, plus, minus, Element::capacitor(farads))
    }

    /// Add an inductor.
    pub fn inductor(&mut self, name: &str, plus: &str, minus: &str, henries: f64) -> BranchId {
        self.add_branch(name, plus, minus, Element::inductor(henries))
    }

    /// Add a constant voltage source.
    pub fn voltage_source(&mut self, name: &str, plus: &str, minus: &str, volts: f64) -> BranchId {
        self.add_branch(name, plus, minus, Element::voltage_source(volts))
    }

    /// Add a constant current source.
    pub fn current_source(&mut self, name: &str, plus: &str, minus: &str, amps: f64) -> BranchId {
        self.add_branch(name, plus, minus, Element::current_source(amps))
    }

    /// Number of non-reference nodes (N).
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of branches (B).
    pub fn num_branches(&self) -> usize {
        self.branches.len()
    }

    /// Length of the unknown vector (N + B).
    pub fn num_unknowns(&self) -> usize {
        self.num_nodes() + self.num_branches()
    }

    /// Position of a node in the slot ordering. `None` for the reference
    /// node and for unknown labels.
    pub fn node_position(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n == name)
    }

    /// True if the label is the reference node or a listed node.
    pub fn has_node(&self, name: &str) -> bool {
        is_reference(name) || self.nodes.iter().any(|n| n == name)
    }

    /// Find a branch by element name (case-insensitive).
    pub fn find_branch(&self, name: &str) -> Option<&Branch> {
        self.branches
            .iter()
            .find(|b| b.name.eq_ignore_ascii_case(name))
    }

    /// Get a branch by index.
    pub fn branch(&self, id: BranchId) -> Option<&Branch> {
        self.branches.get(id.0)
    }

    /// True if any branch touches the reference node.
    pub fn has_reference(&self) -> bool {
        self.branches
            .iter()
            .any(|b| is_reference(&b.plus) || is_reference(&b.minus))
    }

    /// Label of the reference node.
    pub fn reference(&self) -> &'static str {
        REFERENCE_NODE
    }

    /// True if any source pulls its value from an external provider.
    pub fn uses_external_sources(&self) -> bool {
        self.branches.iter().any(|b| b.element.is_external())
    }

    /// Rebuild the registration lookup after `nodes` was edited directly,
    /// so later `add_branch` calls dedupe against the edited list.
    pub fn reindex_nodes(&mut self) {
        self.node_map = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
    }
}
