//! Unknown vector layout.
//!
//! The solution vector has `N + B` entries: slots `[0, N)` hold node
//! voltages in node order, slots `[N, N + B)` hold branch currents indexed
//! by `BranchId`. Every device equation and every KCL equation is built
//! against the same `Layout`, so it must be fixed before synthesis starts.

use std::collections::HashMap;

use super::types::{is_reference, BranchId};
use super::Circuit;
use crate::error::{Result, SimError};
use crate::expr::{Expr, Signal};

/// Variable index in the solution vector.
/// Can be either a node voltage or a branch current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unknown {
    /// Voltage of the node at this position in the node ordering
    Voltage(usize),
    /// Branch current
    Current(BranchId),
}

/// Fixed mapping from nodes and branches onto solution-vector slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    nodes: Vec<String>,
    node_map: HashMap<String, usize>,
    num_branches: usize,
}

impl Layout {
    /// Capture the layout of a circuit.
    pub fn new(circuit: &Circuit) -> Self {
        let node_map = circuit
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        Self {
            nodes: circuit.nodes.clone(),
            node_map,
            num_branches: circuit.num_branches(),
        }
    }

    /// Number of node-voltage slots (N).
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of branch-current slots (B).
    pub fn num_branches(&self) -> usize {
        self.num_branches
    }

    /// Total number of unknowns (N + B).
    pub fn len(&self) -> usize {
        self.nodes.len() + self.num_branches
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Node labels in slot order.
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// Get the raw index into the solution vector.
    pub fn index(&self, unknown: Unknown) -> usize {
        match unknown {
            Unknown::Voltage(position) => position,
            // Branch currents come after node voltages
            Unknown::Current(BranchId(b)) => self.nodes.len() + b,
        }
    }

    /// Classify a raw slot index.
    pub fn unknown(&self, slot: usize) -> Unknown {
        if slot < self.nodes.len() {
            Unknown::Voltage(slot)
        } else {
            Unknown::Current(BranchId(slot - self.nodes.len()))
        }
    }

    /// Slot of a node voltage. Returns `Ok(None)` for the reference node.
    pub fn node_slot(&self, branch: &str, node: &str) -> Result<Option<usize>> {
        if is_reference(node) {
            return Ok(None);
        }
        self.node_map
            .get(node)
            .copied()
            .map(Some)
            .ok_or_else(|| SimError::UnresolvedNode {
                branch: branch.to_string(),
                node: node.to_string(),
            })
    }

    /// Slot of a branch current.
    pub fn current_slot(&self, branch: BranchId) -> usize {
        self.index(Unknown::Current(branch))
    }

    /// Current-iteration voltage of a node (constant 0 for the reference).
    pub fn voltage(&self, branch: &str, node: &str) -> Result<Expr<usize>> {
        Ok(match self.node_slot(branch, node)? {
            Some(slot) => Expr::Var(slot),
            None => Expr::Const(0.0),
        })
    }

    /// Previous-point voltage of a node (constant 0 for the reference).
    pub fn prev_voltage(&self, branch: &str, node: &str) -> Result<Expr<usize>> {
        Ok(match self.node_slot(branch, node)? {
            Some(slot) => Expr::Prev(slot),
            None => Expr::Const(0.0),
        })
    }

    /// Current-iteration branch current.
    pub fn current(&self, branch: BranchId) -> Expr<usize> {
        Expr::Var(self.current_slot(branch))
    }

    /// Previous-point branch current.
    pub fn prev_current(&self, branch: BranchId) -> Expr<usize> {
        Expr::Prev(self.current_slot(branch))
    }

    /// Resolve named signals in a netlist-level expression into slots.
    pub fn resolve(&self, branch: &str, expr: &Expr<Signal>) -> Result<Expr<usize>> {
        expr.resolve_with(&mut |signal| match signal {
            Signal::Voltage(node) => self.node_slot(branch, node),
            Signal::Current(id) if id.0 < self.num_branches => Ok(Some(self.current_slot(*id))),
            Signal::Current(id) => Err(SimError::UnresolvedBranch {
                branch: branch.to_string(),
                index: id.0,
            }),
        })
    }

    /// Human-readable name of every slot: `V(node)` then `i(k)`.
    pub fn variable_names(&self) -> Vec<String> {
        self.nodes
            .iter()
            .map(|n| format!("V({})", n))
            .chain((0..self.num_branches).map(|b| format!("i({})", b)))
            .collect()
    }
}
