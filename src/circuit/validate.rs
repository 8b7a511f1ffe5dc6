//! Circuit validation.

use std::collections::HashSet;

use crate::error::{Result, SimError};
use crate::expr::Signal;

use super::types::{is_reference, CurrentSense, Element, SourceValue};
use super::Circuit;

/// Validate a circuit for equation synthesis.
///
/// Checks:
/// - The reference node is a terminal of at least one branch
/// - The node list has no duplicates and does not list the reference node
/// - Branch indices are the dense sequence 0..B-1 in input order
/// - Every terminal, controlling node and controlling branch resolves
/// - Every listed node is a terminal of at least one branch
pub fn validate_circuit(circuit: &Circuit) -> Result<()> {
    if !circuit.has_reference() {
        return Err(SimError::MissingReference {
            reference: circuit.reference().to_string(),
        });
    }

    let mut seen = HashSet::with_capacity(circuit.nodes.len());
    for node in &circuit.nodes {
        if is_reference(node) {
            return Err(SimError::ReferenceListed { node: node.clone() });
        }
        if !seen.insert(node.as_str()) {
            return Err(SimError::DuplicateNode { node: node.clone() });
        }
    }

    let mut connected = HashSet::with_capacity(circuit.nodes.len());
    for (expected, branch) in circuit.branches.iter().enumerate() {
        if branch.index.0 != expected {
            return Err(SimError::NonDenseBranchIndex {
                branch: branch.name.clone(),
                expected,
                found: branch.index.0,
            });
        }

        for terminal in branch.terminals() {
            check_node(circuit, &branch.name, terminal)?;
            connected.insert(terminal);
        }

        match &branch.element {
            Element::Vcvs { sense, .. } | Element::Vccs { sense, .. } => {
                check_node(circuit, &branch.name, &sense.plus)?;
                check_node(circuit, &branch.name, &sense.minus)?;
            }
            Element::Ccvs { sense, .. } | Element::Cccs { sense, .. } => {
                check_sense(circuit, &branch.name, sense)?;
            }
            Element::Resistor { resistance: expr }
            | Element::Capacitor {
                capacitance: expr, ..
            }
            | Element::Inductor {
                inductance: expr, ..
            }
            | Element::BehavioralCurrent { expr }
            | Element::BehavioralVoltage { expr } => {
                check_signals(circuit, &branch.name, expr.variables().into_iter())?;
            }
            Element::VoltageSource { value } | Element::CurrentSource { value } => {
                if let SourceValue::Expr(expr) = value {
                    check_signals(circuit, &branch.name, expr.variables().into_iter())?;
                }
            }
        }
    }

    for node in &circuit.nodes {
        if !connected.contains(node.as_str()) {
            return Err(SimError::UnconnectedNode { node: node.clone() });
        }
    }

    Ok(())
}

fn check_node(circuit: &Circuit, branch: &str, node: &str) -> Result<()> {
    if circuit.has_node(node) {
        Ok(())
    } else {
        Err(SimError::UnresolvedNode {
            branch: branch.to_string(),
            node: node.to_string(),
        })
    }
}

fn check_sense(circuit: &Circuit, branch: &str, sense: &CurrentSense) -> Result<()> {
    for id in std::iter::once(sense.plus).chain(sense.minus) {
        if id.0 >= circuit.num_branches() {
            return Err(SimError::UnresolvedBranch {
                branch: branch.to_string(),
                index: id.0,
            });
        }
    }
    Ok(())
}

fn check_signals<'a>(
    circuit: &Circuit,
    branch: &str,
    signals: impl Iterator<Item = &'a Signal>,
) -> Result<()> {
    for signal in signals {
        match signal {
            Signal::Voltage(node) => check_node(circuit, branch, node)?,
            Signal::Current(id) => {
                if id.0 >= circuit.num_branches() {
                    return Err(SimError::UnresolvedBranch {
                        branch: branch.to_string(),
                        index: id.0,
                    });
                }
            }
        }
    }
    Ok(())
}
