//! Kirchhoff's current law, one equation per non-reference node.

use crate::circuit::{Circuit, Layout};
use crate::error::Result;
use crate::expr::Expr;

/// Build the KCL equations in voltage-slot order.
///
/// A branch current flows out of its plus terminal and into its minus
/// terminal, so it enters the plus node's sum negated and the minus node's
/// sum as is. Terminals on the reference node contribute nothing.
///
/// Rows are placed by the layout's voltage slots, so row `n` always
/// balances the node whose voltage sits in slot `n`.
pub fn kcl_equations(circuit: &Circuit, layout: &Layout) -> Result<Vec<Expr<usize>>> {
    let mut terms: Vec<Vec<Expr<usize>>> = vec![Vec::new(); layout.num_nodes()];

    for branch in &circuit.branches {
        let current = || layout.current(branch.index);
        if let Some(n) = layout.node_slot(&branch.name, &branch.plus)? {
            terms[n].push(-current());
        }
        if let Some(n) = layout.node_slot(&branch.name, &branch.minus)? {
            terms[n].push(current());
        }
    }

    Ok(terms.into_iter().map(Expr::sum).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Binding;

    #[test]
    fn test_signs_follow_branch_direction() {
        let mut circuit = Circuit::new();
        circuit.current_source("I1", "0", "a", 1.0);
        circuit.resistor("R1", "a", "b", 1.0);
        circuit.resistor("R2", "b", "0", 1.0);
        let layout = Layout::new(&circuit);
        let eqs = kcl_equations(&circuit, &layout).unwrap();
        assert_eq!(eqs.len(), 2);

        // [V(a), V(b), i(0), i(1), i(2)]
        let x = [0.0, 0.0, 1.0, 1.0, 1.0];
        let prev = [0.0; 5];
        let b = Binding::start(&prev, 0.0, 0.0);
        // Node a: +i(0) - i(1); node b: +i(1) - i(2)
        assert_eq!(eqs[0].eval(&x, &b), 0.0);
        assert_eq!(eqs[1].eval(&x, &b), 0.0);

        let x = [0.0, 0.0, 3.0, 1.0, 0.0];
        assert_eq!(eqs[0].eval(&x, &b), 2.0);
        assert_eq!(eqs[1].eval(&x, &b), 1.0);
    }

    #[test]
    fn test_rows_follow_reordered_node_list() {
        let mut circuit = Circuit::new();
        circuit.current_source("I1", "0", "a", 1.0);
        circuit.resistor("R1", "a", "b", 1.0);
        circuit.resistor("R2", "b", "0", 1.0);
        // Edit the public node list without rebuilding the lookup
        circuit.nodes.swap(0, 1);
        let layout = Layout::new(&circuit);
        assert_eq!(layout.nodes(), ["b", "a"]);
        let eqs = kcl_equations(&circuit, &layout).unwrap();

        // [V(b), V(a), i(0), i(1), i(2)] with only i(1) flowing
        let x = [0.0, 0.0, 0.0, 1.0, 0.0];
        let prev = [0.0; 5];
        let b = Binding::start(&prev, 0.0, 0.0);
        // Slot 0 is b: +i(1) - i(2); slot 1 is a: +i(0) - i(1)
        assert_eq!(eqs[0].eval(&x, &b), 1.0);
        assert_eq!(eqs[1].eval(&x, &b), -1.0);
    }

    #[test]
    fn test_terminal_missing_from_layout_is_rejected() {
        let mut circuit = Circuit::new();
        circuit.resistor("R1", "a", "0", 1.0);
        circuit.nodes.clear();
        let layout = Layout::new(&circuit);
        assert!(kcl_equations(&circuit, &layout).unwrap_err().is_input_error());
    }
}
