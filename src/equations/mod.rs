//! Equation synthesis.
//!
//! Walks the branch list, asks the device library for one constitutive
//! equation per branch, then appends one KCL equation per non-reference
//! node. The resulting [`EquationSet`] is square (`N + B` equations over
//! `N + B` unknowns) and immutable; solver strategies only change the
//! [`Binding`] it is evaluated against.

mod kcl;

pub use kcl::kcl_equations;

use tracing::debug;

use crate::circuit::{validate_circuit, BranchId, Circuit, Layout};
use crate::components::{device_equation, Flavor};
use crate::error::{Result, SimError};
use crate::expr::{Binding, Expr};

/// Where an equation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Constitutive law of a branch
    Device(BranchId),
    /// Current balance at the node in this voltage-slot position
    Kcl(usize),
}

/// One scalar equation; its root is where `expr` evaluates to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    pub origin: Origin,
    pub expr: Expr<usize>,
}

/// Ordered equation list for one analysis.
#[derive(Debug, Clone)]
pub struct EquationSet {
    layout: Layout,
    equations: Vec<Equation>,
    flavor: Flavor,
    /// First branch whose value comes from an external provider
    external: Option<String>,
}

impl EquationSet {
    /// Validate the circuit and build its equations.
    ///
    /// Input-validity errors surface here, before any solve is attempted.
    pub fn synthesize(circuit: &Circuit, flavor: Flavor) -> Result<Self> {
        validate_circuit(circuit)?;
        let layout = Layout::new(circuit);

        let mut equations = Vec::with_capacity(layout.len());
        let mut external = None;
        for branch in &circuit.branches {
            let expr = device_equation(branch, &layout, flavor)?;
            if external.is_none() && expr.uses_external() {
                external = Some(branch.name.clone());
            }
            equations.push(Equation {
                origin: Origin::Device(branch.index),
                expr,
            });
        }

        equations.extend(
            kcl_equations(circuit, &layout)?
                .into_iter()
                .enumerate()
                .map(|(n, expr)| Equation {
                    origin: Origin::Kcl(n),
                    expr,
                }),
        );

        debug!(
            nodes = layout.num_nodes(),
            branches = layout.num_branches(),
            equations = equations.len(),
            ?flavor,
            "synthesized equation set"
        );

        Ok(Self {
            layout,
            equations,
            flavor,
            external,
        })
    }

    /// Number of equations (always equal to the number of unknowns).
    pub fn len(&self) -> usize {
        self.equations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.equations.is_empty()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// Name of a branch that needs an external source provider, if any.
    pub fn requires_external(&self) -> Option<&str> {
        self.external.as_deref()
    }

    /// Reject a run that reads external sources without a provider.
    pub fn check_sources(&self, binding: &Binding<'_>) -> Result<()> {
        match (&self.external, binding.sources) {
            (Some(branch), None) => Err(SimError::MissingExternalSource {
                branch: branch.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Evaluate every equation at `x` into `out`.
    pub fn residual(&self, x: &[f64], binding: &Binding<'_>, out: &mut [f64]) {
        for (r, eq) in out.iter_mut().zip(&self.equations) {
            *r = eq.expr.eval(x, binding);
        }
    }

    /// Fill `out` (row-major, `len() x len()`) with the exact Jacobian at `x`.
    pub fn jacobian(&self, x: &[f64], binding: &Binding<'_>, out: &mut [f64]) {
        let n = self.len();
        out.fill(0.0);
        for (row, eq) in self.equations.iter().enumerate() {
            eq.expr
                .accumulate_gradient(x, binding, 1.0, &mut out[row * n..(row + 1) * n]);
        }
    }
}
