//! Newton-Raphson root finding over an equation set.

use tracing::trace;

use crate::equations::EquationSet;
use crate::error::{Result, SimError, SolvePoint};
use crate::expr::Binding;

use super::config::SolverConfig;
use super::linear::DenseLu;

/// A nonlinear root finder for square equation sets.
pub trait RootFinder {
    /// Find `x` with every equation of `equations` near zero, starting from `seed`.
    fn find_root(
        &mut self,
        equations: &EquationSet,
        binding: &Binding<'_>,
        seed: &[f64],
        point: SolvePoint,
    ) -> Result<Vec<f64>>;
}

impl<R: RootFinder + ?Sized> RootFinder for &mut R {
    fn find_root(
        &mut self,
        equations: &EquationSet,
        binding: &Binding<'_>,
        seed: &[f64],
        point: SolvePoint,
    ) -> Result<Vec<f64>> {
        (**self).find_root(equations, binding, seed, point)
    }
}

/// Newton-Raphson with an exact Jacobian and a dense LU solve.
#[derive(Debug, Clone)]
pub struct NewtonRaphson {
    /// Maximum iterations
    pub max_iterations: usize,
    pub abstol: f64,
    pub reltol: f64,
    pub residual_tolerance: f64,
    jacobian: Vec<f64>,
    residual: Vec<f64>,
    lu: DenseLu,
}

impl Default for NewtonRaphson {
    fn default() -> Self {
        Self::new()
    }
}

impl NewtonRaphson {
    /// Create a new Newton-Raphson solver.
    pub fn new() -> Self {
        Self::with_config(&SolverConfig::default())
    }

    /// Create a solver with custom configuration.
    pub fn with_config(config: &SolverConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            abstol: config.abstol,
            reltol: config.reltol,
            residual_tolerance: config.residual_tolerance,
            jacobian: Vec::new(),
            residual: Vec::new(),
            lu: DenseLu::new(0),
        }
    }

    fn resize(&mut self, n: usize) {
        if self.lu.size != n {
            self.jacobian = vec![0.0; n * n];
            self.residual = vec![0.0; n];
            self.lu = DenseLu::new(n);
        }
    }

    /// Max-norm of the residual at the last evaluated point.
    fn residual_norm(&self) -> f64 {
        self.residual
            .iter()
            .fold(0.0f64, |acc, r| acc.max(r.abs()))
    }
}

impl RootFinder for NewtonRaphson {
    fn find_root(
        &mut self,
        equations: &EquationSet,
        binding: &Binding<'_>,
        seed: &[f64],
        point: SolvePoint,
    ) -> Result<Vec<f64>> {
        let n = equations.len();
        if seed.len() != n {
            return Err(SimError::SeedLength {
                expected: n,
                found: seed.len(),
            });
        }
        self.resize(n);

        let mut x = seed.to_vec();
        let mut dx = vec![0.0; n];

        for iter in 0..self.max_iterations {
            equations.residual(&x, binding, &mut self.residual);
            equations.jacobian(&x, binding, &mut self.jacobian);

            if self.residual.iter().any(|r| !r.is_finite()) {
                return Err(SimError::convergence_failure(point, iter, self.residual_norm()));
            }

            self.lu
                .factor(&self.jacobian)
                .map_err(|column| SimError::SingularJacobian { point, column })?;

            // J * dx = -F
            for (d, r) in dx.iter_mut().zip(&self.residual) {
                *d = -r;
            }
            self.lu.solve(&mut dx);

            let mut step_converged = true;
            for (xi, di) in x.iter_mut().zip(&dx) {
                *xi += di;
                if !(di.abs() <= self.abstol + self.reltol * xi.abs()) {
                    step_converged = false;
                }
            }

            if x.iter().any(|v| !v.is_finite()) {
                return Err(SimError::convergence_failure(point, iter + 1, self.residual_norm()));
            }

            if step_converged {
                equations.residual(&x, binding, &mut self.residual);
                let norm = self.residual_norm();
                if norm <= self.residual_tolerance {
                    trace!(%point, iterations = iter + 1, residual = norm, "newton converged");
                    return Ok(x);
                }
            }
        }

        equations.residual(&x, binding, &mut self.residual);
        Err(SimError::convergence_failure(
            point,
            self.max_iterations,
            self.residual_norm(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{Circuit, Element};
    use crate::components::Flavor;
    use crate::expr::{Expr, Func};
    use approx::assert_relative_eq;

    fn solve(circuit: &Circuit) -> Result<Vec<f64>> {
        let set = EquationSet::synthesize(circuit, Flavor::OperatingPoint)?;
        let prev = vec![0.0; set.len()];
        let b = Binding::start(&prev, 0.0, 0.0);
        NewtonRaphson::new().find_root(&set, &b, &vec![1.0; set.len()], SolvePoint::OperatingPoint)
    }

    #[test]
    fn test_linear_divider() {
        let mut circuit = Circuit::new();
        circuit.voltage_source("V1", "n1", "0", 10.0);
        circuit.resistor("R1", "n1", "n2", 1e3);
        circuit.resistor("R2", "n2", "0", 3e3);
        let x = solve(&circuit).unwrap();
        assert_relative_eq!(x[1], 7.5, epsilon = 1e-9);
    }

    #[test]
    fn test_nonlinear_behavioral_load() {
        // 1 V through 1 ohm into a load drawing i = v^2
        let mut circuit = Circuit::new();
        circuit.voltage_source("V1", "a", "0", 1.0);
        circuit.resistor("R1", "a", "b", 1.0);
        circuit.add_branch(
            "B1",
            "b",
            "0",
            Element::BehavioralCurrent {
                expr: Expr::pow(Expr::voltage("b"), Expr::Const(2.0)),
            },
        );
        let x = solve(&circuit).unwrap();
        // v + v^2 = 1
        let expected = (5.0f64.sqrt() - 1.0) / 2.0;
        assert_relative_eq!(x[1], expected, epsilon = 1e-9);
    }

    #[test]
    fn test_singular_jacobian_is_reported() {
        // Two ideal voltage sources in parallel
        let mut circuit = Circuit::new();
        circuit.voltage_source("V1", "a", "0", 1.0);
        circuit.voltage_source("V2", "a", "0", 2.0);
        let err = solve(&circuit).unwrap_err();
        assert!(matches!(err, SimError::SingularJacobian { .. }));
        assert!(err.is_convergence_error());
    }

    #[test]
    fn test_iteration_budget_is_enforced() {
        let mut circuit = Circuit::new();
        circuit.voltage_source("V1", "a", "0", 1.0);
        circuit.add_branch(
            "B1",
            "a",
            "0",
            Element::BehavioralCurrent {
                expr: Expr::call(Func::Exp, Expr::voltage("a") * Expr::Const(40.0)),
            },
        );
        let set = EquationSet::synthesize(&circuit, Flavor::OperatingPoint).unwrap();
        let prev = vec![0.0; set.len()];
        let b = Binding::start(&prev, 0.0, 0.0);
        let mut newton = NewtonRaphson::with_config(&SolverConfig::new().with_max_iterations(1));
        let err = newton
            .find_root(&set, &b, &[0.0, 0.0, 0.0], SolvePoint::OperatingPoint)
            .unwrap_err();
        assert!(matches!(
            err,
            SimError::ConvergenceFailure { iterations: 1, .. }
        ));
    }

    #[test]
    fn test_seed_length_is_checked() {
        let mut circuit = Circuit::new();
        circuit.voltage_source("V1", "a", "0", 1.0);
        circuit.resistor("R1", "a", "0", 1.0);
        let set = EquationSet::synthesize(&circuit, Flavor::OperatingPoint).unwrap();
        let prev = vec![0.0; set.len()];
        let b = Binding::start(&prev, 0.0, 0.0);
        let err = NewtonRaphson::new()
            .find_root(&set, &b, &[1.0], SolvePoint::OperatingPoint)
            .unwrap_err();
        assert!(matches!(err, SimError::SeedLength { expected: 3, found: 1 }));
    }
}
