//! Solver strategies.
//!
//! Both strategies drive a [`RootFinder`] over a synthesized
//! [`EquationSet`](crate::equations::EquationSet):
//!
//! - Operating point: one solve of the steady-state equations, seeded with
//!   a uniform initial guess.
//! - Transient: a fixed-step march where each step solves the companion
//!   equations bound to the step's time, its step size and the previous
//!   accepted point, seeded with that point.
//!
//! The default root finder is Newton-Raphson on the exact Jacobian:
//! ```text
//! J(x_k) dx = -F(x_k),   x_{k+1} = x_k + dx
//! ```
//! iterated until every `|dx_i| <= abstol + reltol * |x_i|` and
//! `max |F_i| <= residual_tolerance`.

mod config;
mod linear;
mod newton;
mod operating_point;
mod simulator;
mod sink;
mod transient;

pub use config::{Analysis, SolverConfig, TransientParams};
pub use linear::DenseLu;
pub use newton::{NewtonRaphson, RootFinder};
pub use operating_point::solve_operating_point;
pub use simulator::Simulator;
pub use sink::{Recorder, ResultSink, SolutionPoint, Trajectory};
pub use transient::TransientRun;

/// Default maximum Newton-Raphson iterations per solution point.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Default absolute update tolerance.
pub const DEFAULT_ABSTOL: f64 = 1e-9;

/// Default relative update tolerance.
pub const DEFAULT_RELTOL: f64 = 1e-6;

/// Default residual tolerance.
pub const DEFAULT_RESIDUAL_TOLERANCE: f64 = 1e-6;

/// Default value of every seed entry for the first solve.
pub const DEFAULT_INITIAL_GUESS: f64 = 1.0;
