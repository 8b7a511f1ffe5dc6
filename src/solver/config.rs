//! Solver and analysis configuration.

use crate::error::{Result, SimError};

use super::{
    DEFAULT_ABSTOL, DEFAULT_INITIAL_GUESS, DEFAULT_MAX_ITERATIONS, DEFAULT_RELTOL,
    DEFAULT_RESIDUAL_TOLERANCE,
};

/// Guard against `(stop - start) / step` landing just below an integer.
const STEP_COUNT_GUARD: f64 = 1e-9;

/// Configuration for the nonlinear solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Maximum Newton-Raphson iterations per solution point.
    pub max_iterations: usize,
    /// Absolute update tolerance.
    pub abstol: f64,
    /// Relative update tolerance.
    pub reltol: f64,
    /// Largest acceptable residual (max-norm) at a converged point.
    pub residual_tolerance: f64,
    /// Value of every seed entry for the first solve of a run.
    pub initial_guess: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            abstol: DEFAULT_ABSTOL,
            reltol: DEFAULT_RELTOL,
            residual_tolerance: DEFAULT_RESIDUAL_TOLERANCE,
            initial_guess: DEFAULT_INITIAL_GUESS,
        }
    }
}

impl SolverConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum Newton-Raphson iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_abstol(mut self, abstol: f64) -> Self {
        self.abstol = abstol;
        self
    }

    pub fn with_reltol(mut self, reltol: f64) -> Self {
        self.reltol = reltol;
        self
    }

    pub fn with_residual_tolerance(mut self, tolerance: f64) -> Self {
        self.residual_tolerance = tolerance;
        self
    }

    /// Set the uniform initial guess used to seed the first solve.
    pub fn with_initial_guess(mut self, guess: f64) -> Self {
        self.initial_guess = guess;
        self
    }

    /// Reject settings that cannot bound or terminate the iteration.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(SimError::invalid_param("max_iterations must be at least 1"));
        }
        for (name, value) in [
            ("abstol", self.abstol),
            ("reltol", self.reltol),
            ("residual_tolerance", self.residual_tolerance),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimError::invalid_param(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        if !self.initial_guess.is_finite() {
            return Err(SimError::invalid_param("initial_guess must be finite"));
        }
        Ok(())
    }
}

/// Transient analysis parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TransientParams {
    pub step: f64,
    pub stop: f64,
    pub start: f64,
    /// Advisory only; the step size is fixed
    pub max_step: Option<f64>,
    /// Honor declared initial conditions at the first point
    pub use_initial_conditions: bool,
}

impl TransientParams {
    pub fn new(step: f64, stop: f64) -> Self {
        Self {
            step,
            stop,
            start: 0.0,
            max_step: None,
            use_initial_conditions: false,
        }
    }

    pub fn with_start(mut self, start: f64) -> Self {
        self.start = start;
        self
    }

    pub fn with_max_step(mut self, max_step: f64) -> Self {
        self.max_step = Some(max_step);
        self
    }

    pub fn with_initial_conditions(mut self, use_initial_conditions: bool) -> Self {
        self.use_initial_conditions = use_initial_conditions;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(SimError::InvalidStepSize { step: self.step });
        }
        if !(self.start.is_finite() && self.stop.is_finite() && self.start < self.stop) {
            return Err(SimError::InvalidTimeRange {
                start: self.start,
                stop: self.stop,
            });
        }
        if let Some(max_step) = self.max_step {
            if !(max_step.is_finite() && max_step > 0.0) {
                return Err(SimError::invalid_param(format!(
                    "max_step must be positive, got {}",
                    max_step
                )));
            }
        }
        Ok(())
    }

    /// Number of accepted steps after the initial point.
    pub fn step_count(&self) -> usize {
        let ratio = (self.stop - self.start) / self.step;
        (ratio * (1.0 + STEP_COUNT_GUARD)).floor() as usize
    }

    /// Timestamp of point `k` (0 is the initial point).
    pub fn time_at(&self, k: usize) -> f64 {
        self.start + k as f64 * self.step
    }
}

/// Requested analysis.
#[derive(Debug, Clone, PartialEq)]
pub enum Analysis {
    OperatingPoint,
    Transient(TransientParams),
}

impl Analysis {
    pub fn validate(&self) -> Result<()> {
        match self {
            Analysis::OperatingPoint => Ok(()),
            Analysis::Transient(params) => params.validate(),
        }
    }

    /// Plot name used by the raw file format.
    pub fn plot_name(&self) -> &'static str {
        match self {
            Analysis::OperatingPoint => "Operating Point",
            Analysis::Transient(_) => "Transient Analysis",
        }
    }
}
