//! Error types for the nodal circuit simulator.
//!
//! This module provides a unified error type [`SimError`] that covers
//! netlist reading, circuit validation, analysis configuration, the
//! nonlinear solve, and result output.

use std::fmt;

use thiserror::Error;

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Which solution point a solver error refers to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SolvePoint {
    /// The single operating-point solve
    OperatingPoint,
    /// The first point of a transient run
    Initial { time: f64 },
    /// An accepted-step solve of a transient run
    Step { index: usize, time: f64 },
}

impl fmt::Display for SolvePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolvePoint::OperatingPoint => write!(f, "operating point"),
            SolvePoint::Initial { time } => write!(f, "initial point (t = {:e})", time),
            SolvePoint::Step { index, time } => write!(f, "step {} (t = {:e})", index, time),
        }
    }
}

/// Unified error type for all simulator operations.
#[derive(Error, Debug)]
pub enum SimError {
    // ============ Netlist Errors ============
    /// Error during lexical analysis
    #[error("Lexer error at line {line}, column {column}: {message}")]
    LexerError {
        line: usize,
        column: usize,
        message: String,
    },

    /// Error during parsing
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Invalid element definition
    #[error("Invalid element '{name}' at line {line}: {message}")]
    InvalidComponent {
        name: String,
        line: usize,
        message: String,
    },

    /// Unknown element type letter
    #[error("Unknown element type '{component_type}' at line {line}")]
    UnknownComponentType { component_type: String, line: usize },

    // ============ Input Validity Errors ============
    /// No branch touches the reference node
    #[error("Circuit has no reference node '{reference}'")]
    MissingReference { reference: String },

    /// A terminal names a node that is neither listed nor the reference
    #[error("Branch '{branch}' references unknown node '{node}'")]
    UnresolvedNode { branch: String, node: String },

    /// A controlling branch reference is out of range
    #[error("Branch '{branch}' references unknown branch index {index}")]
    UnresolvedBranch { branch: String, index: usize },

    /// A listed node is not a terminal of any branch
    #[error("Node '{node}' is not connected to any branch")]
    UnconnectedNode { node: String },

    /// A node is listed twice
    #[error("Duplicate node '{node}'")]
    DuplicateNode { node: String },

    /// The reference node appears in the unknown list
    #[error("Reference node '{node}' cannot be listed as an unknown node")]
    ReferenceListed { node: String },

    /// Branch indices are not the dense sequence 0..B-1 in input order
    #[error("Branch '{branch}' has index {found}, expected {expected}")]
    NonDenseBranchIndex {
        branch: String,
        expected: usize,
        found: usize,
    },

    // ============ Configuration Errors ============
    /// Transient step size is not a positive finite number
    #[error("Invalid step size {step}: must be positive and finite")]
    InvalidStepSize { step: f64 },

    /// Start time is not before stop time
    #[error("Invalid time range: start {start} must be before stop {stop}")]
    InvalidTimeRange { start: f64, stop: f64 },

    /// A solver or analysis setting is out of range
    #[error("Invalid simulation parameter: {message}")]
    InvalidSimulationParam { message: String },

    /// The circuit uses external sources but none were supplied
    #[error("Branch '{branch}' needs an external source provider but none was supplied")]
    MissingExternalSource { branch: String },

    /// A caller-supplied seed has the wrong length
    #[error("Seed has {found} entries, expected {expected}")]
    SeedLength { expected: usize, found: usize },

    // ============ Convergence Errors ============
    /// The root finder did not converge
    #[error("Newton-Raphson did not converge at {point} after {iterations} iterations (residual: {residual:.2e})")]
    ConvergenceFailure {
        point: SolvePoint,
        iterations: usize,
        residual: f64,
    },

    /// The Jacobian could not be factored
    #[error("Singular Jacobian at {point} (column {column}) - circuit may have a floating node or a source loop")]
    SingularJacobian { point: SolvePoint, column: usize },

    // ============ I/O Errors ============
    /// Error reading the netlist file
    #[error("Failed to read netlist '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error writing simulation output
    #[error("Failed to write output: {source}")]
    OutputWriteError {
        #[source]
        source: std::io::Error,
    },
}

impl SimError {
    /// Create a lexer error
    pub fn lexer(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::LexerError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Create an invalid element error
    pub fn invalid_component(name: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::InvalidComponent {
            name: name.into(),
            line,
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_param(message: impl Into<String>) -> Self {
        Self::InvalidSimulationParam {
            message: message.into(),
        }
    }

    /// Create a convergence failure error
    pub fn convergence_failure(point: SolvePoint, iterations: usize, residual: f64) -> Self {
        Self::ConvergenceFailure {
            point,
            iterations,
            residual,
        }
    }

    /// True for errors caused by a malformed circuit description.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::MissingReference { .. }
                | Self::UnresolvedNode { .. }
                | Self::UnresolvedBranch { .. }
                | Self::UnconnectedNode { .. }
                | Self::DuplicateNode { .. }
                | Self::ReferenceListed { .. }
                | Self::NonDenseBranchIndex { .. }
        )
    }

    /// True for errors caused by analysis or solver settings.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidStepSize { .. }
                | Self::InvalidTimeRange { .. }
                | Self::InvalidSimulationParam { .. }
                | Self::MissingExternalSource { .. }
                | Self::SeedLength { .. }
        )
    }

    /// True for recoverable solve failures; the caller may retry with another seed.
    pub fn is_convergence_error(&self) -> bool {
        matches!(
            self,
            Self::ConvergenceFailure { .. } | Self::SingularJacobian { .. }
        )
    }

    /// The solution point a solve failure refers to, if any.
    pub fn solve_point(&self) -> Option<SolvePoint> {
        match self {
            Self::ConvergenceFailure { point, .. } | Self::SingularJacobian { point, .. } => {
                Some(*point)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = SimError::MissingReference {
            reference: "0".to_string(),
        };
        assert!(err.is_input_error());
        assert!(!err.is_convergence_error());

        let err = SimError::InvalidStepSize { step: 0.0 };
        assert!(err.is_configuration_error());

        let err = SimError::convergence_failure(SolvePoint::Step { index: 3, time: 3e-3 }, 50, 1.5);
        assert!(err.is_convergence_error());
        assert_eq!(err.solve_point(), Some(SolvePoint::Step { index: 3, time: 3e-3 }));
    }

    #[test]
    fn test_convergence_message_names_point() {
        let err = SimError::convergence_failure(SolvePoint::OperatingPoint, 10, 2.0e-3);
        let message = err.to_string();
        assert!(message.contains("operating point"));
        assert!(message.contains("10 iterations"));
    }
}
