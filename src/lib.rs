//! # Nodalsim Core
//!
//! A SPICE-style circuit simulator core.
//!
//! This library provides:
//! - A reader for a subset of the SPICE netlist language
//! - Modified Nodal Analysis (MNA) equation synthesis: one constitutive
//!   equation per branch plus one KCL equation per non-reference node
//! - Operating-point and fixed-step transient analyses solved with
//!   Newton-Raphson on an exact Jacobian
//! - A SPICE "raw" file writer for the solved trajectory
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`netlist`] - Parser for SPICE netlist text
//! - [`circuit`] - Node/branch model, unknown layout and validation
//! - [`expr`] - Expression trees the device laws are written in
//! - [`components`] - Device equation library (R, C, L, sources, controlled
//!   and behavioral sources)
//! - [`equations`] - Equation synthesis into a square [`EquationSet`]
//! - [`solver`] - Root finding, analysis strategies and result sinks
//! - [`output`] - Raw file serialization
//!
//! ## Usage
//!
//! ```no_run
//! use nodalsim_core::{netlist, output::RawWriter, Simulator};
//!
//! let netlist = netlist::parse("V1 in 0 5\nR1 in out 1k\nR2 out 0 1k\n.op\n")?;
//! let trajectory = Simulator::new(&netlist.circuit, netlist.analysis.clone()).run()?;
//! RawWriter::new(&netlist.title, "today")
//!     .write_to_path(&trajectory, &netlist.analysis, "divider.raw".as_ref())?;
//! # Ok::<(), nodalsim_core::SimError>(())
//! ```
//!
//! ## Unknown Vector
//!
//! For a circuit with `N` non-reference nodes and `B` branches the unknown
//! vector has `N + B` entries: node voltages in first-appearance order,
//! then one current per branch in branch-index order. Every branch carries
//! a current unknown, including resistors.
//!
//! ## Transient Discretization
//!
//! Reactive elements use the backward-difference companion laws
//!
//! ```text
//! capacitor:  i * dt - C * (v - v_prev) = 0
//! inductor:   v * dt - L * (i - i_prev) = 0
//! ```
//!
//! where `dt` is the distance to the previously accepted point.

pub mod circuit;
pub mod components;
pub mod equations;
pub mod error;
pub mod expr;
pub mod netlist;
pub mod output;
pub mod solver;

// Re-export main types for convenience
pub use circuit::Circuit;
pub use equations::EquationSet;
pub use error::{Result, SimError};
pub use solver::{Analysis, Simulator, SolverConfig, Trajectory, TransientParams};
