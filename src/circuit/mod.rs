//! Circuit representation and validation.
//!
//! This module provides the node/branch model consumed by equation
//! synthesis. The [`Circuit`] struct holds the ordered non-reference nodes
//! and the ordered, densely indexed branch list; [`Layout`] fixes how both
//! map onto the flat unknown vector.

mod graph;
mod layout;
mod types;
mod validate;

pub use graph::Circuit;
pub use layout::{Layout, Unknown};
pub use types::*;
pub use validate::validate_circuit;
