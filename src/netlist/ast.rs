//! Intermediate and final representations of a parsed netlist.

use super::lexer::Token;
use crate::circuit::Circuit;
use crate::solver::Analysis;

/// Title used when the netlist has no `.title` line.
pub const DEFAULT_TITLE: &str = "My Circuit";

/// One element line, split off its name but not yet interpreted.
#[derive(Debug, Clone)]
pub struct Card {
    /// Element name; its first letter selects the element type
    pub name: String,
    /// Source line number for error reporting
    pub line: usize,
    /// Tokens after the name, up to the end of the line
    pub tokens: Vec<Token>,
}

impl Card {
    /// Element type letter, upper-cased.
    pub fn prefix(&self) -> char {
        self.name
            .chars()
            .next()
            .map_or(' ', |c| c.to_ascii_uppercase())
    }
}

/// A fully parsed netlist: the circuit plus the one requested analysis.
#[derive(Debug, Clone)]
pub struct Netlist {
    pub title: String,
    pub circuit: Circuit,
    pub analysis: Analysis,
}
