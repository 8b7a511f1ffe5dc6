//! SPICE netlist reader.
//!
//! A line-oriented subset of the SPICE input language. Each line is a
//! comment, a directive or an element card; a line starting with `+`
//! continues the previous one.
//!
//! # Grammar Overview
//!
//! ```text
//! netlist   = { line }
//! line      = comment | directive | card | empty
//! comment   = '*' { any_char }            (first thing on the line)
//!           | ('#' | ';') { any_char }    (anywhere)
//! directive = '.title' text | '.op' | '.tran' tran_args
//!           | '.options' ... | '.control' | '.endc' | '.end'
//! tran_args = tstep tstop [tstart [tmax]] ['uic']
//! card      = name node node { argument }
//! node      = identifier | number          ('gnd' is the reference node '0')
//! value     = ['-'] number [scale_suffix] [unit_letters]
//! ```
//!
//! # Element Cards
//!
//! | Type | Syntax |
//! |------|--------|
//! | R | `R<name> <n+> <n-> <value>` |
//! | C | `C<name> <n+> <n-> <value> [ic=<v>]` |
//! | L | `L<name> <n+> <n-> <value> [ic=<i>]` |
//! | V, I | `<name> <n+> <n-> [dc] <value>` |
//! | | `<name> <n+> <n-> PULSE(v1 v2 [td [tr [tf [pw [per]]]]])` |
//! | | `<name> <n+> <n-> SIN(vo va freq [td [theta [phase]]])` |
//! | | `<name> <n+> <n-> [dc <value>] external` |
//! | E, G | `<name> <n+> <n-> <nc+> <nc-> <gain>` |
//! | H, F | `<name> <n+> <n-> <ctrl+> [<ctrl->] <gain>` |
//! | B | `B<name> <n+> <n-> i=<expr>` or `v=<expr>` |
//!
//! Controlling elements of `H`/`F` are given by element name or by branch
//! index. Branch indices follow card order, starting at 0.
//!
//! # Example
//!
//! ```text
//! .title RC step
//! V1 in 0 PULSE(0 1 0 0 0 1m)
//! R1 in out 1k
//! C1 out 0 1u ic=0
//! .tran 10u 2m uic
//! .end
//! ```

mod ast;
mod expression;
mod lexer;
mod parser;

pub use ast::{Card, Netlist, DEFAULT_TITLE};
pub use expression::ExprParser;
pub use lexer::{parse_value, Lexer, Token, TokenKind};
pub use parser::Parser;

use crate::error::{Result, SimError};

/// Parse netlist text.
pub fn parse(input: &str) -> Result<Netlist> {
    Parser::new(input).parse()
}

/// Parse a netlist file.
pub fn parse_file(path: &std::path::Path) -> Result<Netlist> {
    let content = std::fs::read_to_string(path).map_err(|e| SimError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse(&content)
}
