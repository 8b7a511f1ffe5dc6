//! Parser for SPICE netlists.
//!
//! Parsing runs in two passes over the tokenized lines. The first collects
//! element cards and directives and assigns every element its branch index
//! in card order; the second interprets each card, so current-controlled
//! sources and `i(...)` references may name elements declared further down.

use std::collections::HashMap;

use tracing::debug;

use super::ast::{Card, Netlist, DEFAULT_TITLE};
use super::expression::{node_name, ExprParser};
use super::lexer::{parse_value, Lexer, Token, TokenKind};
use crate::circuit::{
    BranchId, Circuit, ComponentKind, CurrentSense, Element, SourceValue, VoltageSense,
};
use crate::error::{Result, SimError};
use crate::expr::{Expr, Pulse, Sine};
use crate::solver::{Analysis, TransientParams};

/// Parser for SPICE netlist text.
pub struct Parser<'a> {
    source: &'a str,
}

/// Source text with `.title` lines blanked and everything after `.end` dropped.
struct Preprocessed {
    title: Option<String>,
    body: String,
}

impl<'a> Parser<'a> {
    /// Create a parser over netlist text.
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    /// Parse the entire netlist.
    pub fn parse(&self) -> Result<Netlist> {
        let pre = self.preprocess();
        let lines = split_lines(Lexer::new(&pre.body).tokenize()?)?;

        // Pass 1: cards, directives, branch numbering
        let mut cards = Vec::new();
        let mut analysis = None;
        for (line, tokens) in lines {
            let first = &tokens[0];
            match first.kind {
                TokenKind::Directive => parse_directive(line, &tokens, &mut analysis)?,
                TokenKind::Identifier => cards.push(Card {
                    name: first.text.clone(),
                    line,
                    tokens: tokens[1..].to_vec(),
                }),
                _ => {
                    return Err(SimError::parse(
                        line,
                        format!("unexpected token: {:?}", first.text),
                    ));
                }
            }
        }

        let mut branches: HashMap<String, BranchId> = HashMap::new();
        for (index, card) in cards.iter().enumerate() {
            let key = card.name.to_ascii_lowercase();
            if branches.insert(key, BranchId(index)).is_some() {
                return Err(SimError::invalid_component(
                    &card.name,
                    card.line,
                    "duplicate element name",
                ));
            }
        }

        let analysis = analysis.ok_or_else(|| {
            SimError::parse(
                self.source.lines().count(),
                "missing analysis directive (.op or .tran)",
            )
        })?;

        // Pass 2: elements
        let title = pre.title.unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let mut circuit = Circuit::with_title(title.clone());
        for card in &cards {
            let (plus, minus, element) = parse_card(card, &branches)?;
            circuit.add_branch(card.name.clone(), plus, minus, element);
        }

        debug!(
            title = %title,
            nodes = circuit.num_nodes(),
            branches = circuit.num_branches(),
            analysis = analysis.plot_name(),
            "parsed netlist"
        );

        Ok(Netlist {
            title,
            circuit,
            analysis,
        })
    }

    fn preprocess(&self) -> Preprocessed {
        let mut title = None;
        let mut body = String::with_capacity(self.source.len());
        for raw in self.source.lines() {
            let trimmed = raw.trim_start();
            let word = trimmed
                .split_whitespace()
                .next()
                .unwrap_or("")
                .to_ascii_lowercase();
            if word == ".end" {
                break;
            }
            if word == ".title" {
                title = Some(trimmed[".title".len()..].trim().to_string());
            } else {
                body.push_str(raw);
            }
            // Blank lines keep line numbers aligned with the source
            body.push('\n');
        }
        Preprocessed { title, body }
    }
}

/// Group tokens into non-empty lines, joining `+` continuation lines.
fn split_lines(tokens: Vec<Token>) -> Result<Vec<(usize, Vec<Token>)>> {
    let mut lines: Vec<(usize, Vec<Token>)> = Vec::new();
    let mut current: Vec<Token> = Vec::new();

    for tok in tokens {
        if !matches!(tok.kind, TokenKind::Newline | TokenKind::Eof) {
            current.push(tok);
            continue;
        }
        if current.is_empty() {
            continue;
        }
        let line_tokens = std::mem::take(&mut current);
        let line = line_tokens[0].line;
        if line_tokens[0].is_op('+') {
            match lines.last_mut() {
                Some((_, previous)) => previous.extend(line_tokens.into_iter().skip(1)),
                None => return Err(SimError::parse(line, "continuation line with nothing to continue")),
            }
        } else {
            lines.push((line, line_tokens));
        }
    }

    Ok(lines)
}

fn parse_directive(line: usize, tokens: &[Token], analysis: &mut Option<Analysis>) -> Result<()> {
    let directive = tokens[0].text.to_ascii_lowercase();
    let args = &tokens[1..];

    let parsed = match directive.as_str() {
        ".op" => {
            if let Some(extra) = args.first() {
                return Err(SimError::parse(
                    line,
                    format!("unexpected argument '{}' to .op", extra.text),
                ));
            }
            Analysis::OperatingPoint
        }
        ".tran" => Analysis::Transient(parse_tran(line, args)?),
        // Accepted for compatibility; they carry nothing the core uses
        ".options" | ".option" | ".control" | ".endc" | ".end" => return Ok(()),
        _ => {
            return Err(SimError::parse(
                line,
                format!("unknown directive '{}'", tokens[0].text),
            ));
        }
    };

    if analysis.is_some() {
        return Err(SimError::parse(line, "more than one analysis directive"));
    }
    *analysis = Some(parsed);
    Ok(())
}

/// `.tran tstep tstop [tstart [tmax]] [uic]`
fn parse_tran(line: usize, args: &[Token]) -> Result<TransientParams> {
    let mut values = Vec::new();
    let mut uic = false;
    let mut reader = TokenReader::new(args);
    while !reader.is_done() {
        if reader.peek().is_some_and(|t| t.is_word("uic")) {
            reader.pos += 1;
            uic = true;
            continue;
        }
        let value = reader
            .value()
            .map_err(|message| SimError::parse(line, format!(".tran: {}", message)))?;
        values.push(value);
    }

    if !(2..=4).contains(&values.len()) {
        return Err(SimError::parse(
            line,
            ".tran expects tstep tstop [tstart [tmax]] [uic]",
        ));
    }

    let mut params = TransientParams::new(values[0], values[1]).with_initial_conditions(uic);
    if let Some(&start) = values.get(2) {
        params = params.with_start(start);
    }
    if let Some(&max_step) = values.get(3) {
        params = params.with_max_step(max_step);
    }
    Ok(params)
}

fn parse_card(
    card: &Card,
    branches: &HashMap<String, BranchId>,
) -> Result<(String, String, Element)> {
    if ComponentKind::from_prefix(card.prefix()).is_none() {
        return Err(SimError::UnknownComponentType {
            component_type: card.prefix().to_string(),
            line: card.line,
        });
    }

    let invalid = |message: String| SimError::invalid_component(&card.name, card.line, message);
    let mut reader = TokenReader::new(&card.tokens);

    let plus = reader.node().map_err(&invalid)?;
    let minus = reader.node().map_err(&invalid)?;

    let element = match card.prefix() {
        'R' => Element::resistor(reader.value().map_err(&invalid)?),
        'C' | 'L' => {
            let value = reader.value().map_err(&invalid)?;
            let element = if card.prefix() == 'C' {
                Element::capacitor(value)
            } else {
                Element::inductor(value)
            };
            match reader.keyword_value("ic").map_err(&invalid)? {
                Some(ic) => element.with_initial_condition(ic),
                None => element,
            }
        }
        'V' => Element::voltage_source(reader.source_value().map_err(&invalid)?),
        'I' => Element::current_source(reader.source_value().map_err(&invalid)?),
        'E' | 'G' => {
            let sense = VoltageSense::new(
                reader.node().map_err(&invalid)?,
                reader.node().map_err(&invalid)?,
            );
            let gain = reader.value().map_err(&invalid)?;
            if card.prefix() == 'E' {
                Element::Vcvs { gain, sense }
            } else {
                Element::Vccs { gain, sense }
            }
        }
        'H' | 'F' => {
            let control_plus = reader.control(branches).map_err(&invalid)?;
            let sense = if reader.rest_is_single_value() {
                CurrentSense::single(control_plus)
            } else {
                CurrentSense::difference(control_plus, reader.control(branches).map_err(&invalid)?)
            };
            let gain = reader.value().map_err(&invalid)?;
            if card.prefix() == 'H' {
                Element::Ccvs { gain, sense }
            } else {
                Element::Cccs { gain, sense }
            }
        }
        'B' => {
            let kind = reader
                .next()
                .filter(|t| t.is_word("i") || t.is_word("v"))
                .ok_or_else(|| invalid("expected i=<expr> or v=<expr>".to_string()))?;
            let is_current = kind.is_word("i");
            reader.expect(TokenKind::Equals).map_err(&invalid)?;

            let lookup = |name: &str| branches.get(&name.to_ascii_lowercase()).copied();
            let expr = ExprParser::new(reader.rest(), card.line, lookup).parse()?;
            reader.pos = card.tokens.len();
            if is_current {
                Element::BehavioralCurrent { expr }
            } else {
                Element::BehavioralVoltage { expr }
            }
        }
        other => {
            return Err(SimError::UnknownComponentType {
                component_type: other.to_string(),
                line: card.line,
            });
        }
    };

    if let Some(extra) = reader.peek() {
        return Err(invalid(format!("unexpected '{}'", extra.text)));
    }
    Ok((plus, minus, element))
}

/// Cursor over the tokens of one line. Errors are plain messages; the
/// caller attaches the element name and line.
struct TokenReader<'t> {
    tokens: &'t [Token],
    pos: usize,
}

type ReadResult<T> = std::result::Result<T, String>;

impl<'t> TokenReader<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn is_done(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'t Token> {
        let tok = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(tok)
    }

    fn rest(&self) -> &'t [Token] {
        &self.tokens[self.pos.min(self.tokens.len())..]
    }

    fn expect(&mut self, kind: TokenKind) -> ReadResult<&'t Token> {
        match self.next() {
            Some(tok) if tok.kind == kind => Ok(tok),
            Some(tok) => Err(format!("expected {:?}, got '{}'", kind, tok.text)),
            None => Err(format!("expected {:?}, got end of line", kind)),
        }
    }

    fn node(&mut self) -> ReadResult<String> {
        match self.next() {
            Some(tok) if matches!(tok.kind, TokenKind::Identifier | TokenKind::Number) => {
                Ok(node_name(&tok.text))
            }
            Some(tok) => Err(format!("expected node name, got '{}'", tok.text)),
            None => Err("missing node".to_string()),
        }
    }

    /// A number with an optional leading sign.
    fn value(&mut self) -> ReadResult<f64> {
        let sign = match self.peek() {
            Some(t) if t.is_op('-') => {
                self.pos += 1;
                -1.0
            }
            Some(t) if t.is_op('+') => {
                self.pos += 1;
                1.0
            }
            _ => 1.0,
        };
        match self.next() {
            Some(tok) if tok.kind == TokenKind::Number => parse_value(&tok.text)
                .map(|v| sign * v)
                .ok_or_else(|| format!("invalid value '{}'", tok.text)),
            Some(tok) => Err(format!("expected value, got '{}'", tok.text)),
            None => Err("missing value".to_string()),
        }
    }

    /// Optional `keyword=value` pair.
    fn keyword_value(&mut self, keyword: &str) -> ReadResult<Option<f64>> {
        if !self.peek().is_some_and(|t| t.is_word(keyword)) {
            return Ok(None);
        }
        self.pos += 1;
        self.expect(TokenKind::Equals)?;
        self.value().map(Some)
    }

    /// True if the remaining tokens form exactly one (signed) value.
    fn rest_is_single_value(&self) -> bool {
        match self.rest() {
            [tok] => tok.kind == TokenKind::Number,
            [sign, tok] => (sign.is_op('-') || sign.is_op('+')) && tok.kind == TokenKind::Number,
            _ => false,
        }
    }

    /// Controlling element, by name or by branch index.
    fn control(&mut self, branches: &HashMap<String, BranchId>) -> ReadResult<BranchId> {
        match self.next() {
            Some(tok) if tok.kind == TokenKind::Number => tok
                .text
                .parse::<usize>()
                .map(BranchId)
                .map_err(|_| format!("invalid branch index '{}'", tok.text)),
            Some(tok) if tok.kind == TokenKind::Identifier => branches
                .get(&tok.text.to_ascii_lowercase())
                .copied()
                .ok_or_else(|| format!("unknown controlling element '{}'", tok.text)),
            Some(tok) => Err(format!("expected controlling element, got '{}'", tok.text)),
            None => Err("missing controlling element".to_string()),
        }
    }

    /// Parenthesized list of values; commas are optional separators.
    fn value_list(&mut self) -> ReadResult<Vec<f64>> {
        self.expect(TokenKind::OpenParen)?;
        let mut values = Vec::new();
        loop {
            match self.peek() {
                Some(t) if t.kind == TokenKind::CloseParen => {
                    self.pos += 1;
                    return Ok(values);
                }
                Some(t) if t.kind == TokenKind::Comma => self.pos += 1,
                Some(_) => values.push(self.value()?),
                None => return Err("missing ')'".to_string()),
            }
        }
    }

    /// `[dc] value`, `PULSE(...)`, `SIN(...)` or `[dc value] external`.
    fn source_value(&mut self) -> ReadResult<SourceValue> {
        let Some(tok) = self.peek() else {
            return Err("missing source value".to_string());
        };

        if tok.is_word("pulse") {
            self.pos += 1;
            let args = self.value_list()?;
            if !(2..=7).contains(&args.len()) {
                return Err("PULSE expects v1 v2 [td [tr [tf [pw [per]]]]]".to_string());
            }
            let arg = |i: usize, default: f64| args.get(i).copied().unwrap_or(default);
            let pulse = Pulse::new(
                args[0],
                args[1],
                arg(2, 0.0),
                arg(3, 0.0),
                arg(4, 0.0),
                arg(5, f64::INFINITY),
                arg(6, 0.0),
            );
            return Ok(SourceValue::Expr(Expr::Pulse(pulse)));
        }

        if tok.is_word("sin") {
            self.pos += 1;
            let args = self.value_list()?;
            if !(3..=6).contains(&args.len()) {
                return Err("SIN expects vo va freq [td [theta [phase]]]".to_string());
            }
            let mut sine = Sine::new(args[0], args[1], args[2]);
            sine.delay = args.get(3).copied().unwrap_or(0.0);
            sine.damping = args.get(4).copied().unwrap_or(0.0);
            sine.phase = args.get(5).copied().unwrap_or(0.0);
            return Ok(SourceValue::Expr(Expr::Sine(sine)));
        }

        if tok.is_word("external") {
            self.pos += 1;
            return Ok(SourceValue::External);
        }

        if tok.is_word("dc") {
            self.pos += 1;
        }
        let value = self.value()?;
        if self.peek().is_some_and(|t| t.is_word("external")) {
            self.pos += 1;
            return Ok(SourceValue::External);
        }
        Ok(SourceValue::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn parse(text: &str) -> Result<Netlist> {
        Parser::new(text).parse()
    }

    #[test]
    fn test_divider_with_op() {
        let netlist = parse(
            "* voltage divider\n\
             .title Divider test\n\
             V1 in 0 dc 10\n\
             R1 in out 1k\n\
             R2 out gnd 1k ; lower leg\n\
             .op\n\
             .end\n",
        )
        .unwrap();

        assert_eq!(netlist.title, "Divider test");
        assert_eq!(netlist.analysis, Analysis::OperatingPoint);
        assert_eq!(netlist.circuit.nodes, vec!["in", "out"]);
        assert_eq!(netlist.circuit.branches[2].minus, "0");
        assert_eq!(
            netlist.circuit.branches[0].element,
            Element::voltage_source(10.0)
        );
    }

    #[test]
    fn test_default_title_and_ignored_directives() {
        let netlist = parse(
            "R1 1 0 1k\nV1 1 0 5\n.options reltol=1e-3\n.control\n.tran 1u 10u 0 2u uic\n.endc\n.end\nthis line is ignored @@\n",
        )
        .unwrap();
        assert_eq!(netlist.title, DEFAULT_TITLE);
        let Analysis::Transient(params) = netlist.analysis else {
            panic!("expected transient analysis");
        };
        assert_relative_eq!(params.step, 1e-6);
        assert_relative_eq!(params.stop, 10e-6, max_relative = 1e-12);
        assert_eq!(params.start, 0.0);
        assert_eq!(params.max_step, Some(2e-6));
        assert!(params.use_initial_conditions);
    }

    #[test]
    fn test_reactive_initial_conditions() {
        let netlist = parse("C1 a 0 1u ic=2.5\nL1 a 0 10m IC=-1m\nR1 a 0 1\n.tran 1u 1m\n").unwrap();
        let branches = &netlist.circuit.branches;
        assert_eq!(branches[0].element.initial_condition(), Some(2.5));
        assert_relative_eq!(branches[1].element.initial_condition().unwrap(), -1e-3);
        assert_eq!(branches[2].element.initial_condition(), None);
    }

    #[test]
    fn test_source_forms() {
        let netlist = parse(
            "V1 a 0 PULSE(0 5 1u 1n 1n 5u 10u)\n\
             V2 b 0 SIN(0, 1, 1k)\n\
             V3 c 0 dc 0 external\n\
             I1 d 0 external\n\
             I2 d 0 -2m\n\
             R1 a b 1\nR2 c d 1\nR3 b 0 1\n\
             .tran 1u 20u\n",
        )
        .unwrap();
        let b = &netlist.circuit.branches;
        match &b[0].element {
            Element::VoltageSource {
                value: SourceValue::Expr(Expr::Pulse(p)),
            } => {
                assert_eq!(p.v2, 5.0);
                assert_relative_eq!(p.period, 10e-6, max_relative = 1e-12);
            }
            other => panic!("unexpected element {:?}", other),
        }
        assert!(matches!(
            &b[1].element,
            Element::VoltageSource { value: SourceValue::Expr(Expr::Sine(s)) } if s.frequency == 1e3
        ));
        assert!(b[2].element.is_external());
        assert!(b[3].element.is_external());
        assert_eq!(b[4].element, Element::current_source(-2e-3));
    }

    #[test]
    fn test_controlled_sources_resolve_forward_references() {
        let netlist = parse(
            "E1 out 0 in 0 2\n\
             G1 out 0 in 0 1m\n\
             H1 x 0 Vsense -10\n\
             F1 y 0 Vsense R1 0.5\n\
             F2 y 0 5 3\n\
             Vsense in 0 1\n\
             R1 out x 1\n\
             R2 y 0 1\n\
             .op\n",
        )
        .unwrap();
        let b = &netlist.circuit.branches;
        assert_eq!(
            b[0].element,
            Element::Vcvs {
                gain: 2.0,
                sense: VoltageSense::new("in", "0")
            }
        );
        assert_eq!(b[1].kind(), ComponentKind::Vccs);
        assert_eq!(
            b[2].element,
            Element::Ccvs {
                gain: -10.0,
                sense: CurrentSense::single(BranchId(5))
            }
        );
        assert_eq!(
            b[3].element,
            Element::Cccs {
                gain: 0.5,
                sense: CurrentSense::difference(BranchId(5), BranchId(6))
            }
        );
        assert_eq!(
            b[4].element,
            Element::Cccs {
                gain: 3.0,
                sense: CurrentSense::single(BranchId(5))
            }
        );
    }

    #[test]
    fn test_behavioral_sources() {
        let netlist = parse(
            "B1 out 0 i=v(in)*2 + i(R1)\nB2 in 0 v=sin(2*pi*time)\nR1 in out 1\n.op\n",
        )
        .unwrap();
        let b = &netlist.circuit.branches;
        assert_eq!(
            b[0].element,
            Element::BehavioralCurrent {
                expr: Expr::voltage("in") * Expr::Const(2.0) + Expr::current(BranchId(2))
            }
        );
        assert_eq!(b[1].kind(), ComponentKind::BehavioralVoltageSource);
    }

    #[test]
    fn test_continuation_line() {
        let netlist = parse("V1 a 0 PULSE(0 5\n+ 1u 1u 1u 1u 4u)\nR1 a 0 1\n.tran 1u 8u\n").unwrap();
        assert!(matches!(
            &netlist.circuit.branches[0].element,
            Element::VoltageSource { value: SourceValue::Expr(Expr::Pulse(p)) } if p.period == 4e-6
        ));
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        assert!(matches!(
            parse("R1 a 0 1k\nQ1 a b c\n.op\n"),
            Err(SimError::UnknownComponentType { line: 2, .. })
        ));
        assert!(matches!(
            parse("R1 a 0\n.op\n"),
            Err(SimError::InvalidComponent { line: 1, .. })
        ));
        assert!(matches!(
            parse("R1 a 0 1k 2k\n.op\n"),
            Err(SimError::InvalidComponent { line: 1, .. })
        ));
        assert!(matches!(
            parse("R1 a 0 1k\nR1 a 0 2k\n.op\n"),
            Err(SimError::InvalidComponent { line: 2, .. })
        ));
        assert!(matches!(
            parse("R1 a 0 1k\n.op\n.tran 1u 1m\n"),
            Err(SimError::ParseError { line: 3, .. })
        ));
        assert!(matches!(parse("R1 a 0 1k\n"), Err(SimError::ParseError { .. })));
        assert!(matches!(
            parse("R1 a 0 1k\n.ac dec 10 1 1k\n"),
            Err(SimError::ParseError { line: 2, .. })
        ));
        assert!(matches!(
            parse("H1 a 0 Vmissing 2\nR1 a 0 1\n.op\n"),
            Err(SimError::InvalidComponent { line: 1, .. })
        ));
    }
}
