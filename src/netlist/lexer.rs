//! Lexer (tokenizer) for SPICE netlists.

use crate::error::{Result, SimError};

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The token's text
    pub text: String,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

impl Token {
    /// True for an operator token with the given symbol.
    pub fn is_op(&self, op: char) -> bool {
        matches!(self.kind, TokenKind::Operator(c) if c == op)
    }

    /// True for an identifier matching `word` case-insensitively.
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text.eq_ignore_ascii_case(word)
    }
}

/// Token types in a netlist.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Element name, node name, keyword or function name
    Identifier,
    /// A number, possibly with a scale suffix and unit letters
    Number,
    /// A directive (starts with '.')
    Directive,
    /// Open parenthesis '('
    OpenParen,
    /// Close parenthesis ')'
    CloseParen,
    /// Equals sign '='
    Equals,
    Comma,
    /// One of `+ - * / ^`
    Operator(char),
    /// Newline
    Newline,
    /// End of file
    Eof,
}

/// Lexer for tokenizing netlist input.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    line: usize,
    column: usize,
    /// No token has been produced on the current line yet
    at_line_start: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            line: 1,
            column: 1,
            at_line_start: true,
        }
    }

    /// Tokenize the whole input, ending with a single `Eof` token.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();

        let ch = match self.chars.peek() {
            Some(&(_, ch)) => ch,
            None => {
                return Ok(Token {
                    kind: TokenKind::Eof,
                    text: String::new(),
                    line: self.line,
                    column: self.column,
                });
            }
        };

        let start_column = self.column;
        let start_line = self.line;
        let token = |kind: TokenKind, text: String| Token {
            kind,
            text,
            line: start_line,
            column: start_column,
        };

        let tok = match ch {
            '\n' => {
                self.advance();
                token(TokenKind::Newline, "\n".to_string())
            }
            '.' if self.at_line_start => {
                self.advance();
                let text = self.read_identifier();
                token(TokenKind::Directive, format!(".{}", text))
            }
            '(' => {
                self.advance();
                token(TokenKind::OpenParen, "(".to_string())
            }
            ')' => {
                self.advance();
                token(TokenKind::CloseParen, ")".to_string())
            }
            '=' => {
                self.advance();
                token(TokenKind::Equals, "=".to_string())
            }
            ',' => {
                self.advance();
                token(TokenKind::Comma, ",".to_string())
            }
            '+' | '-' | '*' | '/' | '^' => {
                self.advance();
                token(TokenKind::Operator(ch), ch.to_string())
            }
            '0'..='9' | '.' => token(TokenKind::Number, self.read_number()),
            _ if ch.is_alphabetic() || ch == '_' => token(TokenKind::Identifier, self.read_identifier()),
            _ => {
                return Err(SimError::lexer(
                    start_line,
                    start_column,
                    format!("unexpected character '{}'", ch),
                ));
            }
        };

        self.at_line_start = tok.kind == TokenKind::Newline;
        Ok(tok)
    }

    fn advance(&mut self) -> Option<char> {
        let (_, ch) = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_to_end_of_line(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch == ' ' || ch == '\t' || ch == '\r' {
                self.advance();
            } else if ch == '#' || ch == ';' || (ch == '*' && self.at_line_start) {
                // '*' only opens a comment as the first thing on a line
                self.skip_to_end_of_line();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut text = String::new();
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        text
    }

    fn read_digits(&mut self, text: &mut String) {
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> String {
        let mut text = String::new();

        // Integer part
        self.read_digits(&mut text);

        // Decimal part
        if let Some(&(_, '.')) = self.chars.peek() {
            text.push('.');
            self.advance();
            self.read_digits(&mut text);
        }

        // Exponent part, only when digits follow
        if let Some(&(_, ch)) = self.chars.peek() {
            if ch == 'e' || ch == 'E' {
                let mut lookahead = self.chars.clone();
                lookahead.next();
                let next = lookahead.next().map(|(_, c)| c);
                let after_sign = lookahead.next().map(|(_, c)| c);
                let is_exponent = match next {
                    Some(c) if c.is_ascii_digit() => true,
                    Some('+') | Some('-') => after_sign.is_some_and(|c| c.is_ascii_digit()),
                    _ => false,
                };
                if is_exponent {
                    text.push(ch);
                    self.advance();
                    if let Some(&(_, sign)) = self.chars.peek() {
                        if sign == '-' || sign == '+' {
                            text.push(sign);
                            self.advance();
                        }
                    }
                    self.read_digits(&mut text);
                }
            }
        }

        // Scale suffix and unit letters (10k, 1meg, 5V, 100nF)
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        text
    }
}

/// Parse a number with an optional SPICE scale suffix.
///
/// Suffixes are case-insensitive: `f p n u m k meg g t` (and `mil`).
/// Letters after the suffix are treated as units and ignored.
pub fn parse_value(text: &str) -> Option<f64> {
    let text = text.trim();
    let split = text
        .char_indices()
        .find(|&(i, c)| {
            c.is_alphabetic()
                && !((c == 'e' || c == 'E')
                    && text[i + 1..]
                        .trim_start_matches(['+', '-'])
                        .starts_with(|d: char| d.is_ascii_digit()))
        })
        .map_or(text.len(), |(i, _)| i);

    let (num_str, suffix) = text.split_at(split);
    let base = num_str.parse::<f64>().ok()?;

    let suffix = suffix.to_ascii_lowercase();
    let multiplier = if suffix.starts_with("meg") {
        1e6
    } else if suffix.starts_with("mil") {
        25.4e-6
    } else {
        match suffix.chars().next() {
            Some('f') => 1e-15,
            Some('p') => 1e-12,
            Some('n') => 1e-9,
            Some('u') | Some('µ') => 1e-6,
            Some('m') => 1e-3,
            Some('k') => 1e3,
            Some('g') => 1e9,
            Some('t') => 1e12,
            _ => 1.0,
        }
    };

    Some(base * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_parse_value() {
        assert_relative_eq!(parse_value("10k").unwrap(), 10_000.0, max_relative = 1e-12);
        assert_relative_eq!(parse_value("100n").unwrap(), 100e-9, max_relative = 1e-12);
        assert_relative_eq!(parse_value("4.7u").unwrap(), 4.7e-6, max_relative = 1e-12);
        assert_relative_eq!(parse_value("1M").unwrap(), 1e-3, max_relative = 1e-12);
        assert_relative_eq!(parse_value("1Meg").unwrap(), 1e6, max_relative = 1e-12);
        assert_relative_eq!(parse_value("2.2").unwrap(), 2.2, max_relative = 1e-12);
        assert_relative_eq!(parse_value("1e-9").unwrap(), 1e-9, max_relative = 1e-12);
        assert_relative_eq!(parse_value("5V").unwrap(), 5.0, max_relative = 1e-12);
        assert_relative_eq!(parse_value("10pF").unwrap(), 10e-12, max_relative = 1e-12);
        assert_relative_eq!(parse_value("1.5e3k").unwrap(), 1.5e6, max_relative = 1e-12);
        assert!(parse_value("abc").is_none());
    }

    #[test]
    fn test_lexer_basic() {
        let mut lexer = Lexer::new("R1 in out 10k");

        let tok = lexer.next_token().unwrap();
        assert_eq!(tok.kind, TokenKind::Identifier);
        assert_eq!(tok.text, "R1");

        let tok = lexer.next_token().unwrap();
        assert_eq!(tok.kind, TokenKind::Identifier);
        assert_eq!(tok.text, "in");

        lexer.next_token().unwrap();
        let tok = lexer.next_token().unwrap();
        assert_eq!(tok.kind, TokenKind::Number);
        assert_eq!(tok.text, "10k");
    }

    #[test]
    fn test_star_comment_only_at_line_start() {
        assert_eq!(
            kinds("* comment\nB1 a 0 i=2*v(a)"),
            vec![
                TokenKind::Newline,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Number,
                TokenKind::Identifier,
                TokenKind::Equals,
                TokenKind::Number,
                TokenKind::Operator('*'),
                TokenKind::Identifier,
                TokenKind::OpenParen,
                TokenKind::Identifier,
                TokenKind::CloseParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lexer_directive() {
        let tok = Lexer::new(".tran 1u 1m uic").next_token().unwrap();
        assert_eq!(tok.kind, TokenKind::Directive);
        assert_eq!(tok.text, ".tran");
    }

    #[test]
    fn test_unexpected_character() {
        let err = Lexer::new("R1 a 0 1k\nR2 a @ 1k").tokenize().unwrap_err();
        assert!(matches!(err, SimError::LexerError { line: 2, column: 6, .. }));
    }
}
