//! Public entry points: parse a source string into a [`Node`] tree, or scan
//! it into tokens.
//!
//! Every call owns its own lexer and parser, so independent sources can be
//! parsed concurrently from different threads.

use std::sync::atomic::AtomicBool;

use serde::{Deserialize, Serialize};

use crate::ast::Node;
use crate::error::{ParseError, SyntaxError};
use crate::syntax::{Lexer, Parser, SpannedToken, Token};

/// What to do when one indentation run mixes tabs and spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixedIndentation {
    /// Expand tabs to the next multiple of `tab_width` and compare widths.
    #[default]
    Allow,
    /// Report an `IndentationError` for any line whose leading whitespace
    /// contains both tabs and spaces.
    Reject,
}

/// Scanner configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Column multiple a tab advances to when measuring indentation.
    pub tab_width: usize,
    pub mixed_indentation: MixedIndentation,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            tab_width: 8,
            mixed_indentation: MixedIndentation::Allow,
        }
    }
}

/// Parse with default options.
pub fn parse(source: &str) -> Result<Node<'_>, SyntaxError> {
    parse_with_options(source, &ParseOptions::default())
}

pub fn parse_with_options<'src>(source: &'src str, options: &ParseOptions) -> Result<Node<'src>, SyntaxError> {
    match Parser::new(source, options).parse_program() {
        Ok(tree) => Ok(tree),
        Err(ParseError::Syntax(e)) => Err(e),
        Err(ParseError::Cancelled) => unreachable!("parser without a cancellation flag was cancelled"),
    }
}

/// Parse, giving up with [`ParseError::Cancelled`] once `cancel` is set.
/// The flag is polled between statements; no partial tree is returned.
pub fn parse_with_cancel<'src>(
    source: &'src str,
    options: &ParseOptions,
    cancel: &AtomicBool,
) -> Result<Node<'src>, ParseError> {
    Parser::new(source, options).with_cancel(cancel).parse_program()
}

/// The full token stream, ending with (and including) [`Token::Eof`].
pub fn tokenize<'src>(source: &'src str, options: &ParseOptions) -> Result<Vec<SpannedToken<'src>>, SyntaxError> {
    let mut lexer = Lexer::new(source, options);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next_token()?;
        tokens.push(tok);
        if tok.token == Token::Eof {
            return Ok(tokens);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use super::*;
    use crate::ast::NodeKind;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_valid_python() {
        let tree = parse("import os\nx = 1\n").unwrap();
        assert_eq!(tree.kind, NodeKind::Program);
        assert_eq!(tree.children("statement_list").len(), 2);
    }

    #[test]
    fn test_parse_invalid_python_returns_first_error() {
        let err = parse("def foo(\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnterminatedBracketError);
        assert_eq!((err.line, err.column), (1, 8));
    }

    #[test]
    fn test_tokenize_ends_with_eof() {
        let tokens = tokenize("x = 1", &ParseOptions::default()).unwrap();
        let kinds: Vec<Token<'_>> = tokens.iter().map(|t| t.token).collect();
        assert_eq!(
            kinds,
            vec![Token::Name("x"), Token::Eq, Token::Int, Token::Newline, Token::Eof]
        );
    }

    #[test]
    fn test_options_deserialise_with_defaults() {
        let opts: ParseOptions = serde_json::from_str(r#"{"mixed_indentation":"reject"}"#).unwrap();
        assert_eq!(opts.tab_width, 8);
        assert_eq!(opts.mixed_indentation, MixedIndentation::Reject);
    }

    #[test]
    fn test_cancelled_is_distinct_from_syntax_error() {
        let flag = AtomicBool::new(true);
        let result = parse_with_cancel("x = (\n", &ParseOptions::default(), &flag);
        assert_eq!(result.unwrap_err(), ParseError::Cancelled);
    }
}
