//! Structured syntax errors.
//!
//! Every error carries the exact position of the offending token.  Parsing
//! stops at the first error; there is no recovery and no partial tree.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::location::{MAX_SOURCE_LEN, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Dedent to a width that matches no enclosing block, or rejected
    /// tab/space mixing.
    IndentationError,
    /// EOF or a bare line terminator before the closing quote.
    UnterminatedStringError,
    /// EOF while a `(`, `[` or `{` is still open.
    UnterminatedBracketError,
    /// The parser expected one of a specific token set.
    UnexpectedTokenError,
    /// A recognised escape (`\x`, `\u`, `\U`, `\N`) with a malformed body.
    InvalidEscapeSequenceError,
    /// Source longer than [`MAX_SOURCE_LEN`] bytes.
    SourceTooLargeError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::IndentationError => "IndentationError",
            ErrorKind::UnterminatedStringError => "UnterminatedStringError",
            ErrorKind::UnterminatedBracketError => "UnterminatedBracketError",
            ErrorKind::UnexpectedTokenError => "UnexpectedTokenError",
            ErrorKind::InvalidEscapeSequenceError => "InvalidEscapeSequenceError",
            ErrorKind::SourceTooLargeError => "SourceTooLargeError",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{line}:{column}: {kind}: {message}")]
pub struct SyntaxError {
    pub kind: ErrorKind,
    pub message: String,
    pub line: u32,
    pub column: u32,
    /// Byte offset of the offending token.
    pub offset: u32,
    pub offending_token_text: String,
    /// Token descriptions the parser would have accepted; empty for
    /// scanner errors.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expected: Vec<&'static str>,
}

impl SyntaxError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Span, text: &str) -> Self {
        Self {
            kind,
            message: message.into(),
            line: span.line,
            column: span.column,
            offset: span.start,
            offending_token_text: text.to_string(),
            expected: Vec::new(),
        }
    }

    pub fn unexpected(expected: &[&'static str], span: Span, found: &str) -> Self {
        let shown = if found.is_empty() { "end of input" } else { found };
        let message = match expected {
            [] => format!("unexpected `{shown}`"),
            [one] => format!("expected {one}, found `{shown}`"),
            many => format!("expected one of {}, found `{shown}`", many.join(", ")),
        };
        Self {
            expected: expected.to_vec(),
            ..Self::new(ErrorKind::UnexpectedTokenError, message, span, found)
        }
    }

    /// Input whose byte offsets would not fit in a [`Span`].
    pub fn source_too_large(len: usize) -> Self {
        Self::new(
            ErrorKind::SourceTooLargeError,
            format!("source is {len} bytes; at most {MAX_SOURCE_LEN} bytes are supported"),
            Span {
                start: 0,
                end: 0,
                line: 1,
                column: 1,
            },
            "",
        )
    }
}

/// Result of a cancellable parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    /// The caller's cancellation flag was observed between statements.
    #[error("parse cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span { start: 4, end: 5, line: 2, column: 3 }
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::IndentationError.to_string(), "IndentationError");
        assert_eq!(
            ErrorKind::InvalidEscapeSequenceError.to_string(),
            "InvalidEscapeSequenceError"
        );
    }

    #[test]
    fn test_unexpected_message_lists_expected_set() {
        let e = SyntaxError::unexpected(&["`)`", "`,`"], span(), "x");
        assert_eq!(e.kind, ErrorKind::UnexpectedTokenError);
        assert_eq!(e.message, "expected one of `)`, `,`, found `x`");
        assert_eq!(e.to_string(), "2:3: UnexpectedTokenError: expected one of `)`, `,`, found `x`");
        assert_eq!(e.offending_token_text, "x");
    }

    #[test]
    fn test_unexpected_at_eof() {
        let e = SyntaxError::unexpected(&["`:`"], span(), "");
        assert_eq!(e.message, "expected `:`, found `end of input`");
    }

    #[test]
    fn test_parse_error_wraps_syntax_error() {
        let e: ParseError = SyntaxError::unexpected(&[], span(), "?").into();
        assert!(matches!(e, ParseError::Syntax(_)));
        assert_eq!(ParseError::Cancelled.to_string(), "parse cancelled");
    }
}
