use std::fmt;

use crate::error::{ErrorKind, SyntaxError};

/// One syntax error, located in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: String,
    pub line: usize,
    pub col: usize,
    pub kind: ErrorKind,
    pub message: String,
    pub offending_text: String,
}

impl Diagnostic {
    pub fn from_syntax_error(file: &str, err: &SyntaxError) -> Self {
        Self {
            file: file.to_string(),
            line: err.line as usize,
            col: err.column as usize,
            kind: err.kind,
            message: err.message.clone(),
            offending_text: err.offending_token_text.clone(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {} {}",
            self.file, self.line, self.col, self.kind, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Span;

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic {
            file: "src/foo.py".to_string(),
            line: 12,
            col: 5,
            kind: ErrorKind::IndentationError,
            message: "unindent does not match any outer indentation level".to_string(),
            offending_text: String::new(),
        };
        assert_eq!(
            d.to_string(),
            "src/foo.py:12:5: IndentationError unindent does not match any outer indentation level"
        );
    }

    #[test]
    fn test_from_syntax_error_keeps_position() {
        let span = Span {
            start: 10,
            end: 11,
            line: 3,
            column: 7,
        };
        let err = SyntaxError::unexpected(&["`:`"], span, "x");
        let d = Diagnostic::from_syntax_error("a.py", &err);
        assert_eq!((d.line, d.col), (3, 7));
        assert_eq!(d.kind, ErrorKind::UnexpectedTokenError);
        assert_eq!(d.offending_text, "x");
        assert_eq!(d.message, "expected `:`, found `x`");
    }
}
