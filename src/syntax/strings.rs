//! String literal scanning.
//!
//! A literal is emitted as a token sequence rather than one opaque token:
//!
//! ```text
//! f"a{x!r:>{w}}\n"
//! StringStart  StringContent  InterpolationOpen  Name  TypeConversion  Colon
//! StringContent  InterpolationOpen  Name  InterpolationClose
//! InterpolationClose  EscapeSequence  StringEnd
//! ```
//!
//! The body is scanned in [`Mode::String`]; an interpolation pushes a
//! [`Mode::Interpolation`] frame so the expression inside is tokenised by the
//! ordinary scanner (nested strings included) until its closing `}`.

use crate::chars::is_line_terminator;
use crate::error::{ErrorKind, SyntaxError};
use crate::location::Span;

use super::lexer::{Lexer, Mark, Mode, SpannedToken, Token};

/// Scan state of one open string literal.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StringFrame {
    quote: u8,
    triple: bool,
    raw: bool,
    bytes: bool,
    format: bool,
    /// Span of the prefix and opening quote(s).
    open: Span,
}

impl<'src> Lexer<'src> {
    // ── String literal detection ──────────────────────────────────────────────

    /// Length of the string prefix at the cursor if a string literal starts
    /// here: `r u b f` alone or `rb br rf fr`, in any case.
    pub(super) fn string_prefix_len(&self) -> Option<usize> {
        let rest = &self.src.as_bytes()[self.pos..];
        let prefix = rest.iter().take_while(|b| b.is_ascii_alphabetic()).count();
        if prefix > 2 || !matches!(rest.get(prefix), Some(b'\'' | b'"')) {
            return None;
        }
        let lower: Vec<u8> = rest[..prefix].iter().map(u8::to_ascii_lowercase).collect();
        let valid = matches!(
            lower.as_slice(),
            [] | [b'r' | b'u' | b'b' | b'f'] | [b'r', b'b'] | [b'b', b'r'] | [b'r', b'f'] | [b'f', b'r']
        );
        valid.then_some(prefix)
    }

    pub(super) fn lex_string_start(&mut self, prefix_len: usize, mark: Mark) -> SpannedToken<'src> {
        let prefix = self.src.as_bytes()[self.pos..self.pos + prefix_len].to_ascii_lowercase();
        let quote = self.src.as_bytes()[self.pos + prefix_len];
        let triple = self.byte_at(prefix_len + 1) == Some(quote)
            && self.byte_at(prefix_len + 2) == Some(quote);
        self.advance(prefix_len + if triple { 3 } else { 1 });

        let frame = StringFrame {
            quote,
            triple,
            raw: prefix.contains(&b'r'),
            bytes: prefix.contains(&b'b'),
            format: prefix.contains(&b'f'),
            open: self.span(mark),
        };
        self.modes.push(Mode::String(frame));
        self.token(Token::StringStart, mark)
    }

    // ── String body ───────────────────────────────────────────────────────────

    /// Next token of a string body: content, an escape sequence, an
    /// interpolation opener or the closing quote.
    pub(super) fn lex_string_part(&mut self, frame: StringFrame) -> Result<SpannedToken<'src>, SyntaxError> {
        let mark = self.mark();
        let Some(c) = self.cur() else {
            return Err(self.unterminated(frame));
        };

        if self.at_closing_quote(&frame) {
            self.advance(if frame.triple { 3 } else { 1 });
            self.modes.pop();
            return Ok(self.token(Token::StringEnd, mark));
        }
        if c == '\\' && !frame.raw {
            if let Some(len) = self.escape_len(&frame)? {
                self.advance(len);
                return Ok(self.token(Token::EscapeSequence, mark));
            }
        }
        if frame.format && c == '{' && self.byte_at(1) != Some(b'{') {
            self.bump();
            self.modes.push(Mode::Interpolation {
                depth: self.brackets.len(),
                format_spec: false,
            });
            return Ok(self.token(Token::InterpolationOpen, mark));
        }
        if frame.format && c == '}' && self.byte_at(1) != Some(b'}') {
            self.bump();
            return Err(self.error(
                ErrorKind::UnexpectedTokenError,
                "single `}` is not allowed in a format string",
                mark,
            ));
        }

        while let Some(c) = self.cur() {
            if self.at_closing_quote(&frame) {
                break;
            }
            match c {
                '\n' | '\r' if !frame.triple => return Err(self.unterminated(frame)),
                '\\' => {
                    if !frame.raw && self.escape_len(&frame)?.is_some() {
                        break;
                    }
                    // Unknown escape, or any backslash in a raw string: the
                    // backslash and the character after it are content.  A
                    // brace after it keeps its format-string meaning.
                    self.bump();
                    match self.cur() {
                        Some(next) if is_line_terminator(next) => self.bump_line_terminator(),
                        Some('{' | '}') if frame.format => {}
                        Some(_) => {
                            self.bump();
                        }
                        None => {}
                    }
                }
                '{' | '}' if frame.format => {
                    if self.byte_at(1) != Some(c as u8) {
                        break;
                    }
                    self.advance(2);
                }
                _ => {
                    self.bump();
                }
            }
        }
        Ok(self.token(Token::StringContent, mark))
    }

    /// Literal text of a format specifier, a nested `{`, or the `}` that
    /// closes the interpolation.
    pub(super) fn lex_format_spec(&mut self) -> Result<SpannedToken<'src>, SyntaxError> {
        let Some(frame) = self.innermost_string() else {
            unreachable!("interpolation frame without an enclosing string");
        };
        let mark = self.mark();
        match self.cur() {
            None => return Err(self.unterminated(frame)),
            Some('{') => {
                self.bump();
                self.modes.push(Mode::Interpolation {
                    depth: self.brackets.len(),
                    format_spec: false,
                });
                return Ok(self.token(Token::InterpolationOpen, mark));
            }
            Some('}') => {
                self.bump();
                self.modes.pop();
                return Ok(self.token(Token::InterpolationClose, mark));
            }
            _ => {}
        }

        while let Some(c) = self.cur() {
            if c == '{' || c == '}' {
                break;
            }
            if self.at_closing_quote(&frame) {
                if self.pos == mark.pos {
                    return Err(SyntaxError::unexpected(
                        &["`}`"],
                        self.span(mark),
                        &self.src[self.pos..self.pos + 1],
                    ));
                }
                break;
            }
            if is_line_terminator(c) && !frame.triple {
                return Err(self.unterminated(frame));
            }
            self.bump();
        }
        Ok(self.token(Token::StringContent, mark))
    }

    // ── helpers ───────────────────────────────────────────────────────────────

    fn at_closing_quote(&self, frame: &StringFrame) -> bool {
        let q = Some(frame.quote);
        self.byte_at(0) == q && (!frame.triple || (self.byte_at(1) == q && self.byte_at(2) == q))
    }

    pub(super) fn innermost_string(&self) -> Option<StringFrame> {
        self.modes.iter().rev().find_map(|mode| match mode {
            Mode::String(frame) => Some(*frame),
            Mode::Interpolation { .. } => None,
        })
    }

    pub(super) fn unterminated(&self, frame: StringFrame) -> SyntaxError {
        let message = if frame.triple {
            "unterminated triple-quoted string literal"
        } else {
            "unterminated string literal"
        };
        SyntaxError::new(
            ErrorKind::UnterminatedStringError,
            message,
            frame.open,
            frame.open.text(self.src),
        )
    }

    /// Byte length of the escape sequence starting at the backslash under
    /// the cursor, `None` for a backslash that does not start one.
    fn escape_len(&self, frame: &StringFrame) -> Result<Option<usize>, SyntaxError> {
        let rest = &self.src.as_bytes()[self.pos + 1..];
        let Some(&c) = rest.first() else {
            return Ok(None);
        };
        match c {
            b'\n' => Ok(Some(2)),
            b'\r' => Ok(Some(if rest.get(1) == Some(&b'\n') { 3 } else { 2 })),
            b'\\' | b'\'' | b'"' | b'a' | b'b' | b'f' | b'n' | b'r' | b't' | b'v' => Ok(Some(2)),
            b'0'..=b'7' => {
                let digits = rest.iter().take(3).take_while(|b| (b'0'..=b'7').contains(*b)).count();
                Ok(Some(1 + digits))
            }
            b'x' => self.hex_escape(rest, 2),
            b'u' if !frame.bytes => self.hex_escape(rest, 4),
            b'U' if !frame.bytes => self.hex_escape(rest, 8),
            b'N' if !frame.bytes => {
                let name = rest
                    .iter()
                    .skip(2)
                    .take_while(|b| b.is_ascii_alphanumeric() || **b == b' ' || **b == b'-')
                    .count();
                if rest.get(1) == Some(&b'{') && name > 0 && rest.get(2 + name) == Some(&b'}') {
                    Ok(Some(name + 4))
                } else {
                    let seen = if rest.get(1) == Some(&b'{') { 3 + name } else { 2 };
                    Err(self.invalid_escape(seen, "malformed \\N character escape"))
                }
            }
            _ => Ok(None),
        }
    }

    /// `\x`, `\u` or `\U` followed by exactly `digits` hex digits.
    fn hex_escape(&self, rest: &[u8], digits: usize) -> Result<Option<usize>, SyntaxError> {
        let found = rest
            .iter()
            .skip(1)
            .take(digits)
            .take_while(|b| b.is_ascii_hexdigit())
            .count();
        if found == digits {
            Ok(Some(digits + 2))
        } else {
            let message = format!(
                "truncated \\{}{} escape",
                rest[0] as char,
                "X".repeat(digits)
            );
            Err(self.invalid_escape(found + 2, message))
        }
    }

    fn invalid_escape(&self, len: usize, message: impl Into<String>) -> SyntaxError {
        let end = (self.pos + len).min(self.src.len());
        let span = Span {
            end: end as u32,
            ..self.span(self.mark())
        };
        SyntaxError::new(
            ErrorKind::InvalidEscapeSequenceError,
            message,
            span,
            self.src.get(self.pos..end).unwrap_or("\\"),
        )
    }
}
