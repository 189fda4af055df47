//! Zero-copy, indentation-aware lexer.
//!
//! Produces [`SpannedToken`]s whose text borrows `&'src str` slices directly
//! from the source buffer.
//!
//! Handles:
//! - All keyword tokens
//! - INDENT / DEDENT via an indentation stack, with a configurable tab width
//! - Implicit line joining inside `(`, `[`, `{` (tracked as a bracket stack)
//! - Explicit line continuation via a trailing `\`
//! - String literals as a token sequence (`StringStart`, content, escapes,
//!   interpolations, `StringEnd`); see `strings.rs`
//! - Comments (skipped)
//!
//! Tokens are produced lazily: the parser pulls one at a time through
//! [`Lexer::peek`] / [`Lexer::next_token`].

use crate::chars::{is_identifier_continue, is_identifier_start, is_inline_whitespace, is_line_terminator};
use crate::error::{ErrorKind, SyntaxError};
use crate::location::{MAX_SOURCE_LEN, Span};
use crate::{MixedIndentation, ParseOptions};

use super::strings::StringFrame;

// ── Token ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'src> {
    // Literals
    Name(&'src str),
    Int,
    Float,

    // String parts
    StringStart,
    StringContent,
    EscapeSequence,
    StringEnd,
    /// `{` opening an interpolation (or a nested format expression).
    InterpolationOpen,
    /// `}` closing an interpolation.
    InterpolationClose,
    /// `!r`, `!s`, `!a` inside an interpolation.
    TypeConversion,

    // Structural
    Newline,
    Indent,
    Dedent,

    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Ellipsis,
    Arrow,
    At,
    Eq,
    Walrus,
    /// `+=  -=  *=  /=  //=  %=  **=  &=  |=  ^=  >>=  <<=  @=`
    AugAssign,

    // Operators
    Plus,
    Minus,
    Star,
    DblStar,
    Slash,
    DblSlash,
    Percent,
    Pipe,
    Amp,
    Caret,
    Tilde,
    LShift,
    RShift,
    Lt,
    Gt,
    Le,
    Ge,
    EqEq,
    /// `!=` or the legacy `<>`.
    NotEq,

    // Keywords
    KwFalse,
    KwNone,
    KwTrue,
    KwAnd,
    KwAs,
    KwAssert,
    KwAsync,
    KwAwait,
    KwBreak,
    KwClass,
    KwContinue,
    KwDef,
    KwDel,
    KwElif,
    KwElse,
    KwExcept,
    KwFinally,
    KwFor,
    KwFrom,
    KwGlobal,
    KwIf,
    KwImport,
    KwIn,
    KwIs,
    KwLambda,
    KwNonlocal,
    KwNot,
    KwOr,
    KwPass,
    KwRaise,
    KwReturn,
    KwTry,
    KwWhile,
    KwWith,
    KwYield,

    Eof,
}

/// Longest-match-first operator table.
const OPERATORS: &[(&str, Token<'static>)] = &[
    ("**=", Token::AugAssign),
    ("//=", Token::AugAssign),
    (">>=", Token::AugAssign),
    ("<<=", Token::AugAssign),
    ("...", Token::Ellipsis),
    ("->", Token::Arrow),
    (":=", Token::Walrus),
    ("==", Token::EqEq),
    ("!=", Token::NotEq),
    ("<>", Token::NotEq),
    ("<=", Token::Le),
    (">=", Token::Ge),
    ("<<", Token::LShift),
    (">>", Token::RShift),
    ("**", Token::DblStar),
    ("//", Token::DblSlash),
    ("+=", Token::AugAssign),
    ("-=", Token::AugAssign),
    ("*=", Token::AugAssign),
    ("/=", Token::AugAssign),
    ("%=", Token::AugAssign),
    ("&=", Token::AugAssign),
    ("|=", Token::AugAssign),
    ("^=", Token::AugAssign),
    ("@=", Token::AugAssign),
    ("(", Token::LParen),
    (")", Token::RParen),
    ("[", Token::LBracket),
    ("]", Token::RBracket),
    ("{", Token::LBrace),
    ("}", Token::RBrace),
    (",", Token::Comma),
    (":", Token::Colon),
    (";", Token::Semicolon),
    (".", Token::Dot),
    ("@", Token::At),
    ("=", Token::Eq),
    ("+", Token::Plus),
    ("-", Token::Minus),
    ("*", Token::Star),
    ("/", Token::Slash),
    ("%", Token::Percent),
    ("|", Token::Pipe),
    ("&", Token::Amp),
    ("^", Token::Caret),
    ("~", Token::Tilde),
    ("<", Token::Lt),
    (">", Token::Gt),
];

fn keyword(s: &str) -> Option<Token<'static>> {
    let tok = match s {
        "False" => Token::KwFalse,
        "None" => Token::KwNone,
        "True" => Token::KwTrue,
        "and" => Token::KwAnd,
        "as" => Token::KwAs,
        "assert" => Token::KwAssert,
        "async" => Token::KwAsync,
        "await" => Token::KwAwait,
        "break" => Token::KwBreak,
        "class" => Token::KwClass,
        "continue" => Token::KwContinue,
        "def" => Token::KwDef,
        "del" => Token::KwDel,
        "elif" => Token::KwElif,
        "else" => Token::KwElse,
        "except" => Token::KwExcept,
        "finally" => Token::KwFinally,
        "for" => Token::KwFor,
        "from" => Token::KwFrom,
        "global" => Token::KwGlobal,
        "if" => Token::KwIf,
        "import" => Token::KwImport,
        "in" => Token::KwIn,
        "is" => Token::KwIs,
        "lambda" => Token::KwLambda,
        "nonlocal" => Token::KwNonlocal,
        "not" => Token::KwNot,
        "or" => Token::KwOr,
        "pass" => Token::KwPass,
        "raise" => Token::KwRaise,
        "return" => Token::KwReturn,
        "try" => Token::KwTry,
        "while" => Token::KwWhile,
        "with" => Token::KwWith,
        "yield" => Token::KwYield,
        _ => return None,
    };
    Some(tok)
}

// ── SpannedToken ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpannedToken<'src> {
    pub token: Token<'src>,
    pub span: Span,
    /// Exact source slice; empty for INDENT, DEDENT, EOF and the synthetic
    /// NEWLINE emitted at end of input.
    pub text: &'src str,
}

impl<'src> SpannedToken<'src> {
    /// How the token is shown in an error message.
    pub fn describe(&self) -> &'src str {
        match self.token {
            Token::Newline => "newline",
            Token::Indent => "indent",
            Token::Dedent => "dedent",
            Token::Eof => "",
            _ => self.text,
        }
    }

    /// Layout tokens carry no source text of their own.
    pub fn is_layout(&self) -> bool {
        matches!(
            self.token,
            Token::Newline | Token::Indent | Token::Dedent | Token::Eof
        )
    }
}

// ── Lexer state ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub(super) enum Mode {
    /// Inside a string body.
    String(StringFrame),
    /// Inside `{ … }` of a format string.  `depth` is the bracket-stack
    /// length at the opening brace; `:`, `!` and `}` only act on the
    /// interpolation at that depth.
    Interpolation { depth: usize, format_spec: bool },
}

/// Start of a token being scanned.
#[derive(Debug, Clone, Copy)]
pub(super) struct Mark {
    pub(super) pos: usize,
    pub(super) line: u32,
    pub(super) column: u32,
}

pub struct Lexer<'src> {
    pub(super) src: &'src str,
    /// Current byte position.
    pub(super) pos: usize,
    /// 1-indexed line of `pos`.
    line: u32,
    /// 1-indexed character column of `pos`.
    column: u32,
    tab_width: usize,
    mixed_indentation: MixedIndentation,
    /// Indentation stack; always starts with [0].
    indent_stack: Vec<usize>,
    /// How many DEDENT tokens remain to be emitted.
    pending_dedents: usize,
    /// Whether the next logical line should trigger indent/dedent analysis.
    at_line_start: bool,
    /// Whether the current logical line produced a token (so it owes a NEWLINE).
    line_has_content: bool,
    /// Open `(`, `[`, `{` with their spans.  Non-empty ⇒ newlines are ignored.
    pub(super) brackets: Vec<(u8, Span)>,
    /// String / interpolation nesting.  Non-empty ⇒ newlines are ignored.
    pub(super) modes: Vec<Mode>,
    /// One-token lookahead buffer.
    peeked: Option<SpannedToken<'src>>,
    /// Offsets past `u32::MAX` cannot be represented; every token fails.
    oversize: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src str, options: &ParseOptions) -> Self {
        // A leading byte-order mark is not part of the first line.
        let pos = if src.starts_with('\u{FEFF}') { 3 } else { 0 };
        Self {
            src,
            pos,
            line: 1,
            column: 1,
            tab_width: options.tab_width.max(1),
            mixed_indentation: options.mixed_indentation,
            indent_stack: vec![0],
            pending_dedents: 0,
            at_line_start: true,
            line_has_content: false,
            brackets: Vec::new(),
            modes: Vec::new(),
            peeked: None,
            oversize: src.len() > MAX_SOURCE_LEN,
        }
    }

    // ── public interface ──────────────────────────────────────────────────────

    /// Return (but do not consume) the next token.
    pub fn peek(&mut self) -> Result<SpannedToken<'src>, SyntaxError> {
        if let Some(tok) = self.peeked {
            return Ok(tok);
        }
        let tok = self.next_inner()?;
        self.peeked = Some(tok);
        Ok(tok)
    }

    /// Consume and return the next token.
    pub fn next_token(&mut self) -> Result<SpannedToken<'src>, SyntaxError> {
        match self.peeked.take() {
            Some(tok) => Ok(tok),
            None => self.next_inner(),
        }
    }

    /// Current bracket nesting depth.
    pub fn bracket_depth(&self) -> usize {
        self.brackets.len()
    }

    /// Current indentation stack depth above the base level.
    pub fn indent_depth(&self) -> usize {
        self.indent_stack.len() - 1
    }

    // ── cursor helpers ────────────────────────────────────────────────────────

    pub(super) fn cur(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    pub(super) fn byte_at(&self, ahead: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + ahead).copied()
    }

    /// Advance over one character, keeping line bookkeeping current.
    pub(super) fn bump(&mut self) -> Option<char> {
        let c = self.cur()?;
        self.pos += c.len_utf8();
        let ends_line = match c {
            '\n' => true,
            '\r' => self.byte_at(0) != Some(b'\n'),
            _ => false,
        };
        if ends_line {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Advance over `len` bytes (always a whole number of characters).
    pub(super) fn advance(&mut self, len: usize) {
        let target = self.pos + len;
        while self.pos < target && self.bump().is_some() {}
    }

    /// Consume one line terminator (`\n`, `\r\n` or `\r`).
    pub(super) fn bump_line_terminator(&mut self) {
        if self.bump() == Some('\r') && self.byte_at(0) == Some(b'\n') {
            self.bump();
        }
    }

    pub(super) fn mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    pub(super) fn span(&self, mark: Mark) -> Span {
        Span {
            start: mark.pos as u32,
            end: self.pos as u32,
            line: mark.line,
            column: mark.column,
        }
    }

    pub(super) fn token(&self, token: Token<'src>, mark: Mark) -> SpannedToken<'src> {
        SpannedToken {
            token,
            span: self.span(mark),
            text: &self.src[mark.pos..self.pos],
        }
    }

    fn zero_width(&self, token: Token<'src>) -> SpannedToken<'src> {
        self.token(token, self.mark())
    }

    pub(super) fn error(&self, kind: ErrorKind, message: impl Into<String>, mark: Mark) -> SyntaxError {
        let span = self.span(mark);
        SyntaxError::new(kind, message, span, span.text(self.src))
    }

    // ── internal tokenisation ────────────────────────────────────────────────

    fn next_inner(&mut self) -> Result<SpannedToken<'src>, SyntaxError> {
        if self.oversize {
            return Err(SyntaxError::source_too_large(self.src.len()));
        }
        // Emit pending DEDENT tokens before reading more source.
        if self.pending_dedents > 0 {
            self.pending_dedents -= 1;
            return Ok(self.zero_width(Token::Dedent));
        }

        match self.modes.last().copied() {
            Some(Mode::String(frame)) => return self.lex_string_part(frame),
            Some(Mode::Interpolation {
                format_spec: true, ..
            }) => return self.lex_format_spec(),
            _ => {}
        }

        loop {
            // At the start of a logical line (not inside brackets or a
            // string), handle indentation.
            if self.at_line_start && self.brackets.is_empty() && self.modes.is_empty() {
                self.at_line_start = false;
                if let Some(tok) = self.handle_indent()? {
                    return Ok(tok);
                }
            }

            let mark = self.mark();
            let Some(c) = self.cur() else {
                return self.lex_eof();
            };

            if is_inline_whitespace(c) {
                self.bump();
                continue;
            }

            // ── Newline ───────────────────────────────────────────────────
            if is_line_terminator(c) {
                self.bump_line_terminator();
                if !self.brackets.is_empty() || !self.modes.is_empty() {
                    // Implicit continuation.
                    continue;
                }
                self.at_line_start = true;
                if self.line_has_content {
                    self.line_has_content = false;
                    return Ok(self.token(Token::Newline, mark));
                }
                continue;
            }

            // ── Explicit line continuation ────────────────────────────────
            if c == '\\' {
                self.bump();
                match self.cur() {
                    Some(next) if is_line_terminator(next) => {
                        self.bump_line_terminator();
                        continue;
                    }
                    _ => {
                        return Err(self.error(
                            ErrorKind::UnexpectedTokenError,
                            "unexpected character after line continuation character",
                            mark,
                        ));
                    }
                }
            }

            // ── Comment ───────────────────────────────────────────────────
            if c == '#' {
                self.skip_comment();
                continue;
            }

            self.line_has_content = true;

            if let Some(prefix_len) = self.string_prefix_len() {
                return Ok(self.lex_string_start(prefix_len, mark));
            }
            if c.is_ascii_digit()
                || (c == '.' && self.byte_at(1).is_some_and(|b| b.is_ascii_digit()))
            {
                return self.lex_number(mark);
            }
            if is_identifier_start(c) {
                return Ok(self.lex_name(mark));
            }
            return self.lex_operator(c, mark);
        }
    }

    /// Skip from `#` to (not including) the line terminator.
    fn skip_comment(&mut self) {
        while let Some(c) = self.cur() {
            if is_line_terminator(c) {
                break;
            }
            self.bump();
        }
    }

    fn lex_eof(&mut self) -> Result<SpannedToken<'src>, SyntaxError> {
        if let Some(frame) = self.innermost_string() {
            return Err(self.unterminated(frame));
        }
        if let Some(&(open, span)) = self.brackets.last() {
            return Err(SyntaxError::new(
                ErrorKind::UnterminatedBracketError,
                format!("`{}` was never closed", open as char),
                span,
                span.text(self.src),
            ));
        }
        if self.line_has_content {
            self.line_has_content = false;
            return Ok(self.zero_width(Token::Newline));
        }
        if self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            return Ok(self.zero_width(Token::Dedent));
        }
        Ok(self.zero_width(Token::Eof))
    }

    // ── Indentation handling ──────────────────────────────────────────────────

    /// Called when `at_line_start` is true.  Skips blank and comment-only
    /// lines, measures the indentation of the next content line and emits
    /// INDENT/DEDENT/nothing.
    fn handle_indent(&mut self) -> Result<Option<SpannedToken<'src>>, SyntaxError> {
        loop {
            let mark = self.mark();
            let mut width = 0usize;
            let (mut tabs, mut spaces) = (false, false);
            while let Some(c) = self.cur() {
                match c {
                    ' ' => {
                        width += 1;
                        spaces = true;
                    }
                    '\t' => {
                        width = (width / self.tab_width + 1) * self.tab_width;
                        tabs = true;
                    }
                    '\x0C' => width = 0,
                    _ => break,
                }
                self.bump();
            }

            match self.cur() {
                // EOF after whitespace-only content; `lex_eof` takes over.
                None => return Ok(None),
                Some(c) if is_line_terminator(c) => {
                    self.bump_line_terminator();
                    continue;
                }
                Some('#') => {
                    self.skip_comment();
                    continue;
                }
                _ => {}
            }

            if tabs && spaces && self.mixed_indentation == MixedIndentation::Reject {
                return Err(self.error(
                    ErrorKind::IndentationError,
                    "inconsistent use of tabs and spaces in indentation",
                    mark,
                ));
            }

            let top = *self.indent_stack.last().unwrap_or(&0);
            if width > top {
                self.indent_stack.push(width);
                return Ok(Some(self.zero_width(Token::Indent)));
            }
            if width < top {
                if !self.indent_stack.contains(&width) {
                    return Err(self.error(
                        ErrorKind::IndentationError,
                        "unindent does not match any outer indentation level",
                        mark,
                    ));
                }
                let mut popped = 0usize;
                while self.indent_stack.last().is_some_and(|&w| w > width) {
                    self.indent_stack.pop();
                    popped += 1;
                }
                debug_assert!(popped > 0 && !self.indent_stack.is_empty());
                // Emit the first DEDENT now; queue the rest.
                self.pending_dedents = popped - 1;
                return Ok(Some(self.zero_width(Token::Dedent)));
            }
            return Ok(None);
        }
    }

    // ── Identifier / keyword lexing ───────────────────────────────────────────

    fn lex_name(&mut self, mark: Mark) -> SpannedToken<'src> {
        while self.cur().is_some_and(is_identifier_continue) {
            self.bump();
        }
        let text = &self.src[mark.pos..self.pos];
        self.token(keyword(text).unwrap_or(Token::Name(text)), mark)
    }

    // ── Number lexing ─────────────────────────────────────────────────────────

    fn eat_digits(&mut self, radix: u32) -> usize {
        let mut count = 0;
        while let Some(c) = self.cur() {
            if c == '_' || c.is_digit(radix) {
                if c != '_' {
                    count += 1;
                }
                self.bump();
            } else {
                break;
            }
        }
        count
    }

    fn lex_number(&mut self, mark: Mark) -> Result<SpannedToken<'src>, SyntaxError> {
        let radix = match (self.byte_at(0), self.byte_at(1)) {
            (Some(b'0'), Some(b'x' | b'X')) => 16,
            (Some(b'0'), Some(b'o' | b'O')) => 8,
            (Some(b'0'), Some(b'b' | b'B')) => 2,
            _ => 10,
        };
        if radix != 10 {
            self.advance(2);
            if self.eat_digits(radix) == 0 {
                return Err(self.error(
                    ErrorKind::UnexpectedTokenError,
                    "invalid number literal",
                    mark,
                ));
            }
            if matches!(self.byte_at(0), Some(b'l' | b'L')) {
                self.bump();
            }
            return Ok(self.token(Token::Int, mark));
        }

        let mut is_float = false;
        self.eat_digits(10);
        if self.byte_at(0) == Some(b'.') {
            self.bump();
            self.eat_digits(10);
            is_float = true;
        }
        if matches!(self.byte_at(0), Some(b'e' | b'E')) {
            let sign = usize::from(matches!(self.byte_at(1), Some(b'+' | b'-')));
            if self.byte_at(1 + sign).is_some_and(|b| b.is_ascii_digit()) {
                self.advance(1 + sign);
                self.eat_digits(10);
                is_float = true;
            }
        }
        if matches!(self.byte_at(0), Some(b'l' | b'L' | b'j' | b'J')) {
            self.bump();
        }
        let token = if is_float { Token::Float } else { Token::Int };
        Ok(self.token(token, mark))
    }

    // ── Operators and punctuation ─────────────────────────────────────────────

    fn lex_operator(&mut self, c: char, mark: Mark) -> Result<SpannedToken<'src>, SyntaxError> {
        // `}`, `:` and `!` at an interpolation's own depth belong to the
        // enclosing format string.
        let at_interpolation_depth = matches!(
            self.modes.last(),
            Some(Mode::Interpolation { depth, .. }) if *depth == self.brackets.len()
        );
        if at_interpolation_depth {
            match c {
                '}' => {
                    self.bump();
                    self.modes.pop();
                    return Ok(self.token(Token::InterpolationClose, mark));
                }
                ':' => {
                    self.bump();
                    if let Some(Mode::Interpolation { format_spec, .. }) = self.modes.last_mut() {
                        *format_spec = true;
                    }
                    return Ok(self.token(Token::Colon, mark));
                }
                '!' if self.byte_at(1) != Some(b'=') => {
                    self.bump();
                    // `![a-z]`: one lowercase letter, not followed by more
                    // identifier characters.
                    let single = self.cur().is_some_and(|c| c.is_ascii_lowercase())
                        && !self.src[self.pos + 1..]
                            .chars()
                            .next()
                            .is_some_and(is_identifier_continue);
                    if !single {
                        while self.cur().is_some_and(is_identifier_continue) {
                            self.bump();
                        }
                        return Err(self.error(
                            ErrorKind::UnexpectedTokenError,
                            "expected a single lowercase conversion character after `!`",
                            mark,
                        ));
                    }
                    self.bump();
                    return Ok(self.token(Token::TypeConversion, mark));
                }
                _ => {}
            }
        }

        let rest = &self.src[self.pos..];
        let Some(&(op, token)) = OPERATORS.iter().find(|(op, _)| rest.starts_with(op)) else {
            self.bump();
            return Err(self.error(
                ErrorKind::UnexpectedTokenError,
                format!("unexpected character `{c}`"),
                mark,
            ));
        };
        self.advance(op.len());

        match token {
            Token::LParen | Token::LBracket | Token::LBrace => {
                let span = self.span(mark);
                self.brackets.push((op.as_bytes()[0], span));
            }
            Token::RParen | Token::RBracket | Token::RBrace => self.close_bracket(op.as_bytes()[0], mark)?,
            _ => {}
        }
        Ok(self.token(token, mark))
    }

    fn close_bracket(&mut self, close: u8, mark: Mark) -> Result<(), SyntaxError> {
        // An interpolation's brackets cannot close past its opening brace.
        let floor = match self.modes.last() {
            Some(Mode::Interpolation { depth, .. }) => *depth,
            _ => 0,
        };
        if self.brackets.len() <= floor {
            // Unbalanced closer: left for the parser to reject.
            return Ok(());
        }
        let (open, _) = self.brackets[self.brackets.len() - 1];
        let expected = match open {
            b'(' => b')',
            b'[' => b']',
            _ => b'}',
        };
        if close != expected {
            return Err(self.error(
                ErrorKind::UnexpectedTokenError,
                format!(
                    "closing `{}` does not match opening `{}`",
                    close as char, open as char
                ),
                mark,
            ));
        }
        self.brackets.pop();
        Ok(())
    }
}
