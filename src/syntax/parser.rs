//! Recursive-descent parser core.
//!
//! The parser pulls tokens from the [`Lexer`] one at a time (one token of
//! lookahead) and never backtracks.  Statement rules live in `stmt.rs`,
//! expression rules in `expr.rs`; this file holds the token plumbing, the
//! program/suite loops and the cancellation check.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::ParseOptions;
use crate::ast::{Node, NodeKind};
use crate::error::{ParseError, SyntaxError};
use crate::location::Span;

use super::builder::NodeBuilder;
use super::lexer::{Lexer, SpannedToken, Token};

pub(crate) type PResult<T> = Result<T, ParseError>;

pub struct Parser<'src, 'c> {
    pub(super) src: &'src str,
    lexer: Lexer<'src>,
    /// Span of the last consumed token that has source text.  Node spans
    /// end here.
    pub(super) last: Span,
    cancel: Option<&'c AtomicBool>,
}

impl<'src, 'c> Parser<'src, 'c> {
    pub fn new(src: &'src str, options: &ParseOptions) -> Self {
        Self {
            src,
            lexer: Lexer::new(src, options),
            last: Span::default(),
            cancel: None,
        }
    }

    /// Abort with [`ParseError::Cancelled`] once `flag` is set.  Checked
    /// between statements.
    pub fn with_cancel(mut self, flag: &'c AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    // ── public interface ──────────────────────────────────────────────────────

    /// `program: statement_list`
    pub fn parse_program(&mut self) -> PResult<Node<'src>> {
        let mut statements = Vec::new();
        loop {
            self.check_cancelled()?;
            let tok = self.peek()?;
            match tok.token {
                Token::Eof => break,
                Token::Indent => return Err(Self::unexpected(&tok, &["statement"])),
                _ => self.parse_statement(&mut statements)?,
            }
        }
        let whole = Span {
            start: 0,
            end: self.src.len() as u32,
            line: 1,
            column: 1,
        };
        Ok(NodeBuilder::new(NodeKind::Program, whole)
            .list("statement_list", statements)
            .finish(whole))
    }

    // ── token plumbing ────────────────────────────────────────────────────────

    pub(super) fn peek(&mut self) -> Result<SpannedToken<'src>, SyntaxError> {
        self.lexer.peek()
    }

    pub(super) fn peek_token(&mut self) -> Result<Token<'src>, SyntaxError> {
        Ok(self.lexer.peek()?.token)
    }

    pub(super) fn at(&mut self, token: Token<'src>) -> Result<bool, SyntaxError> {
        Ok(self.peek_token()? == token)
    }

    pub(super) fn bump(&mut self) -> Result<SpannedToken<'src>, SyntaxError> {
        let tok = self.lexer.next_token()?;
        if !tok.is_layout() {
            self.last = tok.span;
        }
        Ok(tok)
    }

    /// Consume the next token only if it is `token`.
    pub(super) fn eat(&mut self, token: Token<'src>) -> Result<Option<SpannedToken<'src>>, SyntaxError> {
        if self.at(token)? {
            self.bump().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Consume `token` or fail naming `what` as the expected token.
    pub(super) fn expect(&mut self, token: Token<'src>, what: &'static str) -> PResult<SpannedToken<'src>> {
        let tok = self.peek()?;
        if tok.token == token {
            Ok(self.bump()?)
        } else {
            Err(Self::unexpected(&tok, &[what]))
        }
    }

    pub(super) fn expect_name(&mut self) -> PResult<Node<'src>> {
        let tok = self.peek()?;
        match tok.token {
            Token::Name(_) => {
                self.bump()?;
                Ok(Self::leaf(NodeKind::Identifier, &tok))
            }
            _ => Err(Self::unexpected(&tok, &["identifier"])),
        }
    }

    pub(super) fn leaf(kind: NodeKind, tok: &SpannedToken<'src>) -> Node<'src> {
        Node::leaf(kind, tok.span, tok.text)
    }

    /// A leaf covering two consecutive tokens (`not in`, `is not`).
    pub(super) fn joined_leaf(&self, kind: NodeKind, first: &SpannedToken<'src>, second: &SpannedToken<'src>) -> Node<'src> {
        let span = first.span.to(second.span);
        Node::leaf(kind, span, span.text(self.src))
    }

    pub(super) fn unexpected(tok: &SpannedToken<'src>, expected: &[&'static str]) -> ParseError {
        SyntaxError::unexpected(expected, tok.span, tok.describe()).into()
    }

    fn check_cancelled(&self) -> PResult<()> {
        match self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(ParseError::Cancelled),
            _ => Ok(()),
        }
    }

    // ── Suites ────────────────────────────────────────────────────────────────

    /// The body after a compound statement's `:`.
    ///
    /// ```text
    /// suite: simple_statements                   (inline)
    ///      | NEWLINE INDENT statement+ DEDENT    (indented block)
    ///      | NEWLINE                             (placeholder body)
    /// ```
    ///
    /// `list_field` names the statement list (`statement_list`, or
    /// `class_member_list` for class bodies).
    pub(super) fn parse_suite(&mut self, list_field: &'static str) -> PResult<Option<Node<'src>>> {
        let tok = self.peek()?;
        if tok.token != Token::Newline {
            let mut statements = Vec::new();
            self.parse_simple_statements(&mut statements)?;
            return Ok(Some(
                NodeBuilder::new(NodeKind::Block, tok.span)
                    .list(list_field, statements)
                    .finish(self.last),
            ));
        }

        self.bump()?;
        if self.eat(Token::Indent)?.is_none() {
            return Ok(None);
        }
        let start = self.peek()?.span;
        let mut statements = Vec::new();
        loop {
            self.check_cancelled()?;
            let tok = self.peek()?;
            match tok.token {
                Token::Dedent => {
                    self.bump()?;
                    break;
                }
                Token::Indent => return Err(Self::unexpected(&tok, &["statement"])),
                _ => self.parse_statement(&mut statements)?,
            }
        }
        Ok(Some(
            NodeBuilder::new(NodeKind::Block, start)
                .list(list_field, statements)
                .finish(self.last),
        ))
    }

    /// `simple_statement (';' simple_statement)* ';'? NEWLINE`, flattened
    /// into `out`.
    pub(super) fn parse_simple_statements(&mut self, out: &mut Vec<Node<'src>>) -> PResult<()> {
        let first = self.parse_simple_statement()?;
        self.finish_simple_statements(out, first)
    }

    /// The rest of a simple-statement line whose first statement is parsed.
    pub(super) fn finish_simple_statements(&mut self, out: &mut Vec<Node<'src>>, first: Node<'src>) -> PResult<()> {
        out.push(first);
        while self.eat(Token::Semicolon)?.is_some() && !self.at(Token::Newline)? {
            out.push(self.parse_simple_statement()?);
        }
        let tok = self.peek()?;
        if tok.token != Token::Newline {
            return Err(Self::unexpected(&tok, &["`;`", "newline"]));
        }
        self.bump()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use super::*;
    use crate::error::ErrorKind;

    fn program(src: &str) -> Node<'_> {
        Parser::new(src, &ParseOptions::default())
            .parse_program()
            .unwrap()
    }

    fn syntax_error(src: &str) -> SyntaxError {
        match Parser::new(src, &ParseOptions::default()).parse_program() {
            Err(ParseError::Syntax(e)) => e,
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_program_has_placeholder_statement_list() {
        let root = program("");
        assert_eq!(root.kind, NodeKind::Program);
        assert!(root.is_placeholder("statement_list"));
        let root = program("\n# only a comment\n\n");
        assert!(root.is_placeholder("statement_list"));
    }

    #[test]
    fn test_semicolons_flatten_into_statement_list() {
        let root = program("a; b; c;\nd\n");
        assert_eq!(root.children("statement_list").len(), 4);
    }

    #[test]
    fn test_unexpected_indent_at_top_level() {
        let err = syntax_error("  x = 1\n");
        assert_eq!(err.kind, ErrorKind::UnexpectedTokenError);
        assert_eq!(err.offending_token_text, "indent");
    }

    #[test]
    fn test_suite_forms() {
        let root = program("if a: b\nif c:\n    d\n    e\nif f:\ng\n");
        let stmts = root.children("statement_list");
        assert_eq!(stmts.len(), 4);

        let inline = stmts[0].child("if_clause").unwrap().child("body").unwrap();
        assert_eq!(inline.children("statement_list").len(), 1);

        let block = stmts[1].child("if_clause").unwrap().child("body").unwrap();
        assert_eq!(block.kind, NodeKind::Block);
        assert_eq!(block.children("statement_list").len(), 2);
        assert_eq!(block.span.text(root_src()), "d\n    e");

        // A bare newline body is a placeholder, and `g` is a sibling.
        assert!(stmts[2].child("if_clause").unwrap().is_placeholder("body"));
    }

    fn root_src() -> &'static str {
        "if a: b\nif c:\n    d\n    e\nif f:\ng\n"
    }

    #[test]
    fn test_missing_newline_between_statements() {
        let err = syntax_error("a b\n");
        assert_eq!(err.kind, ErrorKind::UnexpectedTokenError);
        assert_eq!(err.offending_token_text, "b");
        assert_eq!(err.column, 3);
    }

    #[test]
    fn test_cancellation_between_statements() {
        let flag = AtomicBool::new(true);
        let result = Parser::new("a\nb\n", &ParseOptions::default())
            .with_cancel(&flag)
            .parse_program();
        assert_eq!(result, Err(ParseError::Cancelled));

        let flag = AtomicBool::new(false);
        let result = Parser::new("a\nb\n", &ParseOptions::default())
            .with_cancel(&flag)
            .parse_program();
        assert!(result.is_ok());
    }
}
