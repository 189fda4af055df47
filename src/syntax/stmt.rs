//! Statement rules.

use crate::ast::{Node, NodeKind};
use crate::location::Span;

use super::builder::NodeBuilder;
use super::lexer::{SpannedToken, Token};
use super::parser::{PResult, Parser};
use super::precedence::{binary, is_comparison, starts_expression};

impl<'src> Parser<'src, '_> {
    // ── Statement dispatch ────────────────────────────────────────────────────

    /// One statement; simple statements sharing a line are all pushed.
    pub(super) fn parse_statement(&mut self, out: &mut Vec<Node<'src>>) -> PResult<()> {
        let stmt = match self.peek_token()? {
            Token::KwIf => self.parse_if()?,
            Token::KwWhile => self.parse_while()?,
            Token::KwFor => {
                let start = self.peek()?.span;
                self.parse_for(None, start)?
            }
            Token::KwTry => self.parse_try()?,
            Token::KwWith => {
                let start = self.peek()?.span;
                self.parse_with(None, start)?
            }
            Token::KwDef => {
                let start = self.peek()?.span;
                self.parse_funcdef(None, None, start)?
            }
            Token::KwClass => {
                let start = self.peek()?.span;
                self.parse_classdef(None, start)?
            }
            Token::At => self.parse_decorated()?,
            Token::KwAsync => {
                let kw = self.bump()?;
                if !matches!(self.peek_token()?, Token::KwDef | Token::KwFor | Token::KwWith) {
                    // `async` as a name starting an expression statement.
                    let name = Self::leaf(NodeKind::Identifier, &kw);
                    let first = self.parse_expression_statement(Some(name))?;
                    return self.finish_simple_statements(out, first);
                }
                self.parse_async(kw, None)?
            }
            _ => return self.parse_simple_statements(out),
        };
        out.push(stmt);
        Ok(())
    }

    pub(super) fn parse_simple_statement(&mut self) -> PResult<Node<'src>> {
        let tok = self.peek()?;
        match tok.token {
            Token::KwImport => self.parse_import(),
            Token::KwFrom => self.parse_from_import(),
            Token::KwAssert => self.parse_assert(),
            Token::KwReturn => self.parse_return(),
            Token::KwDel => {
                self.bump()?;
                let targets = self.parse_expression_list()?;
                Ok(NodeBuilder::new(NodeKind::DeleteStatement, tok.span)
                    .node("expression", targets)
                    .finish(self.last))
            }
            Token::KwRaise => self.parse_raise(),
            Token::KwPass => self.keyword_statement(NodeKind::PlaceholderStatement),
            Token::KwBreak => self.keyword_statement(NodeKind::BreakStatement),
            Token::KwContinue => self.keyword_statement(NodeKind::ContinueStatement),
            Token::KwGlobal => self.parse_scope_statement(NodeKind::GlobalStatement),
            Token::KwNonlocal => self.parse_scope_statement(NodeKind::NonlocalStatement),
            Token::Name("print") => self.parse_print(),
            Token::Name("exec") => self.parse_exec(),
            _ => self.parse_expression_statement(None),
        }
    }

    fn keyword_statement(&mut self, kind: NodeKind) -> PResult<Node<'src>> {
        let tok = self.bump()?;
        Ok(Self::leaf(kind, &tok))
    }

    // ── Imports ───────────────────────────────────────────────────────────────

    /// `import a.b as c, d`
    fn parse_import(&mut self) -> PResult<Node<'src>> {
        let start = self.bump()?.span;
        let names = self.parse_import_list(false)?;
        Ok(NodeBuilder::new(NodeKind::ImportStatement, start)
            .list("name", names)
            .finish(self.last))
    }

    /// `from .mod import a as b, c` / `from m import (a, b,)` / `from m import *`
    /// / `from __future__ import x`
    fn parse_from_import(&mut self) -> PResult<Node<'src>> {
        let start = self.bump()?.span;

        if self.peek_token()? == Token::Name("__future__") {
            self.bump()?;
            self.expect(Token::KwImport, "`import`")?;
            let names = self.parse_import_names()?;
            return Ok(NodeBuilder::new(NodeKind::FutureImportStatement, start)
                .list("name", names)
                .finish(self.last));
        }

        let module = self.parse_import_module()?;
        self.expect(Token::KwImport, "`import`")?;

        let builder = NodeBuilder::new(NodeKind::ImportFromStatement, start).node("module_name", module);
        let tok = self.peek()?;
        let node = if tok.token == Token::Star {
            self.bump()?;
            builder
                .node("name", Self::leaf(NodeKind::WildcardImport, &tok))
                .finish(self.last)
        } else {
            let names = self.parse_import_names()?;
            builder.list("name", names).finish(self.last)
        };
        Ok(node)
    }

    /// `relative_import` (leading dots) or `dotted_name`.
    fn parse_import_module(&mut self) -> PResult<Node<'src>> {
        let first = self.peek()?;
        if !matches!(first.token, Token::Dot | Token::Ellipsis) {
            return self.parse_dotted_name();
        }
        let mut last = first;
        while matches!(self.peek_token()?, Token::Dot | Token::Ellipsis) {
            last = self.bump()?;
        }
        let prefix = self.joined_leaf(NodeKind::ImportPrefix, &first, &last);
        let module = match self.peek_token()? {
            Token::Name(_) => Some(self.parse_dotted_name()?),
            _ => None,
        };
        Ok(NodeBuilder::new(NodeKind::RelativeImport, first.span)
            .node("import_prefix", prefix)
            .optional("dotted_name", module)
            .finish(self.last))
    }

    /// Names after `import`, optionally parenthesised.
    fn parse_import_names(&mut self) -> PResult<Vec<Node<'src>>> {
        if self.eat(Token::LParen)?.is_some() {
            let names = self.parse_import_list(true)?;
            self.expect(Token::RParen, "`)`")?;
            Ok(names)
        } else {
            self.parse_import_list(false)
        }
    }

    fn parse_import_list(&mut self, parenthesized: bool) -> PResult<Vec<Node<'src>>> {
        let mut names = Vec::new();
        loop {
            let start = self.peek()?.span;
            let name = self.parse_dotted_name()?;
            let name = if self.eat(Token::KwAs)?.is_some() {
                let alias = self.expect_name()?;
                NodeBuilder::new(NodeKind::AliasedImport, start)
                    .node("name", name)
                    .node("alias", alias)
                    .finish(self.last)
            } else {
                name
            };
            names.push(name);
            if self.eat(Token::Comma)?.is_none() {
                break;
            }
            // Trailing comma is only allowed inside parentheses.
            if parenthesized && self.at(Token::RParen)? {
                break;
            }
        }
        Ok(names)
    }

    /// `a.b.c`
    fn parse_dotted_name(&mut self) -> PResult<Node<'src>> {
        let start = self.peek()?.span;
        let mut parts = vec![self.expect_name()?];
        while self.eat(Token::Dot)?.is_some() {
            parts.push(self.expect_name()?);
        }
        Ok(NodeBuilder::new(NodeKind::DottedName, start)
            .list("identifier", parts)
            .finish(self.last))
    }

    // ── Simple statements ─────────────────────────────────────────────────────

    fn parse_assert(&mut self) -> PResult<Node<'src>> {
        let start = self.bump()?.span;
        let mut arguments = vec![self.parse_expression()?];
        while self.eat(Token::Comma)?.is_some() {
            arguments.push(self.parse_expression()?);
        }
        Ok(NodeBuilder::new(NodeKind::AssertStatement, start)
            .list("argument", arguments)
            .finish(self.last))
    }

    fn parse_return(&mut self) -> PResult<Node<'src>> {
        let start = self.bump()?.span;
        let value = if starts_expression(self.peek_token()?) {
            let value_start = self.peek()?.span;
            let value = self.parse_expression_list()?;
            Some(
                NodeBuilder::new(NodeKind::ReturnValue, value_start)
                    .node("value", value)
                    .finish(self.last),
            )
        } else {
            None
        };
        Ok(NodeBuilder::new(NodeKind::Return, start)
            .optional("return_value_optional", value)
            .finish(self.last))
    }

    /// `raise [exc [from cause]]`
    fn parse_raise(&mut self) -> PResult<Node<'src>> {
        let start = self.bump()?.span;
        let (exception, cause) = if starts_expression(self.peek_token()?) {
            let exception = self.parse_expression_list()?;
            let cause = match self.eat(Token::KwFrom)? {
                Some(_) => Some(self.parse_expression()?),
                None => None,
            };
            (Some(exception), cause)
        } else {
            (None, None)
        };
        Ok(NodeBuilder::new(NodeKind::RaiseStatement, start)
            .optional("exception_optional", exception)
            .optional("cause_optional", cause)
            .finish(self.last))
    }

    /// `global a, b` / `nonlocal a, b`
    fn parse_scope_statement(&mut self, kind: NodeKind) -> PResult<Node<'src>> {
        let start = self.bump()?.span;
        let mut names = vec![self.expect_name()?];
        while self.eat(Token::Comma)?.is_some() {
            names.push(self.expect_name()?);
        }
        Ok(NodeBuilder::new(kind, start)
            .list("identifier", names)
            .finish(self.last))
    }

    // ── Legacy statements ─────────────────────────────────────────────────────

    /// `print >>f, x` / `print x, y`.  When the next token also continues
    /// `print` as an expression (`print(x)`, `print -x`, `print = 1`) the
    /// expression reading wins.
    fn parse_print(&mut self) -> PResult<Node<'src>> {
        let kw = self.bump()?;
        let next = self.peek()?;
        let mut arguments = Vec::new();
        let chevron = if next.token == Token::RShift {
            self.bump()?;
            let target = self.parse_expression()?;
            Some(
                NodeBuilder::new(NodeKind::Chevron, next.span)
                    .node("expression", target)
                    .finish(self.last),
            )
        } else if starts_print_argument(next.token) {
            arguments.push(self.parse_expression()?);
            None
        } else {
            let name = Self::leaf(NodeKind::Identifier, &kw);
            return self.parse_expression_statement(Some(name));
        };
        while self.eat(Token::Comma)?.is_some() {
            if !starts_expression(self.peek_token()?) {
                break;
            }
            arguments.push(self.parse_expression()?);
        }
        Ok(NodeBuilder::new(NodeKind::PrintStatement, kw.span)
            .optional("chevron", chevron)
            .list("argument", arguments)
            .finish(self.last))
    }

    /// `exec "code" [in globals [, locals]]`.  Without a string after it,
    /// `exec` is a name.
    fn parse_exec(&mut self) -> PResult<Node<'src>> {
        let kw = self.bump()?;
        if !self.at(Token::StringStart)? {
            let name = Self::leaf(NodeKind::Identifier, &kw);
            return self.parse_expression_statement(Some(name));
        }
        let code = self.string()?;
        let mut scopes = Vec::new();
        if self.eat(Token::KwIn)?.is_some() {
            scopes.push(self.parse_expression()?);
            while self.eat(Token::Comma)?.is_some() {
                scopes.push(self.parse_expression()?);
            }
        }
        Ok(NodeBuilder::new(NodeKind::ExecStatement, kw.span)
            .node("code", code)
            .list("expression", scopes)
            .finish(self.last))
    }

    /// Expression statements and assignments.
    ///
    /// The left-hand side is parsed once as an expression list, then
    /// reinterpreted as assignment patterns when `=`, `:` or an augmented
    /// operator follows.
    ///
    /// `leading` is the identifier for a word (`print`, `exec`, `async`) the
    /// caller consumed before deciding it starts an expression.
    fn parse_expression_statement(&mut self, leading: Option<Node<'src>>) -> PResult<Node<'src>> {
        let (start, first) = match leading {
            Some(name) => (name.span, self.parse_expression_list_after(name)?),
            None => {
                let start = self.peek()?.span;
                let first = if self.at(Token::KwYield)? {
                    self.parse_yield()?
                } else {
                    self.parse_expression_list()?
                };
                (start, first)
            }
        };

        let tok = self.peek()?;
        match tok.token {
            Token::Eq => self.parse_assignment(first, start),
            Token::Colon => {
                self.bump()?;
                let variables = vec![self.to_pattern(first)?];
                let annotation = self.parse_type()?;
                let values = if self.eat(Token::Eq)?.is_some() {
                    Self::flatten_list(self.parse_assignment_value()?)
                } else {
                    Vec::new()
                };
                Ok(NodeBuilder::new(NodeKind::Assignment, start)
                    .list("assignment_variable_list", variables)
                    .node("type_optional", annotation)
                    .list("assignment_value_list", values)
                    .finish(self.last))
            }
            Token::AugAssign => {
                self.bump()?;
                let variables = self.to_patterns(first)?;
                let operator = Self::leaf(NodeKind::Operator, &tok);
                let values = Self::flatten_list(self.parse_assignment_value()?);
                Ok(NodeBuilder::new(NodeKind::AugmentedAssignment, start)
                    .list("assignment_variable_list", variables)
                    .node("operator", operator)
                    .list("assignment_value_list", values)
                    .finish(self.last))
            }
            _ => Ok(NodeBuilder::new(NodeKind::ExpressionStatement, start)
                .list("expression", Self::flatten_list(first))
                .finish(self.last)),
        }
    }

    /// `targets = value [= value …]`, nested to the right.
    fn parse_assignment(&mut self, targets: Node<'src>, start: Span) -> PResult<Node<'src>> {
        self.expect(Token::Eq, "`=`")?;
        let variables = self.to_patterns(targets)?;
        let value_start = self.peek()?.span;
        let mut value = self.parse_assignment_value()?;
        if self.at(Token::Eq)? {
            value = self.parse_assignment(value, value_start)?;
        }
        Ok(NodeBuilder::new(NodeKind::Assignment, start)
            .list("assignment_variable_list", variables)
            .empty("type_optional")
            .list("assignment_value_list", Self::flatten_list(value))
            .finish(self.last))
    }

    fn parse_assignment_value(&mut self) -> PResult<Node<'src>> {
        if self.at(Token::KwYield)? {
            self.parse_yield()
        } else {
            self.parse_expression_list()
        }
    }

    /// Elements of an `expression_list`, or the node itself.
    fn flatten_list(node: Node<'src>) -> Vec<Node<'src>> {
        if node.kind == NodeKind::ExpressionList {
            node.into_children("expression")
        } else {
            vec![node]
        }
    }

    /// Assignment targets: each element of a bare target list becomes a
    /// pattern.
    fn to_patterns(&self, node: Node<'src>) -> PResult<Vec<Node<'src>>> {
        Self::flatten_list(node)
            .into_iter()
            .map(|n| self.to_pattern(n))
            .collect()
    }

    // ── Compound statements ───────────────────────────────────────────────────

    /// `if cond: … (elif cond: …)* (else: …)?`
    fn parse_if(&mut self) -> PResult<Node<'src>> {
        let start = self.bump()?.span;
        let condition = self.parse_expression()?;
        self.expect(Token::Colon, "`:`")?;
        let body = self.parse_suite("statement_list")?;
        let if_clause = NodeBuilder::new(NodeKind::IfClause, start)
            .node("condition", condition)
            .optional("body", body)
            .finish(self.last);

        let mut elifs = Vec::new();
        while let Some(kw) = self.eat(Token::KwElif)? {
            let condition = self.parse_expression()?;
            self.expect(Token::Colon, "`:`")?;
            let body = self.parse_suite("statement_list")?;
            elifs.push(
                NodeBuilder::new(NodeKind::ElseIfClause, kw.span)
                    .node("condition", condition)
                    .optional("body", body)
                    .finish(self.last),
            );
        }
        let else_clause = self.parse_else()?;

        Ok(NodeBuilder::new(NodeKind::If, start)
            .node("if_clause", if_clause)
            .list("else_if_clause_list", elifs)
            .optional("else_clause_optional", else_clause)
            .finish(self.last))
    }

    fn parse_else(&mut self) -> PResult<Option<Node<'src>>> {
        let Some(kw) = self.eat(Token::KwElse)? else {
            return Ok(None);
        };
        self.expect(Token::Colon, "`:`")?;
        let body = self.parse_suite("statement_list")?;
        Ok(Some(
            NodeBuilder::new(NodeKind::ElseClause, kw.span)
                .optional("body", body)
                .finish(self.last),
        ))
    }

    fn parse_while(&mut self) -> PResult<Node<'src>> {
        let start = self.bump()?.span;
        let condition = self.parse_expression()?;
        self.expect(Token::Colon, "`:`")?;
        let body = self.parse_suite("statement_list")?;
        let clause = NodeBuilder::new(NodeKind::WhileClause, start)
            .node("condition", condition)
            .optional("body", body)
            .finish(self.last);
        let else_clause = self.parse_else()?;
        Ok(NodeBuilder::new(NodeKind::While, start)
            .node("while_clause", clause)
            .optional("else_clause_optional", else_clause)
            .finish(self.last))
    }

    /// `[async] for targets in values: …` with an optional `else`.
    fn parse_for(&mut self, modifier: Option<Node<'src>>, start: Span) -> PResult<Node<'src>> {
        self.expect(Token::KwFor, "`for`")?;
        let iterator = self.parse_target_list()?;
        self.expect(Token::KwIn, "`in`")?;
        let collection = self.parse_expression_list()?;
        self.expect(Token::Colon, "`:`")?;
        let body = self.parse_suite("statement_list")?;
        let clause = NodeBuilder::new(NodeKind::ForEachClause, start)
            .optional("modifier_list", modifier)
            .node("block_iterator", iterator)
            .node("block_collection", collection)
            .optional("body", body)
            .finish(self.last);
        let else_clause = self.parse_else()?;
        Ok(NodeBuilder::new(NodeKind::For, start)
            .node("for_each_clause", clause)
            .optional("else_clause_optional", else_clause)
            .finish(self.last))
    }

    /// `try` is routed by what follows the try body:
    /// - `finally` directly → `try_only_finally` (handler list and `else`
    ///   are placeholders);
    /// - one or more `except` → `try_optional_finally`.
    fn parse_try(&mut self) -> PResult<Node<'src>> {
        let start = self.bump()?.span;
        self.expect(Token::Colon, "`:`")?;
        let body = self.parse_suite("statement_list")?;
        let try_clause = NodeBuilder::new(NodeKind::TryClause, start)
            .optional("body", body)
            .finish(self.last);

        let tok = self.peek()?;
        let branch = match tok.token {
            Token::KwFinally => {
                let finally = self.parse_finally()?;
                NodeBuilder::new(NodeKind::TryOnlyFinally, tok.span)
                    .empty("catch_list")
                    .empty("else_clause_optional")
                    .node("finally_clause_optional", finally)
                    .finish(self.last)
            }
            Token::KwExcept => {
                let mut handlers = Vec::new();
                while self.at(Token::KwExcept)? {
                    handlers.push(self.parse_catch()?);
                }
                let else_clause = self.parse_else()?;
                let finally = if self.at(Token::KwFinally)? {
                    Some(self.parse_finally()?)
                } else {
                    None
                };
                NodeBuilder::new(NodeKind::TryOptionalFinally, tok.span)
                    .list("catch_list", handlers)
                    .optional("else_clause_optional", else_clause)
                    .optional("finally_clause_optional", finally)
                    .finish(self.last)
            }
            _ => return Err(Self::unexpected(&tok, &["`except`", "`finally`"])),
        };

        Ok(NodeBuilder::new(NodeKind::Try, start)
            .node("try_clause", try_clause)
            .node("try_branch", branch)
            .finish(self.last))
    }

    /// `except [type [(as | ,) alias]]: …`
    fn parse_catch(&mut self) -> PResult<Node<'src>> {
        let start = self.bump()?.span;
        let parameter = if self.at(Token::Colon)? {
            None
        } else {
            let param_start = self.peek()?.span;
            let ty = self.parse_expression()?;
            let alias = if self.eat(Token::KwAs)?.is_some() || self.eat(Token::Comma)?.is_some() {
                Some(self.parse_target()?)
            } else {
                None
            };
            Some(
                NodeBuilder::new(NodeKind::CatchParameter, param_start)
                    .node("type", ty)
                    .optional("alias_optional", alias)
                    .finish(self.last),
            )
        };
        self.expect(Token::Colon, "`:`")?;
        let body = self.parse_suite("statement_list")?;
        Ok(NodeBuilder::new(NodeKind::Catch, start)
            .optional("catch_parameter_optional", parameter)
            .optional("body", body)
            .finish(self.last))
    }

    fn parse_finally(&mut self) -> PResult<Node<'src>> {
        let start = self.bump()?.span;
        self.expect(Token::Colon, "`:`")?;
        let body = self.parse_suite("statement_list")?;
        Ok(NodeBuilder::new(NodeKind::FinallyClause, start)
            .optional("body", body)
            .finish(self.last))
    }

    /// `[async] with item (, item)*: …` or `with (item, …):`
    fn parse_with(&mut self, modifier: Option<Node<'src>>, start: Span) -> PResult<Node<'src>> {
        self.expect(Token::KwWith, "`with`")?;
        let clause_start = self.peek()?.span;
        let mut items = Vec::new();
        if self.at(Token::LParen)? {
            self.parse_parenthesized_with_items(&mut items)?;
        } else {
            items.push(self.parse_with_item()?);
        }
        while self.eat(Token::Comma)?.is_some() {
            items.push(self.parse_with_item()?);
        }
        let clause = NodeBuilder::new(NodeKind::WithClause, clause_start)
            .list("with_item", items)
            .finish(self.last);
        self.expect(Token::Colon, "`:`")?;
        let body = self.parse_suite("statement_list")?;
        Ok(NodeBuilder::new(NodeKind::With, start)
            .optional("modifier_list", modifier)
            .node("with_item_list", clause)
            .optional("body", body)
            .finish(self.last))
    }

    /// `with (` is ambiguous between a parenthesised item list and an
    /// expression that starts with a parenthesis.  The items are parsed
    /// once; if `:` does not follow the `)`, and no item had an alias, the
    /// group is reinterpreted as the leading atom of the first item.
    fn parse_parenthesized_with_items(&mut self, items: &mut Vec<Node<'src>>) -> PResult<()> {
        let open = self.bump()?;
        let mut group = Vec::new();
        let mut trailing_comma = false;
        while !self.at(Token::RParen)? {
            group.push(self.parse_with_item()?);
            trailing_comma = self.eat(Token::Comma)?.is_some();
            if !trailing_comma {
                break;
            }
        }
        self.expect(Token::RParen, "`)`")?;

        let has_alias = group
            .iter()
            .any(|item| !item.is_placeholder("with_item_alias_optional"));
        let tok = self.peek()?;
        if tok.token == Token::Colon && !group.is_empty() {
            items.extend(group);
            return Ok(());
        }
        if has_alias {
            return Err(Self::unexpected(&tok, &["`:`"]));
        }

        let mut elements: Vec<Node<'src>> = group
            .into_iter()
            .filter_map(|item| item.into_child("value"))
            .collect();
        let atom = if elements.len() == 1 && !trailing_comma {
            let inner = elements.remove(0);
            NodeBuilder::new(NodeKind::ParenthesizedExpression, open.span)
                .node("expression", inner)
                .finish(self.last)
        } else {
            NodeBuilder::new(NodeKind::Tuple, open.span)
                .list("list_element", elements)
                .finish(self.last)
        };
        let value = self.continue_expression(atom)?;
        items.push(self.finish_with_item(value, open.span)?);
        Ok(())
    }

    fn parse_with_item(&mut self) -> PResult<Node<'src>> {
        let start = self.peek()?.span;
        let value = self.parse_expression()?;
        self.finish_with_item(value, start)
    }

    fn finish_with_item(&mut self, value: Node<'src>, start: Span) -> PResult<Node<'src>> {
        let alias = match self.eat(Token::KwAs)? {
            Some(_) => {
                let target_start = self.peek()?.span;
                let target = self.parse_target()?;
                Some(
                    NodeBuilder::new(NodeKind::WithItemAlias, target_start)
                        .node("identifier", target)
                        .finish(self.last),
                )
            }
            None => None,
        };
        Ok(NodeBuilder::new(NodeKind::WithItem, start)
            .node("value", value)
            .optional("with_item_alias_optional", alias)
            .finish(self.last))
    }

    // ── Definitions ───────────────────────────────────────────────────────────

    /// `@expr NEWLINE` repeated, then `def`, `async def` or `class`.
    fn parse_decorated(&mut self) -> PResult<Node<'src>> {
        let start = self.peek()?.span;
        let mut decorators = Vec::new();
        while let Some(at) = self.eat(Token::At)? {
            let expression = self.parse_primary()?;
            decorators.push(
                NodeBuilder::new(NodeKind::Decorator, at.span)
                    .node("decorator_expression", expression)
                    .finish(self.last),
            );
            self.expect(Token::Newline, "newline")?;
        }
        let list = NodeBuilder::new(NodeKind::DecoratorList, start)
            .list("decorator", decorators)
            .finish(self.last);

        let tok = self.peek()?;
        match tok.token {
            Token::KwDef => self.parse_funcdef(Some(list), None, start),
            Token::KwClass => self.parse_classdef(Some(list), start),
            Token::KwAsync => {
                let kw = self.bump()?;
                self.parse_async(kw, Some((list, start)))
            }
            _ => Err(Self::unexpected(&tok, &["`def`", "`class`", "`async`"])),
        }
    }

    /// `async def`, `async for`, `async with`; `kw` is the consumed `async`.
    fn parse_async(&mut self, kw: SpannedToken<'src>, decorated: Option<(Node<'src>, Span)>) -> PResult<Node<'src>> {
        let modifier = Self::leaf(NodeKind::AsyncModifier, &kw);
        let (decorators, start) = match decorated {
            Some((list, start)) => (Some(list), start),
            None => (None, kw.span),
        };
        let tok = self.peek()?;
        match tok.token {
            Token::KwDef => self.parse_funcdef(decorators, Some(modifier), start),
            Token::KwFor if decorators.is_none() => self.parse_for(Some(modifier), start),
            Token::KwWith if decorators.is_none() => self.parse_with(Some(modifier), start),
            _ if decorators.is_some() => Err(Self::unexpected(&tok, &["`def`"])),
            _ => Err(Self::unexpected(&tok, &["`def`", "`for`", "`with`"])),
        }
    }

    /// `def name(params) [-> type]: …`
    fn parse_funcdef(
        &mut self,
        decorators: Option<Node<'src>>,
        modifier: Option<Node<'src>>,
        start: Span,
    ) -> PResult<Node<'src>> {
        self.expect(Token::KwDef, "`def`")?;
        let name = self.expect_name()?;
        let open = self.expect(Token::LParen, "`(`")?;
        let params = self.parse_parameters(false)?;
        self.expect(Token::RParen, "`)`")?;
        let parameters = NodeBuilder::new(NodeKind::Parameters, open.span)
            .list("parameter_list", params)
            .finish(self.last);
        let return_type = match self.eat(Token::Arrow)? {
            Some(_) => Some(self.parse_type()?),
            None => None,
        };
        self.expect(Token::Colon, "`:`")?;
        let body = self.parse_suite("statement_list")?;
        Ok(NodeBuilder::new(NodeKind::FunctionDefinition, start)
            .optional("decorator_list", decorators)
            .optional("modifier_list", modifier)
            .node("name", name)
            .node("parameters", parameters)
            .optional("return_type_optional", return_type)
            .optional("body", body)
            .finish(self.last))
    }

    /// `class Name[(bases)]: …`
    fn parse_classdef(&mut self, decorators: Option<Node<'src>>, start: Span) -> PResult<Node<'src>> {
        self.expect(Token::KwClass, "`class`")?;
        let name = self.expect_name()?;
        let extends = match self.eat(Token::LParen)? {
            Some(open) => {
                let bases = self.parse_arguments()?;
                self.expect(Token::RParen, "`)`")?;
                Some(
                    NodeBuilder::new(NodeKind::ExtendsList, open.span)
                        .list("extends_type", bases)
                        .finish(self.last),
                )
            }
            None => None,
        };
        self.expect(Token::Colon, "`:`")?;
        let body = self.parse_suite("class_member_list")?;
        Ok(NodeBuilder::new(NodeKind::ClassDefinition, start)
            .optional("decorator_list_optional", decorators)
            .node("name", name)
            .optional("extends_list_optional", extends)
            .optional("body", body)
            .finish(self.last))
    }

    // ── Parameters ────────────────────────────────────────────────────────────

    /// Comma-separated parameters up to (not including) `)` for `def` or
    /// `:` for `lambda`.
    pub(super) fn parse_parameters(&mut self, lambda: bool) -> PResult<Vec<Node<'src>>> {
        let close = if lambda { Token::Colon } else { Token::RParen };
        let mut params = Vec::new();
        while !self.at(close)? {
            params.push(self.parse_parameter(lambda)?);
            if self.eat(Token::Comma)?.is_none() {
                break;
            }
        }
        Ok(params)
    }

    /// One parameter.
    ///
    /// `name: type` is a typed parameter only outside `lambda`: a lambda's
    /// parameter list never enters the typed-parameter rule, so the `:`
    /// that follows a lambda parameter always ends the list.
    fn parse_parameter(&mut self, lambda: bool) -> PResult<Node<'src>> {
        let tok = self.peek()?;
        let identifier = match tok.token {
            Token::Name(_) => {
                self.bump()?;
                Self::leaf(NodeKind::Identifier, &tok)
            }
            Token::Star | Token::DblStar => {
                self.bump()?;
                let kind = if tok.token == Token::Star {
                    NodeKind::ListSplatPattern
                } else {
                    NodeKind::DictionarySplatPattern
                };
                if tok.token == Token::Star && !matches!(self.peek_token()?, Token::Name(_)) {
                    // Bare `*`: keyword-only separator.
                    Self::leaf(NodeKind::Operator, &tok)
                } else {
                    let name = self.expect_name()?;
                    NodeBuilder::new(kind, tok.span)
                        .node("identifier", name)
                        .finish(self.last)
                }
            }
            Token::Slash => {
                self.bump()?;
                Self::leaf(NodeKind::Operator, &tok)
            }
            Token::LParen => {
                let group = self.parse_atom()?;
                self.to_pattern(group)?
            }
            _ => return Err(Self::unexpected(&tok, &["parameter"])),
        };

        let is_name = identifier.kind == NodeKind::Identifier;
        let can_annotate = is_name
            || matches!(
                identifier.kind,
                NodeKind::ListSplatPattern | NodeKind::DictionarySplatPattern
            );

        if !lambda && can_annotate && self.eat(Token::Colon)?.is_some() {
            let annotation = self.parse_type()?;
            if is_name && self.at(Token::Eq)? {
                let value = self.parse_parameter_value()?;
                return Ok(NodeBuilder::new(NodeKind::TypedDefaultParameter, tok.span)
                    .node("name", identifier)
                    .node("type_optional", annotation)
                    .node("parameter_value_optional", value)
                    .finish(self.last));
            }
            return Ok(NodeBuilder::new(NodeKind::TypedParameter, tok.span)
                .node("identifier", identifier)
                .node("type_optional", annotation)
                .empty("parameter_value_optional")
                .finish(self.last));
        }

        if is_name && self.at(Token::Eq)? {
            let value = self.parse_parameter_value()?;
            return Ok(NodeBuilder::new(NodeKind::TypedDefaultParameter, tok.span)
                .node("name", identifier)
                .empty("type_optional")
                .node("parameter_value_optional", value)
                .finish(self.last));
        }

        Ok(NodeBuilder::new(NodeKind::PlainParameter, tok.span)
            .node("identifier", identifier)
            .empty("type_optional")
            .empty("parameter_value_optional")
            .finish(self.last))
    }

    /// `= expression`
    fn parse_parameter_value(&mut self) -> PResult<Node<'src>> {
        let eq = self.expect(Token::Eq, "`=`")?;
        let value = self.parse_expression()?;
        Ok(NodeBuilder::new(NodeKind::ParameterValue, eq.span)
            .node("expression", value)
            .finish(self.last))
    }

    /// `type: expression`
    pub(super) fn parse_type(&mut self) -> PResult<Node<'src>> {
        let start = self.peek()?.span;
        let expression = self.parse_expression()?;
        Ok(NodeBuilder::new(NodeKind::Type, start)
            .node("expression", expression)
            .finish(self.last))
    }
}

/// Tokens that can start the first argument of `print x` but cannot continue
/// an expression whose left operand is `print`.
fn starts_print_argument(token: Token<'_>) -> bool {
    starts_expression(token)
        && binary(token).is_none()
        && !is_comparison(token)
        && !matches!(token, Token::LParen | Token::LBracket)
}
