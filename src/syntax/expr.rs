//! Expression rules: precedence climbing over the ladder in
//! [`precedence`](super::precedence), atoms, displays and comprehensions,
//! and the reinterpretation of parsed expressions as assignment patterns.

use crate::ast::{Node, NodeKind};
use crate::error::{ErrorKind, ParseError, SyntaxError};
use crate::location::Span;

use super::builder::NodeBuilder;
use super::lexer::Token;
use super::parser::{PResult, Parser};
use super::precedence::{
    Assoc, CONDITIONAL, LAMBDA, NOT, POWER, TOP, UNARY, binary, boolean, is_comparison, is_unary,
    starts_expression, starts_primary,
};

impl<'src> Parser<'src, '_> {
    // ── Entry points ──────────────────────────────────────────────────────────

    /// A full expression.
    pub(super) fn parse_expression(&mut self) -> PResult<Node<'src>> {
        self.expression(TOP, false)
    }

    /// `primary_expression` with every binary operator.
    pub(super) fn parse_primary(&mut self) -> PResult<Node<'src>> {
        self.primary(0)
    }

    /// `expression (',' expression)* ','?`; a single expression without a
    /// comma is returned as is.
    pub(super) fn parse_expression_list(&mut self) -> PResult<Node<'src>> {
        let start = self.peek()?.span;
        let first = self.star_expression()?;
        self.expression_list_rest(first, start)
    }

    /// [`parse_expression_list`](Self::parse_expression_list) whose first
    /// element begins with an atom that was already consumed.
    pub(super) fn parse_expression_list_after(&mut self, atom: Node<'src>) -> PResult<Node<'src>> {
        let start = atom.span;
        let first = self.continue_expression(atom)?;
        self.expression_list_rest(first, start)
    }

    fn expression_list_rest(&mut self, first: Node<'src>, start: Span) -> PResult<Node<'src>> {
        if !self.at(Token::Comma)? {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(Token::Comma)?.is_some() {
            if !starts_expression(self.peek_token()?) {
                break;
            }
            items.push(self.star_expression()?);
        }
        Ok(NodeBuilder::new(NodeKind::ExpressionList, start)
            .list("expression", items)
            .finish(self.last))
    }

    /// `yield [expressions]` / `yield from expression`
    pub(super) fn parse_yield(&mut self) -> PResult<Node<'src>> {
        let kw = self.expect(Token::KwYield, "`yield`")?;
        let builder = NodeBuilder::new(NodeKind::Yield, kw.span);
        let node = if let Some(from) = self.eat(Token::KwFrom)? {
            let value = self.parse_expression()?;
            builder
                .node("modifier", Self::leaf(NodeKind::Operator, &from))
                .node("value_optional", value)
        } else if starts_expression(self.peek_token()?) {
            let value = self.parse_expression_list()?;
            builder.empty("modifier").node("value_optional", value)
        } else {
            builder.empty("modifier").empty("value_optional")
        };
        Ok(node.finish(self.last))
    }

    // ── Precedence climbing ───────────────────────────────────────────────────

    /// Parse an expression whose operators all bind tighter than `min`.
    ///
    /// `for_in` is set for the `in` operands of a comprehension clause,
    /// where a trailing `if` starts a filter instead of a conditional.
    fn expression(&mut self, min: i32, for_in: bool) -> PResult<Node<'src>> {
        let tok = self.peek()?;
        let lhs = match tok.token {
            Token::KwNot => {
                self.bump()?;
                let argument = self.expression(NOT, for_in)?;
                NodeBuilder::new(NodeKind::NotOperator, tok.span)
                    .node("argument", argument)
                    .finish(self.last)
            }
            Token::KwLambda => return self.lambda(for_in),
            _ => {
                let operand = self.primary(0)?;
                self.comparison_tail(operand)?
            }
        };
        self.named_tail(lhs, min, for_in)
    }

    /// `name := value` when `lhs` is a bare name, then the boolean and
    /// conditional tail.
    fn named_tail(&mut self, lhs: Node<'src>, min: i32, for_in: bool) -> PResult<Node<'src>> {
        if min <= TOP && lhs.kind == NodeKind::Identifier && self.at(Token::Walrus)? {
            self.bump()?;
            let value = self.expression(TOP, for_in)?;
            return Ok(NodeBuilder::new(NodeKind::NamedExpression, lhs.span)
                .node("name", lhs)
                .node("value", value)
                .finish(self.last));
        }
        self.expression_tail(lhs, min, for_in)
    }

    /// Boolean operators and the conditional, applied to an already parsed
    /// left operand.
    fn expression_tail(&mut self, mut lhs: Node<'src>, min: i32, for_in: bool) -> PResult<Node<'src>> {
        loop {
            let tok = self.peek()?;
            if let Some(prec) = boolean(tok.token) {
                if prec <= min {
                    break;
                }
                self.bump()?;
                let right = self.expression(prec, for_in)?;
                lhs = NodeBuilder::new(NodeKind::BooleanOperator, lhs.span)
                    .node("left", lhs)
                    .node("operator", Self::leaf(NodeKind::Operator, &tok))
                    .node("right", right)
                    .finish(self.last);
            } else if tok.token == Token::KwIf && !for_in && CONDITIONAL > min {
                self.bump()?;
                let condition = self.expression(CONDITIONAL, false)?;
                self.expect(Token::KwElse, "`else`")?;
                // One level below so a chained conditional nests to the right.
                let alternative = self.expression(CONDITIONAL - 1, for_in)?;
                lhs = NodeBuilder::new(NodeKind::ConditionalExpression, lhs.span)
                    .node("consequence", lhs)
                    .node("condition", condition)
                    .node("alternative", alternative)
                    .finish(self.last);
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    /// A primary expression: unary operators, postfix chains and binary
    /// operators above `min`.
    fn primary(&mut self, min: i32) -> PResult<Node<'src>> {
        let lhs = self.unary()?;
        self.binary_tail(lhs, min)
    }

    fn binary_tail(&mut self, mut lhs: Node<'src>, min: i32) -> PResult<Node<'src>> {
        loop {
            let tok = self.peek()?;
            let Some((prec, assoc)) = binary(tok.token) else {
                break;
            };
            if prec <= min {
                break;
            }
            self.bump()?;
            let right = match assoc {
                Assoc::Left => self.primary(prec)?,
                Assoc::Right => self.primary(prec - 1)?,
            };
            lhs = NodeBuilder::new(NodeKind::BinaryOperator, lhs.span)
                .node("left", lhs)
                .node("operator", Self::leaf(NodeKind::Operator, &tok))
                .node("right", right)
                .finish(self.last);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> PResult<Node<'src>> {
        let tok = self.peek()?;
        if is_unary(tok.token) {
            self.bump()?;
            // `**` on the right still binds tighter: `-a ** b` is `-(a ** b)`.
            let argument = self.primary(UNARY)?;
            return Ok(NodeBuilder::new(NodeKind::UnaryOperator, tok.span)
                .node("operator", Self::leaf(NodeKind::Operator, &tok))
                .node("argument", argument)
                .finish(self.last));
        }
        if tok.token == Token::KwAwait {
            self.bump()?;
            if !starts_primary(self.peek_token()?) {
                // No operand: `await` is a plain name here.
                return self.postfix(Self::leaf(NodeKind::Identifier, &tok));
            }
            let argument = self.primary(POWER)?;
            return Ok(NodeBuilder::new(NodeKind::Await, tok.span)
                .node("argument", argument)
                .finish(self.last));
        }
        let atom = self.parse_atom()?;
        self.postfix(atom)
    }

    /// `a < b <= c` as one n-ary node.
    fn comparison_tail(&mut self, first: Node<'src>) -> PResult<Node<'src>> {
        if !is_comparison(self.peek_token()?) {
            return Ok(first);
        }
        let start = first.span;
        let mut operands = vec![first];
        let mut operators = Vec::new();
        loop {
            let tok = self.peek()?;
            let operator = match tok.token {
                Token::Lt | Token::Gt | Token::Le | Token::Ge | Token::EqEq | Token::NotEq | Token::KwIn => {
                    self.bump()?;
                    Self::leaf(NodeKind::Operator, &tok)
                }
                Token::KwNot => {
                    self.bump()?;
                    let second = self.expect(Token::KwIn, "`in`")?;
                    self.joined_leaf(NodeKind::Operator, &tok, &second)
                }
                Token::KwIs => {
                    self.bump()?;
                    match self.eat(Token::KwNot)? {
                        Some(second) => self.joined_leaf(NodeKind::Operator, &tok, &second),
                        None => Self::leaf(NodeKind::Operator, &tok),
                    }
                }
                _ => break,
            };
            operators.push(operator);
            operands.push(self.primary(0)?);
        }
        Ok(NodeBuilder::new(NodeKind::ComparisonOperator, start)
            .list("operands", operands)
            .list("operators", operators)
            .finish(self.last))
    }

    /// Resume a full expression after its leading atom was parsed on its own.
    pub(super) fn continue_expression(&mut self, atom: Node<'src>) -> PResult<Node<'src>> {
        let lhs = self.postfix(atom)?;
        let lhs = self.binary_tail(lhs, 0)?;
        let lhs = self.comparison_tail(lhs)?;
        self.named_tail(lhs, TOP, false)
    }

    // ── Postfix ───────────────────────────────────────────────────────────────

    /// Attribute access, calls and subscripts.
    fn postfix(&mut self, mut node: Node<'src>) -> PResult<Node<'src>> {
        loop {
            let tok = self.peek()?;
            node = match tok.token {
                Token::Dot => {
                    self.bump()?;
                    let attribute = self.expect_name()?;
                    NodeBuilder::new(NodeKind::Attribute, node.span)
                        .node("object", node)
                        .node("attribute", attribute)
                        .finish(self.last)
                }
                Token::LParen => {
                    self.bump()?;
                    let arguments = self.parse_arguments()?;
                    self.expect(Token::RParen, "`)`")?;
                    let block = NodeBuilder::new(NodeKind::ArgumentListBlock, tok.span)
                        .list("argument_list", arguments)
                        .finish(self.last);
                    NodeBuilder::new(NodeKind::Call, node.span)
                        .node("function_", node)
                        .node("argument_list_block", block)
                        .finish(self.last)
                }
                Token::LBracket => {
                    self.bump()?;
                    let mut items = Vec::new();
                    loop {
                        items.push(self.subscript_item()?);
                        if self.eat(Token::Comma)?.is_none() || self.at(Token::RBracket)? {
                            break;
                        }
                    }
                    self.expect(Token::RBracket, "`]`")?;
                    NodeBuilder::new(NodeKind::Subscript, node.span)
                        .node("value", node)
                        .list("subscript", items)
                        .finish(self.last)
                }
                _ => return Ok(node),
            };
        }
    }

    /// An index expression or `start:stop:step` with every part optional.
    fn subscript_item(&mut self) -> PResult<Node<'src>> {
        let first = self.peek()?;
        let start = if first.token == Token::Colon {
            None
        } else {
            let index = self.parse_expression()?;
            if !self.at(Token::Colon)? {
                return Ok(index);
            }
            Some(index)
        };
        self.expect(Token::Colon, "`:`")?;
        let stop = self.slice_bound()?;
        let step = match self.eat(Token::Colon)? {
            Some(_) => self.slice_bound()?,
            None => None,
        };
        Ok(NodeBuilder::new(NodeKind::Slice, first.span)
            .optional("start", start)
            .optional("stop", stop)
            .optional("step", step)
            .finish(self.last))
    }

    fn slice_bound(&mut self) -> PResult<Option<Node<'src>>> {
        match self.peek_token()? {
            Token::Colon | Token::Comma | Token::RBracket => Ok(None),
            _ => self.parse_expression().map(Some),
        }
    }

    /// Call arguments up to the closing `)`, which is left unconsumed.
    pub(super) fn parse_arguments(&mut self) -> PResult<Vec<Node<'src>>> {
        let mut arguments = Vec::new();
        while !self.at(Token::RParen)? {
            arguments.push(self.argument()?);
            if self.eat(Token::Comma)?.is_none() {
                break;
            }
        }
        Ok(arguments)
    }

    fn argument(&mut self) -> PResult<Node<'src>> {
        match self.peek_token()? {
            Token::Star => return self.list_splat(),
            Token::DblStar => return self.dictionary_splat(),
            _ => {}
        }
        let value = self.parse_expression()?;
        if value.kind == NodeKind::Identifier && self.at(Token::Eq)? {
            self.bump()?;
            let argument = self.parse_expression()?;
            return Ok(NodeBuilder::new(NodeKind::KeywordArgument, value.span)
                .node("name", value)
                .node("value", argument)
                .finish(self.last));
        }
        if self.at_comprehension()? {
            let start = value.span;
            let clauses = self.comprehension_clauses()?;
            return Ok(NodeBuilder::new(NodeKind::Generator, start)
                .node("body", value)
                .list("clauses", clauses)
                .finish(self.last));
        }
        Ok(value)
    }

    // ── Atoms ─────────────────────────────────────────────────────────────────

    pub(super) fn parse_atom(&mut self) -> PResult<Node<'src>> {
        let tok = self.peek()?;
        let kind = match tok.token {
            Token::Name(_) | Token::KwAsync | Token::KwAwait => NodeKind::Identifier,
            Token::Int => NodeKind::Integer,
            Token::Float => NodeKind::Float,
            Token::KwTrue => NodeKind::True,
            Token::KwFalse => NodeKind::False,
            Token::KwNone => NodeKind::None,
            Token::Ellipsis => NodeKind::Ellipsis,
            Token::StringStart => return self.strings(),
            Token::LParen => return self.parenthesized(),
            Token::LBracket => return self.list_display(),
            Token::LBrace => return self.brace_display(),
            _ => return Err(Self::unexpected(&tok, &["expression"])),
        };
        self.bump()?;
        Ok(Self::leaf(kind, &tok))
    }

    /// `(` … `)`: empty tuple, generator, tuple, parenthesized splat or
    /// parenthesized expression.
    fn parenthesized(&mut self) -> PResult<Node<'src>> {
        let open = self.bump()?;
        if self.eat(Token::RParen)?.is_some() {
            return Ok(NodeBuilder::new(NodeKind::Tuple, open.span)
                .empty("list_element")
                .finish(self.last));
        }
        let first = self.element()?;
        if first.kind != NodeKind::ListSplat && self.at_comprehension()? {
            let clauses = self.comprehension_clauses()?;
            self.expect(Token::RParen, "`)`")?;
            return Ok(NodeBuilder::new(NodeKind::Generator, open.span)
                .node("body", first)
                .list("clauses", clauses)
                .finish(self.last));
        }
        if self.at(Token::Comma)? {
            let elements = self.elements(first, Token::RParen)?;
            self.expect(Token::RParen, "`)`")?;
            return Ok(NodeBuilder::new(NodeKind::Tuple, open.span)
                .list("list_element", elements)
                .finish(self.last));
        }
        self.expect(Token::RParen, "`)`")?;
        Ok(NodeBuilder::new(NodeKind::ParenthesizedExpression, open.span)
            .node("expression", first)
            .finish(self.last))
    }

    /// `[` … `]`: list or list comprehension.
    fn list_display(&mut self) -> PResult<Node<'src>> {
        let open = self.bump()?;
        if self.eat(Token::RBracket)?.is_some() {
            return Ok(NodeBuilder::new(NodeKind::List, open.span)
                .empty("list_element")
                .finish(self.last));
        }
        let first = self.element()?;
        if first.kind != NodeKind::ListSplat && self.at_comprehension()? {
            let clauses = self.comprehension_clauses()?;
            self.expect(Token::RBracket, "`]`")?;
            return Ok(NodeBuilder::new(NodeKind::ListComprehension, open.span)
                .node("body", first)
                .list("clauses", clauses)
                .finish(self.last));
        }
        let elements = self.elements(first, Token::RBracket)?;
        self.expect(Token::RBracket, "`]`")?;
        Ok(NodeBuilder::new(NodeKind::List, open.span)
            .list("list_element", elements)
            .finish(self.last))
    }

    /// `{` … `}`: dictionary, set, or their comprehensions.  The first
    /// element decides which.
    fn brace_display(&mut self) -> PResult<Node<'src>> {
        let open = self.bump()?;
        if self.eat(Token::RBrace)?.is_some() {
            return Ok(NodeBuilder::new(NodeKind::Dictionary, open.span)
                .empty("key_value_pair_list")
                .finish(self.last));
        }

        let first = if self.at(Token::DblStar)? {
            self.dictionary_splat()?
        } else {
            let key = self.element()?;
            if key.kind != NodeKind::ListSplat && self.eat(Token::Colon)?.is_some() {
                let value = self.parse_expression()?;
                NodeBuilder::new(NodeKind::KeyValuePair, key.span)
                    .node("key_value_pair_key", key)
                    .node("key_value_pair_value", value)
                    .finish(self.last)
            } else {
                key
            }
        };

        let is_dictionary = matches!(first.kind, NodeKind::KeyValuePair | NodeKind::DictionarySplat);
        if first.kind != NodeKind::DictionarySplat
            && first.kind != NodeKind::ListSplat
            && self.at_comprehension()?
        {
            let kind = if is_dictionary {
                NodeKind::DictionaryComprehension
            } else {
                NodeKind::SetComprehension
            };
            let clauses = self.comprehension_clauses()?;
            self.expect(Token::RBrace, "`}`")?;
            return Ok(NodeBuilder::new(kind, open.span)
                .node("body", first)
                .list("clauses", clauses)
                .finish(self.last));
        }

        let mut items = vec![first];
        while self.eat(Token::Comma)?.is_some() {
            if self.at(Token::RBrace)? {
                break;
            }
            let item = if is_dictionary {
                self.dictionary_item()?
            } else {
                self.element()?
            };
            items.push(item);
        }
        self.expect(Token::RBrace, "`}`")?;

        let node = if is_dictionary {
            NodeBuilder::new(NodeKind::Dictionary, open.span).list("key_value_pair_list", items)
        } else {
            NodeBuilder::new(NodeKind::Set, open.span).list("list_element", items)
        };
        Ok(node.finish(self.last))
    }

    fn dictionary_item(&mut self) -> PResult<Node<'src>> {
        if self.at(Token::DblStar)? {
            return self.dictionary_splat();
        }
        let key = self.parse_expression()?;
        self.expect(Token::Colon, "`:`")?;
        let value = self.parse_expression()?;
        Ok(NodeBuilder::new(NodeKind::KeyValuePair, key.span)
            .node("key_value_pair_key", key)
            .node("key_value_pair_value", value)
            .finish(self.last))
    }

    /// Remaining comma-separated elements after `first`, up to `close`.
    fn elements(&mut self, first: Node<'src>, close: Token<'src>) -> PResult<Vec<Node<'src>>> {
        let mut elements = vec![first];
        while self.eat(Token::Comma)?.is_some() {
            if self.at(close)? {
                break;
            }
            elements.push(self.element()?);
        }
        Ok(elements)
    }

    /// A display element: expression, `*` splat or `yield`.
    fn element(&mut self) -> PResult<Node<'src>> {
        match self.peek_token()? {
            Token::KwYield => self.parse_yield(),
            _ => self.star_expression(),
        }
    }

    fn star_expression(&mut self) -> PResult<Node<'src>> {
        if self.at(Token::Star)? {
            self.list_splat()
        } else {
            self.parse_expression()
        }
    }

    fn list_splat(&mut self) -> PResult<Node<'src>> {
        let star = self.expect(Token::Star, "`*`")?;
        let expression = self.parse_expression()?;
        Ok(NodeBuilder::new(NodeKind::ListSplat, star.span)
            .node("expression", expression)
            .finish(self.last))
    }

    fn dictionary_splat(&mut self) -> PResult<Node<'src>> {
        let stars = self.expect(Token::DblStar, "`**`")?;
        let expression = self.parse_expression()?;
        Ok(NodeBuilder::new(NodeKind::DictionarySplat, stars.span)
            .node("expression", expression)
            .finish(self.last))
    }

    // ── Comprehensions ────────────────────────────────────────────────────────

    fn at_comprehension(&mut self) -> PResult<bool> {
        Ok(matches!(self.peek_token()?, Token::KwFor | Token::KwAsync))
    }

    /// `for_in_clause (for_in_clause | if_clause_comprehension)*`
    fn comprehension_clauses(&mut self) -> PResult<Vec<Node<'src>>> {
        let mut clauses = Vec::new();
        loop {
            let tok = self.peek()?;
            let clause = match tok.token {
                Token::KwFor | Token::KwAsync => self.for_in_clause()?,
                Token::KwIf => {
                    self.bump()?;
                    let condition = self.expression(TOP, true)?;
                    NodeBuilder::new(NodeKind::IfClauseComprehension, tok.span)
                        .node("condition", condition)
                        .finish(self.last)
                }
                _ => break,
            };
            clauses.push(clause);
        }
        Ok(clauses)
    }

    fn for_in_clause(&mut self) -> PResult<Node<'src>> {
        let start = self.peek()?.span;
        let modifier = match self.eat(Token::KwAsync)? {
            Some(kw) => Some(Self::leaf(NodeKind::AsyncModifier, &kw)),
            None => None,
        };
        self.expect(Token::KwFor, "`for`")?;
        let left = self.parse_target_list()?;
        self.expect(Token::KwIn, "`in`")?;
        let mut right = vec![self.expression(TOP, true)?];
        while self.eat(Token::Comma)?.is_some() {
            if !starts_expression(self.peek_token()?) {
                break;
            }
            right.push(self.expression(TOP, true)?);
        }
        Ok(NodeBuilder::new(NodeKind::ForInClause, start)
            .optional("modifier_list", modifier)
            .node("left", left)
            .list("right", right)
            .finish(self.last))
    }

    // ── Lambda ────────────────────────────────────────────────────────────────

    /// `lambda [params]: body`.  Parameters are parsed with the typed
    /// parameter rule switched off, so the first `:` always ends them.
    fn lambda(&mut self, for_in: bool) -> PResult<Node<'src>> {
        let kw = self.expect(Token::KwLambda, "`lambda`")?;
        let parameters = if self.at(Token::Colon)? {
            None
        } else {
            let start = self.peek()?.span;
            let params = self.parse_parameters(true)?;
            Some(
                NodeBuilder::new(NodeKind::LambdaParameters, start)
                    .list("parameter", params)
                    .finish(self.last),
            )
        };
        self.expect(Token::Colon, "`:`")?;
        let body = self.expression(LAMBDA, for_in)?;
        Ok(NodeBuilder::new(NodeKind::Lambda, kw.span)
            .optional("parameter_list", parameters)
            .node("return_value", body)
            .finish(self.last))
    }

    // ── Strings ───────────────────────────────────────────────────────────────

    /// One string, or adjacent strings as a `concatenated_string`.
    fn strings(&mut self) -> PResult<Node<'src>> {
        let first = self.string()?;
        if !self.at(Token::StringStart)? {
            return Ok(first);
        }
        let start = first.span;
        let mut strings = vec![first];
        while self.at(Token::StringStart)? {
            strings.push(self.string()?);
        }
        Ok(NodeBuilder::new(NodeKind::ConcatenatedString, start)
            .list("string", strings)
            .finish(self.last))
    }

    pub(super) fn string(&mut self) -> PResult<Node<'src>> {
        let open = self.expect(Token::StringStart, "string")?;
        let mut parts = Vec::new();
        let close = loop {
            let tok = self.peek()?;
            match tok.token {
                Token::StringContent => {
                    self.bump()?;
                    parts.push(Self::leaf(NodeKind::StringContent, &tok));
                }
                Token::EscapeSequence => {
                    self.bump()?;
                    parts.push(Self::leaf(NodeKind::EscapeSequence, &tok));
                }
                Token::InterpolationOpen => parts.push(self.interpolation(NodeKind::Interpolation)?),
                Token::StringEnd => break self.bump()?,
                _ => return Err(Self::unexpected(&tok, &["string content"])),
            }
        };
        Ok(NodeBuilder::new(NodeKind::String, open.span)
            .node("string_start", Self::leaf(NodeKind::StringStart, &open))
            .list("string_text", parts)
            .node("string_end", Self::leaf(NodeKind::StringEnd, &close))
            .finish(self.last))
    }

    /// `{ expression [!conversion] [:format_spec] }`.  Nested `{…}` inside a
    /// format specifier use the same shape with `kind` = `FormatExpression`.
    fn interpolation(&mut self, kind: NodeKind) -> PResult<Node<'src>> {
        let open = self.expect(Token::InterpolationOpen, "`{`")?;
        let expression = if self.at(Token::KwYield)? {
            self.parse_yield()?
        } else {
            self.parse_expression_list()?
        };

        let conversion = match self.eat(Token::TypeConversion)? {
            Some(tok) => Some(Self::leaf(NodeKind::TypeConversion, &tok)),
            None => None,
        };

        let format_spec = match self.eat(Token::Colon)? {
            Some(colon) => {
                let mut content = Vec::new();
                loop {
                    let tok = self.peek()?;
                    match tok.token {
                        Token::StringContent => {
                            self.bump()?;
                            content.push(Self::leaf(NodeKind::StringContent, &tok));
                        }
                        Token::InterpolationOpen => {
                            content.push(self.interpolation(NodeKind::FormatExpression)?)
                        }
                        Token::InterpolationClose => break,
                        _ => return Err(Self::unexpected(&tok, &["`}`"])),
                    }
                }
                Some(
                    NodeBuilder::new(NodeKind::FormatSpecifier, colon.span)
                        .list("content", content)
                        .finish(self.last),
                )
            }
            None => None,
        };

        self.expect(Token::InterpolationClose, "`}`")?;
        Ok(NodeBuilder::new(kind, open.span)
            .node("expression", expression)
            .optional("type_conversion", conversion)
            .optional("format_specifier", format_spec)
            .finish(self.last))
    }

    // ── Patterns ──────────────────────────────────────────────────────────────

    /// A single assignment target (`for` loops, `as` bindings).
    pub(super) fn parse_target(&mut self) -> PResult<Node<'src>> {
        let tok = self.peek()?;
        let node = if tok.token == Token::Star {
            self.bump()?;
            let atom = self.parse_atom()?;
            let inner = self.postfix(atom)?;
            NodeBuilder::new(NodeKind::ListSplat, tok.span)
                .node("expression", inner)
                .finish(self.last)
        } else {
            let atom = self.parse_atom()?;
            self.postfix(atom)?
        };
        self.to_pattern(node)
    }

    /// `pattern (',' pattern)* ','?`, stopping before `in`.
    pub(super) fn parse_target_list(&mut self) -> PResult<Node<'src>> {
        let start = self.peek()?.span;
        let first = self.parse_target()?;
        if !self.at(Token::Comma)? {
            return Ok(first);
        }
        let mut patterns = vec![first];
        while self.eat(Token::Comma)?.is_some() {
            let next = self.peek_token()?;
            if next == Token::KwIn || !starts_expression(next) {
                break;
            }
            patterns.push(self.parse_target()?);
        }
        Ok(NodeBuilder::new(NodeKind::PatternList, start)
            .list("pattern", patterns)
            .finish(self.last))
    }

    /// Reinterpret an already parsed expression as an assignment pattern.
    ///
    /// The left side of `=` and friends is parsed once with the expression
    /// rules; this converts it in place rather than re-scanning.
    pub(super) fn to_pattern(&self, node: Node<'src>) -> PResult<Node<'src>> {
        let span = node.span;
        match node.kind {
            NodeKind::Identifier
            | NodeKind::Attribute
            | NodeKind::Subscript
            | NodeKind::ListSplatPattern
            | NodeKind::TuplePattern
            | NodeKind::ListPattern
            | NodeKind::PatternList => Ok(node),
            NodeKind::ListSplat => {
                let inner = node.into_child("expression");
                match inner {
                    Some(inner)
                        if matches!(
                            inner.kind,
                            NodeKind::Identifier | NodeKind::Attribute | NodeKind::Subscript
                        ) =>
                    {
                        Ok(NodeBuilder::new(NodeKind::ListSplatPattern, span)
                            .node("identifier", inner)
                            .finish(span))
                    }
                    _ => Err(self.invalid_target(span)),
                }
            }
            NodeKind::ParenthesizedExpression => match node.into_child("expression") {
                Some(inner) => self.to_pattern(inner),
                None => Err(self.invalid_target(span)),
            },
            NodeKind::Tuple => self.patterns(NodeKind::TuplePattern, node, "list_element"),
            NodeKind::List => self.patterns(NodeKind::ListPattern, node, "list_element"),
            NodeKind::ExpressionList => self.patterns(NodeKind::PatternList, node, "expression"),
            _ => Err(self.invalid_target(span)),
        }
    }

    fn patterns(&self, kind: NodeKind, node: Node<'src>, field: &str) -> PResult<Node<'src>> {
        let span = node.span;
        let patterns = node
            .into_children(field)
            .into_iter()
            .map(|n| self.to_pattern(n))
            .collect::<PResult<Vec<_>>>()?;
        Ok(NodeBuilder::new(kind, span)
            .list("pattern", patterns)
            .finish(span))
    }

    fn invalid_target(&self, span: Span) -> ParseError {
        SyntaxError::new(
            ErrorKind::UnexpectedTokenError,
            "invalid assignment target",
            span,
            span.text(self.src),
        )
        .into()
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Node, NodeKind};
    use crate::error::{ErrorKind, SyntaxError};
    use crate::parse;

    /// The expression of a single expression statement.
    fn expr(src: &str) -> Node<'_> {
        let root = parse(src).unwrap();
        let stmt = &root.children("statement_list")[0];
        assert_eq!(stmt.kind, NodeKind::ExpressionStatement, "{src:?}");
        stmt.children("expression")[0].clone()
    }

    fn err(src: &str) -> SyntaxError {
        parse(src).unwrap_err()
    }

    fn op<'a>(node: &'a Node<'_>) -> &'a str {
        node.child("operator").unwrap().text()
    }

    // ── precedence ────────────────────────────────────────────────────────────

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        let e = expr("a + b * c\n");
        assert_eq!(e.kind, NodeKind::BinaryOperator);
        assert_eq!(op(&e), "+");
        assert_eq!(e.child("right").unwrap().kind, NodeKind::BinaryOperator);
    }

    #[test]
    fn test_subtraction_is_left_associative() {
        let e = expr("a - b - c\n");
        let left = e.child("left").unwrap();
        assert_eq!(left.kind, NodeKind::BinaryOperator);
        assert_eq!(e.child("right").unwrap().text(), "c");
    }

    #[test]
    fn test_power_is_right_associative() {
        let e = expr("a ** b ** c\n");
        assert_eq!(e.child("left").unwrap().text(), "a");
        assert_eq!(e.child("right").unwrap().kind, NodeKind::BinaryOperator);
    }

    #[test]
    fn test_power_binds_tighter_than_unary_minus() {
        let e = expr("-a ** b\n");
        assert_eq!(e.kind, NodeKind::UnaryOperator);
        assert_eq!(e.child("argument").unwrap().kind, NodeKind::BinaryOperator);

        let e = expr("a ** -b\n");
        assert_eq!(e.kind, NodeKind::BinaryOperator);
        assert_eq!(e.child("right").unwrap().kind, NodeKind::UnaryOperator);
    }

    #[test]
    fn test_call_binds_tighter_than_power() {
        let e = expr("a ** f(x).y\n");
        assert_eq!(e.child("right").unwrap().kind, NodeKind::Attribute);
    }

    #[test]
    fn test_bitwise_ladder() {
        let e = expr("a | b & c ^ d << 1\n");
        assert_eq!(op(&e), "|");
        let right = e.child("right").unwrap();
        assert_eq!(op(right), "&");
        assert_eq!(op(right.child("right").unwrap()), "^");
    }

    #[test]
    fn test_comparison_chain_is_one_node() {
        let e = expr("a < b <= c\n");
        assert_eq!(e.kind, NodeKind::ComparisonOperator);
        assert_eq!(e.children("operands").len(), 3);
        let ops: Vec<&str> = e.children("operators").iter().map(|n| n.text()).collect();
        assert_eq!(ops, vec!["<", "<="]);
    }

    #[test]
    fn test_two_word_comparison_operators() {
        let e = expr("a not in b is not c\n");
        let ops: Vec<&str> = e.children("operators").iter().map(|n| n.text()).collect();
        assert_eq!(ops, vec!["not in", "is not"]);
    }

    #[test]
    fn test_comparison_operands_are_primaries() {
        let e = expr("a + 1 == b and c\n");
        assert_eq!(e.kind, NodeKind::BooleanOperator);
        let cmp = e.child("left").unwrap();
        assert_eq!(cmp.kind, NodeKind::ComparisonOperator);
        assert_eq!(cmp.children("operands")[0].kind, NodeKind::BinaryOperator);
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let e = expr("a or b and c\n");
        assert_eq!(op(&e), "or");
        assert_eq!(op(e.child("right").unwrap()), "and");
    }

    #[test]
    fn test_not_absorbs_boolean_operators() {
        let e = expr("not a and b\n");
        assert_eq!(e.kind, NodeKind::NotOperator);
        assert_eq!(e.child("argument").unwrap().kind, NodeKind::BooleanOperator);
    }

    #[test]
    fn test_conditional_nests_to_the_right() {
        let e = expr("a if b else c if d else e\n");
        assert_eq!(e.kind, NodeKind::ConditionalExpression);
        assert_eq!(e.child("consequence").unwrap().text(), "a");
        assert_eq!(
            e.child("alternative").unwrap().kind,
            NodeKind::ConditionalExpression
        );
    }

    #[test]
    fn test_conditional_binds_looser_than_or() {
        let e = expr("a or b if c or d else e\n");
        assert_eq!(e.kind, NodeKind::ConditionalExpression);
        assert_eq!(e.child("consequence").unwrap().kind, NodeKind::BooleanOperator);
        assert_eq!(e.child("condition").unwrap().kind, NodeKind::BooleanOperator);
    }

    #[test]
    fn test_conditional_requires_else() {
        let e = err("a if b\n");
        assert_eq!(e.kind, ErrorKind::UnexpectedTokenError);
        assert_eq!(e.expected, vec!["`else`"]);
    }

    #[test]
    fn test_await_and_walrus() {
        let e = expr("await f() + 1\n");
        assert_eq!(e.kind, NodeKind::BinaryOperator);
        assert_eq!(e.child("left").unwrap().kind, NodeKind::Await);

        let e = expr("(n := len(a)) > 10\n");
        let paren = &e.children("operands")[0];
        assert_eq!(
            paren.child("expression").unwrap().kind,
            NodeKind::NamedExpression
        );
    }

    // ── lambda ────────────────────────────────────────────────────────────────

    #[test]
    fn test_lambda_parameters_are_untyped() {
        let e = expr("lambda x, y=1, *a, **k: x + 1\n");
        assert_eq!(e.kind, NodeKind::Lambda);
        let params = e.child("parameter_list").unwrap().children("parameter");
        assert_eq!(params.len(), 4);
        assert!(params.iter().all(|p| p.kind != NodeKind::TypedParameter));
        assert_eq!(e.child("return_value").unwrap().kind, NodeKind::BinaryOperator);
    }

    #[test]
    fn test_lambda_without_parameters() {
        let e = expr("lambda: 0\n");
        assert!(e.is_placeholder("parameter_list"));
    }

    #[test]
    fn test_lambda_body_absorbs_conditional() {
        let e = expr("lambda: a if b else c\n");
        assert_eq!(
            e.child("return_value").unwrap().kind,
            NodeKind::ConditionalExpression
        );
    }

    #[test]
    fn test_typed_lambda_parameter_is_error() {
        let e = err("lambda x: int: x\n");
        assert_eq!(e.kind, ErrorKind::UnexpectedTokenError);
    }

    // ── postfix ───────────────────────────────────────────────────────────────

    #[test]
    fn test_call_arguments() {
        let e = expr("f(a, *b, c=1, **d)\n");
        assert_eq!(e.kind, NodeKind::Call);
        assert_eq!(e.child("function_").unwrap().text(), "f");
        let args = e
            .child("argument_list_block")
            .unwrap()
            .children("argument_list");
        let kinds: Vec<NodeKind> = args.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Identifier,
                NodeKind::ListSplat,
                NodeKind::KeywordArgument,
                NodeKind::DictionarySplat,
            ]
        );
    }

    #[test]
    fn test_empty_argument_list_is_placeholder() {
        let e = expr("f()\n");
        let block = e.child("argument_list_block").unwrap();
        assert!(block.is_placeholder("argument_list"));
    }

    #[test]
    fn test_bare_generator_argument() {
        let e = expr("sum(x * x for x in xs if x)\n");
        let args = e
            .child("argument_list_block")
            .unwrap()
            .children("argument_list");
        assert_eq!(args[0].kind, NodeKind::Generator);
        assert_eq!(args[0].children("clauses").len(), 2);
    }

    #[test]
    fn test_subscripts_and_slices() {
        let e = expr("a[1:2, ::3, :, i]\n");
        assert_eq!(e.kind, NodeKind::Subscript);
        let items = e.children("subscript");
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].kind, NodeKind::Slice);
        assert!(items[0].is_placeholder("step"));
        assert!(items[1].is_placeholder("start"));
        assert!(items[1].is_placeholder("stop"));
        assert_eq!(items[1].child("step").unwrap().text(), "3");
        assert!(items[2].is_placeholder("step"));
        assert_eq!(items[3].kind, NodeKind::Identifier);
    }

    #[test]
    fn test_method_chain() {
        let e = expr("a.b(c)[d].e\n");
        assert_eq!(e.kind, NodeKind::Attribute);
        assert_eq!(e.child("object").unwrap().kind, NodeKind::Subscript);
    }

    // ── displays ──────────────────────────────────────────────────────────────

    #[test]
    fn test_parenthesized_forms() {
        assert_eq!(expr("()\n").kind, NodeKind::Tuple);
        assert!(expr("()\n").is_placeholder("list_element"));
        assert_eq!(expr("(a)\n").kind, NodeKind::ParenthesizedExpression);
        assert_eq!(expr("(a,)\n").kind, NodeKind::Tuple);
        assert_eq!(expr("(a, b)\n").children("list_element").len(), 2);
        assert_eq!(expr("(x for x in y)\n").kind, NodeKind::Generator);
    }

    #[test]
    fn test_parenthesized_splat_is_not_a_tuple() {
        let e = expr("(*a)\n");
        assert_eq!(e.kind, NodeKind::ParenthesizedExpression);
        assert_eq!(e.child("expression").unwrap().kind, NodeKind::ListSplat);
        assert_eq!(expr("(*a,)\n").kind, NodeKind::Tuple);
    }

    #[test]
    fn test_list_and_comprehension() {
        let e = expr("[1, *rest, 3,]\n");
        assert_eq!(e.kind, NodeKind::List);
        assert_eq!(e.children("list_element").len(), 3);
        assert!(expr("[]\n").is_placeholder("list_element"));

        let e = expr("[x for x in a for y in b if x if y]\n");
        assert_eq!(e.kind, NodeKind::ListComprehension);
        let kinds: Vec<NodeKind> = e.children("clauses").iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::ForInClause,
                NodeKind::ForInClause,
                NodeKind::IfClauseComprehension,
                NodeKind::IfClauseComprehension,
            ]
        );
    }

    #[test]
    fn test_comprehension_filter_is_not_a_conditional() {
        let e = expr("[x for x in a if b]\n");
        let clauses = e.children("clauses");
        assert_eq!(clauses[0].children("right")[0].text(), "a");
        assert_eq!(clauses[1].kind, NodeKind::IfClauseComprehension);
    }

    #[test]
    fn test_async_comprehension() {
        let e = expr("[x async for x in aiter()]\n");
        let clause = &e.children("clauses")[0];
        assert_eq!(clause.child("modifier_list").unwrap().text(), "async");
    }

    #[test]
    fn test_dictionary_set_and_comprehensions() {
        let e = expr("{}\n");
        assert_eq!(e.kind, NodeKind::Dictionary);
        assert!(e.is_placeholder("key_value_pair_list"));

        let e = expr("{'a': 1, **rest}\n");
        let items = e.children("key_value_pair_list");
        assert_eq!(items[0].kind, NodeKind::KeyValuePair);
        assert_eq!(items[1].kind, NodeKind::DictionarySplat);

        assert_eq!(expr("{1, 2}\n").kind, NodeKind::Set);
        assert_eq!(expr("{k: v for k, v in d}\n").kind, NodeKind::DictionaryComprehension);
        assert_eq!(expr("{x for x in s}\n").kind, NodeKind::SetComprehension);
    }

    #[test]
    fn test_concatenated_strings() {
        let e = expr("'a' \"b\" f'{c}'\n");
        assert_eq!(e.kind, NodeKind::ConcatenatedString);
        assert_eq!(e.children("string").len(), 3);
        assert_eq!(expr("'a'\n").kind, NodeKind::String);
    }

    #[test]
    fn test_empty_string_text_is_placeholder() {
        let e = expr("''\n");
        assert!(e.is_placeholder("string_text"));
        assert_eq!(e.child("string_start").unwrap().text(), "'");
    }

    #[test]
    fn test_fstring_with_conversion_and_nested_spec() {
        let e = expr("f\"{a!r:>{width}}\"\n");
        let parts = e.children("string_text");
        assert_eq!(parts.len(), 1);
        let interp = &parts[0];
        assert_eq!(interp.kind, NodeKind::Interpolation);
        assert_eq!(interp.child("expression").unwrap().text(), "a");
        assert_eq!(interp.child("type_conversion").unwrap().text(), "!r");
        let spec = interp.child("format_specifier").unwrap();
        let content = spec.children("content");
        assert_eq!(content[0].text(), ">");
        assert_eq!(content[1].kind, NodeKind::FormatExpression);
        assert_eq!(content[1].child("expression").unwrap().text(), "width");
    }

    #[test]
    fn test_yield_forms() {
        let root = crate::parse("def g():\n    yield\n    yield a, b\n    yield from c\n").unwrap();
        let body = root.children("statement_list")[0]
            .child("body")
            .unwrap()
            .children("statement_list");
        let yields: Vec<&Node<'_>> = body.iter().map(|s| &s.children("expression")[0]).collect();
        assert!(yields[0].is_placeholder("value_optional"));
        assert_eq!(
            yields[1].child("value_optional").unwrap().kind,
            NodeKind::ExpressionList
        );
        assert_eq!(yields[2].child("modifier").unwrap().text(), "from");
    }

    #[test]
    fn test_missing_operand_reports_expected_expression() {
        let e = err("a + \n");
        assert_eq!(e.kind, ErrorKind::UnexpectedTokenError);
        assert_eq!(e.expected, vec!["expression"]);
        assert_eq!(e.offending_token_text, "newline");
    }
}
