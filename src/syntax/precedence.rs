//! Operator precedence table.
//!
//! Levels use the grammar's numbering, low → high.  Negative levels sit
//! below every binary operator.  Binary and unary operators take *primary*
//! operands; `not`, `and`, `or`, the conditional and `lambda` take full
//! expressions.  So a comparison chain always attaches to the primaries beside
//! it, even though the grammar ranks comparisons below `or`.  Postfix
//! operators (attribute, call, subscript) bind tightest and are applied by
//! the atom loop rather than looked up here.

use super::lexer::Token;

pub const LAMBDA: i32 = -2;
pub const CONDITIONAL: i32 = -1;
pub const NOT: i32 = 1;
pub const OR: i32 = 10;
pub const AND: i32 = 11;
pub const BITWISE_OR: i32 = 12;
pub const BITWISE_AND: i32 = 13;
pub const XOR: i32 = 14;
pub const SHIFT: i32 = 15;
pub const PLUS: i32 = 16;
pub const TIMES: i32 = 17;
pub const UNARY: i32 = 18;
pub const POWER: i32 = 19;

/// Threshold that admits every operator: a full expression.
pub const TOP: i32 = LAMBDA - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
}

/// Level and associativity of a binary (primary-operand) operator.
pub fn binary(token: Token<'_>) -> Option<(i32, Assoc)> {
    let entry = match token {
        Token::Pipe => (BITWISE_OR, Assoc::Left),
        Token::Amp => (BITWISE_AND, Assoc::Left),
        Token::Caret => (XOR, Assoc::Left),
        Token::LShift | Token::RShift => (SHIFT, Assoc::Left),
        Token::Plus | Token::Minus => (PLUS, Assoc::Left),
        Token::Star | Token::Slash | Token::DblSlash | Token::Percent | Token::At => {
            (TIMES, Assoc::Left)
        }
        Token::DblStar => (POWER, Assoc::Right),
        _ => return None,
    };
    Some(entry)
}

/// Level of a boolean operator; both are left-associative.
pub fn boolean(token: Token<'_>) -> Option<i32> {
    match token {
        Token::KwOr => Some(OR),
        Token::KwAnd => Some(AND),
        _ => None,
    }
}

pub fn is_unary(token: Token<'_>) -> bool {
    matches!(token, Token::Plus | Token::Minus | Token::Tilde)
}

/// Tokens that begin a comparison operator (`not` only as `not in`, `is`
/// optionally as `is not`).
pub fn is_comparison(token: Token<'_>) -> bool {
    matches!(
        token,
        Token::Lt
            | Token::Gt
            | Token::Le
            | Token::Ge
            | Token::EqEq
            | Token::NotEq
            | Token::KwIn
            | Token::KwNot
            | Token::KwIs
    )
}

/// Tokens that can begin an expression or a starred element.
pub fn starts_expression(token: Token<'_>) -> bool {
    starts_primary(token) || matches!(token, Token::Star | Token::KwNot | Token::KwLambda)
}

/// Tokens that can begin an `await` or unary operand.  `async` and `await`
/// double as identifiers.
pub fn starts_primary(token: Token<'_>) -> bool {
    matches!(
        token,
        Token::Name(_)
            | Token::Int
            | Token::Float
            | Token::StringStart
            | Token::LParen
            | Token::LBracket
            | Token::LBrace
            | Token::Plus
            | Token::Minus
            | Token::Tilde
            | Token::Ellipsis
            | Token::KwAsync
            | Token::KwAwait
            | Token::KwTrue
            | Token::KwFalse
            | Token::KwNone
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_order() {
        let ladder = [
            LAMBDA,
            CONDITIONAL,
            NOT,
            OR,
            AND,
            BITWISE_OR,
            BITWISE_AND,
            XOR,
            SHIFT,
            PLUS,
            TIMES,
            UNARY,
            POWER,
        ];
        assert!(ladder.windows(2).all(|w| w[0] < w[1]));
        assert!(TOP < LAMBDA);
    }

    #[test]
    fn test_only_power_is_right_associative() {
        assert_eq!(binary(Token::DblStar), Some((POWER, Assoc::Right)));
        assert_eq!(binary(Token::Minus), Some((PLUS, Assoc::Left)));
        assert_eq!(binary(Token::At), Some((TIMES, Assoc::Left)));
        assert_eq!(binary(Token::KwAnd), None);
        assert_eq!(boolean(Token::KwAnd), Some(AND));
    }

    #[test]
    fn test_primary_starts_are_expression_starts() {
        assert!(starts_primary(Token::KwAwait));
        assert!(starts_primary(Token::Minus));
        assert!(!starts_primary(Token::KwNot));
        assert!(starts_expression(Token::KwNot));
        assert!(starts_expression(Token::Star));
        assert!(!starts_expression(Token::RShift));
    }
}
