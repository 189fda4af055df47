//! Scanner and recursive-descent parser.
//!
//! `lexer` + `strings` turn source text into tokens (layout tokens, string
//! parts and interpolation boundaries included); `parser`, `expr` and `stmt`
//! turn tokens into the named-field tree of [`crate::ast`].

pub mod builder;
mod expr;
pub mod lexer;
pub mod parser;
pub mod precedence;
mod stmt;
mod strings;

pub use lexer::{Lexer, SpannedToken, Token};
pub use parser::Parser;
