//! A zero-copy concrete syntax parser for Python source.
//!
//! ```
//! let tree = pysyntax::parse("x = 1\n").unwrap();
//! assert_eq!(tree.kind, pysyntax::NodeKind::Program);
//! assert_eq!(tree.children("statement_list").len(), 1);
//! ```

pub mod ast;
pub mod chars;
pub mod check;
pub mod discovery;
pub mod error;
pub mod location;
pub mod parser;
pub mod syntax;
pub mod types;

pub use ast::{Child, Field, Node, NodeKind};
pub use error::{ErrorKind, ParseError, SyntaxError};
pub use location::Span;
pub use parser::{MixedIndentation, ParseOptions, parse, parse_with_cancel, parse_with_options, tokenize};
pub use syntax::{SpannedToken, Token};
