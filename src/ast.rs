//! Concrete syntax tree types.
//!
//! Design goals:
//! - Zero-copy: leaf text borrows `&'src str` slices from the source buffer.
//! - Uniform: every node is a [`NodeKind`] tag plus an ordered list of named
//!   [`Field`]s, so consumers walk one shape instead of one struct per rule.
//! - No absent fields: an optional or repeated grammar field that matched
//!   nothing is still present, holding [`Child::Empty`].  Consumers never
//!   need to ask "was this optional?".

use serde::Serialize;

use crate::location::Span;

// ── Node kinds ───────────────────────────────────────────────────────────────

/// Rule names of the grammar.  Serialised in `snake_case`, which is the
/// rule's name in the grammar (`NodeKind::IfClause` → `"if_clause"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Program,
    /// Indented (or inline) statement sequence following a `:`.
    Block,

    // ── simple statements ───────────────────────────────────────────────────
    ImportStatement,
    ImportFromStatement,
    FutureImportStatement,
    DottedName,
    AliasedImport,
    RelativeImport,
    ImportPrefix,
    WildcardImport,
    AssertStatement,
    ExpressionStatement,
    Assignment,
    AugmentedAssignment,
    Return,
    ReturnValue,
    DeleteStatement,
    RaiseStatement,
    PlaceholderStatement,
    BreakStatement,
    ContinueStatement,
    GlobalStatement,
    NonlocalStatement,
    /// Legacy `print x, y` / `print >>f, x`.
    PrintStatement,
    /// `>> file` target of a legacy print statement.
    Chevron,
    /// Legacy `exec "code" in globals`.
    ExecStatement,

    // ── compound statements ─────────────────────────────────────────────────
    If,
    IfClause,
    ElseIfClause,
    ElseClause,
    For,
    ForEachClause,
    While,
    WhileClause,
    Try,
    TryClause,
    TryOnlyFinally,
    TryOptionalFinally,
    Catch,
    CatchParameter,
    FinallyClause,
    With,
    WithClause,
    WithItem,
    WithItemAlias,
    FunctionDefinition,
    ClassDefinition,
    ExtendsList,
    DecoratorList,
    Decorator,
    AsyncModifier,

    // ── parameters ──────────────────────────────────────────────────────────
    Parameters,
    LambdaParameters,
    PlainParameter,
    TypedParameter,
    TypedDefaultParameter,
    ParameterValue,
    Type,

    // ── patterns ────────────────────────────────────────────────────────────
    ListSplatPattern,
    DictionarySplatPattern,
    TuplePattern,
    ListPattern,
    PatternList,

    // ── expressions ─────────────────────────────────────────────────────────
    Identifier,
    Integer,
    Float,
    True,
    False,
    None,
    Ellipsis,
    String,
    ConcatenatedString,
    StringStart,
    StringContent,
    EscapeSequence,
    StringEnd,
    Interpolation,
    TypeConversion,
    FormatSpecifier,
    FormatExpression,
    UnaryOperator,
    BinaryOperator,
    ComparisonOperator,
    NotOperator,
    BooleanOperator,
    Await,
    Lambda,
    ConditionalExpression,
    NamedExpression,
    Attribute,
    Subscript,
    Slice,
    Call,
    ArgumentListBlock,
    KeywordArgument,
    ListSplat,
    DictionarySplat,
    List,
    Set,
    Tuple,
    Dictionary,
    KeyValuePair,
    ListComprehension,
    SetComprehension,
    DictionaryComprehension,
    Generator,
    ParenthesizedExpression,
    ForInClause,
    IfClauseComprehension,
    Yield,
    ExpressionList,
    /// Operator or keyword leaf stored in an `operator`-style field
    /// (`+`, `not in`, `is not`, `from`, a bare `*` separator, …).
    Operator,
}

// ── Fields ───────────────────────────────────────────────────────────────────

/// Value of a named field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Child<'src> {
    Node(Box<Node<'src>>),
    List(Vec<Node<'src>>),
    /// Placeholder for an optional/repeated field that matched nothing.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field<'src> {
    pub name: &'static str,
    pub value: Child<'src>,
}

// ── Node ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node<'src> {
    pub kind: NodeKind,
    pub span: Span,
    /// Source text for token leaves; `None` for interior nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'src str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field<'src>>,
}

impl<'src> Node<'src> {
    /// A token leaf.
    pub fn leaf(kind: NodeKind, span: Span, text: &'src str) -> Self {
        Self {
            kind,
            span,
            text: Some(text),
            fields: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.text.is_some()
    }

    pub fn text(&self) -> &'src str {
        self.text.unwrap_or("")
    }

    pub fn field(&self, name: &str) -> Option<&Child<'src>> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.value)
    }

    /// The node held by a single-valued field; `None` for a placeholder.
    pub fn child(&self, name: &str) -> Option<&Node<'src>> {
        match self.field(name)? {
            Child::Node(n) => Some(n),
            _ => None,
        }
    }

    /// The nodes held by a repeated field; empty for a placeholder.
    pub fn children(&self, name: &str) -> &[Node<'src>] {
        match self.field(name) {
            Some(Child::List(nodes)) => nodes,
            Some(Child::Node(n)) => std::slice::from_ref(n.as_ref()),
            _ => &[],
        }
    }

    /// `true` when `name` exists on this node and holds the placeholder.
    pub fn is_placeholder(&self, name: &str) -> bool {
        matches!(self.field(name), Some(Child::Empty))
    }

    /// Direct child nodes in field order.
    pub fn child_nodes(&self) -> impl Iterator<Item = &Node<'src>> {
        self.fields.iter().flat_map(|f| match &f.value {
            Child::Node(n) => std::slice::from_ref(n.as_ref()),
            Child::List(nodes) => nodes.as_slice(),
            Child::Empty => &[],
        })
    }

    /// All token leaves below this node, ordered by source position.
    pub fn leaves(&self) -> Vec<&Node<'src>> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out.sort_by_key(|n| n.span.start);
        out
    }

    /// Move out the node held by a single-valued field.
    pub fn into_child(self, name: &str) -> Option<Node<'src>> {
        match self.fields.into_iter().find(|f| f.name == name)?.value {
            Child::Node(n) => Some(*n),
            _ => None,
        }
    }

    /// Move out the nodes held by a repeated field.
    pub fn into_children(self, name: &str) -> Vec<Node<'src>> {
        match self.fields.into_iter().find(|f| f.name == name).map(|f| f.value) {
            Some(Child::List(nodes)) => nodes,
            Some(Child::Node(n)) => vec![*n],
            _ => Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.child_nodes().map(Node::node_count).sum::<usize>()
    }
}

fn collect_leaves<'a, 'src>(node: &'a Node<'src>, out: &mut Vec<&'a Node<'src>>) {
    if node.is_leaf() {
        out.push(node);
    }
    for child in node.child_nodes() {
        collect_leaves(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: u32, end: u32) -> Span {
        Span {
            start,
            end,
            line: 1,
            column: start + 1,
        }
    }

    fn sample() -> Node<'static> {
        Node {
            kind: NodeKind::Return,
            span: span(0, 8),
            text: None,
            fields: vec![
                Field {
                    name: "return_value_optional",
                    value: Child::Empty,
                },
                Field {
                    name: "extra",
                    value: Child::List(vec![
                        Node::leaf(NodeKind::Identifier, span(7, 8), "b"),
                        Node::leaf(NodeKind::Identifier, span(5, 6), "a"),
                    ]),
                },
            ],
        }
    }

    #[test]
    fn test_placeholder_is_present_but_empty() {
        let n = sample();
        assert!(n.is_placeholder("return_value_optional"));
        assert!(n.child("return_value_optional").is_none());
        assert!(n.children("return_value_optional").is_empty());
        assert!(n.field("missing").is_none());
        assert!(!n.is_placeholder("missing"));
    }

    #[test]
    fn test_leaves_in_source_order() {
        let n = sample();
        let texts: Vec<&str> = n.leaves().iter().map(|l| l.text()).collect();
        assert_eq!(texts, vec!["a", "b"]);
        assert_eq!(n.node_count(), 3);
    }

    #[test]
    fn test_serialises_snake_case_kinds() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["kind"], "return");
        assert_eq!(json["fields"][0]["value"], "empty");
        assert_eq!(json["fields"][1]["value"]["list"][0]["kind"], "identifier");
    }
}
