//! Node construction with the optional-with-placeholder policy.
//!
//! Every field a rule declares is written exactly once, in source order.  An
//! optional field that matched nothing, or a repeated field that matched zero
//! times, is written as [`Child::Empty`] instead of being left out.

use crate::ast::{Child, Field, Node, NodeKind};
use crate::location::Span;

pub struct NodeBuilder<'src> {
    kind: NodeKind,
    start: Span,
    fields: Vec<Field<'src>>,
}

impl<'src> NodeBuilder<'src> {
    pub fn new(kind: NodeKind, start: Span) -> Self {
        Self {
            kind,
            start,
            fields: Vec::new(),
        }
    }

    /// A required single-valued field.
    pub fn node(mut self, name: &'static str, node: Node<'src>) -> Self {
        self.fields.push(Field {
            name,
            value: Child::Node(Box::new(node)),
        });
        self
    }

    /// An optional field: placeholder when `None`.
    pub fn optional(self, name: &'static str, node: Option<Node<'src>>) -> Self {
        match node {
            Some(node) => self.node(name, node),
            None => self.empty(name),
        }
    }

    /// A repeated field: placeholder when nothing matched.
    pub fn list(mut self, name: &'static str, nodes: Vec<Node<'src>>) -> Self {
        if nodes.is_empty() {
            return self.empty(name);
        }
        self.fields.push(Field {
            name,
            value: Child::List(nodes),
        });
        self
    }

    /// A field whose grammar alternative can never match here.
    pub fn empty(mut self, name: &'static str) -> Self {
        self.fields.push(Field {
            name,
            value: Child::Empty,
        });
        self
    }

    /// Finish the node; its span runs from the start token to `end`.
    pub fn finish(self, end: Span) -> Node<'src> {
        Node {
            kind: self.kind,
            span: self.start.to(end),
            text: None,
            fields: self.fields,
        }
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

    #[test]
    fn test_absent_fields_become_placeholders() {
        let node = NodeBuilder::new(NodeKind::Return, span(0, 6))
            .optional("return_value_optional", None)
            .list("decorator_list", Vec::new())
            .finish(span(0, 6));
        assert_eq!(node.fields.len(), 2);
        assert!(node.is_placeholder("return_value_optional"));
        assert!(node.is_placeholder("decorator_list"));
        assert!(node.children("decorator_list").is_empty());
    }

    #[test]
    fn test_span_covers_start_to_end() {
        let leaf = Node::leaf(NodeKind::Identifier, span(7, 8), "x");
        let node = NodeBuilder::new(NodeKind::Return, span(0, 6))
            .optional("return_value_optional", Some(leaf))
            .finish(span(7, 8));
        assert_eq!((node.span.start, node.span.end), (0, 8));
        assert_eq!(node.child("return_value_optional").unwrap().text(), "x");
    }
}
