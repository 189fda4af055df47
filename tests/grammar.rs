//! End-to-end parser behaviour through the public API.

use pysyntax::{
    ErrorKind, MixedIndentation, Node, NodeKind, ParseOptions, parse, parse_with_options,
};

const SAMPLE: &str = r#"
import os
from .util import (helper as h, other,)

@decorator(arg=1)
class Shape(Base, metaclass=Meta):
    """Docstring with an escape\n."""
    sides: int = 0

    def __init__(self, *args, scale: float = 1.0, **kwargs) -> None:
        super().__init__(*args, **kwargs)
        self.scale = scale

    async def area(self, /, precise=False):
        async with self.lock as _:
            total = sum(x ** 2 for x in self.values if x)
        return await self.compute(total) if precise else -total

def main(argv):
    try:
        data = {k: v for k, v in zip(argv[1::2], argv[2::2])}
    except (KeyError, ValueError) as e:
        raise SystemExit(f"bad args: {e!r:>{width}}") from e
    else:
        pass
    finally:
        print('done', end='')
    while not data or len(data) < 3 and flag:
        data |= {'x': [1, 2, *rest]}
    for i, (a, b) in enumerate(pairs):
        if a < b <= c:
            continue
        elif a is not None and b not in seen:
            break
    return lambda x, y=2: x + y
"#;

fn statements<'a>(tree: &'a Node<'a>) -> &'a [Node<'a>] {
    tree.children("statement_list")
}

fn find<'a, 'src>(node: &'a Node<'src>, kind: NodeKind) -> Option<&'a Node<'src>> {
    if node.kind == kind {
        return Some(node);
    }
    node.child_nodes().find_map(|child| find(child, kind))
}

// ── whole-file behaviour ──────────────────────────────────────────────────────

#[test]
fn test_sample_parses() {
    let tree = parse(SAMPLE).unwrap();
    let kinds: Vec<NodeKind> = statements(&tree).iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![
            NodeKind::ImportStatement,
            NodeKind::ImportFromStatement,
            NodeKind::ClassDefinition,
            NodeKind::FunctionDefinition,
        ]
    );
}

#[test]
fn test_leaves_round_trip_to_source() {
    let tree = parse(SAMPLE).unwrap();
    let leaves = tree.leaves();
    assert!(leaves.len() > 100);
    for leaf in &leaves {
        assert_eq!(leaf.span.text(SAMPLE), leaf.text(), "{leaf:?}");
    }
    for pair in leaves.windows(2) {
        assert!(pair[0].span.end <= pair[1].span.start, "{pair:?}");
    }
}

#[test]
fn test_parsing_is_deterministic() {
    assert_eq!(parse(SAMPLE).unwrap(), parse(SAMPLE).unwrap());
}

#[test]
fn test_tree_serialises_to_json() {
    let tree = parse("x = 1\n").unwrap();
    let json = serde_json::to_value(&tree).unwrap();
    assert_eq!(json["kind"], "program");
    let stmt = &json["fields"][0]["value"]["list"][0];
    assert_eq!(stmt["kind"], "assignment");
    assert_eq!(stmt["fields"][1]["name"], "type_optional");
    assert_eq!(stmt["fields"][1]["value"], "empty");
}

// ── documented properties ─────────────────────────────────────────────────────

#[test]
fn test_chained_comparison_is_single_node() {
    let tree = parse("a < b <= c\n").unwrap();
    let cmp = &statements(&tree)[0].children("expression")[0];
    assert_eq!(cmp.kind, NodeKind::ComparisonOperator);
    assert_eq!(cmp.children("operands").len(), 3);
    assert_eq!(cmp.children("operators").len(), 2);
    assert!(find(cmp, NodeKind::BinaryOperator).is_none());
}

#[test]
fn test_lambda_parameter_lists_are_untyped() {
    let tree = parse("lambda x: x + 1\n").unwrap();
    let lambda = &statements(&tree)[0].children("expression")[0];
    let params = lambda.child("parameter_list").unwrap().children("parameter");
    assert_eq!(params[0].kind, NodeKind::PlainParameter);

    let err = parse("lambda x: int: x\n").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnexpectedTokenError);
}

#[test]
fn test_try_routes_through_two_branches() {
    let tree = parse("try:\n    pass\nfinally:\n    pass\n").unwrap();
    let branch = statements(&tree)[0].child("try_branch").unwrap();
    assert_eq!(branch.kind, NodeKind::TryOnlyFinally);
    assert!(branch.children("catch_list").is_empty());

    let tree = parse("try:\n  pass\nexcept E:\n  pass\n").unwrap();
    let branch = statements(&tree)[0].child("try_branch").unwrap();
    assert_eq!(branch.kind, NodeKind::TryOptionalFinally);
    assert_eq!(branch.children("catch_list").len(), 1);
}

#[test]
fn test_format_string_with_conversion_and_nested_spec() {
    let tree = parse("f\"{a!r:>{width}}\"\n").unwrap();
    let interp = find(&tree, NodeKind::Interpolation).unwrap();
    assert_eq!(interp.child("expression").unwrap().text(), "a");
    assert_eq!(interp.child("type_conversion").unwrap().text(), "!r");
    let nested = find(interp, NodeKind::FormatExpression).unwrap();
    assert_eq!(nested.child("expression").unwrap().text(), "width");
}

#[test]
fn test_absent_parts_are_placeholders() {
    let tree = parse("def f():\n    g()\n").unwrap();
    let def = &statements(&tree)[0];
    assert!(def.child("parameters").unwrap().is_placeholder("parameter_list"));
    assert!(def.is_placeholder("return_type_optional"));
    assert!(def.is_placeholder("decorator_list"));
    let call = find(def, NodeKind::Call).unwrap();
    assert!(
        call.child("argument_list_block")
            .unwrap()
            .is_placeholder("argument_list")
    );
}

#[test]
fn test_not_binds_looser_than_and() {
    let tree = parse("not a and b\n").unwrap();
    let expr = &statements(&tree)[0].children("expression")[0];
    assert_eq!(expr.kind, NodeKind::NotOperator);
}

// ── errors ────────────────────────────────────────────────────────────────────

#[test]
fn test_inconsistent_dedent() {
    let err = parse("if x:\n        a\n    b\n").unwrap_err();
    assert_eq!(err.kind, ErrorKind::IndentationError);
    assert_eq!((err.line, err.column), (3, 1));
    assert_eq!(err.offending_token_text, "    ");
}

#[test]
fn test_unterminated_string_reports_opening_position() {
    let err = parse("x = 1\ny = '''abc\n").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnterminatedStringError);
    assert_eq!((err.line, err.column), (2, 5));
}

#[test]
fn test_unterminated_bracket() {
    let err = parse("x = [1,\n  2,\n").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnterminatedBracketError);
    assert_eq!((err.line, err.column), (1, 5));
    assert_eq!(err.offending_token_text, "[");
}

#[test]
fn test_invalid_escape() {
    let err = parse("s = '\\x4'\n").unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidEscapeSequenceError);
    assert_eq!(err.line, 1);
}

#[test]
fn test_unexpected_token_lists_expectations() {
    let err = parse("def f(x) pass\n").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnexpectedTokenError);
    assert_eq!(err.expected, vec!["`:`"]);
    assert_eq!(err.offending_token_text, "pass");
    assert_eq!(err.to_string(), "1:10: UnexpectedTokenError: expected `:`, found `pass`");
}

// ── options ───────────────────────────────────────────────────────────────────

#[test]
fn test_tab_width_option_changes_block_structure() {
    // A tab is one level of 4 with tab_width 4, so the two lines are siblings.
    let src = "if x:\n\ta\n    b\n";
    let narrow = ParseOptions {
        tab_width: 4,
        ..ParseOptions::default()
    };
    let tree = parse_with_options(src, &narrow).unwrap();
    let body = statements(&tree)[0]
        .child("if_clause")
        .unwrap()
        .child("body")
        .unwrap();
    assert_eq!(body.children("statement_list").len(), 2);

    // With the default width 8 the second line dedents to an unknown width.
    let err = parse(src).unwrap_err();
    assert_eq!(err.kind, ErrorKind::IndentationError);
}

#[test]
fn test_reject_mixed_indentation() {
    let src = "if x:\n \tpass\n";
    assert!(parse(src).is_ok());
    let strict = ParseOptions {
        mixed_indentation: MixedIndentation::Reject,
        ..ParseOptions::default()
    };
    let err = parse_with_options(src, &strict).unwrap_err();
    assert_eq!(err.kind, ErrorKind::IndentationError);
    assert_eq!(err.line, 2);
}
