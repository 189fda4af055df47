//! Property-based tests for indentation handling.

use proptest::prelude::*;
use pysyntax::{ErrorKind, ParseOptions, Token, parse_with_options, tokenize};

/// Indentation depths for a well-formed block structure: the first line is
/// at depth 0 and each line is at most one level deeper than the previous.
fn depths_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0..5usize, 1..40).prop_map(|raw| {
        let mut depths = Vec::with_capacity(raw.len());
        let mut prev = 0;
        for (i, d) in raw.into_iter().enumerate() {
            let d = if i == 0 { 0 } else { d.min(prev + 1) };
            depths.push(d);
            prev = d;
        }
        depths
    })
}

/// Render depths as source; a line that opens a deeper block is a
/// compound statement header.
fn render(depths: &[usize], unit: &str, blank_lines: bool) -> String {
    let mut src = String::new();
    for (i, &d) in depths.iter().enumerate() {
        let opens = depths.get(i + 1).is_some_and(|&next| next > d);
        src.push_str(&unit.repeat(d));
        src.push_str(if opens { "if x:" } else { "x = 1" });
        src.push('\n');
        if blank_lines && i % 3 == 0 {
            src.push_str("\n   # comment at odd depth\n");
        }
    }
    src
}

fn count(tokens: &[pysyntax::SpannedToken<'_>], kind: Token<'_>) -> usize {
    tokens.iter().filter(|t| t.token == kind).count()
}

proptest! {
    #[test]
    fn test_indents_balance_dedents(depths in depths_strategy(), blank_lines in any::<bool>()) {
        let src = render(&depths, "    ", blank_lines);
        let tokens = tokenize(&src, &ParseOptions::default()).unwrap();
        prop_assert_eq!(count(&tokens, Token::Indent), count(&tokens, Token::Dedent));
        let opened = depths.windows(2).filter(|w| w[1] > w[0]).count();
        prop_assert_eq!(count(&tokens, Token::Indent), opened);
    }

    #[test]
    fn test_tab_indentation_parses(depths in depths_strategy()) {
        let src = render(&depths, "\t", false);
        prop_assert!(parse_with_options(&src, &ParseOptions::default()).is_ok());
    }

    #[test]
    fn test_dedent_to_unknown_width_is_indentation_error(width in 1..8usize) {
        let src = format!("if x:\n{}a\n{}b\n", " ".repeat(8), " ".repeat(width));
        let err = parse_with_options(&src, &ParseOptions::default()).unwrap_err();
        prop_assert_eq!(err.kind, ErrorKind::IndentationError);
        prop_assert_eq!(err.line, 3);
    }

    #[test]
    fn test_lexing_arbitrary_text_never_panics(src in "[a-z \t\n():'\"{}\\[\\]#=+\\\\]{0,64}") {
        let _ = tokenize(&src, &ParseOptions::default());
        let _ = parse_with_options(&src, &ParseOptions::default());
    }
}
