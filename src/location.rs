use serde::Serialize;

/// Byte offset into the source buffer (0-indexed).
/// `u32` keeps tokens and nodes small; files >4 GB are not realistic.
pub type Offset = u32;

/// Largest source, in bytes, whose offsets fit in an [`Offset`].
pub const MAX_SOURCE_LEN: usize = Offset::MAX as usize;

/// Source region of a token or node.
///
/// `start`/`end` are byte offsets (half-open); `line`/`column` locate
/// `start` and are both 1-indexed, with `column` counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    pub start: Offset,
    pub end: Offset,
    pub line: u32,
    pub column: u32,
}

impl Span {
    /// A span running from the start of `self` to the end of `last`.
    pub fn to(self, last: Span) -> Span {
        Span {
            end: last.end.max(self.start),
            ..self
        }
    }

    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Slice the source text covered by this span.
    pub fn text<'src>(&self, source: &'src str) -> &'src str {
        source
            .get(self.start as usize..self.end as usize)
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_to_and_text() {
        let a = Span { start: 0, end: 1, line: 1, column: 1 };
        let b = Span { start: 4, end: 5, line: 1, column: 5 };
        let joined = a.to(b);
        assert_eq!(joined.len(), 5);
        assert_eq!(joined.text("x = 1\n"), "x = 1");
    }
}
