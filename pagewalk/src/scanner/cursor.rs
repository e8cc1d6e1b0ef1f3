//! Forward-only scan cursor.

use super::pattern::{find_tag, TagMatch, TagPattern};

/// Iterates over every tag matching a pattern, in document order.
///
/// The cursor owns nothing but its offset into a shared, immutable buffer,
/// so several cursors can walk the same document independently. After each
/// match the offset moves to the end of the matched value; once no further
/// match exists it is pinned at the end of the buffer.
#[derive(Debug, Clone)]
pub struct TagCursor<'a> {
    buf: &'a str,
    pattern: TagPattern,
    with_content: bool,
    offset: usize,
}

impl<'a> TagCursor<'a> {
    /// Creates a cursor at the start of `buf`.
    #[must_use]
    pub fn new(buf: &'a str, pattern: TagPattern) -> Self {
        Self {
            buf,
            pattern,
            with_content: false,
            offset: 0,
        }
    }

    /// Also captures each tag's inner content.
    #[must_use]
    pub fn with_content(mut self) -> Self {
        self.with_content = true;
        self
    }

    /// Current byte offset into the buffer.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether the cursor has reached the end of the buffer.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.offset >= self.buf.len()
    }
}

impl<'a> Iterator for TagCursor<'a> {
    type Item = TagMatch<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_exhausted() {
            return None;
        }
        match find_tag(self.buf, &self.pattern, self.offset, self.with_content) {
            Some(found) => {
                self.offset = found.range.end;
                Some(found)
            }
            None => {
                self.offset = self.buf.len();
                None
            }
        }
    }
}

impl std::iter::FusedIterator for TagCursor<'_> {}
