//! Tag patterns and the single-tag locator.

use std::ops::Range;

/// The literal delimiters that identify one kind of tag and its attribute value.
///
/// Every delimiter is matched ASCII case-insensitively. Each one is searched
/// strictly after the previous delimiter's end; nothing is ever searched
/// backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagPattern {
    /// Opening marker of the tag, e.g. `<img`.
    pub start_marker: &'static str,
    /// Delimiter right before the attribute value, e.g. `src="`.
    pub value_start: &'static str,
    /// Delimiter right after the attribute value.
    pub value_end: &'static str,
    /// Delimiter opening the inner content.
    pub content_start: &'static str,
    /// Closing tag ending the inner content, e.g. `</a>`.
    pub content_end: &'static str,
}

impl TagPattern {
    /// `<img src="...">`.
    pub const IMAGE: Self = Self {
        start_marker: "<img",
        value_start: "src=\"",
        value_end: "\"",
        content_start: ">",
        content_end: "</img>",
    };

    /// `<a href="...">content</a>`.
    pub const ANCHOR: Self = Self {
        start_marker: "<a",
        value_start: "href=\"",
        value_end: "\"",
        content_start: ">",
        content_end: "</a>",
    };
}

/// A located attribute value, plus the tag's inner text when requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatch<'a> {
    /// Byte range of the value inside the scanned buffer.
    pub range: Range<usize>,
    /// The value text.
    pub value: &'a str,
    /// Inner content between the content delimiters, if requested and found.
    pub content: Option<&'a str>,
}

/// Finds the next tag matching `pattern` at or after byte offset `from`.
///
/// Returns `None` when the start marker, the value-start delimiter or the
/// value-end delimiter is missing from the remaining text. When
/// `with_content` is set and a content delimiter is missing, the match is
/// still returned with `content: None`.
///
/// Callers advance past `range.end` before the next call.
#[must_use]
pub fn find_tag<'a>(
    buf: &'a str,
    pattern: &TagPattern,
    from: usize,
    with_content: bool,
) -> Option<TagMatch<'a>> {
    let marker = find_ignore_ascii_case(buf, pattern.start_marker, from)?;
    let value_start = find_ignore_ascii_case(
        buf,
        pattern.value_start,
        marker + pattern.start_marker.len(),
    )? + pattern.value_start.len();
    let value_end = find_ignore_ascii_case(buf, pattern.value_end, value_start)?;

    let content = if with_content {
        find_content(buf, pattern, value_end + pattern.value_end.len())
    } else {
        None
    };

    Some(TagMatch {
        range: value_start..value_end,
        value: &buf[value_start..value_end],
        content,
    })
}

fn find_content<'a>(buf: &'a str, pattern: &TagPattern, from: usize) -> Option<&'a str> {
    let start = find_ignore_ascii_case(buf, pattern.content_start, from)? + pattern.content_start.len();
    let end = find_ignore_ascii_case(buf, pattern.content_end, start)?;
    Some(&buf[start..end])
}

/// Byte offset of the first ASCII case-insensitive occurrence of `needle` at or after `from`.
///
/// Match offsets are always char boundaries because a match begins with the
/// needle's first byte, which is never a UTF-8 continuation byte.
fn find_ignore_ascii_case(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let hay = haystack.as_bytes().get(from..)?;
    let needle = needle.as_bytes();
    if needle.is_empty() {
        return Some(from);
    }
    hay.windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
        .map(|pos| from + pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_image_value() {
        let html = r#"<p>x</p><img class="a" src="/img/1.jpg" alt="one">"#;
        let m = find_tag(html, &TagPattern::IMAGE, 0, false).unwrap();

        assert_eq!(m.value, "/img/1.jpg");
        assert_eq!(&html[m.range.clone()], "/img/1.jpg");
        assert!(m.content.is_none());
    }

    #[test]
    fn test_case_insensitive_markers() {
        let html = r#"<A HREF="/page/2">Next</A>"#;
        let m = find_tag(html, &TagPattern::ANCHOR, 0, true).unwrap();

        assert_eq!(m.value, "/page/2");
        assert_eq!(m.content, Some("Next"));
    }

    #[test]
    fn test_content_keeps_raw_inner_text() {
        let html = r#"<a href="/p/3" class="btn"> Next </a>"#;
        let m = find_tag(html, &TagPattern::ANCHOR, 0, true).unwrap();
        assert_eq!(m.content, Some(" Next "));
    }

    #[test]
    fn test_missing_attribute_is_not_found() {
        let html = r#"<img alt="no source">"#;
        assert!(find_tag(html, &TagPattern::IMAGE, 0, false).is_none());
    }

    #[test]
    fn test_unterminated_value_is_not_found() {
        let html = r#"<img src="/broken.jpg"#;
        assert!(find_tag(html, &TagPattern::IMAGE, 0, false).is_none());
    }

    #[test]
    fn test_missing_closing_tag_still_returns_value() {
        let html = r#"<a href="/next">Next"#;
        let m = find_tag(html, &TagPattern::ANCHOR, 0, true).unwrap();

        assert_eq!(m.value, "/next");
        assert!(m.content.is_none());
    }

    #[test]
    fn test_search_starts_at_offset() {
        let html = r#"<img src="a.jpg"><img src="b.jpg">"#;
        let first = find_tag(html, &TagPattern::IMAGE, 0, false).unwrap();
        let second = find_tag(html, &TagPattern::IMAGE, first.range.end, false).unwrap();

        assert_eq!(first.value, "a.jpg");
        assert_eq!(second.value, "b.jpg");
        assert!(find_tag(html, &TagPattern::IMAGE, second.range.end, false).is_none());
    }

    #[test]
    fn test_empty_value() {
        let html = r#"<img src="">"#;
        let m = find_tag(html, &TagPattern::IMAGE, 0, false).unwrap();
        assert_eq!(m.value, "");
        assert!(m.range.start > 0);
    }

    #[test]
    fn test_multibyte_text_around_tags() {
        let html = r#"<p>图片</p><a href="/p/2">下一页</a>"#;
        let m = find_tag(html, &TagPattern::ANCHOR, 0, true).unwrap();

        assert_eq!(m.value, "/p/2");
        assert_eq!(m.content, Some("下一页"));
    }

    #[test]
    fn test_offset_past_end() {
        assert!(find_tag("<img src=\"a\">", &TagPattern::IMAGE, 100, false).is_none());
    }
}
