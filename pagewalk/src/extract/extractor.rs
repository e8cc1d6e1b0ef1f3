//! Single-page extraction.

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::origin::Origin;
use super::result::ExtractionResult;
use crate::scanner::{TagCursor, TagPattern};
use crate::settings::GallerySettings;

/// Counters describing one extraction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Image URLs kept.
    pub images_found: usize,
    /// `<img>` values dropped because they did not resolve to a URL.
    pub images_skipped: usize,
    /// `<a>` tags with an `href` value that were examined.
    pub anchors_seen: usize,
    /// Label-matching anchors dropped because their `href` did not resolve.
    pub links_skipped: usize,
}

/// Extracts image links and pagination links from HTML.
#[derive(Debug, Clone)]
pub struct PageExtractor {
    origin: Origin,
    next_label: String,
    last_label: String,
}

impl PageExtractor {
    /// Creates an extractor resolving against `origin`.
    ///
    /// Labels are matched exactly and case-sensitively against an anchor's
    /// inner content.
    #[must_use]
    pub fn new(origin: Origin, next_label: impl Into<String>, last_label: impl Into<String>) -> Self {
        Self {
            origin,
            next_label: next_label.into(),
            last_label: last_label.into(),
        }
    }

    /// Creates an extractor using the labels from `settings`.
    #[must_use]
    pub fn from_settings(origin: Origin, settings: &GallerySettings) -> Self {
        Self::new(
            origin,
            settings.next_page_label.clone(),
            settings.last_page_label.clone(),
        )
    }

    /// The origin relative links are resolved against.
    #[must_use]
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Extracts one page. Returns `None` when the page has no usable image URL.
    #[must_use]
    pub fn extract(&self, html: &str) -> Option<ExtractionResult> {
        self.extract_with_stats(html).0
    }

    /// Extracts one page and reports what was skipped along the way.
    ///
    /// Three cursors walk the document independently: one over `<img>` tags
    /// and two over `<a>` tags (previous label, next label). They advance in
    /// turn until each has reached the end. When several anchors carry the
    /// same label, the last one in the document is kept.
    #[must_use]
    pub fn extract_with_stats(&self, html: &str) -> (Option<ExtractionResult>, ScanStats) {
        let mut stats = ScanStats::default();
        let mut image_urls: Vec<Url> = Vec::new();
        let mut last_page_link = None;
        let mut next_page_link = None;

        let mut images = TagCursor::new(html, TagPattern::IMAGE);
        let mut last_anchors = TagCursor::new(html, TagPattern::ANCHOR).with_content();
        let mut next_anchors = TagCursor::new(html, TagPattern::ANCHOR).with_content();

        while !(images.is_exhausted() && last_anchors.is_exhausted() && next_anchors.is_exhausted()) {
            if let Some(tag) = images.next() {
                match self.origin.process_url(tag.value) {
                    Some(url) => image_urls.push(url),
                    None => stats.images_skipped += 1,
                }
            }

            if let Some(tag) = last_anchors.next() {
                stats.anchors_seen += 1;
                if tag.content == Some(self.last_label.as_str()) {
                    match self.origin.process_url(tag.value) {
                        Some(url) => last_page_link = Some(url),
                        None => stats.links_skipped += 1,
                    }
                }
            }

            if let Some(tag) = next_anchors.next() {
                if tag.content == Some(self.next_label.as_str()) {
                    match self.origin.process_url(tag.value) {
                        Some(url) => next_page_link = Some(url),
                        None => stats.links_skipped += 1,
                    }
                }
            }
        }

        stats.images_found = image_urls.len();
        if stats.images_skipped > 0 || stats.links_skipped > 0 {
            debug!(
                images_skipped = stats.images_skipped,
                links_skipped = stats.links_skipped,
                "Dropped unresolvable attribute values"
            );
        }

        (
            ExtractionResult::new(image_urls, next_page_link, last_page_link),
            stats,
        )
    }
}

/// Extracts one page with explicit labels.
///
/// Shorthand for building a [`PageExtractor`] and calling
/// [`extract`](PageExtractor::extract).
#[must_use]
pub fn extract_page(
    html: &str,
    origin: &Origin,
    next_label: &str,
    last_label: &str,
) -> Option<ExtractionResult> {
    PageExtractor::new(origin.clone(), next_label, last_label).extract(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn origin() -> Origin {
        Origin::parse("https://example.com").unwrap()
    }

    fn image_strs(result: &ExtractionResult) -> Vec<&str> {
        result.image_urls().iter().map(Url::as_str).collect()
    }

    #[test]
    fn test_images_in_document_order() {
        let html = r#"
            <html><body>
              <img src="/img/1.jpg">
              <p><img class="big" src="https://cdn.example.com/2.jpg" alt="two"></p>
              <IMG SRC="//static.example.org/3.png">
            </body></html>
        "#;
        let result = extract_page(html, &origin(), "Next", "Prev").unwrap();

        assert_eq!(
            image_strs(&result),
            vec![
                "https://example.com/img/1.jpg",
                "https://cdn.example.com/2.jpg",
                "https://static.example.org/3.png",
            ]
        );
        assert!(result.next_page_link().is_none());
        assert!(result.last_page_link().is_none());
    }

    #[test]
    fn test_no_images_is_absent_even_with_links() {
        let html = r#"<a href="/p/2">Next</a><a href="/p/0">Prev</a>"#;
        assert!(extract_page(html, &origin(), "Next", "Prev").is_none());
    }

    #[test]
    fn test_pagination_links_found() {
        let html = r#"
            <a href="/gallery?p=1">Prev</a>
            <img src="/a.jpg">
            <a href="/gallery/3">Next</a>
        "#;
        let result = extract_page(html, &origin(), "Next", "Prev").unwrap();

        assert_eq!(
            result.next_page_link().map(Url::as_str),
            Some("https://example.com/gallery/3")
        );
        assert_eq!(
            result.last_page_link().map(Url::as_str),
            Some("https://example.com/gallery")
        );
    }

    #[test]
    fn test_label_match_is_case_sensitive_on_content() {
        let html = r#"<img src="/a.jpg"><A HREF="/p/2">Next</A>"#;

        let matched = extract_page(html, &origin(), "Next", "Prev").unwrap();
        assert_eq!(
            matched.next_page_link().map(Url::as_str),
            Some("https://example.com/p/2")
        );

        let unmatched = extract_page(html, &origin(), "next", "Prev").unwrap();
        assert!(unmatched.next_page_link().is_none());
    }

    #[test]
    fn test_last_matching_anchor_wins() {
        let html = r#"
            <a href="/top/2">Next</a>
            <img src="/a.jpg">
            <a href="/bottom/2">Next</a>
            <a href="/top/0">Prev</a>
            <a href="/bottom/0">Prev</a>
        "#;
        let result = extract_page(html, &origin(), "Next", "Prev").unwrap();

        assert_eq!(
            result.next_page_link().map(Url::as_str),
            Some("https://example.com/bottom/2")
        );
        assert_eq!(
            result.last_page_link().map(Url::as_str),
            Some("https://example.com/bottom/0")
        );
    }

    #[test]
    fn test_malformed_entries_are_skipped_and_counted() {
        let html = r#"
            <img alt="no src">
            <img src="http://bad host/x.jpg">
            <img src="/ok.jpg">
            <img src="data:image/gif;base64,R0lGOD">
            <a href="javascript:void(0)">Next</a>
            <a href="http://bad host/p/2">Prev</a>
        "#;
        let extractor = PageExtractor::new(origin(), "Next", "Prev");
        let (result, stats) = extractor.extract_with_stats(html);
        let result = result.unwrap();

        assert_eq!(
            image_strs(&result),
            vec![
                "https://example.com/ok.jpg",
                "https://example.com/image/gif;base64,R0lGOD",
            ]
        );
        assert_eq!(
            result.next_page_link().map(Url::as_str),
            Some("https://example.com/void(0)")
        );
        assert_eq!(stats.images_found, 2);
        assert!(result.last_page_link().is_none());
        assert_eq!(stats.images_skipped, 1);
        assert_eq!(stats.anchors_seen, 2);
        assert_eq!(stats.links_skipped, 1);
    }

    #[test]
    fn test_default_labels_from_settings() {
        let html = r#"<img src="/a.jpg"><a href="/p/0">上一页</a><a href="/p/2">下一页</a>"#;
        let extractor = PageExtractor::from_settings(origin(), &GallerySettings::default());
        let result = extractor.extract(html).unwrap();

        assert_eq!(
            result.next_page_link().map(Url::as_str),
            Some("https://example.com/p/2")
        );
        assert_eq!(
            result.last_page_link().map(Url::as_str),
            Some("https://example.com/p/0")
        );
    }

    #[test]
    fn test_n_images_yield_n_urls() {
        for n in [1usize, 2, 7, 40] {
            let html: String = (0..n)
                .map(|i| format!("<div><img src=\"/img/{i}.jpg\"></div>"))
                .collect();
            let result = extract_page(&html, &origin(), "Next", "Prev").unwrap();

            assert_eq!(result.image_count(), n);
            assert_eq!(
                result.image_urls()[n - 1].as_str(),
                format!("https://example.com/img/{}.jpg", n - 1)
            );
        }
    }

    #[test]
    fn test_empty_document() {
        assert!(extract_page("", &origin(), "Next", "Prev").is_none());
    }
}
