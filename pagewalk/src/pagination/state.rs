//! Accumulated state of one pagination run.

use url::Url;

use crate::extract::ExtractionResult;

/// Images and pagination links gathered across the pages of one run.
///
/// Images only ever grow by concatenation, in page order, without
/// deduplication. The next link always reflects the most recent page; the
/// previous link is taken from the first page and then held.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccumulationState {
    images: Vec<Url>,
    next_link: Option<Url>,
    last_link: Option<Url>,
    pages: usize,
}

impl AccumulationState {
    /// Creates an empty state for a new run.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one page's extraction into the run.
    pub fn absorb(&mut self, page: ExtractionResult) {
        let first_page = self.pages == 0;
        let (images, next, last) = page.into_parts();

        self.images.extend(images);
        self.next_link = next;
        if first_page {
            self.last_link = last;
        }
        self.pages += 1;
    }

    /// All accumulated image URLs.
    #[must_use]
    pub fn images(&self) -> &[Url] {
        &self.images
    }

    /// Number of accumulated image URLs.
    #[must_use]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Number of pages merged so far.
    #[must_use]
    pub fn pages_absorbed(&self) -> usize {
        self.pages
    }

    /// Next link of the most recently merged page.
    #[must_use]
    pub fn next_link(&self) -> Option<&Url> {
        self.next_link.as_ref()
    }

    /// Previous link of the first page.
    #[must_use]
    pub fn last_link(&self) -> Option<&Url> {
        self.last_link.as_ref()
    }

    /// Whether the run still needs more images to reach `min_image_count`.
    ///
    /// Always false when `min_image_count` is 0.
    #[must_use]
    pub fn needs_more(&self, min_image_count: usize) -> bool {
        min_image_count > 0 && self.images.len() < min_image_count
    }

    /// The accumulated result, or `None` before any page was merged.
    #[must_use]
    pub fn to_result(&self) -> Option<ExtractionResult> {
        ExtractionResult::new(
            self.images.clone(),
            self.next_link.clone(),
            self.last_link.clone(),
        )
    }

    /// Consumes the state into the accumulated result.
    #[must_use]
    pub fn into_result(self) -> Option<ExtractionResult> {
        ExtractionResult::new(self.images, self.next_link, self.last_link)
    }
}
