//! User-facing settings and combined configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::Result;
use crate::fetch::FetchConfig;

/// Bytes per kilobyte used by the minimum image size setting.
pub const IMAGE_SIZE_1KB: u64 = 1024;

/// Settings supplied by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GallerySettings {
    /// Images whose pixel area does not exceed `min_image_size_kb * 1024` are hidden.
    #[serde(default = "default_min_image_size_kb")]
    pub min_image_size_kb: u32,
    /// Pagination keeps fetching until this many images are accumulated. 0 disables it.
    #[serde(default)]
    pub min_image_count: usize,
    /// Exact anchor text of the "next page" link.
    #[serde(default = "default_next_page_label")]
    pub next_page_label: String,
    /// Exact anchor text of the "previous page" link.
    #[serde(default = "default_last_page_label")]
    pub last_page_label: String,
    /// Whether requests carry a `Referer` header set to the session origin.
    #[serde(default)]
    pub use_referer: bool,
}

fn default_min_image_size_kb() -> u32 {
    200
}

fn default_next_page_label() -> String {
    "下一页".to_string()
}

fn default_last_page_label() -> String {
    "上一页".to_string()
}

impl Default for GallerySettings {
    fn default() -> Self {
        Self {
            min_image_size_kb: default_min_image_size_kb(),
            min_image_count: 0,
            next_page_label: default_next_page_label(),
            last_page_label: default_last_page_label(),
            use_referer: false,
        }
    }
}

impl GallerySettings {
    /// Creates settings with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum image count.
    #[must_use]
    pub fn with_min_image_count(mut self, count: usize) -> Self {
        self.min_image_count = count;
        self
    }

    /// Sets the minimum image size in KB.
    #[must_use]
    pub fn with_min_image_size_kb(mut self, kb: u32) -> Self {
        self.min_image_size_kb = kb;
        self
    }

    /// Sets both pagination labels.
    #[must_use]
    pub fn with_labels(mut self, next: impl Into<String>, last: impl Into<String>) -> Self {
        self.next_page_label = next.into();
        self.last_page_label = last.into();
        self
    }

    /// Enables or disables the `Referer` header.
    #[must_use]
    pub fn with_referer(mut self, enabled: bool) -> Self {
        self.use_referer = enabled;
        self
    }

    /// Minimum pixel area an image must exceed to be displayed.
    #[must_use]
    pub fn min_image_area(&self) -> u64 {
        u64::from(self.min_image_size_kb) * IMAGE_SIZE_1KB
    }

    /// Whether an image of the given dimensions passes the size filter.
    #[must_use]
    pub fn is_displayable(&self, width: u32, height: u32) -> bool {
        u64::from(width) * u64::from(height) > self.min_image_area()
    }

    /// Loads settings from a JSON file. A missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Saves settings to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

/// Combined configuration for a gallery session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryConfig {
    /// User settings.
    #[serde(default)]
    pub settings: GallerySettings,
    /// HTTP fetch configuration.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Maximum images loaded concurrently.
    #[serde(default = "default_max_concurrent_images")]
    pub max_concurrent_images: usize,
    /// Upper bound on pages fetched by one pagination run. `None` means unbounded.
    #[serde(default)]
    pub max_pages: Option<usize>,
}

fn default_max_concurrent_images() -> usize {
    4
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            settings: GallerySettings::default(),
            fetch: FetchConfig::default(),
            max_concurrent_images: default_max_concurrent_images(),
            max_pages: None,
        }
    }
}

impl GalleryConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the user settings.
    #[must_use]
    pub fn with_settings(mut self, settings: GallerySettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replaces the fetch configuration.
    #[must_use]
    pub fn with_fetch(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }

    /// Sets the image loading concurrency (at least 1).
    #[must_use]
    pub fn with_max_concurrent_images(mut self, max: usize) -> Self {
        self.max_concurrent_images = max.max(1);
        self
    }

    /// Caps the number of pages fetched by one pagination run.
    #[must_use]
    pub fn with_max_pages(mut self, max: usize) -> Self {
        self.max_pages = Some(max);
        self
    }
}
