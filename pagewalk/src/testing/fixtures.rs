//! HTML and image fixtures.

use std::fmt::Write as _;
use std::io::Cursor;

use image::{ImageFormat, RgbImage};

/// Builder for a gallery-style HTML page.
#[derive(Debug, Clone, Default)]
pub struct GalleryPage {
    images: Vec<String>,
    anchors: Vec<(String, String)>,
}

/// Starts a gallery page fixture.
#[must_use]
pub fn gallery_page() -> GalleryPage {
    GalleryPage::default()
}

impl GalleryPage {
    /// Adds an `<img src>` tag.
    #[must_use]
    pub fn image(mut self, src: impl Into<String>) -> Self {
        self.images.push(src.into());
        self
    }

    /// Adds `count` images named `{prefix}{i}.jpg`, starting at 1.
    #[must_use]
    pub fn images(mut self, prefix: &str, count: usize) -> Self {
        self.images
            .extend((1..=count).map(|i| format!("{prefix}{i}.jpg")));
        self
    }

    /// Adds an `<a href>` tag with the given text.
    #[must_use]
    pub fn link(mut self, href: impl Into<String>, text: impl Into<String>) -> Self {
        self.anchors.push((href.into(), text.into()));
        self
    }

    /// Renders the page.
    #[must_use]
    pub fn build(&self) -> String {
        let mut html = String::from("<html><body>\n");
        for src in &self.images {
            let _ = writeln!(html, "<div><img class=\"photo\" src=\"{src}\" alt=\"\"></div>");
        }
        for (href, text) in &self.anchors {
            let _ = writeln!(html, "<a class=\"page\" href=\"{href}\">{text}</a>");
        }
        html.push_str("</body></html>\n");
        html
    }
}

/// Encodes a blank `width` x `height` PNG.
#[must_use]
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    // Encoding into memory only fails for zero-sized images.
    if RgbImage::new(width, height)
        .write_to(&mut out, ImageFormat::Png)
        .is_err()
    {
        return Vec::new();
    }
    out.into_inner()
}
