//! Loading extracted image URLs.

use futures::stream::{self, StreamExt};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use super::cache::{CachedImage, ImageCache, MemoryImageCache};
use crate::errors::{PageWalkError, Result};
use crate::extract::Origin;
use crate::fetch::{request_headers, FetchConfig, Fetcher};
use crate::settings::GallerySettings;

/// An image resolved through the cache or the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    /// The image URL.
    pub url: Url,
    /// Encoded bytes and dimensions.
    pub image: CachedImage,
    /// Whether the pixel area passes the minimum size filter.
    pub displayable: bool,
    /// Whether the image was served from the cache.
    pub from_cache: bool,
}

impl LoadedImage {
    /// File name taken from the last path segment of the URL.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .unwrap_or("image")
            .to_string()
    }

    /// Writes the encoded bytes into `dir` under [`file_name`](Self::file_name).
    ///
    /// Returns the path written. An existing file is overwritten.
    pub fn save_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(self.file_name());
        std::fs::write(&path, self.image.bytes())?;
        debug!(url = %self.url, path = %path.display(), "Saved image");
        Ok(path)
    }
}

/// Fetches images, reads their dimensions and filters small ones.
pub struct ImageLoader<F: Fetcher + ?Sized> {
    fetcher: Arc<F>,
    cache: Arc<dyn ImageCache>,
    settings: GallerySettings,
    fetch_config: Option<FetchConfig>,
    max_concurrent: usize,
}

impl<F: Fetcher + ?Sized> ImageLoader<F> {
    /// Creates a loader with an in-memory cache and a concurrency of 4.
    #[must_use]
    pub fn new(fetcher: Arc<F>, settings: GallerySettings) -> Self {
        Self {
            fetcher,
            cache: Arc::new(MemoryImageCache::new()),
            settings,
            fetch_config: None,
            max_concurrent: 4,
        }
    }

    /// Uses `cache` instead of the default in-memory cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn ImageCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Sets how many images are fetched at once (at least 1).
    #[must_use]
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    /// Overrides the fetcher's own timeout and adds extra image headers.
    #[must_use]
    pub fn with_fetch_config(mut self, config: FetchConfig) -> Self {
        self.fetch_config = Some(config);
        self
    }

    /// The cache in use.
    #[must_use]
    pub fn cache(&self) -> &Arc<dyn ImageCache> {
        &self.cache
    }

    /// Loads one image, from the cache when possible.
    pub async fn load(&self, url: &Url, origin: &Origin) -> Result<LoadedImage> {
        if let Some(image) = self.cache.get(url.as_str()) {
            return Ok(self.loaded(url, image, true));
        }

        let mut headers = request_headers(origin, self.settings.use_referer);
        if let Some(config) = &self.fetch_config {
            headers.extend(config.headers.clone());
        }
        let timeout = self.fetch_config.as_ref().map(FetchConfig::timeout);
        let response = self
            .fetcher
            .fetch(url, &headers, timeout)
            .await?
            .error_for_status(url)?;

        let (width, height) = read_dimensions(url, &response.body)?;
        let image = CachedImage::new(response.body, width, height);
        self.cache.put(url.as_str(), image.clone());

        debug!(%url, width, height, "Loaded image");
        Ok(self.loaded(url, image, false))
    }

    /// Loads every URL with bounded concurrency. Results keep the input order.
    pub async fn load_all(&self, urls: &[Url], origin: &Origin) -> Vec<Result<LoadedImage>> {
        stream::iter(urls)
            .map(|url| self.load(url, origin))
            .buffered(self.max_concurrent)
            .collect()
            .await
    }

    /// Loads every URL and keeps the displayable images, in input order.
    ///
    /// Failed images are logged and skipped.
    pub async fn load_displayable(&self, urls: &[Url], origin: &Origin) -> Vec<LoadedImage> {
        self.load_all(urls, origin)
            .await
            .into_iter()
            .filter_map(|result| match result {
                Ok(image) => image.displayable.then_some(image),
                Err(err) => {
                    warn!(error = %err, "Image failed to load");
                    None
                }
            })
            .collect()
    }

    fn loaded(&self, url: &Url, image: CachedImage, from_cache: bool) -> LoadedImage {
        LoadedImage {
            url: url.clone(),
            displayable: self.settings.is_displayable(image.width(), image.height()),
            image,
            from_cache,
        }
    }
}

impl<F: Fetcher + ?Sized> std::fmt::Debug for ImageLoader<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader")
            .field("settings", &self.settings)
            .field("max_concurrent", &self.max_concurrent)
            .finish_non_exhaustive()
    }
}

fn read_dimensions(url: &Url, bytes: &[u8]) -> Result<(u32, u32)> {
    let image_error = |reason: String| PageWalkError::Image {
        url: url.to_string(),
        reason,
    };
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| image_error(e.to_string()))?
        .into_dimensions()
        .map_err(|e| image_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::REFERER;
    use crate::testing::{png_bytes, ScriptedFetcher};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const BIG: &str = "https://cdn.example.com/big.png";
    const SMALL: &str = "https://cdn.example.com/small.png";

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn origin() -> Origin {
        Origin::parse("https://example.com/gallery").unwrap()
    }

    fn fetcher() -> Arc<ScriptedFetcher> {
        Arc::new(
            ScriptedFetcher::new()
                .with_bytes(BIG, png_bytes(40, 30), "image/png")
                .with_bytes(SMALL, png_bytes(10, 10), "image/png")
                .with_bytes("https://cdn.example.com/junk.png", "not an image", "image/png"),
        )
    }

    fn settings() -> GallerySettings {
        // 1 KB threshold: displayable above 1024 pixels.
        GallerySettings::default().with_min_image_size_kb(1)
    }

    #[tokio::test]
    async fn test_load_reads_dimensions_and_filters() {
        let loader = ImageLoader::new(fetcher(), settings());

        let big = loader.load(&url(BIG), &origin()).await.unwrap();
        assert_eq!((big.image.width(), big.image.height()), (40, 30));
        assert!(big.displayable);
        assert!(!big.from_cache);

        let small = loader.load(&url(SMALL), &origin()).await.unwrap();
        assert!(!small.displayable);
    }

    #[tokio::test]
    async fn test_second_load_hits_cache() {
        let fetcher = fetcher();
        let loader = ImageLoader::new(Arc::clone(&fetcher), settings());

        loader.load(&url(BIG), &origin()).await.unwrap();
        let again = loader.load(&url(BIG), &origin()).await.unwrap();

        assert!(again.from_cache);
        assert_eq!(fetcher.request_count(), 1);
    }

    #[tokio::test]
    async fn test_status_failure_message() {
        let loader = ImageLoader::new(fetcher(), settings());

        let err = loader
            .load(&url("https://cdn.example.com/missing.png"), &origin())
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("Failed status code: 404"));
    }

    #[tokio::test]
    async fn test_undecodable_bytes() {
        let loader = ImageLoader::new(fetcher(), settings());
        let err = loader
            .load(&url("https://cdn.example.com/junk.png"), &origin())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ImageError");
    }

    #[tokio::test]
    async fn test_load_all_keeps_order() {
        let loader = ImageLoader::new(fetcher(), settings()).with_max_concurrent(2);
        let urls = vec![url(SMALL), url("https://cdn.example.com/missing.png"), url(BIG)];

        let results = loader.load_all(&urls, &origin()).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().url, url(SMALL));
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().url, url(BIG));

        let shown = loader.load_displayable(&urls, &origin()).await;
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].url, url(BIG));
    }

    #[tokio::test]
    async fn test_referer_sent_when_enabled() {
        let fetcher = fetcher();
        let loader = ImageLoader::new(Arc::clone(&fetcher), settings().with_referer(true));

        loader.load(&url(BIG), &origin()).await.unwrap();

        let request = &fetcher.requests()[0];
        assert_eq!(
            request.headers.get(REFERER).map(String::as_str),
            Some("https://example.com")
        );
    }

    #[tokio::test]
    async fn test_fetch_config_headers_and_timeout() {
        let fetcher = fetcher();
        let loader = ImageLoader::new(Arc::clone(&fetcher), settings()).with_fetch_config(
            FetchConfig::new()
                .with_timeout(2.5)
                .with_header("Accept", "image/*"),
        );

        loader.load(&url(BIG), &origin()).await.unwrap();

        let request = &fetcher.requests()[0];
        assert_eq!(request.headers.get("Accept").map(String::as_str), Some("image/*"));
        assert_eq!(request.timeout, Some(Duration::from_secs_f64(2.5)));
    }

    #[tokio::test]
    async fn test_save_to_writes_cached_bytes() {
        let loader = ImageLoader::new(fetcher(), settings());
        let big = loader.load(&url(BIG), &origin()).await.unwrap();
        let dir = tempfile::tempdir().unwrap();

        let path = big.save_to(dir.path()).unwrap();

        assert_eq!(path, dir.path().join("big.png"));
        assert_eq!(std::fs::read(&path).unwrap(), big.image.bytes());
    }

    #[test]
    fn test_save_to_falls_back_to_generic_name() {
        let image = LoadedImage {
            url: url("https://cdn.example.com/"),
            image: CachedImage::new(vec![1, 2, 3], 1, 1),
            displayable: false,
            from_cache: true,
        };
        let dir = tempfile::tempdir().unwrap();

        let path = image.save_to(dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "image");

        let err = image.save_to(dir.path().join("missing")).unwrap_err();
        assert_eq!(err.kind(), "IoError");
    }

    #[test]
    fn test_custom_cache_is_used() {
        let cache = Arc::new(MemoryImageCache::new());
        cache.put(BIG, CachedImage::new(vec![1, 2, 3], 2000, 2000));
        let fetcher = fetcher();
        let loader = ImageLoader::new(Arc::clone(&fetcher), settings()).with_cache(cache);

        let loaded = tokio_test::block_on(loader.load(&url(BIG), &origin())).unwrap();

        assert!(loaded.from_cache);
        assert!(loaded.displayable);
        assert_eq!(fetcher.request_count(), 0);
    }
}
