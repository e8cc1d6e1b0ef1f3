//! Image fetching, size filtering and caching.

mod cache;
mod loader;

pub use cache::{CachedImage, ImageCache, MemoryImageCache, DEFAULT_CACHE_BYTES};
pub use loader::{ImageLoader, LoadedImage};
