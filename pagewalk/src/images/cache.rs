//! Image cache keyed by absolute URL string.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Default byte budget of [`MemoryImageCache`].
pub const DEFAULT_CACHE_BYTES: u64 = 100 * 1_000 * 1_000 * 1_000;

/// Encoded image bytes with their decoded dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedImage {
    bytes: Arc<Vec<u8>>,
    width: u32,
    height: u32,
}

impl CachedImage {
    /// Wraps encoded bytes and their dimensions.
    #[must_use]
    pub fn new(bytes: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            bytes: Arc::new(bytes),
            width,
            height,
        }
    }

    /// The encoded bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel area.
    #[must_use]
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    fn cost(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Storage for images already downloaded.
pub trait ImageCache: Send + Sync {
    /// Looks up an image by URL.
    fn get(&self, key: &str) -> Option<CachedImage>;

    /// Stores an image under its URL.
    fn put(&self, key: &str, image: CachedImage);
}

#[derive(Debug, Default)]
struct LruState {
    entries: HashMap<String, (CachedImage, u64)>,
    order: BTreeMap<u64, String>,
    clock: u64,
    used: u64,
}

impl LruState {
    fn touch(&mut self, key: &str) -> Option<CachedImage> {
        self.clock += 1;
        let clock = self.clock;
        let (image, tick) = self.entries.get_mut(key)?;
        let old = std::mem::replace(tick, clock);
        let image = image.clone();
        if let Some(key) = self.order.remove(&old) {
            self.order.insert(clock, key);
        }
        Some(image)
    }

    fn remove(&mut self, key: &str) {
        if let Some((image, tick)) = self.entries.remove(key) {
            self.order.remove(&tick);
            self.used -= image.cost();
        }
    }

    fn evict_oldest(&mut self) -> bool {
        let Some((_, key)) = self.order.pop_first() else {
            return false;
        };
        if let Some((image, _)) = self.entries.remove(&key) {
            self.used -= image.cost();
            debug!(key = %key, bytes = image.cost(), "Evicted cached image");
        }
        true
    }
}

/// In-memory least-recently-used cache bounded by total encoded bytes.
#[derive(Debug)]
pub struct MemoryImageCache {
    budget: u64,
    state: Mutex<LruState>,
}

impl Default for MemoryImageCache {
    fn default() -> Self {
        Self::with_budget(DEFAULT_CACHE_BYTES)
    }
}

impl MemoryImageCache {
    /// Creates a cache with the default budget.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache holding at most `budget` encoded bytes.
    #[must_use]
    pub fn with_budget(budget: u64) -> Self {
        Self {
            budget,
            state: Mutex::new(LruState::default()),
        }
    }

    /// Number of cached images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total encoded bytes currently held.
    #[must_use]
    pub fn used_bytes(&self) -> u64 {
        self.state.lock().used
    }

    /// Drops every entry.
    pub fn clear(&self) {
        *self.state.lock() = LruState::default();
    }
}

impl ImageCache for MemoryImageCache {
    fn get(&self, key: &str) -> Option<CachedImage> {
        self.state.lock().touch(key)
    }

    fn put(&self, key: &str, image: CachedImage) {
        if image.cost() > self.budget {
            debug!(key, bytes = image.cost(), "Image exceeds cache budget");
            return;
        }

        let mut state = self.state.lock();
        state.remove(key);
        state.clock += 1;
        let clock = state.clock;
        state.used += image.cost();
        state.order.insert(clock, key.to_string());
        state.entries.insert(key.to_string(), (image, clock));

        while state.used > self.budget && state.evict_oldest() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(len: usize) -> CachedImage {
        CachedImage::new(vec![0; len], 10, 20)
    }

    #[test]
    fn test_get_and_put() {
        let cache = MemoryImageCache::new();
        assert!(cache.get("https://a.com/1.jpg").is_none());

        cache.put("https://a.com/1.jpg", image(4));
        let hit = cache.get("https://a.com/1.jpg").unwrap();

        assert_eq!(hit.area(), 200);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.used_bytes(), 4);
    }

    #[test]
    fn test_replacing_entry_updates_usage() {
        let cache = MemoryImageCache::new();
        cache.put("k", image(10));
        cache.put("k", image(3));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.used_bytes(), 3);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = MemoryImageCache::with_budget(10);
        cache.put("a", image(4));
        cache.put("b", image(4));
        assert!(cache.get("a").is_some());

        cache.put("c", image(4));

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.used_bytes(), 8);
    }

    #[test]
    fn test_oversized_image_not_cached() {
        let cache = MemoryImageCache::with_budget(5);
        cache.put("big", image(6));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear() {
        let cache = MemoryImageCache::new();
        cache.put("a", image(1));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.used_bytes(), 0);
    }
}
