//! Window caches for readers that materialise windows on demand.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use super::Window;

/// A pluggable cache of [`Window`]s keyed by their starting position.
///
/// Implementations must be safe to call from a shared reference; the
/// readers keep their cache behind the same lock as their I/O handle, so a
/// cache only ever sees one call at a time per reader.
pub trait WindowCache: Send + Sync {
    /// Returns the cached window starting at `pos`, if any.
    fn get(&self, pos: u64) -> Option<Arc<Window>>;

    /// Offers a window to the cache. The cache may decline to retain it.
    fn put(&self, window: Arc<Window>);

    /// Drops every cached window.
    fn clear(&self);
}

/// A cache that retains nothing. Every window request goes to the source.
#[derive(Debug, Default)]
pub struct NoCache;

impl WindowCache for NoCache {
    fn get(&self, _pos: u64) -> Option<Arc<Window>> {
        None
    }

    fn put(&self, _window: Arc<Window>) {}

    fn clear(&self) {}
}

/// A most-recently-used cache holding up to `capacity` windows.
///
/// Hits move the window to the front; inserting beyond capacity evicts the
/// least recently used entry. Because windows are handed out as
/// `Arc<Window>`, eviction never invalidates a window a caller still holds.
pub struct MruCache {
    capacity: usize,
    entries: Mutex<VecDeque<Arc<Window>>>,
}

impl MruCache {
    /// Creates a cache retaining at most `capacity` windows.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "MruCache capacity must be positive");
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }
}

impl WindowCache for MruCache {
    fn get(&self, pos: u64) -> Option<Arc<Window>> {
        let mut entries = self.entries.lock();
        let index = entries.iter().position(|w| w.start() == pos)?;
        let window = entries.remove(index).unwrap();
        entries.push_front(window.clone());
        Some(window)
    }

    fn put(&self, window: Arc<Window>) {
        let mut entries = self.entries.lock();
        if let Some(index) = entries.iter().position(|w| w.start() == window.start()) {
            entries.remove(index);
        }
        entries.push_front(window);
        while entries.len() > self.capacity {
            entries.pop_back();
        }
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }
}
