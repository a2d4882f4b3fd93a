//! Windowed byte sources.
//!
//! A [`WindowReader`] exposes a byte source as a sequence of contiguous
//! [`Window`]s, so matchers and searchers can work over inputs that do not
//! fit in memory. Windows are handed out as `Arc<Window>`: cache eviction
//! or reader teardown can never invalidate a window a caller still holds,
//! but callers must not retain windows across re-acquisition if they want
//! to observe fresh data.
//!
//! Implementations here: [`ByteReader`] over an in-memory buffer (whole
//! buffer as one window, or sliced into fixed-size windows for
//! boundary-crossing tests) and [`FileReader`] over a file with a
//! pluggable [`WindowCache`].

mod cache;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::Error;

pub use cache::{MruCache, NoCache, WindowCache};

/// Default window size for file readers.
pub const DEFAULT_WINDOW_SIZE: usize = 4096;

/// A contiguous run of bytes from a source, tagged with its absolute
/// starting position.
///
/// The backing array may be longer than the valid content; `limit()` is
/// the count of valid bytes and is authoritative everywhere. Matching
/// never reads past the limit.
#[derive(Debug)]
pub struct Window {
    bytes: Box<[u8]>,
    start: u64,
    limit: usize,
}

impl Window {
    /// Wraps a byte array starting at absolute position `start` with
    /// `limit` valid bytes.
    ///
    /// # Panics
    ///
    /// Panics if `limit` exceeds the array length.
    pub fn new(bytes: Vec<u8>, start: u64, limit: usize) -> Self {
        assert!(
            limit <= bytes.len(),
            "window limit {} exceeds array length {}",
            limit,
            bytes.len()
        );
        Self {
            bytes: bytes.into_boxed_slice(),
            start,
            limit,
        }
    }

    /// The valid bytes of this window.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..self.limit]
    }

    /// Absolute position of the first byte.
    #[inline]
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Count of valid bytes.
    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Absolute position one past the last valid byte.
    #[inline]
    pub fn end(&self) -> u64 {
        self.start + self.limit as u64
    }

    /// The byte at absolute position `pos`, if it falls inside this window.
    #[inline]
    pub fn byte_at(&self, pos: u64) -> Option<u8> {
        if pos >= self.start && pos < self.end() {
            Some(self.bytes[(pos - self.start) as usize])
        } else {
            None
        }
    }
}

/// A random-access byte source exposing contiguous windows.
pub trait WindowReader: Send + Sync {
    /// Total length of the source in bytes.
    fn length(&self) -> u64;

    /// Reads the byte at an absolute position. `None` past the end.
    fn read_byte(&self, pos: u64) -> Result<Option<u8>, Error> {
        Ok(self.window(pos)?.and_then(|w| w.byte_at(pos)))
    }

    /// Returns the window containing absolute position `pos`, or `None`
    /// when `pos` is at or past the end of the source.
    fn window(&self, pos: u64) -> Result<Option<Arc<Window>>, Error>;
}

/// A reader over an in-memory byte buffer.
///
/// By default the whole buffer is served as a single window. A fixed
/// window size may be requested instead, which slices the buffer into
/// consecutive windows -- useful for exercising window-boundary handling
/// against an in-memory source.
pub struct ByteReader {
    bytes: Arc<[u8]>,
    window_size: Option<usize>,
    // One Arc<Window> per window start, built lazily.
    windows: Mutex<Vec<Option<Arc<Window>>>>,
}

impl ByteReader {
    /// Wraps a buffer as a single window.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Arc<[u8]> = bytes.into().into();
        Self {
            bytes,
            window_size: None,
            windows: Mutex::new(vec![None]),
        }
    }

    /// Wraps a buffer sliced into windows of `window_size` bytes (the last
    /// window may be shorter).
    ///
    /// # Panics
    ///
    /// Panics if `window_size` is zero.
    pub fn with_window_size(bytes: impl Into<Vec<u8>>, window_size: usize) -> Self {
        assert!(window_size > 0, "window size must be positive");
        let bytes: Arc<[u8]> = bytes.into().into();
        let count = bytes.len().div_ceil(window_size).max(1);
        Self {
            bytes,
            window_size: Some(window_size),
            windows: Mutex::new(vec![None; count]),
        }
    }
}

impl WindowReader for ByteReader {
    fn length(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read_byte(&self, pos: u64) -> Result<Option<u8>, Error> {
        Ok(self.bytes.get(pos as usize).copied())
    }

    fn window(&self, pos: u64) -> Result<Option<Arc<Window>>, Error> {
        if pos >= self.length() {
            return Ok(None);
        }
        let size = self.window_size.unwrap_or(self.bytes.len());
        let index = (pos as usize) / size;
        let mut windows = self.windows.lock();
        if let Some(window) = &windows[index] {
            return Ok(Some(window.clone()));
        }
        let start = index * size;
        let end = (start + size).min(self.bytes.len());
        let window = Arc::new(Window::new(
            self.bytes[start..end].to_vec(),
            start as u64,
            end - start,
        ));
        windows[index] = Some(window.clone());
        Ok(Some(window))
    }
}

/// A reader over a file, materialising fixed-size windows on demand.
///
/// The file handle and cache sit behind a mutex so `window(&self)` works
/// from shared references; a searcher borrowing the reader may block on
/// I/O here but never on any other internal synchronisation. The handle
/// is released when the reader drops.
pub struct FileReader {
    inner: Mutex<File>,
    length: u64,
    window_size: usize,
    cache: Box<dyn WindowCache>,
}

impl FileReader {
    /// Opens a file with the default window size and an MRU cache of four
    /// windows.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::with_cache(path, DEFAULT_WINDOW_SIZE, Box::new(MruCache::new(4)))
    }

    /// Opens a file with an explicit window size and cache policy.
    pub fn with_cache(
        path: impl AsRef<Path>,
        window_size: usize,
        cache: Box<dyn WindowCache>,
    ) -> Result<Self, Error> {
        if window_size == 0 {
            return Err(Error::InvalidArgument(
                "window size must be positive".to_string(),
            ));
        }
        let file = File::open(path)?;
        let length = file.metadata()?.len();
        Ok(Self {
            inner: Mutex::new(file),
            length,
            window_size,
            cache,
        })
    }
}

impl WindowReader for FileReader {
    fn length(&self) -> u64 {
        self.length
    }

    fn window(&self, pos: u64) -> Result<Option<Arc<Window>>, Error> {
        if pos >= self.length {
            return Ok(None);
        }
        let start = pos - pos % self.window_size as u64;
        if let Some(window) = self.cache.get(start) {
            return Ok(Some(window));
        }
        let mut file = self.inner.lock();
        file.seek(SeekFrom::Start(start))?;
        let mut buffer = vec![0u8; self.window_size];
        let mut filled = 0;
        // Loop: read() may return short counts before end of file.
        while filled < buffer.len() {
            let n = file.read(&mut buffer[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        let window = Arc::new(Window::new(buffer, start, filled));
        self.cache.put(window.clone());
        Ok(Some(window))
    }
}
