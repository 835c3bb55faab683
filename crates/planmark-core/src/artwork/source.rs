//! Artwork sources: where raw artwork markup comes from.

use crate::error::ArtworkError;
use futures_util::future::LocalBoxFuture;
use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// Future returned by an artwork source.
///
/// `Ok(None)` means the source confirmed that no artwork exists for the key.
pub type SourceFuture = LocalBoxFuture<'static, Result<Option<String>, ArtworkError>>;

/// Trait for artwork backends.
///
/// Implementations can serve artwork from memory, the filesystem or a
/// network service. The engine is single-threaded, so neither the source
/// nor its futures need to be `Send`.
pub trait ArtworkSource {
    /// Fetch the raw markup for an artwork key.
    fn fetch(&self, key: &str) -> SourceFuture;
}

/// In-memory artwork source for testing and ephemeral use.
#[derive(Default)]
pub struct MemoryArtworkSource {
    artwork: HashMap<String, String>,
    failing: HashSet<String>,
    latency_polls: usize,
    fetches: Rc<Cell<usize>>,
}

impl MemoryArtworkSource {
    /// Create a new empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register markup for a key.
    pub fn with_artwork(mut self, key: impl Into<String>, markup: impl Into<String>) -> Self {
        self.artwork.insert(key.into(), markup.into());
        self
    }

    /// Make fetches for a key fail with a source error.
    pub fn with_failure(mut self, key: impl Into<String>) -> Self {
        self.failing.insert(key.into());
        self
    }

    /// Make every fetch stay pending for the given number of polls.
    pub fn with_latency(mut self, polls: usize) -> Self {
        self.latency_polls = polls;
        self
    }

    /// Shared counter of underlying fetches issued so far.
    pub fn fetch_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.fetches)
    }
}

impl ArtworkSource for MemoryArtworkSource {
    fn fetch(&self, key: &str) -> SourceFuture {
        self.fetches.set(self.fetches.get() + 1);
        let result = if self.failing.contains(key) {
            Err(ArtworkError::Source(format!("fetch failed for {}", key)))
        } else {
            Ok(self.artwork.get(key).cloned())
        };
        let latency = Latency {
            remaining: self.latency_polls,
        };
        Box::pin(async move {
            latency.await;
            result
        })
    }
}

/// Future that stays pending for a fixed number of polls.
struct Latency {
    remaining: usize,
}

impl Future for Latency {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.remaining == 0 {
            return Poll::Ready(());
        }
        self.remaining -= 1;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// File-based artwork source for native platforms.
///
/// Serves `<base>/<key>.svg`; a missing file means "no artwork".
#[cfg(not(target_arch = "wasm32"))]
pub struct FileArtworkSource {
    base_path: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileArtworkSource {
    /// Create a source reading from the given directory.
    pub fn new(base_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Get the file path for an artwork key.
    fn artwork_path(&self, key: &str) -> std::path::PathBuf {
        // Sanitize key to be safe for filenames
        let safe_key: String = key
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.base_path.join(format!("{}.svg", safe_key))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl ArtworkSource for FileArtworkSource {
    fn fetch(&self, key: &str) -> SourceFuture {
        let path = self.artwork_path(key);
        Box::pin(async move {
            match std::fs::read_to_string(&path) {
                Ok(markup) => Ok(Some(markup)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(ArtworkError::Io(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                ))),
            }
        })
    }
}
