//! Memoizing, deduplicating artwork cache.

use super::ArtworkSource;
use futures_util::FutureExt;
use futures_util::future::{LocalBoxFuture, Shared};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

type PendingFetch = Shared<LocalBoxFuture<'static, Option<Rc<str>>>>;

enum CacheSlot {
    /// A fetch for this key is in flight; later callers await the same one.
    Pending(PendingFetch),
    /// Resolved markup, or confirmed absence.
    Ready(Option<Rc<str>>),
}

/// Artwork cache keyed by artwork key.
///
/// Both successful results and absence are memoized. Source failures are
/// logged and cached as absence, so callers always get markup-or-`None`.
pub struct ArtworkCache {
    source: Box<dyn ArtworkSource>,
    slots: RefCell<HashMap<String, CacheSlot>>,
}

impl ArtworkCache {
    /// Create a cache in front of a source.
    pub fn new(source: impl ArtworkSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            slots: RefCell::new(HashMap::new()),
        }
    }

    /// Fetch artwork markup for a key.
    pub async fn fetch(&self, key: &str) -> Option<Rc<str>> {
        let pending = {
            let mut slots = self.slots.borrow_mut();
            match slots.get(key) {
                Some(CacheSlot::Ready(markup)) => return markup.clone(),
                Some(CacheSlot::Pending(pending)) => pending.clone(),
                None => {
                    let pending = self.start_fetch(key);
                    slots.insert(key.to_string(), CacheSlot::Pending(pending.clone()));
                    pending
                }
            }
        };

        let markup = pending.await;
        // The slot may have been invalidated while the fetch was in flight.
        if let Some(slot) = self.slots.borrow_mut().get_mut(key) {
            if matches!(slot, CacheSlot::Pending(_)) {
                *slot = CacheSlot::Ready(markup.clone());
            }
        }
        markup
    }

    fn start_fetch(&self, key: &str) -> PendingFetch {
        log::debug!("Fetching artwork {}", key);
        let request = self.source.fetch(key);
        let key = key.to_string();
        async move {
            match request.await {
                Ok(Some(markup)) => Some(Rc::from(markup)),
                Ok(None) => {
                    log::debug!("No artwork for {}", key);
                    None
                }
                Err(e) => {
                    log::warn!("Artwork fetch for {} failed: {}", key, e);
                    None
                }
            }
        }
        .boxed_local()
        .shared()
    }

    /// Whether a resolved result (including absence) is cached for a key.
    pub fn is_cached(&self, key: &str) -> bool {
        matches!(self.slots.borrow().get(key), Some(CacheSlot::Ready(_)))
    }

    /// Forget the cached result for a key.
    pub fn invalidate(&self, key: &str) {
        self.slots.borrow_mut().remove(key);
    }

    /// Forget every cached result.
    pub fn clear(&self) {
        self.slots.borrow_mut().clear();
    }
}
