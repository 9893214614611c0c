//! Per-(author, conversation) bookkeeping.
//!
//! Two bounded caches back the runtime's only mutated shared state: the
//! greeting tracker and the event-redelivery ledger. Both use an LRU with a
//! fixed capacity so process-lifetime growth stays bounded, and both do
//! their check-and-set under one lock so concurrent delivery of the same key
//! cannot double-greet or double-answer.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

/// Tracks which (author, conversation) pairs have already been greeted.
pub struct SessionTracker {
    greeted: Mutex<LruCache<(String, String), ()>>,
    greeting: String,
}

impl SessionTracker {
    pub fn new(capacity: usize, greeting: &str) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);

        Self {
            greeted: Mutex::new(LruCache::new(capacity)),
            greeting: greeting.to_string(),
        }
    }

    /// The greeting plus a blank line on the first call for a given key, an
    /// empty string on every later call. Not persisted; resets on restart.
    pub fn greeting_prefix(&self, author_id: &str, conversation_id: &str) -> String {
        if self.greeting.is_empty() {
            return String::new();
        }

        let key = (author_id.to_string(), conversation_id.to_string());
        let mut greeted = self.greeted.lock();

        if greeted.put(key, ()).is_some() {
            String::new()
        } else {
            format!("{}\n", self.greeting)
        }
    }
}

/// Remembers recently handled event IDs so a redelivered event resolves at
/// most one placeholder.
pub struct EventLedger {
    seen: Mutex<LruCache<String, ()>>,
}

impl EventLedger {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);

        Self {
            seen: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// True exactly once per event ID.
    pub fn first_delivery(&self, event_id: &str) -> bool {
        self.seen.lock().put(event_id.to_string(), ()).is_none()
    }
}

// Tests.
