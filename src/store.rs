// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Bounded fixed-window counter store.
//!
//! An in-memory map from composite key to `(count, reset_at)`, bounded two
//! ways: a hard maximum entry count with least-recently-used eviction, and
//! per-entry expiry tied to the window length. Windows reset lazily on
//! access; a periodic sweep removes entries whose window has lapsed.
//!
//! This is a fixed-window counter, not a sliding log or token bucket: a
//! boundary-straddling burst can land up to twice `max_requests` across a
//! window edge. That is an accepted approximation of the scheme, kept
//! deliberately.
//!
//! Read-modify-write on a key is atomic relative to concurrent callers; all
//! state sits behind a single async mutex and no I/O happens under it.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{GuardError, Result};

/// Counter state for one `(identifier, endpoint)` key.
#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u32,
    reset_at: Instant,
    /// Monotonic counter value at last access, for LRU eviction
    last_access: u64,
}

/// Observation returned by [`WindowCounterStore::increment`].
#[derive(Debug, Clone, Copy)]
pub struct WindowObservation {
    /// Requests seen in the current window, including this one
    pub count: u32,
    /// When the current window ends
    pub reset_at: Instant,
}

#[derive(Debug, Default)]
struct StoreInner {
    entries: HashMap<String, WindowEntry>,
    access_counter: u64,
}

/// Capacity-bounded, TTL-expiring window counter store.
pub struct WindowCounterStore {
    inner: Mutex<StoreInner>,
    max_entries: usize,
}

impl WindowCounterStore {
    /// Create a store holding at most `max_entries` keys.
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
            max_entries,
        }
    }

    /// Count a request against `key` within a window of length `window`.
    ///
    /// If the key is absent or its window has lapsed, a fresh window starts
    /// at `count = 1`; otherwise the count increments and `reset_at` is
    /// unchanged.
    pub async fn increment(&self, key: &str, window: Duration) -> Result<WindowObservation> {
        if self.max_entries == 0 {
            // Cannot admit any entry; surfaced so the limiter fails closed.
            return Err(GuardError::Store(
                "counter store capacity is zero".to_string(),
            ));
        }

        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        inner.access_counter += 1;
        let order = inner.access_counter;

        let entry = inner
            .entries
            .entry(key.to_string())
            .and_modify(|e| {
                if now >= e.reset_at {
                    // Lapsed window: treat as absent
                    e.count = 1;
                    e.reset_at = now + window;
                } else {
                    e.count += 1;
                }
                e.last_access = order;
            })
            .or_insert(WindowEntry {
                count: 1,
                reset_at: now + window,
                last_access: order,
            });

        let observation = WindowObservation {
            count: entry.count,
            reset_at: entry.reset_at,
        };

        if inner.entries.len() > self.max_entries {
            evict_lru(&mut inner.entries);
        }

        Ok(observation)
    }

    /// Drop entries whose window has lapsed. Called from the periodic
    /// sweep task.
    pub async fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        let before = inner.entries.len();
        inner.entries.retain(|_, e| now < e.reset_at);
        let removed = before - inner.entries.len();
        if removed > 0 {
            debug!(removed, "Swept expired rate limit windows");
        }
        removed
    }

    /// Remove all entries whose key starts with `prefix`. Used for manual
    /// unblocking and test teardown.
    pub async fn remove_prefix(&self, prefix: &str) -> usize {
        let mut inner = self.inner.lock().await;
        let before = inner.entries.len();
        inner.entries.retain(|k, _| !k.starts_with(prefix));
        before - inner.entries.len()
    }

    /// Wipe the entire store.
    pub async fn clear(&self) {
        self.inner.lock().await.entries.clear();
    }

    /// Number of tracked keys.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    /// Whether the store tracks no keys.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Evict the least-recently-used entry.
fn evict_lru(entries: &mut HashMap<String, WindowEntry>) {
    if let Some(key) = entries
        .iter()
        .min_by_key(|(_, e)| e.last_access)
        .map(|(k, _)| k.clone())
    {
        debug!(key = %key, "Evicting least-recently-used rate limit entry");
        entries.remove(&key);
        crate::metrics::STORE_EVICTIONS.inc();
    }
}
