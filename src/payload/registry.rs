//! Live payload registry with replace-by-id and TTL expiry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::types::Payload;

#[derive(Debug, Clone)]
struct Entry {
    payload: Arc<Payload>,
    created_at: Instant,
    /// `None` for persistent payloads.
    expires_at: Option<Instant>,
}

/// System of record for what is currently visible.
///
/// Not internally synchronized; the engine holds it behind a mutex so the
/// producer path and the render tick never observe a partial update.
#[derive(Debug, Default)]
pub struct PayloadRegistry {
    entries: HashMap<String, Entry>,
}

impl PayloadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or fully replace `payload`, restarting its TTL at `now`.
    ///
    /// Returns true when an existing payload was replaced.
    pub fn upsert(&mut self, payload: Payload, now: Instant) -> bool {
        let expires_at = if payload.ttl > 0.0 {
            // A ttl too large to represent never expires.
            Duration::try_from_secs_f64(payload.ttl)
                .ok()
                .and_then(|ttl| now.checked_add(ttl))
        } else {
            None
        };
        let id = payload.id.clone();
        let entry = Entry {
            payload: Arc::new(payload),
            created_at: now,
            expires_at,
        };
        let replaced = self.entries.insert(id.clone(), entry).is_some();
        log::trace!("[REGISTRY] upsert {} (replaced: {})", id, replaced);
        replaced
    }

    /// Remove `id`. Returns false when it was not present.
    pub fn clear(&mut self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Remove every payload whose TTL has elapsed at `now`.
    ///
    /// Returns the expired ids in sorted order.
    pub fn sweep(&mut self, now: Instant) -> Vec<String> {
        let mut expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.expires_at.is_some_and(|at| at <= now))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            self.entries.remove(id);
        }
        expired.sort();
        if !expired.is_empty() {
            log::debug!("[REGISTRY] Swept {} expired payloads", expired.len());
        }
        expired
    }

    /// Every live payload, sorted by id.
    pub fn live(&self) -> Vec<Arc<Payload>> {
        let mut payloads: Vec<Arc<Payload>> =
            self.entries.values().map(|e| e.payload.clone()).collect();
        payloads.sort_by(|a, b| a.id.cmp(&b.id));
        payloads
    }

    pub fn get(&self, id: &str) -> Option<Arc<Payload>> {
        self.entries.get(id).map(|e| e.payload.clone())
    }

    /// When `id` was last upserted.
    pub fn created_at(&self, id: &str) -> Option<Instant> {
        self.entries.get(id).map(|e| e.created_at)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
