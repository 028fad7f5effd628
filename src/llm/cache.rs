//! Response cache for AI outcomes
//!
//! Shared by every session. Expiry is checked and stale entries evicted under
//! the same lock as the lookup, so a lookup never races a fresher insert for
//! the same key.

use crate::context::ConversationContext;
use crate::core::text::normalize;
use crate::core::types::ProcessingResult;
use ahash::AHashMap;
use sha2::{Digest, Sha256};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub result: ProcessingResult,
    pub expires_at: Instant,
}

impl CachedResponse {
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug)]
pub struct ResponseCache {
    entries: Mutex<AHashMap<String, CachedResponse>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: Mutex::new(AHashMap::new()), ttl }
    }

    fn entries(&self) -> MutexGuard<'_, AHashMap<String, CachedResponse>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("response cache lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<ProcessingResult> {
        self.lookup_at(key, Instant::now())
    }

    /// Live entry for `key` as of `now`; an expired entry is evicted
    pub fn lookup_at(&self, key: &str, now: Instant) -> Option<ProcessingResult> {
        let mut entries = self.entries();
        match entries.get(key) {
            Some(entry) if !entry.is_expired_at(now) => Some(entry.result.clone()),
            Some(_) => {
                entries.remove(key);
                tracing::debug!("evicted expired cache entry {}", key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: String, result: ProcessingResult) {
        self.insert_at(key, result, Instant::now());
    }

    pub fn insert_at(&self, key: String, result: ProcessingResult, now: Instant) {
        let expires_at = now + self.ttl;
        self.entries().insert(key, CachedResponse { result, expires_at });
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// Stable cache key from the normalized utterance and the context fields
/// that change its meaning
pub fn fingerprint(utterance: &str, context: &ConversationContext) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize(utterance).as_bytes());
    hasher.update([0u8]);
    hasher.update(context.active_layer.to_lowercase().as_bytes());
    hasher.update([0u8]);
    for id in &context.selected_entities {
        hasher.update(id.to_string().as_bytes());
    }
    hasher.update([0u8]);
    if let Some(last) = &context.last_created {
        hasher.update(last.id.to_string().as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::EntityId;

    #[test]
    fn test_live_hit_then_expired_miss() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        let t0 = Instant::now();
        cache.insert_at("k".into(), ProcessingResult::Success("done".into()), t0);

        let hit = cache.lookup_at("k", t0 + Duration::from_secs(299));
        assert_eq!(hit, Some(ProcessingResult::Success("done".into())));

        assert_eq!(cache.lookup_at("k", t0 + Duration::from_secs(301)), None);
        // Evicted, not just hidden
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_reinsert_replaces_stale_entry() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        let t0 = Instant::now();
        cache.insert_at("k".into(), ProcessingResult::Success("old".into()), t0);
        let later = t0 + Duration::from_secs(400);
        cache.insert_at("k".into(), ProcessingResult::Success("new".into()), later);

        assert_eq!(cache.lookup_at("k", later), Some(ProcessingResult::Success("new".into())));
    }

    #[test]
    fn test_purge_expired() {
        let cache = ResponseCache::new(Duration::ZERO);
        cache.insert("a".into(), ProcessingResult::Success("a".into()));
        cache.insert("b".into(), ProcessingResult::Success("b".into()));
        assert_eq!(cache.purge_expired(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_fingerprint_normalizes_and_tracks_context() {
        let ctx = ConversationContext::default();
        let a = fingerprint("Arrange  five spheres", &ctx);
        let b = fingerprint("arrange five SPHERES", &ctx);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let mut selected = ConversationContext::default();
        selected.selected_entities.insert(EntityId::new());
        assert_ne!(a, fingerprint("arrange five spheres", &selected));
    }
}
