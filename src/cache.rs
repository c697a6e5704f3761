//! Process-wide analysis cache.
//!
//! Keys are derived from a normalized transcript plus the question identity
//! and coaching preferences, so re-submitted audio that transcribes to the
//! same text (modulo case and whitespace) reuses a prior result instead of
//! hitting the scoring service again.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use log::debug;
use parking_lot::Mutex;

use crate::scoring::{AnalysisResult, CoachingPreferences};

pub const DEFAULT_CAPACITY: usize = 1000;
pub const DEFAULT_EVICT_BATCH: usize = 100;
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Injectable cache seam: tests substitute [`NoopCache`], production can
/// back this with a shared external cache without touching calling code.
pub trait AnalysisCache: Send + Sync {
    fn get(&self, key: &str) -> Option<AnalysisResult>;
    fn set(&self, key: &str, result: AnalysisResult, ttl: Duration);
    /// Drops every expired entry, returning how many were removed.
    fn evict_expired(&self) -> usize;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct CacheEntry {
    data: AnalysisResult,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Bounded in-memory cache: lazy TTL expiry on read, oldest-first batch
/// eviction once the capacity is reached.
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    capacity: usize,
    evict_batch: usize,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, DEFAULT_EVICT_BATCH)
    }

    pub fn with_capacity(capacity: usize, evict_batch: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity,
            evict_batch: evict_batch.max(1),
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisCache for InMemoryCache {
    fn get(&self, key: &str) -> Option<AnalysisResult> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expired(Utc::now()) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.data.clone()),
            None => None,
        }
    }

    fn set(&self, key: &str, result: AnalysisResult, ttl: Duration) {
        let mut entries = self.entries.lock();
        if !entries.contains_key(key) && entries.len() >= self.capacity {
            let mut by_age: Vec<(String, DateTime<Utc>)> = entries
                .iter()
                .map(|(k, e)| (k.clone(), e.created_at))
                .collect();
            by_age.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
            for (old_key, _) in by_age.into_iter().take(self.evict_batch) {
                entries.remove(&old_key);
            }
            debug!("Analysis cache full, evicted {} oldest entries", self.evict_batch);
        }

        let created_at = Utc::now();
        let expires_at = created_at
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::max_value());
        entries.insert(
            key.to_string(),
            CacheEntry {
                data: result,
                created_at,
                expires_at,
            },
        );
    }

    fn evict_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let now = Utc::now();
        let before = entries.len();
        entries.retain(|_, entry| !entry.expired(now));
        before - entries.len()
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Cache that never hits and never stores, for tests and one-off scoring.
pub struct NoopCache;

impl AnalysisCache for NoopCache {
    fn get(&self, _key: &str) -> Option<AnalysisResult> {
        None
    }

    fn set(&self, _key: &str, _result: AnalysisResult, _ttl: Duration) {}

    fn evict_expired(&self) -> usize {
        0
    }

    fn len(&self) -> usize {
        0
    }
}

lazy_static! {
    static ref SHARED_CACHE: Arc<InMemoryCache> = Arc::new(InMemoryCache::new());
}

/// The process-wide default cache shared by every scoring client that does
/// not inject its own.
pub fn shared_cache() -> Arc<InMemoryCache> {
    SHARED_CACHE.clone()
}

/// Builds the cache key:
/// `questionId:sortedTags:preferencesJson:prefix|length|hash`, with the
/// transcript lower-cased and whitespace-collapsed first so trivially
/// different transcriptions share an entry.
pub fn cache_key(
    transcript: &str,
    question_id: &str,
    tags: &[String],
    preferences: &CoachingPreferences,
) -> String {
    let normalized = normalize_transcript(transcript);
    let mut sorted_tags: Vec<&str> = tags.iter().map(String::as_str).collect();
    sorted_tags.sort_unstable();
    let prefs_json = serde_json::to_string(preferences).unwrap_or_default();

    let mut hasher = DefaultHasher::new();
    normalized.hash(&mut hasher);
    let prefix: String = normalized.chars().take(32).collect();

    format!(
        "{}:{}:{}:{}|{}|{:x}",
        question_id,
        sorted_tags.join(","),
        prefs_json,
        prefix,
        normalized.len(),
        hasher.finish()
    )
}

fn normalize_transcript(transcript: &str) -> String {
    transcript
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::result::test_support::sample_result;

    #[test]
    fn key_normalizes_case_and_whitespace() {
        let prefs = CoachingPreferences::default();
        let tags = vec!["caching".to_string(), "api".to_string()];
        let a = cache_key("I built  the   Cache Layer", "q1", &tags, &prefs);
        let b = cache_key("i built the cache layer", "q1", &tags, &prefs);
        assert_eq!(a, b);
    }

    #[test]
    fn key_distinguishes_question_tags_and_preferences() {
        let prefs = CoachingPreferences::default();
        let tags = vec!["caching".to_string()];
        let base = cache_key("same answer text here", "q1", &tags, &prefs);
        assert_ne!(base, cache_key("same answer text here", "q2", &tags, &prefs));
        assert_ne!(base, cache_key("same answer text here", "q1", &[], &prefs));

        let mut other_prefs = CoachingPreferences::default();
        other_prefs.priorities.push("clarity".to_string());
        assert_ne!(base, cache_key("same answer text here", "q1", &tags, &other_prefs));
    }

    #[test]
    fn tag_order_does_not_change_the_key() {
        let prefs = CoachingPreferences::default();
        let ab = vec!["a".to_string(), "b".to_string()];
        let ba = vec!["b".to_string(), "a".to_string()];
        assert_eq!(
            cache_key("answer", "q1", &ab, &prefs),
            cache_key("answer", "q1", &ba, &prefs)
        );
    }

    #[test]
    fn entries_expire_on_read_past_ttl() {
        let cache = InMemoryCache::new();
        cache.set("k", sample_result(), Duration::ZERO);
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0);

        cache.set("k", sample_result(), Duration::from_secs(60));
        assert!(cache.get("k").is_some());
    }

    #[test]
    fn evict_expired_purges_only_stale_entries() {
        let cache = InMemoryCache::new();
        cache.set("stale", sample_result(), Duration::ZERO);
        cache.set("fresh", sample_result(), Duration::from_secs(60));
        assert_eq!(cache.evict_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("fresh").is_some());
    }

    #[test]
    fn full_cache_evicts_oldest_batch() {
        let cache = InMemoryCache::with_capacity(3, 2);
        cache.set("a", sample_result(), Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(2));
        cache.set("b", sample_result(), Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(2));
        cache.set("c", sample_result(), Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(2));
        cache.set("d", sample_result(), Duration::from_secs(60));

        // a and b (the two oldest) were evicted before inserting d
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
        assert!(cache.get("d").is_some());
    }

    #[test]
    fn overwriting_an_existing_key_does_not_evict() {
        let cache = InMemoryCache::with_capacity(2, 1);
        cache.set("a", sample_result(), Duration::from_secs(60));
        cache.set("b", sample_result(), Duration::from_secs(60));
        cache.set("a", sample_result(), Duration::from_secs(60));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_some());
    }
}
