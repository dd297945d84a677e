//! Cache of raw decision responses.
//!
//! A repeated check that would send the collaborator the same prompt about
//! the same document reuses the earlier answer instead of calling it again.
//! The prompt carries the evidence list, so a cached decision is always paired
//! with the evidence it was made on. The raw response is cached, not the
//! normalized decision, so that the normalizer always runs.

use moka::future::Cache;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use crate::config::CacheConfig;
use crate::providers::ChatMessage;

/// Cache key for a decision request.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    document_fingerprint: u64,
    prompt_hash: u64,
    model: String,
}

impl CacheKey {
    /// Key for sending `messages` to `model` about a document.
    pub fn new(document_fingerprint: u64, messages: &[ChatMessage], model: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        for message in messages {
            message.role.hash(&mut hasher);
            message.content.hash(&mut hasher);
        }
        Self {
            document_fingerprint,
            prompt_hash: hasher.finish(),
            model: model.to_string(),
        }
    }
}

/// Raw-response cache using moka.
pub struct DecisionCache {
    cache: Option<Cache<CacheKey, String>>,
}

impl DecisionCache {
    /// Create a cache; `max_entries == 0` disables it.
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = (max_entries > 0).then(|| {
            Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl)
                .build()
        });

        Self { cache }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, config.ttl)
    }

    pub fn is_enabled(&self) -> bool {
        self.cache.is_some()
    }

    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        self.cache.as_ref()?.get(key).await
    }

    pub async fn insert(&self, key: CacheKey, response: String) {
        if let Some(cache) = &self.cache {
            cache.insert(key, response).await;
        }
    }

    pub fn invalidate_all(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
    }

    /// Approximate number of cached responses.
    pub fn entry_count(&self) -> u64 {
        self.cache.as_ref().map_or(0, |c| c.entry_count())
    }
}

impl Default for DecisionCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl std::fmt::Debug for DecisionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionCache")
            .field("enabled", &self.is_enabled())
            .field("entries", &self.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(user: &str) -> Vec<ChatMessage> {
        vec![ChatMessage::system("decide"), ChatMessage::user(user)]
    }

    #[tokio::test]
    async fn test_cache_operations() {
        let cache = DecisionCache::default();
        let key = CacheKey::new(42, &prompt(r#"{"extRechnungsbetrag":10.0}"#), "gpt-4o-mini");

        assert!(cache.get(&key).await.is_none());

        cache.insert(key.clone(), r#"{"approval":"No"}"#.to_string()).await;
        assert_eq!(cache.get(&key).await.as_deref(), Some(r#"{"approval":"No"}"#));
    }

    #[tokio::test]
    async fn test_key_separates_documents_prompts_and_models() {
        let cache = DecisionCache::default();
        cache
            .insert(CacheKey::new(1, &prompt("q"), "m"), "answer".to_string())
            .await;

        assert!(cache.get(&CacheKey::new(1, &prompt("q"), "m")).await.is_some());
        assert!(cache.get(&CacheKey::new(2, &prompt("q"), "m")).await.is_none());
        assert!(cache.get(&CacheKey::new(1, &prompt("other"), "m")).await.is_none());
        assert!(cache.get(&CacheKey::new(1, &prompt("q"), "other")).await.is_none());
    }

    #[test]
    fn test_key_covers_system_prompt() {
        let a = CacheKey::new(1, &[ChatMessage::system("a"), ChatMessage::user("q")], "m");
        let b = CacheKey::new(1, &[ChatMessage::system("b"), ChatMessage::user("q")], "m");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_disabled_cache() {
        let cache = DecisionCache::new(0, Duration::from_secs(60));
        let key = CacheKey::new(1, &prompt("q"), "m");
        cache.insert(key.clone(), "answer".to_string()).await;

        assert!(!cache.is_enabled());
        assert!(cache.get(&key).await.is_none());
        assert_eq!(cache.entry_count(), 0);
    }
}
