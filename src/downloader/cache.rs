use moka::future::Cache;
use std::time::Duration;

/// TTL cache for probe and search metadata. A zero TTL disables caching.
pub struct MetadataCache<V> {
    cache: Option<Cache<String, V>>,
}

impl<V> MetadataCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl_seconds: u64, max_entries: u64) -> Self {
        let cache = (ttl_seconds > 0).then(|| {
            Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(Duration::from_secs(ttl_seconds))
                .build()
        });
        Self { cache }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        match &self.cache {
            Some(cache) => cache.get(key).await,
            None => None,
        }
    }

    pub async fn set(&self, key: String, value: V) {
        if let Some(cache) = &self.cache {
            cache.insert(key, value).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_values_by_key() {
        let cache: MetadataCache<String> = MetadataCache::new(60, 16);
        cache.set("info:a".to_string(), "value".to_string()).await;
        assert_eq!(cache.get("info:a").await.as_deref(), Some("value"));
        assert_eq!(cache.get("search:a").await, None);
    }

    #[tokio::test]
    async fn zero_ttl_disables_cache() {
        let cache: MetadataCache<u32> = MetadataCache::new(0, 16);
        cache.set("k".to_string(), 1).await;
        assert_eq!(cache.get("k").await, None);
    }
}
