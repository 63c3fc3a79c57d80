use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::models::{Channel, ChannelData};

/// Last successfully fetched value for one channel.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: ChannelData,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }
}

/// Per-channel store of the most recent good payloads. Only the freshness
/// controller writes here, and only on a successful fetch; failed fetches
/// never touch a prior value.
#[derive(Debug, Clone, Default)]
pub struct CacheStore {
    inner: Arc<RwLock<HashMap<Channel, CacheEntry>>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, channel: Channel) -> Option<CacheEntry> {
        self.inner.read().await.get(&channel).cloned()
    }

    pub async fn insert(&self, data: ChannelData) {
        let entry = CacheEntry {
            fetched_at: Utc::now(),
            data,
        };
        let mut inner = self.inner.write().await;
        inner.insert(entry.data.channel(), entry);
    }

    pub async fn is_empty(&self, channel: Channel) -> bool {
        !self.inner.read().await.contains_key(&channel)
    }
}
