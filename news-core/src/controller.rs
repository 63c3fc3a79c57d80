use chrono::Duration as ChronoDuration;
use futures_util::future::join_all;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::cache::CacheStore;
use crate::config::ClientConfig;
use crate::error::FetchError;
use crate::event::Event;
use crate::fetch::ApiClient;
use crate::models::{
    Article, ArticlesPage, ArticlesQuery, Channel, ChannelData, Dashboard, LatestPage,
    TrendingPage,
};
use crate::status::ProcessingState;

/// What a refresh cycle hands to the rendering layer. Always carries a
/// renderable payload; there is no empty outcome.
#[derive(Debug, Clone)]
pub enum Delivered {
    /// Straight from the backend; the cache was updated.
    Fresh(ChannelData),
    /// Backend unavailable; last good value, annotated with its age.
    Cached {
        data: ChannelData,
        age: ChronoDuration,
    },
    /// No cached value has ever existed; minimal placeholder.
    Fallback(ChannelData),
}

impl Delivered {
    pub fn data(&self) -> &ChannelData {
        match self {
            Delivered::Fresh(data) => data,
            Delivered::Cached { data, .. } => data,
            Delivered::Fallback(data) => data,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Delivered::Fresh(_))
    }
}

/// Per-channel fetch/retry/cache orchestration. Owns the only write path
/// into the cache store.
#[derive(Debug, Clone)]
pub struct FreshnessController {
    api: ApiClient,
    cache: CacheStore,
    busy_rx: watch::Receiver<ProcessingState>,
    config: ClientConfig,
    update_tx: mpsc::Sender<Event>,
}

impl FreshnessController {
    pub fn new(
        api: ApiClient,
        cache: CacheStore,
        busy_rx: watch::Receiver<ProcessingState>,
        config: ClientConfig,
        update_tx: mpsc::Sender<Event>,
    ) -> Self {
        Self {
            api,
            cache,
            busy_rx,
            config,
            update_tx,
        }
    }

    /// Synchronous cache read for initial render, before any cycle completes.
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    fn is_busy(&self) -> bool {
        self.busy_rx.borrow().is_busy()
    }

    /// Refresh one channel: bounded retries with doubling backoff, busy
    /// short-circuit, cache update on success, cached/fallback resolution on
    /// exhaustion. The returned value is also emitted as a `ChannelUpdate`.
    pub async fn refresh(&self, channel: Channel) -> Delivered {
        let delivered = if self.is_busy() {
            debug!(channel = %channel, "refresh held back, backend busy");
            self.resolve_degraded(channel).await
        } else {
            match self.fetch_with_retry(channel).await {
                Ok(data) => {
                    self.cache.insert(data.clone()).await;
                    Delivered::Fresh(data)
                }
                Err(err) => {
                    warn!(channel = %channel, error = %err, "refresh exhausted, serving degraded data");
                    self.resolve_degraded(channel).await
                }
            }
        };

        self.emit(channel, delivered.clone()).await;
        delivered
    }

    /// Refresh several channels concurrently. Outcomes are applied and
    /// delivered independently; one channel failing cannot hold up another.
    pub async fn refresh_group(&self, channels: &[Channel]) -> Vec<Delivered> {
        join_all(channels.iter().map(|channel| self.refresh(*channel))).await
    }

    /// Category/pagination-aware articles refresh for the render layer's
    /// category switch and load-more. Only the default view is cached, so a
    /// filtered page never overwrites the home feed's good data.
    pub async fn refresh_articles(&self, query: &ArticlesQuery) -> Delivered {
        if self.is_busy() {
            debug!("article query held back, backend busy");
            let delivered = self.resolve_degraded(Channel::Articles).await;
            self.emit(Channel::Articles, delivered.clone()).await;
            return delivered;
        }

        let mut attempt = 1;
        let delivered = loop {
            match self.api.fetch_articles(query).await {
                Ok(page) => {
                    let data = ChannelData::Articles(page);
                    if query.is_default_view() {
                        self.cache.insert(data.clone()).await;
                    }
                    break Delivered::Fresh(data);
                }
                Err(err) => match self.next_attempt(Channel::Articles, attempt, &err).await {
                    Some(next) => attempt = next,
                    None => break self.resolve_degraded(Channel::Articles).await,
                },
            }
        };

        self.emit(Channel::Articles, delivered.clone()).await;
        delivered
    }

    async fn fetch_with_retry(&self, channel: Channel) -> Result<ChannelData, FetchError> {
        let mut attempt = 1;
        loop {
            match self.api.fetch(channel).await {
                Ok(data) => return Ok(data),
                Err(err) => match self.next_attempt(channel, attempt, &err).await {
                    Some(next) => attempt = next,
                    None => return Err(err),
                },
            }
        }
    }

    /// Decide whether attempt `attempt` is followed by another one. Sleeps
    /// out the backoff delay when it is. `ServerBusy` never retries locally:
    /// the busy signal is authoritative and the idle transition will trigger
    /// the next refresh.
    async fn next_attempt(
        &self,
        channel: Channel,
        attempt: u32,
        err: &FetchError,
    ) -> Option<u32> {
        if !err.is_retryable() {
            debug!(channel = %channel, "busy signal received, deferring to idle transition");
            return None;
        }
        if attempt >= self.config.max_retries {
            return None;
        }
        let delay = self.config.backoff_delay(attempt);
        debug!(channel = %channel, attempt, error = %err, delay_ms = delay.as_millis() as u64, "fetch failed, backing off");
        tokio::time::sleep(delay).await;
        Some(attempt + 1)
    }

    /// Cached beats fallback whenever any good value exists; fallback is
    /// never written into the cache.
    async fn resolve_degraded(&self, channel: Channel) -> Delivered {
        match self.cache.get(channel).await {
            Some(entry) => Delivered::Cached {
                age: entry.age(),
                data: entry.data,
            },
            None => Delivered::Fallback(fallback_for(channel)),
        }
    }

    async fn emit(&self, channel: Channel, delivered: Delivered) {
        let event = Event::ChannelUpdate { channel, delivered };
        if self.update_tx.send(event).await.is_err() {
            debug!("update receiver dropped");
        }
    }

    /// Forward a play event to the backend without blocking the caller on
    /// the outcome.
    pub fn record_play(&self, article_id: u64) {
        let api = self.api.clone();
        tokio::spawn(async move {
            api.record_play(article_id).await;
        });
    }
}

fn placeholder_article() -> Article {
    Article {
        id: 0,
        title: "Loading latest news...".into(),
        summary: Some("The newsroom is refreshing its data. Fresh articles will appear shortly.".into()),
        source: "Newsdeck".into(),
        category: Some("general".into()),
        url: None,
        created_at: Some(chrono::Utc::now()),
        view_count: 0,
        audio_play_count: 0,
        has_audio: false,
        audio_filename: None,
    }
}

/// Minimal single-record placeholder per channel, used only before the first
/// successful fetch.
pub fn fallback_for(channel: Channel) -> ChannelData {
    match channel {
        Channel::Articles => ChannelData::Articles(ArticlesPage {
            items: vec![placeholder_article()],
            total: 1,
            has_more: false,
            processing_status: None,
        }),
        Channel::Latest => ChannelData::Latest(LatestPage {
            items: vec![placeholder_article()],
            processing_status: None,
        }),
        Channel::Trending => ChannelData::Trending(TrendingPage {
            items: vec![crate::models::TrendingItem {
                id: 0,
                title: "Trending data unavailable".into(),
                source: "Newsdeck".into(),
                category: None,
                view_count: 0,
                audio_play_count: 0,
                engagement_score: 0,
                has_audio: false,
            }],
            processing_status: None,
        }),
        Channel::Dashboard => ChannelData::Dashboard(Dashboard {
            rss_sources: Some(
                [(
                    "general".to_string(),
                    vec![crate::models::SourceInfo {
                        name: "Sources loading...".into(),
                        url: String::new(),
                        priority: "low".into(),
                        status: "inactive".into(),
                        last_sync: None,
                        latest_articles: Vec::new(),
                    }],
                )]
                .into_iter()
                .collect(),
            ),
            ..Dashboard::default()
        }),
    }
}
