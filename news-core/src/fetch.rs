use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ClientError, FetchError};
use crate::models::{
    ArticlesPage, ArticlesQuery, Channel, ChannelData, Dashboard, LatestPage, PlayCount,
    ProcessingStatus, TrendingPage,
};

const TRENDING_LIMIT: u32 = 10;
const LATEST_LIMIT: u32 = 6;

/// Thin adapter over the backend API: one request, one classified outcome.
/// Does not touch the cache and never lets a raw error escape.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(client: Client, base_url: Url, config: ClientConfig) -> Result<Self, ClientError> {
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(base_url));
        }
        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        // Cannot-be-a-base urls are rejected in new(), so the segment
        // accessor always succeeds.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("channel");
            for part in path.split('/') {
                segments.push(part);
            }
        }
        url
    }

    /// One deadline covers the whole exchange. A server that returns headers
    /// promptly and then stalls the body gets no second budget.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
        timeout: std::time::Duration,
    ) -> Result<T, FetchError> {
        let exchange = async {
            let response = self.client.get(url).query(query).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Http { status });
            }
            response.bytes().await.map_err(FetchError::from)
        };
        let body = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| FetchError::Timeout)??;
        serde_json::from_slice(&body).map_err(|err| {
            debug!(error = %err, "response failed schema validation");
            FetchError::EmptyPayload
        })
    }

    /// Backend-reported busy marker overrides everything else, including a
    /// 2xx status.
    fn check_busy(marker: &Option<String>) -> Result<(), FetchError> {
        if marker.as_deref() == Some("processing") {
            Err(FetchError::ServerBusy)
        } else {
            Ok(())
        }
    }

    pub async fn fetch_articles(&self, query: &ArticlesQuery) -> Result<ArticlesPage, FetchError> {
        let mut params = vec![
            ("limit", query.limit.to_string()),
            ("offset", query.offset.to_string()),
        ];
        if let Some(category) = query.category.as_deref().filter(|c| *c != "all") {
            params.push(("category", category.to_string()));
        }

        let page: ArticlesPage = self
            .get_json(self.endpoint("articles"), &params, self.config.fetch_timeout)
            .await?;
        Self::check_busy(&page.processing_status)?;
        if page.items.is_empty() {
            return Err(FetchError::EmptyPayload);
        }
        Ok(page)
    }

    pub async fn fetch_trending(&self) -> Result<TrendingPage, FetchError> {
        let params = [("limit", TRENDING_LIMIT.to_string())];
        let page: TrendingPage = self
            .get_json(self.endpoint("trending"), &params, self.config.fetch_timeout)
            .await?;
        Self::check_busy(&page.processing_status)?;
        if page.items.is_empty() {
            return Err(FetchError::EmptyPayload);
        }
        Ok(page)
    }

    pub async fn fetch_dashboard(&self) -> Result<Dashboard, FetchError> {
        let dashboard: Dashboard = self
            .get_json(
                self.endpoint("dashboard-data"),
                &[],
                self.config.fetch_timeout,
            )
            .await?;
        Self::check_busy(&dashboard.processing_status)?;
        if dashboard.is_empty() {
            return Err(FetchError::EmptyPayload);
        }
        Ok(dashboard)
    }

    pub async fn fetch_latest(&self) -> Result<LatestPage, FetchError> {
        let params = [("limit", LATEST_LIMIT.to_string())];
        let page: LatestPage = self
            .get_json(self.endpoint("latest"), &params, self.config.fetch_timeout)
            .await?;
        Self::check_busy(&page.processing_status)?;
        if page.items.is_empty() {
            return Err(FetchError::EmptyPayload);
        }
        Ok(page)
    }

    /// Fetch one channel with its default query.
    pub async fn fetch(&self, channel: Channel) -> Result<ChannelData, FetchError> {
        match channel {
            Channel::Articles => {
                let query = ArticlesQuery {
                    limit: self.config.page_size,
                    ..ArticlesQuery::default()
                };
                self.fetch_articles(&query).await.map(ChannelData::Articles)
            }
            Channel::Trending => self.fetch_trending().await.map(ChannelData::Trending),
            Channel::Dashboard => self.fetch_dashboard().await.map(ChannelData::Dashboard),
            Channel::Latest => self.fetch_latest().await.map(ChannelData::Latest),
        }
    }

    /// Poll the dedicated busy-signal endpoint with its own short deadline.
    pub async fn poll_status(&self) -> Result<bool, FetchError> {
        let status: ProcessingStatus = self
            .get_json(
                self.endpoint("processing-status"),
                &[],
                self.config.status_poll_timeout,
            )
            .await?;
        Ok(status.is_processing)
    }

    /// Fire-and-forget play counter bump. Failures are logged and dropped;
    /// playback must not depend on the counter.
    pub async fn record_play(&self, article_id: u64) {
        let url = self.endpoint(&format!("articles/{article_id}/play"));
        let exchange = async {
            let response = self.client.post(url).send().await?;
            response.json::<PlayCount>().await
        };
        match tokio::time::timeout(self.config.fetch_timeout, exchange).await {
            Ok(Ok(count)) => debug!(article = article_id, plays = count.play_count, "play recorded"),
            Ok(Err(err)) => debug!(error = %err, "play tracking failed"),
            Err(_) => debug!(article = article_id, "play tracking timed out"),
        }
    }
}
