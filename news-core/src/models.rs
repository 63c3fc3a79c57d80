use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One independently fetched and cached data feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Articles,
    Trending,
    Dashboard,
    Latest,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::Articles,
        Channel::Trending,
        Channel::Dashboard,
        Channel::Latest,
    ];

    /// Path segment under the API root for this channel.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Channel::Articles => "articles",
            Channel::Trending => "trending",
            Channel::Dashboard => "dashboard-data",
            Channel::Latest => "latest",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    pub source: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub audio_play_count: u64,
    #[serde(default)]
    pub has_audio: bool,
    #[serde(default)]
    pub audio_filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendingItem {
    pub id: u64,
    pub title: String,
    pub source: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub audio_play_count: u64,
    #[serde(default)]
    pub engagement_score: u64,
    #[serde(default)]
    pub has_audio: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateQuote {
    pub pair: String,
    pub value: String,
    pub change: String,
    pub trend: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FinancialRates {
    #[serde(default)]
    pub currencies: Vec<RateQuote>,
    #[serde(default)]
    pub crypto: Vec<RateQuote>,
    #[serde(default)]
    pub hungarian_stocks: Vec<RateQuote>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Weather {
    pub temperature: String,
    #[serde(default)]
    pub feels_like: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub humidity: Option<u32>,
    #[serde(default)]
    pub wind_speed: Option<u32>,
    #[serde(default)]
    pub pressure: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArticlePreview {
    pub title: String,
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceInfo {
    pub name: String,
    pub url: String,
    pub priority: String,
    pub status: String,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    pub latest_articles: Vec<ArticlePreview>,
}

/// Sidebar dashboard payload: rates, weather and per-category source lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Dashboard {
    #[serde(default)]
    pub financial_rates: Option<FinancialRates>,
    #[serde(default)]
    pub weather: Option<Weather>,
    #[serde(default)]
    pub rss_sources: Option<HashMap<String, Vec<SourceInfo>>>,
    #[serde(default)]
    pub processing_status: Option<String>,
}

impl Dashboard {
    /// A dashboard with no populated section carries no renderable data.
    pub fn is_empty(&self) -> bool {
        self.financial_rates.is_none() && self.weather.is_none() && self.rss_sources.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArticlesPage {
    #[serde(rename = "articles")]
    pub items: Vec<Article>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub processing_status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendingPage {
    #[serde(rename = "trending")]
    pub items: Vec<TrendingItem>,
    #[serde(default)]
    pub processing_status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LatestPage {
    #[serde(rename = "latest")]
    pub items: Vec<Article>,
    #[serde(default)]
    pub processing_status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessingStatus {
    pub is_processing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayCount {
    pub play_count: u64,
}

/// Payload of one channel, as cached and as delivered to render collaborators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ChannelData {
    Articles(ArticlesPage),
    Trending(TrendingPage),
    Dashboard(Dashboard),
    Latest(LatestPage),
}

impl ChannelData {
    pub fn channel(&self) -> Channel {
        match self {
            ChannelData::Articles(_) => Channel::Articles,
            ChannelData::Trending(_) => Channel::Trending,
            ChannelData::Dashboard(_) => Channel::Dashboard,
            ChannelData::Latest(_) => Channel::Latest,
        }
    }
}

/// Query parameters for the home-feed articles endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArticlesQuery {
    pub category: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for ArticlesQuery {
    fn default() -> Self {
        Self {
            category: None,
            limit: 20,
            offset: 0,
        }
    }
}

impl ArticlesQuery {
    /// True for the unfiltered first page, the only articles result we cache.
    pub fn is_default_view(&self) -> bool {
        self.offset == 0 && self.category.as_deref().map_or(true, |c| c == "all")
    }
}
