pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod fetch;
pub mod models;
pub mod scheduler;
pub mod status;

pub use cache::{CacheEntry, CacheStore};
pub use config::ClientConfig;
pub use controller::{fallback_for, Delivered, FreshnessController};
pub use error::{ClientError, FetchError};
pub use event::{Event, SkipReason};
pub use fetch::ApiClient;
pub use models::{
    Article, ArticlesPage, ArticlesQuery, Channel, ChannelData, Dashboard, LatestPage,
    TrendingItem, TrendingPage,
};
pub use scheduler::{spawn_scheduler, SchedulerHandle, TriggerHandle};
pub use status::{spawn_status_monitor, ProcessingState, StatusMonitorHandle};
