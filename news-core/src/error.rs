use reqwest::StatusCode;
use thiserror::Error;

/// Classified outcome of a single fetch attempt. Every network path resolves
/// to one of these; nothing below the adapter escapes as a raw error.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("http error: {status}")]
    Http { status: StatusCode },
    #[error("network error: {0}")]
    Network(reqwest::Error),
    #[error("payload empty or malformed")]
    EmptyPayload,
    #[error("server busy processing")]
    ServerBusy,
}

impl FetchError {
    /// Whether the controller should retry locally. A busy signal is
    /// authoritative and is deferred to the busy/idle transition instead.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::ServerBusy)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_decode() {
            FetchError::EmptyPayload
        } else {
            FetchError::Network(err)
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("scheduler task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("update channel closed unexpectedly")]
    UpdateChannelClosed,
    #[error("api base url cannot carry endpoint paths: {0}")]
    InvalidBaseUrl(url::Url),
}
