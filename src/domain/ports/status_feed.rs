use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by a status feed client
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Status feed is not connected")]
    NotConnected,

    #[error("Status feed I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Status feed rejected message: {0}")]
    Rejected(String),
}

/// Outbound half of the validator status feed.
///
/// Replies are not returned here; they arrive asynchronously on the
/// `beacon.client.message` bus topic.
#[async_trait]
pub trait StatusFeed: Send + Sync {
    /// Send one serialized request
    async fn send(&self, payload: &[u8]) -> Result<(), FeedError>;
}
