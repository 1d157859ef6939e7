//! Top-level error type for assembling and running the daemon.

use thiserror::Error;

use crate::domain::errors::DomainError;
use crate::domain::ports::{ChainError, FeedError};
use crate::infrastructure::config::ConfigError;

#[derive(Error, Debug)]
pub enum WatchtowerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Status feed error: {0}")]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

pub type WatchtowerResult<T> = Result<T, WatchtowerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraps_component_errors() {
        let err: WatchtowerError = FeedError::NotConnected.into();
        assert_eq!(err.to_string(), "Status feed error: Status feed is not connected");

        let err: WatchtowerError = ConfigError::EmptyBeaconAddress.into();
        assert!(matches!(err, WatchtowerError::Config(_)));

        let err: WatchtowerError = DomainError::InvalidAddress("0x12".into()).into();
        assert_eq!(err.to_string(), "Invalid address: 0x12");
    }
}
