//! Domain errors for the watchtower daemon.

use thiserror::Error;

/// Domain-level errors raised while interpreting protocol data.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}
