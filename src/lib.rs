//! Watchtower - Rocket Pool trusted-node watchtower daemon
//!
//! While the configured node is trusted, the watchtower polls the active
//! minipool set, asks the beacon status feed for each validator's status and
//! submits `logoutMinipool` / `withdrawMinipool` transactions when a validator
//! has exited or become withdrawable.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Protocol types, transition rules and port traits
//! - **Service Layer** (`services`): Trust monitor, pool supervisor, transition handler
//! - **Infrastructure Layer** (`infrastructure`): JSON-RPC gateway, feed client, config, logging
//! - **Adapters** (`adapters`): In-memory port implementations for tests
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use watchtower::{EventBus, WatchtowerProcess};
//!
//! let bus = Arc::new(EventBus::new());
//! let handle = WatchtowerProcess::new(chain, feed, bus).start();
//! tokio::signal::ctrl_c().await?;
//! handle.shutdown().await;
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    Address, BusEvent, ClientMessage, Config, MinipoolSet, MinipoolStatus, ServerMessage,
    TransitionAction, ValidatorPubkey, ValidatorStatusCode, WatchtowerTransaction,
};
pub use domain::ports::{ChainError, ChainGateway, FeedError, StatusFeed};
pub use error::{WatchtowerError, WatchtowerResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{EventBus, WatchtowerHandle, WatchtowerProcess};
