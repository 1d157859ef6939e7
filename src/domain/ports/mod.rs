//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces that infrastructure adapters implement:
//! - ChainGateway: sync waits, protocol reads, watchtower transactions
//! - StatusFeed: outbound requests to the validator status feed

pub mod chain_gateway;
pub mod status_feed;

pub use chain_gateway::{ChainError, ChainGateway, ChainResult, Transactor, TxReceipt};
pub use status_feed::{FeedError, StatusFeed};
