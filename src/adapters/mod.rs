//! In-memory adapters for the domain ports.

pub mod mock;

pub use mock::{MockChainGateway, MockStatusFeed};
