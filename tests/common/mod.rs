//! Common test utilities for integration tests
//!
//! Shared fixtures for wiring a watchtower against the in-memory adapters.

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use watchtower::adapters::{MockChainGateway, MockStatusFeed};
use watchtower::domain::models::{FeedClientId, BEACON_CLIENT_MESSAGE_TOPIC};
use watchtower::{Address, BusEvent, EventBus, WatchtowerProcess};

pub const PUBKEY_A: &str = "0xAA000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000a";
pub const PUBKEY_B: &str = "0xBB000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000b";

pub const MINIPOOL_A: Address = Address::repeat_byte(0x0a);
pub const MINIPOOL_B: Address = Address::repeat_byte(0x0b);

/// 32 ETH in gwei
pub const FULL_BALANCE_GWEI: u64 = 32_000_000_000;

/// Mocks plus an unstarted process sharing them
pub struct Harness {
    pub chain: Arc<MockChainGateway>,
    pub feed: Arc<MockStatusFeed>,
    pub bus: Arc<EventBus>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            chain: Arc::new(MockChainGateway::new()),
            feed: Arc::new(MockStatusFeed::new()),
            bus: Arc::new(EventBus::new()),
        }
    }

    pub fn process(&self) -> WatchtowerProcess {
        WatchtowerProcess::new(self.chain.clone(), self.feed.clone(), self.bus.clone())
    }

    /// Publish a validator status report as the feed client would
    pub async fn report(&self, pubkey: &str, code: &str, balance_gwei: u64) -> usize {
        let event = BusEvent::BeaconClientMessage {
            client: FeedClientId::new(),
            message: status_report(pubkey, code, balance_gwei),
        };
        self.bus.publish(BEACON_CLIENT_MESSAGE_TOPIC, event).await
    }
}

/// Raw `validator_status` payload as sent by the feed
pub fn status_report(pubkey: &str, code: &str, balance_gwei: u64) -> Vec<u8> {
    let message = serde_json::json!({
        "message": "validator_status",
        "pubkey": pubkey,
        "status": { "code": code },
        "balance": balance_gwei,
    });
    serde_json::to_vec(&message).expect("report serializes")
}

/// Poll `condition` every 10ms until it holds or `timeout` elapses
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Setup test logging
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
