//! Trust monitor.
//!
//! Re-reads the node's trusted flag every tick and edge-triggers supervision:
//! starting it when the node becomes trusted and standing it down when the
//! flag clears. Both transitions are no-ops when the state already matches.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::domain::models::BEACON_CLIENT_MESSAGE_TOPIC;
use crate::services::pool_supervisor::PoolSupervisor;
use crate::services::watchtower::WatchtowerContext;

pub struct TrustMonitor {
    ctx: Arc<WatchtowerContext>,
    supervisor: Arc<PoolSupervisor>,
}

impl TrustMonitor {
    pub fn new(ctx: Arc<WatchtowerContext>, supervisor: Arc<PoolSupervisor>) -> Self {
        Self { ctx, supervisor }
    }

    /// One trust check: wait for sync, read the flag, toggle supervision.
    ///
    /// A failed read leaves supervision as it is until the next tick.
    pub async fn check_trusted(&self) {
        self.ctx.counters.trust_checks.fetch_add(1, Ordering::Relaxed);

        if let Err(e) = self.ctx.chain.wait_for_sync().await {
            tracing::error!(error = %e, "Error waiting for node to sync");
            return;
        }

        let node = self.ctx.chain.node_address();
        match self.ctx.chain.is_trusted(node).await {
            Ok(true) => {
                self.start_supervision().await;
            }
            Ok(false) => {
                self.stand_down().await;
            }
            Err(e) => {
                tracing::error!(node = %node, error = %e, "Error retrieving node trusted status");
            }
        }
    }

    /// Begin supervising minipools. Returns `false` if already supervising.
    pub async fn start_supervision(&self) -> bool {
        let mut session = self.ctx.session.lock().await;
        if session.supervising {
            return false;
        }
        session.supervising = true;

        tracing::info!("Node is trusted, starting watchtower process...");

        let (stop_tx, stop_rx) = oneshot::channel();
        session.stop = Some(stop_tx);

        self.supervisor.clone().start(stop_rx).await;

        self.ctx
            .bus
            .subscribe(BEACON_CLIENT_MESSAGE_TOPIC, self.ctx.inbound_tx.clone())
            .await;

        true
    }

    /// Stop supervising minipools. Returns `false` if not supervising.
    ///
    /// Cancels the pending discovery re-arm and unsubscribes from feed
    /// messages; a discovery cycle or message already in progress finishes.
    pub async fn stand_down(&self) -> bool {
        let mut session = self.ctx.session.lock().await;
        if !session.supervising {
            return false;
        }
        session.supervising = false;

        tracing::info!("Node is untrusted, stopping watchtower process...");

        if let Some(stop) = session.stop.take() {
            // Err means the re-arm loop already ended on a failed cycle.
            let _ = stop.send(());
        }

        self.ctx
            .bus
            .unsubscribe(BEACON_CLIENT_MESSAGE_TOPIC, &self.ctx.inbound_tx)
            .await;

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockChainGateway, MockStatusFeed};
    use crate::services::event_bus::EventBus;
    use crate::services::watchtower::WatchtowerProcess;

    fn monitor(chain: Arc<MockChainGateway>) -> (TrustMonitor, Arc<WatchtowerContext>, Arc<EventBus>) {
        let bus = Arc::new(EventBus::new());
        let process = WatchtowerProcess::new(chain, Arc::new(MockStatusFeed::new()), bus.clone());
        let ctx = process.context();
        let supervisor = Arc::new(PoolSupervisor::new(ctx.clone()));
        (TrustMonitor::new(ctx.clone(), supervisor), ctx, bus)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_supervision_is_idempotent() {
        let chain = Arc::new(MockChainGateway::new());
        let (monitor, ctx, bus) = monitor(chain.clone());

        assert!(monitor.start_supervision().await);
        assert!(!monitor.start_supervision().await);

        assert!(ctx.is_supervising().await);
        assert_eq!(chain.discovery_calls(), 1);
        assert_eq!(bus.subscriber_count(BEACON_CLIENT_MESSAGE_TOPIC).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stand_down_is_idempotent() {
        let chain = Arc::new(MockChainGateway::new());
        let (monitor, ctx, bus) = monitor(chain);

        assert!(!monitor.stand_down().await);

        monitor.start_supervision().await;
        assert!(monitor.stand_down().await);
        assert!(!monitor.stand_down().await);

        assert!(!ctx.is_supervising().await);
        assert_eq!(bus.subscriber_count(BEACON_CLIENT_MESSAGE_TOPIC).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_trust_read_changes_nothing() {
        let chain = Arc::new(MockChainGateway::new());
        chain.fail_trust_read("rpc unavailable");
        let (monitor, ctx, _bus) = monitor(chain.clone());

        monitor.check_trusted().await;

        assert!(!ctx.is_supervising().await);
        assert_eq!(chain.discovery_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_sync_skips_trust_read() {
        let chain = Arc::new(MockChainGateway::new());
        chain.set_trusted(true);
        chain.fail_sync("client offline");
        let (monitor, ctx, _bus) = monitor(chain.clone());

        monitor.check_trusted().await;

        assert!(!ctx.is_supervising().await);
        assert_eq!(chain.trust_reads(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_trusted_follows_flag() {
        let chain = Arc::new(MockChainGateway::new());
        let (monitor, ctx, _bus) = monitor(chain.clone());

        chain.set_trusted(true);
        monitor.check_trusted().await;
        assert!(ctx.is_supervising().await);

        chain.set_trusted(false);
        monitor.check_trusted().await;
        assert!(!ctx.is_supervising().await);
        assert_eq!(ctx.status().await.trust_checks, 2);
    }
}
