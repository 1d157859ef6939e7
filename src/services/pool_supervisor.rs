//! Pool supervisor.
//!
//! Each discovery cycle replaces the managed minipool set, fans out one
//! status request per minipool to the feed, and reads the protocol check
//! interval. The re-arm loop then races that interval against the session's
//! stop signal. A cycle that cannot read the minipool set ends the loop; only
//! a fresh supervision session starts discovery again.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};

use crate::domain::models::{Address, ClientMessage, MinipoolSet, ValidatorPubkey};
use crate::domain::ports::{FeedError, StatusFeed};
use crate::services::watchtower::{WatchtowerContext, DEFAULT_MINIPOOL_CHECK_INTERVAL};

pub struct PoolSupervisor {
    ctx: Arc<WatchtowerContext>,
}

impl PoolSupervisor {
    pub fn new(ctx: Arc<WatchtowerContext>) -> Self {
        Self { ctx }
    }

    /// Run one discovery cycle now and, if it succeeds, arm the re-arm loop.
    pub async fn start(self: Arc<Self>, stop_rx: oneshot::Receiver<()>) -> Option<JoinHandle<()>> {
        let interval = self.run_cycle().await?;
        Some(self.arm(interval, stop_rx))
    }

    /// Discover minipools and request their statuses.
    ///
    /// Returns the delay until the next cycle, or `None` when the cycle was
    /// abandoned and nothing should be scheduled.
    pub async fn run_cycle(&self) -> Option<Duration> {
        self.ctx.counters.discovery_cycles.fetch_add(1, Ordering::Relaxed);
        tracing::info!("Checking active minipools...");

        if let Err(e) = self.ctx.chain.wait_for_sync().await {
            tracing::error!(error = %e, "Error waiting for node to sync");
            return None;
        }

        let minipools = match self.ctx.chain.active_minipools().await {
            Ok(minipools) => minipools,
            Err(e) => {
                tracing::error!(error = %e, "Error getting active minipools");
                return None;
            }
        };

        *self.ctx.active_minipools.write().await = minipools.clone();

        self.dispatch_status_requests(minipools);

        Some(self.next_check_interval().await)
    }

    /// Fire one status request per minipool without waiting for any of them.
    fn dispatch_status_requests(&self, minipools: MinipoolSet) {
        if minipools.is_empty() {
            return;
        }

        let mut requests = JoinSet::new();
        for (pubkey, minipool) in minipools {
            let feed = self.ctx.feed.clone();
            requests.spawn(async move {
                tracing::info!(minipool = %minipool, "Checking minipool status...");
                if let Err(e) = request_validator_status(feed.as_ref(), &pubkey).await {
                    log_dispatch_failure(&pubkey, minipool, &e);
                }
            });
        }

        tokio::spawn(async move {
            while let Some(joined) = requests.join_next().await {
                if let Err(e) = joined {
                    tracing::warn!(error = %e, "validator status request task failed");
                }
            }
        });
    }

    /// Protocol check interval, or the default if unreadable or zero.
    async fn next_check_interval(&self) -> Duration {
        if let Err(e) = self.ctx.chain.wait_for_sync().await {
            tracing::warn!(error = %e, "Error waiting for node to sync");
        }

        let interval = match self.ctx.chain.minipool_check_interval().await {
            Ok(0) => DEFAULT_MINIPOOL_CHECK_INTERVAL,
            Ok(secs) => Duration::from_secs(secs),
            Err(e) => {
                tracing::warn!(error = %e, "Error retrieving minipool check interval");
                DEFAULT_MINIPOOL_CHECK_INTERVAL
            }
        };

        tracing::info!(interval_secs = interval.as_secs(), "Time until next minipool check");
        interval
    }

    /// Race each interval against the stop signal; run a cycle whenever the
    /// interval wins. The sleep is dropped as soon as stop fires.
    fn arm(self: Arc<Self>, first: Duration, mut stop_rx: oneshot::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = first;
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => {
                        tracing::debug!("minipool check cancelled");
                        break;
                    }
                    () = tokio::time::sleep(interval) => {
                        match self.run_cycle().await {
                            Some(next) => interval = next,
                            None => break,
                        }
                    }
                }
            }
        })
    }
}

async fn request_validator_status(
    feed: &dyn StatusFeed,
    pubkey: &ValidatorPubkey,
) -> Result<(), DispatchError> {
    let payload = serde_json::to_vec(&ClientMessage::get_validator_status(pubkey))
        .map_err(DispatchError::Encode)?;
    feed.send(&payload).await.map_err(DispatchError::Send)
}

#[derive(Debug)]
enum DispatchError {
    Encode(serde_json::Error),
    Send(FeedError),
}

fn log_dispatch_failure(pubkey: &ValidatorPubkey, minipool: Address, err: &DispatchError) {
    match err {
        DispatchError::Encode(e) => tracing::error!(
            pubkey = %pubkey,
            minipool = %minipool,
            error = %e,
            "Error encoding get validator status payload"
        ),
        DispatchError::Send(e) => tracing::error!(
            pubkey = %pubkey,
            minipool = %minipool,
            error = %e,
            "Error sending get validator status message"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockChainGateway, MockStatusFeed};
    use crate::domain::models::MinipoolStatus;
    use crate::services::event_bus::EventBus;
    use crate::services::watchtower::WatchtowerProcess;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn supervisor(
        chain: Arc<MockChainGateway>,
        feed: Arc<MockStatusFeed>,
    ) -> (Arc<PoolSupervisor>, Arc<WatchtowerContext>) {
        let process = WatchtowerProcess::new(chain, feed, Arc::new(EventBus::new()));
        let ctx = process.context();
        (Arc::new(PoolSupervisor::new(ctx.clone())), ctx)
    }

    #[tokio::test]
    async fn test_cycle_replaces_active_set() {
        let chain = Arc::new(MockChainGateway::new());
        let feed = Arc::new(MockStatusFeed::new());
        let (supervisor, ctx) = supervisor(chain.clone(), feed);

        chain.add_minipool("aa", addr(1), MinipoolStatus::Staking);
        chain.add_minipool("bb", addr(2), MinipoolStatus::Staking);
        supervisor.run_cycle().await.unwrap();
        assert_eq!(ctx.active_minipools().await.len(), 2);

        chain.remove_minipool("aa");
        supervisor.run_cycle().await.unwrap();

        let active = ctx.active_minipools().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active.get(&ValidatorPubkey::new("bb")), Some(&addr(2)));
        assert!(!active.contains_key(&ValidatorPubkey::new("aa")));
    }

    #[tokio::test]
    async fn test_cycle_dispatches_one_request_per_pubkey() {
        let chain = Arc::new(MockChainGateway::new());
        let feed = Arc::new(MockStatusFeed::new());
        let (supervisor, _ctx) = supervisor(chain.clone(), feed.clone());

        chain.add_minipool("aa", addr(1), MinipoolStatus::Staking);
        chain.add_minipool("bb", addr(2), MinipoolStatus::LoggedOut);
        supervisor.run_cycle().await.unwrap();

        assert!(feed.wait_for_requests(2, Duration::from_secs(5)).await);
        let mut pubkeys: Vec<String> = feed
            .sent_requests()
            .into_iter()
            .map(|r| {
                assert_eq!(r.message, "get_validator_status");
                r.pubkey
            })
            .collect();
        pubkeys.sort();
        assert_eq!(pubkeys, vec!["aa".to_string(), "bb".to_string()]);
    }

    #[tokio::test]
    async fn test_one_failed_dispatch_does_not_stop_others() {
        let chain = Arc::new(MockChainGateway::new());
        let feed = Arc::new(MockStatusFeed::new());
        feed.fail_for_pubkey("aa");
        let (supervisor, _ctx) = supervisor(chain.clone(), feed.clone());

        chain.add_minipool("aa", addr(1), MinipoolStatus::Staking);
        chain.add_minipool("bb", addr(2), MinipoolStatus::Staking);
        chain.add_minipool("cc", addr(3), MinipoolStatus::Staking);
        assert!(supervisor.run_cycle().await.is_some());

        assert!(feed.wait_for_requests(2, Duration::from_secs(5)).await);
        let pubkeys: Vec<String> = feed.sent_requests().into_iter().map(|r| r.pubkey).collect();
        assert!(pubkeys.contains(&"bb".to_string()));
        assert!(pubkeys.contains(&"cc".to_string()));
        assert!(!pubkeys.contains(&"aa".to_string()));
    }

    #[tokio::test]
    async fn test_discovery_failure_abandons_cycle() {
        let chain = Arc::new(MockChainGateway::new());
        let feed = Arc::new(MockStatusFeed::new());
        let (supervisor, ctx) = supervisor(chain.clone(), feed.clone());

        chain.add_minipool("aa", addr(1), MinipoolStatus::Staking);
        supervisor.run_cycle().await.unwrap();

        chain.fail_discovery("call reverted");
        assert!(supervisor.run_cycle().await.is_none());

        // previous set is kept until a cycle succeeds
        assert_eq!(ctx.active_minipools().await.len(), 1);
        assert_eq!(chain.check_interval_reads(), 1);
    }

    #[tokio::test]
    async fn test_check_interval_fallbacks() {
        let chain = Arc::new(MockChainGateway::new());
        let feed = Arc::new(MockStatusFeed::new());
        let (supervisor, _ctx) = supervisor(chain.clone(), feed);

        chain.set_check_interval(120);
        assert_eq!(supervisor.run_cycle().await, Some(Duration::from_secs(120)));

        chain.set_check_interval(0);
        assert_eq!(supervisor.run_cycle().await, Some(DEFAULT_MINIPOOL_CHECK_INTERVAL));

        chain.fail_check_interval("no such setting");
        assert_eq!(supervisor.run_cycle().await, Some(DEFAULT_MINIPOOL_CHECK_INTERVAL));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_runs_next_cycle_after_interval() {
        let chain = Arc::new(MockChainGateway::new());
        let feed = Arc::new(MockStatusFeed::new());
        chain.set_check_interval(30);
        let (supervisor, _ctx) = supervisor(chain.clone(), feed);

        let (_stop_tx, stop_rx) = oneshot::channel();
        let rearm = supervisor.start(stop_rx).await.unwrap();
        assert_eq!(chain.discovery_calls(), 1);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(chain.discovery_calls(), 2);

        rearm.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_rearm() {
        let chain = Arc::new(MockChainGateway::new());
        let feed = Arc::new(MockStatusFeed::new());
        let (supervisor, _ctx) = supervisor(chain.clone(), feed);

        let (stop_tx, stop_rx) = oneshot::channel();
        let rearm = supervisor.start(stop_rx).await.unwrap();
        stop_tx.send(()).unwrap();
        rearm.await.unwrap();

        tokio::time::sleep(DEFAULT_MINIPOOL_CHECK_INTERVAL * 3).await;
        assert_eq!(chain.discovery_calls(), 1);
    }
}
