//! Watchtower process wiring.
//!
//! [`WatchtowerContext`] holds everything the trust monitor, pool supervisor
//! and transition handler share. [`WatchtowerProcess::start`] spawns the
//! trust-check ticker and the single inbound-message worker and hands back a
//! [`WatchtowerHandle`] for inspection and shutdown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::models::{BusEvent, MinipoolSet};
use crate::domain::ports::{ChainGateway, StatusFeed};
use crate::services::event_bus::{EventBus, Subscriber};
use crate::services::pool_supervisor::PoolSupervisor;
use crate::services::transition_handler::TransitionHandler;
use crate::services::trust_monitor::TrustMonitor;

/// How often the node's trusted flag is re-read.
pub const TRUST_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Minipool check interval used when the protocol setting is unreadable or zero.
pub const DEFAULT_MINIPOOL_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Per-session supervision state, toggled only by the trust monitor.
#[derive(Default)]
pub(crate) struct SupervisionSession {
    pub(crate) supervising: bool,
    /// Cancels the pending discovery re-arm of the current session.
    pub(crate) stop: Option<oneshot::Sender<()>>,
}

/// Counters exposed through [`WatchtowerStatus`].
#[derive(Default)]
pub(crate) struct Counters {
    pub(crate) trust_checks: AtomicU64,
    pub(crate) discovery_cycles: AtomicU64,
    pub(crate) messages_handled: AtomicU64,
    pub(crate) transactions_submitted: AtomicU64,
    pub(crate) transactions_failed: AtomicU64,
}

/// Shared process state passed to each component.
pub struct WatchtowerContext {
    pub(crate) chain: Arc<dyn ChainGateway>,
    pub(crate) feed: Arc<dyn StatusFeed>,
    pub(crate) bus: Arc<EventBus>,
    pub(crate) session: Mutex<SupervisionSession>,
    /// Sole authority for pubkey -> minipool resolution; replaced wholesale.
    pub(crate) active_minipools: RwLock<MinipoolSet>,
    /// Destination registered on the bus while supervising.
    pub(crate) inbound_tx: Subscriber,
    /// Serializes every transaction submitted from the node account.
    pub(crate) tx_lock: Mutex<()>,
    pub(crate) counters: Counters,
}

impl WatchtowerContext {
    /// Whether the node is currently supervising minipools.
    pub async fn is_supervising(&self) -> bool {
        self.session.lock().await.supervising
    }

    /// Snapshot of the managed minipool set.
    pub async fn active_minipools(&self) -> MinipoolSet {
        self.active_minipools.read().await.clone()
    }

    /// Snapshot of the process counters.
    pub async fn status(&self) -> WatchtowerStatus {
        WatchtowerStatus {
            supervising: self.is_supervising().await,
            active_minipools: self.active_minipools.read().await.len(),
            trust_checks: self.counters.trust_checks.load(Ordering::Relaxed),
            discovery_cycles: self.counters.discovery_cycles.load(Ordering::Relaxed),
            messages_handled: self.counters.messages_handled.load(Ordering::Relaxed),
            transactions_submitted: self.counters.transactions_submitted.load(Ordering::Relaxed),
            transactions_failed: self.counters.transactions_failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the watchtower.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchtowerStatus {
    pub supervising: bool,
    pub active_minipools: usize,
    pub trust_checks: u64,
    pub discovery_cycles: u64,
    pub messages_handled: u64,
    pub transactions_submitted: u64,
    pub transactions_failed: u64,
}

/// The watchtower before it is started.
pub struct WatchtowerProcess {
    ctx: Arc<WatchtowerContext>,
    inbound_rx: mpsc::UnboundedReceiver<BusEvent>,
}

impl WatchtowerProcess {
    pub fn new(
        chain: Arc<dyn ChainGateway>,
        feed: Arc<dyn StatusFeed>,
        bus: Arc<EventBus>,
    ) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let ctx = Arc::new(WatchtowerContext {
            chain,
            feed,
            bus,
            session: Mutex::new(SupervisionSession::default()),
            active_minipools: RwLock::new(MinipoolSet::new()),
            inbound_tx,
            tx_lock: Mutex::new(()),
            counters: Counters::default(),
        });
        Self { ctx, inbound_rx }
    }

    pub fn context(&self) -> Arc<WatchtowerContext> {
        self.ctx.clone()
    }

    /// Spawn the trust-check ticker and the inbound-message worker.
    pub fn start(self) -> WatchtowerHandle {
        let (shutdown_tx, _) = broadcast::channel(1);

        let supervisor = Arc::new(PoolSupervisor::new(self.ctx.clone()));
        let monitor = Arc::new(TrustMonitor::new(self.ctx.clone(), supervisor));
        let handler = Arc::new(TransitionHandler::new(self.ctx.clone()));

        let monitor_task = spawn_trust_ticker(monitor.clone(), shutdown_tx.subscribe());
        let worker_task = handler.spawn(self.inbound_rx, shutdown_tx.subscribe());

        tracing::info!(
            trust_check_interval_secs = TRUST_CHECK_INTERVAL.as_secs(),
            "watchtower process started"
        );

        WatchtowerHandle {
            ctx: self.ctx,
            monitor,
            shutdown_tx,
            monitor_task,
            worker_task,
        }
    }
}

fn spawn_trust_ticker(
    monitor: Arc<TrustMonitor>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(TRUST_CHECK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                _ = ticker.tick() => {}
            }

            // A check can block on chain sync indefinitely
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                () = monitor.check_trusted() => {}
            }
        }

        tracing::debug!("trust check ticker stopped");
    })
}

/// Handle to a running watchtower.
pub struct WatchtowerHandle {
    ctx: Arc<WatchtowerContext>,
    monitor: Arc<TrustMonitor>,
    shutdown_tx: broadcast::Sender<()>,
    monitor_task: JoinHandle<()>,
    worker_task: JoinHandle<()>,
}

impl WatchtowerHandle {
    pub fn context(&self) -> Arc<WatchtowerContext> {
        self.ctx.clone()
    }

    pub async fn is_supervising(&self) -> bool {
        self.ctx.is_supervising().await
    }

    pub async fn active_minipools(&self) -> MinipoolSet {
        self.ctx.active_minipools().await
    }

    pub async fn status(&self) -> WatchtowerStatus {
        self.ctx.status().await
    }

    /// Stop the ticker and worker, stand down any active supervision and
    /// wait for both tasks to exit. A trust check still in progress is
    /// abandoned; a message being handled runs to completion.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());

        if let Err(e) = self.monitor_task.await {
            tracing::warn!(error = %e, "trust check ticker ended abnormally");
        }
        self.monitor.stand_down().await;

        if let Err(e) = self.worker_task.await {
            tracing::warn!(error = %e, "inbound message worker ended abnormally");
        }

        tracing::info!("watchtower process stopped");
    }
}
