//! In-memory chain gateway and status feed for tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use crate::domain::models::{
    Address, ClientMessage, MinipoolSet, MinipoolStatus, ValidatorPubkey, WatchtowerTransaction,
};
use crate::domain::ports::{
    ChainError, ChainGateway, ChainResult, FeedError, StatusFeed, Transactor, TxReceipt,
};

#[derive(Default)]
struct MockChainState {
    trusted: bool,
    pubkeys: HashMap<ValidatorPubkey, Address>,
    statuses: HashMap<Address, MinipoolStatus>,
    check_interval: u64,
    sync_error: Option<String>,
    sync_stalled: bool,
    trust_error: Option<String>,
    discovery_error: Option<String>,
    check_interval_error: Option<String>,
    status_error: Option<String>,
    transactor_error: Option<String>,
    execute_error: Option<String>,
    execute_delay: Duration,
    executed: Vec<WatchtowerTransaction>,
}

/// Scriptable chain gateway that records every call.
pub struct MockChainGateway {
    node: Address,
    state: StdMutex<MockChainState>,
    sync_waits: AtomicUsize,
    trust_reads: AtomicUsize,
    discovery_calls: AtomicUsize,
    check_interval_reads: AtomicUsize,
    status_reads: AtomicUsize,
    execute_attempts: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockChainGateway {
    pub fn new() -> Self {
        Self {
            node: Address::repeat_byte(0xee),
            state: StdMutex::new(MockChainState::default()),
            sync_waits: AtomicUsize::new(0),
            trust_reads: AtomicUsize::new(0),
            discovery_calls: AtomicUsize::new(0),
            check_interval_reads: AtomicUsize::new(0),
            status_reads: AtomicUsize::new(0),
            execute_attempts: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MockChainState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut state)
    }

    pub fn set_trusted(&self, trusted: bool) {
        self.with_state(|s| {
            s.trusted = trusted;
            s.trust_error = None;
        });
    }

    pub fn fail_trust_read(&self, error: &str) {
        self.with_state(|s| s.trust_error = Some(error.to_string()));
    }

    pub fn fail_sync(&self, error: &str) {
        self.with_state(|s| s.sync_error = Some(error.to_string()));
    }

    pub fn restore_sync(&self) {
        self.with_state(|s| {
            s.sync_error = None;
            s.sync_stalled = false;
        });
    }

    /// Make `wait_for_sync` never return, like a client that stays syncing.
    pub fn stall_sync(&self) {
        self.with_state(|s| s.sync_stalled = true);
    }

    /// Register a minipool; it is discovered while its stage is active.
    pub fn add_minipool(&self, pubkey: &str, minipool: Address, status: MinipoolStatus) {
        self.with_state(|s| {
            s.pubkeys.insert(ValidatorPubkey::new(pubkey), minipool);
            s.statuses.insert(minipool, status);
        });
    }

    pub fn remove_minipool(&self, pubkey: &str) {
        self.with_state(|s| {
            if let Some(minipool) = s.pubkeys.remove(&ValidatorPubkey::new(pubkey)) {
                s.statuses.remove(&minipool);
            }
        });
    }

    pub fn set_status(&self, minipool: Address, status: MinipoolStatus) {
        self.with_state(|s| {
            s.statuses.insert(minipool, status);
            s.status_error = None;
        });
    }

    pub fn fail_discovery(&self, error: &str) {
        self.with_state(|s| s.discovery_error = Some(error.to_string()));
    }

    pub fn restore_discovery(&self) {
        self.with_state(|s| s.discovery_error = None);
    }

    pub fn set_check_interval(&self, secs: u64) {
        self.with_state(|s| {
            s.check_interval = secs;
            s.check_interval_error = None;
        });
    }

    pub fn fail_check_interval(&self, error: &str) {
        self.with_state(|s| s.check_interval_error = Some(error.to_string()));
    }

    pub fn fail_status_read(&self, error: &str) {
        self.with_state(|s| s.status_error = Some(error.to_string()));
    }

    pub fn fail_transactor(&self, error: &str) {
        self.with_state(|s| s.transactor_error = Some(error.to_string()));
    }

    pub fn fail_execute(&self, error: &str) {
        self.with_state(|s| s.execute_error = Some(error.to_string()));
    }

    /// Make every `execute` call take this long.
    pub fn set_execute_delay(&self, delay: Duration) {
        self.with_state(|s| s.execute_delay = delay);
    }

    pub fn executed(&self) -> Vec<WatchtowerTransaction> {
        self.with_state(|s| s.executed.clone())
    }

    pub fn sync_waits(&self) -> usize {
        self.sync_waits.load(Ordering::SeqCst)
    }

    pub fn trust_reads(&self) -> usize {
        self.trust_reads.load(Ordering::SeqCst)
    }

    pub fn discovery_calls(&self) -> usize {
        self.discovery_calls.load(Ordering::SeqCst)
    }

    pub fn check_interval_reads(&self) -> usize {
        self.check_interval_reads.load(Ordering::SeqCst)
    }

    pub fn status_reads(&self) -> usize {
        self.status_reads.load(Ordering::SeqCst)
    }

    pub fn execute_attempts(&self) -> usize {
        self.execute_attempts.load(Ordering::SeqCst)
    }

    /// Highest number of `execute` calls that overlapped.
    pub fn max_concurrent_executions(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for MockChainGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn scripted(error: Option<String>) -> ChainResult<()> {
    error.map_or(Ok(()), |e| Err(ChainError::Other(e)))
}

#[async_trait]
impl ChainGateway for MockChainGateway {
    async fn wait_for_sync(&self) -> ChainResult<()> {
        self.sync_waits.fetch_add(1, Ordering::SeqCst);
        let (stalled, error) = self.with_state(|s| (s.sync_stalled, s.sync_error.clone()));
        if stalled {
            std::future::pending::<()>().await;
        }
        scripted(error)
    }

    fn node_address(&self) -> Address {
        self.node
    }

    async fn is_trusted(&self, _node: Address) -> ChainResult<bool> {
        self.trust_reads.fetch_add(1, Ordering::SeqCst);
        let (error, trusted) = self.with_state(|s| (s.trust_error.clone(), s.trusted));
        scripted(error)?;
        Ok(trusted)
    }

    async fn active_minipools(&self) -> ChainResult<MinipoolSet> {
        self.discovery_calls.fetch_add(1, Ordering::SeqCst);
        self.with_state(|s| {
            scripted(s.discovery_error.clone())?;
            Ok(s.pubkeys
                .iter()
                .filter(|(_, minipool)| s.statuses.get(*minipool).is_some_and(|st| st.is_active()))
                .map(|(pubkey, minipool)| (pubkey.clone(), *minipool))
                .collect())
        })
    }

    async fn minipool_check_interval(&self) -> ChainResult<u64> {
        self.check_interval_reads.fetch_add(1, Ordering::SeqCst);
        let (error, secs) = self.with_state(|s| (s.check_interval_error.clone(), s.check_interval));
        scripted(error)?;
        Ok(secs)
    }

    async fn minipool_status(&self, minipool: Address) -> ChainResult<MinipoolStatus> {
        self.status_reads.fetch_add(1, Ordering::SeqCst);
        self.with_state(|s| {
            scripted(s.status_error.clone())?;
            s.statuses
                .get(&minipool)
                .copied()
                .ok_or_else(|| ChainError::Other(format!("unknown minipool {minipool}")))
        })
    }

    async fn node_transactor(&self) -> ChainResult<Transactor> {
        scripted(self.with_state(|s| s.transactor_error.clone()))?;
        Ok(Transactor { from: self.node })
    }

    async fn execute(
        &self,
        _transactor: &Transactor,
        transaction: &WatchtowerTransaction,
    ) -> ChainResult<TxReceipt> {
        let attempt = self.execute_attempts.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.with_state(|s| s.execute_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let result = self.with_state(|s| {
            scripted(s.execute_error.clone())?;
            s.executed.push(*transaction);
            if let WatchtowerTransaction::Logout { minipool } = transaction {
                s.statuses.insert(*minipool, MinipoolStatus::LoggedOut);
            }
            if let WatchtowerTransaction::Withdraw { minipool, .. } = transaction {
                s.statuses.insert(*minipool, MinipoolStatus::Withdrawn);
            }
            Ok(TxReceipt {
                transaction_hash: format!("0x{attempt:064x}"),
                block_number: Some(attempt as u64),
            })
        });

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Status feed that records outbound requests instead of sending them.
pub struct MockStatusFeed {
    sent: StdMutex<Vec<Vec<u8>>>,
    failing: StdMutex<HashSet<ValidatorPubkey>>,
}

impl MockStatusFeed {
    pub fn new() -> Self {
        Self {
            sent: StdMutex::new(Vec::new()),
            failing: StdMutex::new(HashSet::new()),
        }
    }

    /// Reject requests for this pubkey.
    pub fn fail_for_pubkey(&self, pubkey: &str) {
        self.failing
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(ValidatorPubkey::new(pubkey));
    }

    /// Raw payloads sent so far.
    pub fn sent_payloads(&self) -> Vec<Vec<u8>> {
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Sent payloads decoded as requests; undecodable payloads are skipped.
    pub fn sent_requests(&self) -> Vec<ClientMessage> {
        self.sent_payloads()
            .iter()
            .filter_map(|p| serde_json::from_slice(p).ok())
            .collect()
    }

    /// Poll until at least `count` requests were sent or `timeout` elapses.
    pub async fn wait_for_requests(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.sent_payloads().len() >= count {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Default for MockStatusFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusFeed for MockStatusFeed {
    async fn send(&self, payload: &[u8]) -> Result<(), FeedError> {
        if let Ok(request) = serde_json::from_slice::<ClientMessage>(payload) {
            let failing = self
                .failing
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .contains(&ValidatorPubkey::new(&request.pubkey));
            if failing {
                return Err(FeedError::Rejected(request.pubkey));
            }
        }
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(payload.to_vec());
        Ok(())
    }
}
