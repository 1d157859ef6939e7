use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::{Address, MinipoolSet, MinipoolStatus, WatchtowerTransaction};

/// Errors returned by a chain gateway
#[derive(Error, Debug)]
pub enum ChainError {
    /// HTTP transport failure talking to the execution client
    #[error("Transport error: {0}")]
    Transport(String),

    /// The execution client answered with a JSON-RPC error object
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// A response or return value could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// The node account cannot sign transactions
    #[error("Node account {0} is not available for signing")]
    AccountUnavailable(String),

    /// A submitted transaction was mined but reverted
    #[error("Transaction {0} reverted")]
    Reverted(String),

    /// No receipt appeared before the deadline
    #[error("Timed out waiting for receipt of transaction {0}")]
    ReceiptTimeout(String),

    /// Anything else the gateway reports
    #[error("{0}")]
    Other(String),
}

pub type ChainResult<T> = Result<T, ChainError>;

/// Permission to submit transactions from the node account.
///
/// Obtained from [`ChainGateway::node_transactor`]; holding one does not
/// serialize submissions by itself, callers do that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transactor {
    pub from: Address,
}

/// Outcome of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: String,
    pub block_number: Option<u64>,
}

/// Blocking boundary to the chain: sync state, protocol reads and
/// watchtower transactions.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Block until the local execution client is caught up with the network
    async fn wait_for_sync(&self) -> ChainResult<()>;

    /// The node account this daemon acts for
    fn node_address(&self) -> Address;

    /// Read `getTrusted(node)`
    async fn is_trusted(&self, node: Address) -> ChainResult<bool>;

    /// Read the full set of active minipools keyed by validator pubkey
    async fn active_minipools(&self) -> ChainResult<MinipoolSet>;

    /// Read `getMinipoolCheckInterval()` in seconds
    async fn minipool_check_interval(&self) -> ChainResult<u64>;

    /// Read a minipool's current `getStatus()`
    async fn minipool_status(&self, minipool: Address) -> ChainResult<MinipoolStatus>;

    /// Acquire a transaction signer for the node account
    async fn node_transactor(&self) -> ChainResult<Transactor>;

    /// Submit a watchtower transaction and wait for it to be mined
    async fn execute(
        &self,
        transactor: &Transactor,
        transaction: &WatchtowerTransaction,
    ) -> ChainResult<TxReceipt>;
}
