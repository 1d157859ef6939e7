//! Transition handler.
//!
//! A single worker drains inbound feed messages in arrival order. Each
//! message is handled to completion under the process transaction lock:
//! decode, filter, resolve the minipool, read its on-chain stage, consult the
//! decision table and submit at most one transaction. Messages still queued
//! when supervision stands down are dropped.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::domain::models::{
    decide, is_actionable, wei_to_eth, Address, BusEvent, MinipoolStatus, ServerMessage,
    TransitionAction, ValidatorPubkey, ValidatorStatusCode, WatchtowerTransaction,
};
use crate::domain::ports::ChainError;
use crate::services::watchtower::WatchtowerContext;

/// Why a message produced no chain activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discarded {
    /// Payload was not valid JSON for a feed message.
    Malformed,
    /// Not a validator status report.
    NotStatusReport,
    /// Status code outside the exited/withdrawable allow-list.
    IgnoredStatus(String),
    /// Pubkey does not belong to a managed minipool.
    UnknownValidator(ValidatorPubkey),
    /// Dequeued after supervision stood down.
    NotSupervising,
}

/// Result of handling one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    Discarded(Discarded),
    /// Reading the minipool's stage failed.
    StatusUnavailable { minipool: Address },
    /// The decision table chose no action for this stage and status.
    NoAction {
        minipool: Address,
        stage: MinipoolStatus,
    },
    /// A signer for the node account could not be obtained.
    SignerUnavailable(WatchtowerTransaction),
    /// The transaction was mined successfully.
    Submitted(WatchtowerTransaction),
    /// The transaction was rejected or reverted.
    SubmissionFailed(WatchtowerTransaction),
}

pub struct TransitionHandler {
    ctx: Arc<WatchtowerContext>,
}

impl TransitionHandler {
    pub fn new(ctx: Arc<WatchtowerContext>) -> Self {
        Self { ctx }
    }

    /// Spawn the inbound-message worker.
    ///
    /// Messages are processed one at a time; shutdown is observed only
    /// between messages.
    pub fn spawn(
        self: Arc<Self>,
        mut inbound_rx: mpsc::UnboundedReceiver<BusEvent>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    event = inbound_rx.recv() => match event {
                        Some(event) => {
                            self.handle_event(event).await;
                        }
                        None => break,
                    },
                }
            }
            tracing::debug!("inbound message worker stopped");
        })
    }

    pub async fn handle_event(&self, event: BusEvent) -> HandleOutcome {
        match event {
            BusEvent::BeaconClientMessage { client, message } => {
                tracing::trace!(client = %client, bytes = message.len(), "beacon client message");
                if !self.ctx.is_supervising().await {
                    tracing::debug!(client = %client, "Dropping message queued before stand-down");
                    return HandleOutcome::Discarded(Discarded::NotSupervising);
                }
                self.handle_message(&message).await
            }
        }
    }

    /// Handle one raw feed message.
    pub async fn handle_message(&self, payload: &[u8]) -> HandleOutcome {
        let _tx_guard = self.ctx.tx_lock.lock().await;
        self.ctx.counters.messages_handled.fetch_add(1, Ordering::Relaxed);

        let message: ServerMessage = match serde_json::from_slice(payload) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(error = %e, "Error decoding beacon message");
                return HandleOutcome::Discarded(Discarded::Malformed);
            }
        };

        if !message.is_validator_status() {
            return HandleOutcome::Discarded(Discarded::NotStatusReport);
        }

        let code = message.status.code();
        if !is_actionable(&code) {
            return HandleOutcome::Discarded(Discarded::IgnoredStatus(code.to_string()));
        }

        let pubkey = ValidatorPubkey::new(&message.pubkey);
        let Some(minipool) = self.ctx.active_minipools.read().await.get(&pubkey).copied() else {
            return HandleOutcome::Discarded(Discarded::UnknownValidator(pubkey));
        };

        let stage = match self.read_stage(minipool).await {
            Ok(stage) => stage,
            Err(e) => {
                tracing::error!(minipool = %minipool, error = %e, "Error retrieving minipool status");
                return HandleOutcome::StatusUnavailable { minipool };
            }
        };

        let action = decide(stage, &code);
        let Some(transaction) = WatchtowerTransaction::for_action(action, minipool, message.balance)
        else {
            tracing::debug!(
                minipool = %minipool,
                stage = %stage,
                status = %code,
                "No transition required"
            );
            return HandleOutcome::NoAction { minipool, stage };
        };

        log_ready(action, minipool, &code);
        self.submit(transaction).await
    }

    async fn read_stage(&self, minipool: Address) -> Result<MinipoolStatus, ChainError> {
        self.ctx.chain.wait_for_sync().await?;
        self.ctx.chain.minipool_status(minipool).await
    }

    async fn submit(&self, transaction: WatchtowerTransaction) -> HandleOutcome {
        let transactor = match self.ctx.chain.node_transactor().await {
            Ok(transactor) => transactor,
            Err(e) => {
                tracing::error!(
                    minipool = %transaction.minipool(),
                    method = transaction.method(),
                    error = %e,
                    "Error getting node account transactor"
                );
                return HandleOutcome::SignerUnavailable(transaction);
            }
        };

        match self.ctx.chain.execute(&transactor, &transaction).await {
            Ok(receipt) => {
                self.ctx
                    .counters
                    .transactions_submitted
                    .fetch_add(1, Ordering::Relaxed);
                log_success(&transaction, &receipt.transaction_hash);
                HandleOutcome::Submitted(transaction)
            }
            Err(e) => {
                self.ctx.counters.transactions_failed.fetch_add(1, Ordering::Relaxed);
                log_failure(&transaction, &e);
                HandleOutcome::SubmissionFailed(transaction)
            }
        }
    }
}

fn log_ready(action: TransitionAction, minipool: Address, code: &ValidatorStatusCode) {
    match action {
        TransitionAction::Logout => {
            tracing::info!(minipool = %minipool, status = %code, "Minipool is ready for logout...");
        }
        TransitionAction::Withdraw => {
            tracing::info!(minipool = %minipool, status = %code, "Minipool is ready for withdrawal...");
        }
        TransitionAction::NoAction => {}
    }
}

fn log_success(transaction: &WatchtowerTransaction, tx_hash: &str) {
    match transaction {
        WatchtowerTransaction::Logout { minipool } => {
            tracing::info!(minipool = %minipool, tx_hash, "Minipool was successfully logged out");
        }
        WatchtowerTransaction::Withdraw {
            minipool,
            balance_wei,
        } => {
            tracing::info!(
                minipool = %minipool,
                tx_hash,
                balance_eth = %format!("{:.2}", wei_to_eth(*balance_wei)),
                "Minipool was successfully withdrawn"
            );
        }
    }
}

fn log_failure(transaction: &WatchtowerTransaction, err: &ChainError) {
    match transaction {
        WatchtowerTransaction::Logout { minipool } => {
            tracing::error!(minipool = %minipool, error = %err, "Error logging out minipool");
        }
        WatchtowerTransaction::Withdraw {
            minipool,
            balance_wei,
        } => {
            tracing::error!(
                minipool = %minipool,
                balance_wei = %balance_wei,
                error = %err,
                "Error withdrawing minipool"
            );
        }
    }
}
