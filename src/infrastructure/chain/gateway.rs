//! [`ChainGateway`] backed by an execution client's JSON-RPC endpoint.

use alloy::network::{ReceiptResponse, TransactionBuilder};
use alloy::primitives::{TxHash, U256};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::{SyncStatus, TransactionRequest};
use alloy::sol_types::SolCall;
use alloy::transports::http::Http;
use alloy::transports::{RpcError, TransportError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::contracts::{
    IRocketMinipool, IRocketMinipoolSettings, IRocketNodeAPI, IRocketNodeWatchtower, IRocketPool,
};
use crate::domain::errors::DomainError;
use crate::domain::models::{
    Address, ChainConfig, ContractsConfig, MinipoolSet, MinipoolStatus, ValidatorPubkey,
    WatchtowerTransaction,
};
use crate::domain::ports::{ChainError, ChainGateway, ChainResult, Transactor, TxReceipt};
use crate::error::WatchtowerError;

impl From<TransportError> for ChainError {
    fn from(err: TransportError) -> Self {
        match err {
            RpcError::ErrorResp(payload) => Self::Rpc {
                code: payload.code,
                message: payload.message.to_string(),
            },
            RpcError::DeserError { err, .. } => Self::Decode(err.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Parsed addresses of the protocol contracts the watchtower talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractRegistry {
    pub rocket_node_api: Address,
    pub rocket_minipool_settings: Address,
    pub rocket_pool: Address,
    pub rocket_node_watchtower: Address,
}

impl TryFrom<&ContractsConfig> for ContractRegistry {
    type Error = DomainError;

    fn try_from(config: &ContractsConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            rocket_node_api: parse_address("rocket_node_api", &config.rocket_node_api)?,
            rocket_minipool_settings: parse_address(
                "rocket_minipool_settings",
                &config.rocket_minipool_settings,
            )?,
            rocket_pool: parse_address("rocket_pool", &config.rocket_pool)?,
            rocket_node_watchtower: parse_address(
                "rocket_node_watchtower",
                &config.rocket_node_watchtower,
            )?,
        })
    }
}

fn parse_address(field: &str, value: &str) -> Result<Address, DomainError> {
    value
        .parse()
        .map_err(|_| DomainError::InvalidAddress(format!("{field}: {value}")))
}

/// Chain gateway speaking JSON-RPC to a local execution client
pub struct JsonRpcChainGateway {
    provider: RootProvider,
    rpc_url: String,
    node: Address,
    contracts: ContractRegistry,
    sync_poll_interval: Duration,
    receipt_poll_interval: Duration,
    receipt_timeout: Duration,
}

impl JsonRpcChainGateway {
    pub fn from_config(
        chain: &ChainConfig,
        contracts: &ContractsConfig,
    ) -> Result<Self, WatchtowerError> {
        let node = parse_address("node_address", &chain.node_address)?;
        let url = chain
            .rpc_url
            .parse()
            .map_err(|e| ChainError::Other(format!("invalid rpc url {}: {e}", chain.rpc_url)))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(chain.request_timeout_secs))
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| ChainError::Transport(e.to_string()))?;
        let client = RpcClient::new(Http::with_client(http_client, url), false);

        Ok(Self {
            provider: RootProvider::new(client),
            rpc_url: chain.rpc_url.clone(),
            node,
            contracts: ContractRegistry::try_from(contracts)?,
            sync_poll_interval: Duration::from_secs(chain.sync_poll_interval_secs),
            receipt_poll_interval: Duration::from_secs(chain.receipt_poll_interval_secs),
            receipt_timeout: Duration::from_secs(chain.receipt_timeout_secs),
        })
    }

    pub fn contracts(&self) -> &ContractRegistry {
        &self.contracts
    }

    /// `eth_call` a view function and decode its return values
    async fn call<C: SolCall>(&self, to: Address, call: C) -> ChainResult<C::Return> {
        let request = TransactionRequest::default()
            .with_to(to)
            .with_input(call.abi_encode());
        let data = self.provider.call(request).await?;
        C::abi_decode_returns(&data, true)
            .map_err(|e| ChainError::Decode(format!("{}: {e}", C::SIGNATURE)))
    }

    async fn pool_at(&self, index: u64) -> ChainResult<Address> {
        let call = IRocketPool::getPoolAtCall {
            index: U256::from(index),
        };
        Ok(self.call(self.contracts.rocket_pool, call).await?.minipool)
    }

    async fn validator_pubkey(&self, minipool: Address) -> ChainResult<ValidatorPubkey> {
        let call = IRocketMinipool::getValidatorPubkeyCall {};
        let pubkey = self.call(minipool, call).await?.pubkey;
        Ok(ValidatorPubkey::from_bytes(&pubkey))
    }

    async fn receipt(&self, hash: TxHash) -> ChainResult<Option<TxReceipt>> {
        let Some(receipt) = self.provider.get_transaction_receipt(hash).await? else {
            return Ok(None);
        };
        if !receipt.status() {
            return Err(ChainError::Reverted(hash.to_string()));
        }
        Ok(Some(TxReceipt {
            transaction_hash: hash.to_string(),
            block_number: receipt.block_number(),
        }))
    }
}

fn to_u64(value: U256, what: &str) -> ChainResult<u64> {
    u64::try_from(value).map_err(|_| ChainError::Decode(format!("{what} {value} exceeds u64")))
}

fn encode_transaction(transaction: &WatchtowerTransaction) -> Vec<u8> {
    match *transaction {
        WatchtowerTransaction::Logout { minipool } => {
            IRocketNodeWatchtower::logoutMinipoolCall { minipool }.abi_encode()
        }
        WatchtowerTransaction::Withdraw {
            minipool,
            balance_wei,
        } => IRocketNodeWatchtower::withdrawMinipoolCall {
            minipool,
            balance: balance_wei,
        }
        .abi_encode(),
    }
}

#[async_trait]
impl ChainGateway for JsonRpcChainGateway {
    async fn wait_for_sync(&self) -> ChainResult<()> {
        let mut logged = false;
        loop {
            if matches!(self.provider.syncing().await?, SyncStatus::None) {
                return Ok(());
            }
            if !logged {
                info!(rpc_url = %self.rpc_url, "Waiting for execution client to sync...");
                logged = true;
            }
            tokio::time::sleep(self.sync_poll_interval).await;
        }
    }

    fn node_address(&self) -> Address {
        self.node
    }

    async fn is_trusted(&self, node: Address) -> ChainResult<bool> {
        let call = IRocketNodeAPI::getTrustedCall { nodeAddress: node };
        Ok(self.call(self.contracts.rocket_node_api, call).await?.trusted)
    }

    #[instrument(skip(self))]
    async fn active_minipools(&self) -> ChainResult<MinipoolSet> {
        let count = self
            .call(self.contracts.rocket_pool, IRocketPool::getPoolsCountCall {})
            .await?
            .count;
        let count = to_u64(count, "pool count")?;

        let mut active = MinipoolSet::new();
        for index in 0..count {
            let minipool = self.pool_at(index).await?;
            let status = self.minipool_status(minipool).await?;
            if !status.is_active() {
                continue;
            }
            let pubkey = self.validator_pubkey(minipool).await?;
            if pubkey.is_empty() {
                warn!(%minipool, "Active minipool has no validator pubkey");
                continue;
            }
            active.insert(pubkey, minipool);
        }

        debug!(total = count, active = active.len(), "minipool discovery complete");
        Ok(active)
    }

    async fn minipool_check_interval(&self) -> ChainResult<u64> {
        let interval = self
            .call(
                self.contracts.rocket_minipool_settings,
                IRocketMinipoolSettings::getMinipoolCheckIntervalCall {},
            )
            .await?
            .interval;
        to_u64(interval, "minipool check interval")
    }

    async fn minipool_status(&self, minipool: Address) -> ChainResult<MinipoolStatus> {
        let status = self
            .call(minipool, IRocketMinipool::getStatusCall {})
            .await?
            .status;
        Ok(MinipoolStatus::from(status))
    }

    async fn node_transactor(&self) -> ChainResult<Transactor> {
        let accounts = self.provider.get_accounts().await?;
        if accounts.contains(&self.node) {
            Ok(Transactor { from: self.node })
        } else {
            Err(ChainError::AccountUnavailable(self.node.to_string()))
        }
    }

    #[instrument(skip(self, transactor), fields(method = transaction.method()))]
    async fn execute(
        &self,
        transactor: &Transactor,
        transaction: &WatchtowerTransaction,
    ) -> ChainResult<TxReceipt> {
        let request = TransactionRequest::default()
            .with_from(transactor.from)
            .with_to(self.contracts.rocket_node_watchtower)
            .with_input(encode_transaction(transaction));
        let pending = self.provider.send_transaction(request).await?;
        let hash = *pending.tx_hash();
        debug!(%hash, "transaction submitted, waiting for receipt");

        let wait = async {
            loop {
                if let Some(receipt) = self.receipt(hash).await? {
                    return Ok::<_, ChainError>(receipt);
                }
                tokio::time::sleep(self.receipt_poll_interval).await;
            }
        };

        tokio::time::timeout(self.receipt_timeout, wait)
            .await
            .map_err(|_| ChainError::ReceiptTimeout(hash.to_string()))?
    }
}
