//! JSON-RPC chain client with multi-endpoint failover

use super::ChainClient;
use crate::config::NetworkConfig;
use crate::error::{TxError, TxResult};

use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider, ProviderError};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, BlockId, BlockNumber, Bytes, TransactionRequest, H256, U256};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Chain client over one or more HTTP JSON-RPC endpoints
pub struct RpcChainClient {
    /// Chain ID of the network
    chain_id: u64,
    /// HTTP providers (multiple for failover)
    http_providers: Vec<Provider<Http>>,
    /// Current active provider index
    current_provider: AtomicUsize,
    /// Per-request deadline
    request_timeout: Duration,
}

impl RpcChainClient {
    /// Create a client for every parseable RPC URL of `network`
    pub fn new(network: &NetworkConfig, request_timeout: Duration) -> TxResult<Self> {
        let mut http_providers = Vec::new();

        for url in &network.rpc_urls {
            match Provider::<Http>::try_from(url.as_str()) {
                Ok(provider) => {
                    http_providers.push(provider);
                    debug!("Added HTTP provider for chain {}: {}", network.chain_id, url);
                }
                Err(e) => {
                    warn!("Failed to create provider for {}: {}", url, e);
                }
            }
        }

        if http_providers.is_empty() {
            return Err(TxError::Config(format!(
                "network {} has no valid RPC URLs",
                network.name
            )));
        }

        info!(
            "Chain client for {} (ID: {}) with {} endpoint(s)",
            network.name,
            network.chain_id,
            http_providers.len()
        );

        Ok(Self {
            chain_id: network.chain_id,
            http_providers,
            current_provider: AtomicUsize::new(0),
            request_timeout,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Get the active HTTP provider
    fn http(&self) -> &Provider<Http> {
        let idx = self.current_provider.load(Ordering::Relaxed);
        &self.http_providers[idx % self.http_providers.len()]
    }

    /// Switch to next available provider
    fn failover(&self) {
        let current = self.current_provider.load(Ordering::Relaxed);
        let next = (current + 1) % self.http_providers.len();
        self.current_provider.store(next, Ordering::Relaxed);
        warn!("Chain {} failover to provider {}", self.chain_id, next);
    }

    /// Run a read-only request, moving to the next endpoint on failure
    async fn read<T, F, Fut>(&self, operation: &str, request: F) -> TxResult<T>
    where
        F: Fn(Provider<Http>) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut last_error = None;

        for _ in 0..self.http_providers.len() {
            match timeout(self.request_timeout, request(self.http().clone())).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => {
                    warn!("{} failed on chain {}: {}", operation, self.chain_id, e);
                    last_error = Some(TxError::chain(operation, e));
                }
                Err(_) => {
                    warn!("{} timed out on chain {}", operation, self.chain_id);
                    last_error = Some(TxError::Timeout {
                        operation: operation.to_string(),
                    });
                }
            }
            self.failover();
        }

        Err(last_error.unwrap_or_else(|| TxError::chain(operation, "all providers failed")))
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn get_balance(&self, address: Address) -> TxResult<U256> {
        self.read("get balance", |p| async move { p.get_balance(address, None).await })
            .await
    }

    async fn get_transaction_count(&self, address: Address) -> TxResult<U256> {
        let pending = Some(BlockId::from(BlockNumber::Pending));
        self.read("get transaction count", |p| async move {
            p.get_transaction_count(address, pending).await
        })
        .await
    }

    async fn get_gas_price(&self) -> TxResult<U256> {
        self.read("get gas price", |p| async move { p.get_gas_price().await })
            .await
    }

    async fn estimate_gas(
        &self,
        from: Address,
        to: Address,
        data: Bytes,
        value: U256,
    ) -> TxResult<U256> {
        let tx: TypedTransaction = TransactionRequest::new()
            .from(from)
            .to(to)
            .data(data)
            .value(value)
            .into();
        self.read("estimate gas", |p| {
            let tx = tx.clone();
            async move { p.estimate_gas(&tx, None).await }
        })
        .await
    }

    /// Single attempt on the active endpoint; broadcasts are never replayed
    async fn send_raw_transaction(&self, raw: Bytes) -> TxResult<H256> {
        let provider = self.http().clone();
        let result = timeout(self.request_timeout, async move {
            let pending = provider.send_raw_transaction(raw).await?;
            Ok::<_, ProviderError>(pending.tx_hash())
        })
        .await;

        match result {
            Ok(Ok(hash)) => Ok(hash),
            Ok(Err(e)) => Err(TxError::chain("send raw transaction", e)),
            Err(_) => Err(TxError::Timeout {
                operation: "send raw transaction".to_string(),
            }),
        }
    }
}
