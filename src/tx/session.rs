//! Serialized fetch, sign and broadcast sequence per sending address

use super::builder::{build, BuildRequest, TxForm};
use super::gas::{format_eth, GasPolicy, GasPriceSuggestions};
use super::nonce::SessionNonces;
use super::signed::SignedTransaction;
use crate::chain::ChainClient;
use crate::config::NetworkConfig;
use crate::error::{TxError, TxResult};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use ethers::types::{Address, H256, U256};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Outcome of a successful broadcast
#[derive(Debug, Clone, Serialize)]
pub struct SendReceipt {
    pub tx_hash: H256,
    pub raw: String,
    pub nonce: u64,
    pub from: Address,
    pub to: Address,
    pub explorer_url: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// Sends transactions for one network, one at a time per address
pub struct TxSession {
    client: Arc<dyn ChainClient>,
    network: NetworkConfig,
    nonces: Arc<SessionNonces>,
    gas_policy: GasPolicy,
    locks: DashMap<Address, Arc<Mutex<()>>>,
    send_timeout: Duration,
}

impl TxSession {
    pub fn new(client: Arc<dyn ChainClient>, network: NetworkConfig, gas_policy: GasPolicy) -> Self {
        Self {
            client,
            network,
            nonces: Arc::new(SessionNonces::new()),
            gas_policy,
            locks: DashMap::new(),
            send_timeout: Duration::from_secs(30),
        }
    }

    /// Share offsets with other sessions on the same process
    pub fn with_nonces(mut self, nonces: Arc<SessionNonces>) -> Self {
        self.nonces = nonces;
        self
    }

    pub fn with_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn nonces(&self) -> &SessionNonces {
        &self.nonces
    }

    /// Next nonce from the pending count and both offsets
    pub async fn next_nonce(&self, address: Address) -> TxResult<u64> {
        let count = self.client.get_transaction_count(address).await?;
        if count > U256::from(u64::MAX) {
            return Err(TxError::chain(
                "get transaction count",
                format!("count {} does not fit a nonce", count),
            ));
        }
        Ok(self.nonces.next_nonce(
            self.network.chain_id,
            address,
            count.as_u64(),
            self.network.nonce_offset,
        ))
    }

    /// Manual bump of the session offset, returns the new offset
    pub fn increase_nonce(&self, address: Address) -> u64 {
        self.nonces.increase(self.network.chain_id, address)
    }

    /// Balance as a decimal ETH string
    pub async fn balance(&self, address: Address) -> TxResult<String> {
        let wei = self.client.get_balance(address).await?;
        Ok(format_eth(wei))
    }

    pub async fn gas_prices(&self) -> TxResult<GasPriceSuggestions> {
        self.gas_policy.suggest_gas_prices(self.client.as_ref()).await
    }

    /// Buffered gas limit for the call described by `request`
    pub async fn estimate_gas_limit(&self, request: &BuildRequest) -> TxResult<U256> {
        let from = request.private_key.address()?;
        let limit = self
            .gas_policy
            .estimate_gas_limit(
                self.client.as_ref(),
                from,
                request.recipient,
                request.call_data()?,
                request.value.unwrap_or_default(),
            )
            .await?;
        if limit > U256::from(self.gas_policy.max_gas_limit) {
            return Err(TxError::validation(
                "gas limit",
                format!(
                    "estimated {} exceeds the maximum of {}",
                    limit, self.gas_policy.max_gas_limit
                ),
            ));
        }
        Ok(limit)
    }

    /// Fill absent nonce, gas price and gas limit from the chain
    pub async fn fill(&self, mut request: BuildRequest) -> TxResult<BuildRequest> {
        if request.chain_id != self.network.chain_id {
            return Err(TxError::validation(
                "chain id",
                format!(
                    "{} does not match network {} ({})",
                    request.chain_id, self.network.name, self.network.chain_id
                ),
            ));
        }

        if request.nonce.is_none() {
            let from = request.private_key.address()?;
            request.nonce = Some(self.next_nonce(from).await?);
        }
        if request.gas_price.is_none() {
            request.gas_price = Some(self.client.get_gas_price().await?);
        }
        if request.gas_limit.is_none() {
            request.gas_limit = Some(self.estimate_gas_limit(&request).await?);
        }
        Ok(request)
    }

    /// Fill and sign without broadcasting
    pub async fn prepare(&self, form: &TxForm) -> TxResult<SignedTransaction> {
        let request = self.parse(form)?;
        build(&self.fill(request).await?)
    }

    /// Fill, sign and broadcast. The session offset advances only when the
    /// node accepts the transaction; failures are returned unretried.
    pub async fn send(&self, form: &TxForm) -> TxResult<SendReceipt> {
        let request = self.parse(form)?;
        let from = request.private_key.address()?;

        let lock = self.locks.entry(from).or_default().clone();
        let _guard = lock.lock().await;

        let signed = build(&self.fill(request).await?)?;
        debug!(
            "Broadcasting {:?} nonce {} on {}",
            signed.hash, signed.nonce, self.network.name
        );

        let tx_hash = match timeout(
            self.send_timeout,
            self.client.send_raw_transaction(signed.raw.clone()),
        )
        .await
        {
            Ok(Ok(hash)) => hash,
            Ok(Err(e)) => {
                warn!("Broadcast of nonce {} from {:?} failed: {}", signed.nonce, from, e);
                return Err(classify_broadcast_error(e));
            }
            Err(_) => {
                warn!("Broadcast of nonce {} from {:?} timed out", signed.nonce, from);
                return Err(TxError::Timeout {
                    operation: "send raw transaction".to_string(),
                });
            }
        };

        if tx_hash != signed.hash {
            warn!(
                "Node reported hash {:?}, locally computed {:?}",
                tx_hash, signed.hash
            );
        }

        let offset = self
            .nonces
            .record_submitted(self.network.chain_id, from, signed.nonce);
        info!(
            "Transaction sent: {:?} nonce {} (session offset {})",
            tx_hash, signed.nonce, offset
        );

        Ok(SendReceipt {
            tx_hash,
            raw: signed.to_hex(),
            nonce: signed.nonce,
            from,
            to: signed.to,
            explorer_url: self.network.tx_url(&tx_hash),
            sent_at: Utc::now(),
        })
    }

    fn parse(&self, form: &TxForm) -> TxResult<BuildRequest> {
        form.parse(self.network.chain_id, self.gas_policy.max_gas_limit)
    }
}

/// Map node rejections onto errors that say what to do next
pub fn classify_broadcast_error(error: TxError) -> TxError {
    let message = error.to_string();
    let lower = message.to_lowercase();

    if lower.contains("insufficient funds") {
        return TxError::InsufficientFunds(message);
    }

    let hint = if lower.contains("nonce too low") {
        Some("nonce already used; refresh the transaction count and rebuild")
    } else if lower.contains("replacement transaction underpriced") {
        Some("a pending transaction holds this nonce; raise the gas price to replace it")
    } else if lower.contains("already known") {
        Some("the node already has this transaction")
    } else {
        None
    };

    match (error, hint) {
        (TxError::ChainCommunication { operation, message }, Some(hint)) => {
            TxError::ChainCommunication {
                operation,
                message: format!("{} ({})", message, hint),
            }
        }
        (error, _) => error,
    }
}
