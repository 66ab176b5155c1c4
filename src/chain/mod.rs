//! Chain access consumed by the transaction pipeline
//!
//! This module provides:
//! - The `ChainClient` seam: balance, transaction count, gas price,
//!   gas estimation and raw transaction broadcast
//! - A JSON-RPC implementation with multi-endpoint failover
//!
//! None of these calls are retried by the pipeline itself. A failure is
//! returned to the caller, who may re-fetch and rebuild.

pub mod provider;

pub use provider::RpcChainClient;

use crate::error::TxResult;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};

/// Asynchronous data source and broadcaster for one network
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Balance in wei
    async fn get_balance(&self, address: Address) -> TxResult<U256>;

    /// Sent transaction count including the pending pool
    async fn get_transaction_count(&self, address: Address) -> TxResult<U256>;

    /// Current gas price in wei
    async fn get_gas_price(&self) -> TxResult<U256>;

    /// Node-side gas estimate for a call
    async fn estimate_gas(
        &self,
        from: Address,
        to: Address,
        data: Bytes,
        value: U256,
    ) -> TxResult<U256>;

    /// Broadcast a signed transaction, returning its hash
    async fn send_raw_transaction(&self, raw: Bytes) -> TxResult<H256>;
}
