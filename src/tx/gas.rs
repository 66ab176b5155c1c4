//! Gas estimation buffering, price suggestions and cost calculation

use crate::chain::ChainClient;
use crate::error::TxResult;
use crate::validation::MAX_GAS_LIMIT;

use ethers::types::{Address, Bytes, U256};
use ethers::utils::format_ether;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Gas heuristics applied on top of node estimates
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GasPolicy {
    /// Buffer percentage for estimated gas limits (e.g., 20 = 20% buffer)
    pub gas_limit_buffer_percent: u64,
    /// Slow price suggestion as a percentage of the node price
    pub slow_price_percent: u64,
    /// Fast price suggestion as a percentage of the node price
    pub fast_price_percent: u64,
    /// Highest gas limit a form may carry
    pub max_gas_limit: u64,
}

impl Default for GasPolicy {
    fn default() -> Self {
        Self {
            gas_limit_buffer_percent: 20,
            slow_price_percent: 90,
            fast_price_percent: 110,
            max_gas_limit: MAX_GAS_LIMIT,
        }
    }
}

/// Three price points around the node's current gas price
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GasPriceSuggestions {
    pub slow: U256,
    pub standard: U256,
    pub fast: U256,
}

/// Upper bound on the fee of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxCost {
    pub wei: U256,
    pub eth: String,
    pub gwei: String,
}

impl GasPolicy {
    /// Apply the limit buffer, rounding down
    pub fn buffer_gas_limit(&self, estimate: U256) -> U256 {
        estimate.saturating_mul(U256::from(100 + self.gas_limit_buffer_percent)) / 100
    }

    /// Slow/standard/fast price points for a base price
    pub fn price_suggestions(&self, base: U256) -> GasPriceSuggestions {
        GasPriceSuggestions {
            slow: base.saturating_mul(U256::from(self.slow_price_percent)) / 100,
            standard: base,
            fast: base.saturating_mul(U256::from(self.fast_price_percent)) / 100,
        }
    }

    /// Ask the node for a gas estimate and add the buffer
    pub async fn estimate_gas_limit(
        &self,
        client: &dyn ChainClient,
        from: Address,
        to: Address,
        data: Bytes,
        value: U256,
    ) -> TxResult<U256> {
        let estimate = client.estimate_gas(from, to, data, value).await?;
        let buffered = self.buffer_gas_limit(estimate);
        debug!("Gas estimate {} buffered to {}", estimate, buffered);
        Ok(buffered)
    }

    /// Fetch the node's gas price and derive suggestions from it
    pub async fn suggest_gas_prices(&self, client: &dyn ChainClient) -> TxResult<GasPriceSuggestions> {
        let base = client.get_gas_price().await?;
        Ok(self.price_suggestions(base))
    }
}

/// Calculate the maximum fee for `gas_limit` units at `gas_price` wei
pub fn calculate_cost(gas_limit: U256, gas_price: U256) -> TxCost {
    let wei = gas_limit.saturating_mul(gas_price);
    TxCost {
        wei,
        eth: format_eth(wei),
        gwei: format_gwei(gas_price),
    }
}

/// Wei as a decimal ETH string without trailing zeros
pub fn format_eth(wei: U256) -> String {
    trim_fraction(&format_ether(wei))
}

/// Gwei with two truncated decimals
fn format_gwei(wei: U256) -> String {
    let gwei = U256::exp10(9);
    let whole = wei / gwei;
    let cents = (wei % gwei) / U256::exp10(7);
    format!("{}.{:02}", whole, cents.as_u64())
}

fn trim_fraction(decimal: &str) -> String {
    if !decimal.contains('.') {
        return decimal.to_string();
    }
    decimal
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}
