//! Nonce calculation for outbound transactions
//!
//! Handles:
//! - The next nonce from the chain-reported count plus static and session offsets
//! - Session offsets for transactions sent but not yet indexed by the chain
//! - Manual bumps when an operator sees the sequence has drifted
//!
//! Ground truth lives on chain. Nothing here corrects a stale count: if the
//! reported count lags a very recent send, the computed nonce can repeat.
//! That case is only logged.

use dashmap::DashMap;
use ethers::types::Address;
use tracing::{debug, warn};

/// `tx_count + testnet_offset + session_offset`
pub fn compute_nonce(tx_count: u64, testnet_offset: u64, session_offset: u64) -> u64 {
    tx_count
        .saturating_add(testnet_offset)
        .saturating_add(session_offset)
}

/// Per (chain, address) session state
#[derive(Debug, Default)]
struct SessionState {
    /// Added on top of the chain count, only ever grows
    offset: u64,
    /// Nonce of the last successfully submitted transaction
    last_submitted: Option<u64>,
}

/// Tracks session nonce offsets across chains and addresses
#[derive(Debug, Default)]
pub struct SessionNonces {
    state: DashMap<(u64, Address), SessionState>,
}

impl SessionNonces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next nonce for `address` given a freshly fetched transaction count
    pub fn next_nonce(
        &self,
        chain_id: u64,
        address: Address,
        tx_count: u64,
        testnet_offset: u64,
    ) -> u64 {
        let state = self.state.entry((chain_id, address)).or_default();
        let nonce = compute_nonce(tx_count, testnet_offset, state.offset);

        if let Some(last) = state.last_submitted {
            if nonce <= last {
                warn!(
                    "Nonce {} for {:?} on chain {} does not exceed last submitted {}; chain count may be stale",
                    nonce, address, chain_id, last
                );
            } else if nonce > last + 1 {
                warn!(
                    "Nonce gap for {:?} on chain {}: last submitted {}, next {}",
                    address, chain_id, last, nonce
                );
            }
        }

        debug!(
            "Computed nonce {} for {:?} on chain {} (count {}, offset {})",
            nonce, address, chain_id, tx_count, state.offset
        );
        nonce
    }

    /// Record a successful submission; advances the session offset by one
    pub fn record_submitted(&self, chain_id: u64, address: Address, nonce: u64) -> u64 {
        let mut state = self.state.entry((chain_id, address)).or_default();
        state.offset += 1;
        state.last_submitted = Some(nonce);
        state.offset
    }

    /// Operator-driven bump for a drifted sequence
    pub fn increase(&self, chain_id: u64, address: Address) -> u64 {
        let mut state = self.state.entry((chain_id, address)).or_default();
        state.offset += 1;
        debug!(
            "Manually increased nonce offset for {:?} on chain {} to {}",
            address, chain_id, state.offset
        );
        state.offset
    }

    /// Current session offset
    pub fn offset(&self, chain_id: u64, address: Address) -> u64 {
        self.state
            .get(&(chain_id, address))
            .map(|s| s.offset)
            .unwrap_or(0)
    }

    /// Forget all session state for an address, e.g. when the key changes
    pub fn reset(&self, chain_id: u64, address: Address) {
        self.state.remove(&(chain_id, address));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_nonce() {
        assert_eq!(compute_nonce(5, 0, 2), 7);
        assert_eq!(compute_nonce(0, 0, 0), 0);
        assert_eq!(compute_nonce(10, 3, 1), 14);
        assert_eq!(compute_nonce(u64::MAX, 1, 1), u64::MAX);
    }

    #[test]
    fn test_offset_grows_per_submission() {
        let nonces = SessionNonces::new();
        let addr = Address::repeat_byte(0xaa);

        assert_eq!(nonces.next_nonce(1, addr, 5, 0), 5);
        assert_eq!(nonces.record_submitted(1, addr, 5), 1);
        // chain still reports 5 while the first tx sits in the pool
        assert_eq!(nonces.next_nonce(1, addr, 5, 0), 6);
        assert_eq!(nonces.record_submitted(1, addr, 6), 2);
        assert_eq!(nonces.offset(1, addr), 2);
    }

    #[test]
    fn test_manual_increase_and_reset() {
        let nonces = SessionNonces::new();
        let addr = Address::repeat_byte(0xbb);

        assert_eq!(nonces.increase(1, addr), 1);
        assert_eq!(nonces.next_nonce(1, addr, 3, 0), 4);

        nonces.reset(1, addr);
        assert_eq!(nonces.offset(1, addr), 0);
    }

    #[test]
    fn test_keys_are_independent() {
        let nonces = SessionNonces::new();
        let a = Address::repeat_byte(0x01);
        let b = Address::repeat_byte(0x02);

        nonces.record_submitted(1, a, 0);
        assert_eq!(nonces.offset(1, a), 1);
        assert_eq!(nonces.offset(1, b), 0);
        assert_eq!(nonces.offset(11155111, a), 0);
    }
}
