//! Signed transaction output and decoding

use crate::error::{TxError, TxResult};

use ethers::types::{Address, Bytes, Transaction, H256, U256};
use ethers::utils::{keccak256, rlp};
use serde::Serialize;
use std::fmt;

/// A fully signed, RLP-serialized transaction ready for broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedTransaction {
    pub raw: Bytes,
    pub hash: H256,
    pub from: Address,
    pub to: Address,
    pub nonce: u64,
    pub value: U256,
    pub gas_limit: U256,
    pub gas_price: U256,
    pub data: Bytes,
    pub chain_id: u64,
}

impl SignedTransaction {
    pub(crate) fn new(raw: Bytes, fields: SignedFields) -> Self {
        let hash = H256::from(keccak256(&raw));
        Self {
            raw,
            hash,
            from: fields.from,
            to: fields.to,
            nonce: fields.nonce,
            value: fields.value,
            gas_limit: fields.gas_limit,
            gas_price: fields.gas_price,
            data: fields.data,
            chain_id: fields.chain_id,
        }
    }

    /// `0x`-prefixed hex, the form `eth_sendRawTransaction` takes
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }
}

impl fmt::Display for SignedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

pub(crate) struct SignedFields {
    pub from: Address,
    pub to: Address,
    pub nonce: u64,
    pub value: U256,
    pub gas_limit: U256,
    pub gas_price: U256,
    pub data: Bytes,
    pub chain_id: u64,
}

/// Fields recovered from a raw signed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedTransaction {
    pub hash: H256,
    pub from: Address,
    pub to: Option<Address>,
    pub nonce: U256,
    pub value: U256,
    pub gas_limit: U256,
    pub gas_price: Option<U256>,
    pub data: Bytes,
    pub chain_id: Option<u64>,
}

/// Decode a `0x`-prefixed raw transaction and recover its sender
pub fn decode_signed(raw_hex: &str) -> TxResult<DecodedTransaction> {
    let digits = raw_hex
        .trim()
        .strip_prefix("0x")
        .ok_or_else(|| TxError::validation("raw transaction", "must start with 0x"))?;
    let bytes =
        hex::decode(digits).map_err(|e| TxError::validation("raw transaction", e.to_string()))?;

    let tx: Transaction = rlp::decode(&bytes)
        .map_err(|e| TxError::validation("raw transaction", format!("not a signed transaction: {}", e)))?;
    let from = tx
        .recover_from()
        .map_err(|e| TxError::Signing(format!("cannot recover sender: {}", e)))?;

    Ok(DecodedTransaction {
        hash: H256::from(keccak256(&bytes)),
        from,
        to: tx.to,
        nonce: tx.nonce,
        value: tx.value,
        gas_limit: tx.gas,
        gas_price: tx.gas_price,
        data: tx.input,
        chain_id: tx.chain_id.map(|id| id.as_u64()),
    })
}
