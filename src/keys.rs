//! Private key handling and address derivation
//!
//! An address is the low 20 bytes of keccak256 over the uncompressed
//! secp256k1 public point, without its leading 0x04 tag.

use crate::error::{TxError, TxResult};
use crate::validation::check_private_key_format;

use ethers::core::k256::ecdsa::SigningKey;
use ethers::core::k256::elliptic_curve::sec1::ToEncodedPoint;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use ethers::utils::to_checksum;
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A secp256k1 secret scalar, wiped from memory when dropped
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; 32]);

impl PrivateKey {
    /// Wrap raw key bytes, rejecting values outside the curve order
    pub fn from_bytes(bytes: [u8; 32]) -> TxResult<Self> {
        let key = PrivateKey(bytes);
        key.signing_key()?;
        Ok(key)
    }

    pub(crate) fn signing_key(&self) -> TxResult<SigningKey> {
        SigningKey::from_slice(&self.0).map_err(|_| {
            TxError::InvalidKey("key is not a valid secp256k1 scalar".to_string())
        })
    }

    /// Address controlled by this key
    pub fn address(&self) -> TxResult<Address> {
        Ok(address_from_signing_key(&self.signing_key()?))
    }

    /// Signer bound to `chain_id` for EIP-155 replay protection
    pub(crate) fn wallet(&self, chain_id: u64) -> TxResult<LocalWallet> {
        Ok(LocalWallet::from(self.signing_key()?).with_chain_id(chain_id))
    }
}

impl FromStr for PrivateKey {
    type Err = TxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        check_private_key_format(s).map_err(|reason| TxError::InvalidKey(reason.to_string()))?;

        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&s[2..], &mut bytes)
            .map_err(|e| TxError::InvalidKey(e.to_string()))?;
        let key = Self::from_bytes(bytes);
        bytes.zeroize();
        key
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// Derive the public address for a `0x`-prefixed 64 hex character private key
pub fn derive_address(private_key: &str) -> TxResult<Address> {
    private_key.parse::<PrivateKey>()?.address()
}

fn address_from_signing_key(key: &SigningKey) -> Address {
    let point = key.verifying_key().to_encoded_point(false);
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// EIP-55 mixed-case form of an address
pub fn checksum_address(address: &Address) -> String {
    to_checksum(address, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEB3_DOCS_KEY: &str =
        "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    #[test]
    fn test_known_vectors() {
        let address = derive_address(WEB3_DOCS_KEY).unwrap();
        assert_eq!(
            checksum_address(&address),
            "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23"
        );

        let one = format!("0x{:064x}", 1);
        assert_eq!(
            checksum_address(&derive_address(&one).unwrap()),
            "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
        );
    }

    #[test]
    fn test_deterministic() {
        let key = format!("0x{}", "46".repeat(32));
        assert_eq!(derive_address(&key).unwrap(), derive_address(&key).unwrap());
    }

    #[test]
    fn test_matches_wallet_address() {
        let key: PrivateKey = WEB3_DOCS_KEY.parse().unwrap();
        let wallet = key.wallet(1).unwrap();
        assert_eq!(key.address().unwrap(), wallet.address());
    }

    #[test]
    fn test_invalid_keys() {
        let cases = [
            ("", "required"),
            ("4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318", "start with 0x"),
            ("0x4c0883a6", "66 characters"),
            ("0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f36231z", "invalid characters"),
        ];
        for (input, reason) in cases {
            match derive_address(input) {
                Err(TxError::InvalidKey(msg)) => assert!(msg.contains(reason), "{msg}"),
                other => panic!("expected InvalidKey for {input:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_out_of_range_scalars() {
        let zero = format!("0x{}", "0".repeat(64));
        assert!(matches!(derive_address(&zero), Err(TxError::InvalidKey(_))));

        let above_order = format!("0x{}", "f".repeat(64));
        assert!(matches!(derive_address(&above_order), Err(TxError::InvalidKey(_))));
    }

    #[test]
    fn test_debug_is_redacted() {
        let key: PrivateKey = WEB3_DOCS_KEY.parse().unwrap();
        let shown = format!("{:?}", key);
        assert!(!shown.contains("4c0883"));
    }
}
