//! Client-side Ethereum transaction construction
//!
//! Derives addresses from private keys, ABI-encodes function calls,
//! computes nonces with session offsets, and assembles and signs legacy
//! EIP-155 transactions ready for `eth_sendRawTransaction`.

pub mod abi;
pub mod chain;
pub mod config;
pub mod error;
pub mod keys;
pub mod tx;
pub mod validation;

pub use error::{EncodingError, TxError, TxResult};
pub use keys::{checksum_address, derive_address, PrivateKey};
pub use tx::{build, BuildRequest, SignedTransaction, TxForm, TxSession};
