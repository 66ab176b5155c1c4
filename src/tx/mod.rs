//! Transaction assembly, signing and submission with nonce and gas handling

pub mod builder;
pub mod gas;
pub mod nonce;
pub mod session;
pub mod signed;

pub use builder::{build, BuildRequest, TxForm};
pub use gas::{calculate_cost, format_eth, GasPolicy, GasPriceSuggestions, TxCost};
pub use nonce::{compute_nonce, SessionNonces};
pub use session::{classify_broadcast_error, SendReceipt, TxSession};
pub use signed::{decode_signed, DecodedTransaction, SignedTransaction};
