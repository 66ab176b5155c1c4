//! Transaction assembly and signing
//!
//! `build` is a linear pipeline: required fields are checked, call data is
//! encoded, the legacy transaction is assembled and signed with EIP-155
//! replay protection. It performs no I/O; nonce and gas price must already be
//! resolved by the caller.

use super::signed::{SignedFields, SignedTransaction};
use crate::abi::encode_call;
use crate::error::{TxError, TxResult};
use crate::keys::{checksum_address, PrivateKey};
use crate::validation::{parse_hex_quantity, parse_nonce, validate_address, validate_gas_limit};

use ethers::signers::Signer;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest, U256};
use serde::Deserialize;
use std::fmt;
use tracing::{debug, info, warn};

/// Strongly typed input to [`build`]
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub recipient: Address,
    pub private_key: PrivateKey,
    pub nonce: Option<u64>,
    pub function_signature: Option<String>,
    pub function_parameters: Option<String>,
    pub value: Option<U256>,
    pub gas_limit: Option<U256>,
    pub gas_price: Option<U256>,
    pub chain_id: u64,
    /// When set, the key must control this address
    pub expected_sender: Option<Address>,
}

impl BuildRequest {
    /// A plain transfer to `recipient` on mainnet; fill in the rest with the setters
    pub fn new(recipient: Address, private_key: PrivateKey) -> Self {
        Self {
            recipient,
            private_key,
            nonce: None,
            function_signature: None,
            function_parameters: None,
            value: None,
            gas_limit: None,
            gas_price: None,
            chain_id: 1,
            expected_sender: None,
        }
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn gas_limit(mut self, gas_limit: impl Into<U256>) -> Self {
        self.gas_limit = Some(gas_limit.into());
        self
    }

    pub fn gas_price(mut self, gas_price: impl Into<U256>) -> Self {
        self.gas_price = Some(gas_price.into());
        self
    }

    pub fn value(mut self, value: impl Into<U256>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn call(mut self, signature: impl Into<String>, parameters: impl Into<String>) -> Self {
        self.function_signature = Some(signature.into());
        self.function_parameters = Some(parameters.into());
        self
    }

    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn expected_sender(mut self, sender: Address) -> Self {
        self.expected_sender = Some(sender);
        self
    }

    /// Call data for this request, empty for plain transfers
    pub fn call_data(&self) -> TxResult<Bytes> {
        let signature = self
            .function_signature
            .as_deref()
            .filter(|s| !s.trim().is_empty());

        match (signature, self.function_parameters.as_deref()) {
            (Some(signature), Some(parameters)) => Ok(encode_call(signature, parameters)?),
            (Some(signature), None) => {
                warn!(
                    "Function signature {} given without parameters; sending a plain transfer",
                    signature
                );
                Ok(Bytes::default())
            }
            _ => Ok(Bytes::default()),
        }
    }
}

/// Build and sign a transaction, all or nothing
pub fn build(request: &BuildRequest) -> TxResult<SignedTransaction> {
    let gas_limit = request
        .gas_limit
        .ok_or_else(|| TxError::Build("gas limit required".to_string()))?;
    let gas_price = request
        .gas_price
        .ok_or_else(|| TxError::Build("gas price required".to_string()))?;
    let nonce = request
        .nonce
        .ok_or_else(|| TxError::Build("nonce required".to_string()))?;

    let data = request.call_data()?;
    let value = request.value.unwrap_or_default();

    let tx: TypedTransaction = TransactionRequest::new()
        .to(request.recipient)
        .nonce(nonce)
        .gas(gas_limit)
        .gas_price(gas_price)
        .value(value)
        .data(data.clone())
        .chain_id(request.chain_id)
        .into();

    let wallet = request.private_key.wallet(request.chain_id)?;
    let from = wallet.address();
    if let Some(expected) = request.expected_sender {
        if expected != from {
            return Err(TxError::Build(format!(
                "signing key does not match expected sender {} (key controls {})",
                checksum_address(&expected),
                checksum_address(&from)
            )));
        }
    }

    debug!(
        "Signing transaction nonce {} to {:?} on chain {} ({} bytes of data)",
        nonce,
        request.recipient,
        request.chain_id,
        data.len()
    );
    let signature = wallet
        .sign_transaction_sync(&tx)
        .map_err(|e| TxError::Signing(e.to_string()))?;
    let raw = tx.rlp_signed(&signature);

    let signed = SignedTransaction::new(
        raw,
        SignedFields {
            from,
            to: request.recipient,
            nonce,
            value,
            gas_limit,
            gas_price,
            data,
            chain_id: request.chain_id,
        },
    );
    info!("Built transaction {:?} from {:?} nonce {}", signed.hash, from, nonce);
    Ok(signed)
}

/// String-typed boundary form, as collected from a user or a JSON document.
/// Blank fields count as absent.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TxForm {
    pub recipient: String,
    pub private_key: String,
    pub nonce: Option<String>,
    pub function_signature: Option<String>,
    pub function_parameters: Option<String>,
    pub value: Option<String>,
    pub gas_limit: Option<String>,
    pub gas_price: Option<String>,
    pub chain_id: Option<u64>,
    pub expected_sender: Option<String>,
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl TxForm {
    /// Validate every field and produce a typed request.
    ///
    /// Missing gas or nonce values stay `None` here so that [`build`]
    /// reports them; the parameter list is kept verbatim, empty included.
    pub fn parse(&self, default_chain_id: u64, max_gas_limit: u64) -> TxResult<BuildRequest> {
        let private_key: PrivateKey = self.private_key.trim().parse()?;
        let recipient = validate_address("recipient", &self.recipient)?;

        let gas_limit = present(&self.gas_limit)
            .map(|s| parse_hex_quantity("gas limit", s))
            .transpose()?
            .map(|g| validate_gas_limit(g, max_gas_limit))
            .transpose()?;

        Ok(BuildRequest {
            recipient,
            private_key,
            nonce: present(&self.nonce).map(parse_nonce).transpose()?,
            function_signature: present(&self.function_signature).map(str::to_string),
            function_parameters: self.function_parameters.clone(),
            value: present(&self.value)
                .map(|s| parse_hex_quantity("value", s))
                .transpose()?,
            gas_limit,
            gas_price: present(&self.gas_price)
                .map(|s| parse_hex_quantity("gas price", s))
                .transpose()?,
            chain_id: self.chain_id.unwrap_or(default_chain_id),
            expected_sender: present(&self.expected_sender)
                .map(|s| validate_address("expected sender", s))
                .transpose()?,
        })
    }
}

impl fmt::Debug for TxForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxForm")
            .field("recipient", &self.recipient)
            .field("private_key", &"<redacted>")
            .field("nonce", &self.nonce)
            .field("function_signature", &self.function_signature)
            .field("function_parameters", &self.function_parameters)
            .field("value", &self.value)
            .field("gas_limit", &self.gas_limit)
            .field("gas_price", &self.gas_price)
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::decode_signed;

    fn key() -> PrivateKey {
        format!("0x{}", "46".repeat(32)).parse().unwrap()
    }

    fn transfer() -> BuildRequest {
        BuildRequest::new(Address::repeat_byte(0x35), key())
            .nonce(9)
            .gas_limit(21_000u64)
            .gas_price(20_000_000_000u64)
            .value(U256::exp10(18))
    }

    #[test]
    fn test_eip155_reference_vector() {
        let signed = build(&transfer()).unwrap();
        assert_eq!(
            signed.to_hex(),
            "0xf86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
        assert_eq!(
            signed.from,
            "0x9d8A62f656a8d1615C1294fd71e9CFb3E4855A4F".parse::<Address>().unwrap()
        );
    }

    #[test]
    fn test_missing_fields_in_order() {
        let mut req = transfer();
        req.gas_limit = None;
        req.gas_price = None;
        req.nonce = None;
        assert_eq!(build(&req).unwrap_err().to_string(), "Build error: gas limit required");

        req.gas_limit = Some(U256::from(21_000));
        assert_eq!(build(&req).unwrap_err().to_string(), "Build error: gas price required");

        req.gas_price = Some(U256::one());
        assert_eq!(build(&req).unwrap_err().to_string(), "Build error: nonce required");

        req.nonce = Some(0);
        assert!(build(&req).is_ok());
    }

    #[test]
    fn test_value_defaults_to_zero() {
        let mut req = transfer();
        req.value = None;
        let signed = build(&req).unwrap();
        assert!(signed.value.is_zero());
        assert!(decode_signed(&signed.to_hex()).unwrap().value.is_zero());
    }

    #[test]
    fn test_contract_call_data() {
        let req = transfer().call("setValue(uint256)", "200,");
        let signed = build(&req).unwrap();
        assert_eq!(&signed.data[..4], &[0x55, 0x24, 0x10, 0x77]);

        let decoded = decode_signed(&signed.to_hex()).unwrap();
        assert_eq!(decoded.data, signed.data);
    }

    #[test]
    fn test_encoding_failure_aborts_build() {
        let req = transfer().call("transfer(address,uint256)", "0xabc,1");
        assert!(matches!(build(&req), Err(TxError::Encoding(_))));
    }

    #[test]
    fn test_signature_without_parameters_is_transfer() {
        let mut req = transfer();
        req.function_signature = Some("setValue(uint256)".to_string());
        assert!(build(&req).unwrap().data.is_empty());
    }

    #[test]
    fn test_expected_sender_mismatch() {
        let req = transfer().expected_sender(Address::repeat_byte(0x01));
        let err = build(&req).unwrap_err();
        assert!(err.to_string().contains("does not match expected sender"));

        let owner = key().address().unwrap();
        assert!(build(&transfer().expected_sender(owner)).is_ok());
    }

    #[test]
    fn test_form_parsing() {
        let form = TxForm {
            recipient: format!("0x{}", "11".repeat(20)),
            private_key: format!("0x{}", "46".repeat(32)),
            nonce: Some("0x3".to_string()),
            value: Some(" ".to_string()),
            gas_limit: Some("0x5208".to_string()),
            gas_price: Some("0x3b9aca00".to_string()),
            ..Default::default()
        };
        let req = form.parse(5, 30_000_000).unwrap();
        assert_eq!(req.nonce, Some(3));
        assert_eq!(req.value, None);
        assert_eq!(req.gas_limit, Some(U256::from(21_000)));
        assert_eq!(req.gas_price, Some(U256::from(1_000_000_000u64)));
        assert_eq!(req.chain_id, 5);

        let too_much_gas = TxForm {
            gas_limit: Some("0x1ffffff".to_string()),
            ..form.clone()
        };
        assert!(matches!(
            too_much_gas.parse(1, 30_000_000),
            Err(TxError::Validation { field: "gas limit", .. })
        ));

        let bad_key = TxForm {
            private_key: "0x1234".to_string(),
            ..form
        };
        assert!(matches!(bad_key.parse(1, 30_000_000), Err(TxError::InvalidKey(_))));
    }

    #[test]
    fn test_form_debug_hides_key() {
        let form = TxForm {
            private_key: format!("0x{}", "46".repeat(32)),
            ..Default::default()
        };
        assert!(!format!("{:?}", form).contains("4646"));
    }
}
