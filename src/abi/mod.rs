//! ABI call data encoding
//!
//! Call data is the 4-byte function selector followed by the standard ABI
//! encoding of the arguments. Elementary types only: integers, addresses,
//! booleans, fixed bytes, plus dynamic `bytes` and `string`.

pub mod contract;
mod params;
mod signature;

pub use contract::{find_function, parse_abi, AbiParam, ContractFunction, ParameterField};
pub use params::split_params;
pub use signature::FunctionSignature;

use crate::error::EncodingError;

use ethers::abi::{self, Token};
use ethers::types::Bytes;

/// Encode a call of `signature` with comma-separated `parameters`
pub fn encode_call(signature: &str, parameters: &str) -> Result<Bytes, EncodingError> {
    let signature: FunctionSignature = signature.parse()?;
    encode_with(&signature, parameters)
}

/// Same as [`encode_call`], rendered as a `0x`-prefixed hex string
pub fn encode_call_hex(signature: &str, parameters: &str) -> Result<String, EncodingError> {
    encode_call(signature, parameters).map(|data| format!("0x{}", hex::encode(&data)))
}

/// Encode a call for an already parsed signature
pub fn encode_with(signature: &FunctionSignature, parameters: &str) -> Result<Bytes, EncodingError> {
    let tokens = params::tokenize(signature.param_types(), parameters)?;

    let mut data = signature.selector().to_vec();
    data.extend_from_slice(&abi::encode(&tokens));
    Ok(data.into())
}

/// Decode call data produced for `signature` back into argument tokens
pub fn decode_call(signature: &str, data: &[u8]) -> Result<Vec<Token>, EncodingError> {
    let signature: FunctionSignature = signature.parse()?;
    if data.len() < 4 {
        return Err(EncodingError::Decode(format!(
            "{} bytes is too short for a selector",
            data.len()
        )));
    }

    let selector = signature.selector();
    if data[..4] != selector {
        return Err(EncodingError::SelectorMismatch {
            expected: hex::encode(selector),
            got: hex::encode(&data[..4]),
        });
    }

    abi::decode(signature.param_types(), &data[4..])
        .map_err(|e| EncodingError::Decode(e.to_string()))
}
