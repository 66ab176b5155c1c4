//! Contract ABI JSON reading
//!
//! Extracts the callable functions of a contract ABI in file order, with the
//! signature string the encoder accepts and one input descriptor per argument.

use crate::error::EncodingError;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct AbiEntry {
    #[serde(rename = "type")]
    kind: Option<String>,
    name: Option<String>,
    #[serde(default)]
    inputs: Vec<AbiParam>,
    #[serde(default)]
    outputs: Vec<AbiParam>,
    #[serde(rename = "stateMutability")]
    state_mutability: Option<String>,
    #[serde(default)]
    payable: bool,
    #[serde(default)]
    constant: bool,
}

/// A named, typed function input or output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A callable function declared by a contract ABI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractFunction {
    pub name: String,
    pub signature: String,
    pub inputs: Vec<AbiParam>,
    pub outputs: Vec<AbiParam>,
    pub state_mutability: String,
    pub payable: bool,
    pub constant: bool,
}

/// Input field description for collecting one argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterField {
    pub name: String,
    pub kind: String,
    pub required: bool,
    pub placeholder: String,
}

impl ContractFunction {
    /// One field per input, named `param{i}` when the ABI leaves it blank
    pub fn parameter_fields(&self) -> Vec<ParameterField> {
        self.inputs
            .iter()
            .enumerate()
            .map(|(i, input)| {
                let name = if input.name.is_empty() {
                    format!("param{}", i)
                } else {
                    input.name.clone()
                };
                let placeholder = if input.name.is_empty() {
                    input.kind.clone()
                } else {
                    format!("{} ({})", input.kind, input.name)
                };
                ParameterField {
                    name,
                    kind: input.kind.clone(),
                    required: true,
                    placeholder,
                }
            })
            .collect()
    }

    /// True for functions that do not change contract state
    pub fn is_read_only(&self) -> bool {
        self.constant || matches!(self.state_mutability.as_str(), "view" | "pure")
    }
}

/// Parse a contract ABI JSON array into its function entries
pub fn parse_abi(json: &str) -> Result<Vec<ContractFunction>, EncodingError> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| EncodingError::BadAbi(format!("Invalid ABI format: {}", e)))?;
    if !value.is_array() {
        return Err(EncodingError::BadAbi("ABI must be an array".to_string()));
    }
    let entries: Vec<AbiEntry> = serde_json::from_value(value)
        .map_err(|e| EncodingError::BadAbi(format!("Invalid ABI format: {}", e)))?;

    let functions = entries
        .into_iter()
        .filter(|entry| entry.kind.as_deref() == Some("function"))
        .filter_map(|entry| {
            let name = entry.name?;
            let types: Vec<&str> = entry.inputs.iter().map(|p| p.kind.as_str()).collect();
            let signature = format!("{}({})", name, types.join(","));
            let fallback = if entry.payable { "payable" } else { "nonpayable" };
            let state_mutability = entry
                .state_mutability
                .unwrap_or_else(|| fallback.to_string());
            Some(ContractFunction {
                name,
                signature,
                inputs: entry.inputs,
                outputs: entry.outputs,
                state_mutability,
                payable: entry.payable,
                constant: entry.constant,
            })
        })
        .collect();

    Ok(functions)
}

/// Find a function by its exact signature string
pub fn find_function<'a>(
    functions: &'a [ContractFunction],
    signature: &str,
) -> Option<&'a ContractFunction> {
    functions.iter().find(|f| f.signature == signature)
}
