//! Function signature parsing and selector computation

use crate::error::EncodingError;

use ethers::abi::{short_signature, ParamType};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref SIGNATURE_RE: Regex =
        Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*\(([^()]*)\)\s*$").unwrap();
}

/// A parsed `name(type,...)` signature with elementary parameter types
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    name: String,
    params: Vec<ParamType>,
}

impl FunctionSignature {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn param_types(&self) -> &[ParamType] {
        &self.params
    }

    /// Signature with every type in canonical form, e.g. `uint` as `uint256`
    pub fn canonical(&self) -> String {
        let types: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    /// First four bytes of keccak256 over the canonical signature
    pub fn selector(&self) -> [u8; 4] {
        short_signature(&self.name, &self.params)
    }
}

impl FromStr for FunctionSignature {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = SIGNATURE_RE
            .captures(s)
            .ok_or_else(|| EncodingError::BadSignature(format!("{:?} is not name(type,...)", s)))?;

        let name = caps[1].to_string();
        let list = caps[2].trim();
        let params = if list.is_empty() {
            Vec::new()
        } else {
            list.split(',')
                .map(|t| parse_type(t.trim()))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self { name, params })
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// Parse one elementary ABI type name
fn parse_type(raw: &str) -> Result<ParamType, EncodingError> {
    if raw.is_empty() {
        return Err(EncodingError::BadSignature("empty parameter type".to_string()));
    }
    if raw.contains('[') || raw.contains(']') {
        return Err(EncodingError::UnsupportedType(raw.to_string()));
    }

    let kind = match raw {
        "address" => ParamType::Address,
        "bool" => ParamType::Bool,
        "string" => ParamType::String,
        "bytes" => ParamType::Bytes,
        "uint" => ParamType::Uint(256),
        "int" => ParamType::Int(256),
        _ => {
            if let Some(bits) = raw.strip_prefix("uint") {
                ParamType::Uint(parse_bits(raw, bits)?)
            } else if let Some(bits) = raw.strip_prefix("int") {
                ParamType::Int(parse_bits(raw, bits)?)
            } else if let Some(len) = raw.strip_prefix("bytes") {
                ParamType::FixedBytes(parse_width(raw, len, 1, 32)?)
            } else {
                return Err(EncodingError::UnsupportedType(raw.to_string()));
            }
        }
    };
    Ok(kind)
}

fn parse_bits(raw: &str, digits: &str) -> Result<usize, EncodingError> {
    let bits = parse_width(raw, digits, 8, 256)?;
    if bits % 8 != 0 {
        return Err(EncodingError::BadSignature(format!(
            "{} width must be a multiple of 8",
            raw
        )));
    }
    Ok(bits)
}

fn parse_width(raw: &str, digits: &str, min: usize, max: usize) -> Result<usize, EncodingError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EncodingError::UnsupportedType(raw.to_string()));
    }
    match digits.parse::<usize>() {
        Ok(n) if (min..=max).contains(&n) => Ok(n),
        _ => Err(EncodingError::BadSignature(format!(
            "{} width out of range {}..={}",
            raw, min, max
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_canonicalize() {
        let sig: FunctionSignature = " setValue ( uint ) ".parse().unwrap();
        assert_eq!(sig.name(), "setValue");
        assert_eq!(sig.param_types(), &[ParamType::Uint(256)]);
        assert_eq!(sig.canonical(), "setValue(uint256)");

        let sig: FunctionSignature = "transfer(address, uint256)".parse().unwrap();
        assert_eq!(sig.to_string(), "transfer(address,uint256)");

        let sig: FunctionSignature = "ping()".parse().unwrap();
        assert!(sig.param_types().is_empty());
    }

    #[test]
    fn test_known_selectors() {
        let cases = [
            ("transfer(address,uint256)", "a9059cbb"),
            ("approve(address,uint256)", "095ea7b3"),
            ("balanceOf(address)", "70a08231"),
            ("setValue(uint)", "55241077"),
        ];
        for (sig, selector) in cases {
            let sig: FunctionSignature = sig.parse().unwrap();
            assert_eq!(hex::encode(sig.selector()), selector, "{}", sig);
        }
    }

    #[test]
    fn test_bad_signatures() {
        for bad in ["transfer", "transfer(address", "1abc(uint256)", "a(b)(c)", "f(uint256,)"] {
            let err = bad.parse::<FunctionSignature>().unwrap_err();
            assert!(
                matches!(err, EncodingError::BadSignature(_) | EncodingError::UnsupportedType(_)),
                "{bad}: {err:?}"
            );
        }
        assert!(matches!(
            "f(uint7)".parse::<FunctionSignature>(),
            Err(EncodingError::BadSignature(_))
        ));
        assert!(matches!(
            "f(bytes33)".parse::<FunctionSignature>(),
            Err(EncodingError::BadSignature(_))
        ));
    }

    #[test]
    fn test_dynamic_arrays_unsupported() {
        assert_eq!(
            "f(uint256[])".parse::<FunctionSignature>().unwrap_err(),
            EncodingError::UnsupportedType("uint256[]".to_string())
        );
    }
}
