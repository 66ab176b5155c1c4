//! Comma-separated parameter parsing and per-type coercion into ABI tokens

use crate::error::EncodingError;

use ethers::abi::{ParamType, Token};
use ethers::types::{Address, U256};

/// Split a comma-separated parameter list, trimming pieces and dropping empty ones
pub fn split_params(csv: &str) -> Vec<&str> {
    csv.split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect()
}

/// Coerce every parameter to the token its declared type expects
pub fn tokenize(types: &[ParamType], csv: &str) -> Result<Vec<Token>, EncodingError> {
    let values = split_params(csv);
    if values.len() != types.len() {
        return Err(EncodingError::ParamCountMismatch {
            expected: types.len(),
            got: values.len(),
        });
    }

    types
        .iter()
        .zip(values)
        .enumerate()
        .map(|(index, (kind, value))| {
            coerce(kind, value).map_err(|reason| EncodingError::InvalidParam {
                index,
                value: value.to_string(),
                kind: kind.to_string(),
                reason,
            })
        })
        .collect()
}

fn coerce(kind: &ParamType, value: &str) -> Result<Token, String> {
    match kind {
        ParamType::Uint(bits) => {
            let n = parse_unsigned(value)?;
            if n.bits() > *bits {
                return Err(format!("value does not fit in {} bits", bits));
            }
            Ok(Token::Uint(n))
        }
        ParamType::Int(bits) => parse_signed(value, *bits).map(Token::Int),
        ParamType::Address => parse_address(value).map(Token::Address),
        ParamType::Bool => match value.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Token::Bool(true)),
            "false" | "0" => Ok(Token::Bool(false)),
            _ => Err("expected true, false, 1 or 0".to_string()),
        },
        ParamType::FixedBytes(len) => {
            let mut bytes = parse_hex_bytes(value)?;
            if bytes.len() > *len {
                return Err(format!("{} bytes given, at most {} allowed", bytes.len(), len));
            }
            bytes.resize(*len, 0);
            Ok(Token::FixedBytes(bytes))
        }
        ParamType::Bytes => parse_hex_bytes(value).map(Token::Bytes),
        ParamType::String => Ok(Token::String(value.to_string())),
        other => Err(format!("type {} is not supported", other)),
    }
}

fn parse_unsigned(value: &str) -> Result<U256, String> {
    if let Some(digits) = value.strip_prefix("0x") {
        if digits.is_empty() {
            return Err("empty hex integer".to_string());
        }
        U256::from_str_radix(digits, 16).map_err(|_| "invalid hex integer".to_string())
    } else if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        U256::from_dec_str(value).map_err(|_| "integer does not fit in 256 bits".to_string())
    } else {
        Err("expected a base-10 or 0x-prefixed integer".to_string())
    }
}

/// Parse into the two's complement word of a signed `bits`-wide integer
fn parse_signed(value: &str, bits: usize) -> Result<U256, String> {
    let (negative, magnitude) = match value.strip_prefix('-') {
        Some(rest) => (true, parse_unsigned(rest)?),
        None => (false, parse_unsigned(value)?),
    };

    let bound = U256::one() << (bits - 1);
    let in_range = if negative {
        magnitude <= bound
    } else {
        magnitude < bound
    };
    if !in_range {
        return Err(format!("value does not fit in int{}", bits));
    }

    if negative && !magnitude.is_zero() {
        Ok(U256::MAX - magnitude + U256::one())
    } else {
        Ok(magnitude)
    }
}

fn parse_address(value: &str) -> Result<Address, String> {
    match value.strip_prefix("0x") {
        Some(digits) if digits.len() == 40 => hex::decode(digits)
            .map(|bytes| Address::from_slice(&bytes))
            .map_err(|_| "address contains invalid characters".to_string()),
        _ => Err("expected a 20-byte 0x hex address".to_string()),
    }
}

fn parse_hex_bytes(value: &str) -> Result<Vec<u8>, String> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| "expected 0x-prefixed hex bytes".to_string())?;
    hex::decode(digits).map_err(|e| format!("invalid hex bytes: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_drops_empty_trailing_values() {
        assert_eq!(split_params("100,"), vec!["100"]);
        assert_eq!(split_params("100"), vec!["100"]);
        assert_eq!(split_params(" 200 , 300 "), vec!["200", "300"]);
        assert!(split_params("").is_empty());
        assert!(split_params(" , ").is_empty());
    }

    #[test]
    fn test_count_mismatch() {
        let types = [ParamType::Address, ParamType::Uint(256)];
        assert_eq!(
            tokenize(&types, "100").unwrap_err(),
            EncodingError::ParamCountMismatch {
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn test_unsigned_forms_and_widths() {
        let types = [ParamType::Uint(8)];
        assert_eq!(tokenize(&types, "255").unwrap(), vec![Token::Uint(U256::from(255))]);
        assert_eq!(tokenize(&types, "0xff").unwrap(), vec![Token::Uint(U256::from(255))]);
        assert!(tokenize(&types, "256").is_err());
        assert!(tokenize(&types, "-1").is_err());
        assert!(tokenize(&types, "12abc").is_err());
    }

    #[test]
    fn test_signed_twos_complement() {
        let types = [ParamType::Int(8)];
        assert_eq!(tokenize(&types, "-1").unwrap(), vec![Token::Int(U256::MAX)]);
        assert_eq!(
            tokenize(&types, "-128").unwrap(),
            vec![Token::Int(U256::MAX - U256::from(127))]
        );
        assert_eq!(tokenize(&types, "127").unwrap(), vec![Token::Int(U256::from(127))]);
        assert!(tokenize(&types, "128").is_err());
        assert!(tokenize(&types, "-129").is_err());
        assert_eq!(tokenize(&types, "-0").unwrap(), vec![Token::Int(U256::zero())]);
    }

    #[test]
    fn test_address_must_be_twenty_bytes() {
        let types = [ParamType::Address];
        let err = tokenize(&types, "0xabc").unwrap_err();
        match err {
            EncodingError::InvalidParam { index, kind, .. } => {
                assert_eq!(index, 0);
                assert_eq!(kind, "address");
            }
            other => panic!("unexpected {other:?}"),
        }
        let ok = tokenize(&types, &format!("0x{}", "11".repeat(20))).unwrap();
        assert_eq!(ok, vec![Token::Address(Address::repeat_byte(0x11))]);
    }

    #[test]
    fn test_bool_and_bytes() {
        let types = [ParamType::Bool, ParamType::FixedBytes(4), ParamType::Bytes];
        let tokens = tokenize(&types, "TRUE,0xdead,0x0102").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Bool(true),
                Token::FixedBytes(vec![0xde, 0xad, 0, 0]),
                Token::Bytes(vec![1, 2]),
            ]
        );
        assert!(tokenize(&[ParamType::Bool], "yes").is_err());
        assert!(tokenize(&[ParamType::FixedBytes(1)], "0xdead").is_err());
    }
}
