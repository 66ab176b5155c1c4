//! Field validation for addresses, keys and hex quantities
//!
//! Quantities at the string boundary are `0x`-prefixed hex, following the
//! JSON-RPC convention, so values beyond `u64` survive unchanged.

use crate::error::{TxError, TxResult};

use ethers::types::{Address, U256};
use ethers::utils::to_checksum;

/// Upper bound accepted for a gas limit, roughly one block
pub const MAX_GAS_LIMIT: u64 = 30_000_000;

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Validate a `0x` + 40 hex address and return it parsed.
///
/// All-lowercase and all-uppercase forms are accepted as is. Mixed case is
/// treated as an EIP-55 checksum and must match.
pub fn validate_address(field: &'static str, input: &str) -> TxResult<Address> {
    let input = input.trim();
    if input.is_empty() {
        return Err(TxError::validation(field, "Address is required"));
    }
    let Some(digits) = input.strip_prefix("0x") else {
        return Err(TxError::validation(field, "Address must start with 0x"));
    };
    if input.len() != 42 {
        return Err(TxError::validation(
            field,
            "Address must be 42 characters (0x + 40 hex chars)",
        ));
    }
    if !is_hex(digits) {
        return Err(TxError::validation(
            field,
            "Address contains invalid characters",
        ));
    }

    let bytes = hex::decode(digits).map_err(|e| TxError::validation(field, e.to_string()))?;
    let address = Address::from_slice(&bytes);

    let has_lower = digits.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = digits.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper && to_checksum(&address, None) != input {
        return Err(TxError::validation(field, "Address checksum mismatch"));
    }

    Ok(address)
}

/// Check the textual shape of a private key, returning the reason on failure
pub fn check_private_key_format(input: &str) -> Result<(), &'static str> {
    if input.is_empty() {
        return Err("Private key is required");
    }
    if !input.starts_with("0x") {
        return Err("Private key must start with 0x");
    }
    if input.len() != 66 {
        return Err("Private key must be 66 characters (0x + 64 hex chars)");
    }
    if !is_hex(&input[2..]) {
        return Err("Private key contains invalid characters");
    }
    Ok(())
}

/// Parse a `0x`-prefixed hex quantity
pub fn parse_hex_quantity(field: &'static str, input: &str) -> TxResult<U256> {
    let input = input.trim();
    if input.is_empty() {
        return Err(TxError::validation(field, format!("{} is required", field)));
    }
    let Some(digits) = input.strip_prefix("0x") else {
        return Err(TxError::validation(
            field,
            format!("{} must start with 0x", field),
        ));
    };
    if !is_hex(digits) {
        return Err(TxError::validation(
            field,
            format!("{} contains invalid hex characters", field),
        ));
    }
    U256::from_str_radix(digits, 16)
        .map_err(|_| TxError::validation(field, format!("{} does not fit in 256 bits", field)))
}

/// Parse a nonce given either as `0x` hex or as a plain decimal integer
pub fn parse_nonce(input: &str) -> TxResult<u64> {
    let input = input.trim();
    let parsed = if input.starts_with("0x") {
        let value = parse_hex_quantity("nonce", input)?;
        if value > U256::from(u64::MAX) {
            return Err(TxError::validation("nonce", "nonce does not fit in 64 bits"));
        }
        value.as_u64()
    } else {
        input
            .parse::<u64>()
            .map_err(|e| TxError::validation("nonce", format!("{:?}: {}", input, e)))?
    };
    Ok(parsed)
}

/// Validate a gas limit against the accepted range `1..=max`
pub fn validate_gas_limit(gas_limit: U256, max: u64) -> TxResult<U256> {
    if gas_limit.is_zero() {
        return Err(TxError::validation(
            "gas limit",
            "Gas limit must be greater than 0",
        ));
    }
    if gas_limit > U256::from(max) {
        return Err(TxError::validation(
            "gas limit",
            format!("Gas limit seems too high (max {})", max),
        ));
    }
    Ok(gas_limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_shapes() {
        let lower = "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23";
        assert!(validate_address("recipient", lower).is_ok());

        let checksummed = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";
        assert_eq!(
            validate_address("recipient", checksummed).unwrap(),
            validate_address("recipient", lower).unwrap()
        );

        for bad in [
            "",
            "2c7536e3605d9c16a7a3d7b1898e529396a65c23",
            "0x2c7536e3605d9c16a7a3d7b1898e529396a65c",
            "0x2c7536e3605d9c16a7a3d7b1898e529396a65cZZ",
        ] {
            assert!(validate_address("recipient", bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_address_bad_checksum() {
        let wrong_case = "0x2C7536E3605D9C16a7a3D7b1898e529396a65c23";
        let err = validate_address("recipient", wrong_case).unwrap_err();
        assert!(err.to_string().contains("checksum"));
    }

    #[test]
    fn test_private_key_reasons() {
        assert_eq!(check_private_key_format(""), Err("Private key is required"));
        assert_eq!(
            check_private_key_format(&"11".repeat(33)),
            Err("Private key must start with 0x")
        );
        assert_eq!(
            check_private_key_format("0x1234"),
            Err("Private key must be 66 characters (0x + 64 hex chars)")
        );
        let non_hex = format!("0x{}", "g".repeat(64));
        assert_eq!(
            check_private_key_format(&non_hex),
            Err("Private key contains invalid characters")
        );
        assert!(check_private_key_format(&format!("0x{}", "ab".repeat(32))).is_ok());
    }

    #[test]
    fn test_hex_quantities() {
        assert_eq!(parse_hex_quantity("gas limit", "0x5208").unwrap(), U256::from(21_000));
        assert_eq!(parse_hex_quantity("value", "0x0").unwrap(), U256::zero());
        assert!(parse_hex_quantity("value", "0x").is_err());
        assert!(parse_hex_quantity("value", "21000").is_err());
        assert!(parse_hex_quantity("value", "0xzz").is_err());
        assert!(parse_hex_quantity("value", &format!("0x1{}", "0".repeat(64))).is_err());
    }

    #[test]
    fn test_nonce_forms() {
        assert_eq!(parse_nonce("0x1").unwrap(), 1);
        assert_eq!(parse_nonce("42").unwrap(), 42);
        assert_eq!(parse_nonce("0").unwrap(), 0);
        assert!(parse_nonce("-1").is_err());
        assert!(parse_nonce("0x10000000000000000").is_err());
    }

    #[test]
    fn test_gas_limit_range() {
        assert!(validate_gas_limit(U256::zero(), MAX_GAS_LIMIT).is_err());
        assert!(validate_gas_limit(U256::from(21_000), MAX_GAS_LIMIT).is_ok());
        assert!(validate_gas_limit(U256::from(MAX_GAS_LIMIT + 1), MAX_GAS_LIMIT).is_err());
    }
}
