use std::num::ParseIntError;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Empty chain id")]
    Empty,

    #[error("Chain id {0:?} is not a number")]
    BadFormat(String),

    #[error(transparent)]
    ParseIntError(#[from] ParseIntError),
}

/// Chain identifier as it arrives from a provider or from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawChainId<'a> {
    Number(u64),
    Text(&'a str),
}

impl From<u64> for RawChainId<'_> {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

impl<'a> From<&'a str> for RawChainId<'a> {
    fn from(value: &'a str) -> Self {
        Self::Text(value)
    }
}

impl<'a> From<&'a String> for RawChainId<'a> {
    fn from(value: &'a String) -> Self {
        Self::Text(value.as_str())
    }
}

/// Normalizes a chain id to an integer.
///
/// Numbers pass through unchanged. Strings starting with `0x` or `0X` are read
/// as base-16, anything else as base-10. Malformed input is reported as a
/// [`ChainError`] and never coerced to a default.
pub fn parse_chain_id<'a>(raw: impl Into<RawChainId<'a>>) -> Result<u64, ChainError> {
    match raw.into() {
        RawChainId::Number(id) => Ok(id),
        RawChainId::Text(text) => {
            if text.is_empty() {
                return Err(ChainError::Empty);
            }
            match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                Some(digits) => {
                    if digits.is_empty() || digits.starts_with(['+', '-']) {
                        return Err(ChainError::BadFormat(text.to_string()));
                    }
                    Ok(u64::from_str_radix(digits, 16)?)
                }
                None => {
                    if text.starts_with('+') {
                        return Err(ChainError::BadFormat(text.to_string()));
                    }
                    Ok(text.parse::<u64>()?)
                }
            }
        }
    }
}

/// Formats a chain id the way `wallet_switchEthereumChain` and
/// `wallet_addEthereumChain` expect it.
pub fn to_hex_chain_id(chain_id: u64) -> String {
    format!("{chain_id:#x}")
}

/// Reads a chain id out of a JSON payload, accepting both numbers and strings.
pub(crate) fn parse_chain_value(value: &serde_json::Value) -> Result<u64, ChainError> {
    match value {
        serde_json::Value::Number(number) => number
            .as_u64()
            .ok_or_else(|| ChainError::BadFormat(number.to_string())),
        serde_json::Value::String(text) => parse_chain_id(text),
        serde_json::Value::Null => Err(ChainError::Empty),
        other => Err(ChainError::BadFormat(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_hex_decimal_and_numbers() {
        assert_eq!(parse_chain_id("0x1"), Ok(1));
        assert_eq!(parse_chain_id("0X89"), Ok(137));
        assert_eq!(parse_chain_id("10"), Ok(10));
        assert_eq!(parse_chain_id(5u64), Ok(5));
    }

    #[test]
    fn rejects_malformed_ids() {
        assert_eq!(parse_chain_id(""), Err(ChainError::Empty));
        assert!(matches!(parse_chain_id("0x"), Err(ChainError::BadFormat(_))));
        assert!(matches!(parse_chain_id("0x-1"), Err(ChainError::BadFormat(_))));
        assert!(matches!(parse_chain_id("mainnet"), Err(ChainError::ParseIntError(_))));
        assert!(matches!(parse_chain_id("0xzz"), Err(ChainError::ParseIntError(_))));
    }

    #[test]
    fn hex_round_trip_is_stable() {
        for raw in ["1", "0x1", "137", "0x89", "0xaa36a7", "11155111", "0"] {
            let parsed = parse_chain_id(raw).unwrap();
            assert_eq!(parse_chain_id(to_hex_chain_id(parsed).as_str()), Ok(parsed), "{raw}");
        }
    }

    #[test]
    fn reads_json_payloads() {
        assert_eq!(parse_chain_value(&json!("0x5")), Ok(5));
        assert_eq!(parse_chain_value(&json!(56)), Ok(56));
        assert_eq!(parse_chain_value(&json!(null)), Err(ChainError::Empty));
        assert!(parse_chain_value(&json!({})).is_err());
    }
}
