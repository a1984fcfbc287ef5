use ethers::providers::JsonRpcError;
use serde::{Deserialize, Serialize};

use super::{
    CODE_CHAIN_DISCONNECTED, CODE_DISCONNECTED, CODE_UNAUTHORIZED, CODE_UNRECOGNIZED_CHAIN,
    CODE_UNSUPPORTED_METHOD, CODE_USER_REJECTED,
};

/// Error reported by a provider, shaped after EIP-1193 `ProviderRpcError`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("Provider error {code}: {message}")]
pub struct ProviderRpcError {
    /// Error code.
    pub code: i64,

    /// Error message.
    pub message: String,

    /// Error data, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ProviderRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), data: None }
    }

    pub fn as_error_response(&self) -> JsonRpcError {
        JsonRpcError { code: self.code, message: self.message.clone(), data: self.data.clone() }
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == CODE_USER_REJECTED
    }

    /// True for the 4900/4901 family, meaning the provider lost its chain link.
    pub fn is_disconnect(&self) -> bool {
        self.code == CODE_DISCONNECTED || self.code == CODE_CHAIN_DISCONNECTED
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == CODE_UNRECOGNIZED_CHAIN
    }

    /// Human readable name of the standard code, if it is one.
    pub fn code_name(&self) -> Option<&'static str> {
        match self.code {
            CODE_USER_REJECTED => Some("User Rejected Request"),
            CODE_UNAUTHORIZED => Some("Unauthorized"),
            CODE_UNSUPPORTED_METHOD => Some("Unsupported Method"),
            CODE_DISCONNECTED => Some("Disconnected"),
            CODE_CHAIN_DISCONNECTED => Some("Chain Disconnected"),
            CODE_UNRECOGNIZED_CHAIN => Some("Unrecognized Chain"),
            _ => None,
        }
    }
}

impl From<JsonRpcError> for ProviderRpcError {
    fn from(value: JsonRpcError) -> Self {
        Self { code: value.code, message: value.message, data: value.data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_provider_payload() {
        let err: ProviderRpcError =
            serde_json::from_value(json!({"code": 4900, "message": "gone"})).unwrap();
        assert!(err.is_disconnect());
        assert_eq!(err.data, None);
        assert_eq!(err.code_name(), Some("Disconnected"));
    }

    #[test]
    fn converts_to_json_rpc_error() {
        let err = ProviderRpcError::new(4001, "nope");
        let converted = err.as_error_response();
        assert_eq!(converted.code, 4001);
        assert_eq!(ProviderRpcError::from(converted), err);
        assert!(err.is_user_rejection());
    }
}
