use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{
    BLOCK_TAG_LATEST, METHOD_GET_BLOCK_BY_NUMBER, METHOD_REQUEST_ACCOUNTS, METHOD_SUBSCRIBE,
    METHOD_UNSUBSCRIBE, SUBSCRIPTION_NEW_HEADS,
};

/// Arguments of an EIP-1193 `request` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestArguments {
    /// The RPC method name.
    pub method: String,

    /// Positional or named parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl RequestArguments {
    pub fn new(method: &str, params: Option<serde_json::Value>) -> Self {
        Self { method: method.to_string(), params }
    }

    pub fn request_accounts() -> Self {
        Self::new(METHOD_REQUEST_ACCOUNTS, None)
    }

    /// `eth_getBlockByNumber("latest", false)`.
    pub fn latest_block() -> Self {
        Self::new(METHOD_GET_BLOCK_BY_NUMBER, Some(json!([BLOCK_TAG_LATEST, false])))
    }

    pub fn subscribe_new_heads() -> Self {
        Self::new(METHOD_SUBSCRIBE, Some(json!([SUBSCRIPTION_NEW_HEADS])))
    }

    pub fn unsubscribe(subscription_id: &str) -> Self {
        Self::new(METHOD_UNSUBSCRIBE, Some(json!([subscription_id])))
    }
}
