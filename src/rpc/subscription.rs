use serde::{Deserialize, Serialize};

use super::MESSAGE_TYPE_SUBSCRIPTION;

/// Payload of a provider `message` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMessage {
    /// Message kind, `eth_subscription` for subscription pushes.
    #[serde(rename = "type")]
    pub kind: String,

    pub data: serde_json::Value,
}

impl ProviderMessage {
    /// Extracts subscription data when this message is a subscription push.
    /// Returns `None` for other message kinds or when `data` does not carry
    /// a subscription id.
    pub fn subscription(&self) -> Option<SubscriptionData> {
        if self.kind != MESSAGE_TYPE_SUBSCRIPTION {
            return None;
        }
        serde_json::from_value(self.data.clone()).ok()
    }
}

/// Data of an `eth_subscription` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionData {
    /// The id returned by `eth_subscribe`.
    pub subscription: String,

    /// The pushed value, a block header for `newHeads`.
    #[serde(default)]
    pub result: serde_json::Value,
}
