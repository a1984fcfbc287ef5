use ethers::types::Address;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::chain::to_hex_chain_id;

/// Native currency of a chain added through `wallet_addEthereumChain`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    /// Ticker, 2 to 6 characters.
    pub symbol: String,
    pub decimals: u8,
}

/// EIP-3085 `wallet_addEthereumChain` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddEthereumChainParameter {
    /// Hex encoded chain id, e.g. `0x89`.
    pub chain_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_explorer_urls: Option<Vec<Url>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_urls: Option<Vec<Url>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_currency: Option<NativeCurrency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_urls: Option<Vec<Url>>,
}

impl AddEthereumChainParameter {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id: to_hex_chain_id(chain_id),
            block_explorer_urls: None,
            chain_name: None,
            icon_urls: None,
            native_currency: None,
            rpc_urls: None,
        }
    }
}

/// EIP-3326 `wallet_switchEthereumChain` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchEthereumChainParameter {
    /// Hex encoded chain id.
    pub chain_id: String,
}

impl SwitchEthereumChainParameter {
    pub fn new(chain_id: u64) -> Self {
        Self { chain_id: to_hex_chain_id(chain_id) }
    }
}

/// Token description for EIP-747 `wallet_watchAsset`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchAssetOptions {
    /// Token contract address.
    pub address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    /// URL of the token logo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// EIP-747 `wallet_watchAsset` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchAssetParameters {
    /// Asset interface, e.g. `ERC20`.
    #[serde(rename = "type")]
    pub asset_type: String,
    pub options: WatchAssetOptions,
}

impl WatchAssetParameters {
    pub fn erc20(address: Address, symbol: &str, decimals: u8) -> Self {
        Self {
            asset_type: "ERC20".to_string(),
            options: WatchAssetOptions {
                address,
                symbol: Some(symbol.to_string()),
                decimals: Some(decimals),
                image: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn switch_chain_uses_hex_id() {
        let value = serde_json::to_value(SwitchEthereumChainParameter::new(137)).unwrap();
        assert_eq!(value, json!({"chainId": "0x89"}));
    }

    #[test]
    fn add_chain_skips_unset_fields() {
        let mut param = AddEthereumChainParameter::new(10);
        param.chain_name = Some("Optimism".to_string());
        param.rpc_urls = Some(vec![Url::parse("https://mainnet.optimism.io/").unwrap()]);
        let value = serde_json::to_value(param).unwrap();
        assert_eq!(
            value,
            json!({
                "chainId": "0xa",
                "chainName": "Optimism",
                "rpcUrls": ["https://mainnet.optimism.io/"]
            })
        );
    }

    #[test]
    fn watch_asset_renames_type() {
        let param = WatchAssetParameters::erc20(Address::zero(), "TKN", 18);
        let value = serde_json::to_value(param).unwrap();
        assert_eq!(value["type"], "ERC20");
        assert_eq!(value["options"]["symbol"], "TKN");
        assert_eq!(value["options"]["decimals"], 18);
        assert!(value["options"].get("image").is_none());
    }
}
