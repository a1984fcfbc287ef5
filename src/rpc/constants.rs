//! EIP-1193 method names and well-known values passed through to providers.

pub const METHOD_REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
pub const METHOD_ACCOUNTS: &str = "eth_accounts";
pub const METHOD_CHAIN_ID: &str = "eth_chainId";
pub const METHOD_WATCH_ASSET: &str = "wallet_watchAsset";
pub const METHOD_ADD_CHAIN: &str = "wallet_addEthereumChain";
pub const METHOD_SWITCH_CHAIN: &str = "wallet_switchEthereumChain";
pub const METHOD_SUBSCRIBE: &str = "eth_subscribe";
pub const METHOD_UNSUBSCRIBE: &str = "eth_unsubscribe";
pub const METHOD_GET_BLOCK_BY_NUMBER: &str = "eth_getBlockByNumber";

/// Subscription kind for new chain heads.
pub const SUBSCRIPTION_NEW_HEADS: &str = "newHeads";

/// `type` of a provider `message` event carrying subscription data.
pub const MESSAGE_TYPE_SUBSCRIPTION: &str = "eth_subscription";

pub const BLOCK_TAG_LATEST: &str = "latest";

/// Provider error codes defined by EIP-1193 and EIP-3085.
pub const CODE_USER_REJECTED: i64 = 4001;
pub const CODE_UNAUTHORIZED: i64 = 4100;
pub const CODE_UNSUPPORTED_METHOD: i64 = 4200;
pub const CODE_DISCONNECTED: i64 = 4900;
pub const CODE_CHAIN_DISCONNECTED: i64 = 4901;
pub const CODE_UNRECOGNIZED_CHAIN: i64 = 4902;
