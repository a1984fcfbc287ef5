pub mod block;
pub mod chain;
pub mod config;
pub mod event;
pub mod executor;
pub mod focus;
pub mod injected;
pub mod keyboard;
pub mod modal;
pub mod observable;
pub mod plugin;
pub mod provider;
pub mod rpc;
pub mod storage;
pub mod wallet;
pub mod window;

pub use self::{
    block::{Block, BlockError, BlockFetcher, BlockOptions},
    chain::{parse_chain_id, to_hex_chain_id, ChainError},
    config::{ConfigError, ConnectorOptions},
    event::{EventHook, Subscription},
    executor::WasmSpawner,
    injected::{InjectedHandle, InjectedProvider},
    modal::{ButtonProps, Modal, ModalButton, ModalContent, ModalProps, ModalTitle},
    observable::{Observable, ReadOnly},
    plugin::{use_wallet, AppContext, WalletConnectorPlugin},
    provider::{Provider, ProviderExt, ProviderHandle},
    rpc::ProviderRpcError,
    wallet::{ConnectionState, Wallet, WalletError},
    window::WindowActivity,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Wallet connector plugin is not installed")]
    NotInstalled,

    #[error("JS error: {0}")]
    JsValue(String),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Rpc(#[from] ProviderRpcError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Block(#[from] BlockError),

    #[error(transparent)]
    Storage(#[from] gloo::storage::errors::StorageError),

    #[error(transparent)]
    Js(#[from] gloo_utils::errors::JsError),
}
