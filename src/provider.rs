use std::{fmt, rc::Rc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    rpc::{
        AddEthereumChainParameter, ProviderMessage, ProviderRpcError, RequestArguments,
        SwitchEthereumChainParameter, WatchAssetParameters, METHOD_ADD_CHAIN,
        METHOD_SWITCH_CHAIN, METHOD_WATCH_ASSET,
    },
    wallet::WalletError,
};

pub type BoxError = Box<dyn std::error::Error>;

/// Events a provider emits, named as in EIP-1193.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderEventKind {
    Connect,
    Disconnect,
    ChainChanged,
    AccountsChanged,
    Message,
}

impl ProviderEventKind {
    pub const ALL: [Self; 5] =
        [Self::Connect, Self::Disconnect, Self::ChainChanged, Self::AccountsChanged, Self::Message];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::ChainChanged => "chainChanged",
            Self::AccountsChanged => "accountsChanged",
            Self::Message => "message",
        }
    }
}

impl fmt::Display for ProviderEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of the `connect` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectInfo {
    pub chain_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    Connect(ConnectInfo),
    /// `None` when the provider disconnected without a reason.
    Disconnect(Option<ProviderRpcError>),
    /// Raw chain id, usually hex encoded.
    ChainChanged(String),
    AccountsChanged(Vec<String>),
    Message(ProviderMessage),
}

impl ProviderEvent {
    pub fn kind(&self) -> ProviderEventKind {
        match self {
            Self::Connect(_) => ProviderEventKind::Connect,
            Self::Disconnect(_) => ProviderEventKind::Disconnect,
            Self::ChainChanged(_) => ProviderEventKind::ChainChanged,
            Self::AccountsChanged(_) => ProviderEventKind::AccountsChanged,
            Self::Message(_) => ProviderEventKind::Message,
        }
    }
}

pub type EventHandler = Rc<dyn Fn(&ProviderEvent)>;

/// A live EIP-1193 provider.
#[async_trait(?Send)]
pub trait Provider {
    async fn request(&self, args: RequestArguments) -> Result<serde_json::Value, ProviderRpcError>;

    /// Registers `handler` for events of `kind`.
    fn on(&self, kind: ProviderEventKind, handler: EventHandler);

    fn remove_all_listeners(&self);

    /// Currently selected chain, as reported by the provider.
    fn chain_id(&self) -> String;

    /// Currently selected account, empty if none.
    fn selected_address(&self) -> String;

    /// Releases the provider's own session. Providers without one keep the default.
    async fn disconnect(&self) -> Result<(), ProviderRpcError> {
        Ok(())
    }
}

/// Something that can produce a live [`Provider`], e.g. an injected browser
/// wallet or a connector for a hosted wallet.
#[async_trait(?Send)]
pub trait ProviderHandle {
    /// Stable identifier, used to remember the last provider.
    fn id(&self) -> &str;

    async fn connect(&self) -> Result<Rc<dyn Provider>, BoxError>;
}

/// Pass-through helpers for the wallet methods of EIP-1193, 3085, 3326 and 747.
#[async_trait(?Send)]
pub trait ProviderExt {
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError>;

    /// First account returned by `eth_requestAccounts`.
    async fn get_address(&self) -> Result<String, WalletError>;

    async fn watch_asset(&self, params: WatchAssetParameters) -> Result<(), ProviderRpcError>;

    async fn add_ethereum_chain(
        &self,
        params: AddEthereumChainParameter,
    ) -> Result<(), ProviderRpcError>;

    async fn switch_ethereum_chain(
        &self,
        params: SwitchEthereumChainParameter,
    ) -> Result<(), ProviderRpcError>;
}

#[async_trait(?Send)]
impl<P: Provider + ?Sized> ProviderExt for P {
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        let value = self.request(RequestArguments::request_accounts()).await?;
        serde_json::from_value(value).map_err(|_| WalletError::BadResponse)
    }

    async fn get_address(&self) -> Result<String, WalletError> {
        self.request_accounts()
            .await?
            .into_iter()
            .next()
            .ok_or(WalletError::EmptyAccounts)
    }

    async fn watch_asset(&self, params: WatchAssetParameters) -> Result<(), ProviderRpcError> {
        let params = serde_json::to_value(params).map_err(serialization_error)?;
        self.request(RequestArguments::new(METHOD_WATCH_ASSET, Some(params))).await?;
        Ok(())
    }

    async fn add_ethereum_chain(
        &self,
        params: AddEthereumChainParameter,
    ) -> Result<(), ProviderRpcError> {
        let params = serde_json::to_value(vec![params]).map_err(serialization_error)?;
        null_or_error(self.request(RequestArguments::new(METHOD_ADD_CHAIN, Some(params))).await?)
    }

    async fn switch_ethereum_chain(
        &self,
        params: SwitchEthereumChainParameter,
    ) -> Result<(), ProviderRpcError> {
        let params = serde_json::to_value(vec![params]).map_err(serialization_error)?;
        null_or_error(self.request(RequestArguments::new(METHOD_SWITCH_CHAIN, Some(params))).await?)
    }
}

fn serialization_error(err: serde_json::Error) -> ProviderRpcError {
    ProviderRpcError::new(-32602, err.to_string())
}

// Wallets answer 3085/3326 requests with `null`, or with an error object
// instead of rejecting.
fn null_or_error(value: serde_json::Value) -> Result<(), ProviderRpcError> {
    if value.is_null() {
        return Ok(());
    }
    match serde_json::from_value::<ProviderRpcError>(value) {
        Ok(err) => Err(err),
        Err(_) => Ok(()),
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::{
        cell::{Cell, RefCell},
        collections::VecDeque,
    };

    use super::*;

    /// In-memory provider that records requests and lets tests emit events.
    #[derive(Default)]
    pub struct MockProvider {
        pub chain: RefCell<String>,
        pub address: RefCell<String>,
        pub listeners: RefCell<Vec<(ProviderEventKind, EventHandler)>>,
        pub requests: RefCell<Vec<RequestArguments>>,
        pub responses: RefCell<VecDeque<Result<serde_json::Value, ProviderRpcError>>>,
        pub disconnects: Cell<usize>,
    }

    impl MockProvider {
        pub fn new(chain: &str, address: &str) -> Rc<Self> {
            Rc::new(Self {
                chain: RefCell::new(chain.to_string()),
                address: RefCell::new(address.to_string()),
                ..Default::default()
            })
        }

        pub fn respond(&self, response: Result<serde_json::Value, ProviderRpcError>) {
            self.responses.borrow_mut().push_back(response);
        }

        pub fn emit(&self, event: ProviderEvent) {
            let handlers: Vec<EventHandler> = self
                .listeners
                .borrow()
                .iter()
                .filter(|(kind, _)| *kind == event.kind())
                .map(|(_, handler)| handler.clone())
                .collect();
            for handler in handlers {
                handler(&event);
            }
        }

        pub fn listener_count(&self) -> usize {
            self.listeners.borrow().len()
        }
    }

    #[async_trait(?Send)]
    impl Provider for MockProvider {
        async fn request(
            &self,
            args: RequestArguments,
        ) -> Result<serde_json::Value, ProviderRpcError> {
            self.requests.borrow_mut().push(args);
            self.responses.borrow_mut().pop_front().unwrap_or(Ok(serde_json::Value::Null))
        }

        fn on(&self, kind: ProviderEventKind, handler: EventHandler) {
            self.listeners.borrow_mut().push((kind, handler));
        }

        fn remove_all_listeners(&self) {
            self.listeners.borrow_mut().clear();
        }

        fn chain_id(&self) -> String {
            self.chain.borrow().clone()
        }

        fn selected_address(&self) -> String {
            self.address.borrow().clone()
        }

        async fn disconnect(&self) -> Result<(), ProviderRpcError> {
            self.disconnects.set(self.disconnects.get() + 1);
            Ok(())
        }
    }

    /// Handle that hands out a prepared provider, or fails with a message.
    pub struct MockHandle {
        pub id: String,
        pub provider: Option<Rc<MockProvider>>,
        pub failure: Option<String>,
        pub connects: Cell<usize>,
    }

    impl MockHandle {
        pub fn ok(id: &str, provider: Rc<MockProvider>) -> Self {
            Self {
                id: id.to_string(),
                provider: Some(provider),
                failure: None,
                connects: Cell::new(0),
            }
        }

        pub fn failing(id: &str, message: &str) -> Self {
            Self {
                id: id.to_string(),
                provider: None,
                failure: Some(message.to_string()),
                connects: Cell::new(0),
            }
        }
    }

    #[async_trait(?Send)]
    impl ProviderHandle for MockHandle {
        fn id(&self) -> &str {
            &self.id
        }

        async fn connect(&self) -> Result<Rc<dyn Provider>, BoxError> {
            self.connects.set(self.connects.get() + 1);
            match (&self.provider, &self.failure) {
                (_, Some(message)) => Err(message.clone().into()),
                (Some(provider), None) => Ok(provider.clone() as Rc<dyn Provider>),
                (None, None) => Err("no provider".into()),
            }
        }
    }
}
