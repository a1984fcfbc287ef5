use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
    str::FromStr,
};

use ethers::{types::Address, utils::to_checksum};
use log::{debug, error, warn};

use crate::{
    chain::{parse_chain_id, ChainError},
    config::ConnectorOptions,
    event::{EventHook, Subscription},
    observable::{Observable, ReadOnly},
    provider::{Provider, ProviderEvent, ProviderEventKind, ProviderHandle},
    rpc::{ProviderRpcError, RequestArguments},
    storage::ProviderCache,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("Failed to connect: {0}")]
    Connect(String),

    #[error("A connection attempt is already in progress")]
    ConnectInProgress,

    #[error("Connection attempt was superseded by a disconnect")]
    Superseded,

    #[error("No provider is connected")]
    NotConnected,

    #[error("Method `eth_requestAccounts` returned empty list of accounts.")]
    EmptyAccounts,

    #[error("Bad response")]
    BadResponse,

    #[error("Unknown provider {0}")]
    UnknownProvider(String),

    #[error(transparent)]
    Rpc(#[from] ProviderRpcError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

struct State {
    address: Observable<String>,
    accounts: Observable<Vec<String>>,
    chain_id: Observable<Option<u64>>,
    loading: Observable<bool>,
    error: Observable<Option<ProviderRpcError>>,
    connection: Observable<ConnectionState>,
    is_connected: Observable<bool>,
    is_wrong_network: Observable<bool>,
}

impl State {
    fn new() -> Self {
        Self {
            address: Observable::new(String::new()),
            accounts: Observable::new(Vec::new()),
            chain_id: Observable::new(None),
            loading: Observable::new(false),
            error: Observable::new(None),
            connection: Observable::new(ConnectionState::Disconnected),
            is_connected: Observable::new(false),
            is_wrong_network: Observable::new(false),
        }
    }
}

struct Inner {
    options: ConnectorOptions,
    state: State,
    provider: RefCell<Option<Rc<dyn Provider>>>,
    // Set while the attached provider reports it lost its chain connection.
    provider_lost: Cell<bool>,
    // Bumped by every connect and disconnect; a connect that resolves under a
    // different generation is stale.
    generation: Cell<u64>,
    cache: Option<Rc<dyn ProviderCache>>,
    connected: EventHook<Rc<dyn Provider>>,
    disconnected: EventHook<()>,
    accounts_changed: EventHook<String>,
    chain_changed: EventHook<u64>,
}

/// Connection state of one wallet, shared by reference with every consumer.
#[derive(Clone)]
pub struct Wallet {
    inner: Rc<Inner>,
}

impl Wallet {
    pub fn new(options: ConnectorOptions) -> Self {
        Self::build(options, None)
    }

    /// Like [`Wallet::new`], remembering the last provider in `cache`.
    pub fn with_cache(options: ConnectorOptions, cache: Rc<dyn ProviderCache>) -> Self {
        Self::build(options, Some(cache))
    }

    fn build(options: ConnectorOptions, cache: Option<Rc<dyn ProviderCache>>) -> Self {
        Self {
            inner: Rc::new(Inner {
                options,
                state: State::new(),
                provider: RefCell::new(None),
                provider_lost: Cell::new(false),
                generation: Cell::new(0),
                cache,
                connected: EventHook::new(),
                disconnected: EventHook::new(),
                accounts_changed: EventHook::new(),
                chain_changed: EventHook::new(),
            }),
        }
    }

    pub fn options(&self) -> &ConnectorOptions {
        &self.inner.options
    }

    pub fn address(&self) -> ReadOnly<String> {
        self.inner.state.address.read_only()
    }

    pub fn accounts(&self) -> ReadOnly<Vec<String>> {
        self.inner.state.accounts.read_only()
    }

    pub fn chain_id(&self) -> ReadOnly<Option<u64>> {
        self.inner.state.chain_id.read_only()
    }

    pub fn loading(&self) -> ReadOnly<bool> {
        self.inner.state.loading.read_only()
    }

    pub fn error(&self) -> ReadOnly<Option<ProviderRpcError>> {
        self.inner.state.error.read_only()
    }

    pub fn connection(&self) -> ReadOnly<ConnectionState> {
        self.inner.state.connection.read_only()
    }

    pub fn is_connected(&self) -> ReadOnly<bool> {
        self.inner.state.is_connected.read_only()
    }

    /// True when the wallet sits on a chain other than the configured one.
    pub fn is_wrong_network(&self) -> ReadOnly<bool> {
        self.inner.state.is_wrong_network.read_only()
    }

    /// The attached provider, for issuing raw requests.
    pub fn provider(&self) -> Option<Rc<dyn Provider>> {
        self.inner.provider.borrow().clone()
    }

    pub fn typed_address(&self) -> Option<Address> {
        self.inner.state.address.with(|address| Address::from_str(address).ok())
    }

    /// EIP-55 form of the current address.
    pub fn checksum_address(&self) -> Option<String> {
        self.typed_address().map(|address| to_checksum(&address, None))
    }

    pub fn on_connected(&self, listener: impl Fn(&Rc<dyn Provider>) + 'static) -> Subscription {
        self.inner.connected.on(listener)
    }

    pub fn on_disconnected(&self, listener: impl Fn(&()) + 'static) -> Subscription {
        self.inner.disconnected.on(listener)
    }

    pub fn on_accounts_changed(&self, listener: impl Fn(&String) + 'static) -> Subscription {
        self.inner.accounts_changed.on(listener)
    }

    pub fn on_chain_changed(&self, listener: impl Fn(&u64) + 'static) -> Subscription {
        self.inner.chain_changed.on(listener)
    }

    /// Connects through `handle` and attaches the resulting provider.
    ///
    /// Fails with [`WalletError::ConnectInProgress`] while another connect is
    /// pending, and with [`WalletError::Superseded`] when [`Wallet::disconnect`]
    /// ran before the handle resolved.
    pub async fn connect(&self, handle: &dyn ProviderHandle) -> Result<(), WalletError> {
        if self.inner.state.loading.get() {
            return Err(WalletError::ConnectInProgress);
        }
        let generation = self.next_generation();
        self.inner.state.loading.set(true);
        self.inner.state.connection.set(ConnectionState::Connecting);
        debug!("Connecting through provider {}", handle.id());

        let result = handle.connect().await;

        if self.inner.generation.get() != generation {
            warn!("Discarding stale connection to {}", handle.id());
            if let Ok(provider) = result {
                provider.remove_all_listeners();
                if let Err(err) = provider.disconnect().await {
                    error!("Failed to release stale provider: {err}");
                }
            }
            return Err(WalletError::Superseded);
        }

        match result {
            Ok(provider) => {
                self.attach(provider);
                self.remember(handle.id());
                Ok(())
            }
            Err(err) => {
                debug!("Connection through {} failed: {err}", handle.id());
                self.inner.state.loading.set(false);
                self.inner.state.connection.set(if self.inner.provider.borrow().is_some() {
                    ConnectionState::Connected
                } else {
                    ConnectionState::Disconnected
                });
                Err(WalletError::Connect(err.to_string()))
            }
        }
    }

    /// Reconnects to the cached provider, if one was remembered. Returns
    /// whether a connection was attempted.
    pub async fn restore(&self, handles: &[Rc<dyn ProviderHandle>]) -> Result<bool, WalletError> {
        let Some(cached) = self.inner.cache.as_ref().and_then(|cache| cache.load()) else {
            return Ok(false);
        };
        let handle = handles
            .iter()
            .find(|handle| handle.id() == cached)
            .ok_or_else(|| WalletError::UnknownProvider(cached.clone()))?;
        debug!("Restoring cached provider {cached}");
        self.connect(handle.as_ref()).await?;
        Ok(true)
    }

    /// Detaches the current provider and resets all state. A no-op when
    /// nothing is attached or pending.
    pub async fn disconnect(&self) {
        let provider = self.inner.provider.borrow_mut().take();
        let pending = self.inner.state.loading.get();
        if provider.is_none() && !pending {
            return;
        }
        self.next_generation();

        if let Some(provider) = &provider {
            provider.remove_all_listeners();
        }
        self.reset();
        if let Some(cache) = &self.inner.cache {
            cache.clear();
        }
        debug!("Wallet disconnected");

        if let Some(provider) = provider {
            self.inner.disconnected.trigger(&());
            if let Err(err) = provider.disconnect().await {
                error!("Provider failed to disconnect: {err}");
            }
        }
    }

    /// Sends a raw request to the attached provider.
    pub async fn request(&self, args: RequestArguments) -> Result<serde_json::Value, WalletError> {
        let provider = self.provider().ok_or(WalletError::NotConnected)?;
        Ok(provider.request(args).await?)
    }

    fn next_generation(&self) -> u64 {
        let generation = self.inner.generation.get() + 1;
        self.inner.generation.set(generation);
        generation
    }

    fn attach(&self, provider: Rc<dyn Provider>) {
        let previous = self.inner.provider.borrow_mut().take();
        if let Some(previous) = previous {
            previous.remove_all_listeners();
        }
        self.bind(&provider);
        *self.inner.provider.borrow_mut() = Some(provider.clone());
        self.inner.provider_lost.set(false);

        let address = provider.selected_address().to_lowercase();
        let accounts = if address.is_empty() { Vec::new() } else { vec![address.clone()] };
        let chain_id = match parse_chain_id(&provider.chain_id()) {
            Ok(chain_id) => Some(chain_id),
            Err(err) => {
                warn!("Provider reported an unreadable chain id: {err}");
                None
            }
        };

        let state = &self.inner.state;
        state.accounts.set(accounts);
        state.address.set(address);
        state.chain_id.set(chain_id);
        state.error.set(None);
        state.loading.set(false);
        state.connection.set(ConnectionState::Connected);
        self.refresh();
        debug!("Wallet connected to chain {chain_id:?}");

        self.inner.connected.trigger(&provider);
    }

    fn bind(&self, provider: &Rc<dyn Provider>) {
        let kinds = [
            ProviderEventKind::Connect,
            ProviderEventKind::Disconnect,
            ProviderEventKind::ChainChanged,
            ProviderEventKind::AccountsChanged,
        ];
        for kind in kinds {
            let inner: Weak<Inner> = Rc::downgrade(&self.inner);
            provider.on(
                kind,
                Rc::new(move |event: &ProviderEvent| {
                    if let Some(inner) = inner.upgrade() {
                        Wallet { inner }.handle_event(event);
                    }
                }),
            );
        }
    }

    fn handle_event(&self, event: &ProviderEvent) {
        let state = &self.inner.state;
        match event {
            ProviderEvent::Connect(info) => {
                match parse_chain_id(&info.chain_id) {
                    Ok(chain_id) => {
                        state.chain_id.set(Some(chain_id));
                    }
                    Err(err) => warn!("Ignoring connect with bad chain id: {err}"),
                }
                if self.inner.provider_lost.replace(false) {
                    debug!("Provider reconnected");
                    state.error.set(None);
                    state.connection.set(ConnectionState::Connected);
                }
                self.refresh();
            }
            ProviderEvent::Disconnect(err) => {
                debug!("Provider disconnected: {err:?}");
                state.error.set(err.clone());
                self.inner.provider_lost.set(true);
                state.connection.set(ConnectionState::Disconnected);
                self.refresh();
                self.inner.disconnected.trigger(&());
            }
            ProviderEvent::ChainChanged(raw) => match parse_chain_id(raw) {
                Ok(chain_id) => {
                    debug!("Chain changed to {chain_id}");
                    state.chain_id.set(Some(chain_id));
                    self.refresh();
                    self.inner.chain_changed.trigger(&chain_id);
                }
                Err(err) => warn!("Ignoring chainChanged with bad chain id: {err}"),
            },
            ProviderEvent::AccountsChanged(accounts) => {
                if accounts.is_empty() {
                    debug!("Ignoring empty accountsChanged");
                    return;
                }
                let accounts: Vec<String> = accounts.iter().map(|a| a.to_lowercase()).collect();
                let address = accounts[0].clone();
                state.accounts.set(accounts);
                state.address.set(address.clone());
                self.refresh();
                self.inner.accounts_changed.trigger(&address);
            }
            ProviderEvent::Message(_) => {}
        }
    }

    // Recomputes the derived flags after a mutation.
    fn refresh(&self) {
        let state = &self.inner.state;
        let attached = self.inner.provider.borrow().is_some();
        let has_address = state.address.with(|address| !address.is_empty());
        state.is_connected.set(attached && has_address && !self.inner.provider_lost.get());
        let expected = self.inner.options.chain_id;
        state.is_wrong_network.set(state.chain_id.get().is_some_and(|id| id != expected));
    }

    fn reset(&self) {
        let state = &self.inner.state;
        self.inner.provider_lost.set(false);
        state.address.set(String::new());
        state.accounts.set(Vec::new());
        state.chain_id.set(None);
        state.loading.set(false);
        state.error.set(None);
        state.connection.set(ConnectionState::Disconnected);
        self.refresh();
    }

    fn remember(&self, provider_id: &str) {
        if !self.inner.options.cache_provider {
            return;
        }
        if let Some(cache) = &self.inner.cache {
            if let Err(err) = cache.store(provider_id) {
                error!("Failed to cache provider {provider_id}: {err}");
            }
        }
    }
}
