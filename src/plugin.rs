use std::{collections::BTreeMap, rc::Rc};

use log::debug;
use wasm_bindgen::JsValue;

use crate::{
    config::{ConfigError, ConnectorOptions},
    storage::{LocalStorageCache, ProviderCache},
    wallet::Wallet,
    Error,
};

/// Components the plugin registers with its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Modal,
    Content,
    Title,
    Button,
}

impl ComponentKind {
    pub const ALL: [Self; 4] = [Self::Modal, Self::Content, Self::Title, Self::Button];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Modal => "ConnectModal",
            Self::Content => "ConnectContent",
            Self::Title => "ConnectTitle",
            Self::Button => "ConnectButton",
        }
    }
}

/// Application the plugin installs into.
pub trait Host {
    fn register_component(&mut self, name: &'static str, kind: ComponentKind);

    fn provide_wallet(&mut self, wallet: Wallet);
}

/// Minimal [`Host`]: a component registry plus the provided wallet.
#[derive(Default)]
pub struct AppContext {
    components: BTreeMap<&'static str, ComponentKind>,
    wallet: Option<Wallet>,
}

impl AppContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn component(&self, name: &str) -> Option<ComponentKind> {
        self.components.get(name).copied()
    }

    pub fn component_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.components.keys().copied()
    }
}

impl Host for AppContext {
    fn register_component(&mut self, name: &'static str, kind: ComponentKind) {
        self.components.insert(name, kind);
    }

    fn provide_wallet(&mut self, wallet: Wallet) {
        self.wallet = Some(wallet);
    }
}

/// The wallet provided by [`WalletConnectorPlugin::install`].
pub fn use_wallet(ctx: &AppContext) -> Result<Wallet, Error> {
    ctx.wallet.clone().ok_or(Error::NotInstalled)
}

pub struct WalletConnectorPlugin {
    options: ConnectorOptions,
    cache: Option<Rc<dyn ProviderCache>>,
}

impl WalletConnectorPlugin {
    pub fn new(options: ConnectorOptions) -> Self {
        let cache = options
            .cache_provider
            .then(|| Rc::new(LocalStorageCache::new()) as Rc<dyn ProviderCache>);
        Self { options, cache }
    }

    pub fn from_js(options: JsValue) -> Result<Self, ConfigError> {
        Ok(Self::new(ConnectorOptions::from_js(options)?))
    }

    /// Replaces the provider cache, e.g. with an in-memory one.
    pub fn with_cache(mut self, cache: Rc<dyn ProviderCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Registers the four modal components and provides one shared wallet.
    pub fn install(self, host: &mut impl Host) -> Wallet {
        for kind in ComponentKind::ALL {
            host.register_component(kind.name(), kind);
        }
        let wallet = match self.cache {
            Some(cache) => Wallet::with_cache(self.options, cache),
            None => Wallet::new(self.options),
        };
        host.provide_wallet(wallet.clone());
        debug!("Wallet connector installed for {}", wallet.options().app_name);
        wallet
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;
    use crate::{
        provider::mock::{MockHandle, MockProvider},
        storage::MemoryCache,
    };

    #[test]
    fn wallet_requires_install() {
        let ctx = AppContext::new();
        assert!(matches!(use_wallet(&ctx), Err(Error::NotInstalled)));
    }

    #[test]
    fn install_registers_components_and_wallet() {
        let mut ctx = AppContext::new();
        let cache = Rc::new(MemoryCache::new());
        let wallet = WalletConnectorPlugin::new(ConnectorOptions::new("Demo", 5))
            .with_cache(cache.clone())
            .install(&mut ctx);

        assert_eq!(
            ctx.component_names().collect::<Vec<_>>(),
            vec!["ConnectButton", "ConnectContent", "ConnectModal", "ConnectTitle"]
        );
        assert_eq!(ctx.component("ConnectTitle"), Some(ComponentKind::Title));

        // Every consumer sees the same wallet.
        let provided = use_wallet(&ctx).unwrap();
        assert_eq!(provided.options().chain_id, 5);
        let provider = MockProvider::new("0x5", "0xabc");
        block_on(wallet.connect(&MockHandle::ok("injected", provider))).unwrap();
        assert!(provided.is_connected().get());
        assert_eq!(cache.load().as_deref(), Some("injected"));
    }
}
