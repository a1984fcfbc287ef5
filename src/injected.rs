//! EIP-1193 provider injected by a browser extension, e.g. `window.ethereum`.

use std::{cell::RefCell, rc::Rc};

use async_trait::async_trait;
use js_sys::{Function, Promise, Reflect};
use log::{debug, error};
use serde::{de::DeserializeOwned, Serialize};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::{
    chain::{parse_chain_value, to_hex_chain_id},
    provider::{
        BoxError, ConnectInfo, EventHandler, Provider, ProviderEvent, ProviderEventKind,
        ProviderExt, ProviderHandle,
    },
    rpc::{ProviderMessage, ProviderRpcError, RequestArguments},
};

const CODE_INTERNAL_ERROR: i64 = -32603;

fn internal(message: impl Into<String>) -> ProviderRpcError {
    ProviderRpcError::new(CODE_INTERNAL_ERROR, message)
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, ProviderRpcError> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| internal(e.to_string()))
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> Option<T> {
    serde_wasm_bindgen::from_value(value).ok()
}

/// Rejections carry `{code, message}` when the wallet follows EIP-1193.
fn rejection(value: JsValue) -> ProviderRpcError {
    if let Some(err) = from_js::<ProviderRpcError>(value.clone()) {
        return err;
    }
    let message = value
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| value.as_string())
        .unwrap_or_else(|| "Provider request failed".to_string());
    internal(message)
}

fn decode_event(kind: ProviderEventKind, payload: JsValue) -> Option<ProviderEvent> {
    Some(match kind {
        ProviderEventKind::Connect => ProviderEvent::Connect(from_js::<ConnectInfo>(payload)?),
        ProviderEventKind::Disconnect => ProviderEvent::Disconnect(from_js(payload)),
        ProviderEventKind::ChainChanged => {
            let value: serde_json::Value = from_js(payload)?;
            let chain = match value {
                serde_json::Value::String(chain) => chain,
                other => to_hex_chain_id(parse_chain_value(&other).ok()?),
            };
            ProviderEvent::ChainChanged(chain)
        }
        ProviderEventKind::AccountsChanged => ProviderEvent::AccountsChanged(from_js(payload)?),
        ProviderEventKind::Message => ProviderEvent::Message(from_js::<ProviderMessage>(payload)?),
    })
}

type JsListener = Closure<dyn FnMut(JsValue)>;

/// Wraps the provider object a wallet extension injects into the page.
pub struct InjectedProvider {
    object: JsValue,
    listeners: RefCell<Vec<(ProviderEventKind, JsListener)>>,
}

impl InjectedProvider {
    pub fn new(object: JsValue) -> Self {
        Self { object, listeners: RefCell::new(Vec::new()) }
    }

    /// `window.ethereum`, if present.
    pub fn detect() -> Option<Self> {
        let window = web_sys::window()?;
        let object = Reflect::get(&window, &JsValue::from_str("ethereum")).ok()?;
        (!object.is_undefined() && !object.is_null()).then(|| Self::new(object))
    }

    fn property(&self, name: &str) -> Option<JsValue> {
        Reflect::get(&self.object, &JsValue::from_str(name))
            .ok()
            .filter(|value| !value.is_undefined() && !value.is_null())
    }

    fn method(&self, name: &str) -> Option<Function> {
        self.property(name)?.dyn_into::<Function>().ok()
    }

    fn remove_listener(&self, kind: ProviderEventKind, listener: &JsListener) {
        let Some(remove) = self.method("removeListener") else {
            return;
        };
        let event = JsValue::from_str(kind.as_str());
        if let Err(err) = remove.call2(&self.object, &event, listener.as_ref().unchecked_ref()) {
            error!("Failed to remove {kind} listener: {err:?}");
        }
    }
}

#[async_trait(?Send)]
impl Provider for InjectedProvider {
    async fn request(&self, args: RequestArguments) -> Result<serde_json::Value, ProviderRpcError> {
        let request = self
            .method("request")
            .ok_or_else(|| internal("Provider has no request method"))?;
        let promise = request
            .call1(&self.object, &to_js(&args)?)
            .map_err(rejection)?
            .dyn_into::<Promise>()
            .map_err(|_| internal("Provider request did not return a promise"))?;
        let value = JsFuture::from(promise).await.map_err(rejection)?;
        if value.is_undefined() {
            return Ok(serde_json::Value::Null);
        }
        serde_wasm_bindgen::from_value(value).map_err(|e| internal(e.to_string()))
    }

    fn on(&self, kind: ProviderEventKind, handler: EventHandler) {
        let Some(on) = self.method("on") else {
            error!("Provider cannot subscribe to {kind}");
            return;
        };
        let listener = Closure::<dyn FnMut(JsValue)>::new(move |payload: JsValue| {
            match decode_event(kind, payload) {
                Some(event) => handler(&event),
                None => error!("Undecodable {kind} event"),
            }
        });
        let event = JsValue::from_str(kind.as_str());
        match on.call2(&self.object, &event, listener.as_ref().unchecked_ref()) {
            Ok(_) => self.listeners.borrow_mut().push((kind, listener)),
            Err(err) => error!("Failed to subscribe to {kind}: {err:?}"),
        }
    }

    fn remove_all_listeners(&self) {
        let listeners: Vec<_> = self.listeners.borrow_mut().drain(..).collect();
        for (kind, listener) in &listeners {
            self.remove_listener(*kind, listener);
        }
    }

    fn chain_id(&self) -> String {
        match self.property("chainId") {
            Some(value) => match value.as_string() {
                Some(chain) => chain,
                None => value.as_f64().map(|n| to_hex_chain_id(n as u64)).unwrap_or_default(),
            },
            None => String::new(),
        }
    }

    fn selected_address(&self) -> String {
        self.property("selectedAddress").and_then(|v| v.as_string()).unwrap_or_default()
    }

    async fn disconnect(&self) -> Result<(), ProviderRpcError> {
        let Some(disconnect) = self.method("disconnect") else {
            return Ok(());
        };
        let result = disconnect.call0(&self.object).map_err(rejection)?;
        if let Ok(promise) = result.dyn_into::<Promise>() {
            JsFuture::from(promise).await.map_err(rejection)?;
        }
        Ok(())
    }
}

impl Drop for InjectedProvider {
    fn drop(&mut self) {
        self.remove_all_listeners();
    }
}

/// Connects the injected provider by asking it for accounts.
pub struct InjectedHandle {
    id: String,
    object: JsValue,
}

impl InjectedHandle {
    pub const ID: &'static str = "injected";

    pub fn new(object: JsValue) -> Self {
        Self { id: Self::ID.to_string(), object }
    }

    pub fn detect() -> Option<Self> {
        InjectedProvider::detect().map(|provider| Self::new(provider.object.clone()))
    }
}

#[async_trait(?Send)]
impl ProviderHandle for InjectedHandle {
    fn id(&self) -> &str {
        &self.id
    }

    async fn connect(&self) -> Result<Rc<dyn Provider>, BoxError> {
        let provider = InjectedProvider::new(self.object.clone());
        let accounts = provider.request_accounts().await?;
        debug!("Injected provider unlocked {} account(s)", accounts.len());
        Ok(Rc::new(provider))
    }
}
