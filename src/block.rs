use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use chrono::{DateTime, TimeZone, Utc};
use futures::{
    channel::oneshot,
    task::{LocalSpawn, LocalSpawnExt},
};
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    event::{EventHook, Subscription},
    observable::{Observable, ReadOnly},
    provider::{Provider, ProviderEvent, ProviderEventKind},
    rpc::{ProviderMessage, RequestArguments, MESSAGE_TYPE_SUBSCRIPTION},
    wallet::Wallet,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockError {
    #[error("No result available in new Block.")]
    NoResult,

    #[error("No provider is connected")]
    NotConnected,
}

/// Latest block as returned by `eth_getBlockByNumber`, fields kept as the
/// provider's hex strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Block {
    pub difficulty: String,
    pub extra_data: String,
    pub gas_limit: String,
    pub gas_used: String,
    pub hash: String,
    pub logs_bloom: String,
    pub miner: String,
    pub mix_hash: String,
    pub nonce: String,
    pub number: String,
    pub parent_hash: String,
    pub receipts_root: String,
    pub sha3_uncles: String,
    pub state_root: String,
    pub timestamp: String,
    pub transactions_root: String,
}

impl Block {
    /// Copies the block fields out of an RPC result. Returns `None` unless the
    /// result is a JSON object.
    ///
    /// Strings are copied as is. Numbers and booleans keep their JSON text;
    /// `null`, objects and arrays become empty. Every non-string value is
    /// logged.
    pub fn from_response(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        let field = |name: &str| match value.get(name) {
            None => String::new(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => {
                warn!("Block field {name} is not a string: {other}");
                match other {
                    Value::Number(_) | Value::Bool(_) => other.to_string(),
                    _ => String::new(),
                }
            }
        };
        Some(Self {
            difficulty: field("difficulty"),
            extra_data: field("extraData"),
            gas_limit: field("gasLimit"),
            gas_used: field("gasUsed"),
            hash: field("hash"),
            logs_bloom: field("logsBloom"),
            miner: field("miner"),
            mix_hash: field("mixHash"),
            nonce: field("nonce"),
            number: field("number"),
            parent_hash: field("parentHash"),
            receipts_root: field("receiptsRoot"),
            sha3_uncles: field("sha3Uncles"),
            state_root: field("stateRoot"),
            timestamp: field("timestamp"),
            transactions_root: field("transactionsRoot"),
        })
    }

    pub fn number_u64(&self) -> Option<u64> {
        parse_quantity(&self.number)
    }

    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(parse_quantity(&self.timestamp)?).ok()?;
        Utc.timestamp_opt(secs, 0).single()
    }
}

fn parse_quantity(hex: &str) -> Option<u64> {
    u64::from_str_radix(hex.strip_prefix("0x")?, 16).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockOptions {
    /// Fetch the latest block right after creation.
    pub immediate: bool,
    /// Follow new heads through `eth_subscribe` while the window is active.
    pub use_subscriptions: bool,
}

impl Default for BlockOptions {
    fn default() -> Self {
        Self { immediate: true, use_subscriptions: false }
    }
}

struct ActiveSubscription {
    provider: Rc<dyn Provider>,
    id: String,
}

struct Inner {
    wallet: Wallet,
    window_active: ReadOnly<bool>,
    spawner: Rc<dyn LocalSpawn>,
    block: Observable<Option<Block>>,
    error: Observable<Option<BlockError>>,
    is_finished: Observable<bool>,
    new_block: EventHook<Block>,
    new_block_error: EventHook<BlockError>,
    first_result: RefCell<Option<Result<Block, BlockError>>>,
    waiters: RefCell<Vec<oneshot::Sender<Result<Block, BlockError>>>>,
    active: RefCell<Option<ActiveSubscription>>,
    sync_queued: Cell<bool>,
    subscriptions: RefCell<Vec<Subscription>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        for subscription in self.subscriptions.get_mut().drain(..) {
            subscription.unsubscribe();
        }
        if let Some(active) = self.active.get_mut().take() {
            debug!("Closing block subscription {}", active.id);
            let spawned = self.spawner.spawn_local(async move {
                let request = RequestArguments::unsubscribe(&active.id);
                if let Err(err) = active.provider.request(request).await {
                    error!("Failed to unsubscribe {}: {err}", active.id);
                }
            });
            if let Err(err) = spawned {
                error!("Failed to schedule unsubscribe: {err}");
            }
        }
    }
}

/// Fetches the latest block through the wallet's provider and, optionally,
/// follows new heads.
#[derive(Clone)]
pub struct BlockFetcher {
    inner: Rc<Inner>,
}

impl BlockFetcher {
    pub fn new(
        wallet: &Wallet,
        window_active: ReadOnly<bool>,
        spawner: Rc<dyn LocalSpawn>,
        options: BlockOptions,
    ) -> Self {
        let fetcher = Self {
            inner: Rc::new(Inner {
                wallet: wallet.clone(),
                window_active,
                spawner,
                block: Observable::new(None),
                error: Observable::new(None),
                is_finished: Observable::new(false),
                new_block: EventHook::new(),
                new_block_error: EventHook::new(),
                first_result: RefCell::new(None),
                waiters: RefCell::new(Vec::new()),
                active: RefCell::new(None),
                sync_queued: Cell::new(false),
                subscriptions: RefCell::new(Vec::new()),
            }),
        };

        if options.use_subscriptions {
            fetcher.follow_new_heads();
        }
        if options.immediate {
            // Deferred so a provider attached in the same tick is picked up.
            let weak = Rc::downgrade(&fetcher.inner);
            fetcher.spawn(async move {
                if let Some(inner) = weak.upgrade() {
                    let _ = BlockFetcher { inner }.execute().await;
                }
            });
        }
        fetcher
    }

    pub fn block(&self) -> ReadOnly<Option<Block>> {
        self.inner.block.read_only()
    }

    pub fn error(&self) -> ReadOnly<Option<BlockError>> {
        self.inner.error.read_only()
    }

    pub fn is_finished(&self) -> ReadOnly<bool> {
        self.inner.is_finished.read_only()
    }

    pub fn on_new_block(&self, listener: impl Fn(&Block) + 'static) -> Subscription {
        self.inner.new_block.on(listener)
    }

    pub fn on_new_block_error(&self, listener: impl Fn(&BlockError) + 'static) -> Subscription {
        self.inner.new_block_error.on(listener)
    }

    /// Requests the latest block. Exactly one of the new-block and error
    /// notifications fires per call.
    pub async fn execute(&self) -> Result<Block, BlockError> {
        let Some(provider) = self.inner.wallet.provider() else {
            return self.fail(BlockError::NotConnected);
        };
        match provider.request(RequestArguments::latest_block()).await {
            Ok(value) => match Block::from_response(&value) {
                Some(block) => self.succeed(block),
                None => self.fail(BlockError::NoResult),
            },
            Err(err) => {
                error!("Failed to fetch latest block: {err}");
                self.fail(BlockError::NoResult)
            }
        }
    }

    /// Resolves with the first fetch outcome, now or once it arrives.
    pub async fn finished(&self) -> Result<Block, BlockError> {
        if let Some(result) = self.inner.first_result.borrow().clone() {
            return result;
        }
        let (sender, receiver) = oneshot::channel();
        self.inner.waiters.borrow_mut().push(sender);
        receiver.await.unwrap_or(Err(BlockError::NoResult))
    }

    fn succeed(&self, block: Block) -> Result<Block, BlockError> {
        self.inner.block.set(Some(block.clone()));
        self.inner.new_block.trigger(&block);
        self.settle(Ok(block.clone()));
        Ok(block)
    }

    fn fail(&self, err: BlockError) -> Result<Block, BlockError> {
        self.inner.error.set(Some(err.clone()));
        self.inner.new_block_error.trigger(&err);
        self.settle(Err(err.clone()));
        Err(err)
    }

    fn settle(&self, result: Result<Block, BlockError>) {
        self.inner.is_finished.set(true);
        if self.inner.first_result.borrow().is_some() {
            return;
        }
        *self.inner.first_result.borrow_mut() = Some(result.clone());
        let waiters: Vec<_> = self.inner.waiters.borrow_mut().drain(..).collect();
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
    }

    fn spawn(&self, future: impl std::future::Future<Output = ()> + 'static) {
        if let Err(err) = self.inner.spawner.spawn_local(future) {
            error!("Failed to schedule block task: {err}");
        }
    }

    fn follow_new_heads(&self) {
        let mut subscriptions = Vec::new();

        let weak = Rc::downgrade(&self.inner);
        subscriptions.push(self.inner.wallet.on_connected(move |provider| {
            if let Some(inner) = weak.upgrade() {
                let fetcher = BlockFetcher { inner };
                fetcher.listen(provider);
                fetcher.sync_subscription();
            }
        }));

        let weak = Rc::downgrade(&self.inner);
        subscriptions.push(self.inner.wallet.chain_id().subscribe(move |_| {
            if let Some(inner) = weak.upgrade() {
                BlockFetcher { inner }.sync_subscription();
            }
        }));

        let weak = Rc::downgrade(&self.inner);
        subscriptions.push(self.inner.window_active.subscribe(move |_| {
            if let Some(inner) = weak.upgrade() {
                BlockFetcher { inner }.sync_subscription();
            }
        }));

        self.inner.subscriptions.borrow_mut().extend(subscriptions);

        if let Some(provider) = self.inner.wallet.provider() {
            self.listen(&provider);
        }
        self.sync_subscription();
    }

    fn should_subscribe(&self) -> bool {
        self.inner.window_active.get() && self.inner.wallet.chain_id().get().is_some()
    }

    // The wallet clears every listener before it announces a provider, so
    // each connected notification needs a fresh binding.
    fn listen(&self, provider: &Rc<dyn Provider>) {
        let weak = Rc::downgrade(&self.inner);
        provider.on(
            ProviderEventKind::Message,
            Rc::new(move |event: &ProviderEvent| {
                if let (Some(inner), ProviderEvent::Message(message)) = (weak.upgrade(), event) {
                    BlockFetcher { inner }.handle_message(message);
                }
            }),
        );
    }

    // Attaching a provider can change the chain and announce the provider in
    // the same tick; both land in one queued sync.
    fn sync_subscription(&self) {
        if self.inner.sync_queued.replace(true) {
            return;
        }
        let this = self.clone();
        self.spawn(async move {
            this.inner.sync_queued.set(false);
            if this.should_subscribe() {
                this.open_subscription().await;
            } else {
                this.close_subscription().await;
            }
        });
    }

    async fn open_subscription(&self) {
        self.close_subscription().await;
        let Some(provider) = self.inner.wallet.provider() else {
            return;
        };
        let id = match provider.request(RequestArguments::subscribe_new_heads()).await {
            Ok(Value::String(id)) => id,
            Ok(other) => {
                error!("Unexpected eth_subscribe result {other}");
                return;
            }
            Err(err) => {
                error!("Failed to subscribe to new heads: {err}");
                return;
            }
        };
        debug!("Subscribed to new heads as {id}");
        let previous = self.inner.active.borrow_mut().replace(ActiveSubscription { provider, id });
        if let Some(previous) = previous {
            Self::release(previous).await;
        }
        if !self.should_subscribe() {
            self.close_subscription().await;
        }
    }

    async fn close_subscription(&self) {
        let active = self.inner.active.borrow_mut().take();
        if let Some(active) = active {
            Self::release(active).await;
        }
    }

    async fn release(subscription: ActiveSubscription) {
        debug!("Unsubscribing {}", subscription.id);
        let request = RequestArguments::unsubscribe(&subscription.id);
        if let Err(err) = subscription.provider.request(request).await {
            error!("Failed to unsubscribe {}: {err}", subscription.id);
        }
    }

    fn handle_message(&self, message: &ProviderMessage) {
        if message.kind != MESSAGE_TYPE_SUBSCRIPTION {
            return;
        }
        let Some(data) = message.subscription() else {
            warn!("Malformed subscription message");
            let _ = self.fail(BlockError::NoResult);
            return;
        };
        let matches = self
            .inner
            .active
            .borrow()
            .as_ref()
            .is_some_and(|active| active.id == data.subscription);
        if !matches {
            warn!("Message for unknown subscription {}", data.subscription);
            let _ = self.fail(BlockError::NoResult);
            return;
        }
        let _ = match Block::from_response(&data.result) {
            Some(block) => self.succeed(block),
            None => self.fail(BlockError::NoResult),
        };
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::{block_on, LocalPool};
    use serde_json::json;

    use super::*;
    use crate::{
        config::ConnectorOptions,
        provider::mock::{MockHandle, MockProvider},
        rpc::ProviderRpcError,
    };

    fn block_json() -> Value {
        json!({
            "difficulty": "0x0",
            "extraData": "0x",
            "gasLimit": "0x1c9c380",
            "gasUsed": "0x5208",
            "hash": "0xabc",
            "logsBloom": "0x00",
            "miner": "0x95222290dd7278aa3ddd389cc1e1d165cc4bafe5",
            "mixHash": "0xdef",
            "nonce": "0x0000000000000000",
            "number": "0x10",
            "parentHash": "0x123",
            "receiptsRoot": "0x456",
            "sha3Uncles": "0x789",
            "stateRoot": "0xaaa",
            "timestamp": "0x6553f100",
            "transactionsRoot": "0xbbb",
            "transactions": []
        })
    }

    fn connected_wallet(provider: &Rc<MockProvider>) -> Wallet {
        let wallet = Wallet::new(ConnectorOptions::default());
        block_on(wallet.connect(&MockHandle::ok("injected", provider.clone()))).unwrap();
        wallet
    }

    fn counters(fetcher: &BlockFetcher) -> (Rc<Cell<usize>>, Rc<Cell<usize>>) {
        let blocks = Rc::new(Cell::new(0));
        let errors = Rc::new(Cell::new(0));
        let b = blocks.clone();
        let _ = fetcher.on_new_block(move |_| b.set(b.get() + 1));
        let e = errors.clone();
        let _ = fetcher.on_new_block_error(move |_| e.set(e.get() + 1));
        (blocks, errors)
    }

    fn fetcher(wallet: &Wallet, pool: &LocalPool, options: BlockOptions) -> BlockFetcher {
        BlockFetcher::new(wallet, ReadOnly::constant(true), Rc::new(pool.spawner()), options)
    }

    fn manual() -> BlockOptions {
        BlockOptions { immediate: false, use_subscriptions: false }
    }

    fn following() -> BlockOptions {
        BlockOptions { immediate: false, use_subscriptions: true }
    }

    #[test]
    fn copies_all_fields_from_object_response() {
        let provider = MockProvider::new("0x1", "0x01");
        let wallet = connected_wallet(&provider);
        let pool = LocalPool::new();
        let fetcher = fetcher(&wallet, &pool, manual());
        let (blocks, errors) = counters(&fetcher);

        provider.respond(Ok(block_json()));
        let block = block_on(fetcher.execute()).unwrap();

        assert_eq!(blocks.get(), 1);
        assert_eq!(errors.get(), 0);
        assert_eq!(serde_json::to_value(&block).unwrap(), {
            let mut expected = block_json();
            expected.as_object_mut().unwrap().remove("transactions");
            expected
        });
        assert_eq!(block.number_u64(), Some(16));
        assert_eq!(block.timestamp_utc().unwrap().timestamp(), 0x6553f100);
        assert_eq!(fetcher.block().get(), Some(block));
        assert!(fetcher.is_finished().get());
        assert_eq!(provider.requests.borrow()[0], RequestArguments::latest_block());
    }

    #[test]
    fn non_string_fields_are_kept_as_text() {
        let mut value = block_json();
        value["number"] = json!(16);
        value["nonce"] = Value::Null;
        value["mixHash"] = json!({"unexpected": true});

        let block = Block::from_response(&value).unwrap();
        assert_eq!(block.number, "16");
        assert_eq!(block.nonce, "");
        assert_eq!(block.mix_hash, "");
        assert_eq!(block.hash, "0xabc");
    }

    #[test]
    fn non_object_response_is_an_error() {
        let provider = MockProvider::new("0x1", "0x01");
        let wallet = connected_wallet(&provider);
        let pool = LocalPool::new();
        let fetcher = fetcher(&wallet, &pool, manual());
        let (blocks, errors) = counters(&fetcher);

        provider.respond(Ok(json!("0x10")));
        assert_eq!(block_on(fetcher.execute()), Err(BlockError::NoResult));
        assert_eq!(blocks.get(), 0);
        assert_eq!(errors.get(), 1);
        assert_eq!(fetcher.error().get(), Some(BlockError::NoResult));
        assert_eq!(block_on(fetcher.finished()), Err(BlockError::NoResult));
    }

    #[test]
    fn rpc_failure_is_an_error() {
        let provider = MockProvider::new("0x1", "0x01");
        let wallet = connected_wallet(&provider);
        let pool = LocalPool::new();
        let fetcher = fetcher(&wallet, &pool, manual());
        let (_, errors) = counters(&fetcher);

        provider.respond(Err(ProviderRpcError::new(-32000, "boom")));
        assert_eq!(block_on(fetcher.execute()), Err(BlockError::NoResult));
        assert_eq!(errors.get(), 1);
    }

    #[test]
    fn fetch_without_provider_fails() {
        let wallet = Wallet::new(ConnectorOptions::default());
        let pool = LocalPool::new();
        let fetcher = fetcher(&wallet, &pool, manual());
        assert_eq!(block_on(fetcher.execute()), Err(BlockError::NotConnected));
    }

    #[test]
    fn immediate_fetch_is_deferred_and_resolves_waiters_once() {
        let provider = MockProvider::new("0x1", "0x01");
        let wallet = connected_wallet(&provider);
        let mut pool = LocalPool::new();
        provider.respond(Ok(block_json()));

        let fetcher = fetcher(&wallet, &pool, BlockOptions::default());
        assert!(provider.requests.borrow().is_empty());
        assert!(!fetcher.is_finished().get());

        let first = pool.run_until(fetcher.finished()).unwrap();
        assert_eq!(first.hash, "0xabc");

        // Later failures do not change the first outcome.
        provider.respond(Ok(Value::Null));
        assert!(pool.run_until(fetcher.execute()).is_err());
        assert_eq!(pool.run_until(fetcher.finished()).unwrap().hash, "0xabc");
    }

    fn subscription_message(id: &str, result: Value) -> ProviderEvent {
        ProviderEvent::Message(ProviderMessage {
            kind: MESSAGE_TYPE_SUBSCRIPTION.to_string(),
            data: json!({"subscription": id, "result": result}),
        })
    }

    fn methods(provider: &MockProvider) -> Vec<String> {
        provider.requests.borrow().iter().map(|r| r.method.clone()).collect()
    }

    #[test]
    fn follows_new_heads_while_window_is_active() {
        let provider = MockProvider::new("0x1", "0x01");
        let wallet = connected_wallet(&provider);
        let mut pool = LocalPool::new();
        let window = Observable::new(true);

        provider.respond(Ok(json!("0xsub")));
        let fetcher = BlockFetcher::new(
            &wallet,
            window.read_only(),
            Rc::new(pool.spawner()),
            following(),
        );
        let (blocks, errors) = counters(&fetcher);
        pool.run_until_stalled();
        assert_eq!(methods(&provider), vec!["eth_subscribe"]);

        provider.emit(subscription_message("0xsub", block_json()));
        assert_eq!(blocks.get(), 1);
        assert_eq!(fetcher.block().get().unwrap().number, "0x10");

        provider.emit(subscription_message("0xother", block_json()));
        provider.emit(subscription_message("0xsub", json!("not a block")));
        assert_eq!(blocks.get(), 1);
        assert_eq!(errors.get(), 2);

        window.set(false);
        pool.run_until_stalled();
        assert_eq!(methods(&provider), vec!["eth_subscribe", "eth_unsubscribe"]);
        assert_eq!(provider.requests.borrow()[1].params, Some(json!(["0xsub"])));
    }

    #[test]
    fn unsubscribes_when_dropped() {
        let provider = MockProvider::new("0x1", "0x01");
        let wallet = connected_wallet(&provider);
        let mut pool = LocalPool::new();

        provider.respond(Ok(json!("0xsub")));
        let fetcher = fetcher(&wallet, &pool, following());
        pool.run_until_stalled();

        drop(fetcher);
        pool.run_until_stalled();
        assert_eq!(methods(&provider), vec!["eth_subscribe", "eth_unsubscribe"]);
    }

    #[test]
    fn subscribes_once_wallet_connects() {
        let provider = MockProvider::new("0x1", "0x01");
        let wallet = Wallet::new(ConnectorOptions::default());
        let mut pool = LocalPool::new();
        let fetcher = fetcher(&wallet, &pool, following());
        let (blocks, _) = counters(&fetcher);
        pool.run_until_stalled();
        assert!(provider.requests.borrow().is_empty());

        provider.respond(Ok(json!("0xsub")));
        block_on(wallet.connect(&MockHandle::ok("injected", provider.clone()))).unwrap();
        pool.run_until_stalled();
        assert_eq!(methods(&provider), vec!["eth_subscribe"]);

        provider.emit(subscription_message("0xsub", block_json()));
        assert_eq!(blocks.get(), 1);
    }

    #[test]
    fn resubscribes_on_new_provider_for_same_chain() {
        let first = MockProvider::new("0x1", "0x01");
        let wallet = connected_wallet(&first);
        let mut pool = LocalPool::new();

        first.respond(Ok(json!("0xsub")));
        let fetcher = fetcher(&wallet, &pool, following());
        let (blocks, _) = counters(&fetcher);
        pool.run_until_stalled();
        assert_eq!(methods(&first), vec!["eth_subscribe"]);

        let second = MockProvider::new("0x1", "0x02");
        second.respond(Ok(json!("0xsub2")));
        block_on(wallet.connect(&MockHandle::ok("injected", second.clone()))).unwrap();
        pool.run_until_stalled();

        assert_eq!(methods(&second), vec!["eth_subscribe"]);
        assert_eq!(methods(&first), vec!["eth_subscribe", "eth_unsubscribe"]);

        second.emit(subscription_message("0xsub2", block_json()));
        assert_eq!(blocks.get(), 1);
    }
}
