use std::{cell::Cell, rc::Rc};

use derive_more::Display;
use log::debug;

use crate::{
    event::{EventHook, Subscription},
    observable::{Observable, ReadOnly},
};

/// Monotonic id source producing `<prefix>-0`, `<prefix>-1`, ...
#[derive(Debug)]
pub struct IdGenerator {
    prefix: &'static str,
    next: Cell<u64>,
}

impl IdGenerator {
    pub const fn new(prefix: &'static str) -> Self {
        Self { prefix, next: Cell::new(0) }
    }

    pub fn next_id(&self) -> ElementId {
        let n = self.next.get();
        self.next.set(n + 1);
        ElementId::indexed(self.prefix, n)
    }
}

/// DOM id of a rendered component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub struct ElementId(String);

impl ElementId {
    pub(crate) fn indexed(prefix: &str, n: u64) -> Self {
        Self(format!("{prefix}-{n}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<ElementId> for String {
    fn from(id: ElementId) -> Self {
        id.0
    }
}

struct ContextInner {
    open: Observable<bool>,
    title: Observable<Option<String>>,
    content: Observable<Option<String>>,
    content_ids: IdGenerator,
    title_ids: IdGenerator,
    button_ids: IdGenerator,
    close: EventHook<()>,
    focus_trap: EventHook<String>,
    focus_release: EventHook<()>,
}

/// State a modal shares with its content, title and buttons.
#[derive(Clone)]
pub struct ModalContext {
    inner: Rc<ContextInner>,
}

impl ModalContext {
    pub(crate) fn new(open: bool) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                open: Observable::new(open),
                title: Observable::new(None),
                content: Observable::new(None),
                content_ids: IdGenerator::new("connect-content"),
                title_ids: IdGenerator::new("connect-title"),
                button_ids: IdGenerator::new("connect-button"),
                close: EventHook::new(),
                focus_trap: EventHook::new(),
                focus_release: EventHook::new(),
            }),
        }
    }

    pub fn open(&self) -> ReadOnly<bool> {
        self.inner.open.read_only()
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.get()
    }

    /// Id of the title labelling the dialog.
    pub fn title(&self) -> ReadOnly<Option<String>> {
        self.inner.title.read_only()
    }

    /// Id of the mounted content region.
    pub fn content(&self) -> ReadOnly<Option<String>> {
        self.inner.content.read_only()
    }

    /// Asks the controller to close the modal.
    pub fn close(&self) {
        debug!("Modal close requested");
        self.inner.close.trigger(&());
    }

    pub fn on_close(&self, listener: impl Fn(&()) + 'static) -> Subscription {
        self.inner.close.on(listener)
    }

    /// Fires with the content region id whenever the focus trap should be
    /// (re)applied to it.
    pub fn on_focus_trap(&self, listener: impl Fn(&String) + 'static) -> Subscription {
        self.inner.focus_trap.on(listener)
    }

    /// Fires when the content region unmounts or the modal closes, so a
    /// trap bound to it can be dropped.
    pub fn on_focus_release(&self, listener: impl Fn(&()) + 'static) -> Subscription {
        self.inner.focus_release.on(listener)
    }

    pub(crate) fn set_open(&self, open: bool) {
        if !self.inner.open.set(open) {
            return;
        }
        if open {
            self.request_focus_trap();
        } else {
            self.inner.focus_release.trigger(&());
        }
    }

    pub(crate) fn next_content_id(&self) -> ElementId {
        self.inner.content_ids.next_id()
    }

    pub(crate) fn next_title_id(&self) -> ElementId {
        self.inner.title_ids.next_id()
    }

    pub(crate) fn next_button_id(&self) -> ElementId {
        self.inner.button_ids.next_id()
    }

    pub(crate) fn register_title(&self, id: &ElementId) {
        self.inner.title.set(Some(id.to_string()));
    }

    /// Clears the title only while it still points at `id`.
    pub(crate) fn unregister_title(&self, id: &ElementId) {
        if self.inner.title.with(|title| title.as_deref() == Some(id.as_str())) {
            self.inner.title.set(None);
        }
    }

    pub(crate) fn register_content(&self, id: &ElementId) {
        if self.inner.content.set(Some(id.to_string())) && self.is_open() {
            self.request_focus_trap();
        }
    }

    pub(crate) fn unregister_content(&self, id: &ElementId) {
        if self.inner.content.with(|content| content.as_deref() == Some(id.as_str())) {
            self.inner.content.set(None);
            self.inner.focus_release.trigger(&());
        }
    }

    fn request_focus_trap(&self) {
        if let Some(content) = self.inner.content.get() {
            self.inner.focus_trap.trigger(&content);
        }
    }
}
