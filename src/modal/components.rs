use std::{cell::Cell, collections::BTreeMap};

use serde::Deserialize;
use serde_json::Value;
use wasm_bindgen::JsValue;

use super::{
    context::{ElementId, ModalContext},
    vnode::VNode,
};
use crate::{
    config::ConfigError,
    event::{EventHook, Subscription},
    keyboard::{EventOutcome, KeyEvent, KEY_ESCAPE},
    observable::{Observable, ReadOnly},
};

thread_local! {
    static MODAL_IDS: Cell<u64> = const { Cell::new(0) };
}

fn next_modal_index() -> u64 {
    MODAL_IDS.with(|ids| {
        let n = ids.get();
        ids.set(n + 1);
        n
    })
}

fn default_modal_tag() -> String {
    "div".to_string()
}

/// Props of [`Modal`]. `show` stays untyped until the modal validates it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModalProps {
    #[serde(rename = "as", default = "default_modal_tag")]
    pub tag: String,
    #[serde(default)]
    pub show: Option<Value>,
    /// Extra attributes forwarded to the root element.
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
}

impl ModalProps {
    pub fn new(show: bool) -> Self {
        Self { tag: default_modal_tag(), show: Some(Value::Bool(show)), attrs: BTreeMap::new() }
    }

    pub fn from_js(value: JsValue) -> Result<Self, ConfigError> {
        serde_wasm_bindgen::from_value(value).map_err(|e| ConfigError::Options(e.to_string()))
    }

    fn validated_show(&self) -> Result<bool, ConfigError> {
        match &self.show {
            None | Some(Value::Null) => Err(ConfigError::MissingShow),
            Some(Value::Bool(show)) => Ok(*show),
            Some(Value::String(other)) => Err(ConfigError::ShowNotBoolean(other.clone())),
            Some(other) => Err(ConfigError::ShowNotBoolean(other.to_string())),
        }
    }
}

/// Controlled dialog. Open exactly while the controller's `show` flag is true.
pub struct Modal {
    id: ElementId,
    portal_id: String,
    tag: String,
    attrs: BTreeMap<String, String>,
    context: ModalContext,
}

impl Modal {
    /// Fails when `show` is missing or not a boolean.
    pub fn new(props: ModalProps) -> Result<Self, ConfigError> {
        let show = props.validated_show()?;
        let index = next_modal_index();
        Ok(Self {
            id: ElementId::indexed("connect-modal", index),
            portal_id: format!("connect-modal-portal-{index}"),
            tag: props.tag,
            attrs: props.attrs,
            context: ModalContext::new(show),
        })
    }

    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    pub fn portal_id(&self) -> &str {
        &self.portal_id
    }

    pub fn context(&self) -> &ModalContext {
        &self.context
    }

    pub fn open(&self) -> ReadOnly<bool> {
        self.context.open()
    }

    pub fn is_open(&self) -> bool {
        self.context.is_open()
    }

    /// Applies the controller's `show` flag.
    pub fn set_show(&self, show: bool) {
        self.context.set_open(show);
    }

    pub fn on_close(&self, listener: impl Fn(&()) + 'static) -> Subscription {
        self.context.on_close(listener)
    }

    /// Escape closes an open modal.
    pub fn handle_key(&self, event: &KeyEvent) -> EventOutcome {
        if !event.is(KEY_ESCAPE) || !self.is_open() {
            return EventOutcome::IGNORED;
        }
        self.context.close();
        EventOutcome::HANDLED
    }

    /// Pointer down anywhere in the document. Closes an open modal when the
    /// target lies outside the mounted content region.
    pub fn handle_pointer_down(&self, inside_content: bool) -> EventOutcome {
        if inside_content || !self.is_open() || self.context.content().get().is_none() {
            return EventOutcome::IGNORED;
        }
        self.context.close();
        EventOutcome { prevent_default: false, stop_propagation: true }
    }

    /// `None` while closed.
    pub fn render(&self, children: Vec<VNode>) -> Option<VNode> {
        if !self.is_open() {
            return None;
        }
        let root = VNode::element(&self.tag)
            .attrs(&self.attrs)
            .attr("id", self.id.as_str())
            .attr("role", "dialog")
            .attr("aria-modal", "true")
            .attr_opt("aria-labelledby", self.context.title().get())
            .children(children);
        Some(VNode::teleport(&self.portal_id, root))
    }
}

/// Region whose inside clicks keep the modal open and which hosts the focus
/// trap.
pub struct ModalContent {
    id: ElementId,
    tag: String,
    context: ModalContext,
}

impl ModalContent {
    pub fn new(context: &ModalContext) -> Self {
        Self::with_tag(context, "div")
    }

    pub fn with_tag(context: &ModalContext, tag: &str) -> Self {
        Self { id: context.next_content_id(), tag: tag.to_string(), context: context.clone() }
    }

    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    pub fn mount(&self) {
        self.context.register_content(&self.id);
    }

    pub fn unmount(&self) {
        self.context.unregister_content(&self.id);
    }

    pub fn render(&self, children: Vec<VNode>) -> VNode {
        VNode::element(&self.tag).attr("id", self.id.as_str()).children(children)
    }
}

/// Accessible label of the dialog.
pub struct ModalTitle {
    id: ElementId,
    tag: String,
    context: ModalContext,
}

impl ModalTitle {
    pub fn new(context: &ModalContext) -> Self {
        Self::with_tag(context, "h2")
    }

    pub fn with_tag(context: &ModalContext, tag: &str) -> Self {
        Self { id: context.next_title_id(), tag: tag.to_string(), context: context.clone() }
    }

    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    pub fn mount(&self) {
        self.context.register_title(&self.id);
    }

    pub fn unmount(&self) {
        self.context.unregister_title(&self.id);
    }

    pub fn render(&self, children: Vec<VNode>) -> VNode {
        VNode::element(&self.tag).attr("id", self.id.as_str()).children(children)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonProps {
    pub tag: String,
    pub disabled: bool,
}

impl Default for ButtonProps {
    fn default() -> Self {
        Self { tag: "button".to_string(), disabled: false }
    }
}

/// Button that closes the modal and reports its activation.
pub struct ModalButton {
    id: ElementId,
    props: ButtonProps,
    context: ModalContext,
    hover: Observable<bool>,
    active: Observable<bool>,
    clicked: EventHook<()>,
}

impl ModalButton {
    pub fn new(context: &ModalContext, props: ButtonProps) -> Self {
        Self {
            id: context.next_button_id(),
            props,
            context: context.clone(),
            hover: Observable::new(false),
            active: Observable::new(false),
            clicked: EventHook::new(),
        }
    }

    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    pub fn is_disabled(&self) -> bool {
        self.props.disabled
    }

    pub fn hover(&self) -> ReadOnly<bool> {
        self.hover.read_only()
    }

    pub fn active(&self) -> ReadOnly<bool> {
        self.active.read_only()
    }

    pub fn on_click(&self, listener: impl Fn(&()) + 'static) -> Subscription {
        self.clicked.on(listener)
    }

    pub fn pointer_enter(&self) {
        if !self.props.disabled {
            self.hover.set(true);
        }
    }

    pub fn pointer_leave(&self) {
        if !self.props.disabled {
            self.hover.set(false);
        }
    }

    pub fn focus(&self) {
        if !self.props.disabled {
            self.active.set(true);
        }
    }

    pub fn blur(&self) {
        if !self.props.disabled {
            self.active.set(false);
        }
    }

    pub fn click(&self) -> EventOutcome {
        if self.props.disabled {
            return EventOutcome::IGNORED;
        }
        self.activate();
        EventOutcome::HANDLED
    }

    /// Enter or Space on the focused button while the modal is open.
    pub fn handle_key(&self, event: &KeyEvent) -> EventOutcome {
        if self.props.disabled || !self.active.get() || !event.is_activation() {
            return EventOutcome::IGNORED;
        }
        if !self.context.is_open() {
            return EventOutcome::IGNORED;
        }
        self.activate();
        EventOutcome::HANDLED
    }

    fn activate(&self) {
        self.clicked.trigger(&());
        self.context.close();
    }

    pub fn render(&self, children: Vec<VNode>) -> VNode {
        let disabled = self.props.disabled;
        let tabindex = (!disabled && self.props.tag != "button").then_some("0");
        VNode::element(&self.props.tag)
            .attr("id", self.id.as_str())
            .attr("role", "button")
            .attr_opt("tabindex", tabindex)
            .attr_opt("aria-disabled", disabled.then_some("true"))
            .children(children)
    }
}
