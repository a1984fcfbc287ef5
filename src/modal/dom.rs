//! Browser side of the modal components: portal lookup, materializing
//! [`VNode`] trees and wiring DOM listeners to component handlers.

use std::{cell::RefCell, rc::Rc};

use gloo::events::{EventListener, EventListenerOptions};
use gloo_utils::errors::JsError;
use log::debug;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, KeyboardEvent, Node};

use super::{
    components::{Modal, ModalButton},
    vnode::VNode,
};
use crate::{event::Subscription, focus::DomFocusTrap, keyboard::KeyEvent, Error};

pub(crate) fn js_error(value: JsValue) -> Error {
    match JsError::try_from(value) {
        Ok(err) => Error::Js(err),
        Err(err) => Error::JsValue(err.to_string()),
    }
}

/// Returns the element with `id`, appending an empty `<div id=..>` to the
/// body first if there is none.
pub fn get_or_create_portal(document: &Document, id: &str) -> Result<Element, Error> {
    if let Some(existing) = document.get_element_by_id(id) {
        return Ok(existing);
    }
    let portal = document.create_element("div").map_err(js_error)?;
    portal.set_id(id);
    let body = document.body().ok_or_else(|| Error::JsValue("document has no body".into()))?;
    body.append_child(&portal).map_err(js_error)?;
    debug!("Created modal portal {id}");
    Ok(portal)
}

/// Appends `node` to `parent`. Teleports replace the content of their portal.
pub fn render_into(document: &Document, parent: &Node, node: &VNode) -> Result<(), Error> {
    match node {
        VNode::Text(text) => {
            parent.append_child(&document.create_text_node(text)).map_err(js_error)?;
        }
        VNode::Element { tag, attrs, children } => {
            let element = document.create_element(tag).map_err(js_error)?;
            for (name, value) in attrs {
                element.set_attribute(name, value).map_err(js_error)?;
            }
            for child in children {
                render_into(document, &element, child)?;
            }
            parent.append_child(&element).map_err(js_error)?;
        }
        VNode::Teleport { to, child } => {
            let portal = get_or_create_portal(document, to)?;
            portal.set_inner_html("");
            render_into(document, &portal, child)?;
        }
    }
    Ok(())
}

/// Renders `modal` into its portal, or empties the portal while closed.
pub fn render_modal(document: &Document, modal: &Modal, children: Vec<VNode>) -> Result<(), Error> {
    match modal.render(children) {
        Some(tree) => render_into(document, document, &tree),
        None => {
            if let Some(portal) = document.get_element_by_id(modal.portal_id()) {
                portal.set_inner_html("");
            }
            Ok(())
        }
    }
}

/// Window listeners routing Escape and outside pointer presses to a
/// [`Modal`], plus the focus trap on its content region.
pub struct ModalListeners {
    _keydown: EventListener,
    _pointerdown: EventListener,
    focus_trap_request: Option<Subscription>,
    focus_release: Option<Subscription>,
}

impl ModalListeners {
    pub fn attach(modal: Rc<Modal>) -> Option<Self> {
        let window = web_sys::window()?;
        let document = window.document()?;

        let keydown = {
            let modal = modal.clone();
            EventListener::new_with_options(
                &window,
                "keydown",
                EventListenerOptions::enable_prevent_default(),
                move |event| {
                    if let Some(event) = event.dyn_ref::<KeyboardEvent>() {
                        modal.handle_key(&KeyEvent::from(event)).apply(event);
                    }
                },
            )
        };

        let pointerdown = {
            let modal = modal.clone();
            let document = document.clone();
            EventListener::new(&window, "pointerdown", move |event| {
                let target = event.target().and_then(|t| t.dyn_into::<Node>().ok());
                let inside = modal
                    .context()
                    .content()
                    .get()
                    .and_then(|id| document.get_element_by_id(&id))
                    .is_some_and(|content| content.contains(target.as_ref()));
                modal.handle_pointer_down(inside).apply(event);
            })
        };

        // Dropping a trap removes its keydown listener.
        let trap = Rc::new(RefCell::new(None::<DomFocusTrap>));
        let focus_trap_request = {
            let trap = trap.clone();
            modal.context().on_focus_trap(move |id| {
                *trap.borrow_mut() = document
                    .get_element_by_id(id)
                    .and_then(|content| DomFocusTrap::apply(&content));
            })
        };
        let focus_release = modal.context().on_focus_release(move |_| {
            if trap.borrow_mut().take().is_some() {
                debug!("Focus trap released");
            }
        });

        Some(Self {
            _keydown: keydown,
            _pointerdown: pointerdown,
            focus_trap_request: Some(focus_trap_request),
            focus_release: Some(focus_release),
        })
    }
}

impl Drop for ModalListeners {
    fn drop(&mut self) {
        let subscriptions = [self.focus_trap_request.take(), self.focus_release.take()];
        for subscription in subscriptions.into_iter().flatten() {
            subscription.unsubscribe();
        }
    }
}

/// DOM listeners feeding a rendered [`ModalButton`].
pub struct ButtonListeners {
    _listeners: Vec<EventListener>,
}

impl ButtonListeners {
    pub fn attach(element: &Element, button: Rc<ModalButton>) -> Self {
        let mut listeners = Vec::new();

        for event in ["pointermove", "mousemove"] {
            let button = button.clone();
            listeners.push(EventListener::new(element, event, move |_| button.pointer_enter()));
        }
        for event in ["pointerleave", "mouseleave"] {
            let button = button.clone();
            listeners.push(EventListener::new(element, event, move |_| button.pointer_leave()));
        }
        {
            let button = button.clone();
            listeners.push(EventListener::new(element, "focus", move |_| button.focus()));
        }
        {
            let button = button.clone();
            listeners.push(EventListener::new(element, "blur", move |_| button.blur()));
        }
        {
            let button = button.clone();
            listeners.push(EventListener::new_with_options(
                element,
                "click",
                EventListenerOptions::enable_prevent_default(),
                move |event| button.click().apply(event),
            ));
        }
        listeners.push(EventListener::new_with_options(
            element,
            "keydown",
            EventListenerOptions::enable_prevent_default(),
            move |event| {
                if let Some(event) = event.dyn_ref::<KeyboardEvent>() {
                    button.handle_key(&KeyEvent::from(event)).apply(event);
                }
            },
        ));

        Self { _listeners: listeners }
    }
}
