use std::rc::Rc;

use gloo::{
    events::{EventListener, EventListenerOptions},
    render::{request_animation_frame, AnimationFrame},
};
use log::warn;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, KeyboardEvent};

use crate::keyboard::{EventOutcome, KeyEvent, KEY_TAB};

/// Native interactive tags, editable regions and elements with a
/// non-negative tab index.
pub const FOCUSABLE_ELEMENTS_QUERY: &str = concat!(
    "button:not([disabled]), ",
    "select:not([disabled]), ",
    "a[href]:not([disabled]), ",
    "area[href]:not([disabled]), ",
    "[contentEditable=\"\"]:not([disabled]), ",
    "[contentEditable=\"true\"]:not([disabled]), ",
    "[contentEditable=\"TRUE\"]:not([disabled]), ",
    "textarea:not([disabled]), ",
    "iframe:not([disabled]), ",
    "input:not([disabled]), ",
    "summary:not([disabled]), ",
    "[tabindex]:not([tabindex=\"-1\"])",
);

/// A container whose focusable descendants a [`FocusTrap`] cycles through.
pub trait FocusScope {
    type Element: Clone + PartialEq;

    /// Focusable descendants in document order.
    fn focusable_elements(&self) -> Vec<Self::Element>;

    fn active_element(&self) -> Option<Self::Element>;

    fn focus(&self, element: &Self::Element);
}

/// Keeps Tab navigation inside a scope.
pub struct FocusTrap<S: FocusScope> {
    scope: S,
    first: S::Element,
    last: S::Element,
}

impl<S: FocusScope> FocusTrap<S> {
    /// `None` when the scope has nothing focusable.
    pub fn new(scope: S) -> Option<Self> {
        let elements = scope.focusable_elements();
        let first = elements.first()?.clone();
        let last = elements.last()?.clone();
        Some(Self { scope, first, last })
    }

    pub fn focus_first(&self) {
        self.scope.focus(&self.first);
    }

    /// Wraps Tab from the last element and Shift+Tab from the first one.
    pub fn handle_key(&self, event: &KeyEvent) -> EventOutcome {
        if !event.is(KEY_TAB) {
            return EventOutcome::IGNORED;
        }
        let active = self.scope.active_element();
        let target = match (event.shift, active) {
            (false, Some(active)) if active == self.last => &self.first,
            (true, Some(active)) if active == self.first => &self.last,
            _ => return EventOutcome::IGNORED,
        };
        self.scope.focus(target);
        EventOutcome::prevent_default()
    }
}

struct DomScope {
    container: Element,
    document: Document,
}

impl FocusScope for DomScope {
    type Element = HtmlElement;

    fn focusable_elements(&self) -> Vec<HtmlElement> {
        let Ok(nodes) = self.container.query_selector_all(FOCUSABLE_ELEMENTS_QUERY) else {
            return Vec::new();
        };
        (0..nodes.length())
            .filter_map(|index| nodes.get(index))
            .filter_map(|node| node.dyn_into::<HtmlElement>().ok())
            .collect()
    }

    fn active_element(&self) -> Option<HtmlElement> {
        self.document.active_element()?.dyn_into().ok()
    }

    fn focus(&self, element: &HtmlElement) {
        if let Err(err) = element.focus() {
            warn!("Failed to move focus: {err:?}");
        }
    }
}

/// A [`FocusTrap`] bound to a mounted DOM container. Dropping it removes the
/// keydown listener.
pub struct DomFocusTrap {
    _keydown: EventListener,
    _initial_focus: AnimationFrame,
}

impl DomFocusTrap {
    /// Focuses the first focusable descendant on the next frame and starts
    /// trapping Tab. `None` when nothing inside `container` can take focus.
    pub fn apply(container: &Element) -> Option<Self> {
        let document = container.owner_document()?;
        let trap = Rc::new(FocusTrap::new(DomScope { container: container.clone(), document })?);

        let initial_focus = {
            let trap = trap.clone();
            request_animation_frame(move |_| trap.focus_first())
        };
        let keydown = EventListener::new_with_options(
            container,
            "keydown",
            EventListenerOptions::enable_prevent_default(),
            move |event| {
                if let Some(event) = event.dyn_ref::<KeyboardEvent>() {
                    trap.handle_key(&KeyEvent::from(event)).apply(event);
                }
            },
        );
        Some(Self { _keydown: keydown, _initial_focus: initial_focus })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;

    struct FakeScope {
        elements: Vec<u32>,
        active: Rc<Cell<Option<u32>>>,
        focused: Rc<RefCell<Vec<u32>>>,
    }

    impl FocusScope for FakeScope {
        type Element = u32;

        fn focusable_elements(&self) -> Vec<u32> {
            self.elements.clone()
        }

        fn active_element(&self) -> Option<u32> {
            self.active.get()
        }

        fn focus(&self, element: &u32) {
            self.active.set(Some(*element));
            self.focused.borrow_mut().push(*element);
        }
    }

    type Trapped = (Option<FocusTrap<FakeScope>>, Rc<Cell<Option<u32>>>, Rc<RefCell<Vec<u32>>>);

    fn trap(elements: Vec<u32>) -> Trapped {
        let active = Rc::new(Cell::new(None));
        let focused = Rc::new(RefCell::new(Vec::new()));
        let scope = FakeScope { elements, active: active.clone(), focused: focused.clone() };
        (FocusTrap::new(scope), active, focused)
    }

    #[test]
    fn empty_scope_is_a_no_op() {
        let (trap, _, _) = trap(Vec::new());
        assert!(trap.is_none());
    }

    #[test]
    fn focuses_first_element() {
        let (trap, active, _) = trap(vec![1, 2, 3]);
        trap.unwrap().focus_first();
        assert_eq!(active.get(), Some(1));
    }

    #[test]
    fn tab_on_last_wraps_to_first() {
        let (trap, active, _) = trap(vec![1, 2, 3]);
        let trap = trap.unwrap();
        active.set(Some(3));

        let outcome = trap.handle_key(&KeyEvent::new(KEY_TAB));
        assert!(outcome.prevent_default);
        assert_eq!(active.get(), Some(1));
    }

    #[test]
    fn shift_tab_on_first_wraps_to_last() {
        let (trap, active, _) = trap(vec![1, 2, 3]);
        let trap = trap.unwrap();
        active.set(Some(1));

        let outcome = trap.handle_key(&KeyEvent::with_shift(KEY_TAB));
        assert!(outcome.prevent_default);
        assert_eq!(active.get(), Some(3));
    }

    #[test]
    fn other_keys_and_positions_pass_through() {
        let (trap, active, focused) = trap(vec![1, 2, 3]);
        let trap = trap.unwrap();

        active.set(Some(2));
        assert!(trap.handle_key(&KeyEvent::new(KEY_TAB)).is_ignored());
        assert!(trap.handle_key(&KeyEvent::with_shift(KEY_TAB)).is_ignored());

        active.set(Some(3));
        assert!(trap.handle_key(&KeyEvent::new("a")).is_ignored());
        assert!(trap.handle_key(&KeyEvent::with_shift(KEY_TAB)).is_ignored());
        assert!(focused.borrow().is_empty());
    }

    #[test]
    fn single_element_wraps_onto_itself() {
        let (trap, active, focused) = trap(vec![7]);
        let trap = trap.unwrap();
        active.set(Some(7));
        assert!(trap.handle_key(&KeyEvent::new(KEY_TAB)).prevent_default);
        assert!(trap.handle_key(&KeyEvent::with_shift(KEY_TAB)).prevent_default);
        assert_eq!(*focused.borrow(), vec![7, 7]);
    }
}
