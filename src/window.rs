use std::{cell::Cell, rc::Rc};

use gloo::events::EventListener;
use log::debug;

use crate::observable::{Observable, ReadOnly};

/// Vendor variants of the Page Visibility API, in detection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityApi {
    Standard,
    Ms,
    Webkit,
}

impl VisibilityApi {
    pub const DETECTION_ORDER: [Self; 3] = [Self::Standard, Self::Ms, Self::Webkit];

    pub fn hidden_property(&self) -> &'static str {
        match self {
            Self::Standard => "hidden",
            Self::Ms => "msHidden",
            Self::Webkit => "webkitHidden",
        }
    }

    pub fn change_event(&self) -> &'static str {
        match self {
            Self::Standard => "visibilitychange",
            Self::Ms => "msvisibilitychange",
            Self::Webkit => "webkitvisibilitychange",
        }
    }

    /// First variant for which `supported` reports the hidden property.
    pub fn detect(supported: impl Fn(&str) -> bool) -> Option<Self> {
        Self::DETECTION_ORDER.into_iter().find(|api| supported(api.hidden_property()))
    }
}

/// Combines visibility and focus signals. Active means visible and focused.
#[derive(Debug, Clone)]
pub struct ActivityTracker {
    visible: Rc<Cell<bool>>,
    focused: Rc<Cell<bool>>,
    active: Observable<bool>,
}

impl ActivityTracker {
    pub fn new(visible: bool, focused: bool) -> Self {
        Self {
            visible: Rc::new(Cell::new(visible)),
            focused: Rc::new(Cell::new(focused)),
            active: Observable::new(visible && focused),
        }
    }

    pub fn active(&self) -> ReadOnly<bool> {
        self.active.read_only()
    }

    pub fn on_visibility_change(&self, hidden: bool) {
        self.visible.set(!hidden);
        self.update();
    }

    pub fn on_blur(&self) {
        self.focused.set(false);
        self.update();
    }

    pub fn on_focus(&self) {
        self.focused.set(true);
        self.update();
    }

    fn update(&self) {
        self.active.set(self.visible.get() && self.focused.get());
    }
}

/// Reactive "tab is in the foreground" flag backed by document and window
/// listeners. The listeners live as long as this value.
pub struct WindowActivity {
    active: ReadOnly<bool>,
    listeners: Vec<EventListener>,
}

impl WindowActivity {
    /// Starts tracking. Without a browser window or any visibility API the
    /// result is a constant `fallback`.
    pub fn track(fallback: bool) -> Self {
        listen().unwrap_or_else(|| {
            debug!("Window activity unavailable, using fallback {fallback}");
            Self::constant(fallback)
        })
    }

    pub fn constant(value: bool) -> Self {
        Self { active: ReadOnly::constant(value), listeners: Vec::new() }
    }

    pub fn active(&self) -> ReadOnly<bool> {
        self.active.clone()
    }

    pub fn is_tracking(&self) -> bool {
        !self.listeners.is_empty()
    }
}

#[cfg(target_arch = "wasm32")]
fn listen() -> Option<WindowActivity> {
    use wasm_bindgen::JsValue;

    let window = web_sys::window()?;
    let document = window.document()?;
    let hidden = {
        let document = document.clone();
        move |property: &str| js_sys::Reflect::get(&document, &JsValue::from_str(property)).ok()
    };
    let api =
        VisibilityApi::detect(|property| hidden(property).is_some_and(|v| !v.is_undefined()))?;
    let property = api.hidden_property();
    let is_hidden = move || hidden(property).and_then(|v| v.as_bool()).unwrap_or(false);

    let tracker = ActivityTracker::new(!is_hidden(), document.has_focus().unwrap_or(true));

    let visibility = {
        let tracker = tracker.clone();
        EventListener::new(&document, api.change_event(), move |_| {
            tracker.on_visibility_change(is_hidden())
        })
    };
    let blur = {
        let tracker = tracker.clone();
        EventListener::new(&window, "blur", move |_| tracker.on_blur())
    };
    let focus = {
        let tracker = tracker.clone();
        EventListener::new(&window, "focus", move |_| tracker.on_focus())
    };

    Some(WindowActivity { active: tracker.active(), listeners: vec![visibility, blur, focus] })
}

#[cfg(not(target_arch = "wasm32"))]
fn listen() -> Option<WindowActivity> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_or_blurred_is_inactive() {
        let tracker = ActivityTracker::new(true, true);
        let active = tracker.active();
        assert!(active.get());

        tracker.on_visibility_change(true);
        assert!(!active.get());
        tracker.on_visibility_change(false);
        assert!(active.get());

        tracker.on_blur();
        assert!(!active.get());
        tracker.on_focus();
        assert!(active.get());
    }

    #[test]
    fn visible_again_while_blurred_stays_inactive() {
        let tracker = ActivityTracker::new(true, true);
        tracker.on_visibility_change(true);
        tracker.on_blur();
        tracker.on_visibility_change(false);
        assert!(!tracker.active().get());

        tracker.on_focus();
        assert!(tracker.active().get());
    }

    #[test]
    fn focus_while_hidden_stays_inactive() {
        let tracker = ActivityTracker::new(true, true);
        tracker.on_visibility_change(true);
        tracker.on_focus();
        assert!(!tracker.active().get());

        tracker.on_visibility_change(false);
        assert!(tracker.active().get());
    }

    #[test]
    fn detection_prefers_standard_then_ms_then_webkit() {
        assert_eq!(VisibilityApi::detect(|_| true), Some(VisibilityApi::Standard));
        assert_eq!(VisibilityApi::detect(|p| p != "hidden"), Some(VisibilityApi::Ms));
        assert_eq!(VisibilityApi::detect(|p| p == "webkitHidden"), Some(VisibilityApi::Webkit));
        assert_eq!(VisibilityApi::detect(|_| false), None);
        assert_eq!(VisibilityApi::Webkit.change_event(), "webkitvisibilitychange");
    }

    #[test]
    fn falls_back_without_a_window() {
        let activity = WindowActivity::track(false);
        assert!(!activity.is_tracking());
        assert!(!activity.active().get());
        assert!(WindowActivity::track(true).active().get());
    }
}
