//! Key names and event outcomes shared by the focus trap and the modal
//! components.

pub const KEY_ESCAPE: &str = "Escape";
pub const KEY_TAB: &str = "Tab";
pub const KEY_ENTER: &str = "Enter";
pub const KEY_SPACE: &str = " ";

/// The parts of a keyboard event the components look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: String,
    pub shift: bool,
}

impl KeyEvent {
    pub fn new(key: &str) -> Self {
        Self { key: key.to_string(), shift: false }
    }

    pub fn with_shift(key: &str) -> Self {
        Self { key: key.to_string(), shift: true }
    }

    pub fn is(&self, key: &str) -> bool {
        self.key == key
    }

    /// Enter or Space.
    pub fn is_activation(&self) -> bool {
        self.is(KEY_ENTER) || self.is(KEY_SPACE)
    }
}

impl From<&web_sys::KeyboardEvent> for KeyEvent {
    fn from(event: &web_sys::KeyboardEvent) -> Self {
        Self { key: event.key(), shift: event.shift_key() }
    }
}

/// What a handler wants done with the DOM event it consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventOutcome {
    pub prevent_default: bool,
    pub stop_propagation: bool,
}

impl EventOutcome {
    pub const IGNORED: Self = Self { prevent_default: false, stop_propagation: false };
    pub const HANDLED: Self = Self { prevent_default: true, stop_propagation: true };

    pub fn prevent_default() -> Self {
        Self { prevent_default: true, stop_propagation: false }
    }

    pub fn is_ignored(&self) -> bool {
        *self == Self::IGNORED
    }

    pub fn apply(&self, event: &web_sys::Event) {
        if self.prevent_default {
            event.prevent_default();
        }
        if self.stop_propagation {
            event.stop_propagation();
        }
    }
}
