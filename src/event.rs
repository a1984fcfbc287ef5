use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::{Rc, Weak},
};

type Listener<T> = Rc<dyn Fn(&T)>;

struct Listeners<T> {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(u64, Listener<T>)>>,
}

/// Publish/subscribe channel with synchronous, in-registration-order fan-out.
pub struct EventHook<T> {
    listeners: Rc<Listeners<T>>,
}

impl<T: 'static> EventHook<T> {
    pub fn new() -> Self {
        let listeners = Listeners { next_id: Cell::new(0), entries: RefCell::new(Vec::new()) };
        Self { listeners: Rc::new(listeners) }
    }

    /// Registers `listener`. The returned [`Subscription`] is the only way to
    /// remove it again.
    pub fn on(&self, listener: impl Fn(&T) + 'static) -> Subscription {
        let id = self.listeners.next_id.get();
        self.listeners.next_id.set(id + 1);
        self.listeners.entries.borrow_mut().push((id, Rc::new(listener)));

        let weak: Weak<Listeners<T>> = Rc::downgrade(&self.listeners);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(listeners) = weak.upgrade() {
                    listeners.entries.borrow_mut().retain(|(entry, _)| *entry != id);
                }
            })),
        }
    }

    /// Delivers `value` to every listener registered at the time of the call.
    pub fn trigger(&self, value: &T) {
        // Snapshot so listeners can (un)register while we iterate.
        let snapshot: Vec<Listener<T>> =
            self.listeners.entries.borrow().iter().map(|(_, l)| l.clone()).collect();
        for listener in snapshot {
            listener(value);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.listeners.entries.borrow_mut().clear();
    }
}

impl<T: 'static> Default for EventHook<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventHook<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHook")
            .field("listeners", &self.listeners.entries.borrow().len())
            .finish()
    }
}

/// Handle returned by [`EventHook::on`].
///
/// Dropping it keeps the listener registered; call [`Subscription::unsubscribe`]
/// to remove it.
#[must_use = "a listener can only be removed through its subscription"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }

    /// Combines several subscriptions into one that removes all of them.
    pub fn merge(subscriptions: Vec<Subscription>) -> Self {
        Self {
            detach: Some(Box::new(move || {
                for subscription in subscriptions {
                    subscription.unsubscribe();
                }
            })),
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("active", &self.detach.is_some()).finish()
    }
}
