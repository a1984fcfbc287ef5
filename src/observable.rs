use std::{cell::RefCell, fmt, rc::Rc};

use crate::event::{EventHook, Subscription};

struct Inner<T> {
    value: RefCell<T>,
    changed: EventHook<T>,
}

/// Owned value cell that notifies subscribers whenever it changes.
pub struct Observable<T> {
    inner: Rc<Inner<T>>,
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self { inner: Rc::new(Inner { value: RefCell::new(value), changed: EventHook::new() }) }
    }

    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Stores `value` and notifies subscribers. Returns false when the value
    /// was already current, in which case nobody is notified.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return false;
            }
            *current = value.clone();
        }
        self.inner.changed.trigger(&value);
        true
    }

    pub fn subscribe(&self, listener: impl Fn(&T) + 'static) -> Subscription {
        self.inner.changed.on(listener)
    }

    pub fn read_only(&self) -> ReadOnly<T> {
        ReadOnly { inner: self.inner.clone() }
    }
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Observable").field(&self.inner.value.borrow()).finish()
    }
}

/// Read view of an [`Observable`].
pub struct ReadOnly<T> {
    inner: Rc<Inner<T>>,
}

impl<T: Clone + PartialEq + 'static> ReadOnly<T> {
    /// A view over a value that never changes.
    pub fn constant(value: T) -> Self {
        Observable::new(value).read_only()
    }

    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    pub fn subscribe(&self, listener: impl Fn(&T) + 'static) -> Subscription {
        self.inner.changed.on(listener)
    }
}

impl<T> Clone for ReadOnly<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T: fmt::Debug> fmt::Debug for ReadOnly<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadOnly").field(&self.inner.value.borrow()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn notifies_only_on_change() {
        let cell = Observable::new(1);
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let _sub = cell.subscribe(move |_| h.set(h.get() + 1));

        assert!(!cell.set(1));
        assert!(cell.set(2));
        assert!(cell.set(3));
        assert_eq!(hits.get(), 2);
        assert_eq!(cell.get(), 3);
    }

    #[test]
    fn read_only_view_follows_owner() {
        let cell = Observable::new(String::new());
        let view = cell.read_only();
        let seen = Rc::new(RefCell::new(None));
        let s = seen.clone();
        let _sub = view.subscribe(move |v: &String| *s.borrow_mut() = Some(v.clone()));

        cell.set("0xabc".to_string());
        assert_eq!(view.get(), "0xabc");
        assert_eq!(seen.borrow().as_deref(), Some("0xabc"));
    }

    #[test]
    fn subscriber_can_read_new_value() {
        let cell = Observable::new(false);
        let view = cell.read_only();
        let observed = Rc::new(Cell::new(false));
        let o = observed.clone();
        let _sub = cell.subscribe(move |_| o.set(view.get()));

        cell.set(true);
        assert!(observed.get());
    }
}
