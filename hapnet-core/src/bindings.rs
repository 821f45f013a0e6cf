//! Synchronous publish-on-write properties and scoped subscriptions.
//!
//! A [`Property`] notifies its subscribers in subscription order before
//! `set` returns. Subscriptions are owned by a [`Binder`] and released
//! together when the binder is dropped, so objects that go away with a
//! scene never outlive their callbacks.

use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

use tracing::warn;

type Callback<T> = Rc<dyn Fn(&T)>;

struct PropertyInner<T> {
    value: RefCell<T>,
    subscribers: RefCell<Vec<(u64, Callback<T>)>>,
    next_subscriber: Cell<u64>,
    notifying: Cell<bool>,
}

/// A shared observable value. Clones share the same underlying slot.
pub struct Property<T> {
    inner: Rc<PropertyInner<T>>,
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Property<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(PropertyInner {
                value: RefCell::new(value),
                subscribers: RefCell::new(Vec::new()),
                next_subscriber: Cell::new(0),
                notifying: Cell::new(false),
            }),
        }
    }

    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Writes the value and synchronously notifies every subscriber, in
    /// subscription order, before returning. Always notifies, even when
    /// the new value compares equal to the old one.
    pub fn set(&self, value: T) {
        if self.inner.notifying.get() {
            warn!("re-entrant property write ignored");
            return;
        }
        *self.inner.value.borrow_mut() = value;
        self.notify();
    }

    fn notify(&self) {
        self.inner.notifying.set(true);
        let subscribers: Vec<Callback<T>> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        let value = self.inner.value.borrow().clone();
        for callback in subscribers {
            callback(&value);
        }
        self.inner.notifying.set(false);
    }

    fn subscribe(&self, callback: Callback<T>) -> u64 {
        let id = self.inner.next_subscriber.get();
        self.inner.next_subscriber.set(id + 1);
        self.inner.subscribers.borrow_mut().push((id, callback));
        id
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BindingId(u64);

/// Registry of property subscriptions with scoped release.
#[derive(Default)]
pub struct Binder {
    bindings: Vec<(BindingId, Box<dyn FnOnce()>)>,
    next_binding: u64,
}

impl Binder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `callback` to `property` and invokes it once with the
    /// current value, so newly bound objects pick up live state.
    pub fn bind<T: Clone + 'static>(
        &mut self,
        property: &Property<T>,
        callback: impl Fn(&T) + 'static,
    ) -> BindingId {
        let callback: Callback<T> = Rc::new(callback);
        let subscriber = property.subscribe(Rc::clone(&callback));
        callback(&property.get());

        let weak = Rc::downgrade(&property.inner);
        let id = BindingId(self.next_binding);
        self.next_binding += 1;
        self.bindings
            .push((id, Box::new(move || unsubscribe(&weak, subscriber))));
        id
    }

    /// Releases one subscription. Unknown ids are ignored.
    pub fn unbind(&mut self, id: BindingId) {
        if let Some(index) = self.bindings.iter().position(|(bid, _)| *bid == id) {
            let (_, release) = self.bindings.swap_remove(index);
            release();
        }
    }

    /// Releases every subscription held by this binder.
    pub fn unbind_all(&mut self) {
        for (_, release) in self.bindings.drain(..) {
            release();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Drop for Binder {
    fn drop(&mut self) {
        self.unbind_all();
    }
}

fn unsubscribe<T>(property: &Weak<PropertyInner<T>>, subscriber: u64) {
    if let Some(inner) = property.upgrade() {
        inner
            .subscribers
            .borrow_mut()
            .retain(|(id, _)| *id != subscriber);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_fires_immediately_with_current_value() {
        let property = Property::new(7);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut binder = Binder::new();
        let sink = Rc::clone(&seen);
        binder.bind(&property, move |value| sink.borrow_mut().push(*value));
        assert_eq!(*seen.borrow(), vec![7]);
    }

    #[test]
    fn set_notifies_in_subscription_order_before_returning() {
        let property = Property::new(0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut binder = Binder::new();
        for tag in ["a", "b", "c"] {
            let sink = Rc::clone(&seen);
            binder.bind(&property, move |value| {
                sink.borrow_mut().push((tag, *value));
            });
        }
        seen.borrow_mut().clear();
        property.set(5);
        assert_eq!(*seen.borrow(), vec![("a", 5), ("b", 5), ("c", 5)]);
    }

    #[test]
    fn unbind_all_stops_notifications() {
        let property = Property::new(0);
        let seen = Rc::new(RefCell::new(0u32));
        let mut binder = Binder::new();
        let sink = Rc::clone(&seen);
        binder.bind(&property, move |_| *sink.borrow_mut() += 1);
        binder.unbind_all();
        property.set(1);
        assert_eq!(*seen.borrow(), 1); // only the initial sync
    }

    #[test]
    fn unbind_releases_a_single_subscription() {
        let property = Property::new(0);
        let first = Rc::new(RefCell::new(0u32));
        let second = Rc::new(RefCell::new(0u32));
        let mut binder = Binder::new();
        let sink = Rc::clone(&first);
        let id = binder.bind(&property, move |_| *sink.borrow_mut() += 1);
        let sink = Rc::clone(&second);
        binder.bind(&property, move |_| *sink.borrow_mut() += 1);
        binder.unbind(id);
        property.set(1);
        assert_eq!(*first.borrow(), 1);
        assert_eq!(*second.borrow(), 2);
    }

    #[test]
    fn dropping_the_binder_releases_subscriptions() {
        let property = Property::new(0);
        let seen = Rc::new(RefCell::new(0u32));
        {
            let mut binder = Binder::new();
            let sink = Rc::clone(&seen);
            binder.bind(&property, move |_| *sink.borrow_mut() += 1);
        }
        property.set(1);
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn reentrant_write_is_ignored() {
        let property = Property::new(0);
        let mut binder = Binder::new();
        let reentrant = property.clone();
        binder.bind(&property, move |value| {
            if *value == 1 {
                reentrant.set(2);
            }
        });
        property.set(1);
        assert_eq!(property.get(), 1);
    }
}
