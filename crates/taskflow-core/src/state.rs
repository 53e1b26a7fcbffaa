//! Dual-channel state cell.
//!
//! # Responsibility
//! - Hold one value as the single source of truth.
//! - Expose it as a pull channel (`read`) and a push channel (`subscribe`),
//!   plus computed values (`derive`) over either.
//!
//! # Invariants
//! - `set`/`update` store the value and deliver it to every observer, in
//!   subscription order, before returning.
//! - A `set` issued from inside an observer stores the value at once but its
//!   delivery is queued behind the round in progress.
//! - An observer never receives a value older than one it already received.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::task::{Context, Poll};

use futures::channel::mpsc::{self, UnboundedReceiver};
use futures::{Stream, StreamExt};
use tracing::{trace, warn};

type Observer<T> = Box<dyn FnMut(&T) + Send>;

struct Slot<T> {
    id: u64,
    /// Version of the last value delivered to this observer.
    seen: u64,
    observer: Observer<T>,
}

struct Inner<T> {
    value: T,
    version: u64,
    slots: Vec<Slot<T>>,
    next_id: u64,
    delivering: bool,
    backlog: VecDeque<(u64, T)>,
    /// Cancellations that arrived while their slot was out for delivery.
    cancelled: Vec<u64>,
}

fn lock<T>(inner: &Mutex<Inner<T>>) -> MutexGuard<'_, Inner<T>> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A value readable synchronously and observable as a sequence.
///
/// Clones share the same underlying value.
pub struct StateCell<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for StateCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> StateCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                value,
                version: 0,
                slots: Vec::new(),
                next_id: 0,
                delivering: false,
                backlog: VecDeque::new(),
                cancelled: Vec::new(),
            })),
        }
    }

    /// Current value. Never blocks on observers.
    pub fn read(&self) -> T {
        lock(&self.inner).value.clone()
    }

    /// Borrow the current value without cloning it.
    ///
    /// `f` runs under the cell's lock and must not touch this cell.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&lock(&self.inner).value)
    }

    /// Replace the value and notify observers.
    pub fn set(&self, value: T) {
        self.update(move |current| *current = value);
    }

    /// Modify the value in place and notify observers.
    ///
    /// The read-modify-write is atomic with respect to other updates. `f`
    /// runs under the cell's lock and must not touch this cell.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut inner = lock(&self.inner);
        let out = f(&mut inner.value);
        inner.version += 1;
        let entry = (inner.version, inner.value.clone());
        inner.backlog.push_back(entry);

        if inner.delivering {
            trace!(version = inner.version, "Queued nested state update");
            return out;
        }
        inner.delivering = true;
        self.drain(inner);
        out
    }

    /// Register an observer.
    ///
    /// The observer receives the current value immediately, then every later
    /// value until the returned subscription is cancelled or dropped.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: FnMut(&T) + Send + 'static,
    {
        let mut observer: Observer<T> = Box::new(observer);

        let (id, seen, current, owns_round) = {
            let mut inner = lock(&self.inner);
            let id = inner.next_id;
            inner.next_id += 1;
            let owns_round = !inner.delivering;
            inner.delivering = true;
            (id, inner.version, inner.value.clone(), owns_round)
        };

        let round = owns_round.then(|| Round::new(&self.inner, Vec::new()));
        observer(&current);
        if let Some(round) = round {
            round.finish();
        }

        let mut inner = lock(&self.inner);
        inner.slots.push(Slot { id, seen, observer });
        if owns_round {
            self.drain(inner);
        }

        let weak: Weak<Mutex<Inner<T>>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                let mut inner = lock(&inner);
                if let Some(pos) = inner.slots.iter().position(|s| s.id == id) {
                    inner.slots.remove(pos);
                } else if inner.delivering {
                    inner.cancelled.push(id);
                }
            }
        })
    }

    /// A stream of the current value followed by every later value.
    pub fn stream(&self) -> StateStream<T> {
        let (tx, rx) = mpsc::unbounded();
        let subscription = self.subscribe(move |value: &T| {
            let _ = tx.unbounded_send(value.clone());
        });
        StateStream { rx, subscription }
    }

    /// A computed view over this cell.
    pub fn derive<U, F>(&self, f: F) -> Derived<U>
    where
        U: 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let read = {
            let cell = self.clone();
            let f = Arc::clone(&f);
            Arc::new(move || cell.with(|value| f(value))) as Arc<dyn Fn() -> U + Send + Sync>
        };
        let cell = self.clone();
        let subscribe = Arc::new(move |mut observer: Box<dyn FnMut(&U) + Send>| {
            let f = Arc::clone(&f);
            cell.subscribe(move |value: &T| observer(&f(value)))
        });
        Derived { read, subscribe }
    }

    /// Number of live observers.
    pub fn observer_count(&self) -> usize {
        lock(&self.inner).slots.len()
    }

    /// Deliver queued values until the backlog is empty. The caller must have
    /// set `delivering`.
    fn drain<'a>(&'a self, mut inner: MutexGuard<'a, Inner<T>>) {
        while let Some((version, value)) = inner.backlog.pop_front() {
            let slots = std::mem::take(&mut inner.slots);
            drop(inner);

            let mut round = Round::new(&self.inner, slots);
            for slot in round.slots.iter_mut() {
                if slot.seen >= version || self.is_cancelled(slot.id) {
                    continue;
                }
                slot.seen = version;
                (slot.observer)(&value);
            }
            let mut slots = round.finish();

            inner = lock(&self.inner);
            // Observers registered mid-round go after the existing ones.
            slots.append(&mut inner.slots);
            let cancelled = std::mem::take(&mut inner.cancelled);
            slots.retain(|s| !cancelled.contains(&s.id));
            inner.slots = slots;
        }
        inner.delivering = false;
    }

    fn is_cancelled(&self, id: u64) -> bool {
        lock(&self.inner).cancelled.contains(&id)
    }
}

/// Slots taken out for one delivery round.
///
/// If an observer unwinds, dropping the round puts the slots back and ends
/// delivery so later updates are still pushed.
struct Round<'a, T> {
    inner: &'a Mutex<Inner<T>>,
    slots: Vec<Slot<T>>,
    finished: bool,
}

impl<'a, T> Round<'a, T> {
    fn new(inner: &'a Mutex<Inner<T>>, slots: Vec<Slot<T>>) -> Self {
        Self {
            inner,
            slots,
            finished: false,
        }
    }

    fn finish(mut self) -> Vec<Slot<T>> {
        self.finished = true;
        std::mem::take(&mut self.slots)
    }
}

impl<T> Drop for Round<'_, T> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut inner = lock(self.inner);
        let mut slots = std::mem::take(&mut self.slots);
        slots.append(&mut inner.slots);
        let cancelled = std::mem::take(&mut inner.cancelled);
        slots.retain(|s| !cancelled.contains(&s.id));
        inner.slots = slots;
        inner.delivering = false;
        warn!("Observer panicked, delivery round abandoned");
    }
}

impl<T: Default + Clone + Send + 'static> Default for StateCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for StateCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("StateCell")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("observers", &inner.slots.len())
            .finish()
    }
}

type SubscribeFn<U> = Arc<dyn Fn(Box<dyn FnMut(&U) + Send>) -> Subscription + Send + Sync>;

/// A read-only value computed from a `StateCell`.
///
/// Computed on demand, so it can never disagree with its source.
pub struct Derived<U> {
    read: Arc<dyn Fn() -> U + Send + Sync>,
    subscribe: SubscribeFn<U>,
}

impl<U> Clone for Derived<U> {
    fn clone(&self) -> Self {
        Self {
            read: Arc::clone(&self.read),
            subscribe: Arc::clone(&self.subscribe),
        }
    }
}

impl<U: 'static> Derived<U> {
    pub fn read(&self) -> U {
        (self.read)()
    }

    /// Same delivery contract as `StateCell::subscribe`. Observers are called
    /// on every source change, even when the computed value is unchanged.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: FnMut(&U) + Send + 'static,
    {
        (self.subscribe)(Box::new(observer))
    }

    /// Chain another computation.
    pub fn map<V, G>(&self, g: G) -> Derived<V>
    where
        V: 'static,
        G: Fn(&U) -> V + Send + Sync + 'static,
    {
        let g = Arc::new(g);
        let read = {
            let read = Arc::clone(&self.read);
            let g = Arc::clone(&g);
            Arc::new(move || g(&read())) as Arc<dyn Fn() -> V + Send + Sync>
        };
        let parent = Arc::clone(&self.subscribe);
        let subscribe = Arc::new(move |mut observer: Box<dyn FnMut(&V) + Send>| {
            let g = Arc::clone(&g);
            parent(Box::new(move |value: &U| observer(&g(value))))
        });
        Derived { read, subscribe }
    }
}

impl<U: Clone + Send + 'static> Derived<U> {
    pub fn stream(&self) -> StateStream<U> {
        let (tx, rx) = mpsc::unbounded();
        let subscription = self.subscribe(move |value: &U| {
            let _ = tx.unbounded_send(value.clone());
        });
        StateStream { rx, subscription }
    }
}

/// Handle to a registered observer. Dropping it cancels the observer.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stop delivery. Calling it again does nothing.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Stream adapter over a subscription. Unbounded, so no value is dropped.
pub struct StateStream<T> {
    rx: UnboundedReceiver<T>,
    subscription: Subscription,
}

impl<T> StateStream<T> {
    /// Stop the underlying subscription. Already-queued values still drain.
    pub fn cancel(&mut self) {
        self.subscription.cancel();
    }
}

impl<T> Stream for StateStream<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().rx.poll_next_unpin(cx)
    }
}
