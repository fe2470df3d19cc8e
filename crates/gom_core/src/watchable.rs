//! Batched change notification
//!
//! A [`Watchable`] does not intercept property writes. Code that changes state
//! calls [`notify`](Watchable::notify) explicitly once the change is complete,
//! and watchers are told about it either immediately or in a batch:
//!
//! - **Immediate** watchers run synchronously inside `notify`, in registration
//!   order.
//! - **Deferred** watchers run at the next [`microtask::checkpoint`]. All
//!   notifications of a synchronous turn are coalesced into one flush; a type
//!   notified twice delivers only its last payload.
//! - **Batch** watchers (deferred wildcards) run once per flush with a map of
//!   every queued type to its last payload.
//!
//! # Example
//!
//! ```rust
//! use gom_core::microtask;
//! use gom_core::watchable::Watchable;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let watchable = Watchable::<i32>::new();
//! let seen = Rc::new(Cell::new(0));
//!
//! let sink = seen.clone();
//! watchable.on_deferred("score", move |value| sink.set(*value));
//!
//! watchable.notify("score", 1);
//! watchable.notify("score", 2);
//! assert_eq!(seen.get(), 0);
//!
//! microtask::checkpoint();
//! assert_eq!(seen.get(), 2);
//! ```
//!
//! Types that need notification embed a `Watchable` field (or use
//! [`Watched`]) rather than inheriting the capability.

use crate::error::{Result, WatchError};
use crate::microtask;
use crate::set_map::SetMap;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::{debug, trace};

new_key_type! {
    /// Handle to a registered watch, used to [`unwatch`](Watchable::unwatch)
    pub struct WatchId;
}

/// Name of an event
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventType(Cow<'static, str>);

impl EventType {
    /// Event type from a static name
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for EventType {
    fn from(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl std::borrow::Borrow<str> for EventType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for EventType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Coalesced notifications delivered to batch watchers, in first-notified order
pub type EventBatch<D> = IndexMap<EventType, D, FxBuildHasher>;

/// A watch callback
pub enum Handler<D> {
    /// Receives the payload of one event type
    Typed(Rc<dyn Fn(&D)>),
    /// Receives every event with its type (wildcard, immediate)
    Any(Rc<dyn Fn(&EventType, &D)>),
    /// Receives every flushed batch (wildcard, deferred)
    Batch(Rc<dyn Fn(&EventBatch<D>)>),
}

impl<D> Handler<D> {
    pub fn typed(f: impl Fn(&D) + 'static) -> Self {
        Handler::Typed(Rc::new(f))
    }

    pub fn any(f: impl Fn(&EventType, &D) + 'static) -> Self {
        Handler::Any(Rc::new(f))
    }

    pub fn batch(f: impl Fn(&EventBatch<D>) + 'static) -> Self {
        Handler::Batch(Rc::new(f))
    }

    fn deliver(&self, ty: &EventType, data: &D) {
        match self {
            Handler::Typed(f) => f(data),
            Handler::Any(f) => f(ty, data),
            Handler::Batch(_) => unreachable!("batch handlers only run from a flush"),
        }
    }
}

impl<D> Clone for Handler<D> {
    fn clone(&self) -> Self {
        match self {
            Handler::Typed(f) => Handler::Typed(f.clone()),
            Handler::Any(f) => Handler::Any(f.clone()),
            Handler::Batch(f) => Handler::Batch(f.clone()),
        }
    }
}

/// Options for [`Watchable::watch`]
pub struct WatchOptions<D> {
    handler: Option<Handler<D>>,
    deferred: bool,
    once: bool,
    signal: Option<CancellationToken>,
}

impl<D> Default for WatchOptions<D> {
    fn default() -> Self {
        Self {
            handler: None,
            deferred: false,
            once: false,
            signal: None,
        }
    }
}

impl<D> WatchOptions<D> {
    /// Empty options; a handler must be set before watching
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with a typed handler
    pub fn typed(f: impl Fn(&D) + 'static) -> Self {
        Self::new().handler(Handler::typed(f))
    }

    /// Options with a wildcard immediate handler
    pub fn any(f: impl Fn(&EventType, &D) + 'static) -> Self {
        Self::new().handler(Handler::any(f))
    }

    /// Options with a wildcard batch handler. Requires `deferred(true)`.
    pub fn batch(f: impl Fn(&EventBatch<D>) + 'static) -> Self {
        Self::new().handler(Handler::batch(f))
    }

    pub fn handler(mut self, handler: Handler<D>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Deliver at the next microtask checkpoint instead of synchronously
    pub fn deferred(mut self, deferred: bool) -> Self {
        self.deferred = deferred;
        self
    }

    /// Remove the watch after its first invocation
    pub fn once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    /// Drop the watch once `signal` is cancelled
    pub fn signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }
}

struct Subscription<D> {
    ty: Option<EventType>,
    handler: Handler<D>,
    deferred: bool,
    once: bool,
    signal: Option<CancellationToken>,
}

impl<D> Subscription<D> {
    fn is_cancelled(&self) -> bool {
        self.signal
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    fn matches(&self, ty: &str) -> bool {
        self.ty.as_ref().map_or(true, |own| own.as_str() == ty)
    }
}

struct Registry<D> {
    subs: SlotMap<WatchId, Subscription<D>>,
    /// Registration order
    order: SmallVec<[WatchId; 8]>,
    /// Typed subscriptions by event type, in registration order
    by_type: SetMap<EventType, WatchId>,
}

impl<D> Registry<D> {
    fn new() -> Self {
        Self {
            subs: SlotMap::with_key(),
            order: SmallVec::new(),
            by_type: SetMap::new(),
        }
    }

    fn insert(&mut self, sub: Subscription<D>) -> WatchId {
        let ty = sub.ty.clone();
        let id = self.subs.insert(sub);
        self.order.push(id);
        if let Some(ty) = ty {
            self.by_type.add(ty, id);
        }
        id
    }

    fn remove(&mut self, id: WatchId) -> bool {
        let Some(sub) = self.subs.remove(id) else {
            return false;
        };
        self.order.retain(|other| *other != id);
        if let Some(ty) = &sub.ty {
            self.by_type.delete(ty, &id);
        }
        true
    }

    /// Handler of a still-registered watch, about to be delivered to
    ///
    /// Watches removed since delivery started yield `None`. A cancelled watch
    /// is dropped instead of delivered, and a `once` watch is spent here.
    fn claim(&mut self, id: WatchId) -> Option<Handler<D>> {
        let sub = self.subs.get(id)?;
        if sub.is_cancelled() {
            self.remove(id);
            return None;
        }
        let (handler, once) = (sub.handler.clone(), sub.once);
        if once {
            self.remove(id);
        }
        Some(handler)
    }

    /// Drop cancelled watches that would see `ty`, whatever their delivery mode
    fn sweep_cancelled(&mut self, ty: &EventType) {
        let cancelled: SmallVec<[WatchId; 4]> = self
            .subs
            .iter()
            .filter(|(_, sub)| sub.is_cancelled() && sub.matches(ty.as_str()))
            .map(|(id, _)| id)
            .collect();
        for id in cancelled {
            trace!(event = %ty, "swept cancelled watch");
            self.remove(id);
        }
    }

    fn immediate_ids(&self, ty: &EventType) -> SmallVec<[WatchId; 8]> {
        self.order
            .iter()
            .copied()
            .filter(|id| {
                self.subs
                    .get(*id)
                    .is_some_and(|sub| !sub.deferred && sub.matches(ty.as_str()))
            })
            .collect()
    }

    fn deferred_typed_ids(&self, ty: &EventType) -> SmallVec<[WatchId; 8]> {
        let Some(ids) = self.by_type.get(ty) else {
            return SmallVec::new();
        };
        ids.iter()
            .copied()
            .filter(|id| self.subs.get(*id).is_some_and(|sub| sub.deferred))
            .collect()
    }

    fn batch_ids(&self) -> SmallVec<[WatchId; 8]> {
        self.order
            .iter()
            .copied()
            .filter(|id| {
                self.subs
                    .get(*id)
                    .is_some_and(|sub| sub.deferred && sub.ty.is_none())
            })
            .collect()
    }

    fn wants_deferred(&self, ty: &EventType) -> bool {
        self.subs
            .values()
            .any(|sub| sub.deferred && !sub.is_cancelled() && sub.matches(ty.as_str()))
    }
}

struct Inner<D> {
    registry: RefCell<Registry<D>>,
    queue: RefCell<EventBatch<D>>,
    flush_scheduled: Cell<bool>,
}

impl<D: Clone + 'static> Inner<D> {
    /// The registry borrow ends before the handler runs, so handlers may
    /// watch, unwatch and notify
    fn claim(&self, id: WatchId) -> Option<Handler<D>> {
        self.registry.borrow_mut().claim(id)
    }

    fn flush(&self) {
        self.flush_scheduled.set(false);
        let batch = std::mem::take(&mut *self.queue.borrow_mut());
        if batch.is_empty() {
            return;
        }
        debug!(events = batch.len(), "flushing notifications");

        for (ty, data) in &batch {
            let ids = self.registry.borrow().deferred_typed_ids(ty);
            for id in ids {
                if let Some(handler) = self.claim(id) {
                    handler.deliver(ty, data);
                }
            }
        }

        let ids = self.registry.borrow().batch_ids();
        for id in ids {
            if let Some(Handler::Batch(f)) = self.claim(id) {
                f(&batch);
            }
        }
    }
}

/// Batched event source
///
/// Not `Send`: a watchable and its handlers live on one thread, and deferred
/// delivery goes through that thread's [`microtask`] queue.
pub struct Watchable<D: Clone + 'static> {
    inner: Rc<Inner<D>>,
}

impl<D: Clone + 'static> Watchable<D> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(Inner {
                registry: RefCell::new(Registry::new()),
                queue: RefCell::new(EventBatch::default()),
                flush_scheduled: Cell::new(false),
            }),
        }
    }

    // =========================================================================
    // NOTIFY
    // =========================================================================

    /// Notify watchers of an event
    ///
    /// Immediate watchers run before this returns. Deferred watchers are
    /// queued for the next microtask checkpoint.
    pub fn notify(&self, ty: impl Into<EventType>, data: D) {
        let ty = ty.into();

        let ids = {
            let mut registry = self.inner.registry.borrow_mut();
            registry.sweep_cancelled(&ty);
            registry.immediate_ids(&ty)
        };
        for id in ids {
            if let Some(handler) = self.inner.claim(id) {
                handler.deliver(&ty, &data);
            }
        }

        if self.inner.registry.borrow().wants_deferred(&ty) {
            trace!(event = %ty, "queued notification");
            self.inner.queue.borrow_mut().insert(ty, data);
            self.schedule_flush();
        }
    }

    fn schedule_flush(&self) {
        if self.inner.flush_scheduled.replace(true) {
            return;
        }
        trace!("scheduled notification flush");

        let inner = Rc::downgrade(&self.inner);
        microtask::queue_microtask(move || {
            if let Some(inner) = inner.upgrade() {
                inner.flush();
            }
        });
    }

    // =========================================================================
    // WATCH
    // =========================================================================

    /// Register a watch
    ///
    /// - `ty: None` with [`Handler::Any`]: every event, immediately
    /// - `ty: None` with [`Handler::Batch`] and `deferred(true)`: every flush
    /// - `ty: Some(..)` with [`Handler::Typed`]: one event type, immediately
    ///   unless `deferred(true)`
    ///
    /// Any other combination is rejected and nothing is registered.
    pub fn watch(&self, ty: Option<EventType>, options: WatchOptions<D>) -> Result<WatchId> {
        let WatchOptions {
            handler,
            deferred,
            once,
            signal,
        } = options;
        let handler = handler.ok_or(WatchError::MissingHandler)?;

        match (&ty, &handler) {
            (Some(ty), Handler::Any(_) | Handler::Batch(_)) => {
                return Err(WatchError::TypedHandlerRequired(ty.to_string()));
            }
            (None, Handler::Typed(_)) => return Err(WatchError::MissingEventType),
            (None, Handler::Batch(_)) if !deferred => {
                return Err(WatchError::BatchRequiresDeferred);
            }
            (None, Handler::Any(_)) if deferred => {
                return Err(WatchError::ImmediateHandlerDeferred);
            }
            _ => {}
        }

        Ok(self.register(Subscription {
            ty,
            handler,
            deferred,
            once,
            signal,
        }))
    }

    /// Watch every event, immediately
    pub fn watch_any(&self, f: impl Fn(&EventType, &D) + 'static) -> WatchId {
        self.register(Subscription {
            ty: None,
            handler: Handler::any(f),
            deferred: false,
            once: false,
            signal: None,
        })
    }

    /// Watch every flushed batch
    pub fn watch_batch(&self, f: impl Fn(&EventBatch<D>) + 'static) -> WatchId {
        self.register(Subscription {
            ty: None,
            handler: Handler::batch(f),
            deferred: true,
            once: false,
            signal: None,
        })
    }

    /// Watch one event type, immediately
    pub fn on(&self, ty: impl Into<EventType>, f: impl Fn(&D) + 'static) -> WatchId {
        self.register(Subscription {
            ty: Some(ty.into()),
            handler: Handler::typed(f),
            deferred: false,
            once: false,
            signal: None,
        })
    }

    /// Watch one event type at the next checkpoint (last payload of the batch)
    pub fn on_deferred(&self, ty: impl Into<EventType>, f: impl Fn(&D) + 'static) -> WatchId {
        self.register(Subscription {
            ty: Some(ty.into()),
            handler: Handler::typed(f),
            deferred: true,
            once: false,
            signal: None,
        })
    }

    /// Watch the next occurrence of one event type, immediately
    pub fn once(&self, ty: impl Into<EventType>, f: impl Fn(&D) + 'static) -> WatchId {
        self.register(Subscription {
            ty: Some(ty.into()),
            handler: Handler::typed(f),
            deferred: false,
            once: true,
            signal: None,
        })
    }

    fn register(&self, sub: Subscription<D>) -> WatchId {
        self.inner.registry.borrow_mut().insert(sub)
    }

    /// Remove a watch. Returns `false` if it was already gone.
    pub fn unwatch(&self, id: WatchId) -> bool {
        self.inner.registry.borrow_mut().remove(id)
    }

    /// Resolve with the payload of the next `ty` event
    ///
    /// Resolves to [`WatchError::Cancelled`] if `signal` fires first and to
    /// [`WatchError::Closed`] if the watchable is dropped first. Dropping the
    /// returned future removes its watch.
    pub fn wait_for(
        &self,
        ty: impl Into<EventType>,
        signal: Option<CancellationToken>,
    ) -> WaitFor<D> {
        let (tx, rx) = oneshot::channel();
        let tx = RefCell::new(Some(tx));

        let id = self.register(Subscription {
            ty: Some(ty.into()),
            handler: Handler::typed(move |data: &D| {
                if let Some(tx) = tx.borrow_mut().take() {
                    let _ = tx.send(data.clone());
                }
            }),
            deferred: false,
            once: true,
            signal: signal.clone(),
        });

        WaitFor {
            rx,
            cancelled: signal.map(|token| Box::pin(token.cancelled_owned())),
            watchable: Rc::downgrade(&self.inner),
            id,
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Check for live watches of `ty` (wildcards included), or any live watch
    pub fn is_watched(&self, ty: Option<&str>) -> bool {
        let registry = self.inner.registry.borrow();
        registry.subs.values().any(|sub| {
            !sub.is_cancelled() && ty.map_or(true, |ty| sub.matches(ty))
        })
    }

    /// Check for a pending notification of `ty`, or any pending notification
    pub fn is_queued(&self, ty: Option<&str>) -> bool {
        let queue = self.inner.queue.borrow();
        match ty {
            Some(ty) => queue.contains_key(ty),
            None => !queue.is_empty(),
        }
    }

    /// Number of registered watches, including cancelled ones not yet removed
    pub fn watcher_count(&self) -> usize {
        self.inner.registry.borrow().subs.len()
    }
}

impl<D: Clone + 'static> Default for Watchable<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Clone + 'static> fmt::Debug for Watchable<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watchable")
            .field("watchers", &self.watcher_count())
            .field("queued", &self.inner.queue.borrow().len())
            .finish()
    }
}

/// Future returned by [`Watchable::wait_for`]
pub struct WaitFor<D: Clone + 'static> {
    rx: oneshot::Receiver<D>,
    cancelled: Option<Pin<Box<WaitForCancellationFutureOwned>>>,
    watchable: Weak<Inner<D>>,
    id: WatchId,
}

impl<D: Clone + 'static> WaitFor<D> {
    fn detach(&self) {
        if let Some(inner) = self.watchable.upgrade() {
            if let Ok(mut registry) = inner.registry.try_borrow_mut() {
                registry.remove(self.id);
            }
        }
    }
}

impl<D: Clone + 'static> Future for WaitFor<D> {
    type Output = Result<D>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        let cancelled = match this.cancelled.as_mut() {
            Some(cancelled) => cancelled.as_mut().poll(cx).is_ready(),
            None => false,
        };

        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(data)) => Poll::Ready(Ok(data)),
            // The sender goes away when a cancelled watch is swept during notify
            Poll::Ready(Err(_)) if cancelled => Poll::Ready(Err(WatchError::Cancelled)),
            Poll::Ready(Err(_)) => Poll::Ready(Err(WatchError::Closed)),
            Poll::Pending if cancelled => {
                this.detach();
                Poll::Ready(Err(WatchError::Cancelled))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<D: Clone + 'static> Drop for WaitFor<D> {
    fn drop(&mut self) {
        self.detach();
    }
}

/// A value paired with its own [`Watchable`]
///
/// Useful for plain data such as `[f32; 16]` matrices that other code mutates
/// in place: mutate through `DerefMut`, then call [`notify`](Self::notify).
pub struct Watched<T, D: Clone + 'static = ()> {
    value: T,
    watchable: Watchable<D>,
}

impl<T, D: Clone + 'static> Watched<T, D> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            watchable: Watchable::new(),
        }
    }

    pub fn watchable(&self) -> &Watchable<D> {
        &self.watchable
    }

    pub fn notify(&self, ty: impl Into<EventType>, data: D) {
        self.watchable.notify(ty, data);
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T, D: Clone + 'static> Deref for Watched<T, D> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T, D: Clone + 'static> DerefMut for Watched<T, D> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}
