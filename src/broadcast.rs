//! Ordered fan-out of inbound events to independent subscribers.
//!
//! A [`Broadcast`] keeps a list of subscribers, each with its own unbounded
//! queue and an optional filter. Publishing walks the list once, in
//! subscription order, so every subscriber sees events in publish order.
//! A [`Subscription`] is a [`Stream`]; dropping it (or calling
//! [`Subscription::unsubscribe`]) removes it from the list without
//! affecting anyone else.
//!
//! The broadcast terminates exactly once: [`complete`](Broadcast::complete)
//! ends every stream, [`fail`](Broadcast::fail) delivers one `Err` and then
//! ends every stream. Subscribing after termination replays the terminal
//! event.

use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;

use crate::error::ProtocolError;

/// Terminal failure shared by every subscriber.
pub type StreamError = Arc<ProtocolError>;

/// Item yielded by a [`Subscription`].
pub type StreamItem<T> = Result<T, StreamError>;

type Filter<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

struct Subscriber<T> {
    id: u64,
    filter: Option<Filter<T>>,
    tx: mpsc::UnboundedSender<StreamItem<T>>,
}

impl<T> Subscriber<T> {
    fn wants(&self, item: &T) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(item))
    }
}

enum Terminal {
    Completed,
    Failed(StreamError),
}

struct Shared<T> {
    next_id: u64,
    subscribers: Vec<Subscriber<T>>,
    terminal: Option<Terminal>,
}

/// A broadcast point for events of type `T`.
pub struct Broadcast<T> {
    shared: Arc<Mutex<Shared<T>>>,
}

impl<T> Clone for Broadcast<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for Broadcast<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(shared: &Mutex<Shared<T>>) -> MutexGuard<'_, Shared<T>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T> Broadcast<T> {
    /// Create a broadcast with no subscribers.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                next_id: 0,
                subscribers: Vec::new(),
                terminal: None,
            })),
        }
    }

    /// Subscribe to every future event.
    pub fn subscribe(&self) -> Subscription<T> {
        self.register(None)
    }

    /// Subscribe to future events for which `filter` returns `true`.
    ///
    /// Terminal events are always delivered.
    pub fn subscribe_filtered<F>(&self, filter: F) -> Subscription<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.register(Some(Box::new(filter)))
    }

    fn register(&self, filter: Option<Filter<T>>) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut shared = lock(&self.shared);
        let id = shared.next_id;
        shared.next_id += 1;

        match &shared.terminal {
            // Dropping `tx` here ends the stream right after the replay.
            Some(Terminal::Failed(error)) => {
                let _ = tx.send(Err(Arc::clone(error)));
            }
            Some(Terminal::Completed) => {}
            None => shared.subscribers.push(Subscriber { id, filter, tx }),
        }

        Subscription {
            id,
            rx,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.shared).subscribers.len()
    }

    /// Whether the broadcast has completed or failed.
    pub fn is_terminated(&self) -> bool {
        lock(&self.shared).terminal.is_some()
    }

    /// Deliver `item` to every interested subscriber, in subscription order.
    ///
    /// Returns how many subscribers received it. Subscribers whose stream
    /// was dropped are pruned along the way. Nothing is delivered after
    /// termination.
    pub fn publish(&self, item: &T) -> usize
    where
        T: Clone,
    {
        let mut shared = lock(&self.shared);
        if shared.terminal.is_some() {
            return 0;
        }

        let mut delivered = 0;
        shared.subscribers.retain(|subscriber| {
            if !subscriber.wants(item) {
                return !subscriber.tx.is_closed();
            }
            let sent = subscriber.tx.send(Ok(item.clone())).is_ok();
            delivered += usize::from(sent);
            sent
        });
        delivered
    }

    /// End every subscription gracefully. Later calls do nothing.
    pub fn complete(&self) {
        let mut shared = lock(&self.shared);
        if shared.terminal.is_none() {
            shared.terminal = Some(Terminal::Completed);
            shared.subscribers.clear();
        }
    }

    /// Deliver `error` to every subscription, then end them. Later calls do
    /// nothing.
    pub fn fail(&self, error: StreamError) {
        let mut shared = lock(&self.shared);
        if shared.terminal.is_some() {
            return;
        }
        for subscriber in shared.subscribers.drain(..) {
            let _ = subscriber.tx.send(Err(Arc::clone(&error)));
        }
        shared.terminal = Some(Terminal::Failed(error));
    }
}

/// One subscriber's view of a [`Broadcast`].
///
/// Yields `Ok(item)` for each delivered event, at most one `Err` on
/// failure, and then `None`.
pub struct Subscription<T> {
    id: u64,
    rx: mpsc::UnboundedReceiver<StreamItem<T>>,
    shared: Weak<Mutex<Shared<T>>>,
}

impl<T> Subscription<T> {
    /// Receive the next item; `None` once the broadcast has terminated.
    pub async fn recv(&mut self) -> Option<StreamItem<T>> {
        self.rx.recv().await
    }

    /// Take an already delivered item without waiting.
    pub fn try_recv(&mut self) -> Option<StreamItem<T>> {
        self.rx.try_recv().ok()
    }

    /// Detach from the broadcast. Equivalent to dropping the subscription.
    pub fn unsubscribe(self) {}
}

impl<T> Stream for Subscription<T> {
    type Item = StreamItem<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            lock(&shared).subscribers.retain(|s| s.id != self.id);
        }
    }
}
