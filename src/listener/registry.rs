//! Listener registry for ad-hoc waiters on inbound stanzas.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, instrument, trace};

use crate::base::{
    address::Jid,
    stanza::{InboundMessage, MessageType, StanzaKind},
};

// Types.

/// Opaque handle of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// How many more events a listener accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    /// Stays registered until explicitly unsubscribed.
    Unlimited,
    /// `Further(n)` accepts `n` more events after the next one; `Further(0)` is a one-shot.
    Further(u32),
}

impl Remaining {
    pub const ONCE: Remaining = Remaining::Further(0);
}

/// Exact-match constraints on an inbound stanza. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenerFilter {
    pub stanza: Option<StanzaKind>,
    pub message_type: Option<MessageType>,
    pub bare: Option<String>,
    pub resource: Option<String>,
}

impl ListenerFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stanza(mut self, stanza: StanzaKind) -> Self {
        self.stanza = Some(stanza);
        self
    }

    pub fn message_type(mut self, message_type: MessageType) -> Self {
        self.message_type = Some(message_type);
        self
    }

    pub fn sender_bare(mut self, bare: impl Into<String>) -> Self {
        self.bare = Some(bare.into());
        self
    }

    pub fn sender_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Check every set constraint against the message.
    pub fn matches(&self, message: &InboundMessage, from: Option<&Jid>) -> bool {
        if let Some(stanza) = self.stanza
            && stanza != message.stanza
        {
            return false;
        }

        if let Some(message_type) = self.message_type
            && message_type != message.kind
        {
            return false;
        }

        if let Some(bare) = &self.bare {
            match from {
                Some(jid) if jid.bare().to_string() == *bare => {}
                _ => return false,
            }
        }

        if let Some(resource) = &self.resource {
            match from.and_then(Jid::resource) {
                Some(r) if r == resource => {}
                _ => return false,
            }
        }

        true
    }
}

/// The receiving side of a subscription.
///
/// The channel closes once the listener is removed from the registry, after its final event
/// has been handed over.
#[derive(Debug)]
pub struct Listener {
    pub id: ListenerId,
    pub receiver: mpsc::Receiver<Arc<InboundMessage>>,
}

impl Listener {
    /// Wait for the next event. Returns `None` once the listener is closed and drained.
    pub async fn recv(&mut self) -> Option<Arc<InboundMessage>> {
        self.receiver.recv().await
    }
}

/// Internal subscription state.
struct Subscription {
    id: ListenerId,
    filter: ListenerFilter,
    remaining: Remaining,
    swallow: bool,
    sender: mpsc::Sender<Arc<InboundMessage>>,
}

/// A hand-off computed under the lock and performed after it is released.
struct Delivery {
    id: ListenerId,
    sender: mpsc::Sender<Arc<InboundMessage>>,
    last: bool,
}

struct RegistryInner {
    /// Registration order; the newest subscription is last.
    subscriptions: Mutex<Vec<Subscription>>,
    next_id: AtomicU64,
    buffer: usize,
}

/// Registry of listeners.
///
/// This is trivially cloneable; clones share the same set of listeners.
#[derive(Clone)]
pub struct ListenerRegistry {
    inner: Arc<RegistryInner>,
}

impl ListenerRegistry {
    /// Create a registry whose listener channels hold `buffer` events each.
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                subscriptions: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                buffer: buffer.max(1),
            }),
        }
    }

    /// Register a listener.
    pub fn subscribe(&self, filter: ListenerFilter, remaining: Remaining, swallow: bool) -> Listener {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = mpsc::channel(self.inner.buffer);

        let mut subs = self.inner.subscriptions.lock();
        prune_closed(&mut subs);
        subs.push(Subscription {
            id,
            filter,
            remaining,
            swallow,
            sender,
        });
        drop(subs);

        debug!(?id, "Listener registered.");

        Listener { id, receiver }
    }

    /// Remove a listener and close its channel. Returns whether it was still registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let removed = {
            let mut subs = self.inner.subscriptions.lock();
            subs.iter().position(|s| s.id == id).map(|index| subs.remove(index))
        };

        // Dropping the sender outside the lock closes the channel.
        removed.is_some()
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.inner.subscriptions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hand an inbound message to every matching listener, newest first.
    ///
    /// Matching, counter updates and removals happen under the lock; the channel sends happen
    /// after it is released, so a stalled listener never blocks `subscribe` or `unsubscribe`.
    /// A listener on its final event is removed from the registry before the send and its
    /// channel closes when the send completes.
    #[instrument(skip_all)]
    pub async fn dispatch(&self, message: &Arc<InboundMessage>) -> usize {
        let deliveries = self.plan(message);
        let mut delivered = 0;

        for Delivery { id, sender, last } in deliveries {
            if sender.send(message.clone()).await.is_err() {
                debug!(?id, "Listener receiver dropped; removing.");
                self.unsubscribe(id);
                continue;
            }

            delivered += 1;

            if last {
                trace!(?id, "Listener exhausted.");
            }

            // `sender` drops here; for the final delivery that closes the channel.
        }

        delivered
    }

    /// Select the listeners that receive `message` and update their counters.
    fn plan(&self, message: &InboundMessage) -> Vec<Delivery> {
        let from = message.from_jid().ok();
        let mut deliveries = Vec::new();
        let mut subs = self.inner.subscriptions.lock();
        prune_closed(&mut subs);

        let mut index = subs.len();

        while index > 0 {
            index -= 1;

            let sub = &mut subs[index];

            if !sub.filter.matches(message, from.as_ref()) {
                continue;
            }

            let swallow = sub.swallow;
            let remaining = sub.remaining;

            match remaining {
                Remaining::Unlimited => deliveries.push(Delivery {
                    id: sub.id,
                    sender: sub.sender.clone(),
                    last: false,
                }),
                Remaining::Further(0) => {
                    let sub = subs.remove(index);
                    deliveries.push(Delivery {
                        id: sub.id,
                        sender: sub.sender,
                        last: true,
                    });
                }
                Remaining::Further(n) => {
                    sub.remaining = Remaining::Further(n - 1);
                    deliveries.push(Delivery {
                        id: sub.id,
                        sender: sub.sender.clone(),
                        last: false,
                    });
                }
            }

            if swallow {
                break;
            }
        }

        deliveries
    }
}

/// Drop subscriptions whose listener was dropped without unsubscribing.
fn prune_closed(subs: &mut Vec<Subscription>) {
    subs.retain(|s| !s.sender.is_closed());
}

// Tests.
