//! Publish/subscribe registry for short-lived waiters.
//!
//! Any caller that needs to wait for a specific future stanza (a reply from one contact, the
//! next message in a room, ...) registers a filtered [`Listener`] here. The dispatch point
//! feeds every inbound stanza through [`ListenerRegistry::dispatch`] before the long-lived
//! handlers see it.

pub mod registry;

pub use registry::{Listener, ListenerFilter, ListenerId, ListenerRegistry, Remaining};
