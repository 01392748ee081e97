//! Session integration for the relay.
//!
//! The session owns the connection: it decodes inbound stanzas and encodes outbound ones.
//! This crate only consumes it through the `GenericSession` trait:
//! - An inbound feed of decoded messages.
//! - An "encode and send" primitive.

pub mod stdio;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::{
    stanza::{InboundMessage, OutboundMessage},
    types::{Res, Void},
};

// Traits.

/// Generic "session" trait that transports must implement.
#[async_trait]
pub trait GenericSession: Send + Sync + 'static {
    /// Our own full address on this session.
    fn local_address(&self) -> &str;

    /// Wait for the next decoded inbound stanza.
    ///
    /// Returns `None` once the session has ended. An `Err` is a decode failure for a single
    /// stanza; the feed continues afterwards.
    async fn next_event(&self) -> Option<Res<InboundMessage>>;

    /// Encode and transmit a stanza.
    async fn send(&self, message: &OutboundMessage) -> Void;
}

// Structs.

/// Session client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct SessionClient {
    inner: Arc<dyn GenericSession>,
}

impl Deref for SessionClient {
    type Target = dyn GenericSession;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl SessionClient {
    pub fn new(inner: Arc<dyn GenericSession>) -> Self {
        Self { inner }
    }
}
