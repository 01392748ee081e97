//! Runtime services and shared state for the relay.

use std::{sync::Arc, time::Duration};

use tracing::{error, info, instrument};

use crate::{
    base::{
        config::Config,
        stanza::{ChatState, InboundMessage, MessageType, OutboundMessage},
        types::Void,
    },
    interaction::{
        dispatch,
        handlers::Handlers,
        receipts::{self, AckQueue},
    },
    listener::{Listener, ListenerFilter, ListenerId, ListenerRegistry, Remaining},
    service::{
        rooms::{RoomDirectory, RoomHandle},
        session::SessionClient,
    },
    threading,
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the session, the listener registry, the room directory and the
/// configured handlers. It is designed to be trivially cloneable, allowing it to be passed
/// to handlers without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The session used to receive and send stanzas.
    pub session: SessionClient,
    /// Ad-hoc listeners for inbound stanzas.
    pub listeners: ListenerRegistry,
    /// Joined-room lookup.
    pub rooms: RoomDirectory,
    /// Outgoing acknowledgement queue.
    pub acks: AckQueue,
    /// Long-lived handlers.
    pub handlers: Arc<Handlers>,
}

impl Runtime {
    /// Create a new runtime instance. Must be called within a Tokio runtime.
    #[instrument(skip_all)]
    pub fn new(config: Config, session: SessionClient, rooms: RoomDirectory, handlers: Handlers) -> Self {
        let listeners = ListenerRegistry::new(config.listener_buffer);
        let acks = AckQueue::spawn(session.clone());

        Self {
            config,
            session,
            listeners,
            rooms,
            acks,
            handlers: Arc::new(handlers),
        }
    }

    /// Drive the session until its inbound feed ends.
    ///
    /// Undecodable stanzas are logged and skipped.
    pub async fn start(&self) -> Void {
        info!("Serving session for {} ...", self.session.local_address());

        while let Some(event) = self.session.next_event().await {
            let message = match event {
                Ok(message) => message,
                Err(err) => {
                    error!("Dropping undecodable stanza: {}", err);
                    continue;
                }
            };

            if let Err(err) = dispatch::dispatch(self, message).await {
                error!("Dropping stanza: {}", err);
            }
        }

        info!("Session ended.");

        Ok(())
    }

    /// Send a fully built stanza.
    pub async fn send(&self, message: &OutboundMessage) -> Void {
        self.session.send(message).await
    }

    /// Reply to `message`, quoting it.
    #[instrument(skip_all, fields(to = %message.from))]
    pub async fn reply_to(&self, message: &InboundMessage, text: &str) -> Void {
        let reply = threading::build_reply_with_marker(message, text, &self.config.quote_time_marker)?;

        self.session.send(&reply).await
    }

    /// Send a plain text message.
    pub async fn send_text(&self, to: &str, kind: MessageType, body: &str) -> Void {
        let message = OutboundMessage::new(to, kind).with_body(body);

        self.session.send(&message).await
    }

    /// Send a chat-state notification.
    pub async fn send_chat_state(&self, to: &str, kind: MessageType, state: ChatState) -> Void {
        let mut message = OutboundMessage::new(to, kind);
        message.chat_state = Some(state);

        self.session.send(&message).await
    }

    /// Send a read marker for `message`, if it asked for one.
    pub async fn mark_as_read(&self, message: &InboundMessage) -> Void {
        match receipts::read_marker(message) {
            Some(marker) => self.session.send(&marker).await,
            None => Ok(()),
        }
    }

    /// Queue a delivery receipt for `message`, if one is owed. Returns whether one was queued.
    pub fn mark_as_delivered(&self, message: &InboundMessage) -> bool {
        match receipts::delivery_receipt(message) {
            Some(receipt) => self.acks.enqueue(receipt),
            None => false,
        }
    }

    /// Register a listener for future inbound stanzas.
    pub fn listen(&self, filter: ListenerFilter, remaining: Remaining, swallow: bool) -> Listener {
        self.listeners.subscribe(filter, remaining, swallow)
    }

    /// Remove a listener registered with [`Runtime::listen`].
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Wait up to `timeout` for the next stanza matching `filter`.
    pub async fn wait_for(&self, filter: ListenerFilter, timeout: Duration) -> Option<Arc<InboundMessage>> {
        let mut listener = self.listeners.subscribe(filter, Remaining::ONCE, false);

        match tokio::time::timeout(timeout, listener.recv()).await {
            Ok(message) => message,
            Err(_) => {
                self.listeners.unsubscribe(listener.id);

                // An event handed over while the timer fired is still buffered.
                listener.receiver.try_recv().ok()
            }
        }
    }

    /// Look up a joined room by its bare address.
    pub fn lookup_room(&self, room: &str) -> Option<RoomHandle> {
        self.rooms.lookup_room(room)
    }
}
