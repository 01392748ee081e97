//! Delivery receipts and read markers.
//!
//! Outgoing delivery receipts go through the [`AckQueue`] so a slow or failing send never holds
//! up dispatch. Failures are logged and published to anyone subscribed.

use tokio::sync::{broadcast, mpsc};
use tracing::{Instrument, error, instrument, warn};

use crate::{
    base::stanza::{InboundMessage, OutboundMessage},
    service::session::SessionClient,
};

/// How many unread failures a slow failure subscriber may lag behind.
const FAILURE_BUFFER: usize = 64;

/// A receipt or marker that could not be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckFailure {
    pub to: String,
    /// The acknowledged message id.
    pub id: Option<String>,
    pub error: String,
}

/// Queue of outgoing acknowledgements, drained by a single worker task.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct AckQueue {
    sender: mpsc::UnboundedSender<OutboundMessage>,
    failures: broadcast::Sender<AckFailure>,
}

impl AckQueue {
    /// Start the worker. Must be called within a Tokio runtime.
    pub fn spawn(session: SessionClient) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (failures, _) = broadcast::channel(FAILURE_BUFFER);

        tokio::spawn(drain(session, receiver, failures.clone()).in_current_span());

        Self { sender, failures }
    }

    /// Queue an acknowledgement without waiting for it to be sent.
    pub fn enqueue(&self, ack: OutboundMessage) -> bool {
        if self.sender.send(ack).is_err() {
            warn!("Acknowledgement worker has stopped; dropping acknowledgement.");
            return false;
        }

        true
    }

    /// Receive every acknowledgement that fails to send from now on.
    pub fn subscribe_failures(&self) -> broadcast::Receiver<AckFailure> {
        self.failures.subscribe()
    }
}

#[instrument(skip_all)]
async fn drain(session: SessionClient, mut receiver: mpsc::UnboundedReceiver<OutboundMessage>, failures: broadcast::Sender<AckFailure>) {
    while let Some(ack) = receiver.recv().await {
        if let Err(err) = session.send(&ack).await {
            error!(to = %ack.to, "Failed to send acknowledgement: {}", err);

            // No subscribers is fine; the failure is already logged.
            let _ = failures.send(AckFailure {
                to: ack.to.clone(),
                id: ack.received.clone().or_else(|| ack.displayed.clone()),
                error: err.to_string(),
            });
        }
    }
}

/// The delivery receipt owed for `message`, if any.
///
/// Only direct conversations are acknowledged; room messages never are.
pub fn delivery_receipt(message: &InboundMessage) -> Option<OutboundMessage> {
    if !message.request_receipt || !message.kind.is_direct() {
        return None;
    }

    let id = message.id.clone()?;
    let mut receipt = OutboundMessage::new(message.from.clone(), message.kind);
    receipt.received = Some(id);

    Some(receipt)
}

/// The read marker for `message`, if it asked for one and can be referenced.
///
/// Room messages are referenced by their room-stamped stanza-id; direct messages by their id.
pub fn read_marker(message: &InboundMessage) -> Option<OutboundMessage> {
    if !message.markable {
        return None;
    }

    let bare = message.from_jid().ok()?.bare().to_string();

    let id = if message.kind.is_multi_party() {
        message.stanza_id.as_ref().filter(|sid| sid.by == bare).map(|sid| sid.id.clone())?
    } else if message.kind.is_direct() {
        message.id.clone()?
    } else {
        return None;
    };

    let mut marker = OutboundMessage::new(bare, message.kind);
    marker.displayed = Some(id);

    Some(marker)
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::stanza::{MessageType, StanzaId};

    fn inbound(kind: MessageType) -> InboundMessage {
        InboundMessage {
            from: "alice@example.com/phone".to_string(),
            id: Some("m1".to_string()),
            kind,
            body: Some("hi".to_string()),
            request_receipt: true,
            markable: true,
            ..Default::default()
        }
    }

    #[test]
    fn direct_receipt_goes_to_full_address() {
        let receipt = delivery_receipt(&inbound(MessageType::Chat)).unwrap();

        assert_eq!(receipt.to, "alice@example.com/phone");
        assert_eq!(receipt.received.as_deref(), Some("m1"));
        assert!(receipt.body.is_none());
    }

    #[test]
    fn no_receipt_unless_requested_in_direct_chat() {
        let mut message = inbound(MessageType::Chat);
        message.request_receipt = false;
        assert!(delivery_receipt(&message).is_none());

        assert!(delivery_receipt(&inbound(MessageType::Groupchat)).is_none());

        let mut message = inbound(MessageType::Chat);
        message.id = None;
        assert!(delivery_receipt(&message).is_none());
    }

    #[test]
    fn direct_read_marker_goes_to_bare_address() {
        let marker = read_marker(&inbound(MessageType::Chat)).unwrap();

        assert_eq!(marker.to, "alice@example.com");
        assert_eq!(marker.displayed.as_deref(), Some("m1"));
        assert_eq!(marker.kind, MessageType::Chat);
    }

    #[test]
    fn room_read_marker_needs_room_stamped_id() {
        let mut message = inbound(MessageType::Groupchat);
        message.from = "lobby@muc.example.com/carol".to_string();
        assert!(read_marker(&message).is_none());

        message.stanza_id = Some(StanzaId {
            id: "room-3".to_string(),
            by: "lobby@muc.example.com".to_string(),
        });
        let marker = read_marker(&message).unwrap();

        assert_eq!(marker.to, "lobby@muc.example.com");
        assert_eq!(marker.displayed.as_deref(), Some("room-3"));
        assert_eq!(marker.kind, MessageType::Groupchat);
    }

    #[test]
    fn unmarkable_messages_get_no_marker() {
        let mut message = inbound(MessageType::Chat);
        message.markable = false;

        assert!(read_marker(&message).is_none());
    }
}
