//! The dispatch point: every decoded inbound stanza enters the crate here.

use std::sync::Arc;

use tracing::{Instrument, debug, error, instrument, warn};

use super::handlers::{ChatMessage, HandlerFuture, Handlers};
use crate::{
    base::{
        stanza::{ChatState, InboundMessage, MessageType, StanzaKind},
        types::Void,
    },
    runtime::Runtime,
    threading::parse_reply,
};

/// Route one inbound stanza.
///
/// Listeners see the stanza first. Chat-state and receipt callbacks run inline; the direct and
/// group handlers run on their own tasks so slow replies never hold up the next stanza.
/// Fails only when the stanza's sender cannot be decoded.
#[instrument(skip_all, fields(from = %message.from, kind = %message.kind))]
pub async fn dispatch(runtime: &Runtime, message: InboundMessage) -> Void {
    let from = message.from_jid().map_err(|e| anyhow::anyhow!("Undecodable sender: {}", e))?;
    let message = Arc::new(message);

    let delivered = runtime.listeners.dispatch(&message).await;
    debug!("Delivered to {} listeners.", delivered);

    if message.stanza != StanzaKind::Message {
        return Ok(());
    }

    let parsed = parse_reply(&message);
    let handlers = &runtime.handlers;

    if let Some(state) = parsed.chat_state {
        notify_chat_state(handlers, &message, state);
    }

    notify_receipts(handlers, &message);

    if message.body.is_none() {
        return Ok(());
    }

    let kind = message.kind;
    let chat = ChatMessage { message, parsed };

    match kind {
        MessageType::Chat | MessageType::Normal => {
            runtime.mark_as_delivered(&chat);

            if let Some(handler) = &handlers.direct_message {
                spawn_handler(handler(runtime.clone(), chat));
            }
        }
        MessageType::Groupchat => {
            let room = runtime.lookup_room(&from.bare().to_string());

            if room.is_none() {
                warn!("Received a room message from a room we have not joined.");
            }

            if let Some(handler) = &handlers.group_message {
                spawn_handler(handler(runtime.clone(), room, chat));
            }
        }
        MessageType::Headline | MessageType::Error => debug!("Ignoring {} message.", kind),
    }

    Ok(())
}

fn notify_chat_state(handlers: &Handlers, message: &InboundMessage, state: ChatState) {
    if let Some(handler) = &handlers.chat_state {
        handler(message.from.as_str(), state);
    }
}

fn notify_receipts(handlers: &Handlers, message: &InboundMessage) {
    if let (Some(id), Some(handler)) = (&message.received, &handlers.delivery_receipt) {
        handler(message.from.as_str(), id.as_str());
    }

    if let (Some(id), Some(handler)) = (&message.displayed, &handlers.read_receipt) {
        handler(message.from.as_str(), id.as_str());
    }
}

/// Run a handler on its own task and log its failure.
fn spawn_handler(future: HandlerFuture) {
    tokio::spawn(
        async move {
            if let Err(err) = future.await {
                error!("Error while handling: {}", err);
            }
        }
        .in_current_span(),
    );
}
