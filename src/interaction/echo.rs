//! A demo bot that answers every message by echoing what it understood.

use crate::{
    base::stanza::ChatState,
    interaction::handlers::ChatMessage,
    prelude::*,
    service::rooms::RoomHandle,
    threading::ParsedReply,
};

/// Handlers for the echo bot.
pub fn handlers() -> Handlers {
    Handlers::new()
        .on_direct_message(handle_direct_message)
        .on_group_message(handle_group_message)
        .on_chat_state(log_chat_state)
        .on_delivery_receipt(|from, id| info!("Delivered {} to {}", id, from))
        .on_read_receipt(|from, id| info!("{} has seen {}", from, id))
}

/// Mark the message as read, then answer with a threaded reply.
#[instrument(skip_all)]
async fn handle_direct_message(runtime: Runtime, message: ChatMessage) -> Void {
    if let Err(err) = runtime.mark_as_read(&message).await {
        warn!("Error marking as read: {}", err);
    }

    runtime.reply_to(&message, &echo_text(&message.parsed)).await
}

/// Same as direct messages, but only in known rooms and never to ourselves.
#[instrument(skip_all)]
async fn handle_group_message(runtime: Runtime, room: Option<RoomHandle>, message: ChatMessage) -> Void {
    let Some(room) = room else {
        debug!("Ignoring message from unknown room.");
        return Ok(());
    };

    if room.is_me(&message.from) {
        return Ok(());
    }

    if let Err(err) = runtime.mark_as_read(&message).await {
        warn!("Error marking as read: {}", err);
    }

    runtime.reply_to(&message, &echo_text(&message.parsed)).await
}

fn log_chat_state(from: &str, state: ChatState) {
    match state {
        ChatState::Active => info!("{} is active", from),
        ChatState::Composing => info!("{} is composing", from),
        ChatState::Paused => info!("{} has paused typing", from),
        ChatState::Inactive => info!("{} is inactive", from),
        ChatState::Gone => info!("{} has gone", from),
    }
}

fn echo_text(parsed: &ParsedReply) -> String {
    format!("message \"{}\" replying to \"{}\"\n", parsed.cleaned_body, parsed.reply_excerpt.as_deref().unwrap_or("nil"))
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_names_missing_reply_as_nil() {
        let parsed = ParsedReply {
            cleaned_body: "hello".to_string(),
            ..Default::default()
        };

        assert_eq!(echo_text(&parsed), "message \"hello\" replying to \"nil\"\n");
    }

    #[test]
    fn echo_includes_excerpt() {
        let parsed = ParsedReply {
            cleaned_body: "yes".to_string(),
            reply_excerpt: Some("are you there?".to_string()),
            ..Default::default()
        };

        assert_eq!(echo_text(&parsed), "message \"yes\" replying to \"are you there?\"\n");
    }
}
