//! Outbound side of reply threading: quote the original and attach reply metadata.

use thiserror::Error;
use tracing::debug;

use super::parse::clean_body;
use crate::base::{
    address::{AddressError, Jid},
    stanza::{Fallback, InboundMessage, MessageType, OutboundMessage, ReplyReference},
};

/// Relative-time marker used when the caller does not supply one.
pub const DEFAULT_TIME_MARKER: &str = "TODO";

/// Why a reply could not be built. Nothing is sent in either case.
#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("cannot resolve reply recipient `{address}`: {source}")]
    InvalidRecipient {
        address: String,
        #[source]
        source: AddressError,
    },
    #[error("cannot reply to a message of type `{0}`")]
    UnsupportedKind(MessageType),
}

/// Build a quoted reply to `original` using [`DEFAULT_TIME_MARKER`].
pub fn build_reply(original: &InboundMessage, text: &str) -> Result<OutboundMessage, ReplyError> {
    build_reply_with_marker(original, text, DEFAULT_TIME_MARKER)
}

/// Build a quoted reply to `original`.
///
/// The reply goes to the bare sender (or room) address and keeps the original's message
/// type. When a trustworthy anchor exists the quote is declared as a reply fallback spanning
/// exactly the quote bytes; otherwise the quote and text are sent as a plain message.
pub fn build_reply_with_marker(original: &InboundMessage, text: &str, time_marker: &str) -> Result<OutboundMessage, ReplyError> {
    if original.kind == MessageType::Error {
        return Err(ReplyError::UnsupportedKind(original.kind));
    }

    let from = original.from_jid().map_err(|source| ReplyError::InvalidRecipient {
        address: original.from.clone(),
        source,
    })?;
    let recipient = from.bare();

    let label = attribution(original.kind, &from);
    let quoted_body = clean_body(original.body.as_deref().unwrap_or_default(), &original.fallbacks);
    let quote = quote(&label, time_marker, &quoted_body);

    let mut message = OutboundMessage::new(recipient.to_string(), original.kind).with_body(format!("{quote}{text}"));

    match anchor(original, &recipient) {
        Some(id) => {
            message.reply = Some(ReplyReference {
                id,
                to: Some(original.from.clone()),
            });
            message.fallbacks = vec![Fallback::for_reply(0, quote.len())];
        }
        None => debug!(to = %recipient, "No trusted anchor; sending reply unthreaded."),
    }

    Ok(message)
}

/// Who said the quoted text: the room nickname in rooms, the bare address otherwise.
fn attribution(kind: MessageType, from: &Jid) -> String {
    match (kind.is_multi_party(), from.resource()) {
        (true, Some(nick)) => nick.to_string(),
        _ => from.bare().to_string(),
    }
}

/// Attribution header followed by every body line behind a quote marker.
fn quote(label: &str, time_marker: &str, body: &str) -> String {
    let mut quote = format!("{label} | {time_marker} ago\n");

    for line in body.lines() {
        quote.push_str("> ");
        quote.push_str(line);
        quote.push('\n');
    }

    quote
}

/// The id a reply should reference, if one can be trusted.
///
/// Room messages are only anchored on a stanza-id stamped by the room itself. Direct messages
/// prefer the sender's origin-id over the stanza's own id.
fn anchor(original: &InboundMessage, recipient: &Jid) -> Option<String> {
    if original.kind.is_multi_party() {
        let room = recipient.to_string();

        return original.stanza_id.as_ref().filter(|sid| sid.by == room).map(|sid| sid.id.clone());
    }

    original.origin_id.clone().or_else(|| original.id.clone())
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::stanza::StanzaId;

    fn direct(body: Option<&str>) -> InboundMessage {
        InboundMessage {
            from: "alice@example.com/phone".to_string(),
            kind: MessageType::Chat,
            id: Some("s1".to_string()),
            body: body.map(str::to_string),
            ..Default::default()
        }
    }

    fn room(stamped_by: &str) -> InboundMessage {
        InboundMessage {
            from: "lobby@muc.example.com/carol".to_string(),
            kind: MessageType::Groupchat,
            id: Some("s2".to_string()),
            origin_id: Some("o2".to_string()),
            body: Some("anyone around?".to_string()),
            stanza_id: Some(StanzaId {
                id: "room-17".to_string(),
                by: stamped_by.to_string(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn quotes_direct_message() {
        let reply = build_reply(&direct(Some("hello\nworld")), "hi!").unwrap();
        let quote = "alice@example.com | TODO ago\n> hello\n> world\n";

        assert_eq!(reply.to, "alice@example.com");
        assert_eq!(reply.kind, MessageType::Chat);
        assert_eq!(reply.body.as_deref(), Some(format!("{quote}hi!").as_str()));
        assert_eq!(reply.fallbacks, vec![Fallback::for_reply(0, quote.len())]);
        assert_eq!(reply.reply.as_ref().map(|r| r.id.as_str()), Some("s1"));
        assert_eq!(reply.reply.and_then(|r| r.to).as_deref(), Some("alice@example.com/phone"));
    }

    #[test]
    fn direct_anchor_prefers_origin_id() {
        let mut original = direct(Some("hello"));
        original.origin_id = Some("o1".to_string());

        let reply = build_reply(&original, "hi!").unwrap();

        assert_eq!(reply.reply.unwrap().id, "o1");
        assert_eq!(reply.to, "alice@example.com");
    }

    #[test]
    fn fallback_spans_exact_quote_bytes() {
        let reply = build_reply_with_marker(&direct(Some("ünïcödé\nline")), "réponse", "5 min").unwrap();
        let body = reply.body.unwrap();
        let end = reply.fallbacks[0].body.unwrap().end;

        assert_eq!(&body[..end], "alice@example.com | 5 min ago\n> ünïcödé\n> line\n");
        assert_eq!(&body[end..], "réponse");
    }

    #[test]
    fn never_quotes_a_previous_quote() {
        let quote = "bob@example.com | TODO ago\n> first\n";
        let mut original = direct(Some(&format!("{quote}second")));
        original.fallbacks = vec![Fallback::for_reply(0, quote.len())];

        let reply = build_reply(&original, "third").unwrap();

        assert_eq!(reply.body.as_deref(), Some("alice@example.com | TODO ago\n> second\nthird"));
    }

    #[test]
    fn room_reply_anchors_on_room_stamped_id() {
        let reply = build_reply(&room("lobby@muc.example.com"), "yes").unwrap();
        let quote = "carol | TODO ago\n> anyone around?\n";

        assert_eq!(reply.to, "lobby@muc.example.com");
        assert_eq!(reply.kind, MessageType::Groupchat);
        assert_eq!(reply.reply.unwrap().id, "room-17");
        assert_eq!(reply.fallbacks, vec![Fallback::for_reply(0, quote.len())]);
    }

    #[test]
    fn room_reply_without_trusted_anchor_is_plain() {
        let reply = build_reply(&room("carol@example.com"), "yes").unwrap();

        assert_eq!(reply.to, "lobby@muc.example.com");
        assert_eq!(reply.kind, MessageType::Groupchat);
        assert!(reply.reply.is_none());
        assert!(reply.fallbacks.is_empty());
        assert_eq!(reply.body.as_deref(), Some("carol | TODO ago\n> anyone around?\nyes"));
    }

    #[test]
    fn missing_body_quotes_attribution_only() {
        let reply = build_reply(&direct(None), "hi!").unwrap();

        assert_eq!(reply.body.as_deref(), Some("alice@example.com | TODO ago\nhi!"));
        assert_eq!(reply.fallbacks, vec![Fallback::for_reply(0, "alice@example.com | TODO ago\n".len())]);
    }

    #[test]
    fn malformed_sender_fails() {
        let mut original = direct(Some("hello"));
        original.from = "alice@".to_string();

        let err = build_reply(&original, "hi!").unwrap_err();

        assert!(matches!(err, ReplyError::InvalidRecipient { .. }));
        assert!(err.to_string().contains("alice@"));
    }

    #[test]
    fn error_messages_are_not_replied_to() {
        let mut original = direct(Some("hello"));
        original.kind = MessageType::Error;

        assert!(matches!(build_reply(&original, "hi!"), Err(ReplyError::UnsupportedKind(MessageType::Error))));
    }

    #[test]
    fn outbound_carries_fresh_origin_id() {
        let reply = build_reply(&direct(Some("hello")), "hi!").unwrap();

        assert!(reply.origin_id.is_some());
        assert_eq!(reply.id, reply.origin_id);
        assert_ne!(reply.origin_id.as_deref(), Some("s1"));
    }
}
