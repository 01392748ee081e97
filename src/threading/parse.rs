//! Inbound side of reply threading: strip fallback quotes and extract what a message replies to.

use std::ops::Range;

use crate::base::stanza::{ChatState, Fallback, InboundMessage, ReplyReference};

/// Longest reply excerpt, in characters.
const MAX_EXCERPT_CHARS: usize = 100;

/// What a handler needs to know about an inbound message, computed without touching it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedReply {
    /// The body with every fallback span removed.
    pub cleaned_body: String,
    /// What the message replies to; `None` when it carries no reply reference.
    pub reply_excerpt: Option<String>,
    pub requesting_delivery: bool,
    pub requesting_read: bool,
    pub chat_state: Option<ChatState>,
}

/// Parse the threading-related parts of an inbound message.
pub fn parse_reply(message: &InboundMessage) -> ParsedReply {
    let raw = message.body.as_deref().unwrap_or_default();

    ParsedReply {
        cleaned_body: clean_body(raw, &message.fallbacks),
        reply_excerpt: message.reply.as_ref().map(|reply| reply_excerpt(raw, &message.fallbacks, reply)),
        requesting_delivery: message.request_receipt,
        requesting_read: message.markable,
        chat_state: message.chat_state.as_deref().and_then(ChatState::from_element),
    }
}

/// Remove every valid fallback span from `raw`.
pub fn clean_body(raw: &str, fallbacks: &[Fallback]) -> String {
    let spans = merged_spans(raw, fallbacks.iter());

    if spans.is_empty() {
        return raw.to_string();
    }

    let mut cleaned = String::with_capacity(raw.len());
    let mut cursor = 0;

    for span in spans {
        cleaned.push_str(&raw[cursor..span.start]);
        cursor = span.end;
    }

    cleaned.push_str(&raw[cursor..]);
    cleaned
}

/// Clamp a declared range to the body. Empty ranges and ranges that split a character are invalid.
fn valid_span(raw: &str, fallback: &Fallback) -> Option<Range<usize>> {
    let range = fallback.body?;
    let end = range.end.min(raw.len());
    let start = range.start.min(end);

    if start == end || !raw.is_char_boundary(start) || !raw.is_char_boundary(end) {
        return None;
    }

    Some(start..end)
}

/// Valid spans, sorted and with overlaps merged.
fn merged_spans<'a>(raw: &str, fallbacks: impl Iterator<Item = &'a Fallback>) -> Vec<Range<usize>> {
    let mut spans: Vec<Range<usize>> = fallbacks.filter_map(|f| valid_span(raw, f)).collect();
    spans.sort_by_key(|s| s.start);

    let mut merged: Vec<Range<usize>> = Vec::with_capacity(spans.len());

    for span in spans {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }

    merged
}

/// A short label for the replied-to message: the quoted text when a reply fallback is present,
/// otherwise the referenced id.
fn reply_excerpt(raw: &str, fallbacks: &[Fallback], reply: &ReplyReference) -> String {
    let quoted = fallbacks
        .iter()
        .filter(|f| f.is_reply())
        .find_map(|f| valid_span(raw, f))
        .map(|span| unquote(&raw[span]))
        .unwrap_or_default();

    if quoted.is_empty() {
        return reply.id.clone();
    }

    truncate(&quoted, MAX_EXCERPT_CHARS)
}

/// Drop the attribution line and the quote markers of a fallback quote.
fn unquote(quote: &str) -> String {
    let lines: Vec<&str> = quote
        .lines()
        .filter_map(|line| line.strip_prefix('>'))
        .map(|line| line.strip_prefix(' ').unwrap_or(line))
        .collect();

    lines.join("\n").trim().to_string()
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => format!("{}…", &text[..index]),
        None => text.to_string(),
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::stanza::FallbackRange;

    fn message(body: &str, fallbacks: Vec<Fallback>) -> InboundMessage {
        InboundMessage {
            from: "alice@example.com/phone".to_string(),
            body: Some(body.to_string()),
            fallbacks,
            ..Default::default()
        }
    }

    #[test]
    fn strips_declared_span() {
        let body = "> hi, there\nsure ok!";
        assert_eq!(body.len(), 20);

        let parsed = parse_reply(&message(body, vec![Fallback::for_reply(0, 12)]));
        assert_eq!(parsed.cleaned_body, "sure ok!");

        // Re-running on the cleaned body without a span changes nothing.
        let again = parse_reply(&message(&parsed.cleaned_body, vec![]));
        assert_eq!(again.cleaned_body, parsed.cleaned_body);
    }

    #[test]
    fn clamps_out_of_range_offsets() {
        let parsed = parse_reply(&message("> quoted\nreply", vec![Fallback::for_reply(9, 400)]));

        assert_eq!(parsed.cleaned_body, "> quoted\n");
    }

    #[test]
    fn invalid_spans_leave_body_untouched() {
        let empty = Fallback::for_reply(5, 5);
        let inverted = Fallback::for_reply(6, 2);
        let missing = Fallback {
            namespace: "urn:xmpp:reply:0".to_string(),
            body: None,
        };
        // Splits the two-byte `é`.
        let split = Fallback::for_reply(0, 1);

        let parsed = parse_reply(&message("éclair time", vec![empty, inverted, missing, split]));

        assert_eq!(parsed.cleaned_body, "éclair time");
    }

    #[test]
    fn merges_overlapping_spans() {
        let fallbacks = vec![Fallback::for_reply(4, 8), Fallback::for_reply(0, 6), Fallback::for_reply(10, 12)];

        assert_eq!(clean_body("0123456789ab-end", &fallbacks), "89-end");
    }

    #[test]
    fn no_reply_reference_yields_no_excerpt() {
        let parsed = parse_reply(&message("plain", vec![]));

        assert_eq!(parsed.reply_excerpt, None);
    }

    #[test]
    fn excerpt_comes_from_reply_fallback() {
        let quote = "alice@example.com | 5 min ago\n> hello\n> world\n";
        let body = format!("{quote}hi!");
        let mut inbound = message(&body, vec![Fallback::for_reply(0, quote.len())]);
        inbound.reply = Some(ReplyReference {
            id: "m1".to_string(),
            to: None,
        });

        let parsed = parse_reply(&inbound);

        assert_eq!(parsed.cleaned_body, "hi!");
        assert_eq!(parsed.reply_excerpt.as_deref(), Some("hello\nworld"));
    }

    #[test]
    fn excerpt_falls_back_to_reply_id() {
        let mut inbound = message("just text", vec![]);
        inbound.reply = Some(ReplyReference {
            id: "m1".to_string(),
            to: Some("alice@example.com/phone".to_string()),
        });

        assert_eq!(parse_reply(&inbound).reply_excerpt.as_deref(), Some("m1"));
    }

    #[test]
    fn long_excerpts_are_truncated() {
        let quote = format!("> {}\n", "x".repeat(150));
        let mut inbound = message(&quote, vec![Fallback {
            namespace: "urn:xmpp:reply:0".to_string(),
            body: Some(FallbackRange { start: 0, end: quote.len() }),
        }]);
        inbound.reply = Some(ReplyReference { id: "m1".to_string(), to: None });

        let excerpt = parse_reply(&inbound).reply_excerpt.unwrap();

        assert_eq!(excerpt.chars().count(), MAX_EXCERPT_CHARS + 1);
        assert!(excerpt.ends_with('…'));
    }

    #[test]
    fn surfaces_receipt_and_chat_state_flags() {
        let mut inbound = message("hey", vec![]);
        inbound.request_receipt = true;
        inbound.markable = true;
        inbound.chat_state = Some("composing".to_string());

        let parsed = parse_reply(&inbound);

        assert!(parsed.requesting_delivery);
        assert!(parsed.requesting_read);
        assert_eq!(parsed.chat_state, Some(ChatState::Composing));

        inbound.chat_state = Some("dancing".to_string());
        assert_eq!(parse_reply(&inbound).chat_state, None);
    }
}
