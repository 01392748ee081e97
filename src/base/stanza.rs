//! Decoded stanza model shared by the registry, the threading engine and the handlers.
//!
//! Inbound messages are produced by the session layer (already decoded from the wire) and
//! are treated as immutable snapshots. Outbound messages are fully built by this crate and
//! handed back to the session for encoding.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::address::{AddressError, Jid};

/// Namespace used by reply references and by the fallback spans that belong to them.
pub const REPLY_NAMESPACE: &str = "urn:xmpp:reply:0";

/// Top-level stanza element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StanzaKind {
    #[default]
    Message,
    Presence,
    Iq,
}

/// The `type` attribute of a message stanza.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Chat,
    Groupchat,
    #[default]
    Normal,
    Headline,
    Error,
}

impl MessageType {
    /// One-to-one conversation.
    pub fn is_direct(self) -> bool {
        matches!(self, MessageType::Chat | MessageType::Normal)
    }

    /// Room-mediated conversation.
    pub fn is_multi_party(self) -> bool {
        self == MessageType::Groupchat
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageType::Chat => "chat",
            MessageType::Groupchat => "groupchat",
            MessageType::Normal => "normal",
            MessageType::Headline => "headline",
            MessageType::Error => "error",
        };

        f.write_str(name)
    }
}

/// Typing-indicator status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatState {
    Active,
    Composing,
    Paused,
    Inactive,
    Gone,
}

impl ChatState {
    /// Map a chat-state element name to its state. Unknown names yield `None`.
    pub fn from_element(name: &str) -> Option<Self> {
        match name {
            "active" => Some(ChatState::Active),
            "composing" => Some(ChatState::Composing),
            "paused" => Some(ChatState::Paused),
            "inactive" => Some(ChatState::Inactive),
            "gone" => Some(ChatState::Gone),
            _ => None,
        }
    }
}

/// A server- or room-assigned stanza identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StanzaId {
    pub id: String,
    /// The entity that stamped the identifier.
    pub by: String,
}

/// Reference to the message being replied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyReference {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

/// Byte range `[start, end)` of a fallback span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackRange {
    pub start: usize,
    pub end: usize,
}

/// A declared fallback span within the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fallback {
    /// Namespace of the feature this fallback stands in for.
    #[serde(rename = "for")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<FallbackRange>,
}

impl Fallback {
    pub fn for_reply(start: usize, end: usize) -> Self {
        Self {
            namespace: REPLY_NAMESPACE.to_string(),
            body: Some(FallbackRange { start, end }),
        }
    }

    pub fn is_reply(&self) -> bool {
        self.namespace == REPLY_NAMESPACE
    }
}

/// An inbound stanza as delivered by the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub stanza: StanzaKind,
    /// Full sender address, including the resource part.
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: MessageType,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub origin_id: Option<String>,
    #[serde(default)]
    pub stanza_id: Option<StanzaId>,
    #[serde(default)]
    pub reply: Option<ReplyReference>,
    #[serde(default)]
    pub fallbacks: Vec<Fallback>,
    /// Local name of the chat-state element, if any.
    #[serde(default)]
    pub chat_state: Option<String>,
    /// Delivery receipt requested.
    #[serde(default)]
    pub request_receipt: bool,
    /// Read marker requested.
    #[serde(default)]
    pub markable: bool,
    /// Id of one of our messages the sender acknowledged as delivered.
    #[serde(default)]
    pub received: Option<String>,
    /// Id of one of our messages the sender has displayed.
    #[serde(default)]
    pub displayed: Option<String>,
}

impl InboundMessage {
    pub fn from_jid(&self) -> Result<Jid, AddressError> {
        Jid::parse(&self.from)
    }
}

/// A fully constructed outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub to: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<ReplyReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallbacks: Vec<Fallback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displayed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_state: Option<ChatState>,
}

impl OutboundMessage {
    /// A bare message addressed to `to`, tagged with a fresh origin id.
    pub fn new(to: impl Into<String>, kind: MessageType) -> Self {
        let id = uuid::Uuid::new_v4().to_string();

        Self {
            to: to.into(),
            kind,
            id: Some(id.clone()),
            origin_id: Some(id),
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_sparse_inbound_json() {
        let message: InboundMessage = serde_json::from_str(r#"{"from":"alice@example.com/phone","type":"chat","body":"hi"}"#).unwrap();

        assert_eq!(message.stanza, StanzaKind::Message);
        assert_eq!(message.kind, MessageType::Chat);
        assert_eq!(message.body.as_deref(), Some("hi"));
        assert!(message.fallbacks.is_empty());
        assert!(!message.request_receipt);
    }

    #[test]
    fn decodes_fallback_spans() {
        let message: InboundMessage = serde_json::from_str(
            r#"{"from":"a@b/c","type":"groupchat","reply":{"id":"r1"},"fallbacks":[{"for":"urn:xmpp:reply:0","body":{"start":0,"end":4}}]}"#,
        )
        .unwrap();

        assert_eq!(message.fallbacks, vec![Fallback::for_reply(0, 4)]);
        assert!(message.fallbacks[0].is_reply());
        assert_eq!(message.reply.unwrap().id, "r1");
    }

    #[test]
    fn outbound_omits_empty_metadata() {
        let message = OutboundMessage::new("alice@example.com", MessageType::Chat).with_body("hey");
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["type"], "chat");
        assert!(json.get("reply").is_none());
        assert!(json.get("fallbacks").is_none());
        assert_eq!(json["id"], json["origin_id"]);
    }

    #[test]
    fn chat_state_elements_map_one_to_one() {
        assert_eq!(ChatState::from_element("composing"), Some(ChatState::Composing));
        assert_eq!(ChatState::from_element("gone"), Some(ChatState::Gone));
        assert_eq!(ChatState::from_element("typing"), None);
    }
}
