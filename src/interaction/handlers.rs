//! Long-lived handler configuration.
//!
//! Every handler is optional; an absent handler means that class of event is ignored.

use std::{ops::Deref, sync::Arc};

use futures::{FutureExt, future::BoxFuture};

use crate::{
    base::{
        stanza::{ChatState, InboundMessage},
        types::Void,
    },
    runtime::Runtime,
    service::rooms::RoomHandle,
    threading::ParsedReply,
};

// Types.

pub type HandlerFuture = BoxFuture<'static, Void>;
pub type DirectMessageHandler = Box<dyn Fn(Runtime, ChatMessage) -> HandlerFuture + Send + Sync>;
pub type GroupMessageHandler = Box<dyn Fn(Runtime, Option<RoomHandle>, ChatMessage) -> HandlerFuture + Send + Sync>;
/// Called with the sender's full address.
pub type ChatStateHandler = Box<dyn Fn(&str, ChatState) + Send + Sync>;
/// Called with the sender's full address and the acknowledged message id.
pub type ReceiptHandler = Box<dyn Fn(&str, &str) + Send + Sync>;

/// An inbound chat message together with its parsed threading data.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub message: Arc<InboundMessage>,
    pub parsed: ParsedReply,
}

impl Deref for ChatMessage {
    type Target = InboundMessage;

    fn deref(&self) -> &Self::Target {
        &self.message
    }
}

/// The set of handlers supplied at construction time.
#[derive(Default)]
pub struct Handlers {
    pub direct_message: Option<DirectMessageHandler>,
    pub group_message: Option<GroupMessageHandler>,
    pub chat_state: Option<ChatStateHandler>,
    pub delivery_receipt: Option<ReceiptHandler>,
    pub read_receipt: Option<ReceiptHandler>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_direct_message<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Runtime, ChatMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Void> + Send + 'static,
    {
        self.direct_message = Some(Box::new(move |runtime: Runtime, message: ChatMessage| -> HandlerFuture { handler(runtime, message).boxed() }));
        self
    }

    pub fn on_group_message<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Runtime, Option<RoomHandle>, ChatMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Void> + Send + 'static,
    {
        self.group_message = Some(Box::new(move |runtime: Runtime, room: Option<RoomHandle>, message: ChatMessage| -> HandlerFuture {
            handler(runtime, room, message).boxed()
        }));
        self
    }

    pub fn on_chat_state<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, ChatState) + Send + Sync + 'static,
    {
        self.chat_state = Some(Box::new(handler));
        self
    }

    pub fn on_delivery_receipt<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.delivery_receipt = Some(Box::new(handler));
        self
    }

    pub fn on_read_receipt<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.read_receipt = Some(Box::new(handler));
        self
    }
}
