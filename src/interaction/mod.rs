//! Event handling and user interactions for the relay.
//!
//! This module provides functionality for handling inbound stanzas:
//! - Routing each stanza to listeners and handlers
//! - Chat-state, delivery-receipt and read-marker glue
//! - The handler configuration and the demo echo handlers

pub mod dispatch;
pub mod echo;
pub mod handlers;
pub mod receipts;
