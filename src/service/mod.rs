//! Service integrations for external collaborators.
//!
//! This module contains the seams the relay consumes but does not own:
//! - The session (inbound stanza feed and outbound send primitive).
//! - The room directory (joined-room lookup).
//!
//! Each service module defines both a generic trait and a concrete implementation,
//! allowing for extensibility and easy testing.

pub mod rooms;
pub mod session;
