//! Library root for `stanza-relay`.
//!
//! Stanza-relay is the message-handling layer of a federated chat client:
//! - Routes decoded inbound stanzas to filtered, one-shot or persistent listeners
//! - Invokes direct-message, room-message, chat-state and receipt handlers
//! - Builds quoted replies with correct reply and fallback metadata
//! - Sends delivery receipts and read markers
//!
//! The connection itself is owned by a session implementation; the crate only consumes its
//! inbound feed and its send primitive through traits, allowing for easy testing.

pub mod base;
pub mod interaction;
pub mod listener;
pub mod prelude;
pub mod runtime;
pub mod service;
pub mod threading;

use base::{config::Config, types::Void};
use service::{rooms::RoomDirectory, session::SessionClient};
use tracing::info;

/// Public async entry for the binary crate.
///
/// Runs the echo bot over the stdio session until stdin closes.
pub async fn start(config: Config) -> Void {
    info!("Starting stanza-relay ...");

    let session = SessionClient::stdio(&config);
    let rooms = RoomDirectory::from_config(&config)?;

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config, session, rooms, interaction::echo::handlers());

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
