//! Line-delimited JSON session over stdin/stdout.
//!
//! Each stdin line is one decoded `InboundMessage`; each sent stanza is written to stdout as
//! one `OutboundMessage` line. Useful for driving the relay from another process or a test
//! harness without a live connection.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin, Stdout},
    sync::Mutex,
};
use tracing::{error, instrument, trace};

use super::{GenericSession, SessionClient};
use crate::base::{
    config::Config,
    stanza::{InboundMessage, OutboundMessage},
    types::{Res, Void},
};

// Extra methods on `SessionClient` applied by the stdio implementation.

impl SessionClient {
    /// Creates a new stdio session.
    pub fn stdio(config: &Config) -> Self {
        Self::new(Arc::new(StdioSession::new(config)))
    }
}

/// Stdio session implementation.
struct StdioSession {
    address: String,
    lines: Mutex<Lines<BufReader<Stdin>>>,
    stdout: Mutex<Stdout>,
}

impl StdioSession {
    fn new(config: &Config) -> Self {
        Self {
            address: config.address.clone(),
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
            stdout: Mutex::new(tokio::io::stdout()),
        }
    }
}

#[async_trait]
impl GenericSession for StdioSession {
    fn local_address(&self) -> &str {
        &self.address
    }

    async fn next_event(&self) -> Option<Res<InboundMessage>> {
        let mut lines = self.lines.lock().await;

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => return read_failure(e),
            };

            if line.trim().is_empty() {
                continue;
            }

            trace!("Inbound line: {}", line);

            return Some(decode_line(&line));
        }
    }

    #[instrument(skip_all)]
    async fn send(&self, message: &OutboundMessage) -> Void {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');

        let mut stdout = self.stdout.lock().await;
        stdout.write_all(line.as_bytes()).await?;
        stdout.flush().await?;

        Ok(())
    }
}

/// Map a stdin read error to a session event.
///
/// Invalid UTF-8 only spoils the current line; any other I/O error ends the session.
fn read_failure(e: std::io::Error) -> Option<Res<InboundMessage>> {
    if e.kind() == std::io::ErrorKind::InvalidData {
        return Some(Err(anyhow::anyhow!("Failed to read stdin: {}", e)));
    }

    error!("Stdin failed; ending session: {}", e);
    None
}

/// Decode one inbound JSON line.
fn decode_line(line: &str) -> Res<InboundMessage> {
    serde_json::from_str(line).map_err(|e| anyhow::anyhow!("Failed to decode stanza: {}", e))
}

// Tests.
