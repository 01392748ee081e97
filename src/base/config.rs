//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use serde::Deserialize;

use super::{address::Jid, types::Res};

/// Default capacity of each listener's delivery channel.
fn default_listener_buffer() -> usize {
    16
}

/// Default relative-time marker used in quote headers.
fn default_quote_time_marker() -> String {
    "TODO".to_string()
}

/// Configuration for the relay.
#[derive(Debug, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// Our own account address (`STANZA_RELAY_ADDRESS`).
    pub address: String,
    /// Display name; falls back to the local part of the address (`STANZA_RELAY_DISPLAY_NAME`).
    #[serde(default)]
    pub display_name: Option<String>,
    /// Joined rooms as `room@service[/nick]` (`STANZA_RELAY_ROOMS`).
    #[serde(default)]
    pub rooms: Vec<String>,
    /// Capacity of each listener's delivery channel (`STANZA_RELAY_LISTENER_BUFFER`).
    #[serde(default = "default_listener_buffer")]
    pub listener_buffer: usize,
    /// Relative-time placeholder written into quote headers (`STANZA_RELAY_QUOTE_TIME_MARKER`).
    #[serde(default = "default_quote_time_marker")]
    pub quote_time_marker: String,
}

impl ConfigInner {
    /// The display name, or the local part of our address.
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.display_name {
            return name.clone();
        }

        Jid::parse(&self.address)
            .ok()
            .and_then(|jid| jid.local().map(str::to_string))
            .unwrap_or_else(|| self.address.clone())
    }
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(
            config::Environment::default()
                .prefix("STANZA_RELAY")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("rooms"),
        );

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config::from_inner(cfg.build()?.try_deserialize()?);
        result.validate()?;

        Ok(result)
    }

    pub fn from_inner(inner: ConfigInner) -> Self {
        Self { inner: Arc::new(inner) }
    }

    pub fn validate(&self) -> Res<()> {
        Jid::parse(&self.address).map_err(|e| anyhow::anyhow!("Invalid account address: {}", e))?;

        for room in &self.rooms {
            let jid = Jid::parse(room).map_err(|e| anyhow::anyhow!("Invalid room address: {}", e))?;

            if jid.local().is_none() {
                return Err(anyhow::anyhow!("Room address `{}` must have a local part.", room));
            }
        }

        if self.listener_buffer < 1 || self.listener_buffer > 1024 {
            return Err(anyhow::anyhow!("Listener buffer must be between 1 and 1024."));
        }

        Ok(())
    }
}

// Tests.
