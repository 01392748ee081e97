//! Joined-room lookup.
//!
//! Room membership is managed outside this crate; the relay only needs to map a room's bare
//! address to what it knows about our presence there.

use std::{collections::HashMap, ops::Deref, sync::Arc};

use crate::base::{address::Jid, config::Config, types::Res};

// Traits.

/// Generic room directory trait.
pub trait GenericRoomDirectory: Send + Sync + 'static {
    /// Look up a joined room by its bare address.
    fn lookup_room(&self, room: &str) -> Option<RoomHandle>;
}

// Structs.

/// A room we are joined to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomHandle {
    /// Bare room address.
    pub room: String,
    /// Our nickname in the room.
    pub nick: String,
}

impl RoomHandle {
    /// Whether a room occupant address is us.
    pub fn is_me(&self, occupant: &str) -> bool {
        match Jid::parse(occupant) {
            Ok(jid) => jid.bare().to_string() == self.room && jid.resource() == Some(self.nick.as_str()),
            Err(_) => false,
        }
    }
}

/// Room directory for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct RoomDirectory {
    inner: Arc<dyn GenericRoomDirectory>,
}

impl Deref for RoomDirectory {
    type Target = dyn GenericRoomDirectory;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl RoomDirectory {
    pub fn new(inner: Arc<dyn GenericRoomDirectory>) -> Self {
        Self { inner }
    }

    /// A directory of the rooms listed in the configuration.
    pub fn from_config(config: &Config) -> Res<Self> {
        let rooms = StaticRoomDirectory::new(&config.rooms, &config.display_name())?;
        Ok(Self::new(Arc::new(rooms)))
    }
}

/// Fixed set of rooms.
#[derive(Debug, Default)]
pub struct StaticRoomDirectory {
    rooms: HashMap<String, RoomHandle>,
}

impl StaticRoomDirectory {
    /// Build from `room@service[/nick]` entries; entries without a nick use `default_nick`.
    pub fn new(entries: &[String], default_nick: &str) -> Res<Self> {
        let mut rooms = HashMap::new();

        for entry in entries {
            let jid = Jid::parse(entry).map_err(|e| anyhow::anyhow!("Invalid room address: {}", e))?;
            let room = jid.bare().to_string();
            let nick = jid.resource().unwrap_or(default_nick).to_string();

            rooms.insert(room.clone(), RoomHandle { room, nick });
        }

        Ok(Self { rooms })
    }
}

impl GenericRoomDirectory for StaticRoomDirectory {
    fn lookup_room(&self, room: &str) -> Option<RoomHandle> {
        self.rooms.get(room).cloned()
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_configured_rooms() {
        let directory = StaticRoomDirectory::new(&["lobby@muc.example.com/relay".to_string(), "dev@muc.example.com".to_string()], "bot").unwrap();

        let lobby = directory.lookup_room("lobby@muc.example.com").unwrap();
        assert_eq!(lobby.nick, "relay");

        let dev = directory.lookup_room("dev@muc.example.com").unwrap();
        assert_eq!(dev.nick, "bot");

        assert!(directory.lookup_room("other@muc.example.com").is_none());
    }

    #[test]
    fn recognizes_own_occupant_address() {
        let handle = RoomHandle {
            room: "lobby@muc.example.com".to_string(),
            nick: "relay".to_string(),
        };

        assert!(handle.is_me("lobby@muc.example.com/relay"));
        assert!(!handle.is_me("lobby@muc.example.com/carol"));
        assert!(!handle.is_me("lobby@muc.example.com"));
        assert!(!handle.is_me("not valid@"));
    }
}
