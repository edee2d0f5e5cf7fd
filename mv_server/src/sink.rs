//! Socket.IO implementation of the core event bus.

use map_veto::{EventSink, Target};
use serde_json::Value;
use socketioxide::SocketIo;

/// Room used for OBS overlay clients.
pub const OBS_ROOM: &str = "obs_views";

/// Room name for a lobby, namespaced to avoid colliding with socket ids.
pub fn lobby_room(lobby_id: &str) -> String {
    format!("lobby:{lobby_id}")
}

/// Bridges core [`Target`]s onto Socket.IO rooms. Per-connection delivery
/// uses the socket-id room every socket is a member of.
pub struct SocketSink {
    io: SocketIo,
}

impl SocketSink {
    pub fn new(io: SocketIo) -> Self {
        Self { io }
    }
}

impl EventSink for SocketSink {
    fn deliver(&self, target: &Target, name: &str, payload: Value) {
        let event = name.to_string();
        let result = match target {
            Target::Conn(conn) => self.io.to(conn.clone()).emit(event, &payload),
            Target::Lobby(lobby_id) => self.io.to(lobby_room(lobby_id)).emit(event, &payload),
            Target::Obs => self.io.to(OBS_ROOM.to_string()).emit(event, &payload),
            Target::All => self.io.emit(event, &payload),
        };
        if let Err(err) = result {
            tracing::debug!("failed to emit {name}: {err}");
        }
    }
}
