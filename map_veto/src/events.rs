//! Outbound event vocabulary and the abstract event bus.
//!
//! The turn controller and lobby actors never talk to the transport
//! directly. They produce ordered [`Outbound`] values; the server hands
//! them to an [`EventSink`] which maps targets onto rooms and sockets.

use crate::catalog::MAX_TEAM_NAME_LEN;
use serde::Serialize;
use serde_json::{Value, json};

/// Where an outbound event is delivered.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Target {
    /// A single connection, addressed by connection id.
    Conn(String),
    /// Every connection in a lobby room.
    Lobby(String),
    /// The dedicated OBS overlay room.
    Obs,
    /// Every connection on the server.
    All,
}

/// One event addressed to one target. Emission order is significant.
#[derive(Clone, Debug)]
pub struct Outbound {
    pub target: Target,
    pub event: ServerEvent,
}

impl Outbound {
    pub fn conn(conn: impl Into<String>, event: ServerEvent) -> Self {
        Self {
            target: Target::Conn(conn.into()),
            event,
        }
    }

    pub fn lobby(lobby_id: impl Into<String>, event: ServerEvent) -> Self {
        Self {
            target: Target::Lobby(lobby_id.into()),
            event,
        }
    }

    pub fn obs(event: ServerEvent) -> Self {
        Self {
            target: Target::Obs,
            event,
        }
    }

    pub fn all(event: ServerEvent) -> Self {
        Self {
            target: Target::All,
            event,
        }
    }
}

/// Room-scoped fan-out with per-connection addressing.
///
/// Implementations must preserve per-connection delivery order.
pub trait EventSink: Send + Sync {
    fn deliver(&self, target: &Target, name: &str, payload: Value);
}

/// Deliver a controller step's events in order.
pub fn flush(sink: &dyn EventSink, events: Vec<Outbound>) {
    for outbound in events {
        sink.deliver(
            &outbound.target,
            outbound.event.name(),
            outbound.event.payload(),
        );
    }
}

/// The FPS lobby settings echoed to joining connections.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FpsLobbySettings {
    pub game_type: String,
    pub coin_flip: bool,
    pub knife_decider: bool,
    pub map_pool_size: usize,
}

/// The closed set of server-to-client events.
#[derive(Clone, Debug)]
pub enum ServerEvent {
    LobbyExists { lobby_id: String },
    LobbyUndefined { lobby_id: String },
    LobbyCreated { lobby_id: String },
    LobbyDeleted { lobby_id: String },
    LobbyCreationError { message: String },
    LobbiesUpdated(Value),
    TeamNamesUpdated(Vec<String>),
    MapNames(Vec<String>),
    GameName(String),
    ModesSizeUpdated(u8),
    FpsLobbySettings(FpsLobbySettings),
    PickedUpdated(Value),
    BannedUpdated(Value),
    DeciderUpdated(Value),
    ModesUpdated(Value),
    ModePicked(String),
    CurrentPickedMode(Option<String>),
    CanWorkUpdated(bool),
    CanBan(bool),
    CanPick(bool),
    CanModeBan(bool),
    CanModePick(bool),
    CanReportWinner(bool),
    BackendStartPick { map: String, team_name: String },
    EndPick,
    GameStateUpdated(String),
    CoinFlipUpdated(bool),
    CardColorsUpdated(Vec<String>),
    StartWithoutCoin,
    WinnerProposed { winner: String, reporter: String },
    WinnerConfirmed { winner: String },
    WinnerRejected,
    PatternList(Value),
    AvailableMaps(Vec<String>),
    LobbyGameCategory(String),
    LobbyNotFound { lobby_id: String },
    BackendClearObs,
    AdminSetObsLobby(String),
}

impl ServerEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LobbyExists { .. } => "lobbyExists",
            Self::LobbyUndefined { .. } => "lobbyUndefined",
            Self::LobbyCreated { .. } => "lobbyCreated",
            Self::LobbyDeleted { .. } => "lobbyDeleted",
            Self::LobbyCreationError { .. } => "lobbyCreationError",
            Self::LobbiesUpdated(_) => "lobbiesUpdated",
            Self::TeamNamesUpdated(_) => "teamNamesUpdated",
            Self::MapNames(_) => "mapNames",
            Self::GameName(_) => "gameName",
            Self::ModesSizeUpdated(_) => "modesSizeUpdated",
            Self::FpsLobbySettings(_) => "fpsLobbySettings",
            Self::PickedUpdated(_) => "pickedUpdated",
            Self::BannedUpdated(_) => "bannedUpdated",
            Self::DeciderUpdated(_) => "deciderUpdated",
            Self::ModesUpdated(_) => "modesUpdated",
            Self::ModePicked(_) => "modePicked",
            Self::CurrentPickedMode(_) => "currentPickedMode",
            Self::CanWorkUpdated(_) => "canWorkUpdated",
            Self::CanBan(_) => "canBan",
            Self::CanPick(_) => "canPick",
            Self::CanModeBan(_) => "canModeBan",
            Self::CanModePick(_) => "canModePick",
            Self::CanReportWinner(_) => "canReportWinner",
            Self::BackendStartPick { .. } => "backend.startPick",
            Self::EndPick => "endPick",
            Self::GameStateUpdated(_) => "gameStateUpdated",
            Self::CoinFlipUpdated(_) => "coinFlipUpdated",
            Self::CardColorsUpdated(_) => "cardColorsUpdated",
            Self::StartWithoutCoin => "startWithoutCoin",
            Self::WinnerProposed { .. } => "winnerProposed",
            Self::WinnerConfirmed { .. } => "winnerConfirmed",
            Self::WinnerRejected => "winnerRejected",
            Self::PatternList(_) => "patternList",
            Self::AvailableMaps(_) => "availableMaps",
            Self::LobbyGameCategory(_) => "lobbyGameCategory",
            Self::LobbyNotFound { .. } => "lobbyNotFound",
            Self::BackendClearObs => "backend.clear_obs",
            Self::AdminSetObsLobby(_) => "admin.setObsLobby",
        }
    }

    /// Wire payload of the event.
    pub fn payload(&self) -> Value {
        match self {
            Self::LobbyExists { lobby_id }
            | Self::LobbyUndefined { lobby_id }
            | Self::LobbyCreated { lobby_id }
            | Self::LobbyDeleted { lobby_id }
            | Self::LobbyNotFound { lobby_id } => json!({ "lobbyId": lobby_id }),
            Self::LobbyCreationError { message } => json!({ "message": message }),
            Self::LobbiesUpdated(value)
            | Self::PickedUpdated(value)
            | Self::BannedUpdated(value)
            | Self::DeciderUpdated(value)
            | Self::ModesUpdated(value)
            | Self::PatternList(value) => value.clone(),
            Self::TeamNamesUpdated(names) => json!(names),
            Self::MapNames(maps) | Self::AvailableMaps(maps) => json!(maps),
            Self::GameName(name) => json!(name),
            Self::ModesSizeUpdated(size) => json!(size),
            Self::FpsLobbySettings(settings) => json!(settings),
            Self::ModePicked(mode) => json!(mode),
            Self::CurrentPickedMode(mode) => json!(mode),
            Self::CanWorkUpdated(flag)
            | Self::CanBan(flag)
            | Self::CanPick(flag)
            | Self::CanModeBan(flag)
            | Self::CanModePick(flag)
            | Self::CanReportWinner(flag)
            | Self::CoinFlipUpdated(flag) => json!(flag),
            Self::BackendStartPick { map, team_name } => {
                json!({ "map": map, "teamName": team_name })
            }
            Self::EndPick | Self::StartWithoutCoin | Self::BackendClearObs => Value::Null,
            Self::GameStateUpdated(message) => json!(message),
            Self::CardColorsUpdated(colors) => json!(colors),
            Self::WinnerProposed { winner, reporter } => {
                json!({ "winnerTeam": winner, "reportingTeam": reporter })
            }
            Self::WinnerConfirmed { winner } => json!({ "winnerTeam": winner }),
            Self::WinnerRejected => Value::Null,
            Self::LobbyGameCategory(category) => json!(category),
            Self::AdminSetObsLobby(lobby_id) => json!({ "lobbyId": lobby_id }),
        }
    }
}

/// Ingress sanitization for team names.
///
/// Strips control characters, trims surrounding whitespace, and caps the
/// length. Returns `None` when nothing printable remains.
pub fn sanitize_team_name(raw: &str) -> Option<String> {
    let cleaned: String = raw.chars().filter(|c| !c.is_control()).collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_TEAM_NAME_LEN).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_controls_and_trims() {
        assert_eq!(sanitize_team_name("  Navi\n"), Some("Navi".to_string()));
        assert_eq!(sanitize_team_name("a\u{0007}b"), Some("ab".to_string()));
        assert_eq!(sanitize_team_name("\t \n"), None);
        assert_eq!(sanitize_team_name(""), None);
    }

    #[test]
    fn sanitize_caps_length_on_char_boundaries() {
        let long = "ы".repeat(64);
        let cleaned = sanitize_team_name(&long).unwrap();
        assert_eq!(cleaned.chars().count(), MAX_TEAM_NAME_LEN);
    }

    #[test]
    fn event_names_match_the_wire_protocol() {
        assert_eq!(
            ServerEvent::BackendStartPick {
                map: "Nuke".to_string(),
                team_name: "A".to_string()
            }
            .name(),
            "backend.startPick"
        );
        assert_eq!(ServerEvent::BackendClearObs.name(), "backend.clear_obs");
        assert_eq!(ServerEvent::CanWorkUpdated(true).payload(), json!(true));
    }

    #[test]
    fn team_names_serialize_as_ordered_arrays() {
        let event = ServerEvent::TeamNamesUpdated(vec!["B".to_string(), "A".to_string()]);
        assert_eq!(event.payload(), json!(["B", "A"]));
    }
}
