//! The lobby entity and its per-family ceremony state.

use super::rules::Rules;
use crate::catalog::{
    GameFamily, SplatoonMode, SplatoonPattern, VetoToken, fps_pattern, splatoon_pattern,
};
use crate::events::{FpsLobbySettings, Outbound, ServerEvent};
use crate::veto::Capabilities;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};

/// Connection identifier, opaque to the core (socket id on the wire).
pub type ConnId = String;

/// One picked FPS map with its side assignment.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FpsPick {
    pub map: String,
    pub team_name: String,
    pub side: String,
    pub side_team_name: String,
}

/// One banned FPS map.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FpsBan {
    pub map: String,
    pub team_name: String,
}

/// One picked Splatoon map, tagged with the round it was contested in.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplatoonPick {
    pub map: String,
    pub team_name: String,
    pub mode: String,
    pub round: u32,
}

/// One banned Splatoon map, tagged with its round.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplatoonBan {
    pub map: String,
    pub team_name: String,
    pub round: u32,
}

/// One banned Splatoon mode, tagged with its round.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BannedMode {
    pub mode: SplatoonMode,
    pub team_name: String,
    pub round: u32,
}

/// A completed Splatoon round.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
    pub round: u32,
    pub mode: String,
    pub map: String,
    pub winner: String,
}

/// Where a Splatoon round currently stands.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SplatoonPhase {
    /// Mode veto and mode pick.
    Modes,
    /// Map veto and map pick.
    Maps,
    /// Both teams may report the round winner.
    Report,
    /// A winner was proposed; the opposite team must confirm.
    AwaitConfirm { winner: String, reporter: String },
    /// The match is over.
    Done,
}

/// A BO3/BO5 pick waiting for the opposite team's side selection.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingPick {
    pub map: String,
    pub team_name: String,
}

/// FPS ceremony state.
#[derive(Clone, Debug)]
pub struct FpsState {
    pub pattern: [VetoToken; 7],
    /// Steps consumed implicitly for pools smaller than seven.
    pub initial_step: usize,
    pub game_step: usize,
    /// Index (in team-name order) of the team acting at `initial_step`.
    pub first_actor: usize,
    pub picked: Vec<FpsPick>,
    pub banned: Vec<FpsBan>,
    pub decider: Option<FpsPick>,
    pub pending_pick: Option<PendingPick>,
}

impl FpsState {
    pub fn new(rules: &Rules) -> Self {
        let format = rules.format.expect("fps rules carry a format");
        Self {
            pattern: fps_pattern(format),
            initial_step: 7 - rules.map_pool_size,
            game_step: 7 - rules.map_pool_size,
            first_actor: 0,
            picked: Vec::new(),
            banned: Vec::new(),
            decider: None,
            pending_pick: None,
        }
    }

    pub fn map_used(&self, map: &str) -> bool {
        self.picked.iter().any(|p| p.map == map)
            || self.banned.iter().any(|b| b.map == map)
            || self.decider.as_ref().is_some_and(|d| d.map == map)
    }
}

/// Splatoon ceremony state.
#[derive(Clone, Debug)]
pub struct SplatoonState {
    /// Per-mode map pools, snapshotted from the catalog at creation.
    pub pools: HashMap<SplatoonMode, Vec<String>>,
    /// The full mode pool for this lobby (two or four modes).
    pub mode_pool: Vec<SplatoonMode>,
    pub active_modes: Vec<SplatoonMode>,
    pub banned_modes: Vec<BannedMode>,
    pub picked_mode: Option<SplatoonMode>,
    pub priority_team: Option<String>,
    pub phase: SplatoonPhase,
    /// Cursor into the current phase's pattern sequence.
    pub phase_step: usize,
    /// Logical progress inside the current round.
    pub game_step: usize,
    pub pattern: SplatoonPattern,
    pub picked: Vec<SplatoonPick>,
    pub banned: Vec<SplatoonBan>,
    pub round_history: Vec<RoundRecord>,
}

impl SplatoonState {
    pub fn new(rules: &Rules, pools: HashMap<SplatoonMode, Vec<String>>) -> Self {
        let mode_pool: Vec<SplatoonMode> = if rules.modes_size == 2 {
            SplatoonMode::TWO_MODE_POOL.to_vec()
        } else {
            SplatoonMode::ALL.to_vec()
        };
        Self {
            pools,
            active_modes: mode_pool.clone(),
            mode_pool,
            banned_modes: Vec::new(),
            picked_mode: None,
            priority_team: None,
            phase: SplatoonPhase::Modes,
            phase_step: 0,
            game_step: 0,
            pattern: splatoon_pattern(rules.modes_size, true),
            picked: Vec::new(),
            banned: Vec::new(),
            round_history: Vec::new(),
        }
    }

    /// Duplicate check scoped to a single round.
    pub fn map_used_in_round(&self, map: &str, round: u32) -> bool {
        self.picked
            .iter()
            .any(|p| p.round == round && p.map == map)
            || self
                .banned
                .iter()
                .any(|b| b.round == round && b.map == map)
    }
}

/// Per-family ceremony state, dispatched by tag.
#[derive(Clone, Debug)]
pub enum LobbyGame {
    Fps(FpsState),
    Splatoon(SplatoonState),
}

/// Summary row for lobby listings.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbySummary {
    pub id: String,
    pub game: String,
    pub game_family: GameFamily,
    pub game_type: String,
    pub team_names: Vec<String>,
    pub member_count: usize,
    pub observer_count: usize,
    pub admin: bool,
    pub started: bool,
    pub round_number: u32,
}

/// A veto lobby. All mutation goes through the lobby's actor, which makes
/// the turn controller the single writer.
#[derive(Clone, Debug)]
pub struct Lobby {
    pub id: String,
    pub members: Vec<ConnId>,
    pub observers: HashSet<ConnId>,
    /// Connection to team name, in join order. The first entry is the
    /// default first actor / priority team.
    pub team_names: IndexMap<ConnId, String>,
    pub rules: Rules,
    pub game: LobbyGame,
    pub caps: HashMap<ConnId, Capabilities>,
    pub started: bool,
    pub last_state_message: String,
}

impl Lobby {
    pub fn fps(id: impl Into<String>, rules: Rules) -> Self {
        let game = LobbyGame::Fps(FpsState::new(&rules));
        Self::new(id, rules, game)
    }

    pub fn splatoon(
        id: impl Into<String>,
        rules: Rules,
        pools: HashMap<SplatoonMode, Vec<String>>,
    ) -> Self {
        let game = LobbyGame::Splatoon(SplatoonState::new(&rules, pools));
        Self::new(id, rules, game)
    }

    fn new(id: impl Into<String>, rules: Rules, game: LobbyGame) -> Self {
        Self {
            id: id.into(),
            members: Vec::new(),
            observers: HashSet::new(),
            team_names: IndexMap::new(),
            rules,
            game,
            caps: HashMap::new(),
            started: false,
            last_state_message: String::new(),
        }
    }

    pub fn family(&self) -> GameFamily {
        self.rules.family
    }

    pub fn is_member(&self, conn: &str) -> bool {
        self.members.iter().any(|m| m == conn)
    }

    pub fn team_of(&self, conn: &str) -> Option<&String> {
        self.team_names.get(conn)
    }

    pub fn conn_of_team(&self, team: &str) -> Option<&ConnId> {
        self.team_names
            .iter()
            .find(|(_, name)| name.as_str() == team)
            .map(|(conn, _)| conn)
    }

    pub fn team_at(&self, index: usize) -> Option<(&ConnId, &String)> {
        self.team_names.get_index(index)
    }

    pub fn ordered_team_names(&self) -> Vec<String> {
        self.team_names.values().cloned().collect()
    }

    /// The team that is not `team`, when both are present.
    pub fn other_team(&self, team: &str) -> Option<(&ConnId, &String)> {
        self.team_names
            .iter()
            .find(|(_, name)| name.as_str() != team)
    }

    pub fn caps_of(&self, conn: &str) -> Capabilities {
        self.caps.get(conn).copied().unwrap_or_default()
    }

    /// Replace a connection's capability record, returning the wire events
    /// for the delta (`canWorkUpdated` always first).
    pub fn apply_caps(&mut self, conn: &str, next: Capabilities) -> Vec<Outbound> {
        let prev = self.caps_of(conn);
        let events = next.wire_events(&prev);
        self.caps.insert(conn.to_string(), next);
        events
            .into_iter()
            .map(|event| Outbound::conn(conn, event))
            .collect()
    }

    /// Grant `caps` to one connection and revoke everything from every
    /// other named team. Revocations are emitted before the grant.
    pub fn grant_exclusive(&mut self, conn: &str, caps: Capabilities) -> Vec<Outbound> {
        let mut events = Vec::new();
        let conns: Vec<ConnId> = self.team_names.keys().cloned().collect();
        for other in conns.iter().filter(|c| c.as_str() != conn) {
            events.extend(self.apply_caps(other, Capabilities::default()));
        }
        events.extend(self.apply_caps(conn, caps));
        events
    }

    /// Revoke every capability from every named team.
    pub fn clear_caps(&mut self) -> Vec<Outbound> {
        let conns: Vec<ConnId> = self.team_names.keys().cloned().collect();
        conns
            .iter()
            .flat_map(|conn| self.apply_caps(conn, Capabilities::default()))
            .collect::<Vec<_>>()
    }

    pub fn fps_state(&self) -> Option<&FpsState> {
        match &self.game {
            LobbyGame::Fps(state) => Some(state),
            LobbyGame::Splatoon(_) => None,
        }
    }

    pub fn fps_state_mut(&mut self) -> Option<&mut FpsState> {
        match &mut self.game {
            LobbyGame::Fps(state) => Some(state),
            LobbyGame::Splatoon(_) => None,
        }
    }

    pub fn splatoon_state(&self) -> Option<&SplatoonState> {
        match &self.game {
            LobbyGame::Splatoon(state) => Some(state),
            LobbyGame::Fps(_) => None,
        }
    }

    pub fn splatoon_state_mut(&mut self) -> Option<&mut SplatoonState> {
        match &mut self.game {
            LobbyGame::Splatoon(state) => Some(state),
            LobbyGame::Fps(_) => None,
        }
    }

    pub fn picked_payload(&self) -> Value {
        match &self.game {
            LobbyGame::Fps(state) => json!(state.picked),
            LobbyGame::Splatoon(state) => json!(state.picked),
        }
    }

    pub fn banned_payload(&self) -> Value {
        match &self.game {
            LobbyGame::Fps(state) => json!(state.banned),
            LobbyGame::Splatoon(state) => json!(state.banned),
        }
    }

    pub fn decider_payload(&self) -> Option<Value> {
        self.fps_state()
            .and_then(|state| state.decider.as_ref())
            .map(|decider| json!(decider))
    }

    /// Mode listing for `modesUpdated`: every mode of the lobby's pool with
    /// its translation and whether it is banned in the current round.
    pub fn modes_payload(&self) -> Option<Value> {
        let state = self.splatoon_state()?;
        let entries: Vec<Value> = state
            .mode_pool
            .iter()
            .map(|mode| {
                json!({
                    "mode": mode.as_str(),
                    "name": mode.translation(),
                    "banned": !state.active_modes.contains(mode),
                })
            })
            .collect();
        Some(json!(entries))
    }

    /// The veto pattern, shaped for OBS overlays.
    pub fn pattern_payload(&self) -> Value {
        match &self.game {
            LobbyGame::Fps(state) => {
                let tokens: Vec<&str> = state.pattern.iter().map(|t| t.as_str()).collect();
                json!(tokens)
            }
            LobbyGame::Splatoon(state) => {
                let modes: Vec<&str> = state
                    .pattern
                    .modes
                    .iter()
                    .map(|(_, t)| t.as_str())
                    .collect();
                let maps: Vec<&str> = state.pattern.maps.iter().map(|(_, t)| t.as_str()).collect();
                json!({ "modes": modes, "maps": maps })
            }
        }
    }

    /// Maps that can still be acted on at this point of the ceremony.
    pub fn available_maps(&self) -> Vec<String> {
        match &self.game {
            LobbyGame::Fps(state) => self
                .rules
                .map_names
                .iter()
                .filter(|map| !state.map_used(map))
                .cloned()
                .collect(),
            LobbyGame::Splatoon(state) => {
                if state.picked_mode.is_none() {
                    return Vec::new();
                }
                self.rules
                    .map_names
                    .iter()
                    .filter(|map| !state.map_used_in_round(map, self.rules.round_number))
                    .cloned()
                    .collect()
            }
        }
    }

    pub fn summary(&self) -> LobbySummary {
        LobbySummary {
            id: self.id.clone(),
            game: self.rules.game.clone(),
            game_family: self.rules.family,
            game_type: self.rules.game_type(),
            team_names: self.ordered_team_names(),
            member_count: self.members.len(),
            observer_count: self.observers.len(),
            admin: self.rules.admin,
            started: self.started,
            round_number: self.rules.round_number,
        }
    }

    /// The state a late joiner (or the OBS room) needs to render the lobby.
    pub fn snapshot_events(&self) -> Vec<ServerEvent> {
        let mut events = vec![
            ServerEvent::GameName(self.rules.game_title.clone()),
            ServerEvent::TeamNamesUpdated(self.ordered_team_names()),
            ServerEvent::MapNames(self.rules.map_names.clone()),
        ];

        match &self.game {
            LobbyGame::Fps(_) => {
                events.push(ServerEvent::FpsLobbySettings(FpsLobbySettings {
                    game_type: self.rules.game_type(),
                    coin_flip: self.rules.coin_flip,
                    knife_decider: self.rules.knife_decider,
                    map_pool_size: self.rules.map_pool_size,
                }));
            }
            LobbyGame::Splatoon(state) => {
                events.push(ServerEvent::ModesSizeUpdated(self.rules.modes_size));
                if let Some(modes) = self.modes_payload() {
                    events.push(ServerEvent::ModesUpdated(modes));
                }
                events.push(ServerEvent::CurrentPickedMode(
                    state.picked_mode.map(|mode| mode.as_str().to_string()),
                ));
                events.push(ServerEvent::AvailableMaps(self.available_maps()));
            }
        }

        events.push(ServerEvent::PickedUpdated(self.picked_payload()));
        events.push(ServerEvent::BannedUpdated(self.banned_payload()));
        if let Some(decider) = self.decider_payload() {
            events.push(ServerEvent::DeciderUpdated(decider));
        }
        if !self.last_state_message.is_empty() {
            events.push(ServerEvent::GameStateUpdated(self.last_state_message.clone()));
        }
        events
    }
}
