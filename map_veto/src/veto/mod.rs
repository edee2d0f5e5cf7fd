//! The turn controller.
//!
//! Every inbound team action passes through [`apply`]: the common preflight
//! (membership, team binding, capability), then the family-specific rules.
//! A rejected action changes nothing and broadcasts nothing; the dispatcher
//! drops the error after logging it.
//!
//! The controller is the single writer to lobby state. It is synchronous
//! and transport-free: each successful action returns the ordered list of
//! events to emit.

pub mod capability;
mod fps;
mod splatoon;

pub use capability::{CapKind, Capabilities};

use crate::catalog::GameFamily;
use crate::events::{Outbound, ServerEvent, sanitize_team_name};
use crate::lobby::model::Lobby;
use rand::Rng;
use thiserror::Error;

/// Why an action was rejected. None of these reach the wire; per the error
/// model, unauthorized or malformed team actions are dropped silently.
#[derive(Debug, Eq, Error, PartialEq)]
pub enum VetoError {
    #[error("not a lobby member")]
    NotMember,
    #[error("no team bound to this connection")]
    NoTeamBound,
    #[error("team name does not match the sender")]
    TeamMismatch,
    #[error("capability not granted")]
    NotPermitted,
    #[error("both team slots are taken")]
    LobbyFull,
    #[error("team name is empty after sanitization")]
    EmptyTeamName,
    #[error("team name already taken")]
    NameTaken,
    #[error("map is not in the pool")]
    UnknownMap,
    #[error("map was already picked or banned")]
    MapAlreadyUsed,
    #[error("unknown mode")]
    UnknownMode,
    #[error("mode is not active")]
    ModeNotActive,
    #[error("invalid side")]
    InvalidSide,
    #[error("ceremony already started")]
    AlreadyStarted,
    #[error("need two named teams")]
    NeedTwoTeams,
    #[error("action does not fit the current phase")]
    WrongPhase,
    #[error("winner is not a lobby team")]
    UnknownWinner,
}

/// An inbound team action, decoded and sanitized by the dispatcher.
#[derive(Clone, Debug)]
pub enum Action {
    SetTeamName {
        team_name: String,
    },
    Ban {
        map: String,
        team_name: String,
    },
    StartPick {
        map: String,
        team_name: String,
    },
    Pick {
        map: String,
        team_name: String,
        side: String,
    },
    Decider {
        map: String,
        team_name: String,
        side: Option<String>,
    },
    ModeBan {
        mode: String,
        team_name: String,
    },
    ModePick {
        mode: String,
        team_name: String,
    },
    ProposeWinner {
        winner_team: String,
        team_name: String,
    },
    ConfirmWinner {
        confirmed: bool,
        team_name: String,
    },
}

impl Action {
    fn team_name(&self) -> &str {
        match self {
            Self::SetTeamName { team_name }
            | Self::Ban { team_name, .. }
            | Self::StartPick { team_name, .. }
            | Self::Pick { team_name, .. }
            | Self::Decider { team_name, .. }
            | Self::ModeBan { team_name, .. }
            | Self::ModePick { team_name, .. }
            | Self::ProposeWinner { team_name, .. }
            | Self::ConfirmWinner { team_name, .. } => team_name,
        }
    }

    fn required_cap(&self) -> Option<CapKind> {
        match self {
            Self::SetTeamName { .. } => None,
            Self::Ban { .. } => Some(CapKind::Ban),
            Self::StartPick { .. } | Self::Pick { .. } | Self::Decider { .. } => {
                Some(CapKind::Pick)
            }
            Self::ModeBan { .. } => Some(CapKind::ModeBan),
            Self::ModePick { .. } => Some(CapKind::ModePick),
            Self::ProposeWinner { .. } | Self::ConfirmWinner { .. } => {
                Some(CapKind::ReportWinner)
            }
        }
    }
}

/// Validate and apply one team action.
pub fn apply(lobby: &mut Lobby, conn: &str, action: Action) -> Result<Vec<Outbound>, VetoError> {
    let Some(cap) = action.required_cap() else {
        let Action::SetTeamName { team_name } = action else {
            unreachable!("only team-name changes bypass the capability check");
        };
        return set_team_name(lobby, conn, &team_name);
    };

    let team = preflight(lobby, conn, action.team_name(), cap)?;

    match lobby.family() {
        GameFamily::Fps => match action {
            Action::Ban { map, .. } => fps::ban(lobby, &team, &map),
            Action::StartPick { map, .. } => fps::start_pick(lobby, &team, &map),
            Action::Pick { map, side, .. } => fps::pick(lobby, &team, &map, &side),
            Action::Decider { map, side, .. } => fps::decider(lobby, &team, &map, side.as_deref()),
            _ => Err(VetoError::WrongPhase),
        },
        GameFamily::Splatoon => match action {
            Action::Ban { map, .. } => splatoon::ban(lobby, &team, &map),
            Action::Pick { map, .. } => splatoon::pick(lobby, &team, &map),
            Action::ModeBan { mode, .. } => splatoon::mode_ban(lobby, &team, &mode),
            Action::ModePick { mode, .. } => splatoon::mode_pick(lobby, &team, &mode),
            Action::ProposeWinner { winner_team, .. } => {
                splatoon::propose_winner(lobby, &team, &winner_team)
            }
            Action::ConfirmWinner { confirmed, .. } => {
                splatoon::confirm_winner(lobby, &team, confirmed)
            }
            _ => Err(VetoError::WrongPhase),
        },
    }
}

/// Begin the ceremony. Fired automatically when the second team name lands,
/// or by `admin.start` (which may start an admin lobby with one team).
pub fn start(lobby: &mut Lobby) -> Result<Vec<Outbound>, VetoError> {
    if lobby.started {
        return Err(VetoError::AlreadyStarted);
    }
    if lobby.team_names.is_empty() || (lobby.team_names.len() < 2 && !lobby.rules.admin) {
        return Err(VetoError::NeedTwoTeams);
    }
    lobby.started = true;

    match lobby.family() {
        GameFamily::Fps => fps::start(lobby),
        GameFamily::Splatoon => splatoon::start(lobby),
    }
}

/// The checks every team action must pass before any side effect.
fn preflight(
    lobby: &Lobby,
    conn: &str,
    team_name: &str,
    cap: CapKind,
) -> Result<String, VetoError> {
    if !lobby.is_member(conn) {
        return Err(VetoError::NotMember);
    }
    let bound = lobby.team_of(conn).ok_or(VetoError::NoTeamBound)?;
    if bound != team_name {
        return Err(VetoError::TeamMismatch);
    }
    if !lobby.caps_of(conn).has(cap) {
        return Err(VetoError::NotPermitted);
    }
    Ok(bound.clone())
}

fn set_team_name(lobby: &mut Lobby, conn: &str, raw: &str) -> Result<Vec<Outbound>, VetoError> {
    if !lobby.is_member(conn) {
        return Err(VetoError::NotMember);
    }
    let name = sanitize_team_name(raw).ok_or(VetoError::EmptyTeamName)?;
    if !lobby.team_names.contains_key(conn) && lobby.team_names.len() >= 2 {
        return Err(VetoError::LobbyFull);
    }
    if lobby
        .team_names
        .iter()
        .any(|(other, bound)| other != conn && *bound == name)
    {
        return Err(VetoError::NameTaken);
    }

    lobby.team_names.insert(conn.to_string(), name);
    let mut events = vec![Outbound::lobby(
        lobby.id.clone(),
        ServerEvent::TeamNamesUpdated(lobby.ordered_team_names()),
    )];

    if !lobby.started && lobby.team_names.len() == 2 {
        events.extend(start(lobby)?);
    }
    Ok(events)
}

/// Record and broadcast a human-readable state message.
pub(crate) fn state_update(lobby: &mut Lobby, message: String) -> Outbound {
    lobby.last_state_message = message.clone();
    Outbound::lobby(lobby.id.clone(), ServerEvent::GameStateUpdated(message))
}

/// Coin flip for the opening actor; falls back to join order when the flip
/// is disabled or only one team is present.
pub(crate) fn opening_index(lobby: &Lobby) -> usize {
    if lobby.rules.coin_flip && lobby.team_names.len() == 2 {
        rand::rng().random_range(0..2)
    } else {
        0
    }
}
