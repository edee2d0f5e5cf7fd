//! FPS veto rules: alternating ban/pick over a seven-step pattern, with
//! side selection and the optional knife decider.

use super::{Capabilities, VetoError, opening_index, state_update};
use crate::catalog::{FpsFormat, VetoToken};
use crate::events::{Outbound, ServerEvent};
use crate::lobby::model::{FpsBan, FpsPick, Lobby, PendingPick};

pub(super) fn start(lobby: &mut Lobby) -> Result<Vec<Outbound>, VetoError> {
    let coin_flip = lobby.rules.coin_flip;
    let first = opening_index(lobby);
    let state = lobby.fps_state_mut().ok_or(VetoError::WrongPhase)?;
    state.first_actor = first;

    let mut events = Vec::new();
    if coin_flip {
        events.push(state_update(lobby, "Подбрасываем монетку...".to_string()));
    } else {
        events.push(Outbound::lobby(
            lobby.id.clone(),
            ServerEvent::StartWithoutCoin,
        ));
    }
    events.extend(grant_step(lobby));
    Ok(events)
}

pub(super) fn ban(lobby: &mut Lobby, team: &str, map: &str) -> Result<Vec<Outbound>, VetoError> {
    validate_map(lobby, map)?;
    let entry = FpsBan {
        map: map.to_string(),
        team_name: team.to_string(),
    };
    {
        let state = lobby.fps_state_mut().ok_or(VetoError::WrongPhase)?;
        if state.game_step >= 7 || state.pattern[state.game_step] != VetoToken::Ban {
            return Err(VetoError::WrongPhase);
        }
        state.banned.push(entry);
        state.game_step += 1;
    }

    let mut events = vec![Outbound::lobby(
        lobby.id.clone(),
        ServerEvent::BannedUpdated(lobby.banned_payload()),
    )];
    events.extend(grant_step(lobby));
    Ok(events)
}

/// BO3/BO5 first half of a pick: the picker names the map, then the
/// opposite team takes over for side selection.
pub(super) fn start_pick(
    lobby: &mut Lobby,
    team: &str,
    map: &str,
) -> Result<Vec<Outbound>, VetoError> {
    if lobby.rules.format == Some(FpsFormat::Bo1) {
        return Err(VetoError::WrongPhase);
    }
    validate_map(lobby, map)?;

    let (side_conn, side_team) = lobby
        .other_team(team)
        .map(|(conn, name)| (conn.clone(), name.clone()))
        .ok_or(VetoError::NeedTwoTeams)?;

    {
        let state = lobby.fps_state_mut().ok_or(VetoError::WrongPhase)?;
        if state.game_step >= 7
            || state.pattern[state.game_step] != VetoToken::Pick
            || state.pending_pick.is_some()
        {
            return Err(VetoError::WrongPhase);
        }
        state.pending_pick = Some(PendingPick {
            map: map.to_string(),
            team_name: team.to_string(),
        });
    }

    let mut events = vec![Outbound::lobby(
        lobby.id.clone(),
        ServerEvent::BackendStartPick {
            map: map.to_string(),
            team_name: team.to_string(),
        },
    )];
    events.extend(lobby.grant_exclusive(&side_conn, Capabilities::pick()));
    events.push(state_update(
        lobby,
        format!("Команда {side_team} выбирает сторону"),
    ));
    Ok(events)
}

pub(super) fn pick(
    lobby: &mut Lobby,
    team: &str,
    map: &str,
    side: &str,
) -> Result<Vec<Outbound>, VetoError> {
    let side = normalize_side(side)?;
    let pending = lobby
        .fps_state()
        .ok_or(VetoError::WrongPhase)?
        .pending_pick
        .clone();

    let entry = match pending {
        Some(pending) => {
            if pending.map != map {
                return Err(VetoError::UnknownMap);
            }
            FpsPick {
                map: pending.map,
                team_name: pending.team_name,
                side,
                side_team_name: team.to_string(),
            }
        }
        None => {
            // Only BO1 picks map and side in one action.
            if lobby.rules.format != Some(FpsFormat::Bo1) {
                return Err(VetoError::WrongPhase);
            }
            validate_map(lobby, map)?;
            FpsPick {
                map: map.to_string(),
                team_name: team.to_string(),
                side,
                side_team_name: team.to_string(),
            }
        }
    };

    {
        let state = lobby.fps_state_mut().ok_or(VetoError::WrongPhase)?;
        if state.game_step >= 7 || state.pattern[state.game_step] != VetoToken::Pick {
            return Err(VetoError::WrongPhase);
        }
        state.pending_pick = None;
        state.picked.push(entry);
        state.game_step += 1;
    }

    let mut events = vec![Outbound::lobby(
        lobby.id.clone(),
        ServerEvent::PickedUpdated(lobby.picked_payload()),
    )];
    events.extend(grant_step(lobby));
    Ok(events)
}

/// Decider choice when the knife decider is disabled: the team that did not
/// act last picks the remaining map and its side.
pub(super) fn decider(
    lobby: &mut Lobby,
    team: &str,
    map: &str,
    side: Option<&str>,
) -> Result<Vec<Outbound>, VetoError> {
    if lobby.rules.knife_decider {
        return Err(VetoError::WrongPhase);
    }
    validate_map(lobby, map)?;
    let side = normalize_side(side.unwrap_or("knife"))?;

    {
        let state = lobby.fps_state_mut().ok_or(VetoError::WrongPhase)?;
        if state.game_step >= 7 || state.pattern[state.game_step] != VetoToken::Decider {
            return Err(VetoError::WrongPhase);
        }
        state.decider = Some(FpsPick {
            map: map.to_string(),
            team_name: team.to_string(),
            side,
            side_team_name: team.to_string(),
        });
        state.game_step += 1;
    }

    let mut events = Vec::new();
    if let Some(payload) = lobby.decider_payload() {
        events.push(Outbound::lobby(
            lobby.id.clone(),
            ServerEvent::DeciderUpdated(payload),
        ));
    }
    events.push(state_update(lobby, format!("Десайдер — {map}")));
    events.extend(grant_step(lobby));
    Ok(events)
}

/// Advance to the current pattern step: grant the capability it dictates,
/// auto-resolve a knife decider, or finish the ceremony.
pub(super) fn grant_step(lobby: &mut Lobby) -> Vec<Outbound> {
    let Some(state) = lobby.fps_state() else {
        return Vec::new();
    };
    if state.game_step >= 7 {
        return finish(lobby);
    }

    match state.pattern[state.game_step] {
        VetoToken::Ban => grant_turn(lobby, Capabilities::ban(), "банит карту"),
        VetoToken::Pick => grant_turn(lobby, Capabilities::pick(), "пикает карту"),
        VetoToken::Decider => {
            if lobby.rules.knife_decider {
                auto_decider(lobby)
            } else {
                grant_turn(lobby, Capabilities::pick(), "выбирает десайдер")
            }
        }
    }
}

fn grant_turn(lobby: &mut Lobby, caps: Capabilities, verb: &str) -> Vec<Outbound> {
    let Some((conn, team)) = actor_entry(lobby) else {
        return Vec::new();
    };
    let mut events = lobby.grant_exclusive(&conn, caps);
    events.push(state_update(lobby, format!("Команда {team} {verb}")));
    events
}

/// The team whose turn it is, by strict alternation from the opening actor.
fn actor_entry(lobby: &Lobby) -> Option<(String, String)> {
    let state = lobby.fps_state()?;
    let teams = lobby.team_names.len();
    if teams == 0 {
        return None;
    }
    let index = (state.first_actor + (state.game_step - state.initial_step)) % teams;
    lobby
        .team_at(index)
        .map(|(conn, team)| (conn.clone(), team.clone()))
}

fn auto_decider(lobby: &mut Lobby) -> Vec<Outbound> {
    let Some(map) = lobby.available_maps().into_iter().next() else {
        return finish(lobby);
    };
    if let Some(state) = lobby.fps_state_mut() {
        state.decider = Some(FpsPick {
            map: map.clone(),
            team_name: String::new(),
            side: "DECIDER".to_string(),
            side_team_name: String::new(),
        });
        state.game_step += 1;
    }

    let mut events = Vec::new();
    if let Some(payload) = lobby.decider_payload() {
        events.push(Outbound::lobby(
            lobby.id.clone(),
            ServerEvent::DeciderUpdated(payload),
        ));
    }
    events.push(state_update(lobby, format!("Десайдер — {map}")));
    events.extend(finish(lobby));
    events
}

fn finish(lobby: &mut Lobby) -> Vec<Outbound> {
    let mut events = lobby.clear_caps();
    events.push(Outbound::lobby(lobby.id.clone(), ServerEvent::EndPick));
    events.push(state_update(lobby, "Пик окончен".to_string()));
    events
}

fn validate_map(lobby: &Lobby, map: &str) -> Result<(), VetoError> {
    if !lobby.rules.map_names.iter().any(|name| name == map) {
        return Err(VetoError::UnknownMap);
    }
    let state = lobby.fps_state().ok_or(VetoError::WrongPhase)?;
    if state.map_used(map) {
        return Err(VetoError::MapAlreadyUsed);
    }
    Ok(())
}

fn normalize_side(raw: &str) -> Result<String, VetoError> {
    let lower = raw.to_ascii_lowercase();
    match lower.as_str() {
        "t" | "ct" | "knife" => Ok(lower),
        _ => Err(VetoError::InvalidSide),
    }
}
