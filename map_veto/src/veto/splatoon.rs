//! Splatoon veto rules: multi-round mode-then-map ceremonies with
//! priority-team ordering and two-phase winner confirmation.

use super::{Capabilities, VetoError, opening_index, state_update};
use crate::catalog::{Slot, SplatoonMode, VetoToken, splatoon_pattern};
use crate::events::{Outbound, ServerEvent};
use crate::lobby::model::{
    BannedMode, ConnId, Lobby, RoundRecord, SplatoonBan, SplatoonPhase, SplatoonPick,
    SplatoonState,
};

pub(super) fn start(lobby: &mut Lobby) -> Result<Vec<Outbound>, VetoError> {
    let coin_flip = lobby.rules.coin_flip;
    let first = opening_index(lobby);
    let priority = lobby
        .team_at(first)
        .map(|(_, team)| team.clone())
        .ok_or(VetoError::NeedTwoTeams)?;

    let state = lobby.splatoon_state_mut().ok_or(VetoError::WrongPhase)?;
    state.priority_team = Some(priority.clone());

    let mut events = Vec::new();
    if coin_flip {
        events.push(state_update(lobby, "Подбрасываем монетку...".to_string()));
    } else {
        events.push(Outbound::lobby(
            lobby.id.clone(),
            ServerEvent::StartWithoutCoin,
        ));
    }
    if let Some(modes) = lobby.modes_payload() {
        events.push(Outbound::lobby(
            lobby.id.clone(),
            ServerEvent::ModesUpdated(modes),
        ));
    }
    events.push(state_update(
        lobby,
        format!("Раунд 1. Приоритет у команды {priority}"),
    ));
    events.extend(grant_current(lobby));
    Ok(events)
}

pub(super) fn mode_ban(
    lobby: &mut Lobby,
    team: &str,
    mode: &str,
) -> Result<Vec<Outbound>, VetoError> {
    let mode = SplatoonMode::parse(mode).ok_or(VetoError::UnknownMode)?;
    expect_step(lobby, team, SplatoonPhase::Modes, VetoToken::Ban)?;

    let round = lobby.rules.round_number;
    {
        let state = lobby.splatoon_state_mut().ok_or(VetoError::WrongPhase)?;
        if !state.active_modes.contains(&mode) {
            return Err(VetoError::ModeNotActive);
        }
        state.active_modes.retain(|m| *m != mode);
        state.banned_modes.push(BannedMode {
            mode,
            team_name: team.to_string(),
            round,
        });
        state.phase_step += 1;
        state.game_step += 1;
    }

    let mut events = Vec::new();
    if let Some(modes) = lobby.modes_payload() {
        events.push(Outbound::lobby(
            lobby.id.clone(),
            ServerEvent::ModesUpdated(modes),
        ));
    }
    events.extend(grant_current(lobby));
    Ok(events)
}

pub(super) fn mode_pick(
    lobby: &mut Lobby,
    team: &str,
    mode: &str,
) -> Result<Vec<Outbound>, VetoError> {
    let mode = SplatoonMode::parse(mode).ok_or(VetoError::UnknownMode)?;
    expect_step(lobby, team, SplatoonPhase::Modes, VetoToken::Pick)?;

    let pool = {
        let state = lobby.splatoon_state_mut().ok_or(VetoError::WrongPhase)?;
        if !state.active_modes.contains(&mode) {
            return Err(VetoError::ModeNotActive);
        }
        state.picked_mode = Some(mode);
        state.phase = SplatoonPhase::Maps;
        state.phase_step = 0;
        state.game_step += 1;
        state.pools.get(&mode).cloned().unwrap_or_default()
    };
    lobby.rules.map_names = pool.clone();

    let mut events = vec![
        Outbound::lobby(
            lobby.id.clone(),
            ServerEvent::ModePicked(mode.as_str().to_string()),
        ),
        Outbound::lobby(
            lobby.id.clone(),
            ServerEvent::CurrentPickedMode(Some(mode.as_str().to_string())),
        ),
        Outbound::lobby(lobby.id.clone(), ServerEvent::MapNames(pool.clone())),
        Outbound::lobby(lobby.id.clone(), ServerEvent::AvailableMaps(pool)),
    ];
    events.extend(grant_current(lobby));
    Ok(events)
}

pub(super) fn ban(lobby: &mut Lobby, team: &str, map: &str) -> Result<Vec<Outbound>, VetoError> {
    expect_step(lobby, team, SplatoonPhase::Maps, VetoToken::Ban)?;
    validate_map(lobby, map)?;

    let round = lobby.rules.round_number;
    {
        let state = lobby.splatoon_state_mut().ok_or(VetoError::WrongPhase)?;
        state.banned.push(SplatoonBan {
            map: map.to_string(),
            team_name: team.to_string(),
            round,
        });
        state.phase_step += 1;
        state.game_step += 1;
    }

    let mut events = vec![
        Outbound::lobby(
            lobby.id.clone(),
            ServerEvent::BannedUpdated(lobby.banned_payload()),
        ),
        Outbound::lobby(
            lobby.id.clone(),
            ServerEvent::AvailableMaps(lobby.available_maps()),
        ),
    ];
    events.extend(grant_current(lobby));
    Ok(events)
}

pub(super) fn pick(lobby: &mut Lobby, team: &str, map: &str) -> Result<Vec<Outbound>, VetoError> {
    expect_step(lobby, team, SplatoonPhase::Maps, VetoToken::Pick)?;
    validate_map(lobby, map)?;

    let round = lobby.rules.round_number;
    {
        let state = lobby.splatoon_state_mut().ok_or(VetoError::WrongPhase)?;
        let mode = state.picked_mode.ok_or(VetoError::WrongPhase)?;
        state.picked.push(SplatoonPick {
            map: map.to_string(),
            team_name: team.to_string(),
            mode: mode.as_str().to_string(),
            round,
        });
        state.phase = SplatoonPhase::Report;
        state.phase_step = 0;
        state.game_step += 1;
    }

    let mut events = vec![Outbound::lobby(
        lobby.id.clone(),
        ServerEvent::PickedUpdated(lobby.picked_payload()),
    )];
    events.extend(grant_current(lobby));
    Ok(events)
}

pub(super) fn propose_winner(
    lobby: &mut Lobby,
    team: &str,
    winner: &str,
) -> Result<Vec<Outbound>, VetoError> {
    {
        let state = lobby.splatoon_state().ok_or(VetoError::WrongPhase)?;
        if state.phase != SplatoonPhase::Report {
            return Err(VetoError::WrongPhase);
        }
    }
    if lobby.conn_of_team(winner).is_none() {
        return Err(VetoError::UnknownWinner);
    }
    let reporter_conn = lobby
        .conn_of_team(team)
        .cloned()
        .ok_or(VetoError::NoTeamBound)?;
    let other_conn = lobby
        .other_team(team)
        .map(|(conn, _)| conn.clone())
        .ok_or(VetoError::NeedTwoTeams)?;

    {
        let state = lobby.splatoon_state_mut().ok_or(VetoError::WrongPhase)?;
        state.phase = SplatoonPhase::AwaitConfirm {
            winner: winner.to_string(),
            reporter: team.to_string(),
        };
    }

    let mut events = lobby.apply_caps(&reporter_conn, Capabilities::default());
    events.push(Outbound::conn(
        other_conn,
        ServerEvent::WinnerProposed {
            winner: winner.to_string(),
            reporter: team.to_string(),
        },
    ));
    events.push(state_update(
        lobby,
        format!("Команда {team} сообщила победителя — ожидается подтверждение"),
    ));
    Ok(events)
}

pub(super) fn confirm_winner(
    lobby: &mut Lobby,
    team: &str,
    confirmed: bool,
) -> Result<Vec<Outbound>, VetoError> {
    let (winner, reporter) = {
        let state = lobby.splatoon_state().ok_or(VetoError::WrongPhase)?;
        match &state.phase {
            SplatoonPhase::AwaitConfirm { winner, reporter } => {
                (winner.clone(), reporter.clone())
            }
            _ => return Err(VetoError::WrongPhase),
        }
    };
    if team == reporter {
        return Err(VetoError::WrongPhase);
    }

    if !confirmed {
        let rejecter_conn = lobby
            .conn_of_team(team)
            .cloned()
            .ok_or(VetoError::NoTeamBound)?;
        if let Some(state) = lobby.splatoon_state_mut() {
            state.phase = SplatoonPhase::Report;
        }
        let mut events = lobby.apply_caps(&rejecter_conn, Capabilities::report_winner());
        events.push(Outbound::lobby(lobby.id.clone(), ServerEvent::WinnerRejected));
        events.push(state_update(
            lobby,
            "Победитель отклонён — выберите заново".to_string(),
        ));
        return Ok(events);
    }

    let round = lobby.rules.round_number;
    let (map, mode) = {
        let state = lobby.splatoon_state().ok_or(VetoError::WrongPhase)?;
        let map = state
            .picked
            .iter()
            .rev()
            .find(|pick| pick.round == round)
            .map(|pick| pick.map.clone())
            .unwrap_or_default();
        let mode = state
            .picked_mode
            .map(|mode| mode.as_str().to_string())
            .unwrap_or_default();
        (map, mode)
    };

    {
        let state = lobby.splatoon_state_mut().ok_or(VetoError::WrongPhase)?;
        state.round_history.push(RoundRecord {
            round,
            mode,
            map,
            winner: winner.clone(),
        });
    }
    lobby.rules.last_winner = Some(winner.clone());

    let mut events = vec![Outbound::lobby(
        lobby.id.clone(),
        ServerEvent::WinnerConfirmed {
            winner: winner.clone(),
        },
    )];

    let wins = lobby
        .splatoon_state()
        .map(|state| {
            state
                .round_history
                .iter()
                .filter(|record| record.winner == winner)
                .count() as u32
        })
        .unwrap_or_default();
    let needed = lobby.rules.max_rounds / 2 + 1;

    if wins >= needed {
        if let Some(state) = lobby.splatoon_state_mut() {
            state.phase = SplatoonPhase::Done;
        }
        events.extend(lobby.clear_caps());
        events.push(Outbound::lobby(lobby.id.clone(), ServerEvent::EndPick));
        events.push(state_update(
            lobby,
            format!("Матч окончен — победила команда {winner}"),
        ));
    } else {
        events.extend(next_round(lobby, &winner));
    }
    Ok(events)
}

/// Reset per-round fields and hand priority to the last winner.
fn next_round(lobby: &mut Lobby, winner: &str) -> Vec<Outbound> {
    lobby.rules.round_number += 1;
    let round = lobby.rules.round_number;
    let modes_size = lobby.rules.modes_size;

    if let Some(state) = lobby.splatoon_state_mut() {
        state.priority_team = Some(winner.to_string());
        state.active_modes = state.mode_pool.clone();
        state.picked_mode = None;
        state.pattern = splatoon_pattern(modes_size, false);
        state.phase = SplatoonPhase::Modes;
        state.phase_step = 0;
        state.game_step = 0;
    }
    lobby.rules.map_names = Vec::new();

    let mut events = Vec::new();
    if let Some(modes) = lobby.modes_payload() {
        events.push(Outbound::lobby(
            lobby.id.clone(),
            ServerEvent::ModesUpdated(modes),
        ));
    }
    events.push(Outbound::lobby(
        lobby.id.clone(),
        ServerEvent::CurrentPickedMode(None),
    ));
    events.push(Outbound::lobby(
        lobby.id.clone(),
        ServerEvent::MapNames(Vec::new()),
    ));
    events.push(state_update(
        lobby,
        format!("Раунд {round}. Приоритет у команды {winner}"),
    ));
    events.extend(grant_current(lobby));
    events
}

/// Grant whatever the current phase step dictates.
fn grant_current(lobby: &mut Lobby) -> Vec<Outbound> {
    let Some(state) = lobby.splatoon_state() else {
        return Vec::new();
    };
    match state.phase {
        SplatoonPhase::Modes | SplatoonPhase::Maps => {
            let in_modes = state.phase == SplatoonPhase::Modes;
            let Some((slot, token)) = current_step(state) else {
                return Vec::new();
            };
            let Some((conn, team)) = slot_entry(lobby, slot) else {
                return Vec::new();
            };
            let (caps, message) = match (in_modes, token) {
                (true, VetoToken::Ban) => (
                    Capabilities::mode_ban(),
                    format!("Команда {team} банит режим"),
                ),
                (true, VetoToken::Pick) => (
                    Capabilities::mode_pick(),
                    format!("Команда {team} выбирает режим"),
                ),
                (false, VetoToken::Ban) => {
                    (Capabilities::ban(), format!("Команда {team} банит карту"))
                }
                (false, VetoToken::Pick) => {
                    (Capabilities::pick(), format!("Команда {team} пикает карту"))
                }
                (_, VetoToken::Decider) => return Vec::new(),
            };
            let mut events = lobby.grant_exclusive(&conn, caps);
            events.push(state_update(lobby, message));
            events
        }
        SplatoonPhase::Report => {
            let conns: Vec<ConnId> = lobby.team_names.keys().cloned().collect();
            let mut events = Vec::new();
            for conn in conns {
                events.extend(lobby.apply_caps(&conn, Capabilities::report_winner()));
            }
            events.push(state_update(
                lobby,
                "Сообщите победителя раунда".to_string(),
            ));
            events
        }
        SplatoonPhase::AwaitConfirm { .. } | SplatoonPhase::Done => Vec::new(),
    }
}

fn current_step(state: &SplatoonState) -> Option<(Slot, VetoToken)> {
    match state.phase {
        SplatoonPhase::Modes => state.pattern.modes.get(state.phase_step).copied(),
        SplatoonPhase::Maps => state.pattern.maps.get(state.phase_step).copied(),
        _ => None,
    }
}

/// Resolve a pattern slot to the connection and team it names. In an
/// admin-started lobby with a single bound team, that team fills both
/// slots so the round can still advance.
fn slot_entry(lobby: &Lobby, slot: Slot) -> Option<(ConnId, String)> {
    let state = lobby.splatoon_state()?;
    let priority = state.priority_team.clone()?;
    let priority_entry = lobby
        .conn_of_team(&priority)
        .map(|conn| (conn.clone(), priority.clone()));
    match slot {
        Slot::Priority => priority_entry,
        Slot::Other => lobby
            .other_team(&priority)
            .map(|(conn, team)| (conn.clone(), team.clone()))
            .or(priority_entry),
    }
}

/// Phase, token, and slot checks shared by every round action.
fn expect_step(
    lobby: &Lobby,
    team: &str,
    phase: SplatoonPhase,
    token: VetoToken,
) -> Result<(), VetoError> {
    let state = lobby.splatoon_state().ok_or(VetoError::WrongPhase)?;
    if state.phase != phase {
        return Err(VetoError::WrongPhase);
    }
    let (slot, current) = current_step(state).ok_or(VetoError::WrongPhase)?;
    if current != token {
        return Err(VetoError::WrongPhase);
    }
    let (_, slot_team) = slot_entry(lobby, slot).ok_or(VetoError::WrongPhase)?;
    if slot_team != team {
        return Err(VetoError::NotPermitted);
    }
    Ok(())
}

fn validate_map(lobby: &Lobby, map: &str) -> Result<(), VetoError> {
    if !lobby.rules.map_names.iter().any(|name| name == map) {
        return Err(VetoError::UnknownMap);
    }
    let state = lobby.splatoon_state().ok_or(VetoError::WrongPhase)?;
    if state.map_used_in_round(map, lobby.rules.round_number) {
        return Err(VetoError::MapAlreadyUsed);
    }
    Ok(())
}
