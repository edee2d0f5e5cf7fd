//! Splatoon multi-round ceremonies: mode veto, priority transfer, and
//! two-phase winner confirmation.

mod common;

use common::{
    CONN_A, CONN_B, TEAM_A, TEAM_B, assert_single_work_holder, has_event, started_splatoon_lobby,
};
use map_veto::catalog::Catalog;
use map_veto::events::Target;
use map_veto::lobby::model::{Lobby, SplatoonPhase};
use map_veto::lobby::rules::{Rules, SplatoonSettings};
use map_veto::veto::{self, Action};

fn mode_ban(mode: &str, team: &str) -> Action {
    Action::ModeBan {
        mode: mode.to_string(),
        team_name: team.to_string(),
    }
}

fn mode_pick(mode: &str, team: &str) -> Action {
    Action::ModePick {
        mode: mode.to_string(),
        team_name: team.to_string(),
    }
}

fn map_ban(map: &str, team: &str) -> Action {
    Action::Ban {
        map: map.to_string(),
        team_name: team.to_string(),
    }
}

fn map_pick(map: &str, team: &str) -> Action {
    Action::Pick {
        map: map.to_string(),
        team_name: team.to_string(),
        side: String::new(),
    }
}

fn propose(winner: &str, team: &str) -> Action {
    Action::ProposeWinner {
        winner_team: winner.to_string(),
        team_name: team.to_string(),
    }
}

fn confirm(confirmed: bool, team: &str) -> Action {
    Action::ConfirmWinner {
        confirmed,
        team_name: team.to_string(),
    }
}

/// Drive a full first round of a 4-mode lobby up to the winner report.
fn play_four_mode_round_one(lobby: &mut Lobby) {
    veto::apply(lobby, CONN_A, mode_ban("rainmaker", TEAM_A)).unwrap();
    veto::apply(lobby, CONN_B, mode_ban("clams", TEAM_B)).unwrap();
    veto::apply(lobby, CONN_A, mode_pick("tower", TEAM_A)).unwrap();

    let pool = lobby.rules.map_names.clone();
    veto::apply(lobby, CONN_A, map_ban(&pool[0], TEAM_A)).unwrap();
    veto::apply(lobby, CONN_A, map_ban(&pool[1], TEAM_A)).unwrap();
    veto::apply(lobby, CONN_B, map_ban(&pool[2], TEAM_B)).unwrap();
    veto::apply(lobby, CONN_B, map_ban(&pool[3], TEAM_B)).unwrap();
    veto::apply(lobby, CONN_B, map_ban(&pool[4], TEAM_B)).unwrap();
    veto::apply(lobby, CONN_A, map_pick(&pool[5], TEAM_A)).unwrap();
}

#[test]
fn four_mode_round_one_follows_the_priority_pattern() {
    let mut lobby = started_splatoon_lobby(4, 3);
    assert_eq!(
        lobby.splatoon_state().unwrap().priority_team.as_deref(),
        Some(TEAM_A)
    );

    play_four_mode_round_one(&mut lobby);

    let state = lobby.splatoon_state().unwrap();
    assert_eq!(state.banned_modes.len(), 2);
    assert_eq!(state.active_modes.len(), 2);
    assert_eq!(state.picked_mode.map(|m| m.as_str()), Some("tower"));

    let catalog = Catalog::default();
    assert_eq!(
        lobby.rules.map_names,
        catalog.splatoon_map_pool(map_veto::SplatoonMode::Tower)
    );

    let round_banned: Vec<_> = state.banned.iter().filter(|b| b.round == 1).collect();
    assert_eq!(round_banned.len(), 5);
    assert_eq!(state.picked.len(), 1);
    assert_eq!(state.picked[0].team_name, TEAM_A);
    assert_eq!(state.picked[0].mode, "tower");

    // Both members may now report the winner, with the work gate down.
    assert!(lobby.caps_of(CONN_A).report_winner);
    assert!(lobby.caps_of(CONN_B).report_winner);
    assert!(!lobby.caps_of(CONN_A).work);
    assert!(!lobby.caps_of(CONN_B).work);
}

#[test]
fn rejected_winner_returns_the_report_to_the_rejecting_team_only() {
    let mut lobby = started_splatoon_lobby(4, 3);
    play_four_mode_round_one(&mut lobby);

    // Bravo claims Alpha won; Alpha disagrees.
    let events = veto::apply(&mut lobby, CONN_B, propose(TEAM_A, TEAM_B)).unwrap();
    assert!(events.iter().any(|e| {
        e.event.name() == "winnerProposed" && e.target == Target::Conn(CONN_A.to_string())
    }));

    let events = veto::apply(&mut lobby, CONN_A, confirm(false, TEAM_A)).unwrap();
    assert!(has_event(&events, "winnerRejected"));
    assert!(lobby.caps_of(CONN_A).report_winner);
    assert!(!lobby.caps_of(CONN_B).report_winner);
    assert!(lobby.last_state_message.contains("отклонён"));

    // The proposer cannot confirm their own report either way.
    veto::apply(&mut lobby, CONN_A, propose(TEAM_B, TEAM_A)).unwrap();
    assert!(
        veto::apply(&mut lobby, CONN_A, confirm(true, TEAM_A)).is_err(),
        "reporter must not confirm their own proposal"
    );
}

#[test]
fn confirmed_winner_transfers_priority_to_the_next_round() {
    let mut lobby = started_splatoon_lobby(4, 3);
    play_four_mode_round_one(&mut lobby);

    veto::apply(&mut lobby, CONN_A, propose(TEAM_B, TEAM_A)).unwrap();
    let events = veto::apply(&mut lobby, CONN_B, confirm(true, TEAM_B)).unwrap();
    assert!(has_event(&events, "winnerConfirmed"));

    assert_eq!(lobby.rules.last_winner.as_deref(), Some(TEAM_B));
    assert_eq!(lobby.rules.round_number, 2);

    let state = lobby.splatoon_state().unwrap();
    assert_eq!(state.priority_team.as_deref(), Some(TEAM_B));
    assert_eq!(state.round_history.len(), 1);
    assert_eq!(state.round_history[0].winner, TEAM_B);
    assert_eq!(state.round_history[0].mode, "tower");
    // Per-round fields reset: all four modes are active again.
    assert_eq!(state.active_modes.len(), 4);
    assert!(state.picked_mode.is_none());

    // Round 2, 4-mode: winner bans one mode, the loser picks.
    veto::apply(&mut lobby, CONN_B, mode_ban("clams", TEAM_B)).unwrap();
    veto::apply(&mut lobby, CONN_A, mode_pick("zones", TEAM_A)).unwrap();

    // Map phase: winner bans three, loser picks.
    let pool = lobby.rules.map_names.clone();
    veto::apply(&mut lobby, CONN_B, map_ban(&pool[0], TEAM_B)).unwrap();
    veto::apply(&mut lobby, CONN_B, map_ban(&pool[1], TEAM_B)).unwrap();
    veto::apply(&mut lobby, CONN_B, map_ban(&pool[2], TEAM_B)).unwrap();
    veto::apply(&mut lobby, CONN_A, map_pick(&pool[3], TEAM_A)).unwrap();

    let state = lobby.splatoon_state().unwrap();
    assert_eq!(state.phase, SplatoonPhase::Report);
    assert_eq!(
        state.banned.iter().filter(|b| b.round == 2).count(),
        3,
        "round 2 of a 4-mode lobby has exactly three bans"
    );
}

#[test]
fn two_mode_lobby_skips_the_mode_veto() {
    let mut lobby = started_splatoon_lobby(2, 3);

    // No mode bans: priority picks straight away from {tower, zones}.
    assert!(veto::apply(&mut lobby, CONN_A, mode_ban("tower", TEAM_A)).is_err());
    assert_ne!(lobby.splatoon_state().unwrap().phase, SplatoonPhase::Maps);

    veto::apply(&mut lobby, CONN_A, mode_pick("tower", TEAM_A)).unwrap();

    let pool = lobby.rules.map_names.clone();
    veto::apply(&mut lobby, CONN_A, map_ban(&pool[0], TEAM_A)).unwrap();
    veto::apply(&mut lobby, CONN_A, map_ban(&pool[1], TEAM_A)).unwrap();
    veto::apply(&mut lobby, CONN_B, map_ban(&pool[2], TEAM_B)).unwrap();
    veto::apply(&mut lobby, CONN_B, map_ban(&pool[3], TEAM_B)).unwrap();
    veto::apply(&mut lobby, CONN_B, map_ban(&pool[4], TEAM_B)).unwrap();
    veto::apply(&mut lobby, CONN_A, map_pick(&pool[5], TEAM_A)).unwrap();

    veto::apply(&mut lobby, CONN_A, propose(TEAM_B, TEAM_A)).unwrap();
    veto::apply(&mut lobby, CONN_B, confirm(true, TEAM_B)).unwrap();

    // Round 2: the winner keeps the two-mode map pattern (2 bans, 3 bans,
    // pick) with priority on their side.
    assert_eq!(
        lobby.splatoon_state().unwrap().priority_team.as_deref(),
        Some(TEAM_B)
    );
    veto::apply(&mut lobby, CONN_B, mode_pick("zones", TEAM_B)).unwrap();

    let pool = lobby.rules.map_names.clone();
    veto::apply(&mut lobby, CONN_B, map_ban(&pool[0], TEAM_B)).unwrap();
    veto::apply(&mut lobby, CONN_B, map_ban(&pool[1], TEAM_B)).unwrap();
    veto::apply(&mut lobby, CONN_A, map_ban(&pool[2], TEAM_A)).unwrap();
    veto::apply(&mut lobby, CONN_A, map_ban(&pool[3], TEAM_A)).unwrap();
    veto::apply(&mut lobby, CONN_A, map_ban(&pool[4], TEAM_A)).unwrap();
    veto::apply(&mut lobby, CONN_B, map_pick(&pool[5], TEAM_B)).unwrap();

    let state = lobby.splatoon_state().unwrap();
    assert_eq!(state.picked.iter().filter(|p| p.round == 2).count(), 1);
    assert_eq!(state.picked.last().unwrap().team_name, TEAM_B);
}

#[test]
fn majority_of_rounds_ends_the_match() {
    let mut lobby = started_splatoon_lobby(4, 3);
    play_four_mode_round_one(&mut lobby);
    veto::apply(&mut lobby, CONN_A, propose(TEAM_B, TEAM_A)).unwrap();
    veto::apply(&mut lobby, CONN_B, confirm(true, TEAM_B)).unwrap();

    // Round 2, won by Bravo again: two of three rounds is a majority.
    veto::apply(&mut lobby, CONN_B, mode_ban("clams", TEAM_B)).unwrap();
    veto::apply(&mut lobby, CONN_A, mode_pick("tower", TEAM_A)).unwrap();
    let pool = lobby.rules.map_names.clone();
    let available: Vec<String> = lobby.available_maps();
    assert_eq!(pool, available, "round 2 starts with a fresh pool");
    veto::apply(&mut lobby, CONN_B, map_ban(&pool[0], TEAM_B)).unwrap();
    veto::apply(&mut lobby, CONN_B, map_ban(&pool[1], TEAM_B)).unwrap();
    veto::apply(&mut lobby, CONN_B, map_ban(&pool[2], TEAM_B)).unwrap();
    veto::apply(&mut lobby, CONN_A, map_pick(&pool[3], TEAM_A)).unwrap();

    veto::apply(&mut lobby, CONN_A, propose(TEAM_B, TEAM_A)).unwrap();
    let events = veto::apply(&mut lobby, CONN_B, confirm(true, TEAM_B)).unwrap();

    assert!(has_event(&events, "endPick"));
    let state = lobby.splatoon_state().unwrap();
    assert_eq!(state.phase, SplatoonPhase::Done);
    assert!(lobby.caps.values().all(|caps| !caps.work && !caps.report_winner));
    assert!(lobby.last_state_message.contains(TEAM_B));
}

#[test]
fn splatoon_start_emits_the_work_gate_before_the_mode_capability() {
    let settings = SplatoonSettings {
        modes_size: 4,
        coin_flip: false,
        admin: false,
        rounds: 3,
    };
    let rules = Rules::splatoon(&settings).unwrap();
    let pools = Catalog::default().splatoon_pools_snapshot();
    let mut lobby = Lobby::splatoon("lobby-1", rules, pools);
    lobby.members = vec![CONN_A.to_string(), CONN_B.to_string()];

    veto::apply(
        &mut lobby,
        CONN_A,
        Action::SetTeamName {
            team_name: TEAM_A.to_string(),
        },
    )
    .unwrap();
    let events = veto::apply(
        &mut lobby,
        CONN_B,
        Action::SetTeamName {
            team_name: TEAM_B.to_string(),
        },
    )
    .unwrap();

    // Ordering guarantee: no sleep, just emission order.
    let to_opener: Vec<&str> = events
        .iter()
        .filter(|e| e.target == Target::Conn(CONN_A.to_string()))
        .map(|e| e.event.name())
        .collect();
    let work_at = to_opener.iter().position(|n| *n == "canWorkUpdated");
    let mode_ban_at = to_opener.iter().position(|n| *n == "canModeBan");
    assert!(work_at.is_some() && mode_ban_at.is_some());
    assert!(work_at < mode_ban_at);

    assert_single_work_holder(&lobby);
}

#[test]
fn admin_start_with_one_team_keeps_the_ceremony_moving() {
    let settings = SplatoonSettings {
        modes_size: 4,
        coin_flip: false,
        admin: true,
        rounds: 3,
    };
    let rules = Rules::splatoon(&settings).unwrap();
    let pools = Catalog::default().splatoon_pools_snapshot();
    let mut lobby = Lobby::splatoon("lobby-1", rules, pools);
    lobby.members = vec![CONN_A.to_string()];
    veto::apply(
        &mut lobby,
        CONN_A,
        Action::SetTeamName {
            team_name: TEAM_A.to_string(),
        },
    )
    .unwrap();
    veto::start(&mut lobby).unwrap();

    // The single team fills both pattern slots, so every step grants.
    veto::apply(&mut lobby, CONN_A, mode_ban("rainmaker", TEAM_A)).unwrap();
    veto::apply(&mut lobby, CONN_A, mode_ban("clams", TEAM_A)).unwrap();
    veto::apply(&mut lobby, CONN_A, mode_pick("tower", TEAM_A)).unwrap();

    let pool = lobby.rules.map_names.clone();
    for map in &pool[..5] {
        veto::apply(&mut lobby, CONN_A, map_ban(map, TEAM_A)).unwrap();
    }
    veto::apply(&mut lobby, CONN_A, map_pick(&pool[5], TEAM_A)).unwrap();

    assert_eq!(lobby.splatoon_state().unwrap().phase, SplatoonPhase::Report);
    assert!(lobby.caps_of(CONN_A).report_winner);
}

#[test]
fn map_actions_outside_the_map_phase_are_rejected() {
    let mut lobby = started_splatoon_lobby(4, 3);

    // Still in the mode phase: no map bans yet.
    let pool: Vec<String> = Catalog::default()
        .splatoon_map_pool(map_veto::SplatoonMode::Tower)
        .to_vec();
    assert!(veto::apply(&mut lobby, CONN_A, map_ban(&pool[0], TEAM_A)).is_err());

    // Banning an unknown or repeated mode fails too.
    veto::apply(&mut lobby, CONN_A, mode_ban("rainmaker", TEAM_A)).unwrap();
    assert!(veto::apply(&mut lobby, CONN_B, mode_ban("rainmaker", TEAM_B)).is_err());
    assert!(veto::apply(&mut lobby, CONN_B, mode_ban("ranked", TEAM_B)).is_err());
}
