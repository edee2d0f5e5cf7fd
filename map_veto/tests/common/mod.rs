//! Shared helpers for the integration tests: lobby builders and a
//! recording event sink.

#![allow(dead_code)]

use map_veto::catalog::Catalog;
use map_veto::events::{EventSink, Outbound, Target};
use map_veto::lobby::model::Lobby;
use map_veto::lobby::rules::{FpsSettings, Rules, SplatoonSettings};
use map_veto::veto::{self, Action};
use serde_json::Value;
use std::sync::Mutex;

pub const CONN_A: &str = "s1";
pub const CONN_B: &str = "s2";
pub const TEAM_A: &str = "Alpha";
pub const TEAM_B: &str = "Bravo";

/// A lobby with two members and both team names set, ceremony started
/// (coin flip off, so `TEAM_A` always opens).
pub fn started_fps_lobby(game_type: &str, knife_decider: bool, map_pool_size: usize) -> Lobby {
    let catalog = Catalog::default();
    let settings = FpsSettings {
        game: "cs2".to_string(),
        game_type: game_type.to_string(),
        coin_flip: false,
        knife_decider,
        map_pool_size: Some(map_pool_size),
        admin: false,
    };
    let rules = Rules::fps(&settings, &catalog).expect("valid fps settings");
    let mut lobby = Lobby::fps("lobby-1", rules);
    add_teams(&mut lobby);
    lobby
}

pub fn started_splatoon_lobby(modes_size: u8, rounds: u32) -> Lobby {
    let settings = SplatoonSettings {
        modes_size,
        coin_flip: false,
        admin: false,
        rounds,
    };
    let rules = Rules::splatoon(&settings).expect("valid splatoon settings");
    let pools = Catalog::default().splatoon_pools_snapshot();
    let mut lobby = Lobby::splatoon("lobby-1", rules, pools);
    add_teams(&mut lobby);
    lobby
}

fn add_teams(lobby: &mut Lobby) {
    lobby.members = vec![CONN_A.to_string(), CONN_B.to_string()];
    veto::apply(
        lobby,
        CONN_A,
        Action::SetTeamName {
            team_name: TEAM_A.to_string(),
        },
    )
    .expect("first team name");
    veto::apply(
        lobby,
        CONN_B,
        Action::SetTeamName {
            team_name: TEAM_B.to_string(),
        },
    )
    .expect("second team name starts the ceremony");
}

pub fn ban(lobby: &mut Lobby, conn: &str, team: &str, map: &str) -> Vec<Outbound> {
    veto::apply(
        lobby,
        conn,
        Action::Ban {
            map: map.to_string(),
            team_name: team.to_string(),
        },
    )
    .unwrap_or_else(|err| panic!("{team} failed to ban {map}: {err}"))
}

pub fn event_names(events: &[Outbound]) -> Vec<&'static str> {
    events.iter().map(|outbound| outbound.event.name()).collect()
}

pub fn has_event(events: &[Outbound], name: &str) -> bool {
    events.iter().any(|outbound| outbound.event.name() == name)
}

/// At most one connection may hold the work gate.
pub fn assert_single_work_holder(lobby: &Lobby) {
    let holders = lobby.caps.values().filter(|caps| caps.work).count();
    assert!(holders <= 1, "{holders} connections hold canWork");
}

/// Event sink that records everything for later assertions.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(Target, String, Value)>>,
}

impl RecordingSink {
    pub fn take(&self) -> Vec<(Target, String, Value)> {
        std::mem::take(&mut self.events.lock().expect("sink lock"))
    }

    pub fn snapshot(&self) -> Vec<(Target, String, Value)> {
        self.events.lock().expect("sink lock").clone()
    }

    pub fn payloads_for(&self, target: &Target, name: &str) -> Vec<Value> {
        self.snapshot()
            .into_iter()
            .filter(|(t, n, _)| t == target && n == name)
            .map(|(_, _, payload)| payload)
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn deliver(&self, target: &Target, name: &str, payload: Value) {
        self.events
            .lock()
            .expect("sink lock")
            .push((target.clone(), name.to_string(), payload));
    }
}
