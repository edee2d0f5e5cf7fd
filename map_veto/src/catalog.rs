//! Static game definitions: map pools, veto patterns, mode translations.
//!
//! The catalog is process-wide and admin-editable. Lobbies take a deep copy
//! of the pools they need at creation time, so later edits never leak into
//! ceremonies that are already running.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Default FPS game identifier.
pub const DEFAULT_FPS_GAME: &str = "cs2";

/// Hard cap on sanitized team name length.
pub const MAX_TEAM_NAME_LEN: usize = 32;

const CS2_MAP_POOL: [&str; 7] = [
    "Ancient", "Anubis", "Dust2", "Inferno", "Mirage", "Nuke", "Train",
];

const ZONES_MAP_POOL: [&str; 8] = [
    "Scorch Gorge",
    "Eeltail Alley",
    "Hagglefish Market",
    "Undertow Spillway",
    "Hammerhead Bridge",
    "Museum d'Alfonsino",
    "Mahi-Mahi Resort",
    "Inkblot Art Academy",
];

const TOWER_MAP_POOL: [&str; 8] = [
    "Scorch Gorge",
    "Eeltail Alley",
    "Sturgeon Shipyard",
    "MakoMart",
    "Wahoo World",
    "Flounder Heights",
    "Brinewater Springs",
    "Um'ami Ruins",
];

const RAINMAKER_MAP_POOL: [&str; 8] = [
    "Undertow Spillway",
    "Mincemeat Metalworks",
    "Hammerhead Bridge",
    "Manta Maria",
    "Barnacle & Dime",
    "Crableg Capital",
    "Shipshape Cargo Co.",
    "Bluefin Depot",
];

const CLAMS_MAP_POOL: [&str; 8] = [
    "Scorch Gorge",
    "Mincemeat Metalworks",
    "Museum d'Alfonsino",
    "Mahi-Mahi Resort",
    "Humpback Pump Track",
    "Robo ROM-en",
    "Marlin Airport",
    "Lemuria Hub",
];

const DEFAULT_CARD_COLORS: [&str; 2] = ["#de9b35", "#639bde"];

/// Which family of veto rules a lobby runs.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameFamily {
    Fps,
    Splatoon,
}

impl GameFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fps => "fps",
            Self::Splatoon => "splatoon",
        }
    }
}

impl fmt::Display for GameFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// FPS series format. Controls the veto pattern.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FpsFormat {
    Bo1,
    Bo3,
    Bo5,
}

impl FpsFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "bo1" => Some(Self::Bo1),
            "bo3" => Some(Self::Bo3),
            "bo5" => Some(Self::Bo5),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bo1 => "bo1",
            Self::Bo3 => "bo3",
            Self::Bo5 => "bo5",
        }
    }
}

/// A single step of a veto pattern.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VetoToken {
    Ban,
    Pick,
    Decider,
}

impl VetoToken {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ban => "ban",
            Self::Pick => "pick",
            Self::Decider => "decider",
        }
    }
}

/// Splatoon mode identifiers.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SplatoonMode {
    Zones,
    Tower,
    Rainmaker,
    Clams,
}

impl SplatoonMode {
    pub const ALL: [Self; 4] = [Self::Zones, Self::Tower, Self::Rainmaker, Self::Clams];

    /// The reduced pool used when a lobby runs with two modes.
    pub const TWO_MODE_POOL: [Self; 2] = [Self::Tower, Self::Zones];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "zones" => Some(Self::Zones),
            "tower" => Some(Self::Tower),
            "rainmaker" => Some(Self::Rainmaker),
            "clams" => Some(Self::Clams),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zones => "zones",
            Self::Tower => "tower",
            Self::Rainmaker => "rainmaker",
            Self::Clams => "clams",
        }
    }

    /// Localized display name used in broadcast text.
    pub fn translation(self) -> &'static str {
        match self {
            Self::Zones => "Бой за зоны",
            Self::Tower => "Бой за башню",
            Self::Rainmaker => "Мегакарп",
            Self::Clams => "Устробол",
        }
    }
}

impl fmt::Display for SplatoonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of the two teams a Splatoon pattern step belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Slot {
    Priority,
    Other,
}

/// The mode and map step sequences for one Splatoon round.
#[derive(Clone, Debug)]
pub struct SplatoonPattern {
    pub modes: Vec<(Slot, VetoToken)>,
    pub maps: Vec<(Slot, VetoToken)>,
}

/// The fixed seven-step FPS veto pattern for a format.
///
/// Lobbies with a smaller map pool start with `game_step = 7 - pool size`,
/// consuming the leading tokens implicitly.
pub fn fps_pattern(format: FpsFormat) -> [VetoToken; 7] {
    use VetoToken::{Ban, Decider, Pick};
    match format {
        FpsFormat::Bo1 => [Ban, Ban, Ban, Ban, Ban, Ban, Pick],
        FpsFormat::Bo3 => [Ban, Ban, Pick, Pick, Ban, Ban, Decider],
        FpsFormat::Bo5 => [Ban, Ban, Pick, Pick, Pick, Pick, Decider],
    }
}

/// The Splatoon round pattern for a mode-pool size.
///
/// Round 1 uses the "first" pattern; every later round uses the "next"
/// pattern with the previous round's winner as the priority team.
pub fn splatoon_pattern(modes_size: u8, first_round: bool) -> SplatoonPattern {
    use Slot::{Other, Priority};
    use VetoToken::{Ban, Pick};

    let modes = match (modes_size, first_round) {
        (2, _) => vec![(Priority, Pick)],
        (_, true) => vec![(Priority, Ban), (Other, Ban), (Priority, Pick)],
        (_, false) => vec![(Priority, Ban), (Other, Pick)],
    };

    let maps = if modes_size == 2 || first_round {
        vec![
            (Priority, Ban),
            (Priority, Ban),
            (Other, Ban),
            (Other, Ban),
            (Other, Ban),
            (Priority, Pick),
        ]
    } else {
        vec![
            (Priority, Ban),
            (Priority, Ban),
            (Priority, Ban),
            (Other, Pick),
        ]
    };

    SplatoonPattern { modes, maps }
}

/// Display name of a game identifier, for the `gameName` broadcast.
pub fn game_title(game: &str) -> String {
    match game {
        "cs2" => "Counter-Strike 2".to_string(),
        "splatoon" => "Splatoon 3".to_string(),
        other => other.to_string(),
    }
}

/// Editable game definitions.
#[derive(Clone, Debug)]
pub struct Catalog {
    fps_pools: HashMap<String, Vec<String>>,
    splatoon_pools: HashMap<SplatoonMode, Vec<String>>,
}

impl Default for Catalog {
    fn default() -> Self {
        let mut fps_pools = HashMap::new();
        fps_pools.insert(
            DEFAULT_FPS_GAME.to_string(),
            CS2_MAP_POOL.iter().map(|m| m.to_string()).collect(),
        );

        let mut splatoon_pools = HashMap::new();
        splatoon_pools.insert(SplatoonMode::Zones, to_owned(&ZONES_MAP_POOL));
        splatoon_pools.insert(SplatoonMode::Tower, to_owned(&TOWER_MAP_POOL));
        splatoon_pools.insert(SplatoonMode::Rainmaker, to_owned(&RAINMAKER_MAP_POOL));
        splatoon_pools.insert(SplatoonMode::Clams, to_owned(&CLAMS_MAP_POOL));

        Self {
            fps_pools,
            splatoon_pools,
        }
    }
}

impl Catalog {
    pub fn fps_map_pool(&self, game: &str) -> Option<&[String]> {
        self.fps_pools.get(game).map(Vec::as_slice)
    }

    pub fn splatoon_map_pool(&self, mode: SplatoonMode) -> &[String] {
        self.splatoon_pools
            .get(&mode)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Deep copy of every mode pool, taken by a lobby at creation.
    pub fn splatoon_pools_snapshot(&self) -> HashMap<SplatoonMode, Vec<String>> {
        self.splatoon_pools.clone()
    }

    /// Replace the FPS pool for a game (admin map-pool editor).
    pub fn set_fps_map_pool(&mut self, game: &str, maps: Vec<String>) {
        self.fps_pools.insert(game.to_string(), maps);
    }

    /// Restore the built-in FPS pool for a game.
    pub fn reset_fps_map_pool(&mut self, game: &str) {
        let default = Self::default();
        match default.fps_pools.get(game) {
            Some(maps) => {
                self.fps_pools.insert(game.to_string(), maps.clone());
            }
            None => {
                self.fps_pools.remove(game);
            }
        }
    }
}

/// Process-wide defaults that are not game definitions: the coin-flip flag
/// and the cosmetic card palette.
#[derive(Clone, Debug)]
pub struct RuntimeSettings {
    pub coin_flip: bool,
    pub card_colors: Vec<String>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            coin_flip: true,
            card_colors: to_owned(&DEFAULT_CARD_COLORS),
        }
    }
}

impl RuntimeSettings {
    pub fn reset_card_colors(&mut self) {
        self.card_colors = to_owned(&DEFAULT_CARD_COLORS);
    }
}

fn to_owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fps_pool_has_seven_maps() {
        let catalog = Catalog::default();
        assert_eq!(catalog.fps_map_pool("cs2").unwrap().len(), 7);
        assert!(catalog.fps_map_pool("unknown").is_none());
    }

    #[test]
    fn every_mode_pool_covers_a_full_round() {
        // A first-round map phase consumes six maps.
        let catalog = Catalog::default();
        for mode in SplatoonMode::ALL {
            assert!(catalog.splatoon_map_pool(mode).len() >= 6, "{mode}");
        }
    }

    #[test]
    fn fps_patterns_are_seven_steps() {
        for format in [FpsFormat::Bo1, FpsFormat::Bo3, FpsFormat::Bo5] {
            assert_eq!(fps_pattern(format).len(), 7);
        }
        assert_eq!(fps_pattern(FpsFormat::Bo3)[6], VetoToken::Decider);
        assert_eq!(fps_pattern(FpsFormat::Bo1)[6], VetoToken::Pick);
    }

    #[test]
    fn splatoon_first_round_patterns() {
        let four = splatoon_pattern(4, true);
        assert_eq!(four.modes.len(), 3);
        assert_eq!(four.maps.len(), 6);

        let two = splatoon_pattern(2, true);
        assert_eq!(two.modes, vec![(Slot::Priority, VetoToken::Pick)]);
        assert_eq!(two.maps.len(), 6);
    }

    #[test]
    fn splatoon_next_round_patterns() {
        let four = splatoon_pattern(4, false);
        assert_eq!(
            four.modes,
            vec![
                (Slot::Priority, VetoToken::Ban),
                (Slot::Other, VetoToken::Pick)
            ]
        );
        assert_eq!(four.maps.len(), 4);

        // Two-mode lobbies keep the first-round map shape in every round.
        let two = splatoon_pattern(2, false);
        assert_eq!(two.maps.len(), 6);
    }

    #[test]
    fn pool_edits_do_not_leak_into_snapshots() {
        let mut catalog = Catalog::default();
        let snapshot = catalog.splatoon_pools_snapshot();
        catalog.set_fps_map_pool("cs2", vec!["Cache".to_string()]);
        catalog
            .splatoon_pools
            .get_mut(&SplatoonMode::Zones)
            .unwrap()
            .clear();
        assert_eq!(snapshot[&SplatoonMode::Zones].len(), 8);

        catalog.reset_fps_map_pool("cs2");
        assert_eq!(catalog.fps_map_pool("cs2").unwrap().len(), 7);
    }
}
