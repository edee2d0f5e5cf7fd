//! Lobby rule models and create-time validation.

use crate::catalog::{Catalog, FpsFormat, GameFamily, game_title};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Create-time rule violations. Reported to the requester as a single
/// `lobbyCreationError`; no lobby is created.
#[derive(Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum CreationError {
    #[error("unknown game '{0}'")]
    UnknownGame(String),
    #[error("unknown game type '{0}'")]
    UnknownFormat(String),
    #[error("{format} requires a map pool of exactly 7, got {size}")]
    BadPoolSize { format: String, size: usize },
    #[error("bo1 map pool size must be 4 or 7, got {0}")]
    BadBo1PoolSize(usize),
    #[error("modes size must be 2 or 4, got {0}")]
    BadModesSize(u8),
    #[error("rounds must be an odd number of at least 1, got {0}")]
    BadMaxRounds(u32),
}

/// Creation parameters for an FPS lobby.
#[derive(Clone, Debug)]
pub struct FpsSettings {
    pub game: String,
    pub game_type: String,
    pub coin_flip: bool,
    pub knife_decider: bool,
    pub map_pool_size: Option<usize>,
    pub admin: bool,
}

/// Creation parameters for a Splatoon lobby.
#[derive(Clone, Debug)]
pub struct SplatoonSettings {
    pub modes_size: u8,
    pub coin_flip: bool,
    pub admin: bool,
    pub rounds: u32,
}

/// Lobby rules. Sealed at creation except for `map_names`, `last_winner`
/// and `round_number`, which the turn controller maintains.
#[derive(Clone, Debug, PartialEq)]
pub struct Rules {
    pub game: String,
    pub game_title: String,
    pub family: GameFamily,
    pub format: Option<FpsFormat>,
    pub admin: bool,
    pub coin_flip: bool,
    pub knife_decider: bool,
    pub map_pool_size: usize,
    pub modes_size: u8,
    pub max_rounds: u32,
    pub map_names: Vec<String>,
    pub last_winner: Option<String>,
    pub round_number: u32,
}

impl Rules {
    /// Validate FPS settings against the catalog and seal the rules,
    /// taking a deep copy of the current map pool.
    pub fn fps(settings: &FpsSettings, catalog: &Catalog) -> Result<Self, CreationError> {
        let format = FpsFormat::parse(&settings.game_type)
            .ok_or_else(|| CreationError::UnknownFormat(settings.game_type.clone()))?;
        let pool = catalog
            .fps_map_pool(&settings.game)
            .ok_or_else(|| CreationError::UnknownGame(settings.game.clone()))?;

        let pool_size = match format {
            FpsFormat::Bo1 => {
                let size = settings.map_pool_size.unwrap_or(pool.len());
                if size != 4 && size != 7 {
                    return Err(CreationError::BadBo1PoolSize(size));
                }
                if pool.len() < size {
                    return Err(CreationError::BadBo1PoolSize(pool.len()));
                }
                size
            }
            FpsFormat::Bo3 | FpsFormat::Bo5 => {
                if pool.len() != 7 {
                    return Err(CreationError::BadPoolSize {
                        format: format.as_str().to_string(),
                        size: pool.len(),
                    });
                }
                7
            }
        };

        Ok(Self {
            game: settings.game.clone(),
            game_title: game_title(&settings.game),
            family: GameFamily::Fps,
            format: Some(format),
            admin: settings.admin,
            coin_flip: settings.coin_flip,
            knife_decider: settings.knife_decider,
            map_pool_size: pool_size,
            modes_size: 0,
            max_rounds: 1,
            map_names: pool[..pool_size].to_vec(),
            last_winner: None,
            round_number: 1,
        })
    }

    /// Validate Splatoon settings and seal the rules. The per-mode map
    /// pools are snapshotted separately; `map_names` loads on mode pick.
    pub fn splatoon(settings: &SplatoonSettings) -> Result<Self, CreationError> {
        if settings.modes_size != 2 && settings.modes_size != 4 {
            return Err(CreationError::BadModesSize(settings.modes_size));
        }
        if settings.rounds == 0 || settings.rounds % 2 == 0 {
            return Err(CreationError::BadMaxRounds(settings.rounds));
        }

        Ok(Self {
            game: "splatoon".to_string(),
            game_title: game_title("splatoon"),
            family: GameFamily::Splatoon,
            format: None,
            admin: settings.admin,
            coin_flip: settings.coin_flip,
            knife_decider: false,
            map_pool_size: 0,
            modes_size: settings.modes_size,
            max_rounds: settings.rounds,
            map_names: Vec::new(),
            last_winner: None,
            round_number: 1,
        })
    }

    /// The `gameType` string shown to clients.
    pub fn game_type(&self) -> String {
        match self.format {
            Some(format) => format.as_str().to_string(),
            None => format!("bo{}", self.max_rounds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fps_settings(game_type: &str) -> FpsSettings {
        FpsSettings {
            game: "cs2".to_string(),
            game_type: game_type.to_string(),
            coin_flip: false,
            knife_decider: false,
            map_pool_size: None,
            admin: false,
        }
    }

    #[test]
    fn bo3_requires_a_pool_of_seven() {
        let mut catalog = Catalog::default();
        assert!(Rules::fps(&fps_settings("bo3"), &catalog).is_ok());

        catalog.set_fps_map_pool("cs2", vec!["Mirage".to_string(), "Nuke".to_string()]);
        let err = Rules::fps(&fps_settings("bo3"), &catalog).unwrap_err();
        assert_eq!(
            err,
            CreationError::BadPoolSize {
                format: "bo3".to_string(),
                size: 2,
            }
        );
    }

    #[test]
    fn bo1_pool_size_is_four_or_seven() {
        let catalog = Catalog::default();

        let mut settings = fps_settings("bo1");
        settings.map_pool_size = Some(4);
        let rules = Rules::fps(&settings, &catalog).unwrap();
        assert_eq!(rules.map_names.len(), 4);

        settings.map_pool_size = Some(5);
        assert_eq!(
            Rules::fps(&settings, &catalog).unwrap_err(),
            CreationError::BadBo1PoolSize(5)
        );
    }

    #[test]
    fn unknown_game_and_format_are_rejected() {
        let catalog = Catalog::default();
        let mut settings = fps_settings("bo3");
        settings.game = "quake".to_string();
        assert_eq!(
            Rules::fps(&settings, &catalog).unwrap_err(),
            CreationError::UnknownGame("quake".to_string())
        );

        assert_eq!(
            Rules::fps(&fps_settings("bo2"), &catalog).unwrap_err(),
            CreationError::UnknownFormat("bo2".to_string())
        );
    }

    #[test]
    fn splatoon_modes_size_is_two_or_four() {
        let settings = SplatoonSettings {
            modes_size: 3,
            coin_flip: false,
            admin: false,
            rounds: 3,
        };
        assert_eq!(
            Rules::splatoon(&settings).unwrap_err(),
            CreationError::BadModesSize(3)
        );
    }

    #[test]
    fn splatoon_rounds_must_be_odd() {
        let settings = SplatoonSettings {
            modes_size: 4,
            coin_flip: false,
            admin: false,
            rounds: 4,
        };
        assert_eq!(
            Rules::splatoon(&settings).unwrap_err(),
            CreationError::BadMaxRounds(4)
        );
    }
}
