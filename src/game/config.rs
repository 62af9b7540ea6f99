use serde::{Deserialize, Serialize};

use super::cards::catalog_size;

/// 玩家编号从 1 开始，上限 8 人。
pub const DEFAULT_MAX_PLAYERS: u8 = 8;
pub const DEFAULT_MIN_PLAYERS: u8 = 2;
pub const DEFAULT_MAX_HP: u8 = 4;
pub const DEFAULT_INITIAL_HAND_SIZE: u8 = 4;
pub const DEFAULT_DRAW_PER_TURN: u8 = 2;
pub const DEFAULT_CONJURE_DRAW: u8 = 2;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(tag = "type")]
pub enum ConfigError {
    #[error("max_players must be between {min} and {limit}, got {value}")]
    MaxPlayersOutOfRange { value: u8, min: u8, limit: u8 },
    #[error("min_players must be between 2 and max_players ({max_players}), got {value}")]
    MinPlayersOutOfRange { value: u8, max_players: u8 },
    #[error("max_hp must be at least 1")]
    ZeroMaxHp,
    #[error("dealing {per_player} cards to {players} players needs more than {available} cards")]
    OpeningHandsTooLarge {
        per_player: u8,
        players: u8,
        available: usize,
    },
}

/// 对局参数，前端可以只传入部分字段。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GameConfig {
    pub max_players: u8,
    pub min_players: u8,
    pub max_hp: u8,
    pub initial_hand_size: u8,
    pub draw_per_turn: u8,
    pub conjure_draw: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl GameConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_players(mut self, max_players: u8) -> Self {
        self.max_players = max_players;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_players < DEFAULT_MIN_PLAYERS || self.max_players > DEFAULT_MAX_PLAYERS {
            return Err(ConfigError::MaxPlayersOutOfRange {
                value: self.max_players,
                min: DEFAULT_MIN_PLAYERS,
                limit: DEFAULT_MAX_PLAYERS,
            });
        }
        if self.min_players < DEFAULT_MIN_PLAYERS || self.min_players > self.max_players {
            return Err(ConfigError::MinPlayersOutOfRange {
                value: self.min_players,
                max_players: self.max_players,
            });
        }
        if self.max_hp == 0 {
            return Err(ConfigError::ZeroMaxHp);
        }
        let available = catalog_size();
        if usize::from(self.max_players) * usize::from(self.initial_hand_size) > available {
            return Err(ConfigError::OpeningHandsTooLarge {
                per_player: self.initial_hand_size,
                players: self.max_players,
                available,
            });
        }
        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_players: DEFAULT_MAX_PLAYERS,
            min_players: DEFAULT_MIN_PLAYERS,
            max_hp: DEFAULT_MAX_HP,
            initial_hand_size: DEFAULT_INITIAL_HAND_SIZE,
            draw_per_turn: DEFAULT_DRAW_PER_TURN,
            conjure_draw: DEFAULT_CONJURE_DRAW,
            seed: None,
        }
    }
}
