//! 游戏核心逻辑模块（牌库、牌堆、状态、规则引擎等）。

pub mod cards;
pub mod config;
pub mod deck;
pub mod effects;
pub mod log;
pub mod rules;
pub mod state;

pub use cards::{
    BasicEffect,
    Card,
    CardCategory,
    CardId,
    CardKind,
    EquipSlot,
    InertTrick,
    Suit,
    TrickKind,
};
pub use config::{ConfigError, GameConfig};
pub use deck::{Deck, DeckError};
pub use effects::{CardAction, CardResolver, EffectContext, EffectResolution};
pub use log::{GameLog, LogEntry};
pub use rules::{RuleEngine, RuleError, RuleResolution, TargetError, UseCardAction};
pub use state::{
    DiscardReason,
    Equipment,
    GameEvent,
    GameOutcome,
    GamePhase,
    GameSnapshot,
    GameState,
    IntegrityError,
    Player,
    PlayerId,
};
