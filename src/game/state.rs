use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::cards::{Card, CardId, EquipSlot};
use super::config::{ConfigError, GameConfig};
use super::deck::{Deck, DeckError};
use super::log::GameLog;

/// 玩家标识，按加入顺序从 1 开始分配。
pub type PlayerId = u8;

fn entropy_rng() -> SmallRng {
    SmallRng::from_entropy()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Equipment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon: Option<Card>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub armor: Option<Card>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horse: Option<Card>,
}

impl Equipment {
    pub fn slot(&self, slot: EquipSlot) -> Option<&Card> {
        match slot {
            EquipSlot::Weapon => self.weapon.as_ref(),
            EquipSlot::Armor => self.armor.as_ref(),
            EquipSlot::Horse => self.horse.as_ref(),
        }
    }

    fn slot_mut(&mut self, slot: EquipSlot) -> &mut Option<Card> {
        match slot {
            EquipSlot::Weapon => &mut self.weapon,
            EquipSlot::Armor => &mut self.armor,
            EquipSlot::Horse => &mut self.horse,
        }
    }

    /// 放入装备，返回被替换下来的旧装备。
    pub fn equip(&mut self, slot: EquipSlot, card: Card) -> Option<Card> {
        self.slot_mut(slot).replace(card)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        EquipSlot::ALL.into_iter().filter_map(|slot| self.slot(slot))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 玩家状态，包括手牌、装备和体力。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub hp: u8,
    pub max_hp: u8,
    #[serde(default)]
    pub hand: Vec<Card>,
    #[serde(default)]
    pub equipment: Equipment,
    pub alive: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, max_hp: u8) -> Self {
        Self {
            id,
            name: name.into(),
            hp: max_hp,
            max_hp,
            hand: Vec::new(),
            equipment: Equipment::default(),
            alive: max_hp > 0,
        }
    }

    pub fn find_card_in_hand_index(&self, card_id: &str) -> Option<usize> {
        self.hand.iter().position(|card| card.id == card_id)
    }

    pub fn find_card_in_hand(&self, card_id: &str) -> Option<&Card> {
        self.hand.iter().find(|card| card.id == card_id)
    }

    pub fn card_count(&self) -> usize {
        self.hand.len() + self.equipment.len()
    }

    pub fn is_wounded(&self) -> bool {
        self.alive && self.hp < self.max_hp
    }
}

/// 对局阶段：等待玩家加入、进行中、已结束。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    #[default]
    Waiting,
    Playing,
    Ended,
}

impl GamePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            GamePhase::Waiting => "waiting",
            GamePhase::Playing => "playing",
            GamePhase::Ended => "ended",
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameOutcome {
    Winner { player_id: PlayerId },
    Draw,
}

impl GameOutcome {
    pub fn winner(&self) -> Option<PlayerId> {
        match self {
            GameOutcome::Winner { player_id } => Some(*player_id),
            GameOutcome::Draw => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum DiscardReason {
    HandLimit,
    Severed { by: PlayerId },
}

/// 游戏事件流，供表现层播放音效和动画。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    PlayerJoined {
        player_id: PlayerId,
        name: String,
    },
    GameStarted {
        player_ids: Vec<PlayerId>,
    },
    TurnStarted {
        player_id: PlayerId,
        turn: u32,
    },
    CardDrawn {
        player_id: PlayerId,
        card_id: CardId,
    },
    DeckReshuffled {
        card_count: usize,
    },
    CardUsed {
        player_id: PlayerId,
        card_id: CardId,
        card_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        target_id: Option<PlayerId>,
    },
    DamageDealt {
        #[serde(skip_serializing_if = "Option::is_none")]
        source_player: Option<PlayerId>,
        target_player: PlayerId,
        amount: u8,
        remaining_hp: u8,
    },
    PlayerHealed {
        player_id: PlayerId,
        amount: u8,
        hp: u8,
    },
    PlayerDied {
        player_id: PlayerId,
    },
    CardEquipped {
        player_id: PlayerId,
        card_id: CardId,
        card_name: String,
        slot: EquipSlot,
    },
    EquipmentReplaced {
        player_id: PlayerId,
        card_id: CardId,
        card_name: String,
        slot: EquipSlot,
    },
    CardDiscarded {
        player_id: PlayerId,
        card_id: CardId,
        card_name: String,
        reason: DiscardReason,
    },
    TrickIgnored {
        player_id: PlayerId,
        card_id: CardId,
        card_name: String,
    },
    TurnEnded {
        player_id: PlayerId,
    },
    GameEnded {
        #[serde(skip_serializing_if = "Option::is_none")]
        winner: Option<PlayerId>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(tag = "type")]
pub enum IntegrityError {
    #[error("current player index {index} is out of range")]
    InvalidPlayerIndex { index: usize },
    #[error("card {card_id} appears in more than one place")]
    DuplicateCardId { card_id: CardId },
    #[error("player {player_id} has hp {hp} outside 0..={max_hp}")]
    HpOutOfRange { player_id: PlayerId, hp: u8, max_hp: u8 },
    #[error("player {player_id} alive flag does not match hp {hp}")]
    AliveMismatch { player_id: PlayerId, hp: u8 },
    #[error("expected {expected} cards in play, found {actual}")]
    CardCountMismatch { expected: usize, actual: usize },
}

/// 不含事件与日志历史的状态快照，随每次命令结果返回给前端。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameSnapshot {
    pub config: GameConfig,
    pub players: Vec<Player>,
    pub current_player_index: usize,
    pub turn: u32,
    pub phase: GamePhase,
    pub deck: Deck,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub judgment_area: Vec<Card>,
    pub total_cards: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<GameOutcome>,
}

/// 游戏整体状态，由规则引擎独占修改。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    #[serde(default)]
    pub(crate) config: GameConfig,
    #[serde(default)]
    pub(crate) players: Vec<Player>,
    pub(crate) current_player_index: usize,
    pub(crate) turn: u32,
    pub(crate) phase: GamePhase,
    pub(crate) deck: Deck,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) judgment_area: Vec<Card>,
    pub(crate) total_cards: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) event_log: Vec<GameEvent>,
    #[serde(default)]
    pub(crate) log: GameLog,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) outcome: Option<GameOutcome>,
    #[serde(skip, default = "entropy_rng")]
    pub(crate) rng: SmallRng,
}

impl GameState {
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: GameConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => entropy_rng(),
        };
        let deck = Deck::build(&mut rng);
        let total_cards = deck.len();
        let mut state = Self {
            config,
            players: Vec::new(),
            current_player_index: 0,
            turn: 0,
            phase: GamePhase::Waiting,
            deck,
            judgment_area: Vec::new(),
            total_cards,
            event_log: Vec::new(),
            log: GameLog::default(),
            outcome: None,
            rng,
        };
        state.log.push("Game initialized");
        state
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            config: self.config.clone(),
            players: self.players.clone(),
            current_player_index: self.current_player_index,
            turn: self.turn,
            phase: self.phase,
            deck: self.deck.clone(),
            judgment_area: self.judgment_area.clone(),
            total_cards: self.total_cards,
            outcome: self.outcome,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn log(&self) -> &GameLog {
        &self.log
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.event_log
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn deck_size(&self) -> usize {
        self.deck.len()
    }

    pub fn discard_pile_size(&self) -> usize {
        self.deck.discard_len()
    }

    pub fn judgment_area(&self) -> &[Card] {
        &self.judgment_area
    }

    pub fn total_cards(&self) -> usize {
        self.total_cards
    }

    pub fn current_player_index(&self) -> usize {
        self.current_player_index
    }

    /// 游戏开始前没有当前玩家。
    pub fn current_player(&self) -> Option<&Player> {
        if self.phase == GamePhase::Waiting {
            return None;
        }
        self.players.get(self.current_player_index)
    }

    pub fn current_player_id(&self) -> Option<PlayerId> {
        self.current_player().map(|player| player.id)
    }

    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|player| player.id == id)
    }

    pub fn get_player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|player| player.id == id)
    }

    pub fn player_index(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|player| player.id == id)
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|player| player.alive)
    }

    pub fn is_finished(&self) -> bool {
        self.phase == GamePhase::Ended
    }

    /// 当前所有位置上的牌数总和。
    pub fn card_count(&self) -> usize {
        self.deck.len()
            + self.deck.discard_len()
            + self.judgment_area.len()
            + self
                .players
                .iter()
                .map(Player::card_count)
                .sum::<usize>()
    }

    fn player_name(&self, id: PlayerId) -> &str {
        self.get_player(id)
            .map(|player| player.name.as_str())
            .unwrap_or("unknown player")
    }

    fn narrate(&self, event: &GameEvent) -> Option<String> {
        let line = match event {
            GameEvent::PlayerJoined { name, .. } => format!("{name} joined the game"),
            GameEvent::GameStarted { .. } => "Game started!".to_string(),
            GameEvent::TurnStarted { player_id, .. } => {
                format!("{}'s turn begins", self.player_name(*player_id))
            }
            GameEvent::CardDrawn { .. } => return None,
            GameEvent::DeckReshuffled { card_count } => {
                format!("Deck reshuffled from {card_count} discarded cards")
            }
            GameEvent::CardUsed {
                player_id,
                card_name,
                target_id,
                ..
            } => match target_id {
                Some(target) => format!(
                    "{} used [{card_name}] on {}",
                    self.player_name(*player_id),
                    self.player_name(*target)
                ),
                None => format!("{} used [{card_name}]", self.player_name(*player_id)),
            },
            GameEvent::DamageDealt {
                target_player,
                amount,
                remaining_hp,
                ..
            } => format!(
                "{} took {amount} damage ({remaining_hp} hp left)",
                self.player_name(*target_player)
            ),
            GameEvent::PlayerHealed { player_id, amount, .. } => {
                format!("{} recovered {amount} health", self.player_name(*player_id))
            }
            GameEvent::PlayerDied { player_id } => {
                format!("{} has died!", self.player_name(*player_id))
            }
            GameEvent::CardEquipped {
                player_id,
                card_name,
                ..
            } => format!("{} equipped {card_name}", self.player_name(*player_id)),
            GameEvent::EquipmentReplaced {
                player_id,
                card_name,
                slot,
                ..
            } => format!(
                "{} discarded {card_name} from the {} slot",
                self.player_name(*player_id),
                slot.label()
            ),
            GameEvent::CardDiscarded {
                player_id,
                card_name,
                reason,
                ..
            } => match reason {
                DiscardReason::HandLimit => {
                    format!("{} discarded {card_name}", self.player_name(*player_id))
                }
                DiscardReason::Severed { by } => format!(
                    "{} made {} discard {card_name}",
                    self.player_name(*by),
                    self.player_name(*player_id)
                ),
            },
            GameEvent::TrickIgnored { card_name, .. } => {
                format!("[{card_name}] has no effect")
            }
            GameEvent::TurnEnded { player_id } => {
                format!("{} ended the turn", self.player_name(*player_id))
            }
            GameEvent::GameEnded { winner } => match winner {
                Some(winner) => format!("Game over! {} wins!", self.player_name(*winner)),
                None => "Game over! It's a draw!".to_string(),
            },
        };
        Some(line)
    }

    /// 记录事件并同步写入文字日志。
    pub fn record_event(&mut self, event: GameEvent) -> GameEvent {
        if let Some(line) = self.narrate(&event) {
            self.log.push(line);
        }
        self.event_log.push(event.clone());
        event
    }

    pub fn add_player(&mut self, name: Option<String>) -> GameEvent {
        let id = self.players.len() as PlayerId + 1;
        let name = name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("Player {id}"));
        self.players
            .push(Player::new(id, name.clone(), self.config.max_hp));
        self.record_event(GameEvent::PlayerJoined {
            player_id: id,
            name,
        })
    }

    pub fn draw_card(&mut self, player_id: PlayerId) -> Result<Vec<GameEvent>, DeckError> {
        let mut events = Vec::new();
        let Some(index) = self.player_index(player_id) else {
            return Ok(events);
        };

        if self.deck.is_empty() {
            let card_count = self.deck.reshuffle(&mut self.rng);
            if card_count > 0 {
                events.push(self.record_event(GameEvent::DeckReshuffled { card_count }));
            }
        }

        let card = self.deck.draw(&mut self.rng)?;
        let card_id = card.id.clone();
        self.players[index].hand.push(card);
        events.push(self.record_event(GameEvent::CardDrawn { player_id, card_id }));
        Ok(events)
    }

    pub fn draw_cards(
        &mut self,
        player_id: PlayerId,
        count: u8,
    ) -> Result<Vec<GameEvent>, DeckError> {
        let mut events = Vec::new();
        for _ in 0..count {
            events.extend(self.draw_card(player_id)?);
        }
        Ok(events)
    }

    pub fn discard(&mut self, card: Card) {
        self.deck.discard(card);
    }

    pub(crate) fn random_index(&mut self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.rng.gen_range(0..len))
    }

    /// 造成伤害，体力降到 0 时死亡，随后立即检查游戏是否结束。
    pub fn deal_damage(
        &mut self,
        source_player: Option<PlayerId>,
        target_player: PlayerId,
        amount: u8,
    ) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let Some(target) = self.get_player_mut(target_player) else {
            return events;
        };
        if amount == 0 || !target.alive {
            return events;
        }

        target.hp = target.hp.saturating_sub(amount);
        let remaining_hp = target.hp;
        let died = remaining_hp == 0;
        if died {
            target.alive = false;
        }

        events.push(self.record_event(GameEvent::DamageDealt {
            source_player,
            target_player,
            amount,
            remaining_hp,
        }));
        if died {
            events.push(self.record_event(GameEvent::PlayerDied {
                player_id: target_player,
            }));
        }
        events.extend(self.check_game_end());
        events
    }

    /// 回复体力，不超过上限；已死亡的角色不会回复。
    pub fn heal_player(&mut self, player_id: PlayerId, amount: u8) -> Option<GameEvent> {
        let player = self.get_player_mut(player_id)?;
        if amount == 0 || !player.is_wounded() {
            return None;
        }
        let before = player.hp;
        player.hp = player.hp.saturating_add(amount).min(player.max_hp);
        let event = GameEvent::PlayerHealed {
            player_id,
            amount: player.hp - before,
            hp: player.hp,
        };
        Some(self.record_event(event))
    }

    /// 存活人数不超过 1 时结束游戏。
    pub fn check_game_end(&mut self) -> Option<GameEvent> {
        if self.phase != GamePhase::Playing {
            return None;
        }
        let (first, more) = {
            let mut alive = self.alive_players().map(|player| player.id);
            (alive.next(), alive.next().is_some())
        };
        if more {
            return None;
        }

        let outcome = match first {
            Some(player_id) => GameOutcome::Winner { player_id },
            None => GameOutcome::Draw,
        };
        self.phase = GamePhase::Ended;
        self.outcome = Some(outcome);
        Some(self.record_event(GameEvent::GameEnded {
            winner: outcome.winner(),
        }))
    }

    pub fn advance_turn(&mut self) {
        if self.players.is_empty() {
            return;
        }
        self.current_player_index = (self.current_player_index + 1) % self.players.len();
        self.turn += 1;
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        if self.phase != GamePhase::Waiting && self.current_player_index >= self.players.len() {
            return Err(IntegrityError::InvalidPlayerIndex {
                index: self.current_player_index,
            });
        }

        let mut seen = HashSet::new();
        for player in &self.players {
            if player.hp > player.max_hp {
                return Err(IntegrityError::HpOutOfRange {
                    player_id: player.id,
                    hp: player.hp,
                    max_hp: player.max_hp,
                });
            }
            if player.alive != (player.hp > 0) {
                return Err(IntegrityError::AliveMismatch {
                    player_id: player.id,
                    hp: player.hp,
                });
            }
            for card in player.hand.iter().chain(player.equipment.iter()) {
                if !seen.insert(card.id.as_str()) {
                    return Err(IntegrityError::DuplicateCardId {
                        card_id: card.id.clone(),
                    });
                }
            }
        }
        for card in self
            .deck
            .cards()
            .iter()
            .chain(self.deck.discard_pile())
            .chain(&self.judgment_area)
        {
            if !seen.insert(card.id.as_str()) {
                return Err(IntegrityError::DuplicateCardId {
                    card_id: card.id.clone(),
                });
            }
        }

        let actual = self.card_count();
        if actual != self.total_cards {
            return Err(IntegrityError::CardCountMismatch {
                expected: self.total_cards,
                actual,
            });
        }
        Ok(())
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::build(GameConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::cards::BasicEffect;

    fn two_player_state() -> GameState {
        let mut state =
            GameState::new(GameConfig::default().with_seed(5)).expect("config should be valid");
        state.add_player(Some("Liu Bei".into()));
        state.add_player(None);
        state.phase = GamePhase::Playing;
        state
    }

    #[test]
    fn new_state_holds_full_deck() {
        let state = GameState::new(GameConfig::default().with_seed(1)).expect("valid config");
        assert_eq!(state.deck_size(), 68);
        assert_eq!(state.total_cards(), 68);
        assert_eq!(state.phase(), GamePhase::Waiting);
        assert!(state.current_player().is_none());
        assert_eq!(state.log().len(), 1);
        assert!(state.integrity_check().is_ok());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = GameConfig {
            max_hp: 0,
            ..GameConfig::default()
        };
        assert!(GameState::new(config).is_err());
    }

    #[test]
    fn players_get_sequential_ids_and_default_names() {
        let state = two_player_state();
        let names: Vec<(PlayerId, &str)> = state
            .players()
            .iter()
            .map(|player| (player.id, player.name.as_str()))
            .collect();
        assert_eq!(names, vec![(1, "Liu Bei"), (2, "Player 2")]);
        assert!(state.players().iter().all(|p| p.hp == 4 && p.alive));
    }

    #[test]
    fn damage_is_floored_at_zero_and_kills() {
        let mut state = two_player_state();
        let events = state.deal_damage(Some(1), 2, 9);

        let target = state.get_player(2).expect("player 2 exists");
        assert_eq!(target.hp, 0);
        assert!(!target.alive);
        assert!(events.contains(&GameEvent::PlayerDied { player_id: 2 }));
        assert!(events.contains(&GameEvent::GameEnded { winner: Some(1) }));
        assert_eq!(state.phase(), GamePhase::Ended);
        assert_eq!(state.outcome(), Some(GameOutcome::Winner { player_id: 1 }));
    }

    #[test]
    fn dead_players_are_not_healed_or_damaged_again() {
        let mut state = two_player_state();
        state.add_player(Some("Cao Cao".into()));
        state.deal_damage(Some(1), 3, 4);
        assert!(state.heal_player(3, 1).is_none());
        assert!(state.deal_damage(Some(1), 3, 1).is_empty());
        let dead = state.get_player(3).expect("player 3 exists");
        assert_eq!((dead.hp, dead.alive), (0, false));
        assert_eq!(state.phase(), GamePhase::Playing);
    }

    #[test]
    fn heal_is_capped_at_max_hp() {
        let mut state = two_player_state();
        assert!(state.heal_player(1, 1).is_none(), "full hp should not heal");
        state.deal_damage(Some(2), 1, 1);
        let event = state.heal_player(1, 3).expect("wounded player heals");
        assert_eq!(
            event,
            GameEvent::PlayerHealed {
                player_id: 1,
                amount: 1,
                hp: 4
            }
        );
    }

    #[test]
    fn everyone_dead_is_a_draw() {
        let mut state = two_player_state();
        for player in &mut state.players {
            player.hp = 0;
            player.alive = false;
        }
        let event = state.check_game_end().expect("game should end");
        assert_eq!(event, GameEvent::GameEnded { winner: None });
        assert_eq!(state.outcome(), Some(GameOutcome::Draw));
        assert_eq!(
            state.log().last().map(|entry| entry.message.as_str()),
            Some("Game over! It's a draw!")
        );
    }

    #[test]
    fn draw_card_reshuffles_when_deck_runs_dry() {
        let mut state = two_player_state();
        while !state.deck.is_empty() {
            let card = state.deck.draw(&mut state.rng).expect("deck has cards");
            state.discard(card);
        }
        let events = state.draw_card(1).expect("reshuffle should supply a card");

        assert!(matches!(
            events.first(),
            Some(GameEvent::DeckReshuffled { card_count: 68 })
        ));
        assert_eq!(state.discard_pile_size(), 0);
        assert_eq!(state.deck_size(), 67);
        assert_eq!(state.get_player(1).map(|p| p.hand.len()), Some(1));
        assert!(state.integrity_check().is_ok());
    }

    #[test]
    fn json_round_trip_keeps_integrity() {
        let mut state = two_player_state();
        state.draw_cards(1, 4).expect("deck has cards");
        state.deal_damage(Some(2), 1, 1);

        let json = serde_json::to_string(&state).expect("state serializes");
        let restored: GameState = serde_json::from_str(&json).expect("state deserializes");

        assert!(restored.integrity_check().is_ok());
        assert_eq!(restored.players(), state.players());
        assert_eq!(restored.deck(), state.deck());
        assert_eq!(restored.events(), state.events());
        assert_eq!(restored.log().len(), state.log().len());

        let mut tampered: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        tampered["players"][0]["hp"] = 9.into();
        let tampered: GameState = serde_json::from_value(tampered).expect("state deserializes");
        assert!(matches!(
            tampered.integrity_check(),
            Err(IntegrityError::HpOutOfRange { player_id: 1, hp: 9, .. })
        ));
    }

    #[test]
    fn snapshot_leaves_out_history() {
        let state = two_player_state();
        let snapshot = state.snapshot();
        assert_eq!(snapshot.players, state.players());
        assert_eq!(snapshot.total_cards, 68);
        let json = serde_json::to_value(&snapshot).expect("snapshot serializes");
        assert!(json.get("event_log").is_none());
        assert!(json.get("log").is_none());
    }

    #[test]
    fn last_survivor_ends_the_game_once() {
        let mut state = two_player_state();
        state.add_player(Some("Sun Quan".into()));
        assert!(state.deal_damage(Some(1), 2, 4).iter().all(|event| {
            !matches!(event, GameEvent::GameEnded { .. })
        }));
        assert_eq!(state.phase(), GamePhase::Playing);

        state.deal_damage(Some(1), 3, 4);
        assert_eq!(state.outcome(), Some(GameOutcome::Winner { player_id: 1 }));
        assert!(state.check_game_end().is_none(), "ended games are not re-ended");
    }

    #[test]
    fn integrity_check_catches_conjured_cards() {
        let mut state = two_player_state();
        let copy = state.deck.cards()[0].clone();
        state.players[0].hand.push(copy.clone());
        assert_eq!(
            state.integrity_check(),
            Err(IntegrityError::DuplicateCardId { card_id: copy.id })
        );
    }

    #[test]
    fn integrity_check_catches_lost_cards() {
        let mut state = two_player_state();
        state
            .deck
            .take_where(|card| card.basic_effect() == Some(BasicEffect::Dodge))
            .expect("a dodge card exists");
        assert_eq!(
            state.integrity_check(),
            Err(IntegrityError::CardCountMismatch {
                expected: 68,
                actual: 67
            })
        );
    }

    #[test]
    fn equipment_replaces_instead_of_stacking() {
        let mut equipment = Equipment::default();
        let weapons: Vec<Card> = crate::game::cards::equipment_cards()
            .iter()
            .filter(|card| card.equip_slot() == Some(EquipSlot::Weapon))
            .cloned()
            .collect();
        assert!(equipment.equip(EquipSlot::Weapon, weapons[0].clone()).is_none());
        let replaced = equipment.equip(EquipSlot::Weapon, weapons[1].clone());
        assert_eq!(replaced.as_ref(), Some(&weapons[0]));
        assert_eq!(equipment.len(), 1);
        assert_eq!(equipment.slot(EquipSlot::Weapon), Some(&weapons[1]));
    }
}
