use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{
    cards::CardId,
    deck::DeckError,
    effects::{CardAction, CardResolver, EffectContext, EffectResolution},
    state::{
        DiscardReason, GameEvent, GameOutcome, GamePhase, GameSnapshot, GameState,
        IntegrityError, PlayerId,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UseCardAction {
    pub card_id: CardId,
    #[serde(default)]
    pub target_player: Option<PlayerId>,
}

impl UseCardAction {
    pub fn new(card_id: impl Into<CardId>) -> Self {
        Self {
            card_id: card_id.into(),
            target_player: None,
        }
    }

    pub fn on(mut self, target_player: PlayerId) -> Self {
        self.target_player = Some(target_player);
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("a player cannot target themselves")]
    SelfTarget,
    #[error("no such player")]
    UnknownPlayer,
    #[error("player is already dead")]
    DeadPlayer,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(tag = "type")]
pub enum RuleError {
    #[error("the table is full ({max} players)")]
    Capacity { max: u8 },
    #[error("at least {required} players are needed to start, only {actual} joined")]
    InsufficientPlayers { required: u8, actual: usize },
    #[error("card {card_id} is not in the current player's hand")]
    NotInHand { card_id: CardId },
    #[error("command needs a {expected} game, but the game is {actual}")]
    InvalidPhase {
        expected: GamePhase,
        actual: GamePhase,
    },
    #[error("cannot target player {target}: {reason}")]
    IllegalTarget {
        target: PlayerId,
        reason: TargetError,
    },
    #[error("no cards left to draw")]
    DeckExhausted,
    #[error("state integrity violated: {error}")]
    IntegrityViolation { error: IntegrityError },
}

impl From<DeckError> for RuleError {
    fn from(error: DeckError) -> Self {
        match error {
            DeckError::Exhausted => RuleError::DeckExhausted,
        }
    }
}

/// 一次命令的结算结果：最新状态快照、本次产生的事件以及胜负。
/// 历史事件与日志不随结果返回，前端通过日志接口单独读取。
#[derive(Debug, Clone, Serialize)]
pub struct RuleResolution {
    pub state: GameSnapshot,
    pub events: Vec<GameEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<GameOutcome>,
}

impl RuleResolution {
    pub fn new(state: &GameState, events: Vec<GameEvent>) -> Self {
        Self {
            state: state.snapshot(),
            events,
            outcome: state.outcome(),
        }
    }
}

/// 回合状态机：校验阶段与回合归属，再把出牌交给 CardResolver。
#[derive(Debug, Default)]
pub struct RuleEngine {
    resolver: CardResolver,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self {
            resolver: CardResolver,
        }
    }

    fn ensure_phase(state: &GameState, expected: GamePhase) -> Result<(), RuleError> {
        if state.phase() != expected {
            return Err(RuleError::InvalidPhase {
                expected,
                actual: state.phase(),
            });
        }
        Ok(())
    }

    fn ensure_integrity(state: &GameState) -> Result<(), RuleError> {
        state
            .integrity_check()
            .map_err(|error| RuleError::IntegrityViolation { error })
    }

    fn check_target(
        state: &GameState,
        actor: PlayerId,
        target: PlayerId,
    ) -> Result<(), RuleError> {
        let reason = if target == actor {
            Some(TargetError::SelfTarget)
        } else {
            match state.get_player(target) {
                None => Some(TargetError::UnknownPlayer),
                Some(player) if !player.alive => Some(TargetError::DeadPlayer),
                Some(_) => None,
            }
        };
        match reason {
            Some(reason) => Err(RuleError::IllegalTarget { target, reason }),
            None => Ok(()),
        }
    }

    /// 失败的命令只留下一条日志，不改动其他状态。
    fn finish<T>(
        state: &mut GameState,
        command: &'static str,
        result: Result<T, RuleError>,
    ) -> Result<T, RuleError> {
        if let Err(error) = &result {
            warn!(command, %error, "command rejected");
            state.log.push(format!("Rejected: {error}"));
        }
        result
    }

    pub fn add_player(
        &mut self,
        state: &mut GameState,
        name: Option<String>,
    ) -> Result<Vec<GameEvent>, RuleError> {
        let result = Self::try_add_player(state, name);
        Self::finish(state, "add_player", result)
    }

    fn try_add_player(
        state: &mut GameState,
        name: Option<String>,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_phase(state, GamePhase::Waiting)?;
        let max = state.config().max_players;
        if state.players().len() >= usize::from(max) {
            return Err(RuleError::Capacity { max });
        }

        let event = state.add_player(name);
        info!(players = state.players().len(), "player joined");
        Ok(vec![event])
    }

    pub fn start(&mut self, state: &mut GameState) -> Result<Vec<GameEvent>, RuleError> {
        let result = self.try_start(state);
        Self::finish(state, "start", result)
    }

    fn try_start(&mut self, state: &mut GameState) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_integrity(state)?;
        Self::ensure_phase(state, GamePhase::Waiting)?;
        let required = state.config().min_players;
        if state.players().len() < usize::from(required) {
            return Err(RuleError::InsufficientPlayers {
                required,
                actual: state.players().len(),
            });
        }

        state.phase = GamePhase::Playing;
        state.current_player_index = 0;
        state.turn = 1;

        let player_ids: Vec<PlayerId> = state.players().iter().map(|player| player.id).collect();
        let mut events = vec![state.record_event(GameEvent::GameStarted {
            player_ids: player_ids.clone(),
        })];

        let hand_size = state.config().initial_hand_size;
        for player_id in player_ids {
            events.extend(state.draw_cards(player_id, hand_size)?);
        }

        if let Some(player_id) = state.current_player_id() {
            events.push(state.record_event(GameEvent::TurnStarted {
                player_id,
                turn: state.turn(),
            }));
        }
        info!(players = state.players().len(), "game started");
        Ok(events)
    }

    /// 出牌。校验通过后先把牌移出手牌，再按类别结算。
    pub fn use_card(
        &mut self,
        state: &mut GameState,
        action: UseCardAction,
    ) -> Result<Vec<GameEvent>, RuleError> {
        let result = self.try_use_card(state, action);
        Self::finish(state, "use_card", result)
    }

    fn try_use_card(
        &mut self,
        state: &mut GameState,
        action: UseCardAction,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_integrity(state)?;
        Self::ensure_phase(state, GamePhase::Playing)?;

        let player_index = state.current_player_index();
        let player_id = state.players[player_index].id;
        let hand_index = state.players[player_index]
            .find_card_in_hand_index(&action.card_id)
            .ok_or_else(|| RuleError::NotInHand {
                card_id: action.card_id.clone(),
            })?;

        let card_action =
            CardAction::for_card(&state.players[player_index].hand[hand_index], state.config());
        let target = if card_action.requires_target() {
            action.target_player
        } else {
            None
        };
        if let Some(target) = target {
            Self::check_target(state, player_id, target)?;
        }

        let card = state.players[player_index].hand.remove(hand_index);
        debug!(player_id, card = %card.id, ?target, "card used");
        let mut resolution = EffectResolution {
            events: vec![state.record_event(GameEvent::CardUsed {
                player_id,
                card_id: card.id.clone(),
                card_name: card.name.clone(),
                target_id: target,
            })],
        };

        let ctx = EffectContext::new(player_id, &card).with_target_player(target);
        resolution.extend(self.resolver.resolve(state, &ctx, card)?);
        Ok(resolution.events)
    }

    /// 结束回合：弃牌至手牌数不超过体力，轮到下一名玩家并为其摸牌。
    pub fn end_turn(&mut self, state: &mut GameState) -> Result<Vec<GameEvent>, RuleError> {
        let result = self.try_end_turn(state);
        Self::finish(state, "end_turn", result)
    }

    fn try_end_turn(&mut self, state: &mut GameState) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_integrity(state)?;
        Self::ensure_phase(state, GamePhase::Playing)?;

        let player_index = state.current_player_index();
        let player_id = state.players[player_index].id;
        let mut events = vec![state.record_event(GameEvent::TurnEnded { player_id })];
        events.extend(Self::discard_to_hand_limit(state, player_index));

        state.advance_turn();
        if let Some(event) = state.check_game_end() {
            events.push(event);
            return Ok(events);
        }

        events.extend(Self::begin_turn(state)?);
        Ok(events)
    }

    /// 弃牌顺序为后摸先弃（从手牌末尾开始）。
    fn discard_to_hand_limit(state: &mut GameState, player_index: usize) -> Vec<GameEvent> {
        let mut events = Vec::new();
        loop {
            let player = &mut state.players[player_index];
            if player.hand.len() <= usize::from(player.hp) {
                break;
            }
            let Some(card) = player.hand.pop() else {
                break;
            };
            let event = GameEvent::CardDiscarded {
                player_id: player.id,
                card_id: card.id.clone(),
                card_name: card.name.clone(),
                reason: DiscardReason::HandLimit,
            };
            state.discard(card);
            events.push(state.record_event(event));
        }
        events
    }

    fn begin_turn(state: &mut GameState) -> Result<Vec<GameEvent>, RuleError> {
        let Some(player_id) = state.current_player_id() else {
            return Ok(Vec::new());
        };
        let mut events = vec![state.record_event(GameEvent::TurnStarted {
            player_id,
            turn: state.turn(),
        })];

        let count = state.config().draw_per_turn;
        events.extend(state.draw_cards(player_id, count)?);
        if let Some(player) = state.get_player(player_id) {
            let line = format!("{} drew {count} cards", player.name);
            state.log.push(line);
        }
        debug!(player_id, turn = state.turn(), "turn started");
        Ok(events)
    }

    /// 判断一张手牌能否对指定玩家使用，供前端高亮可选目标。
    pub fn can_target(state: &GameState, card_id: &str, target: PlayerId) -> bool {
        if state.phase() != GamePhase::Playing {
            return false;
        }
        let Some(player) = state.current_player() else {
            return false;
        };
        let Some(card) = player.find_card_in_hand(card_id) else {
            return false;
        };
        CardAction::for_card(card, state.config()).requires_target()
            && Self::check_target(state, player.id, target).is_ok()
    }
}
