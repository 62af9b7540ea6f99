pub mod game;

use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

pub use game::{
    BasicEffect, Card, CardAction, CardCategory, CardId, CardKind, CardResolver, ConfigError, Deck,
    DeckError, DiscardReason, EffectContext, EffectResolution, EquipSlot, Equipment, GameConfig,
    GameEvent, GameLog, GameOutcome, GamePhase, GameSnapshot, GameState, InertTrick,
    IntegrityError, LogEntry, Player, PlayerId, RuleEngine, RuleError, RuleResolution, Suit,
    TargetError, TrickKind, UseCardAction,
};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
}

fn to_js_error<E: Serialize + std::fmt::Display>(error: E) -> JsValue {
    to_value(&error).unwrap_or_else(|_| JsValue::from_str(&error.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn make_resolution_json(resolution: RuleResolution) -> Result<String, JsValue> {
    serde_json::to_string(&resolution).map_err(serde_to_js_error)
}

fn resolution_from_events(state: &GameState, events: Vec<GameEvent>) -> RuleResolution {
    RuleResolution::new(state, events)
}

fn execute_with_engine<F>(state: &mut GameState, action: F) -> Result<Vec<GameEvent>, JsValue>
where
    F: FnOnce(&mut RuleEngine, &mut GameState) -> Result<Vec<GameEvent>, RuleError>,
{
    let mut engine = RuleEngine::new();
    action(&mut engine, state).map_err(|error| {
        report_rejection(&error);
        to_js_error(error)
    })
}

#[cfg(target_arch = "wasm32")]
fn report_rejection(error: &RuleError) {
    web_sys::console::warn_1(&format!("Rejected: {error}").into());
}

#[cfg(not(target_arch = "wasm32"))]
fn report_rejection(_error: &RuleError) {}

#[derive(Serialize)]
struct PlayerView<'a> {
    #[serde(flatten)]
    player: &'a Player,
    is_current: bool,
}

/// 提供给前端的对局句柄，所有命令返回 JSON 字符串。
#[wasm_bindgen]
pub struct GameEngine {
    state: GameState,
}

#[wasm_bindgen]
impl GameEngine {
    /// `config_json` 可以只包含部分字段，缺省字段使用默认值。
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<GameEngine, JsValue> {
        let config = match config_json {
            Some(json) => serde_json::from_str(&json).map_err(serde_to_js_error)?,
            None => GameConfig::default(),
        };
        let state = GameState::new(config).map_err(to_js_error)?;
        Ok(GameEngine { state })
    }

    #[wasm_bindgen(js_name = "addPlayer")]
    pub fn add_player(&mut self, name: Option<String>) -> bool {
        execute_with_engine(&mut self.state, |engine, state| engine.add_player(state, name)).is_ok()
    }

    #[wasm_bindgen(js_name = "startGame")]
    pub fn start_game(&mut self) -> Result<String, JsValue> {
        let events = execute_with_engine(&mut self.state, |engine, state| engine.start(state))?;
        make_resolution_json(resolution_from_events(&self.state, events))
    }

    #[wasm_bindgen(js_name = "useCard")]
    pub fn use_card(
        &mut self,
        card_id: String,
        target_player: Option<u8>,
    ) -> Result<String, JsValue> {
        let action = UseCardAction {
            card_id,
            target_player,
        };
        let events = execute_with_engine(&mut self.state, |engine, state| {
            engine.use_card(state, action)
        })?;
        make_resolution_json(resolution_from_events(&self.state, events))
    }

    #[wasm_bindgen(js_name = "useCardJson")]
    pub fn use_card_json(&mut self, action_json: &str) -> Result<String, JsValue> {
        let action: UseCardAction =
            serde_json::from_str(action_json).map_err(serde_to_js_error)?;
        let events = execute_with_engine(&mut self.state, |engine, state| {
            engine.use_card(state, action)
        })?;
        make_resolution_json(resolution_from_events(&self.state, events))
    }

    #[wasm_bindgen(js_name = "endTurn")]
    pub fn end_turn(&mut self) -> Result<String, JsValue> {
        let events = execute_with_engine(&mut self.state, |engine, state| engine.end_turn(state))?;
        make_resolution_json(resolution_from_events(&self.state, events))
    }

    #[wasm_bindgen(js_name = "canTarget")]
    pub fn can_target(&self, card_id: &str, target_player: u8) -> bool {
        RuleEngine::can_target(&self.state, card_id, target_player)
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    pub fn current_player_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state.current_player()).map_err(serde_to_js_error)
    }

    pub fn players_json(&self) -> Result<String, JsValue> {
        let current = self.state.current_player_id();
        let players: Vec<PlayerView<'_>> = self
            .state
            .players()
            .iter()
            .map(|player| PlayerView {
                player,
                is_current: current == Some(player.id),
            })
            .collect();
        serde_json::to_string(&players).map_err(serde_to_js_error)
    }

    /// 最近 `limit` 条日志，按 `[HH:MM:SS] 内容` 渲染。
    pub fn log_json(&self, limit: Option<usize>) -> Result<String, JsValue> {
        let limit = limit.unwrap_or(self.state.log().len());
        serde_json::to_string(&self.state.log().render(limit)).map_err(serde_to_js_error)
    }

    #[wasm_bindgen(js_name = "deckSize")]
    pub fn deck_size(&self) -> usize {
        self.state.deck_size()
    }

    #[wasm_bindgen(js_name = "discardPileSize")]
    pub fn discard_pile_size(&self) -> usize {
        self.state.discard_pile_size()
    }

    #[wasm_bindgen(js_name = "gamePhase")]
    pub fn game_phase(&self) -> String {
        self.state.phase().to_string()
    }

    pub fn outcome_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state.outcome()).map_err(serde_to_js_error)
    }
}

/// 返回一副洗好的标准牌堆，传入种子时结果可复现。
#[wasm_bindgen(js_name = "createDeck")]
pub fn create_deck(seed: Option<u64>) -> Result<JsValue, JsValue> {
    let mut config = GameConfig::default();
    config.seed = seed;
    let state = GameState::new(config).map_err(to_js_error)?;
    to_value(state.deck().cards()).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    state
        .integrity_check()
        .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))?;
    Ok(())
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
