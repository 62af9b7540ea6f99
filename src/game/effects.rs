use serde::{Deserialize, Serialize};

use super::cards::{BasicEffect, Card, CardId, CardKind, EquipSlot, TrickKind};
use super::config::GameConfig;
use super::deck::DeckError;
use super::state::{DiscardReason, GameEvent, GameState, PlayerId};

const STRIKE_DAMAGE: u8 = 1;
const PEACH_HEAL: u8 = 1;
const FELLOWSHIP_HEAL: u8 = 1;

/// 一张牌被使用后实际执行的结算动作。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum CardAction {
    Damage { amount: u8 },
    Dodge,
    Heal { amount: u8 },
    Equip { slot: EquipSlot },
    Draw { count: u8 },
    DiscardRandom,
    HealAll { amount: u8 },
    Inert,
}

impl CardAction {
    pub fn for_card(card: &Card, config: &GameConfig) -> Self {
        match card.kind {
            CardKind::Basic { effect, .. } => match effect {
                BasicEffect::Damage => CardAction::Damage {
                    amount: STRIKE_DAMAGE,
                },
                BasicEffect::Dodge => CardAction::Dodge,
                BasicEffect::Heal => CardAction::Heal { amount: PEACH_HEAL },
            },
            CardKind::Weapon { .. } => CardAction::Equip {
                slot: EquipSlot::Weapon,
            },
            CardKind::Armor { .. } => CardAction::Equip {
                slot: EquipSlot::Armor,
            },
            CardKind::Horse { .. } => CardAction::Equip {
                slot: EquipSlot::Horse,
            },
            CardKind::Trick { trick } => match trick {
                TrickKind::Conjure => CardAction::Draw {
                    count: config.conjure_draw,
                },
                TrickKind::Sever => CardAction::DiscardRandom,
                TrickKind::Fellowship => CardAction::HealAll {
                    amount: FELLOWSHIP_HEAL,
                },
                TrickKind::Inert(_) => CardAction::Inert,
            },
        }
    }

    /// 需要指定一名其他角色作为目标。
    pub fn requires_target(&self) -> bool {
        matches!(self, CardAction::Damage { .. } | CardAction::DiscardRandom)
    }

    fn targeted_opponent(ctx: &EffectContext) -> Option<PlayerId> {
        ctx.target_player
            .filter(|target| *target != ctx.source_player)
    }

    pub fn apply(
        &self,
        ctx: &EffectContext,
        state: &mut GameState,
    ) -> Result<EffectResolution, DeckError> {
        let mut events = Vec::new();
        match *self {
            CardAction::Damage { amount } => {
                if let Some(target) = Self::targeted_opponent(ctx) {
                    events = state.deal_damage(Some(ctx.source_player), target, amount);
                }
            }
            CardAction::Dodge => {}
            CardAction::Heal { amount } => {
                events.extend(state.heal_player(ctx.source_player, amount));
            }
            CardAction::Draw { count } => {
                events = state.draw_cards(ctx.source_player, count)?;
            }
            CardAction::DiscardRandom => {
                if let Some(target) = Self::targeted_opponent(ctx) {
                    events.extend(sever_random_card(state, ctx.source_player, target));
                }
            }
            CardAction::HealAll { amount } => {
                let wounded: Vec<PlayerId> = state
                    .alive_players()
                    .filter(|player| player.is_wounded())
                    .map(|player| player.id)
                    .collect();
                for player_id in wounded {
                    events.extend(state.heal_player(player_id, amount));
                }
            }
            CardAction::Inert => {
                events.push(state.record_event(GameEvent::TrickIgnored {
                    player_id: ctx.source_player,
                    card_id: ctx.source_card.clone(),
                    card_name: ctx.source_name.clone(),
                }));
            }
            // 装备牌由 CardResolver 直接放入装备区。
            CardAction::Equip { .. } => {}
        }
        Ok(EffectResolution { events })
    }
}

/// 随机弃置目标的一张手牌；目标没有手牌时无事发生。
fn sever_random_card(
    state: &mut GameState,
    source_player: PlayerId,
    target_player: PlayerId,
) -> Option<GameEvent> {
    let hand_len = state.get_player(target_player)?.hand.len();
    let index = state.random_index(hand_len)?;
    let card = state.get_player_mut(target_player)?.hand.remove(index);
    let event = GameEvent::CardDiscarded {
        player_id: target_player,
        card_id: card.id.clone(),
        card_name: card.name.clone(),
        reason: DiscardReason::Severed { by: source_player },
    };
    state.discard(card);
    Some(state.record_event(event))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EffectContext {
    pub source_player: PlayerId,
    pub source_card: CardId,
    pub source_name: String,
    pub target_player: Option<PlayerId>,
}

impl EffectContext {
    pub fn new(source_player: PlayerId, card: &Card) -> Self {
        Self {
            source_player,
            source_card: card.id.clone(),
            source_name: card.name.clone(),
            target_player: None,
        }
    }

    pub fn with_target_player(mut self, player_id: Option<PlayerId>) -> Self {
        self.target_player = player_id;
        self
    }
}

#[derive(Default, Debug, Clone)]
pub struct EffectResolution {
    pub events: Vec<GameEvent>,
}

impl EffectResolution {
    pub fn extend(&mut self, mut other: EffectResolution) {
        self.events.append(&mut other.events);
    }
}

/// 按牌的类别分派效果，并负责把用过的牌放入弃牌堆或装备区。
#[derive(Debug, Default, Clone, Copy)]
pub struct CardResolver;

impl CardResolver {
    pub fn resolve(
        &self,
        state: &mut GameState,
        ctx: &EffectContext,
        card: Card,
    ) -> Result<EffectResolution, DeckError> {
        let action = CardAction::for_card(&card, state.config());
        if let CardAction::Equip { slot } = action {
            return Ok(Self::equip(state, ctx.source_player, slot, card));
        }

        let outcome = action.apply(ctx, state);
        // 即使摸牌失败，用过的牌也要进入弃牌堆。
        state.discard(card);
        outcome
    }

    fn equip(
        state: &mut GameState,
        player_id: PlayerId,
        slot: EquipSlot,
        card: Card,
    ) -> EffectResolution {
        let mut resolution = EffectResolution::default();
        let equipped = GameEvent::CardEquipped {
            player_id,
            card_id: card.id.clone(),
            card_name: card.name.clone(),
            slot,
        };
        let Some(player) = state.get_player_mut(player_id) else {
            state.discard(card);
            return resolution;
        };

        if let Some(old) = player.equipment.equip(slot, card) {
            let replaced = GameEvent::EquipmentReplaced {
                player_id,
                card_id: old.id.clone(),
                card_name: old.name.clone(),
                slot,
            };
            state.discard(old);
            resolution.events.push(state.record_event(replaced));
        }
        resolution.events.push(state.record_event(equipped));
        resolution
    }
}
