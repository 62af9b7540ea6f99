use once_cell::sync::Lazy;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// 全局唯一的卡牌标识，例如 `strike_0`、`weapon_2`。
pub type CardId = String;

pub const STRIKE_COUNT: usize = 30;
pub const DODGE_COUNT: usize = 15;
pub const PEACH_COUNT: usize = 8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Spade,
    Heart,
    Diamond,
    Club,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spade, Suit::Heart, Suit::Diamond, Suit::Club];

    pub fn symbol(self) -> &'static str {
        match self {
            Suit::Spade => "♠",
            Suit::Heart => "♥",
            Suit::Diamond => "♦",
            Suit::Club => "♣",
        }
    }
}

/// 基础牌的效果类型。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BasicEffect {
    Damage,
    Dodge,
    Heal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EquipSlot {
    Weapon,
    Armor,
    Horse,
}

impl EquipSlot {
    pub const ALL: [EquipSlot; 3] = [EquipSlot::Weapon, EquipSlot::Armor, EquipSlot::Horse];

    pub fn label(self) -> &'static str {
        match self {
            EquipSlot::Weapon => "weapon",
            EquipSlot::Armor => "armor",
            EquipSlot::Horse => "horse",
        }
    }
}

/// 锦囊牌中没有规则效果的那几张，使用后只记录日志。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum InertTrick {
    Snatch,
    BorrowedBlade,
    Negate,
    BarbarianInvasion,
    ArrowVolley,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TrickKind {
    /// 摸牌。
    Conjure,
    /// 随机弃置目标一张手牌。
    Sever,
    /// 所有存活角色回复 1 点体力。
    Fellowship,
    Inert(InertTrick),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "category", rename_all = "lowercase")]
pub enum CardKind {
    Basic { effect: BasicEffect, suit: Suit, number: u8 },
    Weapon { attack: u8, range: u8 },
    Armor { defense: u8 },
    Horse { speed: u8 },
    Trick { trick: TrickKind },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CardCategory {
    Basic,
    Weapon,
    Armor,
    Horse,
    Trick,
}

impl CardCategory {
    pub fn label(self) -> &'static str {
        match self {
            CardCategory::Basic => "Basic",
            CardCategory::Weapon => "Weapon",
            CardCategory::Armor => "Armor",
            CardCategory::Horse => "Horse",
            CardCategory::Trick => "Trick",
        }
    }
}

/// 不可变的卡牌数据。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    pub description: String,
    pub kind: CardKind,
}

impl Card {
    pub fn new(
        id: impl Into<CardId>,
        name: impl Into<String>,
        description: impl Into<String>,
        kind: CardKind,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            kind,
        }
    }

    pub fn category(&self) -> CardCategory {
        match self.kind {
            CardKind::Basic { .. } => CardCategory::Basic,
            CardKind::Weapon { .. } => CardCategory::Weapon,
            CardKind::Armor { .. } => CardCategory::Armor,
            CardKind::Horse { .. } => CardCategory::Horse,
            CardKind::Trick { .. } => CardCategory::Trick,
        }
    }

    pub fn basic_effect(&self) -> Option<BasicEffect> {
        match self.kind {
            CardKind::Basic { effect, .. } => Some(effect),
            _ => None,
        }
    }

    pub fn trick(&self) -> Option<TrickKind> {
        match self.kind {
            CardKind::Trick { trick } => Some(trick),
            _ => None,
        }
    }

    pub fn equip_slot(&self) -> Option<EquipSlot> {
        match self.kind {
            CardKind::Weapon { .. } => Some(EquipSlot::Weapon),
            CardKind::Armor { .. } => Some(EquipSlot::Armor),
            CardKind::Horse { .. } => Some(EquipSlot::Horse),
            _ => None,
        }
    }

    fn basic<R: Rng>(index: usize, effect: BasicEffect, rng: &mut R) -> Self {
        let (prefix, name, description) = match effect {
            BasicEffect::Damage => ("strike", "Strike", "Deal 1 damage to another player"),
            BasicEffect::Dodge => ("dodge", "Dodge", "Cancel the effect of a Strike"),
            BasicEffect::Heal => ("peach", "Peach", "Recover 1 health"),
        };
        let suit = Suit::ALL[rng.gen_range(0..Suit::ALL.len())];
        let number = rng.gen_range(1..=13);
        Card::new(
            format!("{prefix}_{index}"),
            name,
            description,
            CardKind::Basic {
                effect,
                suit,
                number,
            },
        )
    }
}

static EQUIPMENT: Lazy<Vec<Card>> = Lazy::new(|| {
    vec![
        Card::new(
            "weapon_1",
            "Blue Steel Blade",
            "Attack range +1, attack +2",
            CardKind::Weapon { attack: 2, range: 1 },
        ),
        Card::new(
            "weapon_2",
            "Twin Swords",
            "Attack range +1, attack +2",
            CardKind::Weapon { attack: 2, range: 1 },
        ),
        Card::new(
            "weapon_3",
            "Green Dragon Crescent Blade",
            "Attack range +2, attack +3",
            CardKind::Weapon { attack: 3, range: 2 },
        ),
        Card::new(
            "armor_1",
            "Silver Lion",
            "Defense +1",
            CardKind::Armor { defense: 1 },
        ),
        Card::new(
            "armor_2",
            "Rattan Armor",
            "Defense +2",
            CardKind::Armor { defense: 2 },
        ),
        Card::new(
            "horse_1",
            "Red Hare",
            "Movement +1",
            CardKind::Horse { speed: 1 },
        ),
        Card::new(
            "horse_2",
            "Dilu",
            "Movement +1",
            CardKind::Horse { speed: 1 },
        ),
    ]
});

static TRICKS: Lazy<Vec<Card>> = Lazy::new(|| {
    let make = |id: &str, name: &str, description: &str, trick: TrickKind| {
        Card::new(id, name, description, CardKind::Trick { trick })
    };
    vec![
        make("trick_1", "Conjure", "Draw two cards", TrickKind::Conjure),
        make(
            "trick_2",
            "Sever",
            "Discard one card held by another player",
            TrickKind::Sever,
        ),
        make(
            "trick_3",
            "Snatch",
            "Take one card from another player",
            TrickKind::Inert(InertTrick::Snatch),
        ),
        make(
            "trick_4",
            "Borrowed Blade",
            "Make one player use a Strike on another",
            TrickKind::Inert(InertTrick::BorrowedBlade),
        ),
        make(
            "trick_5",
            "Negate",
            "Cancel the effect of a trick card",
            TrickKind::Inert(InertTrick::Negate),
        ),
        make(
            "trick_6",
            "Barbarian Invasion",
            "Every other player must play a Strike or lose 1 health",
            TrickKind::Inert(InertTrick::BarbarianInvasion),
        ),
        make(
            "trick_7",
            "Arrow Volley",
            "Every other player must play a Dodge or lose 1 health",
            TrickKind::Inert(InertTrick::ArrowVolley),
        ),
        make(
            "trick_8",
            "Fellowship",
            "Every player recovers 1 health",
            TrickKind::Fellowship,
        ),
    ]
});

pub fn equipment_cards() -> &'static [Card] {
    &EQUIPMENT
}

pub fn trick_cards() -> &'static [Card] {
    &TRICKS
}

/// 生成一副完整的牌（未洗牌）。基础牌的花色与点数只用于展示。
pub fn standard_catalog<R: Rng>(rng: &mut R) -> Vec<Card> {
    let mut cards = Vec::with_capacity(catalog_size());
    cards.extend((0..STRIKE_COUNT).map(|i| Card::basic(i, BasicEffect::Damage, &mut *rng)));
    cards.extend((0..DODGE_COUNT).map(|i| Card::basic(i, BasicEffect::Dodge, &mut *rng)));
    cards.extend((0..PEACH_COUNT).map(|i| Card::basic(i, BasicEffect::Heal, &mut *rng)));
    cards.extend(EQUIPMENT.iter().cloned());
    cards.extend(TRICKS.iter().cloned());
    cards
}

pub fn catalog_size() -> usize {
    STRIKE_COUNT + DODGE_COUNT + PEACH_COUNT + EQUIPMENT.len() + TRICKS.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn catalog_has_expected_composition() {
        let mut rng = SmallRng::seed_from_u64(1);
        let cards = standard_catalog(&mut rng);
        assert_eq!(cards.len(), 68);
        assert_eq!(catalog_size(), 68);

        let count = |effect: BasicEffect| {
            cards
                .iter()
                .filter(|card| card.basic_effect() == Some(effect))
                .count()
        };
        assert_eq!(count(BasicEffect::Damage), 30);
        assert_eq!(count(BasicEffect::Dodge), 15);
        assert_eq!(count(BasicEffect::Heal), 8);

        let equipment = cards.iter().filter(|card| card.equip_slot().is_some()).count();
        assert_eq!(equipment, 7);

        let tricks: HashSet<&str> = cards
            .iter()
            .filter(|card| card.category() == CardCategory::Trick)
            .map(|card| card.name.as_str())
            .collect();
        assert_eq!(tricks.len(), 8, "all trick names should be distinct");
    }

    #[test]
    fn card_ids_are_unique() {
        let mut rng = SmallRng::seed_from_u64(2);
        let cards = standard_catalog(&mut rng);
        let ids: HashSet<&CardId> = cards.iter().map(|card| &card.id).collect();
        assert_eq!(ids.len(), cards.len());
    }

    #[test]
    fn basic_flavor_stays_in_range() {
        let mut rng = SmallRng::seed_from_u64(3);
        for card in standard_catalog(&mut rng) {
            if let CardKind::Basic { number, .. } = card.kind {
                assert!((1..=13).contains(&number), "{} has number {number}", card.id);
            }
        }
    }

    #[test]
    fn card_kind_serializes_with_category_tag() {
        let card = &equipment_cards()[0];
        let json = serde_json::to_value(card).expect("card should serialize");
        assert_eq!(json["kind"]["category"], "weapon");
        assert_eq!(json["kind"]["attack"], 2);
    }
}
