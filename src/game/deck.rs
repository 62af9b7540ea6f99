use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::cards::{standard_catalog, Card};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(tag = "type")]
pub enum DeckError {
    #[error("draw pile and discard pile are both empty")]
    Exhausted,
}

/// 牌堆与弃牌堆。从 `draw_pile` 末尾摸牌。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deck {
    #[serde(default)]
    draw_pile: Vec<Card>,
    #[serde(default)]
    discard_pile: Vec<Card>,
}

impl Deck {
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self {
            draw_pile: cards,
            discard_pile: Vec::new(),
        }
    }

    /// 构建标准牌库并洗牌。
    pub fn build<R: Rng>(rng: &mut R) -> Self {
        let mut deck = Self::from_cards(standard_catalog(rng));
        deck.shuffle(rng);
        deck
    }

    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        self.draw_pile.shuffle(rng);
    }

    /// 弃牌堆洗回牌堆，返回洗入的张数。
    pub fn reshuffle<R: Rng>(&mut self, rng: &mut R) -> usize {
        let recycled = self.discard_pile.len();
        self.draw_pile.append(&mut self.discard_pile);
        self.shuffle(rng);
        recycled
    }

    pub fn draw<R: Rng>(&mut self, rng: &mut R) -> Result<Card, DeckError> {
        if self.draw_pile.is_empty() {
            self.reshuffle(rng);
        }
        self.draw_pile.pop().ok_or(DeckError::Exhausted)
    }

    pub fn discard(&mut self, card: Card) {
        self.discard_pile.push(card);
    }

    pub fn len(&self) -> usize {
        self.draw_pile.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draw_pile.is_empty()
    }

    pub fn discard_len(&self) -> usize {
        self.discard_pile.len()
    }

    pub fn cards(&self) -> &[Card] {
        &self.draw_pile
    }

    pub fn discard_pile(&self) -> &[Card] {
        &self.discard_pile
    }

    #[cfg(test)]
    pub(crate) fn take_where(&mut self, predicate: impl Fn(&Card) -> bool) -> Option<Card> {
        if let Some(pos) = self.draw_pile.iter().position(&predicate) {
            return Some(self.draw_pile.remove(pos));
        }
        let pos = self.discard_pile.iter().position(&predicate)?;
        Some(self.discard_pile.remove(pos))
    }
}
