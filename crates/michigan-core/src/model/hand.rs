use crate::model::card::Card;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::vec::Vec;

/// Stable token for one physical card while it sits in a hand.
///
/// A double deck holds two copies of every card, so value equality cannot tell the copies
/// apart. Ids are handed out by [`Hand::add`] and never reused within that hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CardId(u32);

impl CardId {
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeldCard {
    pub id: CardId,
    pub card: Card,
}

/// Ordered multiset of cards owned by one player. Cards keep their arrival order.
#[derive(Debug, Clone, Default)]
pub struct Hand {
    cards: Vec<HeldCard>,
    next_id: u32,
}

impl Hand {
    pub fn new() -> Self {
        Self {
            cards: Vec::new(),
            next_id: 0,
        }
    }

    pub fn with_cards(cards: Vec<Card>) -> Self {
        let mut hand = Self::new();
        for card in cards {
            hand.add(card);
        }
        hand
    }

    pub fn add(&mut self, card: Card) -> CardId {
        let id = CardId(self.next_id);
        self.next_id += 1;
        self.cards.push(HeldCard { id, card });
        id
    }

    /// Removes the given instance, leaving any identical twin in place.
    pub fn remove(&mut self, id: CardId) -> Option<Card> {
        let index = self.position(id)?;
        Some(self.cards.remove(index).card)
    }

    /// Removes the first instance equal to `card`.
    pub fn remove_card(&mut self, card: Card) -> Option<CardId> {
        let index = self.cards.iter().position(|held| held.card == card)?;
        Some(self.cards.remove(index).id)
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }

    pub fn position(&self, id: CardId) -> Option<usize> {
        self.cards.iter().position(|held| held.id == id)
    }

    pub fn get(&self, id: CardId) -> Option<Card> {
        self.cards.iter().find(|held| held.id == id).map(|held| held.card)
    }

    pub fn contains(&self, card: Card) -> bool {
        self.cards.iter().any(|held| held.card == card)
    }

    pub fn contains_id(&self, id: CardId) -> bool {
        self.position(id).is_some()
    }

    pub fn count_of(&self, card: Card) -> usize {
        self.cards.iter().filter(|held| held.card == card).count()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeldCard> {
        self.cards.iter()
    }

    pub fn held(&self) -> &[HeldCard] {
        &self.cards
    }

    pub fn cards(&self) -> Vec<Card> {
        self.cards.iter().map(|held| held.card).collect()
    }

    pub fn score(&self) -> u32 {
        self.cards.iter().map(|held| held.card.score_value()).sum()
    }
}
