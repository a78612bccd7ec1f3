use super::BundleError;
use crate::model::card::Card;
use crate::model::rank::Rank;
use crate::model::wild::WildRank;

/// Three or more cards sharing one rank, padded with wilds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSet {
    cards: Vec<Card>,
    value: Rank,
}

impl CardSet {
    pub(crate) fn new(cards: Vec<Card>, value: Rank) -> Self {
        Self { cards, value }
    }

    pub fn value(&self) -> Rank {
        self.value
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Cards that carry the set's rank, as opposed to wilds standing in for it.
    pub fn natural_count(&self) -> usize {
        self.cards.iter().filter(|card| card.rank == self.value).count()
    }

    pub fn can_add(&self, card: Card, wild: WildRank) -> bool {
        card.rank == self.value || wild.is_wild(card)
    }

    pub fn add_card(&mut self, card: Card, wild: WildRank) -> Result<(), BundleError> {
        if !self.can_add(card, wild) {
            return Err(BundleError::NotAccepted(card));
        }
        self.cards.push(card);
        Ok(())
    }

    /// Sheds a natural while another natural keeps the set identifiable, else a wild.
    pub fn remove_one(&mut self) -> Option<Card> {
        if self.cards.len() <= 3 {
            return None;
        }
        let value = self.value;
        let index = if self.natural_count() > 1 {
            self.cards.iter().position(|card| card.rank == value)
        } else {
            self.cards.iter().position(|card| card.rank != value)
        }?;
        Some(self.cards.remove(index))
    }

    pub fn try_replace_with_wild(&mut self, wild_card: Card, wild: WildRank) -> Option<Card> {
        if !wild.is_wild(wild_card) || self.natural_count() < 2 {
            return None;
        }
        let value = self.value;
        let index = self.cards.iter().position(|card| card.rank == value)?;
        let displaced = self.cards.remove(index);
        self.cards.push(wild_card);
        Some(displaced)
    }
}
