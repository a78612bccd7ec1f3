use super::{BundleError, RunEnd};
use crate::model::card::Card;
use crate::model::rank::Rank;
use crate::model::suit::Suit;
use crate::model::wild::WildRank;

/// Longest possible run: ace through king.
pub const MAX_RUN_LEN: usize = 13;

/// Consecutive ranks in one suit. `cards` is kept in slot order, `low` first, so a wild's
/// position is the rank it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRun {
    cards: Vec<Card>,
    suit: Suit,
    low: Rank,
    high: Rank,
}

impl CardRun {
    pub(crate) fn new(cards: Vec<Card>, suit: Suit, low: Rank, high: Rank) -> Self {
        debug_assert_eq!(
            (high.value() - low.value() + 1) as usize,
            cards.len(),
            "run span must match its card count"
        );
        Self {
            cards,
            suit,
            low,
            high,
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn suit(&self) -> Suit {
        self.suit
    }

    pub fn low(&self) -> Rank {
        self.low
    }

    pub fn high(&self) -> Rank {
        self.high
    }

    /// Synthetic card for the lowest slot; a wild may actually sit there.
    pub fn min_card(&self) -> Card {
        Card::new(self.low, self.suit)
    }

    pub fn max_card(&self) -> Card {
        Card::new(self.high, self.suit)
    }

    pub fn has_room(&self, end: RunEnd) -> bool {
        match end {
            RunEnd::Low => self.low.pred().is_some(),
            RunEnd::High => self.high.succ().is_some(),
        }
    }

    /// The end a card extends by rank alone, if any.
    pub fn natural_end(&self, card: Card) -> Option<RunEnd> {
        if card.suit != self.suit || card.is_joker() {
            return None;
        }
        if Some(card.rank) == self.low.pred() {
            Some(RunEnd::Low)
        } else if Some(card.rank) == self.high.succ() {
            Some(RunEnd::High)
        } else {
            None
        }
    }

    pub fn can_add(&self, card: Card, wild: WildRank) -> bool {
        if wild.is_wild(card) {
            return self.cards.len() < MAX_RUN_LEN;
        }
        self.natural_end(card).is_some()
    }

    /// Adds a card whose slot can be deduced. A wild that fits either open end is refused
    /// with [`BundleError::AmbiguousWildPlacement`]; use [`CardRun::add_wild`] for it.
    pub fn add_card(&mut self, card: Card, wild: WildRank) -> Result<RunEnd, BundleError> {
        if !self.can_add(card, wild) {
            return Err(BundleError::NotAccepted(card));
        }
        if let Some(end) = self.natural_end(card) {
            self.place(card, end);
            return Ok(end);
        }
        let end = match (self.has_room(RunEnd::Low), self.has_room(RunEnd::High)) {
            (true, false) => RunEnd::Low,
            (false, true) => RunEnd::High,
            (true, true) => return Err(BundleError::AmbiguousWildPlacement(card)),
            (false, false) => return Err(BundleError::NotAccepted(card)),
        };
        self.place(card, end);
        Ok(end)
    }

    pub fn add_wild(&mut self, card: Card, end: RunEnd, wild: WildRank) -> Result<(), BundleError> {
        if !wild.is_wild(card) {
            return Err(BundleError::NotAccepted(card));
        }
        if !self.has_room(end) {
            return Err(BundleError::EndPinned(end));
        }
        self.place(card, end);
        Ok(())
    }

    /// Sheds an end card, a natural one if possible (low end first). When both ends hold
    /// wilds the end is picked at random.
    pub fn remove_one<R: rand::Rng + ?Sized>(&mut self, wild: WildRank, rng: &mut R) -> Option<Card> {
        if self.cards.len() <= 3 {
            return None;
        }
        let first = *self.cards.first()?;
        let last = *self.cards.last()?;
        let end = if !wild.is_wild(first) {
            RunEnd::Low
        } else if !wild.is_wild(last) {
            RunEnd::High
        } else if rng.gen_bool(0.5) {
            RunEnd::Low
        } else {
            RunEnd::High
        };
        Some(self.take(end))
    }

    /// Swaps the lowest naturally placed card for `wild_card` in the same slot, provided
    /// another natural remains to pin the run.
    pub fn try_replace_with_wild(&mut self, wild_card: Card, wild: WildRank) -> Option<Card> {
        if !wild.is_wild(wild_card) {
            return None;
        }
        let naturals: Vec<usize> = (0..self.cards.len())
            .filter(|&slot| self.is_natural_at(slot, wild))
            .collect();
        if naturals.len() < 2 {
            return None;
        }
        let slot = naturals[0];
        let displaced = std::mem::replace(&mut self.cards[slot], wild_card);
        Some(displaced)
    }

    fn is_natural_at(&self, slot: usize, wild: WildRank) -> bool {
        let card = self.cards[slot];
        !wild.is_wild(card)
            && card.suit == self.suit
            && card.rank.value() as usize == self.low.value() as usize + slot
    }

    fn place(&mut self, card: Card, end: RunEnd) {
        match end {
            RunEnd::Low => {
                if let Some(next) = self.low.pred() {
                    self.cards.insert(0, card);
                    self.low = next;
                }
            }
            RunEnd::High => {
                if let Some(next) = self.high.succ() {
                    self.cards.push(card);
                    self.high = next;
                }
            }
        }
    }

    fn take(&mut self, end: RunEnd) -> Card {
        match end {
            RunEnd::Low => {
                if let Some(next) = self.low.succ() {
                    self.low = next;
                }
                self.cards.remove(0)
            }
            RunEnd::High => {
                if let Some(next) = self.high.pred() {
                    self.high = next;
                }
                let last = self.cards.len() - 1;
                self.cards.remove(last)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CardRun;
    use crate::bundle::{BundleError, RunEnd};
    use crate::model::card::Card;
    use crate::model::rank::Rank;
    use crate::model::suit::Suit;
    use crate::model::wild::WildRank;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn club(value: u8) -> Card {
        Card::new(Rank::from_value(value).unwrap(), Suit::Clubs)
    }

    fn run(values: &[u8]) -> CardRun {
        let cards: Vec<Card> = values.iter().map(|&v| club(v)).collect();
        let low = Rank::from_value(values[0]).unwrap();
        let high = Rank::from_value(values[values.len() - 1]).unwrap();
        CardRun::new(cards, Suit::Clubs, low, high)
    }

    fn wild() -> WildRank {
        WildRank::for_round(9).unwrap()
    }

    #[test]
    fn natural_cards_extend_either_end() {
        let mut r = run(&[5, 6, 7]);
        assert!(r.can_add(club(4), wild()));
        assert!(r.can_add(club(8), wild()));
        assert!(!r.can_add(club(10), wild()));
        assert!(!r.can_add(Card::new(Rank::Eight, Suit::Hearts), wild()));

        assert_eq!(r.add_card(club(4), wild()), Ok(RunEnd::Low));
        assert_eq!(r.add_card(club(8), wild()), Ok(RunEnd::High));
        assert_eq!(r.min_card(), club(4));
        assert_eq!(r.max_card(), club(8));
        assert_eq!(r.cards().first(), Some(&club(4)));
    }

    #[test]
    fn open_ended_wild_fails_closed() {
        let mut r = run(&[5, 6, 7]);
        let err = r.add_card(Card::red_joker(), wild());
        assert_eq!(err, Err(BundleError::AmbiguousWildPlacement(Card::red_joker())));
        assert_eq!(r.cards().len(), 3);
        assert_eq!(r.low(), Rank::Five);
    }

    #[test]
    fn wild_goes_to_the_only_open_end() {
        let mut r = run(&[1, 2, 3]);
        assert_eq!(r.add_card(Card::red_joker(), wild()), Ok(RunEnd::High));
        assert_eq!(r.high(), Rank::Four);

        let mut top = run(&[11, 12, 13]);
        assert_eq!(top.add_card(Card::black_joker(), wild()), Ok(RunEnd::Low));
        assert_eq!(top.low(), Rank::Ten);
        assert_eq!(top.cards()[0], Card::black_joker());
    }

    #[test]
    fn add_wild_respects_requested_end() {
        let mut r = run(&[1, 2, 3]);
        assert_eq!(
            r.add_wild(Card::red_joker(), RunEnd::Low, wild()),
            Err(BundleError::EndPinned(RunEnd::Low))
        );
        assert!(r.add_wild(Card::red_joker(), RunEnd::High, wild()).is_ok());
        assert!(r.add_wild(club(7), RunEnd::High, wild()).is_err());
    }

    #[test]
    fn remove_one_prefers_natural_low_end() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut r = run(&[4, 5, 6, 7]);
        assert_eq!(r.remove_one(wild(), &mut rng), Some(club(4)));
        assert_eq!(r.low(), Rank::Five);
        assert_eq!(r.remove_one(wild(), &mut rng), None);
    }

    #[test]
    fn remove_one_takes_high_end_when_low_is_wild() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut r = CardRun::new(
            vec![Card::red_joker(), club(5), club(6), club(7)],
            Suit::Clubs,
            Rank::Four,
            Rank::Seven,
        );
        assert_eq!(r.remove_one(wild(), &mut rng), Some(club(7)));
        assert_eq!(r.high(), Rank::Six);
    }

    #[test]
    fn remove_one_with_wild_ends_keeps_span_consistent() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut r = CardRun::new(
            vec![Card::red_joker(), club(5), club(6), Card::black_joker()],
            Suit::Clubs,
            Rank::Four,
            Rank::Seven,
        );
        let removed = r.remove_one(wild(), &mut rng).unwrap();
        assert!(removed.is_joker());
        assert_eq!(
            (r.high().value() - r.low().value() + 1) as usize,
            r.cards().len()
        );
    }

    #[test]
    fn replace_with_wild_keeps_slot() {
        let mut r = run(&[5, 6, 7]);
        assert_eq!(r.try_replace_with_wild(Card::red_joker(), wild()), Some(club(5)));
        assert_eq!(r.cards()[0], Card::red_joker());
        assert_eq!(r.low(), Rank::Five);

        assert_eq!(r.try_replace_with_wild(Card::black_joker(), wild()), Some(club(6)));
        assert_eq!(r.try_replace_with_wild(Card::black_joker(), wild()), None);
    }
}
