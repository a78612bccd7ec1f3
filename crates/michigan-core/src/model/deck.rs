use crate::model::card::Card;
use crate::model::rank::Rank;
use crate::model::suit::Suit;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Cards in one pack: 52 naturals plus a red and a black joker.
pub const PACK_SIZE: usize = 54;
/// Michigan is played with two packs shuffled together.
pub const DECK_SIZE: usize = PACK_SIZE * 2;

/// Draw pile plus discard pile for one round.
#[derive(Debug, Clone)]
pub struct Deck {
    draw: Vec<Card>,
    discard: Vec<Card>,
}

impl Deck {
    pub fn pack() -> Vec<Card> {
        let mut cards = Vec::with_capacity(PACK_SIZE);
        for suit in Suit::ALL.iter().copied() {
            for rank in Rank::NATURAL.iter().copied() {
                cards.push(Card::new(rank, suit));
            }
        }
        cards.push(Card::red_joker());
        cards.push(Card::black_joker());
        cards
    }

    /// Unshuffled double pack with an empty discard pile.
    pub fn standard() -> Self {
        let mut draw = Self::pack();
        draw.extend(Self::pack());
        Self {
            draw,
            discard: Vec::new(),
        }
    }

    /// Shuffled double pack with the first card already turned onto the discard pile.
    pub fn shuffled<R: rand::Rng + ?Sized>(rng: &mut R) -> Self {
        let mut deck = Self::standard();
        deck.draw.shuffle(rng);
        if let Some(first) = deck.draw.pop() {
            deck.discard.push(first);
        }
        deck
    }

    pub fn shuffled_with_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::shuffled(&mut rng)
    }

    pub fn deal_hand<R: rand::Rng + ?Sized>(&mut self, count: usize, rng: &mut R) -> Vec<Card> {
        (0..count).filter_map(|_| self.draw_from_deck(rng)).collect()
    }

    /// Draws the top of the draw pile, recycling the discard pile (all but its top card)
    /// when the draw pile is empty.
    pub fn draw_from_deck<R: rand::Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Card> {
        if self.draw.is_empty() {
            self.recycle_discards(rng);
        }
        self.draw.pop()
    }

    pub fn draw_from_discard(&mut self) -> Option<Card> {
        self.discard.pop()
    }

    pub fn discard(&mut self, card: Card) {
        self.discard.push(card);
    }

    pub fn top_of_discard(&self) -> Option<Card> {
        self.discard.last().copied()
    }

    pub fn draw_pile_len(&self) -> usize {
        self.draw.len()
    }

    pub fn discard_pile_len(&self) -> usize {
        self.discard.len()
    }

    fn recycle_discards<R: rand::Rng + ?Sized>(&mut self, rng: &mut R) {
        let Some(top) = self.discard.pop() else {
            return;
        };
        self.draw.append(&mut self.discard);
        self.draw.shuffle(rng);
        self.discard.push(top);
    }
}
