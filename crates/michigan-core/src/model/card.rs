use crate::model::rank::Rank;
use crate::model::suit::Suit;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }

    pub const fn red_joker() -> Self {
        Self::new(Rank::Joker, Suit::Hearts)
    }

    pub const fn black_joker() -> Self {
        Self::new(Rank::Joker, Suit::Spades)
    }

    pub const fn is_joker(self) -> bool {
        self.rank.is_joker()
    }

    /// Points charged for this card when it is left in hand at the end of a round.
    pub const fn score_value(self) -> u32 {
        match self.rank {
            Rank::Joker => 0,
            Rank::Jack | Rank::Queen | Rank::King => 10,
            other => other.value() as u32,
        }
    }

    /// Parses a whitespace or comma separated list such as `"5S 10H RJ"`.
    pub fn parse_list(text: &str) -> Result<Vec<Card>, CardParseError> {
        text.split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_joker() {
            let colour = if self.suit.is_red() { 'R' } else { 'B' };
            return write!(f, "{colour}J");
        }
        write!(f, "{}{}", self.rank, self.suit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardParseError {
    #[error("card text is empty")]
    Empty,
    #[error("unknown rank in card '{0}'")]
    Rank(String),
    #[error("unknown suit in card '{0}'")]
    Suit(String),
}

impl FromStr for Card {
    type Err = CardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let mut chars = text.chars();
        let Some(last) = chars.next_back() else {
            return Err(CardParseError::Empty);
        };
        let head = chars.as_str();

        match text.to_ascii_uppercase().as_str() {
            "RJ" => return Ok(Card::red_joker()),
            "BJ" => return Ok(Card::black_joker()),
            _ => {}
        }

        let suit = Suit::from_symbol(last).ok_or_else(|| CardParseError::Suit(text.to_string()))?;
        let rank = match head.to_ascii_uppercase().as_str() {
            "A" => Rank::Ace,
            "J" => Rank::Jack,
            "Q" => Rank::Queen,
            "K" => Rank::King,
            digits => digits
                .parse::<u8>()
                .ok()
                .filter(|value| (2..=10).contains(value))
                .and_then(Rank::from_value)
                .ok_or_else(|| CardParseError::Rank(text.to_string()))?,
        };
        Ok(Card::new(rank, suit))
    }
}

#[cfg(test)]
mod tests {
    use super::{Card, CardParseError, Rank, Suit};

    #[test]
    fn face_cards_score_ten() {
        assert_eq!(Card::new(Rank::King, Suit::Clubs).score_value(), 10);
        assert_eq!(Card::new(Rank::Jack, Suit::Hearts).score_value(), 10);
    }

    #[test]
    fn pip_cards_score_their_rank() {
        assert_eq!(Card::new(Rank::Ace, Suit::Spades).score_value(), 1);
        assert_eq!(Card::new(Rank::Ten, Suit::Diamonds).score_value(), 10);
        assert_eq!(Card::new(Rank::Seven, Suit::Diamonds).score_value(), 7);
    }

    #[test]
    fn jokers_score_nothing() {
        assert_eq!(Card::red_joker().score_value(), 0);
        assert_eq!(Card::black_joker().score_value(), 0);
    }

    #[test]
    fn parses_ranks_suits_and_jokers() {
        assert_eq!("10H".parse::<Card>(), Ok(Card::new(Rank::Ten, Suit::Hearts)));
        assert_eq!("as".parse::<Card>(), Ok(Card::new(Rank::Ace, Suit::Spades)));
        assert_eq!("JH".parse::<Card>(), Ok(Card::new(Rank::Jack, Suit::Hearts)));
        assert_eq!("RJ".parse::<Card>(), Ok(Card::red_joker()));
        assert_eq!("bj".parse::<Card>(), Ok(Card::black_joker()));
        assert!(matches!("1H".parse::<Card>(), Err(CardParseError::Rank(_))));
        assert!(matches!("5X".parse::<Card>(), Err(CardParseError::Suit(_))));
        assert_eq!("".parse::<Card>(), Err(CardParseError::Empty));
    }

    #[test]
    fn display_roundtrips_through_parse() {
        for text in ["5S", "10D", "KC", "AH", "RJ", "BJ"] {
            let card: Card = text.parse().unwrap();
            assert_eq!(card.to_string(), text);
        }
    }

    #[test]
    fn parse_list_accepts_commas_and_spaces() {
        let cards = Card::parse_list("5S, 5H  5D").unwrap();
        assert_eq!(cards.len(), 3);
        assert!(cards.iter().all(|card| card.rank == Rank::Five));
    }
}
