use crate::model::card::Card;
use crate::model::rank::Rank;
use core::fmt;
use serde::{Deserialize, Serialize};

/// The rank that plays as wild for the current round. Jokers are always wild on top of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct WildRank(Rank);

impl WildRank {
    pub const fn new(rank: Rank) -> Option<Self> {
        match rank {
            Rank::Joker => None,
            other => Some(Self(other)),
        }
    }

    /// Round `n` of Michigan plays with rank `n` wild.
    pub const fn for_round(round: u8) -> Option<Self> {
        match Rank::from_value(round) {
            Some(rank) => Self::new(rank),
            None => None,
        }
    }

    pub const fn rank(self) -> Rank {
        self.0
    }

    pub const fn value(self) -> u8 {
        self.0.value()
    }

    pub fn is_wild(self, card: Card) -> bool {
        card.rank == Rank::Joker || card.rank == self.0
    }
}

impl TryFrom<u8> for WildRank {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        WildRank::for_round(value).ok_or_else(|| format!("wild rank must be 1..=13, got {value}"))
    }
}

impl From<WildRank> for u8 {
    fn from(value: WildRank) -> Self {
        value.value()
    }
}

impl fmt::Display for WildRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
