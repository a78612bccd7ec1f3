//! Sets and runs: the two ways cards can be laid down together.

mod build;
mod run;
mod set;

pub use build::{CardOrder, MIN_BUNDLE_LEN, try_build};
pub use run::{CardRun, MAX_RUN_LEN};
pub use set::CardSet;

use crate::model::card::Card;
use crate::model::wild::WildRank;
use core::fmt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEnd {
    Low,
    High,
}

impl RunEnd {
    pub const BOTH: [RunEnd; 2] = [RunEnd::Low, RunEnd::High];

    pub const fn as_str(self) -> &'static str {
        match self {
            RunEnd::Low => "low",
            RunEnd::High => "high",
        }
    }
}

impl fmt::Display for RunEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleKind {
    Set,
    Run,
}

/// Caller contract violations when mutating a bundle. The bundle is untouched on error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BundleError {
    #[error("{0} cannot extend this bundle")]
    NotAccepted(Card),
    #[error("wild {0} fits either end of the run; a placement is required")]
    AmbiguousWildPlacement(Card),
    #[error("the {0} end of the run has no room")]
    EndPinned(RunEnd),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bundle {
    Set(CardSet),
    Run(CardRun),
}

impl Bundle {
    pub fn kind(&self) -> BundleKind {
        match self {
            Bundle::Set(_) => BundleKind::Set,
            Bundle::Run(_) => BundleKind::Run,
        }
    }

    pub fn cards(&self) -> &[Card] {
        match self {
            Bundle::Set(set) => set.cards(),
            Bundle::Run(run) => run.cards(),
        }
    }

    pub fn len(&self) -> usize {
        self.cards().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards().is_empty()
    }

    pub fn can_add(&self, card: Card, wild: WildRank) -> bool {
        match self {
            Bundle::Set(set) => set.can_add(card, wild),
            Bundle::Run(run) => run.can_add(card, wild),
        }
    }

    /// Adds a card whose position is deducible; see [`CardRun::add_card`].
    pub fn add_card(&mut self, card: Card, wild: WildRank) -> Result<(), BundleError> {
        match self {
            Bundle::Set(set) => set.add_card(card, wild),
            Bundle::Run(run) => run.add_card(card, wild).map(|_| ()),
        }
    }

    /// Adds a card with an explicit run end. Sets ignore the end.
    pub fn add_at(&mut self, card: Card, end: Option<RunEnd>, wild: WildRank) -> Result<(), BundleError> {
        match (self, end) {
            (Bundle::Set(set), _) => set.add_card(card, wild),
            (Bundle::Run(run), None) => run.add_card(card, wild).map(|_| ()),
            (Bundle::Run(run), Some(end)) => {
                if run.natural_end(card) == Some(end) {
                    run.add_card(card, wild).map(|_| ())
                } else {
                    run.add_wild(card, end, wild)
                }
            }
        }
    }

    pub fn remove_one<R: rand::Rng + ?Sized>(&mut self, wild: WildRank, rng: &mut R) -> Option<Card> {
        match self {
            Bundle::Set(set) => set.remove_one(),
            Bundle::Run(run) => run.remove_one(wild, rng),
        }
    }

    pub fn try_replace_with_wild(&mut self, wild_card: Card, wild: WildRank) -> Option<Card> {
        match self {
            Bundle::Set(set) => set.try_replace_with_wild(wild_card, wild),
            Bundle::Run(run) => run.try_replace_with_wild(wild_card, wild),
        }
    }

    pub fn score(&self) -> u32 {
        self.cards().iter().map(|card| card.score_value()).sum()
    }
}

impl fmt::Display for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind() {
            BundleKind::Set => "Set",
            BundleKind::Run => "Run",
        };
        write!(f, "{label}: (")?;
        for (index, card) in self.cards().iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{card}")?;
        }
        f.write_str(")")
    }
}
