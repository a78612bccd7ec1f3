use crate::discard::{find_best_discard, last_turn_discard, random_discard};
use crate::error::EngineError;
use crate::search::{BestPlay, LayOff, find_best_play, find_best_play_with_open, total_score};
use crate::tracker::{BundleGroup, BundleTracker, group_discard, new_bundles};
use michigan_core::bundle::Bundle;
use michigan_core::model::card::Card;
use michigan_core::model::hand::{CardId, Hand, HeldCard};
use michigan_core::model::wild::WildRank;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{Level, event};

pub const DIFFICULTY_ENV: &str = "MICHIGAN_AI_DIFFICULTY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiDifficulty {
    /// Coin-flip draws, random discards.
    Easy,
    /// Takes the discard when it lowers the hand's score; sheds via the discard advisor.
    Medium,
    /// Also takes discards that form a new bundle; sheds from the tracked groups.
    Hard,
}

impl Default for AiDifficulty {
    fn default() -> Self {
        Self::Medium
    }
}

impl AiDifficulty {
    pub fn from_env() -> Self {
        static CACHED: OnceLock<AiDifficulty> = OnceLock::new();
        *CACHED.get_or_init(|| Self::from_setting(std::env::var(DIFFICULTY_ENV).ok().as_deref()))
    }

    fn from_setting(raw: Option<&str>) -> Self {
        raw.and_then(|value| value.parse().ok()).unwrap_or_default()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            AiDifficulty::Easy => "easy",
            AiDifficulty::Medium => "medium",
            AiDifficulty::Hard => "hard",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown AI difficulty '{0}' (expected easy, medium or hard)")]
pub struct UnknownDifficulty(pub String);

impl FromStr for AiDifficulty {
    type Err = UnknownDifficulty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" | "random" => Ok(AiDifficulty::Easy),
            "medium" | "normal" | "default" => Ok(AiDifficulty::Medium),
            "hard" => Ok(AiDifficulty::Hard),
            _ => Err(UnknownDifficulty(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawSource {
    Deck,
    Discard,
}

impl DrawSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            DrawSource::Deck => "deck",
            DrawSource::Discard => "discard",
        }
    }
}

/// Everything the turn controller needs to finish a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnDecision {
    pub bundles: Vec<Bundle>,
    /// Cards outside the bundles, the discard included.
    pub leftover: Vec<Card>,
    /// Parallel to the open bundles on the closing lap, empty otherwise.
    pub lay_offs: Vec<Vec<LayOff>>,
    /// The exact instance to remove from the hand.
    pub discard: HeldCard,
    pub goes_out: bool,
    /// Points still in hand once the discard is gone.
    pub score: u32,
}

impl TurnDecision {
    fn from_play(
        hand: &Hand,
        play: BestPlay,
        lay_offs: Vec<Vec<LayOff>>,
        discard: Option<Card>,
    ) -> Result<Self, EngineError> {
        let missing = EngineError::NoDiscardCandidate {
            leftover: play.leftover.len(),
        };
        let card = discard.ok_or_else(|| missing.clone())?;
        let discard = play
            .position_of(card)
            .and_then(|position| hand.held().get(position))
            .copied()
            .ok_or(missing)?;
        let goes_out = play.goes_out();
        let score = if goes_out {
            0
        } else {
            total_score(&play.leftover).saturating_sub(card.score_value())
        };
        Ok(Self {
            bundles: play.bundles,
            leftover: play.leftover,
            lay_offs,
            discard,
            goes_out,
            score,
        })
    }

    fn from_group(group: BundleGroup, discard: HeldCard, goes_out: bool) -> Self {
        let score = if goes_out {
            0
        } else {
            group.score.saturating_sub(discard.card.score_value())
        };
        Self {
            leftover: group.unused_values(),
            bundles: group.bundles,
            lay_offs: Vec::new(),
            discard,
            goes_out,
            score,
        }
    }
}

/// Per-seat decision maker for one round. Owns the seat's [`BundleTracker`].
#[derive(Debug, Clone)]
pub struct TurnPlanner {
    difficulty: AiDifficulty,
    tracker: BundleTracker,
}

impl TurnPlanner {
    pub fn deal<R: rand::Rng + ?Sized>(
        difficulty: AiDifficulty,
        hand: &Hand,
        wild: WildRank,
        rng: &mut R,
    ) -> Self {
        Self {
            difficulty,
            tracker: BundleTracker::deal(hand, wild, rng),
        }
    }

    pub fn difficulty(&self) -> AiDifficulty {
        self.difficulty
    }

    pub fn tracker(&self) -> &BundleTracker {
        &self.tracker
    }

    pub fn observe_draw<R: rand::Rng + ?Sized>(&mut self, hand: &Hand, id: CardId, rng: &mut R) {
        self.tracker.draw(hand, id, rng);
    }

    pub fn observe_discard(&mut self, hand: &Hand, id: CardId) {
        self.tracker.discard(hand, id);
    }

    /// Where to draw from, given the card showing on the discard pile.
    pub fn draw_source<R: rand::Rng + ?Sized>(&self, hand: &Hand, top: Option<Card>, rng: &mut R) -> DrawSource {
        let Some(top) = top else {
            return DrawSource::Deck;
        };
        let wild = self.tracker.wild();
        let (source, reason) = match self.difficulty {
            AiDifficulty::Easy => {
                if rng.gen_bool(0.5) {
                    (DrawSource::Discard, "coin_flip")
                } else {
                    (DrawSource::Deck, "coin_flip")
                }
            }
            AiDifficulty::Medium | AiDifficulty::Hard => {
                if wild.is_wild(top) {
                    (DrawSource::Discard, "wild")
                } else if self.difficulty == AiDifficulty::Hard && self.forms_new_bundle(hand, top, rng) {
                    (DrawSource::Discard, "new_bundle")
                } else if lowers_score(hand, top, wild, rng) {
                    (DrawSource::Discard, "lower_score")
                } else {
                    (DrawSource::Deck, "no_gain")
                }
            }
        };

        tracing::debug!(
            target: "michigan_bot::decision",
            difficulty = self.difficulty.as_str(),
            top = %top,
            source = source.as_str(),
            reason,
            "draw source"
        );
        source
    }

    /// Picks the bundles and discard for the current hand, which has already drawn.
    ///
    /// `open` carries the bundles of the player who went out and marks the closing lap.
    /// Otherwise the tracked groups are checked for a way out first, then the exhaustive
    /// search; failing both the discard follows the difficulty tier.
    pub fn decide<R: rand::Rng + ?Sized>(
        &mut self,
        hand: &Hand,
        open: Option<&[Bundle]>,
        rng: &mut R,
    ) -> Result<TurnDecision, EngineError> {
        let wild = self.tracker.wild();
        let round = self.tracker.round();
        let cards = hand.cards();

        if let Some(open) = open {
            let table = find_best_play_with_open(&cards, wild, open, rng);
            let discard = if table.goes_out() {
                table.play.leftover.first().copied()
            } else {
                last_turn_discard(&table.play.leftover, wild)
            };
            let decision = TurnDecision::from_play(hand, table.play, table.lay_offs, discard)?;
            self.log_decision(hand, &decision, "final_lap");
            return Ok(decision);
        }

        let mut tracked = self.tracked_go_out(round, wild, rng);
        if let Some((group, discard)) = tracked.take_if(|(_, discard)| !wild.is_wild(discard.card)) {
            let decision = TurnDecision::from_group(group, discard, true);
            self.log_decision(hand, &decision, "tracked_go_out");
            return Ok(decision);
        }

        let play = find_best_play(&cards, wild, rng);
        let search_natural = play.leftover.first().is_some_and(|card| !wild.is_wild(*card));
        if play.goes_out() && (tracked.is_none() || search_natural) {
            let discard = play.leftover.first().copied();
            let decision = TurnDecision::from_play(hand, play, Vec::new(), discard)?;
            self.log_decision(hand, &decision, "search_go_out");
            return Ok(decision);
        }
        if let Some((group, discard)) = tracked {
            let decision = TurnDecision::from_group(group, discard, true);
            self.log_decision(hand, &decision, "tracked_go_out");
            return Ok(decision);
        }

        let (decision, reason) = match self.difficulty {
            AiDifficulty::Easy => {
                let discard = random_discard(&play.leftover, wild, rng);
                (TurnDecision::from_play(hand, play, Vec::new(), discard)?, "random")
            }
            AiDifficulty::Medium => {
                let discard = advised_discard(&play.leftover, wild);
                (TurnDecision::from_play(hand, play, Vec::new(), discard)?, "advisor")
            }
            AiDifficulty::Hard => {
                let tracked = self.tracker.groups().iter().find_map(|group| {
                    let mut group = group.clone();
                    let discard = group_discard(&mut group, round, wild, rng).ok()?;
                    Some((group, discard))
                });
                match tracked {
                    Some((group, discard)) => (TurnDecision::from_group(group, discard, false), "tracked_group"),
                    None => {
                        let discard = advised_discard(&play.leftover, wild);
                        (TurnDecision::from_play(hand, play, Vec::new(), discard)?, "advisor")
                    }
                }
            }
        };
        self.log_decision(hand, &decision, reason);
        Ok(decision)
    }

    /// The first tracked way out whose discard is a natural, else the first way out at all.
    fn tracked_go_out<R: rand::Rng + ?Sized>(
        &self,
        round: u8,
        wild: WildRank,
        rng: &mut R,
    ) -> Option<(BundleGroup, HeldCard)> {
        let mut fallback = None;
        for group in self.tracker.go_out_groups() {
            let mut group = group.clone();
            let Ok(discard) = group_discard(&mut group, round, wild, rng) else {
                continue;
            };
            if !wild.is_wild(discard.card) {
                return Some((group, discard));
            }
            fallback.get_or_insert((group, discard));
        }
        fallback
    }

    fn forms_new_bundle<R: rand::Rng + ?Sized>(&self, hand: &Hand, top: Card, rng: &mut R) -> bool {
        let known: HashSet<Vec<Card>> = self
            .tracker
            .bundles()
            .iter()
            .map(|tracked| value_key(&tracked.bundle))
            .collect();
        let mut trial = hand.clone();
        let id = trial.add(top);
        new_bundles(&trial, id, self.tracker.bundles(), self.tracker.wild(), rng)
            .iter()
            .any(|tracked| !known.contains(&value_key(&tracked.bundle)))
    }

    fn log_decision(&self, hand: &Hand, decision: &TurnDecision, reason: &str) {
        if !tracing::enabled!(Level::INFO) {
            return;
        }

        let bundles = decision
            .bundles
            .iter()
            .map(|bundle| bundle.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        let laid_off: usize = decision.lay_offs.iter().map(Vec::len).sum();

        event!(
            target: "michigan_bot::decision",
            Level::INFO,
            difficulty = self.difficulty.as_str(),
            round = self.tracker.round(),
            hand_size = hand.len(),
            bundles = %bundles,
            discard = %decision.discard.card,
            goes_out = decision.goes_out,
            score = decision.score,
            laid_off,
            reason,
        );
    }
}

fn advised_discard(leftover: &[Card], wild: WildRank) -> Option<Card> {
    find_best_discard(leftover, wild).or_else(|| last_turn_discard(leftover, wild))
}

/// Would taking `top` and shedding the worst card leave fewer points than drawing blind?
fn lowers_score<R: rand::Rng + ?Sized>(hand: &Hand, top: Card, wild: WildRank, rng: &mut R) -> bool {
    let mut cards = hand.cards();
    let current = find_best_play(&cards, wild, rng);
    let baseline = total_score(&current.leftover);
    cards.push(top);
    find_best_play(&cards, wild, rng).score < baseline
}

fn value_key(bundle: &Bundle) -> Vec<Card> {
    let mut cards = bundle.cards().to_vec();
    cards.sort_by_key(|card| (card.rank, card.suit));
    cards
}
