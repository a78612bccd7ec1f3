use michigan_core::model::card::Card;
use michigan_core::model::wild::WildRank;
use rand::seq::SliceRandom;

const SET_POTENTIAL: u32 = 6;
const STRONG_RUN_POTENTIAL: u32 = 4;
const WEAK_RUN_POTENTIAL: u32 = 3;

/// Picks the leftover card least likely to grow into a bundle. Wilds are never offered.
///
/// Each candidate scores +6 per other leftover of its rank, +4 per same-suit neighbour one
/// rank away and +3 per same-suit neighbour two ranks away. The lowest total is discarded,
/// the higher rank winning ties. `None` when no non-wild card is left.
pub fn find_best_discard(leftover: &[Card], wild: WildRank) -> Option<Card> {
    let mut candidates: Vec<Card> = leftover
        .iter()
        .copied()
        .filter(|card| !wild.is_wild(*card))
        .collect();
    candidates.sort_by_key(|card| card.rank);
    if candidates.len() < 2 {
        return candidates.first().copied();
    }

    let mut best: Option<(u32, Card)> = None;
    for (index, card) in candidates.iter().enumerate() {
        let potential = potential(index, &candidates);
        if best.is_none_or(|(lowest, _)| potential <= lowest) {
            best = Some((potential, *card));
        }
    }
    best.map(|(_, card)| card)
}

fn potential(index: usize, candidates: &[Card]) -> u32 {
    let card = candidates[index];
    candidates
        .iter()
        .enumerate()
        .filter(|(other, _)| *other != index)
        .map(|(_, other)| {
            if other.rank == card.rank {
                return SET_POTENTIAL;
            }
            if other.suit != card.suit {
                return 0;
            }
            match other.rank.value().abs_diff(card.rank.value()) {
                1 => STRONG_RUN_POTENTIAL,
                2 => WEAK_RUN_POTENTIAL,
                _ => 0,
            }
        })
        .sum()
}

/// Closing-lap discard: the highest-ranked non-wild, or the highest card if all are wild.
pub fn last_turn_discard(leftover: &[Card], wild: WildRank) -> Option<Card> {
    leftover
        .iter()
        .copied()
        .filter(|card| !wild.is_wild(*card))
        .max_by_key(|card| card.rank)
        .or_else(|| leftover.iter().copied().max_by_key(|card| card.rank))
}

/// Any non-wild leftover at random, falling back to a wild only when nothing else is left.
pub fn random_discard<R: rand::Rng + ?Sized>(leftover: &[Card], wild: WildRank, rng: &mut R) -> Option<Card> {
    let naturals: Vec<Card> = leftover
        .iter()
        .copied()
        .filter(|card| !wild.is_wild(*card))
        .collect();
    if naturals.is_empty() {
        leftover.choose(rng).copied()
    } else {
        naturals.choose(rng).copied()
    }
}
