//! Exhaustive bundle enumeration and the best-play searches built on it.

mod best_play;
mod enumerate;
mod open_table;

pub use best_play::{BestPlay, find_best_play};
pub use enumerate::{Candidate, HandMask, MAX_ENUMERATED_HAND, enumerate_bundles};
pub use open_table::{LayOff, OpenTablePlay, apply_lay_offs, find_best_play_with_open};

pub(crate) use enumerate::{bit, enumerate_where, positions};

use michigan_core::model::card::Card;

/// Points a leftover would cost, not counting the single highest-ranked card (the discard).
pub(crate) fn leftover_score(cards: &[Card]) -> u32 {
    let total: u32 = cards.iter().map(|card| card.score_value()).sum();
    let shed = cards
        .iter()
        .max_by_key(|card| card.rank)
        .map_or(0, |card| card.score_value());
    total - shed
}

pub(crate) fn total_score(cards: &[Card]) -> u32 {
    cards.iter().map(|card| card.score_value()).sum()
}

/// First position in `mask` holding `card`.
pub(crate) fn position_in(hand: &[Card], mask: HandMask, card: Card) -> Option<usize> {
    positions(mask).find(|&position| hand.get(position) == Some(&card))
}

/// Cards at the positions set in `mask`, in hand order.
pub(crate) fn cards_at(hand: &[Card], mask: HandMask) -> Vec<Card> {
    positions(mask)
        .filter(|&position| position < hand.len())
        .map(|position| hand[position])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{cards_at, leftover_score, position_in, total_score};
    use michigan_core::model::card::Card;

    #[test]
    fn leftover_score_skips_highest_rank() {
        let cards = Card::parse_list("3S KH 5D").unwrap();
        assert_eq!(total_score(&cards), 18);
        assert_eq!(leftover_score(&cards), 8);
        assert_eq!(leftover_score(&[]), 0);
    }

    #[test]
    fn cards_at_follows_hand_order() {
        let hand = Card::parse_list("AS 2S 3S 4S").unwrap();
        assert_eq!(cards_at(&hand, 0b1010), Card::parse_list("2S 4S").unwrap());
    }

    #[test]
    fn position_in_stays_inside_the_mask() {
        let hand = Card::parse_list("7S 8D 7S").unwrap();
        assert_eq!(position_in(&hand, 0b110, hand[0]), Some(2));
        assert_eq!(position_in(&hand, 0b010, hand[0]), None);
    }
}
