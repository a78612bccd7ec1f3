use super::{Bundle, CardRun, CardSet};
use crate::model::card::Card;
use crate::model::rank::Rank;
use crate::model::wild::WildRank;

pub const MIN_BUNDLE_LEN: usize = 3;

/// How the constructor should treat the order of the cards it is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardOrder {
    /// Cards arrive in the slot order a player laid them in; wilds sit where they were put.
    AsPlayed,
    /// Any order; wilds fill interior gaps first, then spill onto the open ends.
    Unordered,
}

/// Decides whether `cards` form a set or a run under `wild`, placing the wilds.
///
/// Returns `None` for anything that is not a bundle: fewer than three cards, no natural
/// card to identify the bundle, or naturals that neither share a rank nor line up in one
/// suit. A lone natural with two or more wilds always reads as a set. The only
/// nondeterminism is the end chosen for a spare wild when both ends of an unordered run
/// are open, drawn from `rng`.
pub fn try_build<R: rand::Rng + ?Sized>(
    cards: &[Card],
    wild: WildRank,
    order: CardOrder,
    rng: &mut R,
) -> Option<Bundle> {
    if cards.len() < MIN_BUNDLE_LEN {
        return None;
    }

    let anchor = cards.iter().copied().find(|card| !wild.is_wild(*card))?;
    let is_set = cards
        .iter()
        .filter(|card| !wild.is_wild(**card))
        .all(|card| card.rank == anchor.rank);
    if is_set {
        return Some(Bundle::Set(CardSet::new(cards.to_vec(), anchor.rank)));
    }

    match order {
        CardOrder::AsPlayed => ordered_run(cards, wild),
        CardOrder::Unordered => unordered_run(cards, wild, rng),
    }
}

fn ordered_run(cards: &[Card], wild: WildRank) -> Option<Bundle> {
    let anchor_index = cards.iter().position(|card| !wild.is_wild(*card))?;
    let anchor = cards[anchor_index];
    let start = anchor.rank.value() as i32 - anchor_index as i32;
    let mut end = anchor.rank.value() as i32;

    for card in &cards[anchor_index + 1..] {
        let follows = card.suit == anchor.suit && card.rank.value() as i32 == end + 1;
        if !(wild.is_wild(*card) || follows) {
            return None;
        }
        end += 1;
    }

    if start < 1 || end > 13 {
        return None;
    }
    let low = Rank::from_value(start as u8)?;
    let high = Rank::from_value(end as u8)?;
    Some(Bundle::Run(CardRun::new(cards.to_vec(), anchor.suit, low, high)))
}

fn unordered_run<R: rand::Rng + ?Sized>(cards: &[Card], wild: WildRank, rng: &mut R) -> Option<Bundle> {
    let mut naturals: Vec<Card> = cards
        .iter()
        .copied()
        .filter(|card| !wild.is_wild(*card))
        .collect();
    naturals.sort_by_key(|card| card.rank);
    let suit = naturals.first()?.suit;

    let mut holes = 0usize;
    for pair in naturals.windows(2) {
        if pair[1].suit != suit || pair[1].rank == pair[0].rank {
            return None;
        }
        holes += (pair[1].rank.value() - pair[0].rank.value() - 1) as usize;
    }

    let mut wilds = cards.iter().copied().filter(|card| wild.is_wild(*card));
    if holes > wilds.clone().count() {
        return None;
    }

    let mut slots = Vec::with_capacity(cards.len());
    slots.push(naturals[0]);
    for pair in naturals.windows(2) {
        let gap = pair[1].rank.value() - pair[0].rank.value() - 1;
        for _ in 0..gap {
            slots.push(wilds.next()?);
        }
        slots.push(pair[1]);
    }

    // Inclusive span: `high - low + 1 == slots.len()` holds after every placement.
    let mut low = naturals[0].rank;
    let mut high = naturals[naturals.len() - 1].rank;
    for spare in wilds {
        match (low.pred(), high.succ()) {
            (Some(below), Some(above)) => {
                if rng.gen_bool(0.5) {
                    slots.insert(0, spare);
                    low = below;
                } else {
                    slots.push(spare);
                    high = above;
                }
            }
            (Some(below), None) => {
                slots.insert(0, spare);
                low = below;
            }
            (None, Some(above)) => {
                slots.push(spare);
                high = above;
            }
            (None, None) => return None,
        }
    }

    Some(Bundle::Run(CardRun::new(slots, suit, low, high)))
}

#[cfg(test)]
mod tests {
    use super::{CardOrder, try_build};
    use crate::bundle::Bundle;
    use crate::model::card::Card;
    use crate::model::rank::Rank;
    use crate::model::suit::Suit;
    use crate::model::wild::WildRank;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn cards(text: &str) -> Vec<Card> {
        Card::parse_list(text).unwrap()
    }

    fn wild(round: u8) -> WildRank {
        WildRank::for_round(round).unwrap()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(2024)
    }

    #[test]
    fn three_of_a_rank_make_a_set() {
        let bundle = try_build(&cards("5S 5H 5D"), wild(9), CardOrder::Unordered, &mut rng());
        match bundle {
            Some(Bundle::Set(set)) => {
                assert_eq!(set.value(), Rank::Five);
                assert_eq!(set.cards().len(), 3);
            }
            other => panic!("expected set, got {other:?}"),
        }
    }

    #[test]
    fn ordered_run_with_joker_in_the_middle() {
        let bundle = try_build(&cards("4C RJ 6C"), wild(9), CardOrder::AsPlayed, &mut rng());
        match bundle {
            Some(Bundle::Run(run)) => {
                assert_eq!(run.low(), Rank::Four);
                assert_eq!(run.high(), Rank::Six);
                assert_eq!(run.suit(), Suit::Clubs);
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn unordered_run_fills_the_hole_with_a_joker() {
        let bundle = try_build(&cards("7D 9D BJ"), wild(2), CardOrder::Unordered, &mut rng());
        match bundle {
            Some(Bundle::Run(run)) => {
                assert_eq!(run.low(), Rank::Seven);
                assert_eq!(run.high(), Rank::Nine);
                assert_eq!(run.suit(), Suit::Diamonds);
                assert_eq!(run.cards()[1], Card::black_joker());
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn mixed_ranks_and_suits_are_rejected() {
        for order in [CardOrder::AsPlayed, CardOrder::Unordered] {
            assert!(try_build(&cards("2S 2H 3D"), wild(9), order, &mut rng()).is_none());
        }
    }

    #[test]
    fn too_few_cards_or_all_wild_are_rejected() {
        assert!(try_build(&cards("5S 5H"), wild(9), CardOrder::Unordered, &mut rng()).is_none());
        assert!(try_build(&cards("RJ BJ 9C"), wild(9), CardOrder::Unordered, &mut rng()).is_none());
    }

    #[test]
    fn lone_natural_with_wilds_reads_as_set() {
        let bundle = try_build(&cards("RJ 8H 3C"), wild(3), CardOrder::Unordered, &mut rng());
        assert!(matches!(bundle, Some(Bundle::Set(set)) if set.value() == Rank::Eight));
    }

    #[test]
    fn ordered_run_cannot_start_below_ace() {
        assert!(try_build(&cards("RJ AS 2S"), wild(9), CardOrder::AsPlayed, &mut rng()).is_none());
        assert!(try_build(&cards("QS KS RJ"), wild(9), CardOrder::AsPlayed, &mut rng()).is_none());
    }

    #[test]
    fn ordered_run_rejects_out_of_sequence_cards() {
        assert!(try_build(&cards("4C 6C 5C"), wild(9), CardOrder::AsPlayed, &mut rng()).is_none());
        assert!(try_build(&cards("4C 6C 5C"), wild(9), CardOrder::Unordered, &mut rng()).is_some());
    }

    #[test]
    fn unordered_run_rejects_duplicates_and_wide_gaps() {
        assert!(try_build(&cards("4C 4C 5C"), wild(9), CardOrder::Unordered, &mut rng()).is_none());
        assert!(try_build(&cards("4C 8C RJ"), wild(9), CardOrder::Unordered, &mut rng()).is_none());
    }

    #[test]
    fn spare_wild_goes_to_the_only_open_end() {
        let bundle = try_build(&cards("AH 2H RJ"), wild(9), CardOrder::Unordered, &mut rng());
        match bundle {
            Some(Bundle::Run(run)) => {
                assert_eq!(run.low(), Rank::Ace);
                assert_eq!(run.high(), Rank::Three);
                assert_eq!(run.cards()[2], Card::red_joker());
            }
            other => panic!("expected run, got {other:?}"),
        }

        let top = try_build(&cards("KH QH 9S"), wild(9), CardOrder::Unordered, &mut rng());
        assert!(matches!(top, Some(Bundle::Run(run)) if run.low() == Rank::Jack));
    }

    #[test]
    fn spare_wilds_keep_span_inclusive_for_any_seed() {
        let hand = cards("6S 7S RJ BJ 3C");
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let Some(Bundle::Run(run)) = try_build(&hand, wild(3), CardOrder::Unordered, &mut rng) else {
                panic!("expected run");
            };
            let span = (run.high().value() - run.low().value() + 1) as usize;
            assert_eq!(span, run.cards().len());
            assert_eq!(run.cards().len(), 5);
            assert!(run.low() >= Rank::Three && run.high() <= Rank::Ten);
        }
    }

    #[test]
    fn more_than_thirteen_cards_cannot_form_a_run() {
        let mut hand = cards("AD 2D 3D 4D 5D 6D 7D 8D 10D JD QD KD");
        hand.push(Card::red_joker());
        hand.push(Card::black_joker());
        assert!(try_build(&hand, wild(9), CardOrder::Unordered, &mut rng()).is_none());
    }
}
