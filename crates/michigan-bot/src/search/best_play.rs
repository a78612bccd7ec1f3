use super::enumerate::{Candidate, HandMask, enumerate_bundles, full_mask};
use super::{leftover_score, position_in, positions};
use michigan_core::bundle::Bundle;
use michigan_core::model::card::Card;
use michigan_core::model::wild::WildRank;

/// Bundles composed greedily from one starting candidate, the start included.
const MAX_COMBINED_BUNDLES: usize = 4;

/// The partition of a hand the search settled on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BestPlay {
    pub bundles: Vec<Bundle>,
    /// Cards not placed in any bundle. The discard is among them.
    pub leftover: Vec<Card>,
    /// Hand positions of the leftover cards, parallel to `leftover`.
    pub leftover_positions: Vec<usize>,
    /// Leftover points excluding the highest-ranked leftover card; zero when going out.
    pub score: u32,
}

impl BestPlay {
    /// Nothing could be bundled: the whole hand is leftover.
    pub fn no_play(hand: &[Card]) -> Self {
        Self {
            bundles: Vec::new(),
            leftover: hand.to_vec(),
            leftover_positions: (0..hand.len()).collect(),
            score: leftover_score(hand),
        }
    }

    /// Exactly one card remains, and it is the discard.
    pub fn goes_out(&self) -> bool {
        self.leftover.len() == 1
    }

    /// Hand position of a leftover instance of `card`.
    pub fn position_of(&self, card: Card) -> Option<usize> {
        let index = self.leftover.iter().position(|left| *left == card)?;
        self.leftover_positions.get(index).copied()
    }

    /// Positions of a play searched over a slice of the hand, mapped back through `kept`,
    /// where slice position `i` is hand position `kept[i]`.
    pub(crate) fn remapped(mut self, kept: &[usize]) -> Self {
        self.leftover_positions = self
            .leftover_positions
            .iter()
            .filter_map(|&position| kept.get(position).copied())
            .collect();
        self
    }

    fn out(bundles: Vec<Bundle>, hand: &[Card], discard: usize) -> Self {
        Self {
            bundles,
            leftover: vec![hand[discard]],
            leftover_positions: vec![discard],
            score: 0,
        }
    }
}

/// Searches `hand` for the bundles that leave the fewest points behind.
///
/// Going out is checked first: one bundle covering the whole hand sheds a card from inside
/// itself, and one bundle covering all but one card leaves that card as the discard.
/// Otherwise each candidate in turn seeds a greedy composition of disjoint candidates; the
/// first composition reaching the lowest score wins. A lone wild about to be discarded is
/// swapped into a chosen bundle for a natural where one allows it.
pub fn find_best_play<R: rand::Rng + ?Sized>(hand: &[Card], wild: WildRank, rng: &mut R) -> BestPlay {
    let candidates = enumerate_bundles(hand, wild, rng);
    best_play_from(hand, &candidates, wild, rng)
}

pub(crate) fn best_play_from<R: rand::Rng + ?Sized>(
    hand: &[Card],
    candidates: &[Candidate],
    wild: WildRank,
    rng: &mut R,
) -> BestPlay {
    let full = full_mask(hand.len());

    if let Some(whole) = candidates.iter().find(|c| c.mask == full && c.len() > 3) {
        let mut bundles = vec![whole.bundle.clone()];
        if let Some(shed) = bundles[0].remove_one(wild, rng)
            && let Some(position) = position_in(hand, whole.mask, shed)
        {
            let discard = keep_wild_in_play(hand, &mut bundles, &[whole.mask], position, wild);
            log_go_out("whole_hand", hand.len(), 1);
            return BestPlay::out(bundles, hand, discard);
        }
    }

    if let Some(near) = candidates.iter().find(|c| c.len() + 1 == hand.len()) {
        let mut bundles = vec![near.bundle.clone()];
        if let Some(lone) = positions(full & !near.mask).next() {
            let discard = keep_wild_in_play(hand, &mut bundles, &[near.mask], lone, wild);
            log_go_out("all_but_one", hand.len(), 1);
            return BestPlay::out(bundles, hand, discard);
        }
    }

    let mut best: Option<BestPlay> = None;
    for (index, start) in candidates.iter().enumerate() {
        if start.mask == full {
            continue;
        }

        let mut used: HandMask = start.mask;
        let mut chosen = vec![index];
        while chosen.len() < MAX_COMBINED_BUNDLES {
            let remaining = (full & !used).count_ones() as usize;
            let next = candidates
                .iter()
                .position(|c| c.is_disjoint(used) && c.len() < remaining);
            let Some(next) = next else {
                break;
            };
            used |= candidates[next].mask;
            chosen.push(next);
        }

        let mut bundles: Vec<Bundle> = chosen.iter().map(|&i| candidates[i].bundle.clone()).collect();
        let left: Vec<usize> = positions(full & !used).collect();
        if let [lone] = left.as_slice() {
            let masks: Vec<HandMask> = chosen.iter().map(|&i| candidates[i].mask).collect();
            let discard = keep_wild_in_play(hand, &mut bundles, &masks, *lone, wild);
            log_go_out("composed", hand.len(), bundles.len());
            return BestPlay::out(bundles, hand, discard);
        }

        let leftover: Vec<Card> = left.iter().map(|&position| hand[position]).collect();
        let score = leftover_score(&leftover);
        if best.as_ref().is_none_or(|current| score < current.score) {
            best = Some(BestPlay {
                bundles,
                leftover,
                leftover_positions: left,
                score,
            });
        }
    }

    best.unwrap_or_else(|| BestPlay::no_play(hand))
}

/// Trades a wild discard at `lone` for a natural out of one of `bundles`, returning the
/// hand position of whichever card ends up discarded. `masks` are the bundles' hand cards.
fn keep_wild_in_play(hand: &[Card], bundles: &mut [Bundle], masks: &[HandMask], lone: usize, wild: WildRank) -> usize {
    let card = hand[lone];
    if !wild.is_wild(card) {
        return lone;
    }
    for (bundle, &mask) in bundles.iter_mut().zip(masks) {
        let mut trial = bundle.clone();
        if let Some(displaced) = trial.try_replace_with_wild(card, wild)
            && let Some(position) = position_in(hand, mask, displaced)
        {
            *bundle = trial;
            return position;
        }
    }
    lone
}

fn log_go_out(via: &'static str, hand_size: usize, bundles: usize) {
    tracing::debug!(
        target: "michigan_bot::search",
        via,
        hand_size,
        bundles,
        "hand goes out"
    );
}
