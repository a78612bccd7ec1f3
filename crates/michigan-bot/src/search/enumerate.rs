use michigan_core::bundle::{Bundle, CardOrder, MIN_BUNDLE_LEN, try_build};
use michigan_core::model::card::Card;
use michigan_core::model::wild::WildRank;

/// Bit `i` set means hand position `i` is used. Positions, not values, keep the two copies
/// of a card apart.
pub type HandMask = u32;

/// Largest hand the exhaustive enumeration accepts. Round 13 deals 13 and draws one more.
pub const MAX_ENUMERATED_HAND: usize = 20;

/// A bundle buildable from a hand, with the hand positions it consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub bundle: Bundle,
    pub mask: HandMask,
}

impl Candidate {
    pub fn len(&self) -> usize {
        self.mask.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }

    pub fn is_disjoint(&self, used: HandMask) -> bool {
        self.mask & used == 0
    }
}

/// Every bundle obtainable from a subset of `hand`, largest first.
///
/// All `2^n` subsets with at least three cards go through [`try_build`] in unordered mode.
/// Bundles of equal size keep subset order.
pub fn enumerate_bundles<R: rand::Rng + ?Sized>(
    hand: &[Card],
    wild: WildRank,
    rng: &mut R,
) -> Vec<Candidate> {
    enumerate_where(hand, wild, rng, |_| true)
}

/// Like [`enumerate_bundles`], restricted to subsets accepted by `keep`.
pub(crate) fn enumerate_where<R, F>(
    hand: &[Card],
    wild: WildRank,
    rng: &mut R,
    mut keep: F,
) -> Vec<Candidate>
where
    R: rand::Rng + ?Sized,
    F: FnMut(HandMask) -> bool,
{
    if hand.len() > MAX_ENUMERATED_HAND {
        tracing::warn!(
            target: "michigan_bot::search",
            hand_size = hand.len(),
            limit = MAX_ENUMERATED_HAND,
            reason = "hand_too_large",
            message = "refusing exhaustive bundle enumeration"
        );
        return Vec::new();
    }

    let mut found = Vec::new();
    let mut subset = Vec::with_capacity(hand.len());
    for mask in 1..=full_mask(hand.len()) {
        if (mask.count_ones() as usize) < MIN_BUNDLE_LEN || !keep(mask) {
            continue;
        }
        subset.clear();
        subset.extend(positions(mask).map(|position| hand[position]));
        if let Some(bundle) = try_build(&subset, wild, CardOrder::Unordered, rng) {
            found.push(Candidate { bundle, mask });
        }
    }

    found.sort_by(|a, b| b.len().cmp(&a.len()));
    tracing::debug!(
        target: "michigan_bot::search",
        hand_size = hand.len(),
        candidates = found.len(),
        "enumerated bundles"
    );
    found
}

pub(crate) const fn bit(position: usize) -> HandMask {
    1 << position
}

pub(crate) const fn full_mask(len: usize) -> HandMask {
    if len == 0 { 0 } else { HandMask::MAX >> (HandMask::BITS as usize - len) }
}

pub(crate) fn positions(mask: HandMask) -> impl Iterator<Item = usize> {
    (0..HandMask::BITS as usize).filter(move |&position| mask & bit(position) != 0)
}
