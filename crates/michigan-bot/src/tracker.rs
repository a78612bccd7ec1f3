use crate::discard::{find_best_discard, last_turn_discard};
use crate::error::EngineError;
use crate::search::{Candidate, HandMask, bit, enumerate_bundles, enumerate_where, positions};
use michigan_core::bundle::Bundle;
use michigan_core::model::card::Card;
use michigan_core::model::hand::{CardId, Hand, HeldCard};
use michigan_core::model::wild::WildRank;
use std::collections::HashMap;

/// Combinations recorded by one call to [`bundle_groups`] before the rest are dropped.
const MAX_RAW_GROUPS: usize = 20_000;

/// A bundle the hand can currently form, with the card instances it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedBundle {
    pub bundle: Bundle,
    /// Sorted ids of the hand cards the bundle uses.
    pub members: Vec<CardId>,
}

impl TrackedBundle {
    fn from_candidate(hand: &Hand, candidate: Candidate) -> Self {
        let held = hand.held();
        let mut members: Vec<CardId> = positions(candidate.mask).map(|p| held[p].id).collect();
        members.sort_unstable();
        Self {
            bundle: candidate.bundle,
            members,
        }
    }

    pub fn uses(&self, id: CardId) -> bool {
        self.members.binary_search(&id).is_ok()
    }

    /// The same bundle built from `to` instead of its identical twin `from`.
    fn swapped(&self, from: CardId, to: CardId) -> Self {
        let mut members: Vec<CardId> = self
            .members
            .iter()
            .map(|&id| if id == from { to } else { id })
            .collect();
        members.sort_unstable();
        Self {
            bundle: self.bundle.clone(),
            members,
        }
    }
}

/// One way to split a hand into disjoint tracked bundles plus the cards left over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleGroup {
    pub bundles: Vec<Bundle>,
    pub used_cards: Vec<HeldCard>,
    pub unused_cards: Vec<HeldCard>,
    /// Points of the unused cards.
    pub score: u32,
}

impl BundleGroup {
    pub fn used_values(&self) -> Vec<Card> {
        self.used_cards.iter().map(|held| held.card).collect()
    }

    pub fn unused_values(&self) -> Vec<Card> {
        self.unused_cards.iter().map(|held| held.card).collect()
    }
}

/// Every bundle in a freshly dealt hand.
pub fn all_bundles<R: rand::Rng + ?Sized>(hand: &Hand, wild: WildRank, rng: &mut R) -> Vec<TrackedBundle> {
    enumerate_bundles(&hand.cards(), wild, rng)
        .into_iter()
        .map(|candidate| TrackedBundle::from_candidate(hand, candidate))
        .collect()
}

/// Bundles that use the card `new_id`, which `hand` already holds.
///
/// When an identical natural twin is already held, the twin's bundles in `existing` are
/// mirrored onto the new card and only subsets holding both twins (same-rank cards and
/// wilds) are enumerated. Otherwise every subset containing the new card is tried.
pub fn new_bundles<R: rand::Rng + ?Sized>(
    hand: &Hand,
    new_id: CardId,
    existing: &[TrackedBundle],
    wild: WildRank,
    rng: &mut R,
) -> Vec<TrackedBundle> {
    let Some(new_position) = hand.position(new_id) else {
        return Vec::new();
    };
    let cards = hand.cards();
    let new_card = cards[new_position];

    let twin = if wild.is_wild(new_card) {
        None
    } else {
        hand.iter()
            .find(|held| held.id != new_id && held.card == new_card)
            .copied()
    };

    let Some(twin) = twin else {
        return enumerate_where(&cards, wild, rng, |mask| mask & bit(new_position) != 0)
            .into_iter()
            .map(|candidate| TrackedBundle::from_candidate(hand, candidate))
            .collect();
    };

    let mut found: Vec<TrackedBundle> = existing
        .iter()
        .filter(|tracked| tracked.uses(twin.id))
        .map(|tracked| tracked.swapped(twin.id, new_id))
        .collect();

    let Some(twin_position) = hand.position(twin.id) else {
        return found;
    };
    let both = bit(new_position) | bit(twin_position);
    let matching: HandMask = cards
        .iter()
        .enumerate()
        .filter(|(_, card)| card.rank == new_card.rank || wild.is_wild(**card))
        .fold(0, |mask, (position, _)| mask | bit(position));
    found.extend(
        enumerate_where(&cards, wild, rng, |mask| mask & both == both && mask & !matching == 0)
            .into_iter()
            .map(|candidate| TrackedBundle::from_candidate(hand, candidate)),
    );
    found
}

/// Drops every tracked bundle that used the discarded instance. Returns how many went.
pub fn prune_discarded(bundles: &mut Vec<TrackedBundle>, discarded: CardId) -> usize {
    let before = bundles.len();
    bundles.retain(|tracked| !tracked.uses(discarded));
    before - bundles.len()
}

/// Most bundles one group may combine in `round`.
pub const fn max_group_size(round: u8) -> usize {
    match round {
        0..=5 => 1,
        6..=8 => 2,
        9..=11 => 3,
        _ => 4,
    }
}

/// Disjoint combinations of `bundles` the hand supports, lowest score first.
///
/// Every usable bundle forms a group on its own; larger combinations, capped by
/// [`max_group_size`], are kept when no further bundle fits beside them. Bundles naming a
/// card the hand no longer holds, or naming one card twice, never enter a group.
pub fn bundle_groups(hand: &Hand, round: u8, bundles: &[TrackedBundle]) -> Vec<BundleGroup> {
    let limit = max_group_size(round);
    let index: HashMap<CardId, usize> = hand
        .iter()
        .enumerate()
        .map(|(position, held)| (held.id, position))
        .collect();

    let usable: Vec<(usize, HandMask)> = bundles
        .iter()
        .enumerate()
        .filter_map(|(i, tracked)| member_mask(tracked, &index).map(|mask| (i, mask)))
        .collect();

    let mut combos: Vec<(Vec<usize>, HandMask)> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();
    for start in 0..usable.len() {
        stack.push(start);
        collect_groups(&usable, limit, &mut stack, usable[start].1, &mut combos);
        stack.pop();
        if combos.len() >= MAX_RAW_GROUPS {
            tracing::warn!(
                target: "michigan_bot::tracker",
                bundles = usable.len(),
                limit = MAX_RAW_GROUPS,
                reason = "group_limit",
                message = "bundle groups truncated"
            );
            break;
        }
    }

    let held = hand.held();
    let mut groups: Vec<BundleGroup> = combos
        .into_iter()
        .map(|(members, mask)| {
            let (used_cards, unused_cards) = split_hand(held, mask);
            let score = unused_cards.iter().map(|held| held.card.score_value()).sum();
            BundleGroup {
                bundles: members
                    .iter()
                    .map(|&u| bundles[usable[u].0].bundle.clone())
                    .collect(),
                used_cards,
                unused_cards,
                score,
            }
        })
        .collect();
    groups.sort_by_key(|group| group.score);

    tracing::debug!(
        target: "michigan_bot::tracker",
        round,
        tracked = bundles.len(),
        usable = usable.len(),
        groups = groups.len(),
        "regrouped hand"
    );
    groups
}

fn split_hand(held: &[HeldCard], mask: HandMask) -> (Vec<HeldCard>, Vec<HeldCard>) {
    let mut used = Vec::new();
    let mut unused = Vec::new();
    for (position, card) in held.iter().enumerate() {
        if mask & bit(position) != 0 {
            used.push(*card);
        } else {
            unused.push(*card);
        }
    }
    (used, unused)
}

fn member_mask(tracked: &TrackedBundle, index: &HashMap<CardId, usize>) -> Option<HandMask> {
    let mut mask: HandMask = 0;
    for id in &tracked.members {
        let position = *index.get(id)?;
        if position >= HandMask::BITS as usize || mask & bit(position) != 0 {
            return None;
        }
        mask |= bit(position);
    }
    Some(mask)
}

fn collect_groups(
    usable: &[(usize, HandMask)],
    limit: usize,
    stack: &mut Vec<usize>,
    used: HandMask,
    combos: &mut Vec<(Vec<usize>, HandMask)>,
) {
    if combos.len() >= MAX_RAW_GROUPS {
        return;
    }
    let extendable = stack.len() < limit && usable.iter().any(|(_, mask)| mask & used == 0);
    if stack.len() == 1 || !extendable {
        combos.push((stack.clone(), used));
    }
    if stack.len() >= limit {
        return;
    }
    let last = stack.last().copied().unwrap_or(0);
    for next in last + 1..usable.len() {
        let mask = usable[next].1;
        if mask & used != 0 {
            continue;
        }
        stack.push(next);
        collect_groups(usable, limit, stack, used | mask, combos);
        stack.pop();
    }
}

/// True when the group empties the hand down to a single discard.
///
/// After drawing, a hand holds `round + 1` cards: either `round` are bundled and the last
/// one is the discard, or all are bundled and a bundle longer than three can spare one.
pub fn can_group_go_out(group: &BundleGroup, round: u8) -> bool {
    let used = group.used_cards.len();
    let round = round as usize;
    used == round || (used == round + 1 && group.bundles.iter().any(|bundle| bundle.len() > 3))
}

/// The card this group would discard.
///
/// A group that goes out with one card spare discards it; one that uses every card peels a
/// card off an oversized bundle, moving it to the unused side. A wild picked either way is
/// first offered to the bundles in exchange for a natural. Anything else asks the discard
/// advisor about the unused cards, shedding a wild only when nothing else is left.
pub fn group_discard<R: rand::Rng + ?Sized>(
    group: &mut BundleGroup,
    round: u8,
    wild: WildRank,
    rng: &mut R,
) -> Result<HeldCard, EngineError> {
    if can_group_go_out(group, round) {
        let spare = match group.unused_cards.as_slice() {
            [spare] => Some(*spare),
            [] => peel_card(group, wild, rng),
            _ => None,
        };
        if let Some(spare) = spare {
            return Ok(swap_wild_spare(group, spare, wild).unwrap_or(spare));
        }
    }

    let unused = group.unused_values();
    let choice = find_best_discard(&unused, wild).or_else(|| last_turn_discard(&unused, wild));
    choice
        .and_then(|card| group.unused_cards.iter().find(|held| held.card == card).copied())
        .ok_or(EngineError::NoDiscardCandidate {
            leftover: group.unused_cards.len(),
        })
}

fn peel_card<R: rand::Rng + ?Sized>(group: &mut BundleGroup, wild: WildRank, rng: &mut R) -> Option<HeldCard> {
    let bundle = group.bundles.iter_mut().find(|bundle| bundle.len() > 3)?;
    let shed = bundle.remove_one(wild, rng)?;
    let position = group.used_cards.iter().position(|held| held.card == shed)?;
    let held = group.used_cards.remove(position);
    group.unused_cards.push(held);
    group.score += held.card.score_value();
    Some(held)
}

/// Puts a wild spare into one of the group's bundles and makes the natural it displaces
/// the spare instead.
fn swap_wild_spare(group: &mut BundleGroup, spare: HeldCard, wild: WildRank) -> Option<HeldCard> {
    if !wild.is_wild(spare.card) {
        return None;
    }
    let (index, bundle, position) = group.bundles.iter().enumerate().find_map(|(index, bundle)| {
        let mut trial = bundle.clone();
        let displaced = trial.try_replace_with_wild(spare.card, wild)?;
        let position = group.used_cards.iter().position(|held| held.card == displaced)?;
        Some((index, trial, position))
    })?;
    group.bundles[index] = bundle;
    let natural = std::mem::replace(&mut group.used_cards[position], spare);
    group.unused_cards = vec![natural];
    group.score = natural.card.score_value();
    Some(natural)
}

/// Tracked bundles and groups for one hand across a round.
///
/// The owner reports every change to the hand: [`BundleTracker::draw`] after a card is
/// added and [`BundleTracker::discard`] after one is removed.
#[derive(Debug, Clone)]
pub struct BundleTracker {
    wild: WildRank,
    bundles: Vec<TrackedBundle>,
    groups: Vec<BundleGroup>,
}

impl BundleTracker {
    /// Full enumeration for a newly dealt hand. The round number is the wild rank.
    pub fn deal<R: rand::Rng + ?Sized>(hand: &Hand, wild: WildRank, rng: &mut R) -> Self {
        let bundles = all_bundles(hand, wild, rng);
        let groups = bundle_groups(hand, wild.value(), &bundles);
        Self {
            wild,
            bundles,
            groups,
        }
    }

    pub fn wild(&self) -> WildRank {
        self.wild
    }

    pub fn round(&self) -> u8 {
        self.wild.value()
    }

    pub fn draw<R: rand::Rng + ?Sized>(&mut self, hand: &Hand, id: CardId, rng: &mut R) {
        let fresh = new_bundles(hand, id, &self.bundles, self.wild, rng);
        tracing::debug!(
            target: "michigan_bot::tracker",
            card = %id,
            new_bundles = fresh.len(),
            "tracked draw"
        );
        self.bundles.extend(fresh);
        self.groups = bundle_groups(hand, self.round(), &self.bundles);
    }

    pub fn discard(&mut self, hand: &Hand, id: CardId) {
        let pruned = prune_discarded(&mut self.bundles, id);
        tracing::debug!(
            target: "michigan_bot::tracker",
            card = %id,
            pruned,
            remaining = self.bundles.len(),
            "tracked discard"
        );
        self.groups = bundle_groups(hand, self.round(), &self.bundles);
    }

    pub fn bundles(&self) -> &[TrackedBundle] {
        &self.bundles
    }

    pub fn groups(&self) -> &[BundleGroup] {
        &self.groups
    }

    pub fn best_group(&self) -> Option<&BundleGroup> {
        self.groups.first()
    }

    pub fn go_out_group(&self) -> Option<&BundleGroup> {
        self.go_out_groups().next()
    }

    /// Every tracked group that can go out this turn, best score first.
    pub fn go_out_groups(&self) -> impl Iterator<Item = &BundleGroup> {
        let round = self.round();
        self.groups.iter().filter(move |group| can_group_go_out(group, round))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BundleTracker, all_bundles, bundle_groups, can_group_go_out, group_discard, max_group_size,
        new_bundles, prune_discarded,
    };
    use crate::error::EngineError;
    use michigan_core::bundle::{CardOrder, try_build};
    use michigan_core::model::card::Card;
    use michigan_core::model::hand::Hand;
    use michigan_core::model::wild::WildRank;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn hand(text: &str) -> Hand {
        Hand::with_cards(Card::parse_list(text).unwrap())
    }

    fn card(text: &str) -> Card {
        text.parse().unwrap()
    }

    fn wild(round: u8) -> WildRank {
        WildRank::for_round(round).unwrap()
    }

    #[test]
    fn dealt_hand_tracks_every_bundle_with_its_ids() {
        let mut rng = StdRng::seed_from_u64(2);
        let hand = hand("5S 5H 5D 6S 7S");
        let tracked = all_bundles(&hand, wild(9), &mut rng);
        assert_eq!(tracked.len(), 2);
        for bundle in &tracked {
            let cards: Vec<Card> = bundle.members.iter().filter_map(|id| hand.get(*id)).collect();
            assert_eq!(cards.len(), bundle.bundle.len());
        }
    }

    #[test]
    fn drawn_card_only_adds_bundles_that_use_it() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut hand = hand("5S 5H 9C");
        let existing = all_bundles(&hand, wild(3), &mut rng);
        assert!(existing.is_empty());

        let id = hand.add(card("5D"));
        let fresh = new_bundles(&hand, id, &existing, wild(3), &mut rng);
        assert_eq!(fresh.len(), 1);
        assert!(fresh[0].uses(id));
    }

    #[test]
    fn drawn_twin_mirrors_and_adds_pair_sets() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut hand = hand("7C 8C 9C 7H");
        let first = hand.iter().next().unwrap().id;
        let mut tracked = all_bundles(&hand, wild(3), &mut rng);
        assert_eq!(tracked.len(), 1);

        let twin = hand.add(card("7C"));
        let fresh = new_bundles(&hand, twin, &tracked, wild(3), &mut rng);
        assert_eq!(fresh.len(), 2);
        assert!(fresh.iter().any(|t| t.uses(twin) && !t.uses(first) && t.bundle.len() == 3));
        assert!(fresh.iter().any(|t| t.uses(twin) && t.uses(first)));

        tracked.extend(fresh);
        assert_eq!(tracked.len(), all_bundles(&hand, wild(3), &mut rng).len());
    }

    #[test]
    fn pruning_removes_exactly_the_discarded_instance() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut hand = hand("7C 8C 9C 7C 7H");
        let mut tracked = all_bundles(&hand, wild(3), &mut rng);
        assert_eq!(tracked.len(), 3);

        let discarded = hand.iter().next().unwrap().id;
        hand.remove(discarded);
        let pruned = prune_discarded(&mut tracked, discarded);
        assert_eq!(pruned, 2);
        assert_eq!(tracked.len(), 1);

        for bundle in &tracked {
            assert!(!bundle.uses(discarded));
            let cards: Vec<Card> = bundle
                .members
                .iter()
                .map(|id| hand.get(*id).expect("member still held"))
                .collect();
            assert!(try_build(&cards, wild(3), CardOrder::Unordered, &mut rng).is_some());
        }
    }

    #[test]
    fn group_size_follows_the_round() {
        assert_eq!(max_group_size(3), 1);
        assert_eq!(max_group_size(5), 1);
        assert_eq!(max_group_size(6), 2);
        assert_eq!(max_group_size(9), 3);
        assert_eq!(max_group_size(12), 4);
        assert_eq!(max_group_size(13), 4);

        let mut rng = StdRng::seed_from_u64(2);
        let hand = hand("3S 3H 3D 5C 6C 7C 9D 9H 9S QH QS QD");
        let tracked = all_bundles(&hand, wild(2), &mut rng);
        assert_eq!(tracked.len(), 4);

        let early = bundle_groups(&hand, 4, &tracked);
        assert_eq!(early.len(), 4);
        assert!(early.iter().all(|group| group.bundles.len() == 1));

        let middle = bundle_groups(&hand, 9, &tracked);
        assert!(middle.iter().any(|group| group.bundles.len() == 3));
        assert!(middle.iter().all(|group| group.bundles.len() <= 3));

        let late = bundle_groups(&hand, 13, &tracked);
        assert_eq!(late[0].bundles.len(), 4);
        assert_eq!(late[0].score, 0);
    }

    #[test]
    fn groups_partition_the_hand() {
        let mut rng = StdRng::seed_from_u64(2);
        let hand = hand("4S 5S 6S 6H 6D RJ 9C 2D");
        let tracked = all_bundles(&hand, wild(7), &mut rng);
        let groups = bundle_groups(&hand, 7, &tracked);
        assert!(!groups.is_empty());
        assert!(groups.windows(2).all(|pair| pair[0].score <= pair[1].score));

        for group in &groups {
            let mut ids: Vec<_> = group
                .used_cards
                .iter()
                .chain(&group.unused_cards)
                .map(|held| held.id)
                .collect();
            ids.sort_unstable();
            let mut expected: Vec<_> = hand.iter().map(|held| held.id).collect();
            expected.sort_unstable();
            assert_eq!(ids, expected);

            let score: u32 = group.unused_values().iter().map(|c| c.score_value()).sum();
            assert_eq!(group.score, score);
            let used: usize = group.bundles.iter().map(|b| b.len()).sum();
            assert_eq!(used, group.used_cards.len());
        }
    }

    #[test]
    fn groups_skip_bundles_with_missing_cards() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut hand = hand("5S 5H 5D 8C");
        let tracked = all_bundles(&hand, wild(3), &mut rng);
        hand.remove_card(card("5H"));
        assert!(bundle_groups(&hand, 3, &tracked).is_empty());
    }

    #[test]
    fn spare_card_is_the_go_out_discard() {
        let mut rng = StdRng::seed_from_u64(2);
        let hand = hand("5S 5H 5D KC");
        let tracked = all_bundles(&hand, wild(3), &mut rng);
        let mut groups = bundle_groups(&hand, 3, &tracked);
        assert!(can_group_go_out(&groups[0], 3));
        let discard = group_discard(&mut groups[0], 3, wild(3), &mut rng).unwrap();
        assert_eq!(discard.card, card("KC"));
    }

    #[test]
    fn full_cover_peels_from_a_long_bundle() {
        let mut rng = StdRng::seed_from_u64(2);
        let hand = hand("5S 5H 5D 5C");
        let tracked = all_bundles(&hand, wild(3), &mut rng);
        let mut groups = bundle_groups(&hand, 3, &tracked);
        let group = &mut groups[0];
        assert_eq!(group.used_cards.len(), 4);
        assert!(can_group_go_out(group, 3));

        let discard = group_discard(group, 3, wild(3), &mut rng).unwrap();
        assert_eq!(discard.card.rank.value(), 5);
        assert_eq!(group.bundles[0].len(), 3);
        assert_eq!(group.unused_cards, vec![discard]);
        assert_eq!(group.score, 5);
    }

    #[test]
    fn wild_spare_trades_places_with_a_natural() {
        let mut rng = StdRng::seed_from_u64(2);
        let hand = hand("5S 5H 5D RJ");
        let tracked = all_bundles(&hand, wild(3), &mut rng);
        let groups = bundle_groups(&hand, 3, &tracked);
        assert!(groups.iter().any(|group| group.unused_values() == vec![Card::red_joker()]));

        for group in &groups {
            assert!(can_group_go_out(group, 3));
            let mut group = group.clone();
            let discard = group_discard(&mut group, 3, wild(3), &mut rng).unwrap();
            assert_eq!(discard.card.rank.value(), 5);
            assert_eq!(group.unused_cards, vec![discard]);
            assert!(!group.used_cards.contains(&discard));
            assert!(group.bundles.iter().any(|bundle| bundle.cards().contains(&Card::red_joker())));
            let bundled: usize = group.bundles.iter().map(|bundle| bundle.len()).sum();
            assert_eq!(bundled, group.used_cards.len());
        }
    }

    #[test]
    fn other_groups_ask_the_advisor() {
        let mut rng = StdRng::seed_from_u64(2);
        let hand = hand("5S 5H 5D KC 2H 8D");
        let tracked = all_bundles(&hand, wild(9), &mut rng);
        let mut groups = bundle_groups(&hand, 5, &tracked);
        assert!(!can_group_go_out(&groups[0], 5));
        let discard = group_discard(&mut groups[0], 5, wild(9), &mut rng).unwrap();
        assert_eq!(discard.card, card("KC"));
    }

    #[test]
    fn exhausted_group_reports_no_candidate() {
        let mut rng = StdRng::seed_from_u64(2);
        let hand = hand("5S 5H 5D 7C 8C 9C");
        let tracked = all_bundles(&hand, wild(2), &mut rng);
        let mut groups = bundle_groups(&hand, 7, &tracked);
        let full = groups.iter().position(|g| g.unused_cards.is_empty()).unwrap();
        assert_eq!(
            group_discard(&mut groups[full], 7, wild(2), &mut rng),
            Err(EngineError::NoDiscardCandidate { leftover: 0 })
        );
    }

    #[test]
    fn tracker_follows_draws_and_discards() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut hand = hand("5S 5H 9C");
        let mut tracker = BundleTracker::deal(&hand, wild(3), &mut rng);
        assert_eq!(tracker.round(), 3);
        assert!(tracker.bundles().is_empty());
        assert!(tracker.best_group().is_none());

        let drawn = hand.add(card("5D"));
        tracker.draw(&hand, drawn, &mut rng);
        assert_eq!(tracker.bundles().len(), 1);
        assert!(tracker.go_out_group().is_some());

        let nine = hand.iter().find(|held| held.card == card("9C")).unwrap().id;
        hand.remove(nine);
        tracker.discard(&hand, nine);
        assert_eq!(tracker.bundles().len(), 1);

        hand.remove(drawn);
        tracker.discard(&hand, drawn);
        assert!(tracker.bundles().is_empty());
        assert!(tracker.groups().is_empty());
    }
}
