use super::best_play::{BestPlay, find_best_play};
use super::cards_at;
use super::enumerate::{HandMask, MAX_ENUMERATED_HAND, bit, full_mask, positions};
use crate::error::EngineError;
use michigan_core::bundle::{Bundle, RunEnd};
use michigan_core::model::card::Card;
use michigan_core::model::wild::WildRank;
use std::collections::{HashSet, VecDeque};

/// Upper bound on lay-off combinations evaluated for one hand. Isolated plays get an even
/// share per open bundle.
const MAX_TABLE_PLAYS: usize = 2048;

/// One card laid off on an open bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayOff {
    pub card: Card,
    /// Run end the card goes to; `None` on sets.
    pub end: Option<RunEnd>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OpenTablePlay {
    /// Best play over the cards that stay in hand.
    pub play: BestPlay,
    /// Cards to lay off, parallel-indexed to the open bundles and applied in order.
    pub lay_offs: Vec<Vec<LayOff>>,
}

impl OpenTablePlay {
    pub fn goes_out(&self) -> bool {
        self.play.goes_out()
    }

    pub fn laid_off(&self) -> usize {
        self.lay_offs.iter().map(Vec::len).sum()
    }
}

/// Best play on the closing lap, when `open` holds the bundles of the player who went out.
///
/// The plain search runs first and wins outright if it goes out. Otherwise every lay-off
/// combination (single bundles, then merges across distinct bundles) is tried against the
/// plain search on the cards left in hand. A combination that goes out returns immediately;
/// otherwise the lowest [`BestPlay::score`] wins and ties keep the earlier result.
pub fn find_best_play_with_open<R: rand::Rng + ?Sized>(
    hand: &[Card],
    wild: WildRank,
    open: &[Bundle],
    rng: &mut R,
) -> OpenTablePlay {
    let plain = find_best_play(hand, wild, rng);
    let mut best = OpenTablePlay {
        play: plain,
        lay_offs: vec![Vec::new(); open.len()],
    };
    if best.goes_out() || open.is_empty() || hand.len() > MAX_ENUMERATED_HAND {
        return best;
    }

    let full = full_mask(hand.len());
    let plays = table_plays(hand, wild, open);
    for table_play in &plays {
        let kept: Vec<usize> = positions(full & !table_play.mask).collect();
        let remaining = cards_at(hand, full & !table_play.mask);
        let play = find_best_play(&remaining, wild, rng).remapped(&kept);
        let goes_out = play.goes_out();
        if goes_out || play.score < best.play.score {
            best = OpenTablePlay {
                play,
                lay_offs: table_play.lay_offs(hand),
            };
            if goes_out {
                break;
            }
        }
    }

    tracing::debug!(
        target: "michigan_bot::search",
        open_bundles = open.len(),
        combinations = plays.len(),
        laid_off = best.laid_off(),
        score = best.play.score,
        goes_out = best.goes_out(),
        "evaluated lay-offs"
    );
    best
}

/// Applies a lay-off plan to the open bundles. Either every lay-off lands or none does.
pub fn apply_lay_offs(
    open: &mut [Bundle],
    lay_offs: &[Vec<LayOff>],
    wild: WildRank,
) -> Result<(), EngineError> {
    if lay_offs.len() != open.len() {
        return Err(EngineError::LayOffMismatch {
            expected: open.len(),
            found: lay_offs.len(),
        });
    }

    let mut staged = open.to_vec();
    for (bundle, plan) in staged.iter_mut().zip(lay_offs) {
        for lay_off in plan {
            bundle.add_at(lay_off.card, lay_off.end, wild)?;
        }
    }
    open.clone_from_slice(&staged);
    Ok(())
}

type PlayKey = Vec<Vec<(u8, u8, u8)>>;

/// Hand positions laid off on each open bundle, in placement order.
#[derive(Debug, Clone)]
struct TablePlay {
    mask: HandMask,
    per_bundle: Vec<Vec<(usize, Option<RunEnd>)>>,
}

impl TablePlay {
    fn single(open: usize, index: usize, mask: HandMask, placements: Vec<(usize, Option<RunEnd>)>) -> Self {
        let mut per_bundle = vec![Vec::new(); open];
        per_bundle[index] = placements;
        Self { mask, per_bundle }
    }

    fn shares_bundle(&self, other: &TablePlay) -> bool {
        self.per_bundle
            .iter()
            .zip(&other.per_bundle)
            .any(|(mine, theirs)| !mine.is_empty() && !theirs.is_empty())
    }

    fn merged(&self, other: &TablePlay) -> TablePlay {
        let per_bundle = self
            .per_bundle
            .iter()
            .zip(&other.per_bundle)
            .map(|(mine, theirs)| if mine.is_empty() { theirs.clone() } else { mine.clone() })
            .collect();
        TablePlay {
            mask: self.mask | other.mask,
            per_bundle,
        }
    }

    /// Value-level identity: plays differing only in which twin they use collapse.
    fn key(&self, hand: &[Card]) -> PlayKey {
        self.per_bundle
            .iter()
            .map(|placements| {
                let mut entries: Vec<(u8, u8, u8)> = placements
                    .iter()
                    .map(|&(position, end)| {
                        let card = hand[position];
                        let end = match end {
                            None => 0,
                            Some(RunEnd::Low) => 1,
                            Some(RunEnd::High) => 2,
                        };
                        (card.rank.value(), card.suit as u8, end)
                    })
                    .collect();
                entries.sort_unstable();
                entries
            })
            .collect()
    }

    fn lay_offs(&self, hand: &[Card]) -> Vec<Vec<LayOff>> {
        self.per_bundle
            .iter()
            .map(|placements| {
                placements
                    .iter()
                    .map(|&(position, end)| LayOff {
                        card: hand[position],
                        end,
                    })
                    .collect()
            })
            .collect()
    }
}

fn table_plays(hand: &[Card], wild: WildRank, open: &[Bundle]) -> Vec<TablePlay> {
    let mut seen: HashSet<PlayKey> = HashSet::new();
    let mut isolated = Vec::new();
    let budget = (MAX_TABLE_PLAYS / open.len().max(1)).max(1);
    for index in 0..open.len() {
        let mut plays = Vec::new();
        if !isolated_plays(hand, wild, open, index, budget, &mut seen, &mut plays) {
            tracing::warn!(
                target: "michigan_bot::search",
                hand_size = hand.len(),
                open_bundle = index,
                limit = budget,
                reason = "lay_off_limit",
                message = "lay-offs on one bundle truncated"
            );
        }
        isolated.extend(plays);
    }

    let mut all = isolated.clone();
    let mut frontier = isolated.clone();
    let mut truncated = all.len() >= MAX_TABLE_PLAYS;
    for _ in 1..open.len() {
        if truncated {
            break;
        }
        let mut merged = Vec::new();
        'frontier: for play in &frontier {
            for single in &isolated {
                if play.shares_bundle(single) || play.mask & single.mask != 0 {
                    continue;
                }
                let combined = play.merged(single);
                if seen.insert(combined.key(hand)) {
                    merged.push(combined);
                }
                if all.len() + merged.len() >= MAX_TABLE_PLAYS {
                    truncated = true;
                    break 'frontier;
                }
            }
        }
        if merged.is_empty() {
            break;
        }
        all.extend(merged.iter().cloned());
        frontier = merged;
    }

    if truncated {
        tracing::warn!(
            target: "michigan_bot::search",
            hand_size = hand.len(),
            open_bundles = open.len(),
            limit = MAX_TABLE_PLAYS,
            reason = "lay_off_limit",
            message = "lay-off combinations truncated"
        );
    }

    // A discard has to stay in hand.
    all.retain(|play| (play.mask.count_ones() as usize) < hand.len());
    all
}

/// Every lay-off on `open[index]` taken in isolation, up to `budget` of them. False when
/// the budget cut the list short.
fn isolated_plays(
    hand: &[Card],
    wild: WildRank,
    open: &[Bundle],
    index: usize,
    budget: usize,
    seen: &mut HashSet<PlayKey>,
    plays: &mut Vec<TablePlay>,
) -> bool {
    let bundle = &open[index];
    match bundle {
        Bundle::Set(_) => {
            let accepted: Vec<usize> = (0..hand.len())
                .filter(|&position| bundle.can_add(hand[position], wild))
                .collect();
            for choice in 1..=full_mask(accepted.len()) {
                if plays.len() >= budget {
                    return false;
                }
                let placements: Vec<(usize, Option<RunEnd>)> =
                    positions(choice).map(|i| (accepted[i], None)).collect();
                let mask = placements.iter().fold(0, |mask, &(position, _)| mask | bit(position));
                let play = TablePlay::single(open.len(), index, mask, placements);
                if seen.insert(play.key(hand)) {
                    plays.push(play);
                }
            }
        }
        Bundle::Run(_) => {
            let mut queue: VecDeque<(Bundle, HandMask, Vec<(usize, Option<RunEnd>)>)> = VecDeque::new();
            queue.push_back((bundle.clone(), 0, Vec::new()));
            while let Some((state, mask, placements)) = queue.pop_front() {
                for position in 0..hand.len() {
                    if mask & bit(position) != 0 {
                        continue;
                    }
                    for (next, end) in run_extensions(&state, hand[position], wild) {
                        if plays.len() >= budget {
                            return false;
                        }
                        let mut placed = placements.clone();
                        placed.push((position, Some(end)));
                        let next_mask = mask | bit(position);
                        let play = TablePlay::single(open.len(), index, next_mask, placed.clone());
                        if seen.insert(play.key(hand)) {
                            plays.push(play);
                            queue.push_back((next, next_mask, placed));
                        }
                    }
                }
            }
        }
    }
    true
}

/// Ways `card` extends a run: its natural end, or for a wild each end with room.
fn run_extensions(bundle: &Bundle, card: Card, wild: WildRank) -> Vec<(Bundle, RunEnd)> {
    let Bundle::Run(run) = bundle else {
        return Vec::new();
    };
    if !run.can_add(card, wild) {
        return Vec::new();
    }
    let ends: Vec<RunEnd> = match run.natural_end(card) {
        Some(end) => vec![end],
        None => RunEnd::BOTH.to_vec(),
    };
    ends.into_iter()
        .filter_map(|end| {
            let mut next = bundle.clone();
            next.add_at(card, Some(end), wild).ok()?;
            Some((next, end))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{LayOff, MAX_TABLE_PLAYS, apply_lay_offs, find_best_play_with_open, table_plays};
    use crate::error::EngineError;
    use michigan_core::bundle::{Bundle, CardOrder, RunEnd, try_build};
    use michigan_core::model::card::Card;
    use michigan_core::model::rank::Rank;
    use michigan_core::model::wild::WildRank;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn cards(text: &str) -> Vec<Card> {
        Card::parse_list(text).unwrap()
    }

    fn wild(round: u8) -> WildRank {
        WildRank::for_round(round).unwrap()
    }

    fn open(text: &str, round: u8) -> Bundle {
        let mut rng = StdRng::seed_from_u64(0);
        try_build(&cards(text), wild(round), CardOrder::AsPlayed, &mut rng).unwrap()
    }

    #[test]
    fn lays_off_on_a_set_to_go_out() {
        let mut rng = StdRng::seed_from_u64(4);
        let table = [open("7S 7H 7D", 9)];
        let result = find_best_play_with_open(&cards("7C 2H RJ"), wild(9), &table, &mut rng);
        assert!(result.goes_out());
        assert_eq!(result.play.leftover, cards("2H"));
        let laid: Vec<Card> = result.lay_offs[0].iter().map(|l| l.card).collect();
        assert_eq!(laid, cards("7C RJ"));
        assert!(result.lay_offs[0].iter().all(|l| l.end.is_none()));
    }

    #[test]
    fn extends_a_run_in_order() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut table = [open("5C 6C 7C", 3)];
        let result = find_best_play_with_open(&cards("8C 9C KD 2S"), wild(3), &table, &mut rng);
        assert!(!result.goes_out());
        assert_eq!(
            result.lay_offs[0],
            vec![
                LayOff { card: cards("8C")[0], end: Some(RunEnd::High) },
                LayOff { card: cards("9C")[0], end: Some(RunEnd::High) },
            ]
        );
        assert_eq!(result.play.score, 2);

        apply_lay_offs(&mut table, &result.lay_offs, wild(3)).unwrap();
        assert!(matches!(&table[0], Bundle::Run(run) if run.high() == Rank::Nine));
    }

    #[test]
    fn wild_lay_off_names_its_end() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut table = [open("5C 6C 7C", 9)];
        let result = find_best_play_with_open(&cards("RJ 4D"), wild(9), &table, &mut rng);
        assert!(result.goes_out());
        assert_eq!(result.play.leftover, cards("4D"));
        assert_eq!(
            result.lay_offs[0],
            vec![LayOff { card: Card::red_joker(), end: Some(RunEnd::Low) }]
        );

        apply_lay_offs(&mut table, &result.lay_offs, wild(9)).unwrap();
        assert_eq!(table[0].cards()[0], Card::red_joker());
        assert!(matches!(&table[0], Bundle::Run(run) if run.low() == Rank::Four));
    }

    #[test]
    fn mixes_plays_across_bundles() {
        let mut rng = StdRng::seed_from_u64(4);
        let table = [open("7S 7H 7D", 9), open("5C 6C 7C", 9)];
        let result = find_best_play_with_open(&cards("7D 8C 2H"), wild(9), &table, &mut rng);
        assert!(result.goes_out());
        assert_eq!(result.play.leftover, cards("2H"));
        assert_eq!(result.lay_offs[0], vec![LayOff { card: cards("7D")[0], end: None }]);
        assert_eq!(
            result.lay_offs[1],
            vec![LayOff { card: cards("8C")[0], end: Some(RunEnd::High) }]
        );
    }

    #[test]
    fn always_keeps_a_card_to_discard() {
        let mut rng = StdRng::seed_from_u64(4);
        let table = [open("7S 7H 7D", 9), open("5C 6C 7C", 9)];
        let result = find_best_play_with_open(&cards("7D 8C"), wild(9), &table, &mut rng);
        assert_eq!(result.play.leftover.len(), 1);
        assert_eq!(result.laid_off(), 1);
    }

    #[test]
    fn plain_go_out_skips_the_table() {
        let mut rng = StdRng::seed_from_u64(4);
        let table = [open("7S 7H 7D", 9)];
        let result = find_best_play_with_open(&cards("4H 5H 6H 7C"), wild(9), &table, &mut rng);
        assert!(result.goes_out());
        assert_eq!(result.lay_offs, vec![Vec::new()]);
    }

    #[test]
    fn empty_table_returns_plain_play() {
        let mut rng = StdRng::seed_from_u64(4);
        let result = find_best_play_with_open(&cards("2S 9H KD"), wild(9), &[], &mut rng);
        assert!(result.lay_offs.is_empty());
        assert_eq!(result.play.leftover.len(), 3);
    }

    #[test]
    fn crowded_sets_leave_room_for_later_bundles() {
        let hand = cards("7H 5S 5H 5D 5C 9S 9H 9D 9C RJ BJ KC");
        let table = [
            open("5S 5H 5D", 9),
            open("5C 5D 5H", 9),
            open("5S 5C 5H", 9),
            open("4H 5H 6H", 9),
        ];
        let plays = table_plays(&hand, wild(9), &table);

        let only_first = plays
            .iter()
            .filter(|play| play.per_bundle.iter().skip(1).all(Vec::is_empty))
            .count();
        assert_eq!(only_first, MAX_TABLE_PLAYS / table.len());
        assert!(plays.iter().any(|play| play.per_bundle[3] == vec![(0, Some(RunEnd::High))]));
    }

    #[test]
    fn leftover_positions_point_into_the_full_hand() {
        let mut rng = StdRng::seed_from_u64(4);
        let table = [open("7S 7H 7D", 9)];
        let hand = cards("7C 2H KD 7H");
        let result = find_best_play_with_open(&hand, wild(9), &table, &mut rng);
        assert!(!result.goes_out());
        for (card, &position) in result.play.leftover.iter().zip(&result.play.leftover_positions) {
            assert_eq!(hand[position], *card);
        }
        assert_eq!(result.play.leftover_positions, vec![1, 2]);
    }

    #[test]
    fn apply_is_all_or_nothing() {
        let mut table = [open("7S 7H 7D", 9), open("5C 6C 7C", 9)];
        let before = table.clone();
        let plan = vec![
            vec![LayOff { card: cards("7C")[0], end: None }],
            vec![LayOff { card: cards("KD")[0], end: Some(RunEnd::High) }],
        ];
        assert!(matches!(
            apply_lay_offs(&mut table, &plan, wild(9)),
            Err(EngineError::Bundle(_))
        ));
        assert_eq!(table, before);

        assert_eq!(
            apply_lay_offs(&mut table, &plan[..1], wild(9)),
            Err(EngineError::LayOffMismatch { expected: 2, found: 1 })
        );
    }
}
