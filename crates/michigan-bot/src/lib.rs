pub mod discard;
pub mod error;
pub mod planner;
pub mod search;
pub mod tracker;

pub use discard::{find_best_discard, last_turn_discard, random_discard};
pub use error::EngineError;
pub use planner::{AiDifficulty, DIFFICULTY_ENV, DrawSource, TurnDecision, TurnPlanner, UnknownDifficulty};
pub use search::{
    BestPlay, Candidate, HandMask, LayOff, MAX_ENUMERATED_HAND, OpenTablePlay, apply_lay_offs,
    enumerate_bundles, find_best_play, find_best_play_with_open,
};
pub use tracker::{
    BundleGroup, BundleTracker, TrackedBundle, all_bundles, bundle_groups, can_group_go_out,
    group_discard, max_group_size, new_bundles, prune_discarded,
};
