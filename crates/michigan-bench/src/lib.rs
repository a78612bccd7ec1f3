//! Deterministic Michigan tournaments between engine difficulty tiers.

pub mod config;
pub mod logging;
pub mod tournament;
