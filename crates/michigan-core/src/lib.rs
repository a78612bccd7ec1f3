//! Cards, hands, the double deck and the set/run bundles of Michigan rummy.

pub mod bundle;
pub mod model;
