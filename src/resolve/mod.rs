pub mod matching;
pub mod resolver;
pub mod web;

pub use matching::{MatchTier, rank_candidates};
pub use resolver::{Resolution, resolve_element};
