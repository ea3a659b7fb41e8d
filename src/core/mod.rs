// Core algorithm exports
pub mod distance;
pub mod filters;
pub mod matcher;
pub mod scoring;

pub use distance::{haversine_miles, calculate_bounding_box, is_within_bounding_box};
pub use filters::{matches, matches_at};
pub use matcher::{Matcher, MatchResult};
pub use scoring::{complementary, score};
