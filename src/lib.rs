//! Lingo Match - compatibility and connection service for language-exchange partners
//!
//! This library provides partner discovery (filtering, scoring, ranking) and
//! the connection protocol that turns mutual interest into a match exactly once.

pub mod config;
pub mod connection;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use connection::{ConnectionError, RetryPolicy, TransactionManager};
pub use core::{complementary, haversine_miles, matches, score, Matcher};
pub use models::{FilterCriteria, MatchPair, Profile, RankedPartner};
