//! Match factory boundary
//!
//! Creates the confirmed match once mutuality is detected. Implementations
//! are idempotent per unordered pair: a second call for {A,B} or {B,A}
//! reports `AlreadyExists` instead of creating another match.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

use crate::models::{Match, MatchPair};
use crate::services::repository::StoreResult;

/// Result of a match creation request
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Created(Match),
    AlreadyExists,
}

impl MatchOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, MatchOutcome::Created(_))
    }
}

#[async_trait]
pub trait MatchFactory: Send + Sync {
    async fn create_match(&self, pair: &MatchPair) -> StoreResult<MatchOutcome>;
}

/// In-memory match factory; records every call for inspection
#[derive(Debug, Default)]
pub struct InMemoryMatchFactory {
    matches: Mutex<HashMap<MatchPair, Match>>,
    calls: AtomicUsize,
}

impl InMemoryMatchFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `create_match` invocations, including duplicates
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn match_count(&self) -> usize {
        self.matches.lock().await.len()
    }

    pub async fn get(&self, pair: &MatchPair) -> Option<Match> {
        self.matches.lock().await.get(pair).cloned()
    }
}

#[async_trait]
impl MatchFactory for InMemoryMatchFactory {
    async fn create_match(&self, pair: &MatchPair) -> StoreResult<MatchOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut matches = self.matches.lock().await;
        if matches.contains_key(pair) {
            return Ok(MatchOutcome::AlreadyExists);
        }

        let created = Match::from_pair(pair, Utc::now());
        matches.insert(pair.clone(), created.clone());
        Ok(MatchOutcome::Created(created))
    }
}
