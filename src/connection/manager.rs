//! Connection transaction manager
//!
//! Turns one-directional interest into a confirmed mutual match exactly once.
//! Each `record_interest` call moves through
//! `validating -> rate-limiting -> persisting -> mutuality-check ->
//! {match-delegated | reconciliation-scheduled} -> done`.
//!
//! A successful call is never falsified by a failing read path: once the
//! edge is durably written, mutuality-check and match-creation failures
//! degrade to a one-shot delayed reconciliation instead of an error.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::connection::error::ConnectionError;
use crate::connection::guard::{PendingGuard, PendingOperationSet};
use crate::connection::retry::{RetryError, RetryPolicy};
use crate::models::{ConnectionState, EdgeDirection, EdgeKind, MatchPair};
use crate::services::matches::{MatchFactory, MatchOutcome};
use crate::services::rate_limit::{ActionKind, LocalRateLimiter, RateLimitAuthority};
use crate::services::repository::ConnectionRepository;

/// Longest accepted user id
pub const MAX_ID_LEN: usize = 128;

/// Default delay before the one-shot reconciliation runs
pub const DEFAULT_RECONCILIATION_DELAY: Duration = Duration::from_secs(5);

/// Outcome of a reconciliation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Mutuality confirmed and a new match created
    Matched,
    /// Mutual, but the match already existed
    AlreadyMatched,
    NotMutual,
    Failed,
}

#[derive(Clone)]
pub struct TransactionManager {
    repository: Arc<dyn ConnectionRepository>,
    rate_limiter: Arc<dyn RateLimitAuthority>,
    fallback: Arc<LocalRateLimiter>,
    matches: Arc<dyn MatchFactory>,
    pending: PendingOperationSet,
    retry: RetryPolicy,
    reconciliation_delay: Duration,
}

impl TransactionManager {
    pub fn new(
        repository: Arc<dyn ConnectionRepository>,
        rate_limiter: Arc<dyn RateLimitAuthority>,
        fallback: Arc<LocalRateLimiter>,
        matches: Arc<dyn MatchFactory>,
    ) -> Self {
        Self {
            repository,
            rate_limiter,
            fallback,
            matches,
            pending: PendingOperationSet::new(),
            retry: RetryPolicy::default(),
            reconciliation_delay: DEFAULT_RECONCILIATION_DELAY,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_reconciliation_delay(mut self, delay: Duration) -> Self {
        self.reconciliation_delay = delay;
        self
    }

    /// In-flight operations, for inspection
    pub fn pending(&self) -> &PendingOperationSet {
        &self.pending
    }

    /// Record `from`'s interest in `to`
    ///
    /// Returns `true` when this call created a new mutual match. Repeating
    /// an interest that is already recorded returns `false` without asking
    /// the match factory again.
    pub async fn record_interest(&self, from: &str, to: &str) -> Result<bool, ConnectionError> {
        validate_pair(from, to)?;
        let _guard = self.claim(from, to)?;

        self.check_rate_limit(from, ActionKind::Interest).await?;

        let repository = &*self.repository;
        let attempts = AtomicU32::new(0);
        let attempts_ref = &attempts;
        let replaced = self
            .retry
            .run("create_edge", move || {
                attempts_ref.fetch_add(1, Ordering::SeqCst);
                repository.create_edge(from, to, EdgeKind::Interest)
            })
            .await
            .map_err(|err| {
                warn!(from, to, attempts = err.attempts, error = %err.last, "Failed to persist interest");
                ConnectionError::from(err)
            })?;

        // A retried write may report its own earlier attempt as the prior edge
        if replaced == Some(EdgeKind::Interest) && attempts.load(Ordering::SeqCst) == 1 {
            debug!(from, to, "Interest already recorded");
            return Ok(false);
        }

        debug!(from, to, "Interest recorded");

        let mutual = self
            .retry
            .run("edge_exists", move || repository.edge_exists(to, from, EdgeKind::Interest))
            .await;

        match mutual {
            Ok(true) => self.delegate_match(from, to).await,
            Ok(false) => Ok(false),
            Err(err) => {
                warn!(
                    from,
                    to,
                    attempts = err.attempts,
                    error = %err.last,
                    "Mutuality check failed, scheduling reconciliation"
                );
                self.schedule_reconciliation(from, to);
                Ok(false)
            }
        }
    }

    /// Record that `from` passed on `to`; never creates a match
    pub async fn record_pass(&self, from: &str, to: &str) -> Result<(), ConnectionError> {
        validate_pair(from, to)?;
        let _guard = self.claim(from, to)?;

        self.check_rate_limit(from, ActionKind::Pass).await?;

        self.repository
            .create_edge(from, to, EdgeKind::Pass)
            .await
            .map_err(|err| {
                warn!(from, to, error = %err, "Failed to persist pass");
                ConnectionError::from(RetryError { attempts: 1, last: err })
            })?;

        debug!(from, to, "Pass recorded");
        Ok(())
    }

    /// Remove `from`'s edge to `to`, whatever its kind
    ///
    /// An existing match is left in place.
    pub async fn undo(&self, from: &str, to: &str) -> Result<(), ConnectionError> {
        validate_pair(from, to)?;
        let _guard = self.claim(from, to)?;

        let repository = &*self.repository;
        let removed = self
            .retry
            .run("delete_edge", move || repository.delete_edge(from, to))
            .await?;

        debug!(from, to, removed, "Undo applied");
        Ok(())
    }

    /// Whether `from` has an active interest edge to `to`
    pub async fn has_interest(&self, from: &str, to: &str) -> Result<bool, ConnectionError> {
        validate_pair(from, to)?;
        self.edge_exists(from, to, EdgeKind::Interest).await
    }

    pub async fn check_state(&self, from: &str, to: &str) -> Result<ConnectionState, ConnectionError> {
        validate_pair(from, to)?;
        let (interested, passed) = tokio::try_join!(
            self.edge_exists(from, to, EdgeKind::Interest),
            self.edge_exists(from, to, EdgeKind::Pass),
        )?;
        Ok(ConnectionState { interested, passed })
    }

    /// Users who expressed interest in `user_id`
    pub async fn list_incoming(&self, user_id: &str) -> Result<Vec<String>, ConnectionError> {
        self.list(user_id, EdgeDirection::Incoming).await
    }

    /// Users `user_id` expressed interest in
    pub async fn list_outgoing(&self, user_id: &str) -> Result<Vec<String>, ConnectionError> {
        self.list(user_id, EdgeDirection::Outgoing).await
    }

    async fn list(&self, user_id: &str, direction: EdgeDirection) -> Result<Vec<String>, ConnectionError> {
        validate_id(user_id)?;
        let repository = &*self.repository;
        Ok(self
            .retry
            .run("list_edges", move || {
                repository.list_edges(user_id, EdgeKind::Interest, direction)
            })
            .await?)
    }

    async fn edge_exists(&self, from: &str, to: &str, kind: EdgeKind) -> Result<bool, ConnectionError> {
        let repository = &*self.repository;
        Ok(self
            .retry
            .run("edge_exists", move || repository.edge_exists(from, to, kind))
            .await?)
    }

    fn claim(&self, from: &str, to: &str) -> Result<PendingGuard, ConnectionError> {
        self.pending.try_acquire(from, to).ok_or_else(|| {
            debug!(from, to, "Rejected duplicate in-flight operation");
            ConnectionError::InvalidOperation(format!(
                "An operation from {} to {} is already in progress",
                from, to
            ))
        })
    }

    /// Ask the authority; fall back to the local counter when it is unreachable
    async fn check_rate_limit(&self, user_id: &str, action: ActionKind) -> Result<(), ConnectionError> {
        let decision = match self.rate_limiter.check(user_id, action).await {
            Ok(decision) => decision,
            Err(err) => {
                warn!(user_id, %action, error = %err, "Rate limit authority unavailable, using local counter");
                self.fallback.check_local(user_id, action).await
            }
        };

        if decision.allowed {
            Ok(())
        } else {
            info!(user_id, %action, retry_after = ?decision.retry_after, "Rate limit exceeded");
            Err(ConnectionError::RateLimitExceeded {
                retry_after: decision.retry_after,
            })
        }
    }

    /// Mutuality confirmed synchronously; create the match or defer it
    async fn delegate_match(&self, from: &str, to: &str) -> Result<bool, ConnectionError> {
        let pair = MatchPair::new(from, to);
        let matches = &*self.matches;
        let pair_ref = &pair;

        match self
            .retry
            .run("create_match", move || matches.create_match(pair_ref))
            .await
        {
            Ok(MatchOutcome::Created(created)) => {
                info!(pair = %pair, match_id = %created.match_id, "Mutual match created");
                Ok(true)
            }
            Ok(MatchOutcome::AlreadyExists) => {
                debug!(pair = %pair, "Pair already matched");
                Ok(false)
            }
            Err(err) => {
                warn!(pair = %pair, error = %err.last, "Match creation failed, scheduling reconciliation");
                self.schedule_reconciliation(from, to);
                Ok(false)
            }
        }
    }

    /// Detached one-shot recheck of `to -> from` after the configured delay
    ///
    /// Runs to completion even after the originating request has returned.
    fn schedule_reconciliation(&self, from: &str, to: &str) -> tokio::task::JoinHandle<Reconciliation> {
        let manager = self.clone();
        let (from, to) = (from.to_string(), to.to_string());
        let delay = self.reconciliation_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let outcome = manager.reconcile(&from, &to).await;
            info!(from = %from, to = %to, ?outcome, "Reconciliation finished");
            outcome
        })
    }

    /// Re-run the mutuality check for `from -> to` and complete the match
    pub async fn reconcile(&self, from: &str, to: &str) -> Reconciliation {
        let repository = &*self.repository;
        let mutual = self
            .retry
            .run("edge_exists", move || repository.edge_exists(to, from, EdgeKind::Interest))
            .await;

        match mutual {
            Ok(true) => {}
            Ok(false) => return Reconciliation::NotMutual,
            Err(err) => {
                warn!(from, to, error = %err.last, "Reconciliation mutuality check failed");
                return Reconciliation::Failed;
            }
        }

        let pair = MatchPair::new(from, to);
        let matches = &*self.matches;
        let pair_ref = &pair;
        match self
            .retry
            .run("create_match", move || matches.create_match(pair_ref))
            .await
        {
            Ok(MatchOutcome::Created(created)) => {
                info!(pair = %pair, match_id = %created.match_id, "Mutual match created by reconciliation");
                Reconciliation::Matched
            }
            Ok(MatchOutcome::AlreadyExists) => Reconciliation::AlreadyMatched,
            Err(err) => {
                warn!(pair = %pair, error = %err.last, "Reconciliation match creation failed");
                Reconciliation::Failed
            }
        }
    }
}

fn validate_id(id: &str) -> Result<(), ConnectionError> {
    if id.is_empty() {
        return Err(ConnectionError::InvalidInput("User id must not be empty".to_string()));
    }
    if id.len() > MAX_ID_LEN {
        return Err(ConnectionError::InvalidInput(format!(
            "User id must be at most {} characters",
            MAX_ID_LEN
        )));
    }
    if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ConnectionError::InvalidInput(
            "User id must not contain whitespace or control characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_pair(from: &str, to: &str) -> Result<(), ConnectionError> {
    validate_id(from)?;
    validate_id(to)?;
    if from == to {
        return Err(ConnectionError::InvalidOperation(
            "You cannot connect with yourself".to_string(),
        ));
    }
    Ok(())
}
