//! Process-local set of in-flight (from, to) operations
//!
//! Advisory only: it stops rapid duplicate submissions within one process.
//! Cross-process correctness comes from the repository's upsert semantics.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type PairKey = (String, String);

#[derive(Debug, Clone, Default)]
pub struct PendingOperationSet {
    inner: Arc<Mutex<HashSet<PairKey>>>,
}

impl PendingOperationSet {
    pub fn new() -> Self {
        Self::default()
    }

    // The set holds plain strings, so a poisoned lock is still consistent
    fn lock(&self) -> MutexGuard<'_, HashSet<PairKey>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim `(from, to)`; `None` if an operation for the pair is in flight
    pub fn try_acquire(&self, from: &str, to: &str) -> Option<PendingGuard> {
        let key = (from.to_string(), to.to_string());
        if !self.lock().insert(key.clone()) {
            return None;
        }
        Some(PendingGuard {
            set: self.clone(),
            key,
        })
    }

    pub fn contains(&self, from: &str, to: &str) -> bool {
        self.lock().contains(&(from.to_string(), to.to_string()))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Releases its pair when dropped, whatever the outcome of the operation
#[derive(Debug)]
pub struct PendingGuard {
    set: PendingOperationSet,
    key: PairKey,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.set.lock().remove(&self.key);
    }
}
