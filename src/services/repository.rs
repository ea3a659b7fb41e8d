//! Connection repository boundary
//!
//! Persists directional edges. Implementations must upsert by ordered pair
//! (a later edge for the same `(from, to)` replaces the earlier one, whatever
//! its kind) and make `edge_exists` consistent with their own writes for a
//! single pair.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::models::{ConnectionEdge, EdgeDirection, EdgeKind};
use crate::services::error::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    /// Upsert the edge for `(from, to)`, returning the kind it replaced
    async fn create_edge(&self, from: &str, to: &str, kind: EdgeKind) -> StoreResult<Option<EdgeKind>>;

    /// Whether the active edge for `(from, to)` has the given kind
    async fn edge_exists(&self, from: &str, to: &str, kind: EdgeKind) -> StoreResult<bool>;

    /// Remove the edge for `(from, to)`; returns whether one existed
    async fn delete_edge(&self, from: &str, to: &str) -> StoreResult<bool>;

    /// Ids at the other end of `user_id`'s edges of `kind`
    async fn list_edges(
        &self,
        user_id: &str,
        kind: EdgeKind,
        direction: EdgeDirection,
    ) -> StoreResult<Vec<String>>;

    /// Whether the backing store is reachable
    async fn health_check(&self) -> bool {
        true
    }
}

/// In-memory repository
///
/// Non-persistent; used in tests and local development.
#[derive(Debug, Default)]
pub struct InMemoryConnectionRepository {
    edges: RwLock<HashMap<(String, String), ConnectionEdge>>,
}

impl InMemoryConnectionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the active edge for an ordered pair
    pub async fn get_edge(&self, from: &str, to: &str) -> Option<ConnectionEdge> {
        let edges = self.edges.read().await;
        edges.get(&(from.to_string(), to.to_string())).cloned()
    }

    pub async fn len(&self) -> usize {
        self.edges.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.edges.read().await.is_empty()
    }
}

#[async_trait]
impl ConnectionRepository for InMemoryConnectionRepository {
    async fn create_edge(&self, from: &str, to: &str, kind: EdgeKind) -> StoreResult<Option<EdgeKind>> {
        let edge = ConnectionEdge {
            from_id: from.to_string(),
            to_id: to.to_string(),
            kind,
            created_at: Utc::now(),
        };

        let mut edges = self.edges.write().await;
        let replaced = edges.insert((from.to_string(), to.to_string()), edge);
        Ok(replaced.map(|previous| previous.kind))
    }

    async fn edge_exists(&self, from: &str, to: &str, kind: EdgeKind) -> StoreResult<bool> {
        let edges = self.edges.read().await;
        Ok(edges
            .get(&(from.to_string(), to.to_string()))
            .is_some_and(|edge| edge.kind == kind))
    }

    async fn delete_edge(&self, from: &str, to: &str) -> StoreResult<bool> {
        let mut edges = self.edges.write().await;
        Ok(edges.remove(&(from.to_string(), to.to_string())).is_some())
    }

    async fn list_edges(
        &self,
        user_id: &str,
        kind: EdgeKind,
        direction: EdgeDirection,
    ) -> StoreResult<Vec<String>> {
        let edges = self.edges.read().await;
        let mut ids: Vec<String> = edges
            .values()
            .filter(|edge| edge.kind == kind)
            .filter_map(|edge| match direction {
                EdgeDirection::Outgoing if edge.from_id == user_id => Some(edge.to_id.clone()),
                EdgeDirection::Incoming if edge.to_id == user_id => Some(edge.from_id.clone()),
                _ => None,
            })
            .collect();
        ids.sort();
        Ok(ids)
    }
}
