use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::models::{EdgeDirection, EdgeKind};
use crate::services::error::StoreError;
use crate::services::repository::{ConnectionRepository, StoreResult};

/// Column type for `connection_edges.kind`
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "edge_kind", rename_all = "lowercase")]
pub enum EdgeKindColumn {
    Interest,
    Pass,
}

impl From<EdgeKindColumn> for EdgeKind {
    fn from(value: EdgeKindColumn) -> Self {
        match value {
            EdgeKindColumn::Interest => EdgeKind::Interest,
            EdgeKindColumn::Pass => EdgeKind::Pass,
        }
    }
}

impl From<EdgeKind> for EdgeKindColumn {
    fn from(value: EdgeKind) -> Self {
        match value {
            EdgeKind::Interest => EdgeKindColumn::Interest,
            EdgeKind::Pass => EdgeKindColumn::Pass,
        }
    }
}

/// PostgreSQL-backed connection repository
///
/// One row per ordered pair; `(from_id, to_id)` is the primary key, so
/// concurrent writers for the same pair resolve to last-write-wins.
pub struct PostgresConnectionRepository {
    pool: PgPool,
}

impl PostgresConnectionRepository {
    /// Connect and run migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::internal(format!("migration failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// Create a repository from settings, with the default pool timeouts
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }
}

#[async_trait]
impl ConnectionRepository for PostgresConnectionRepository {
    async fn create_edge(&self, from: &str, to: &str, kind: EdgeKind) -> StoreResult<Option<EdgeKind>> {
        // Both statements read the same snapshot, so `prior` is the row before the upsert
        let query = r#"
            WITH prior AS (
                SELECT kind FROM connection_edges
                WHERE from_id = $1 AND to_id = $2
            ),
            upserted AS (
                INSERT INTO connection_edges (from_id, to_id, kind, created_at)
                VALUES ($1, $2, $3, NOW())
                ON CONFLICT (from_id, to_id)
                DO UPDATE SET
                    kind = EXCLUDED.kind,
                    created_at = EXCLUDED.created_at
                RETURNING 1
            )
            SELECT kind FROM prior
        "#;

        let row = sqlx::query(query)
            .bind(from)
            .bind(to)
            .bind(EdgeKindColumn::from(kind))
            .fetch_optional(&self.pool)
            .await?;

        let replaced = row
            .map(|row| row.try_get::<EdgeKindColumn, _>("kind"))
            .transpose()?
            .map(EdgeKind::from);

        tracing::debug!(from, to, kind = kind.as_str(), ?replaced, "Upserted connection edge");
        Ok(replaced)
    }

    async fn edge_exists(&self, from: &str, to: &str, kind: EdgeKind) -> StoreResult<bool> {
        let query = r#"
            SELECT EXISTS (
                SELECT 1 FROM connection_edges
                WHERE from_id = $1 AND to_id = $2 AND kind = $3
            ) AS present
        "#;

        let row = sqlx::query(query)
            .bind(from)
            .bind(to)
            .bind(EdgeKindColumn::from(kind))
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("present")?)
    }

    async fn delete_edge(&self, from: &str, to: &str) -> StoreResult<bool> {
        let query = r#"
            DELETE FROM connection_edges
            WHERE from_id = $1 AND to_id = $2
        "#;

        let result = sqlx::query(query)
            .bind(from)
            .bind(to)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_edges(
        &self,
        user_id: &str,
        kind: EdgeKind,
        direction: EdgeDirection,
    ) -> StoreResult<Vec<String>> {
        let query = match direction {
            EdgeDirection::Outgoing => r#"
                SELECT to_id AS other_id
                FROM connection_edges
                WHERE from_id = $1 AND kind = $2
                ORDER BY to_id
            "#,
            EdgeDirection::Incoming => r#"
                SELECT from_id AS other_id
                FROM connection_edges
                WHERE to_id = $1 AND kind = $2
                ORDER BY from_id
            "#,
        };

        let rows = sqlx::query(query)
            .bind(user_id)
            .bind(EdgeKindColumn::from(kind))
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row.try_get("other_id").map_err(StoreError::from))
            .collect()
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}
