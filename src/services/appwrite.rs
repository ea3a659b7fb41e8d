use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::core::distance::calculate_bounding_box;
use crate::models::{FilterCriteria, Match, MatchPair, Profile};
use crate::services::error::{ErrorCode, StoreError};
use crate::services::matches::{MatchFactory, MatchOutcome};
use crate::services::repository::StoreResult;

/// Errors that can occur when interacting with Appwrite
#[derive(Debug, Error)]
pub enum AppwriteError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl From<AppwriteError> for StoreError {
    fn from(err: AppwriteError) -> Self {
        match err {
            AppwriteError::RequestError(e) => StoreError::from(e),
            AppwriteError::ApiError { status, message } => {
                StoreError::new(ErrorCode::from_http_status(status), message)
            }
            AppwriteError::NotFound(message) => StoreError::new(ErrorCode::NotFound, message),
            AppwriteError::InvalidResponse(message) => StoreError::new(ErrorCode::InvalidData, message),
        }
    }
}

/// Collection IDs in Appwrite
#[derive(Debug, Clone)]
pub struct AppwriteCollections {
    pub profiles: String,
    pub preferences: String,
    pub matches: String,
}

/// Appwrite API client
///
/// Handles all document-store traffic for the service:
/// - Fetching profiles and stored filter criteria
/// - Querying candidate profiles for discovery
/// - Creating confirmed matches (as the [`MatchFactory`])
pub struct AppwriteClient {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    client: Client,
    collections: AppwriteCollections,
}

impl AppwriteClient {
    /// Create a new Appwrite client
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collections: AppwriteCollections,
        timeout: Duration,
    ) -> Result<Self, AppwriteError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            project_id,
            database_id,
            client,
            collections,
        })
    }

    fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.base_url.trim_end_matches('/'),
            self.database_id,
            collection
        )
    }

    async fn list_documents(&self, collection: &str, queries: &[Value]) -> Result<Vec<Value>, AppwriteError> {
        let url = format!("{}?{}", self.documents_url(collection), encode_queries(queries));

        tracing::debug!("Listing documents: {}", url);

        let response = self
            .client
            .get(&url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
            return Err(AppwriteError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let json: Value = response.json().await?;

        json.get("documents")
            .and_then(|d| d.as_array())
            .cloned()
            .ok_or_else(|| AppwriteError::InvalidResponse("Missing documents array".into()))
    }

    /// Get a single profile by user ID
    pub async fn get_profile(&self, user_id: &str) -> Result<Profile, AppwriteError> {
        let queries = [query("equal", "userId", json!([user_id])), limit_query(1)];
        let documents = self.list_documents(&self.collections.profiles, &queries).await?;

        let doc = documents
            .first()
            .ok_or_else(|| AppwriteError::NotFound(format!("Profile not found for user {}", user_id)))?;

        let data = doc.get("data").unwrap_or(doc);

        serde_json::from_value(data.clone())
            .map_err(|e| AppwriteError::InvalidResponse(format!("Failed to parse profile: {}", e)))
    }

    /// Fetch stored filter criteria; users without stored preferences get the
    /// stored-preference defaults
    pub async fn get_criteria(&self, user_id: &str) -> Result<FilterCriteria, AppwriteError> {
        let queries = [query("equal", "userId", json!([user_id])), limit_query(1)];
        let documents = self.list_documents(&self.collections.preferences, &queries).await?;

        let Some(doc) = documents.first() else {
            tracing::debug!("No stored criteria for {}, using defaults", user_id);
            return serde_json::from_value(json!({}))
                .map_err(|e| AppwriteError::InvalidResponse(e.to_string()));
        };

        let data = doc.get("data").unwrap_or(doc);

        serde_json::from_value(data.clone())
            .map_err(|e| AppwriteError::InvalidResponse(format!("Failed to parse criteria: {}", e)))
    }

    /// Query candidate profiles for `requester`
    ///
    /// Pushes the cheap constraints (verification, recency, bounding box) to
    /// the store; the exact filter runs afterwards in the matcher.
    pub async fn query_candidates(
        &self,
        requester: &Profile,
        criteria: &FilterCriteria,
        limit: usize,
    ) -> Result<Vec<Profile>, AppwriteError> {
        let queries = candidate_queries(requester, criteria, limit, Utc::now());
        let documents = self.list_documents(&self.collections.profiles, &queries).await?;
        let total = documents.len();

        let profiles: Vec<Profile> = documents
            .iter()
            .filter_map(|doc| {
                let data = doc.get("data").unwrap_or(doc);
                serde_json::from_value(data.clone()).ok()
            })
            .filter(|p: &Profile| p.user_id != requester.user_id)
            .collect();

        tracing::debug!("Queried {} candidates ({} documents)", profiles.len(), total);

        Ok(profiles)
    }
}

#[async_trait]
impl MatchFactory for AppwriteClient {
    /// Create the match document with a deterministic id, so a conflict
    /// (HTTP 409) means the match already exists
    async fn create_match(&self, pair: &MatchPair) -> StoreResult<MatchOutcome> {
        let created = Match::from_pair(pair, Utc::now());
        let payload = json!({
            "documentId": created.match_id,
            "data": created,
        });

        let response = self
            .client
            .post(self.documents_url(&self.collections.matches))
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                tracing::info!(pair = %pair, match_id = %created.match_id, "Created match");
                Ok(MatchOutcome::Created(created))
            }
            StatusCode::CONFLICT => {
                tracing::debug!(pair = %pair, "Match already exists");
                Ok(MatchOutcome::AlreadyExists)
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(StoreError::new(
                    ErrorCode::from_http_status(status.as_u16()),
                    format!("Failed to create match: {} {}", status, body),
                ))
            }
        }
    }
}

/// Store-side pre-filter for a candidate query
fn candidate_queries(
    requester: &Profile,
    criteria: &FilterCriteria,
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<Value> {
    let mut queries = vec![
        query("notEqual", "userId", json!([requester.user_id])),
        limit_query(limit),
    ];

    if criteria.verified_only {
        queries.push(query("equal", "isVerified", json!([true])));
    }

    if let Some(days) = criteria.active_within_days {
        let since = now - chrono::Duration::days(i64::from(days));
        queries.push(query("greaterThanEqual", "lastActive", json!([since.to_rfc3339()])));
    }

    if let (Some(max), Some(center)) = (criteria.max_distance_miles, requester.location) {
        if max > 0.0 && center.is_valid() {
            // Profiles without a location stay eligible
            let bbox = calculate_bounding_box(center, max);
            queries.push(json!({
                "method": "or",
                "values": [
                    { "method": "isNull", "attribute": "location" },
                    { "method": "and", "values": [
                        query("between", "location.latitude", json!([bbox.min_lat, bbox.max_lat])),
                        query("between", "location.longitude", json!([bbox.min_lon, bbox.max_lon])),
                    ]},
                ],
            }));
        }
    }

    queries
}

fn query(method: &str, attribute: &str, values: Value) -> Value {
    json!({ "method": method, "attribute": attribute, "values": values })
}

fn limit_query(limit: usize) -> Value {
    json!({ "method": "limit", "values": [limit] })
}

/// Encode queries as repeated `queries[]` parameters
fn encode_queries(queries: &[Value]) -> String {
    queries
        .iter()
        .map(|q| format!("queries[]={}", urlencoding::encode(&q.to_string())))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinate;

    fn test_collections() -> AppwriteCollections {
        AppwriteCollections {
            profiles: "profiles".to_string(),
            preferences: "preferences".to_string(),
            matches: "matches".to_string(),
        }
    }

    fn create_client(base_url: String) -> AppwriteClient {
        AppwriteClient::new(
            base_url,
            "test_key".to_string(),
            "test_project".to_string(),
            "test_db".to_string(),
            test_collections(),
            Duration::from_secs(5),
        )
        .expect("client")
    }

    #[test]
    fn test_appwrite_client_creation() {
        let client = create_client("https://appwrite.test/v1/".to_string());

        assert_eq!(
            client.documents_url("matches"),
            "https://appwrite.test/v1/databases/test_db/collections/matches/documents"
        );
        assert_eq!(client.api_key, "test_key");
    }

    #[test]
    fn test_encode_queries() {
        let encoded = encode_queries(&[limit_query(5)]);
        assert!(encoded.starts_with("queries[]="));
        assert!(encoded.contains("limit"));
    }

    #[tokio::test]
    async fn test_create_match_created() {
        let mut server = mockito::Server::new_async().await;
        let created = server
            .mock("POST", "/databases/test_db/collections/matches/documents")
            .with_status(201)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let client = create_client(server.url());
        let outcome = client.create_match(&MatchPair::new("a", "b")).await.unwrap();

        assert!(outcome.is_created());
        created.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_match_conflict_means_already_exists() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/databases/test_db/collections/matches/documents")
            .with_status(409)
            .with_body(r#"{"message":"Document with the requested ID already exists."}"#)
            .create_async()
            .await;

        let client = create_client(server.url());
        let outcome = client.create_match(&MatchPair::new("b", "a")).await.unwrap();

        assert_eq!(outcome, MatchOutcome::AlreadyExists);
    }

    #[tokio::test]
    async fn test_create_match_unavailable_is_retryable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/databases/test_db/collections/matches/documents")
            .with_status(503)
            .create_async()
            .await;

        let client = create_client(server.url());
        let err = client.create_match(&MatchPair::new("a", "b")).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::Unavailable);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_get_profile() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/databases/test_db/collections/profiles/documents")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"total":1,"documents":[{"userId":"u1","teaches":[{"language":"es","proficiency":"Native"}],
                "wants":["fr"],"isVerified":true,"lastActive":"2026-01-01T00:00:00Z"}]}"#,
            )
            .create_async()
            .await;

        let client = create_client(server.url());
        let profile = client.get_profile("u1").await.unwrap();

        assert_eq!(profile.user_id, "u1");
        assert!(profile.is_verified);
        assert_eq!(profile.teaches.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_criteria_use_stored_defaults() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/databases/test_db/collections/preferences/documents")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"total":0,"documents":[]}"#)
            .create_async()
            .await;

        let client = create_client(server.url());
        let criteria = client.get_criteria("u1").await.unwrap();

        assert!(criteria.complementary_only);
    }

    fn requester() -> Profile {
        let mut profile = Profile::new("me", Utc::now());
        profile.location = Some(Coordinate::new(40.7128, -74.0060));
        profile
    }

    fn methods(queries: &[Value]) -> Vec<&str> {
        queries.iter().filter_map(|q| q["method"].as_str()).collect()
    }

    #[test]
    fn test_candidate_queries_without_constraints() {
        let queries = candidate_queries(&requester(), &FilterCriteria::default(), 25, Utc::now());

        assert_eq!(methods(&queries), vec!["notEqual", "limit"]);
        assert_eq!(queries[0]["values"], json!(["me"]));
        assert_eq!(queries[1]["values"], json!([25]));
    }

    #[test]
    fn test_candidate_queries_push_down_cheap_constraints() {
        let now = Utc::now();
        let criteria = FilterCriteria {
            verified_only: true,
            active_within_days: Some(7),
            max_distance_miles: Some(25.0),
            ..FilterCriteria::default()
        };

        let queries = candidate_queries(&requester(), &criteria, 10, now);
        assert_eq!(
            methods(&queries),
            vec!["notEqual", "limit", "equal", "greaterThanEqual", "or"]
        );

        assert_eq!(queries[2]["attribute"], "isVerified");
        assert_eq!(queries[2]["values"], json!([true]));

        let since = (now - chrono::Duration::days(7)).to_rfc3339();
        assert_eq!(queries[3]["attribute"], "lastActive");
        assert_eq!(queries[3]["values"], json!([since]));

        let bbox = calculate_bounding_box(Coordinate::new(40.7128, -74.0060), 25.0);
        let location = &queries[4]["values"];
        assert_eq!(location[0]["method"], "isNull");
        assert_eq!(location[0]["attribute"], "location");
        assert_eq!(location[1]["values"][0]["attribute"], "location.latitude");
        assert_eq!(location[1]["values"][0]["values"], json!([bbox.min_lat, bbox.max_lat]));
        assert_eq!(location[1]["values"][1]["attribute"], "location.longitude");
        assert_eq!(location[1]["values"][1]["values"], json!([bbox.min_lon, bbox.max_lon]));
    }

    #[test]
    fn test_candidate_queries_skip_distance_without_location() {
        let mut profile = requester();
        profile.location = None;
        let criteria = FilterCriteria {
            max_distance_miles: Some(25.0),
            ..FilterCriteria::default()
        };

        let queries = candidate_queries(&profile, &criteria, 10, Utc::now());
        assert_eq!(methods(&queries), vec!["notEqual", "limit"]);

        profile.location = Some(Coordinate::new(95.0, 0.0));
        let queries = candidate_queries(&profile, &criteria, 10, Utc::now());
        assert_eq!(methods(&queries), vec!["notEqual", "limit"]);
    }

    #[tokio::test]
    async fn test_query_candidates_skips_unparseable_documents() {
        let mut server = mockito::Server::new_async().await;
        let listed = server
            .mock("GET", "/databases/test_db/collections/profiles/documents")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::Regex("isVerified".into()),
                mockito::Matcher::Regex("isNull".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"total":4,"documents":[
                {"userId":"u1","isVerified":true,"lastActive":"2026-01-01T00:00:00Z"},
                {"userId":"broken"},
                {"data":{"userId":"u2","isVerified":true,"lastActive":"2026-01-02T00:00:00Z"}},
                {"userId":"me","lastActive":"2026-01-01T00:00:00Z"}]}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let criteria = FilterCriteria {
            verified_only: true,
            max_distance_miles: Some(50.0),
            ..FilterCriteria::default()
        };

        let client = create_client(server.url());
        let candidates = client.query_candidates(&requester(), &criteria, 20).await.unwrap();

        let ids: Vec<&str> = candidates.iter().map(|p| p.user_id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u2"]);
        listed.assert_async().await;
    }

    #[tokio::test]
    async fn test_query_candidates_store_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/databases/test_db/collections/profiles/documents")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = create_client(server.url());
        let err = client
            .query_candidates(&requester(), &FilterCriteria::default(), 20)
            .await
            .unwrap_err();

        assert!(matches!(err, AppwriteError::ApiError { status: 500, .. }));
    }
}
