use serde::{Deserialize, Serialize};
use crate::models::domain::RankedPartner;

/// Response for find partners endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindPartnersResponse {
    pub partners: Vec<RankedPartner>,
    #[serde(rename = "totalCandidates")]
    pub total_candidates: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
    #[serde(rename = "retryAfterSecs", skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>, status_code: u16) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status_code,
            retry_after_secs: None,
        }
    }
}

/// Record interest response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterestResponse {
    #[serde(rename = "isNewMatch")]
    pub is_new_match: bool,
}

/// Generic success response for pass and undo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub success: bool,
}

/// Connection state between two users
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionState {
    pub interested: bool,
    pub passed: bool,
}

/// List of user ids connected to a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeListResponse {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "userIds")]
    pub user_ids: Vec<String>,
    pub count: usize,
}
