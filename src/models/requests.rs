use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::models::domain::FilterCriteria;

/// Request to find language-exchange partners
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FindPartnersRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[serde(default = "default_limit")]
    pub limit: u16,
    /// Overrides the stored criteria when present
    #[serde(default)]
    pub criteria: Option<FilterCriteria>,
}

fn default_limit() -> u16 {
    20
}

/// Directional connection request (interest, pass, undo)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConnectionRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "from_id", rename = "fromId")]
    pub from_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "to_id", rename = "toId")]
    pub to_id: String,
}

/// Query for connection state between two users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStateQuery {
    #[serde(alias = "from_id", rename = "fromId")]
    pub from_id: String,
    #[serde(alias = "to_id", rename = "toId")]
    pub to_id: String,
}

/// Query for listing a user's edges
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserQuery {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
}
