//! Data Transfer Objects - response types for the API.

use serde::{Deserialize, Serialize};

/// Body of the rate-limited `/api` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShoppingListResponse {
    pub shopping_list: Vec<String>,
}

/// Response of the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub quota_store: String,
    pub timestamp: String,
}
