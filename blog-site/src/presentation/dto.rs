use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::post::PostUpdate;

// ======================= AUTH =======================

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    #[serde(rename = "token_type")]
    pub token_type: String, // "Bearer"
}

// ======================= ADMIN =======================

/// Body of `POST /api/admin/categories` and `POST /api/admin/tags`.
#[derive(Debug, Deserialize)]
pub struct CreateCatalogEntryRequest {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePostRequest {
    #[serde(flatten)]
    pub fields: PostUpdate,
    #[serde(default)]
    pub tag_ids: Option<Vec<Uuid>>,
}

// ======================= PAGES =======================

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub s: String,
    pub page: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_update_accepts_partial_bodies() {
        let request: UpdatePostRequest =
            serde_json::from_str(r#"{"on_main": true, "tag_ids": []}"#).unwrap();
        assert_eq!(request.fields.on_main, Some(true));
        assert!(request.fields.title.is_none());
        assert_eq!(request.tag_ids, Some(vec![]));

        let empty: UpdatePostRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.tag_ids.is_none());
    }
}
