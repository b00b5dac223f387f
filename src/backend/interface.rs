use crate::dialogue::types::UserPreferences;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

// ── Error Types ────────────────────────────────────────

#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("Endpoint not configured: {0}")]
    NotConfigured(String),
    #[error("Request failed: {0}")]
    Network(String),
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("No matching product")]
    NotFound,
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError::Network(e.to_string())
    }
}

// ── Product ────────────────────────────────────────────

/// A recommended product as returned by the matching service.
///
/// The service emits snake_case column names while older clients expect
/// camelCase, so both spellings are accepted. `id` may come as a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "image_url")]
    pub image_url: String,
    #[serde(default)]
    pub mood: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub style: String,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default, alias = "price_range", skip_serializing_if = "Option::is_none")]
    pub price_range: Option<String>,
}

fn default_available() -> bool {
    true
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

// ── Requests ───────────────────────────────────────────

/// Body of the product-match request.
#[derive(Debug, Clone, Serialize)]
pub struct MatchRequest<'a> {
    pub preferences: &'a UserPreferences,
}

/// Contact details collected at the end of the funnel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactSubmission {
    pub name: String,
    pub contact: String,
    pub preferences: UserPreferences,
    pub message: String,
}

// ── Collaborator Traits ────────────────────────────────

#[async_trait]
pub trait ProductMatcher: Send + Sync {
    /// Find the product that best fits the collected preferences.
    async fn match_product(&self, preferences: &UserPreferences) -> Result<Product, BackendError>;
}

#[async_trait]
pub trait ContactSink: Send + Sync {
    /// Deliver a contact request. Only success or failure matters.
    async fn submit(&self, submission: &ContactSubmission) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::types::{Choice, MoodChoice};

    #[test]
    fn product_accepts_backend_snake_case() {
        let json = serde_json::json!({
            "id": 17,
            "name": "Moss Globe",
            "description": "A tiny forest in glass",
            "image_url": "https://cdn.example/moss.png",
            "mood": "calm",
            "location": "home",
            "size": "small",
            "style": "warm",
            "available": true,
            "price_range": "2000-3000"
        });
        let product: Product = serde_json::from_value(json).unwrap();
        assert_eq!(product.id, "17");
        assert_eq!(product.image_url, "https://cdn.example/moss.png");
        assert_eq!(product.price_range.as_deref(), Some("2000-3000"));
    }

    #[test]
    fn product_accepts_camel_case() {
        let json = serde_json::json!({
            "id": "p-1",
            "name": "Fern",
            "imageUrl": "fern.png",
            "priceRange": "cheap"
        });
        let product: Product = serde_json::from_value(json).unwrap();
        assert_eq!(product.image_url, "fern.png");
        assert!(product.available);
        assert_eq!(product.description, "");
    }

    #[test]
    fn product_without_name_is_rejected() {
        let json = serde_json::json!({ "id": 1, "description": "nameless" });
        assert!(serde_json::from_value::<Product>(json).is_err());
        let error_body = serde_json::json!({ "error": "No products found" });
        assert!(serde_json::from_value::<Product>(error_body).is_err());
    }

    #[test]
    fn match_request_wraps_preferences() {
        let mut prefs = UserPreferences::default();
        prefs.record(Choice::Mood(MoodChoice::Vibrant));
        let body = serde_json::to_value(MatchRequest {
            preferences: &prefs,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "preferences": { "mood": "vibrant" } }));
    }
}
