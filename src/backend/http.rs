use super::interface::{
    BackendError, ContactSink, ContactSubmission, MatchRequest, Product, ProductMatcher,
};
use crate::dialogue::types::UserPreferences;
use crate::utils::http::{request_with_retry, RetryPolicy};
use async_trait::async_trait;
use std::time::Duration;

/// Remote product matching and contact delivery over JSON POSTs.
pub struct HttpBackend {
    client: reqwest::Client,
    product_url: Option<String>,
    contact_url: Option<String>,
    retry: RetryPolicy,
}

impl HttpBackend {
    pub fn new(
        product_url: Option<String>,
        contact_url: Option<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, product_url, contact_url, retry))
    }

    pub fn with_client(
        client: reqwest::Client,
        product_url: Option<String>,
        contact_url: Option<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            product_url,
            contact_url,
            retry,
        }
    }

    async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<reqwest::Response, BackendError> {
        let response = request_with_retry(|| self.client.post(url).json(body).send(), self.retry)
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ProductMatcher for HttpBackend {
    async fn match_product(&self, preferences: &UserPreferences) -> Result<Product, BackendError> {
        let url = self
            .product_url
            .as_deref()
            .ok_or_else(|| BackendError::NotConfigured("product".to_string()))?;

        let response = match self.post_json(url, &MatchRequest { preferences }).await {
            Err(BackendError::Status { status: 404, .. }) => return Err(BackendError::NotFound),
            other => other?,
        };
        let text = response.text().await?;
        let product: Product = serde_json::from_str(&text)
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        tracing::info!("[Backend] Matched product '{}' ({})", product.name, product.id);
        Ok(product)
    }
}

#[async_trait]
impl ContactSink for HttpBackend {
    async fn submit(&self, submission: &ContactSubmission) -> Result<(), BackendError> {
        let url = self
            .contact_url
            .as_deref()
            .ok_or_else(|| BackendError::NotConfigured("contact".to_string()))?;
        self.post_json(url, submission).await?;
        tracing::info!("[Backend] Contact request delivered");
        Ok(())
    }
}
