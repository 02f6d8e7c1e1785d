use crate::errors::AppError;
use serde_json::Value;
use std::time::Duration;

/// A contact resolved by the email-discovery service, with the raw payload
/// kept for provenance.
#[derive(Debug, Clone)]
pub struct ResolvedContact {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub company: Option<String>,
    pub position: Option<String>,
    pub linkedin_url: Option<String>,
    pub score: Option<f64>,
    pub verification: Option<Value>,
    pub raw: Value,
}

/// Client for the email-finder endpoint of the discovery service. The
/// upstream API takes its key as a URL query parameter.
#[derive(Clone)]
pub struct HunterClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HunterClient {
    pub fn new(base_url: String, api_key: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create Hunter client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Resolves (first name, last name, domain) to a verified email address.
    ///
    /// Returns `Ok(None)` when the service answers non-2xx or finds no
    /// email; the caller drops the candidate and moves on.
    pub async fn find_email(
        &self,
        domain: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<ResolvedContact>, AppError> {
        // Build URL with proper parameter encoding
        let url = reqwest::Url::parse_with_params(
            &format!("{}/v2/email-finder", self.base_url),
            &[
                ("domain", domain),
                ("first_name", first_name),
                ("last_name", last_name),
                ("api_key", self.api_key.as_str()),
            ],
        )
        .map_err(|e| AppError::ExternalApiError(format!("Failed to build URL: {}", e)))?;

        // Redact the key from logs to prevent credential exposure
        tracing::debug!(
            "Hunter email-finder: {}/v2/email-finder?domain={}&first_name={}&last_name={}&api_key=[REDACTED]",
            self.base_url,
            domain,
            first_name,
            last_name
        );

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Hunter request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!("Hunter API responded non-OK {}: {}", status, error_text);
            return Ok(None);
        }

        let payload: Value = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse Hunter response: {}", e))
        })?;

        let Some(data) = payload.get("data") else {
            return Ok(None);
        };
        let Some(email) = data.get("email").and_then(|v| v.as_str()) else {
            return Ok(None);
        };

        let field = |key: &str| {
            data.get(key)
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        };

        Ok(Some(ResolvedContact {
            first_name: field("first_name"),
            last_name: field("last_name"),
            email: email.to_string(),
            company: field("company"),
            position: field("position"),
            linkedin_url: field("linkedin_url"),
            score: data.get("score").and_then(|v| v.as_f64()),
            verification: data.get("verification").cloned(),
            raw: data.clone(),
        }))
    }
}
