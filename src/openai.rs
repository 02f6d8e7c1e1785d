use crate::errors::AppError;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Model used for every completion call: lead guessing, email drafting and
/// competitor analysis.
pub const MODEL: &str = "gpt-4o";

/// Client for the chat-completions endpoint of the generative text service.
///
/// This is the single entry point for completion calls; no other module
/// talks to the service directly.
#[derive(Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiClient {
    /// Creates a new client with a 30 second request timeout.
    pub fn new(base_url: String, api_key: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create OpenAI client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Issues one chat completion (system + user message) and returns the
    /// assistant's text content.
    pub async fn chat_completion(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<String, AppError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let body = json!({
            "model": MODEL,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "max_tokens": max_tokens,
            "temperature": temperature,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("OpenAI request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("OpenAI returned error {}: {}", status, error_text);
            return Err(AppError::ExternalApiError(format!(
                "OpenAI returned status {}: {}",
                status, error_text
            )));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse OpenAI response: {}", e))
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(AppError::ExternalApiError(
                "OpenAI returned an empty completion".to_string(),
            ));
        }

        tracing::debug!("OpenAI completion received ({} chars)", content.len());
        Ok(content)
    }
}
