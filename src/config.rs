use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Generative text service credentials. Optional: without it the
    /// discovery pipeline runs on the static fallback list and template
    /// generation is unavailable.
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    /// Email-discovery service credentials. Optional: without it resolved
    /// targets come from the static fallback list.
    pub hunter_api_key: Option<String>,
    pub hunter_base_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            hunter_api_key: std::env::var("HUNTER_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            hunter_base_url: std::env::var("HUNTER_BASE_URL")
                .unwrap_or_else(|_| "https://api.hunter.io".to_string())
                .trim_end_matches('/')
                .to_string(),
        };

        if !config.openai_base_url.starts_with("http://")
            && !config.openai_base_url.starts_with("https://")
        {
            anyhow::bail!("OPENAI_BASE_URL must start with http:// or https://");
        }
        if !config.hunter_base_url.starts_with("http://")
            && !config.hunter_base_url.starts_with("https://")
        {
            anyhow::bail!("HUNTER_BASE_URL must start with http:// or https://");
        }

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("OpenAI base URL: {}", config.openai_base_url);
        tracing::debug!("Hunter base URL: {}", config.hunter_base_url);
        tracing::debug!("Server port: {}", config.port);
        if config.combined_discovery_enabled() {
            tracing::info!("Combined discovery path enabled (OpenAI + Hunter keys present)");
        } else {
            tracing::warn!(
                "Combined discovery disabled (openai key: {}, hunter key: {}) - using fallback targets",
                config.openai_api_key.is_some(),
                config.hunter_api_key.is_some()
            );
        }

        Ok(config)
    }

    /// The lead-generation + email-resolution path only runs when both
    /// external services are configured.
    pub fn combined_discovery_enabled(&self) -> bool {
        self.openai_api_key.is_some() && self.hunter_api_key.is_some()
    }
}
