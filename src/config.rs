// Client configuration
use reqwest::Url;

use crate::error::ClientError;

pub const DEFAULT_BASE_URL: &str = "https://www.goodreads.com";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_USER_AGENT: &str = concat!("goodreads-client/", env!("CARGO_PKG_VERSION"));

pub const API_KEY_VAR: &str = "GOODREADS_API_KEY";
pub const BASE_URL_VAR: &str = "GOODREADS_BASE_URL";
pub const TIMEOUT_MS_VAR: &str = "GOODREADS_TIMEOUT_MS";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Builds a config from `GOODREADS_API_KEY`, `GOODREADS_BASE_URL` and
    /// `GOODREADS_TIMEOUT_MS`. Only the API key is required.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)
            .ok_or_else(|| ClientError::ConfigError(format!("{} is not set", API_KEY_VAR)))?;

        let mut config = Self::new(api_key);
        if let Some(base_url) = lookup(BASE_URL_VAR) {
            config.base_url = base_url;
        }
        if let Some(timeout) = lookup(TIMEOUT_MS_VAR) {
            config.timeout_ms = timeout.trim().parse().map_err(|_| {
                ClientError::ConfigError(format!("{} must be a number, got {:?}", TIMEOUT_MS_VAR, timeout))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.api_key.trim().is_empty() {
            return Err(ClientError::ConfigError("API key is empty".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(ClientError::ConfigError("timeout must be positive".to_string()));
        }

        let url = Url::parse(&self.base_url).map_err(|e| {
            ClientError::ConfigError(format!("invalid base URL {:?}: {}", self.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::ConfigError(format!(
                "base URL must be http(s), got {:?}",
                self.base_url
            )));
        }

        Ok(())
    }
}
