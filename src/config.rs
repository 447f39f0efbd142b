//! Client configuration from the environment.

use std::time::Duration;

use thiserror::Error;

use crate::gateway::graphql::{GraphqlAdapter, DEFAULT_BASE_URL};
use crate::gateway::{DispatchError, GatewayConfig};
use crate::thread::ReconstructConfig;

pub const ENV_BASE_URL: &str = "THREADWEAVE_BASE_URL";
pub const ENV_ELEVATED_URL: &str = "THREADWEAVE_ELEVATED_URL";
pub const ENV_BEARER_TOKEN: &str = "THREADWEAVE_BEARER_TOKEN";
pub const ENV_TIMEOUT_SECONDS: &str = "THREADWEAVE_TIMEOUT_SECONDS";
pub const ENV_MAX_PAGES: &str = "THREADWEAVE_MAX_PAGES";
pub const ENV_API_HOST: &str = "THREADWEAVE_API_HOST";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Pre-authenticated proxy; `None` disables elevated queries.
    pub elevated_base_url: Option<String>,
    pub bearer_token: Option<String>,
    pub timeout: Duration,
    /// Page fetches per walk direction.
    pub max_pages: usize,
    /// Whether this deployment serves the API host.
    pub api_host: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            elevated_base_url: None,
            bearer_token: None,
            timeout: Duration::from_secs(20),
            max_pages: ReconstructConfig::default().max_pages,
            api_host: false,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let timeout = match get(ENV_TIMEOUT_SECONDS) {
            Some(raw) => Duration::from_secs(parse_positive(ENV_TIMEOUT_SECONDS, &raw)? as u64),
            None => defaults.timeout,
        };
        let max_pages = match get(ENV_MAX_PAGES) {
            Some(raw) => parse_positive(ENV_MAX_PAGES, &raw)?,
            None => defaults.max_pages,
        };
        let api_host = get(ENV_API_HOST)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            base_url: get(ENV_BASE_URL).unwrap_or(defaults.base_url),
            elevated_base_url: get(ENV_ELEVATED_URL),
            bearer_token: get(ENV_BEARER_TOKEN),
            timeout,
            max_pages,
            api_host,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_elevated_url(mut self, url: impl Into<String>) -> Self {
        self.elevated_base_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_api_host(mut self, api_host: bool) -> Self {
        self.api_host = api_host;
        self
    }

    pub fn elevated_available(&self) -> bool {
        self.elevated_base_url.is_some()
    }

    pub fn adapter(&self) -> Result<GraphqlAdapter, DispatchError> {
        GraphqlAdapter::with_config(
            self.base_url.clone(),
            self.elevated_base_url.clone(),
            self.timeout,
            self.bearer_token.clone(),
        )
    }

    /// Gateway bound a little above the client timeout so the client's own
    /// timeout normally fires first.
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            dispatch_timeout: self.timeout + Duration::from_secs(1),
        }
    }

    pub fn reconstruct_config(&self) -> ReconstructConfig {
        ReconstructConfig {
            max_pages: self.max_pages,
        }
    }
}

fn parse_positive(var: &'static str, raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            var,
            value: raw.to_string(),
        }),
    }
}
