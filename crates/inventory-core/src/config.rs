//! ============================================================================
//! Configuration - API location and HTTP client settings
//! ============================================================================
//! Values come from the environment (a `.env` file is loaded by the binary):
//! - SPARTAN_API_URL           Backend base URL (default http://localhost:8080)
//! - SPARTAN_API_TIMEOUT_SECS  Optional request timeout in seconds
//! ============================================================================

use tracing::warn;

/// Fallback backend location when SPARTAN_API_URL is unset
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Environment variable holding the backend base URL
pub const API_URL_ENV: &str = "SPARTAN_API_URL";

/// Environment variable holding the request timeout
pub const TIMEOUT_ENV: &str = "SPARTAN_API_TIMEOUT_SECS";

/// Path of the inventory endpoint
pub const SPARTAN_PATH: &str = "/spartan";

/// Fetcher configuration
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryConfig {
    pub base_url: String,
    pub timeout_secs: Option<u64>,
    pub user_agent: String,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl InventoryConfig {
    /// Build from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            base_url: resolve_base_url(std::env::var(API_URL_ENV).ok()),
            timeout_secs: parse_timeout(std::env::var(TIMEOUT_ENV).ok()),
            user_agent: default_user_agent(),
        }
    }

    /// Override the base URL
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = resolve_base_url(Some(base_url.to_string()));
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: Option<u64>) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Full endpoint URL, with the armory flag when requested
    pub fn spartan_url(&self, include_armory: bool) -> String {
        if include_armory {
            format!("{}{}?includeArmory=true", self.base_url, SPARTAN_PATH)
        } else {
            format!("{}{}", self.base_url, SPARTAN_PATH)
        }
    }
}

fn default_user_agent() -> String {
    format!("spartan-inventory/{}", env!("CARGO_PKG_VERSION"))
}

/// Pick the configured URL or the default; blank counts as unset
pub fn resolve_base_url(configured: Option<String>) -> String {
    match configured {
        Some(url) if !url.trim().is_empty() => url.trim().trim_end_matches('/').to_string(),
        _ => DEFAULT_API_URL.to_string(),
    }
}

fn parse_timeout(raw: Option<String>) -> Option<u64> {
    let raw = raw?;
    match raw.trim().parse::<u64>() {
        Ok(0) => None,
        Ok(secs) => Some(secs),
        Err(e) => {
            warn!("Ignoring invalid {}={:?}: {}", TIMEOUT_ENV, raw, e);
            None
        }
    }
}
