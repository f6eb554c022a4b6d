//! ============================================================================
//! Transport - Outbound HTTP for the fetcher
//! ============================================================================
//! The fetcher only needs "POST this JSON, give me status and body". Keeping
//! that behind a trait lets tests run without a backend.
//! ============================================================================

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::InventoryConfig;
use crate::types::InventoryError;

/// Raw HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends JSON POST requests
#[async_trait]
pub trait InventoryTransport: Send + Sync {
    async fn post_json(&self, url: &str, body: &Value) -> Result<TransportResponse, InventoryError>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport from config (user agent, optional timeout)
    pub fn new(config: &InventoryConfig) -> Result<Self, InventoryError> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| InventoryError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl InventoryTransport for HttpTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<TransportResponse, InventoryError> {
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| InventoryError::Transport(format!("Failed to send inventory request: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| InventoryError::Transport(format!("Failed to read response body: {}", e)))?;

        debug!("POST {} -> {} ({} bytes)", url, status, body.len());
        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_creation() {
        let config = InventoryConfig::from_env().with_timeout_secs(Some(5));
        assert!(HttpTransport::new(&config).is_ok());
    }

    #[test]
    fn test_success_range() {
        let ok = TransportResponse { status: 204, body: String::new() };
        let err = TransportResponse { status: 500, body: String::new() };
        assert!(ok.is_success());
        assert!(!err.is_success());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        // Port 9 (discard) on localhost is not expected to speak HTTP
        let config = InventoryConfig::from_env()
            .with_base_url("http://127.0.0.1:9")
            .with_timeout_secs(Some(2));
        let transport = HttpTransport::new(&config).unwrap();
        let result = transport
            .post_json(&config.spartan_url(false), &serde_json::json!({"id": "abc"}))
            .await;
        assert!(matches!(result, Err(InventoryError::Transport(_))));
    }
}
