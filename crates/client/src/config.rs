//! Endpoint configuration from environment variables.

const DEFAULT_WS_URL: &str = "wss://api.comandero.app";
const DEFAULT_API_URL: &str = "http://localhost:3000/api";

/// Base endpoints for the realtime sessions and the REST collaborator.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket base, e.g. `wss://api.comandero.app`.
    pub ws_base: String,
    /// REST base, e.g. `http://localhost:3000/api`.
    pub api_base: String,
}

impl ClientConfig {
    pub fn new(ws_base: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            ws_base: ws_base.into(),
            api_base: api_base.into(),
        }
    }

    /// Read `COMANDERO_WS_URL` / `COMANDERO_API_URL`, falling back to the
    /// production defaults.
    pub fn from_env() -> Self {
        Self {
            ws_base: std::env::var("COMANDERO_WS_URL")
                .unwrap_or_else(|_| DEFAULT_WS_URL.to_string()),
            api_base: std::env::var("COMANDERO_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
