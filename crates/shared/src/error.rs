//! Error types shared across the client crates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error envelope the backend attaches to non-2xx responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Extract a user-facing message from an error response body.
/// Prefers `error`, falls back to `message`.
pub fn try_error_detail(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok()?;
    for field in [parsed.error, parsed.message] {
        if let Some(text) = field {
            if !text.trim().is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// REST client error. `Http { status: 401, .. }` is the signal for the
/// outer layer to force a re-login; this crate only surfaces it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("error de conexión con el servidor: {0}")]
    Network(String),
    #[error("HTTP {status}: {mensaje}")]
    Http { status: u16, mensaje: String },
    #[error("respuesta inválida del servidor: {0}")]
    Deserialize(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Session-level error exposed next to the connectivity flag.
///
/// Transport failures resolve themselves through the reconnect path;
/// a rejected credential is terminal for the session and requires the
/// outer layer to re-authenticate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("error de conexión: {0}")]
    Transport(String),
    #[error("token inválido - inicia sesión nuevamente")]
    CredentialRejected,
    /// An `ERROR` frame reported by the server over an open session.
    #[error("{0}")]
    Server(String),
}
