//! Comandero realtime core.
//!
//! The synchronization layer of the restaurant admin dashboard: the admin
//! WebSocket session ([`AdminRealtime`]), the per-table observer session
//! ([`MesaObserver`]), the REST collaborator ([`ApiClient`]) and the
//! ESC/POS receipt encoder ([`printer`]). Rendering, routing and auth
//! token issuance live elsewhere; this crate exposes observable state and
//! imperative operations.

pub mod api_client;
pub mod config;
pub mod printer;
pub mod storage;
pub mod ws;

pub use api_client::ApiClient;
pub use config::ClientConfig;
pub use ws::{
    AdminRealtime, AdminSnapshot, ConnectionState, ConnectionStatus, MesaObserver, MesaState,
    MAX_NOTIFICATIONS,
};
