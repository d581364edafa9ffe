//! Shared types for the comandero realtime core: wire data models, the
//! WebSocket message protocol and API error types.

pub mod error;
pub mod models;
pub mod protocol;

pub use error::*;
pub use models::*;
pub use protocol::*;
