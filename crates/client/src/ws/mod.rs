//! Realtime WebSocket sessions.
//!
//! ```text
//!   ┌──────────────┐      ┌──────────────┐
//!   │ AdminRealtime│      │ MesaObserver │   session handles
//!   └──────┬───────┘      └──────┬───────┘
//!          │  frames              │  frames
//!   ┌──────▼──────────────────────▼───────┐
//!   │        connection::SessionDriver    │   one task per session
//!   └──────┬──────────────────────┬───────┘
//!          ▼                      ▼
//!    watch::Sender          watch::Sender       observable state
//!    (AdminSnapshot)        (Option<MesaState>)
//! ```
//!
//! Consumers read snapshots or subscribe to the watch channels; they never
//! touch the socket, the timers or the attempt identity, which belong to
//! the driver task. Frames of one session are handled strictly in arrival
//! order; the two sessions may interleave with each other.

pub mod admin;
pub mod connection;
pub mod mesa;

pub use admin::{AdminRealtime, AdminSnapshot, MAX_NOTIFICATIONS};
pub use connection::{AttemptId, CloseAction, ConnectionState, ConnectionStatus, SessionLifecycle};
pub use mesa::{MesaObserver, MesaState};
