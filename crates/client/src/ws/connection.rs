//! WebSocket session lifecycle: connect, heartbeat, reconnect, teardown.
//!
//! Each logical session (admin, or one table observer) is driven by a
//! single background task that owns the socket. Every connect cycle mints
//! an [`AttemptId`]; events carrying a superseded attempt id are inert,
//! including the close event produced by the teardown's own close call.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_channel::mpsc::UnboundedReceiver;
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use comandero_shared::{ClientMessage, SessionError, CLOSE_NORMAL, CLOSE_POLICY_VIOLATION};

/// Heartbeat cadence while a session is connected.
pub(crate) const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Connection state of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Reconnecting,
}

/// Connectivity snapshot exposed next to the data state, so a UI can show
/// live / reconnecting / offline indicators and tell credential failures
/// apart from transient ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub error: Option<SessionError>,
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

/// Opaque identity of one connect cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptId(u64);

/// What to do after a socket closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    /// The event belongs to a superseded attempt; nothing changes.
    Ignored,
    /// Normal closure; the session is over.
    Stop,
    /// The server rejected the credential; the session is over and must
    /// not be retried with the same token.
    CredentialRejected,
    /// Abnormal loss; schedule exactly one reconnect after the session's
    /// configured delay.
    Reconnect,
}

/// The per-session state machine. Owned behind a mutex shared by the
/// driver task and the session handle; all socket/timer handles are owned
/// exclusively by the driver.
#[derive(Debug, Default)]
pub struct SessionLifecycle {
    state: ConnectionState,
    current: Option<AttemptId>,
    minted: u64,
}

impl SessionLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Mint a new attempt identity, superseding any prior one.
    pub fn begin_attempt(&mut self) -> AttemptId {
        self.minted += 1;
        let attempt = AttemptId(self.minted);
        self.current = Some(attempt);
        self.state = ConnectionState::Connecting;
        attempt
    }

    pub fn is_current(&self, attempt: AttemptId) -> bool {
        self.current == Some(attempt)
    }

    /// Handle the socket-open event. Returns false when the attempt was
    /// superseded while dialing; the caller must discard the socket.
    pub fn socket_opened(&mut self, attempt: AttemptId) -> bool {
        if !self.is_current(attempt) {
            return false;
        }
        self.state = ConnectionState::Connected;
        true
    }

    /// Handle a failed dial. Returns false when the attempt is stale and
    /// no retry may be scheduled.
    pub fn connect_failed(&mut self, attempt: AttemptId) -> bool {
        if !self.is_current(attempt) {
            return false;
        }
        self.state = ConnectionState::Reconnecting;
        true
    }

    /// Handle the socket-close event. `code` is `None` when the transport
    /// dropped without a close frame (treated as abnormal loss).
    pub fn socket_closed(&mut self, attempt: AttemptId, code: Option<u16>) -> CloseAction {
        if !self.is_current(attempt) {
            return CloseAction::Ignored;
        }
        match code {
            Some(CLOSE_NORMAL) => {
                self.invalidate();
                CloseAction::Stop
            }
            Some(CLOSE_POLICY_VIOLATION) => {
                self.invalidate();
                CloseAction::CredentialRejected
            }
            _ => {
                self.state = ConnectionState::Reconnecting;
                CloseAction::Reconnect
            }
        }
    }

    /// Manual teardown: no attempt is current anymore, so any event still
    /// in flight is ignored.
    pub fn invalidate(&mut self) {
        self.current = None;
        self.state = ConnectionState::Idle;
    }
}

/// Lock that survives a poisoned mutex; the lifecycle has no invariants a
/// panicked holder could break.
pub(crate) fn lock(lifecycle: &Mutex<SessionLifecycle>) -> MutexGuard<'_, SessionLifecycle> {
    lifecycle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SessionConfig {
    pub reconnect_delay: Duration,
    pub heartbeat_interval: Duration,
}

/// Everything the background task needs to run one session.
pub(crate) struct SessionDriver {
    pub url: String,
    pub config: SessionConfig,
    /// Frame sent right after the socket opens (the observer session
    /// announces itself; the admin session authenticates via the URL).
    pub greeting: Option<ClientMessage>,
    pub lifecycle: Arc<Mutex<SessionLifecycle>>,
    pub status: Arc<watch::Sender<ConnectionStatus>>,
    pub outbound: UnboundedReceiver<ClientMessage>,
    pub shutdown: watch::Receiver<bool>,
    pub on_frame: Box<dyn FnMut(&str) + Send>,
}

pub(crate) fn spawn(driver: SessionDriver) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run(driver))
}

enum SocketOutcome {
    /// Torn down locally (shutdown signal or handle dropped).
    TornDown,
    /// Closed by the peer or by transport loss.
    Closed(Option<u16>),
}

async fn run(mut driver: SessionDriver) {
    loop {
        if *driver.shutdown.borrow() {
            return;
        }
        let attempt = lock(&driver.lifecycle).begin_attempt();
        driver
            .status
            .send_modify(|s| s.state = ConnectionState::Connecting);

        let dialed = tokio::select! {
            biased;
            _ = wait_shutdown(&mut driver.shutdown) => return,
            dialed = connect_async(driver.url.as_str()) => dialed,
        };

        let (mut write, mut read) = match dialed {
            Ok((socket, _response)) => socket.split(),
            Err(err) => {
                warn!(url = %driver.url, error = %err, "no se pudo abrir el WebSocket");
                if !lock(&driver.lifecycle).connect_failed(attempt) {
                    return;
                }
                driver.status.send_modify(|s| {
                    s.state = ConnectionState::Reconnecting;
                    s.error = Some(SessionError::Transport(err.to_string()));
                });
                if !sleep_or_shutdown(&mut driver.shutdown, driver.config.reconnect_delay).await {
                    return;
                }
                if !lock(&driver.lifecycle).is_current(attempt) {
                    return;
                }
                continue;
            }
        };

        if !lock(&driver.lifecycle).socket_opened(attempt) {
            let _ = write
                .send(Message::Close(Some(CloseFrame {
                    code: CloseCode::Normal,
                    reason: "superseded".into(),
                })))
                .await;
            return;
        }
        driver.status.send_modify(|s| {
            s.state = ConnectionState::Connected;
            s.error = None;
        });
        info!(url = %driver.url, "WebSocket conectado");

        if let Some(greeting) = driver.greeting.clone() {
            send_frame(&mut write, &greeting).await;
        }

        let mut heartbeat = tokio::time::interval_at(
            Instant::now() + driver.config.heartbeat_interval,
            driver.config.heartbeat_interval,
        );

        let outcome = loop {
            tokio::select! {
                biased;
                _ = wait_shutdown(&mut driver.shutdown) => {
                    let _ = write
                        .send(Message::Close(Some(CloseFrame {
                            code: CloseCode::Normal,
                            reason: "teardown".into(),
                        })))
                        .await;
                    break SocketOutcome::TornDown;
                }
                frame = driver.outbound.next() => match frame {
                    Some(frame) => send_frame(&mut write, &frame).await,
                    None => {
                        let _ = write
                            .send(Message::Close(Some(CloseFrame {
                                code: CloseCode::Normal,
                                reason: "teardown".into(),
                            })))
                            .await;
                        break SocketOutcome::TornDown;
                    }
                },
                _ = heartbeat.tick() => send_frame(&mut write, &ClientMessage::Ping).await,
                inbound = read.next() => match inbound {
                    Some(Ok(Message::Text(text))) => (driver.on_frame)(text.as_str()),
                    Some(Ok(Message::Close(frame))) => {
                        break SocketOutcome::Closed(frame.map(|f| u16::from(f.code)));
                    }
                    // Ping/pong are answered by tungstenite; binary is not
                    // part of the protocol.
                    Some(Ok(other)) => debug!(?other, "frame ignorado"),
                    Some(Err(err)) => {
                        warn!(error = %err, "error de lectura del WebSocket");
                        break SocketOutcome::Closed(None);
                    }
                    None => break SocketOutcome::Closed(None),
                },
            }
        };

        match outcome {
            SocketOutcome::TornDown => {
                lock(&driver.lifecycle).invalidate();
                driver.status.send_modify(|s| s.state = ConnectionState::Idle);
                return;
            }
            SocketOutcome::Closed(code) => {
                let action = lock(&driver.lifecycle).socket_closed(attempt, code);
                match action {
                    CloseAction::Ignored => return,
                    CloseAction::Stop => {
                        info!(?code, "WebSocket cerrado");
                        driver.status.send_modify(|s| s.state = ConnectionState::Idle);
                        return;
                    }
                    CloseAction::CredentialRejected => {
                        warn!("el servidor rechazó el token de la sesión");
                        driver.status.send_modify(|s| {
                            s.state = ConnectionState::Idle;
                            s.error = Some(SessionError::CredentialRejected);
                        });
                        return;
                    }
                    CloseAction::Reconnect => {
                        info!(
                            ?code,
                            delay = ?driver.config.reconnect_delay,
                            "conexión perdida, reintentando"
                        );
                        driver
                            .status
                            .send_modify(|s| s.state = ConnectionState::Reconnecting);
                        if !sleep_or_shutdown(&mut driver.shutdown, driver.config.reconnect_delay)
                            .await
                        {
                            return;
                        }
                        if !lock(&driver.lifecycle).is_current(attempt) {
                            return;
                        }
                    }
                }
            }
        }
    }
}

async fn send_frame<S>(write: &mut S, frame: &ClientMessage)
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    match serde_json::to_string(frame) {
        Ok(json) => {
            if let Err(err) = write.send(Message::Text(json.into())).await {
                warn!(error = %err, "no se pudo enviar el frame");
            }
        }
        Err(err) => warn!(error = %err, "no se pudo serializar el frame"),
    }
}

/// Resolves once teardown is requested or every handle was dropped.
async fn wait_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Sleep the reconnect delay; false when teardown arrived first.
async fn sleep_or_shutdown(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        biased;
        _ = wait_shutdown(shutdown) => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_close_stops_without_reconnect() {
        let mut lifecycle = SessionLifecycle::new();
        let attempt = lifecycle.begin_attempt();
        assert!(lifecycle.socket_opened(attempt));
        assert_eq!(
            lifecycle.socket_closed(attempt, Some(CLOSE_NORMAL)),
            CloseAction::Stop
        );
        assert_eq!(lifecycle.state(), ConnectionState::Idle);
    }

    #[test]
    fn policy_violation_rejects_credential_without_reconnect() {
        let mut lifecycle = SessionLifecycle::new();
        let attempt = lifecycle.begin_attempt();
        assert!(lifecycle.socket_opened(attempt));
        assert_eq!(
            lifecycle.socket_closed(attempt, Some(CLOSE_POLICY_VIOLATION)),
            CloseAction::CredentialRejected
        );
        assert_eq!(lifecycle.state(), ConnectionState::Idle);
    }

    #[test]
    fn abnormal_close_schedules_one_reconnect() {
        let mut lifecycle = SessionLifecycle::new();
        let attempt = lifecycle.begin_attempt();
        assert!(lifecycle.socket_opened(attempt));
        assert_eq!(
            lifecycle.socket_closed(attempt, Some(1006)),
            CloseAction::Reconnect
        );
        assert_eq!(lifecycle.state(), ConnectionState::Reconnecting);
        // The missing-close-frame case counts as abnormal loss too.
        let retry = lifecycle.begin_attempt();
        assert!(lifecycle.socket_opened(retry));
        assert_eq!(lifecycle.socket_closed(retry, None), CloseAction::Reconnect);
    }

    #[test]
    fn stale_attempt_events_are_inert() {
        let mut lifecycle = SessionLifecycle::new();
        let stale = lifecycle.begin_attempt();
        lifecycle.invalidate();

        assert!(!lifecycle.socket_opened(stale));
        assert!(!lifecycle.connect_failed(stale));
        assert_eq!(lifecycle.socket_closed(stale, Some(1006)), CloseAction::Ignored);
        assert_eq!(lifecycle.state(), ConnectionState::Idle);
        assert!(!lifecycle.is_current(stale));
    }

    #[test]
    fn newer_attempt_supersedes_older_one() {
        let mut lifecycle = SessionLifecycle::new();
        let first = lifecycle.begin_attempt();
        let second = lifecycle.begin_attempt();

        // A late open/close from the first dial must not disturb the
        // second attempt, and must not schedule a reconnect.
        assert!(!lifecycle.socket_opened(first));
        assert_eq!(lifecycle.socket_closed(first, Some(1006)), CloseAction::Ignored);
        assert_eq!(lifecycle.state(), ConnectionState::Connecting);

        assert!(lifecycle.socket_opened(second));
        assert_eq!(lifecycle.state(), ConnectionState::Connected);
    }

    #[test]
    fn teardown_after_reconnect_disposition_blocks_the_retry() {
        let mut lifecycle = SessionLifecycle::new();
        let attempt = lifecycle.begin_attempt();
        assert!(lifecycle.socket_opened(attempt));
        assert_eq!(
            lifecycle.socket_closed(attempt, Some(1006)),
            CloseAction::Reconnect
        );

        // Teardown lands while the reconnect timer is pending: the timer
        // callback re-checks the identity and must not dial again.
        lifecycle.invalidate();
        assert!(!lifecycle.is_current(attempt));
    }
}
