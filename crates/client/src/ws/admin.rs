//! Admin realtime session: table list, notifications and split-payment
//! snapshots pushed over `/ws/admin`, plus the optimistic notification
//! operations confirmed over REST.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures_channel::mpsc::{unbounded, UnboundedSender};
use tokio::sync::watch;
use tracing::warn;

use comandero_shared::{
    AdminServerMessage, ClientMessage, MesaConPedido, Notification, SubtotalesUpdate,
};

use crate::api_client::ApiClient;
use crate::config::ClientConfig;
use crate::storage;
use crate::ws::connection::{
    self, lock, ConnectionStatus, SessionConfig, SessionDriver, SessionLifecycle,
    HEARTBEAT_INTERVAL,
};

/// Most notifications retained in memory; older ones are evicted as new
/// pushes arrive.
pub const MAX_NOTIFICATIONS: usize = 100;

const RECONNECT_DELAY: std::time::Duration = std::time::Duration::from_secs(3);

/// State shaped by the admin session. Consumers read snapshots or
/// subscribe to changes; all mutation goes through [`AdminRealtime`].
#[derive(Debug, Clone, Default)]
pub struct AdminSnapshot {
    pub mesas: Vec<MesaConPedido>,
    pub notificaciones: Vec<Notification>,
    /// Split-payment snapshots keyed by order id; each push fully
    /// replaces the entry for its order.
    pub subtotales: HashMap<i64, SubtotalesUpdate>,
}

impl AdminSnapshot {
    pub fn unread_count(&self) -> usize {
        self.notificaciones.iter().filter(|n| !n.leida).count()
    }

    pub(crate) fn apply(&mut self, msg: AdminServerMessage) {
        match msg {
            AdminServerMessage::EstadoMesas(payload) => {
                self.mesas = payload.mesas;
            }
            AdminServerMessage::NotificacionesInicial(payload) => {
                self.notificaciones = payload.notificaciones;
                self.notificaciones.truncate(MAX_NOTIFICATIONS);
            }
            AdminServerMessage::Notificacion(notification) => {
                self.push_notification(notification);
            }
            AdminServerMessage::SubtotalesActualizados(update) => {
                self.subtotales.insert(update.pedido_id, update);
            }
            AdminServerMessage::Pong | AdminServerMessage::Unknown => {}
        }
    }

    /// Prepend a notification unless its id is already present; the list
    /// never exceeds [`MAX_NOTIFICATIONS`].
    fn push_notification(&mut self, notification: Notification) {
        if self.notificaciones.iter().any(|n| n.id == notification.id) {
            return;
        }
        self.notificaciones.insert(0, notification);
        self.notificaciones.truncate(MAX_NOTIFICATIONS);
    }

    pub(crate) fn mark_read(&mut self, id: &str) {
        if let Some(n) = self.notificaciones.iter_mut().find(|n| n.id == id) {
            n.leida = true;
        }
    }

    pub(crate) fn mark_all_read(&mut self) {
        for n in &mut self.notificaciones {
            n.leida = true;
        }
    }

    pub(crate) fn remove_notification(&mut self, id: &str) {
        self.notificaciones.retain(|n| n.id != id);
    }

    pub(crate) fn clear_notifications(&mut self) {
        self.notificaciones.clear();
    }
}

/// Handle to the admin realtime session.
///
/// Created when an auth token becomes available; dropping the handle (or
/// calling [`shutdown`](Self::shutdown)) tears the session down: pending
/// reconnects are cancelled and late socket events are ignored.
///
/// Notification operations are optimistic: local state changes first, the
/// REST confirmation runs in the background and failures are logged but
/// never rolled back; the next full snapshot reconciles.
pub struct AdminRealtime {
    state: Arc<watch::Sender<AdminSnapshot>>,
    status: watch::Receiver<ConnectionStatus>,
    outbound: UnboundedSender<ClientMessage>,
    shutdown: watch::Sender<bool>,
    lifecycle: Arc<Mutex<SessionLifecycle>>,
    api: ApiClient,
    token: String,
}

impl AdminRealtime {
    /// Open the admin session for `token`. Must be called within a tokio
    /// runtime; the connection is driven by a background task.
    pub fn connect(config: &ClientConfig, token: impl Into<String>) -> Self {
        let token = token.into();
        storage::run_startup_migrations();

        let url = format!(
            "{}/ws/admin?token={}",
            config.ws_base.trim_end_matches('/'),
            urlencoding::encode(&token)
        );

        let (state_tx, _) = watch::channel(AdminSnapshot::default());
        let state = Arc::new(state_tx);
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::default());
        let status = Arc::new(status_tx);
        let (outbound_tx, outbound_rx) = unbounded();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let lifecycle = Arc::new(Mutex::new(SessionLifecycle::new()));

        let route_state = state.clone();
        let on_frame = Box::new(move |text: &str| {
            match serde_json::from_str::<AdminServerMessage>(text) {
                Ok(msg) => route_state.send_modify(|snapshot| snapshot.apply(msg)),
                Err(err) => warn!(error = %err, "mensaje de admin inválido, descartado"),
            }
        });

        connection::spawn(SessionDriver {
            url,
            config: SessionConfig {
                reconnect_delay: RECONNECT_DELAY,
                heartbeat_interval: HEARTBEAT_INTERVAL,
            },
            greeting: None,
            lifecycle: lifecycle.clone(),
            status: status.clone(),
            outbound: outbound_rx,
            shutdown: shutdown_rx,
            on_frame,
        });

        Self {
            state,
            status: status_rx,
            outbound: outbound_tx,
            shutdown: shutdown_tx,
            lifecycle,
            api: ApiClient::new(config.api_base.clone()),
            token,
        }
    }

    pub fn snapshot(&self) -> AdminSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AdminSnapshot> {
        self.state.subscribe()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.status.borrow().is_connected()
    }

    pub fn unread_count(&self) -> usize {
        self.state.borrow().unread_count()
    }

    /// Ask the server for a fresh table snapshot. Sent only while
    /// connected; there is no REST fallback at this layer.
    pub fn refresh(&self) {
        if self.is_connected() {
            let _ = self.outbound.unbounded_send(ClientMessage::RefreshMesas);
        }
    }

    pub fn mark_as_read(&self, id: &str) {
        self.state.send_modify(|s| s.mark_read(id));
        let api = self.api.clone();
        let token = self.token.clone();
        let id = id.to_owned();
        tokio::spawn(async move {
            if let Err(err) = api.marcar_notificacion_leida(&token, &id).await {
                warn!(notificacion = %id, error = %err, "no se pudo confirmar la lectura");
            }
        });
    }

    pub fn mark_all_as_read(&self) {
        self.state.send_modify(|s| s.mark_all_read());
        let api = self.api.clone();
        let token = self.token.clone();
        tokio::spawn(async move {
            if let Err(err) = api.marcar_notificaciones_leidas(&token).await {
                warn!(error = %err, "no se pudo confirmar la lectura masiva");
            }
        });
    }

    pub fn delete_notification(&self, id: &str) {
        self.state.send_modify(|s| s.remove_notification(id));
        let api = self.api.clone();
        let token = self.token.clone();
        let id = id.to_owned();
        tokio::spawn(async move {
            if let Err(err) = api.eliminar_notificacion(&token, &id).await {
                warn!(notificacion = %id, error = %err, "no se pudo confirmar el borrado");
            }
        });
    }

    pub fn clear_notifications(&self) {
        self.state.send_modify(|s| s.clear_notifications());
        let api = self.api.clone();
        let token = self.token.clone();
        tokio::spawn(async move {
            if let Err(err) = api.eliminar_notificaciones(&token).await {
                warn!(error = %err, "no se pudo confirmar el borrado masivo");
            }
        });
    }

    /// Tear the session down: the identity is invalidated first so that
    /// any event already in flight is ignored, then the driver closes the
    /// socket with code 1000.
    pub fn shutdown(&self) {
        lock(&self.lifecycle).invalidate();
        let _ = self.shutdown.send(true);
    }

    #[cfg(test)]
    pub(crate) fn inject(&self, msg: AdminServerMessage) {
        self.state.send_modify(|snapshot| snapshot.apply(msg));
    }
}

impl Drop for AdminRealtime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
