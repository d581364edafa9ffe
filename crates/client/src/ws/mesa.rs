//! Table observer session: watches one table's live state over
//! `/ws/{qr_token}` as if it were a customer client, while keeping the
//! observer itself out of the customer-facing roster.

use std::sync::{Arc, Mutex};

use futures_channel::mpsc::{unbounded, UnboundedSender};
use tokio::sync::watch;
use tracing::warn;
use uuid::Uuid;

use comandero_shared::{
    ClienteConectado, ClientMessage, EstadoInicialPayload, EstadoPedido, ItemPedido,
    MesaServerMessage, Pedido, PedidoUpdatePayload, SessionError,
};

use crate::config::ClientConfig;
use crate::ws::connection::{
    self, lock, ConnectionStatus, SessionConfig, SessionDriver, SessionLifecycle,
    HEARTBEAT_INTERVAL,
};

const RECONNECT_DELAY: std::time::Duration = std::time::Duration::from_secs(5);

/// Live state of one table. `None` until the first `ESTADO_INICIAL`
/// snapshot arrives.
#[derive(Debug, Clone, PartialEq)]
pub struct MesaState {
    pub mesa_id: i64,
    pub pedido_id: Option<i64>,
    /// Connected customers, already filtered of observer connections.
    pub clientes: Vec<ClienteConectado>,
    pub items: Vec<ItemPedido>,
    pub total: String,
    pub estado: EstadoPedido,
    pub pedido: Option<Pedido>,
}

impl MesaState {
    fn from_inicial(payload: EstadoInicialPayload) -> Self {
        let total = payload
            .total
            .or_else(|| payload.pedido.as_ref().map(|p| p.total.clone()))
            .unwrap_or_else(|| "0.00".to_string());
        let estado = payload
            .estado
            .or_else(|| payload.pedido.as_ref().map(|p| p.estado))
            .unwrap_or_default();
        Self {
            mesa_id: payload.mesa_id,
            pedido_id: payload.pedido_id,
            clientes: filtrar_observadores(payload.clientes),
            items: payload.items,
            total,
            estado,
            pedido: payload.pedido,
        }
    }

    /// Merge a partial update; absent fields keep their prior values.
    /// `forzar` overrides the state regardless of the payload.
    fn merge(&mut self, payload: PedidoUpdatePayload, forzar: Option<EstadoPedido>) {
        if let Some(items) = payload.items {
            self.items = items;
        }
        if let Some(total) = payload.total {
            self.total = total;
        }
        if let Some(estado) = payload.estado {
            self.estado = estado;
        }
        if let Some(pedido) = payload.pedido {
            self.pedido = Some(pedido);
        }
        if let Some(estado) = forzar {
            self.estado = estado;
        }
    }
}

fn es_observador(cliente: &ClienteConectado) -> bool {
    cliente.id.starts_with("admin-")
        || cliente.nombre.contains("Admin")
        || cliente.nombre.contains("Observer")
}

/// Drop the admin's own observer connections from the customer roster.
pub(crate) fn filtrar_observadores(clientes: Vec<ClienteConectado>) -> Vec<ClienteConectado> {
    clientes.into_iter().filter(|c| !es_observador(c)).collect()
}

/// Apply one inbound message. Returns a server-reported error message
/// when the frame was an `ERROR`; data state is untouched in that case.
pub(crate) fn aplicar(state: &mut Option<MesaState>, msg: MesaServerMessage) -> Option<String> {
    match msg {
        MesaServerMessage::EstadoInicial(payload) => {
            *state = Some(MesaState::from_inicial(payload));
        }
        MesaServerMessage::ClienteUnido(payload) | MesaServerMessage::ClienteDesconectado(payload) => {
            if let (Some(state), Some(clientes)) = (state.as_mut(), payload.clientes) {
                state.clientes = filtrar_observadores(clientes);
            }
        }
        MesaServerMessage::PedidoActualizado(payload) => {
            if let Some(state) = state.as_mut() {
                state.merge(payload, None);
            }
        }
        MesaServerMessage::PedidoConfirmado(payload) => {
            if let Some(state) = state.as_mut() {
                state.merge(payload, Some(EstadoPedido::Preparing));
            }
        }
        MesaServerMessage::PedidoCerrado(payload) => {
            if let Some(state) = state.as_mut() {
                state.merge(payload, Some(EstadoPedido::Closed));
            }
        }
        MesaServerMessage::Error { message } => return Some(message),
        MesaServerMessage::Unknown => {}
    }
    None
}

/// Handle to one table's observer session.
///
/// At most one observer session may be live per consumer: to watch a
/// different table, call [`disconnect`](Self::disconnect) (or drop the
/// handle) before connecting the next one.
pub struct MesaObserver {
    state: Arc<watch::Sender<Option<MesaState>>>,
    status: watch::Receiver<ConnectionStatus>,
    outbound: UnboundedSender<ClientMessage>,
    shutdown: watch::Sender<bool>,
    lifecycle: Arc<Mutex<SessionLifecycle>>,
}

impl MesaObserver {
    /// Open an observer session for the table identified by `qr_token`.
    /// Must be called within a tokio runtime.
    pub fn connect(config: &ClientConfig, qr_token: &str) -> Self {
        let url = format!(
            "{}/ws/{}",
            config.ws_base.trim_end_matches('/'),
            urlencoding::encode(qr_token)
        );

        let (state_tx, _) = watch::channel(None::<MesaState>);
        let state = Arc::new(state_tx);
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::default());
        let status = Arc::new(status_tx);
        let (outbound_tx, outbound_rx) = unbounded();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let lifecycle = Arc::new(Mutex::new(SessionLifecycle::new()));

        // Announce ourselves as a connected client; the roster filter on
        // the receiving side hides this id from customers.
        let greeting = ClientMessage::ClienteConectado {
            cliente_id: format!("admin-observer-{}", Uuid::new_v4()),
            nombre: "Admin Observer".to_string(),
        };

        let route_state = state.clone();
        let route_status = status.clone();
        let on_frame = Box::new(move |text: &str| {
            match serde_json::from_str::<MesaServerMessage>(text) {
                Ok(msg) => {
                    let mut server_error = None;
                    route_state.send_modify(|state| server_error = aplicar(state, msg));
                    if let Some(message) = server_error {
                        warn!(%message, "error reportado por el servidor");
                        route_status
                            .send_modify(|s| s.error = Some(SessionError::Server(message)));
                    }
                }
                Err(err) => warn!(error = %err, "mensaje de mesa inválido, descartado"),
            }
        });

        connection::spawn(SessionDriver {
            url,
            config: SessionConfig {
                reconnect_delay: RECONNECT_DELAY,
                heartbeat_interval: HEARTBEAT_INTERVAL,
            },
            greeting: Some(greeting),
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
        }
    }

    pub fn state(&self) -> Option<MesaState> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<MesaState>> {
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

    /// Forward a frame to the table channel.
    pub fn send_message(&self, msg: ClientMessage) {
        let _ = self.outbound.unbounded_send(msg);
    }

    /// Tear the session down and clear the exposed state. The identity is
    /// invalidated before the socket closes, so late events are inert.
    pub fn disconnect(&self) {
        lock(&self.lifecycle).invalidate();
        let _ = self.shutdown.send(true);
        self.state.send_replace(None);
    }
}

impl Drop for MesaObserver {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comandero_shared::ClientesPayload;

    fn estado_inicial() -> MesaServerMessage {
        serde_json::from_value(serde_json::json!({
            "type": "ESTADO_INICIAL",
            "payload": {
                "mesaId": 3,
                "pedidoId": 7,
                "clientes": [
                    {"id": "admin-observer-1", "nombre": "Admin"},
                    {"id": "c1", "nombre": "Juan"}
                ],
                "items": [],
                "total": "12.00",
                "estado": "pending"
            }
        }))
        .unwrap()
    }

    #[test]
    fn roster_filter_drops_observer_connections() {
        let clientes = vec![
            ClienteConectado { id: "admin-observer-1".into(), nombre: "Admin".into() },
            ClienteConectado { id: "c1".into(), nombre: "Juan".into() },
            ClienteConectado { id: "c2".into(), nombre: "Mesa Observer".into() },
        ];
        let filtrados = filtrar_observadores(clientes);
        assert_eq!(filtrados.len(), 1);
        assert_eq!(filtrados[0].id, "c1");
        assert_eq!(filtrados[0].nombre, "Juan");
    }

    #[test]
    fn initial_snapshot_builds_state_with_fallbacks() {
        let mut state = None;
        assert_eq!(aplicar(&mut state, estado_inicial()), None);
        let state = state.unwrap();
        assert_eq!(state.mesa_id, 3);
        assert_eq!(state.pedido_id, Some(7));
        assert_eq!(state.total, "12.00");
        assert_eq!(state.estado, EstadoPedido::Pending);
        assert_eq!(state.clientes.len(), 1);

        // Missing total/estado fall back to the embedded order, then to
        // the defaults.
        let mut state = None;
        let msg: MesaServerMessage = serde_json::from_value(serde_json::json!({
            "type": "ESTADO_INICIAL",
            "payload": {
                "mesaId": 4,
                "pedido": {
                    "id": 9,
                    "estado": "preparing",
                    "total": "33.50",
                    "createdAt": "2025-05-01T12:00:00Z"
                }
            }
        }))
        .unwrap();
        aplicar(&mut state, msg);
        let state = state.unwrap();
        assert_eq!(state.total, "33.50");
        assert_eq!(state.estado, EstadoPedido::Preparing);

        let mut state = None;
        let msg: MesaServerMessage = serde_json::from_value(serde_json::json!({
            "type": "ESTADO_INICIAL",
            "payload": {"mesaId": 5}
        }))
        .unwrap();
        aplicar(&mut state, msg);
        let state = state.unwrap();
        assert_eq!(state.total, "0.00");
        assert_eq!(state.estado, EstadoPedido::Pending);
    }

    #[test]
    fn partial_update_preserves_absent_fields() {
        let mut state = None;
        aplicar(&mut state, estado_inicial());

        let msg: MesaServerMessage = serde_json::from_value(serde_json::json!({
            "type": "PEDIDO_ACTUALIZADO",
            "payload": {
                "items": [{
                    "id": 1, "productoId": 10, "clienteNombre": "Juan",
                    "cantidad": 2.0, "precioUnitario": "5.00"
                }]
            }
        }))
        .unwrap();
        aplicar(&mut state, msg);

        let state = state.as_ref().unwrap();
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.total, "12.00");
        assert_eq!(state.estado, EstadoPedido::Pending);
    }

    #[test]
    fn confirmado_forces_preparing_even_against_the_payload() {
        let mut state = None;
        aplicar(&mut state, estado_inicial());

        let msg: MesaServerMessage = serde_json::from_value(serde_json::json!({
            "type": "PEDIDO_CONFIRMADO",
            "payload": {"estado": "delivered"}
        }))
        .unwrap();
        aplicar(&mut state, msg);
        assert_eq!(state.as_ref().unwrap().estado, EstadoPedido::Preparing);
    }

    #[test]
    fn cerrado_forces_closed() {
        let mut state = None;
        aplicar(&mut state, estado_inicial());
        aplicar(
            &mut state,
            MesaServerMessage::PedidoCerrado(PedidoUpdatePayload::default()),
        );
        assert_eq!(state.as_ref().unwrap().estado, EstadoPedido::Closed);
    }

    #[test]
    fn client_updates_are_noops_before_the_first_snapshot() {
        let mut state = None;
        aplicar(
            &mut state,
            MesaServerMessage::ClienteUnido(ClientesPayload {
                clientes: Some(vec![ClienteConectado { id: "c1".into(), nombre: "Juan".into() }]),
            }),
        );
        assert!(state.is_none());
    }

    #[test]
    fn client_update_without_list_keeps_the_roster() {
        let mut state = None;
        aplicar(&mut state, estado_inicial());
        aplicar(
            &mut state,
            MesaServerMessage::ClienteDesconectado(ClientesPayload { clientes: None }),
        );
        assert_eq!(state.as_ref().unwrap().clientes.len(), 1);
    }

    #[test]
    fn server_error_is_surfaced_without_touching_state() {
        let mut state = None;
        aplicar(&mut state, estado_inicial());
        let before = state.clone();
        let error = aplicar(
            &mut state,
            MesaServerMessage::Error { message: "mesa cerrada".into() },
        );
        assert_eq!(error.as_deref(), Some("mesa cerrada"));
        assert_eq!(state, before);
    }
}
