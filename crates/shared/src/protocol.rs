//! WebSocket message protocol.
//!
//! Frames are JSON objects of the form `{"type": "...", "payload": {...}}`,
//! modeled as adjacently tagged enums. Unknown inbound types map to the
//! `Unknown` variant so new server pushes never break older clients.

use serde::{Deserialize, Serialize};

use crate::models::{
    ClienteConectado, EstadoPedido, ItemPedido, MesaConPedido, Notification, Pedido,
    SubtotalesUpdate,
};

/// Normal closure; never followed by a reconnect.
pub const CLOSE_NORMAL: u16 = 1000;
/// Policy violation; the backend uses it for invalid/expired tokens.
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;

// --- Outbound ---

/// Frames a client may send on either session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    #[serde(rename = "PING")]
    Ping,
    #[serde(rename = "REFRESH_MESAS")]
    RefreshMesas,
    #[serde(rename = "CLIENTE_CONECTADO")]
    #[serde(rename_all = "camelCase")]
    ClienteConectado { cliente_id: String, nombre: String },
}

// --- Inbound: admin session ---

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstadoMesasPayload {
    #[serde(default)]
    pub mesas: Vec<MesaConPedido>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificacionesInicialPayload {
    #[serde(default)]
    pub notificaciones: Vec<Notification>,
}

/// Pushes received over `/ws/admin`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum AdminServerMessage {
    /// Full replacement of the table list.
    #[serde(rename = "ADMIN_ESTADO_MESAS")]
    EstadoMesas(EstadoMesasPayload),
    /// Bulk notification snapshot sent right after connecting.
    #[serde(rename = "ADMIN_NOTIFICACIONES_INICIAL")]
    NotificacionesInicial(NotificacionesInicialPayload),
    /// One incremental notification.
    #[serde(rename = "ADMIN_NOTIFICACION")]
    Notificacion(Notification),
    /// Split-payment snapshot for one order.
    #[serde(rename = "ADMIN_SUBTOTALES_ACTUALIZADOS")]
    SubtotalesActualizados(SubtotalesUpdate),
    /// Heartbeat response; a no-op on receipt.
    #[serde(rename = "PONG")]
    Pong,
    #[serde(other)]
    Unknown,
}

// --- Inbound: table observer session ---

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstadoInicialPayload {
    pub mesa_id: i64,
    #[serde(default)]
    pub pedido_id: Option<i64>,
    #[serde(default)]
    pub clientes: Vec<ClienteConectado>,
    #[serde(default)]
    pub items: Vec<ItemPedido>,
    #[serde(default)]
    pub total: Option<String>,
    #[serde(default)]
    pub estado: Option<EstadoPedido>,
    #[serde(default)]
    pub pedido: Option<Pedido>,
}

/// Partial-update payload: absent fields keep their prior values.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PedidoUpdatePayload {
    #[serde(default)]
    pub items: Option<Vec<ItemPedido>>,
    #[serde(default)]
    pub total: Option<String>,
    #[serde(default)]
    pub estado: Option<EstadoPedido>,
    #[serde(default)]
    pub pedido: Option<Pedido>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientesPayload {
    #[serde(default)]
    pub clientes: Option<Vec<ClienteConectado>>,
}

/// Pushes received over `/ws/{qr_token}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum MesaServerMessage {
    #[serde(rename = "ESTADO_INICIAL")]
    EstadoInicial(EstadoInicialPayload),
    #[serde(rename = "CLIENTE_UNIDO")]
    ClienteUnido(ClientesPayload),
    #[serde(rename = "CLIENTE_DESCONECTADO")]
    ClienteDesconectado(ClientesPayload),
    #[serde(rename = "PEDIDO_ACTUALIZADO")]
    PedidoActualizado(PedidoUpdatePayload),
    /// Same merge as `PEDIDO_ACTUALIZADO`, but the state becomes
    /// `preparing` regardless of the payload.
    #[serde(rename = "PEDIDO_CONFIRMADO")]
    PedidoConfirmado(PedidoUpdatePayload),
    /// Same merge, forcing `closed`.
    #[serde(rename = "PEDIDO_CERRADO")]
    PedidoCerrado(PedidoUpdatePayload),
    #[serde(rename = "ERROR")]
    Error { message: String },
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_serialize_with_type_tag() {
        let ping = serde_json::to_value(&ClientMessage::Ping).unwrap();
        assert_eq!(ping, serde_json::json!({"type": "PING"}));

        let conectado = serde_json::to_value(&ClientMessage::ClienteConectado {
            cliente_id: "admin-observer-1".into(),
            nombre: "Admin Observer".into(),
        })
        .unwrap();
        assert_eq!(
            conectado,
            serde_json::json!({
                "type": "CLIENTE_CONECTADO",
                "payload": {"clienteId": "admin-observer-1", "nombre": "Admin Observer"}
            })
        );
    }

    #[test]
    fn unknown_admin_type_is_tolerated() {
        let msg: AdminServerMessage =
            serde_json::from_str(r#"{"type":"ADMIN_ALGO_NUEVO","payload":{"x":1}}"#).unwrap();
        assert_eq!(msg, AdminServerMessage::Unknown);
    }

    #[test]
    fn pong_has_no_payload() {
        let msg: AdminServerMessage = serde_json::from_str(r#"{"type":"PONG"}"#).unwrap();
        assert_eq!(msg, AdminServerMessage::Pong);
    }

    #[test]
    fn notification_without_timestamp_gets_one() {
        let msg: AdminServerMessage = serde_json::from_str(
            r#"{"type":"ADMIN_NOTIFICACION","payload":{
                "id":"n1","tipo":"NUEVO_PEDIDO","mesaId":3,"mensaje":"Nuevo pedido en Mesa 3"
            }}"#,
        )
        .unwrap();
        match msg {
            AdminServerMessage::Notificacion(n) => {
                assert_eq!(n.id, "n1");
                assert!(!n.leida);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn partial_pedido_update_leaves_missing_fields_none() {
        let msg: MesaServerMessage = serde_json::from_str(
            r#"{"type":"PEDIDO_ACTUALIZADO","payload":{"total":"120.50"}}"#,
        )
        .unwrap();
        match msg {
            MesaServerMessage::PedidoActualizado(p) => {
                assert_eq!(p.total.as_deref(), Some("120.50"));
                assert!(p.items.is_none());
                assert!(p.estado.is_none());
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
