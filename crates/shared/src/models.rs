//! Wire data models shared by the realtime sessions and the REST client.
//!
//! Field names serialize to the backend's Spanish camelCase JSON keys
//! (`mesaId`, `qrToken`, ...). Timestamps are ISO-8601.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Notifications ---

/// Server-emitted notification kinds shown to restaurant staff.
/// Connect/disconnect chatter is intentionally not part of this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    NuevoPedido,
    PedidoConfirmado,
    PedidoCerrado,
    LlamadaMozo,
    PagoRecibido,
    ProductoAgregado,
}

/// A durable, server-originated event record.
///
/// `id` is stable across reconnects and is the deduplication key. `leida`
/// is the only field mutated locally (optimistically, before the REST
/// confirmation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub tipo: NotificationType,
    pub mesa_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesa_nombre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pedido_id: Option<i64>,
    pub mensaje: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detalles: Option<String>,
    /// Missing timestamps are normalized to the time of receipt.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub leida: bool,
}

// --- Orders ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EstadoPedido {
    #[default]
    Pending,
    Preparing,
    Delivered,
    Closed,
}

/// Current order summary as embedded in table snapshots and pushes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pedido {
    pub id: i64,
    #[serde(default)]
    pub estado: EstadoPedido,
    /// Monetary amounts travel as decimal strings ("25.00").
    pub total: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
}

/// One order line. `cantidad` is fractional to support weighed items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPedido {
    pub id: i64,
    pub producto_id: i64,
    pub cliente_nombre: String,
    pub cantidad: f64,
    pub precio_unitario: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nombre_producto: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imagen_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingredientes_excluidos: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingredientes_excluidos_nombres: Vec<String>,
    /// Set on items added after the kitchen already confirmed the order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_confirmacion: Option<bool>,
}

// --- Tables ---

/// A connected customer session at a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClienteConectado {
    pub id: String,
    pub nombre: String,
}

/// A physical table as listed by `GET /mesa/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mesa {
    pub id: i64,
    pub nombre: String,
    pub qr_token: String,
}

/// One table plus its live order context, as pushed over the admin
/// session. Wholesale-replaced on each full snapshot push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MesaConPedido {
    pub id: i64,
    pub nombre: String,
    pub qr_token: String,
    #[serde(default)]
    pub pedido: Option<Pedido>,
    #[serde(default)]
    pub items: Vec<ItemPedido>,
    #[serde(default)]
    pub clientes_conectados: Vec<ClienteConectado>,
    #[serde(default)]
    pub total_items: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todos_pagaron: Option<bool>,
}

// --- Split payments ---

/// Per-customer share of a split payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClienteSubtotal {
    pub cliente_nombre: String,
    pub monto: String,
    /// "paid", "pending_cash", ...
    pub estado: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metodo: Option<String>,
}

/// Split-payment snapshot for one order. Each push fully replaces the
/// entry keyed by `pedido_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtotalesUpdate {
    pub pedido_id: i64,
    pub mesa_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesa_nombre: Option<String>,
    #[serde(default)]
    pub clientes_pagados: Vec<String>,
    #[serde(default)]
    pub todos_subtotales: Vec<ClienteSubtotal>,
}

// --- Products / profile (REST collaborator shapes) ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Producto {
    pub id: i64,
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    pub precio: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imagen_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestauranteProfile {
    pub nombre: String,
    #[serde(default)]
    pub direccion: Option<String>,
    #[serde(default)]
    pub telefono: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imagen_url: Option<String>,
    #[serde(default)]
    pub profile_completo: bool,
}

// --- REST envelopes ---

/// The backend's minimal response envelope. Every endpoint returns at
/// least `success`; failures carry `error` and/or `message`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStatus {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MesasResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub mesas: Vec<Mesa>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductosResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub productos: Vec<Producto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PedidoResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub pedido: Option<Pedido>,
    #[serde(default)]
    pub items: Vec<ItemPedido>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PedidosResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub pedidos: Vec<Pedido>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub restaurante: Option<RestauranteProfile>,
}

// --- REST request bodies ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub nombre: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductoInput {
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    pub precio: f64,
    /// Base64-encoded image, when uploading a new one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductoUpdate {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nombre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPedidoInput {
    pub producto_id: i64,
    pub cliente_nombre: String,
    pub cantidad: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingredientes_excluidos: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInput {
    pub nombre: String,
    pub direccion: String,
    pub telefono: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imagen_url: Option<String>,
}
