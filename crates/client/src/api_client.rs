//! HTTP client for the backend REST API.
//!
//! Every endpoint answers a JSON envelope carrying at least `success`;
//! non-2xx responses carry `error`/`message` fields which become the
//! [`ApiError::Http`] message. A 401 means the bearer token expired; the
//! outer layer decides whether to force a re-login.

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use comandero_shared::{
    try_error_detail, ApiError, ApiStatus, EstadoPedido, ItemPedidoInput, LoginRequest,
    LoginResponse, MesasResponse, PedidoResponse, PedidosResponse, ProductoInput, ProductoUpdate,
    ProductosResponse, ProfileInput, ProfileResponse, RegisterRequest,
};

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let mut builder = self.client.request(method, self.url(path));
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(format!("no se pudo leer el cuerpo: {e}")))?;

        if !status.is_success() {
            let mensaje = try_error_detail(&body)
                .unwrap_or_else(|| "error en la solicitud".to_string());
            return Err(ApiError::Http {
                status: status.as_u16(),
                mensaje,
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Deserialize(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T, ApiError> {
        self.send(self.request(Method::GET, path, Some(token))).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(self.request(Method::POST, path, token).json(body))
            .await
    }

    async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(self.request(Method::PUT, path, Some(token)).json(body))
            .await
    }

    async fn put_empty<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T, ApiError> {
        self.send(self.request(Method::PUT, path, Some(token))).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T, ApiError> {
        self.send(self.request(Method::POST, path, Some(token))).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T, ApiError> {
        self.send(self.request(Method::DELETE, path, Some(token)))
            .await
    }

    // --- auth ---

    pub async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, ApiError> {
        self.post("/auth/login-restaurante", None, req).await
    }

    pub async fn register(&self, req: &RegisterRequest) -> Result<LoginResponse, ApiError> {
        self.post("/auth/register-restaurante", None, req).await
    }

    // --- restaurante ---

    pub async fn profile(&self, token: &str) -> Result<ProfileResponse, ApiError> {
        self.get("/restaurante/profile", token).await
    }

    pub async fn update_profile(
        &self,
        token: &str,
        input: &ProfileInput,
    ) -> Result<ApiStatus, ApiError> {
        self.put("/restaurante/update-profile", token, input).await
    }

    pub async fn complete_profile(
        &self,
        token: &str,
        input: &ProfileInput,
    ) -> Result<ApiStatus, ApiError> {
        self.post("/restaurante/complete-profile", Some(token), input)
            .await
    }

    // --- productos ---

    pub async fn productos(&self, token: &str) -> Result<ProductosResponse, ApiError> {
        self.get("/producto", token).await
    }

    pub async fn crear_producto(
        &self,
        token: &str,
        input: &ProductoInput,
    ) -> Result<ApiStatus, ApiError> {
        self.post("/producto/create", Some(token), input).await
    }

    pub async fn actualizar_producto(
        &self,
        token: &str,
        input: &ProductoUpdate,
    ) -> Result<ApiStatus, ApiError> {
        self.put("/producto/update", token, input).await
    }

    pub async fn eliminar_producto(&self, token: &str, id: i64) -> Result<ApiStatus, ApiError> {
        self.delete(&format!("/producto/delete/{id}"), token).await
    }

    // --- mesas ---

    pub async fn mesas(&self, token: &str) -> Result<MesasResponse, ApiError> {
        self.get("/mesa/list", token).await
    }

    pub async fn crear_mesa(&self, token: &str, nombre: &str) -> Result<ApiStatus, ApiError> {
        self.post("/mesa/create", Some(token), &serde_json::json!({ "nombre": nombre }))
            .await
    }

    pub async fn eliminar_mesa(&self, token: &str, id: i64) -> Result<ApiStatus, ApiError> {
        self.delete(&format!("/mesa/delete/{id}"), token).await
    }

    /// Clear a table's current order and connected clients.
    pub async fn resetear_mesa(&self, token: &str, id: i64) -> Result<ApiStatus, ApiError> {
        self.post_empty(&format!("/mesa/reset/{id}"), token).await
    }

    // --- pedidos ---

    pub async fn pedido(&self, token: &str, id: i64) -> Result<PedidoResponse, ApiError> {
        self.get(&format!("/pedido/get/{id}"), token).await
    }

    pub async fn pedidos(&self, token: &str) -> Result<PedidosResponse, ApiError> {
        self.get("/pedido/list", token).await
    }

    pub async fn actualizar_estado_pedido(
        &self,
        token: &str,
        id: i64,
        estado: EstadoPedido,
    ) -> Result<ApiStatus, ApiError> {
        self.put(
            &format!("/pedido/update-estado/{id}"),
            token,
            &serde_json::json!({ "estado": estado }),
        )
        .await
    }

    pub async fn confirmar_pedido(&self, token: &str, id: i64) -> Result<ApiStatus, ApiError> {
        self.post_empty(&format!("/pedido/confirmar/{id}"), token).await
    }

    pub async fn cerrar_pedido(&self, token: &str, id: i64) -> Result<ApiStatus, ApiError> {
        self.post_empty(&format!("/pedido/cerrar/{id}"), token).await
    }

    pub async fn eliminar_pedido(&self, token: &str, id: i64) -> Result<ApiStatus, ApiError> {
        self.delete(&format!("/pedido/delete/{id}"), token).await
    }

    pub async fn agregar_item(
        &self,
        token: &str,
        pedido_id: i64,
        item: &ItemPedidoInput,
    ) -> Result<ApiStatus, ApiError> {
        self.post(&format!("/pedido/add-item/{pedido_id}"), Some(token), item)
            .await
    }

    pub async fn eliminar_item(&self, token: &str, item_id: i64) -> Result<ApiStatus, ApiError> {
        self.delete(&format!("/pedido/delete-item/{item_id}"), token)
            .await
    }

    // --- notificaciones ---

    pub async fn marcar_notificacion_leida(
        &self,
        token: &str,
        id: &str,
    ) -> Result<ApiStatus, ApiError> {
        self.put_empty(&format!("/notificacion/marcar-leida/{id}"), token)
            .await
    }

    pub async fn marcar_notificaciones_leidas(&self, token: &str) -> Result<ApiStatus, ApiError> {
        self.put_empty("/notificacion/marcar-todas-leidas", token).await
    }

    pub async fn eliminar_notificacion(&self, token: &str, id: &str) -> Result<ApiStatus, ApiError> {
        self.delete(&format!("/notificacion/delete/{id}"), token).await
    }

    pub async fn eliminar_notificaciones(&self, token: &str) -> Result<ApiStatus, ApiError> {
        self.delete("/notificacion/delete-all", token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path() {
        let api = ApiClient::new("http://localhost:3000/api/");
        assert_eq!(api.url("/mesa/list"), "http://localhost:3000/api/mesa/list");
        assert_eq!(api.url("mesa/list"), "http://localhost:3000/api/mesa/list");
    }

    #[tokio::test]
    async fn network_failure_maps_to_api_error() {
        let api = ApiClient::new("http://127.0.0.1:9/api");
        let err = api.mesas("token").await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
        assert_eq!(err.status(), None);
    }
}
