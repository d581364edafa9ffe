//! Session monitor: connects the admin realtime session and logs state
//! transitions until interrupted. Useful for checking a deployment's
//! realtime behavior without the dashboard.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use comandero_client::{AdminRealtime, ClientConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("comandero_client=info")),
        )
        .init();

    let config = ClientConfig::from_env();
    let token = std::env::var("COMANDERO_TOKEN")
        .context("COMANDERO_TOKEN no está definido; iniciá sesión y exportá el token")?;

    info!(ws = %config.ws_base, api = %config.api_base, "conectando sesión de admin");
    let admin = AdminRealtime::connect(&config, token);

    let mut estado = admin.subscribe();
    let mut conexion = admin.watch_status();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = conexion.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = conexion.borrow_and_update().clone();
                info!(estado = ?status.state, error = ?status.error, "conexión");
            }
            changed = estado.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = estado.borrow_and_update().clone();
                info!(
                    mesas = snapshot.mesas.len(),
                    notificaciones = snapshot.notificaciones.len(),
                    no_leidas = snapshot.unread_count(),
                    "estado actualizado"
                );
            }
        }
    }

    admin.shutdown();
    Ok(())
}
