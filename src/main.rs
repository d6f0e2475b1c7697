use dotenvy::dotenv;
use tracing::info;

use classrota::logging::init_tracing;
use classrota::metrics::{init_metrics, metrics_app};
use classrota::router::init_router;
use classrota::state::init_app_state;
use classrota_config::server::ServerConfig;

#[tokio::main]
async fn main() {
    dotenv().ok();

    init_tracing();

    let server_config = ServerConfig::from_env();
    let state = init_app_state().await;

    sqlx::migrate!("./migrations")
        .run(&state.db)
        .await
        .expect("Failed to run database migrations");

    // Metrics exporter on its own listener
    if let Some(handle) = init_metrics() {
        let metrics_addr = server_config.metrics_addr.clone();
        tokio::spawn(async move {
            let listener = tokio::net::TcpListener::bind(&metrics_addr)
                .await
                .expect("Failed to bind metrics listener");
            info!(addr = %metrics_addr, "metrics listener started");
            axum::serve(listener, metrics_app(handle))
                .await
                .expect("Metrics server failed");
        });
    }

    let app = init_router(state);

    let listener = tokio::net::TcpListener::bind(&server_config.bind_addr)
        .await
        .expect("Failed to bind API listener");
    info!(addr = %server_config.bind_addr, "server started");
    axum::serve(listener, app).await.expect("Server failed");
}
