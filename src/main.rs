use std::{net::SocketAddr, sync::Arc, time::Duration};

use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

use paygate_api as api;
use paygate_api::processor::http::HttpProcessorClient;
use paygate_api::store::sql::SqlOrderStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    let db = api::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db = Arc::new(db);

    let store = Arc::new(SqlOrderStore::new(db.clone()));
    let processor = Arc::new(HttpProcessorClient::new(&cfg.processor)?);

    let (event_sender, event_rx) = api::events::EventSender::channel(1024);
    tokio::spawn(api::events::process_events(event_rx));

    let state = api::AppState::new(store, processor, Arc::new(cfg.clone()), event_sender);

    let app = api::app_router(&cfg.artifact_dir)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(axum::middleware::from_fn(
            api::request_id::request_id_middleware,
        ))
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port).parse()?;
    info!(
        "paygate-api listening on {} ({} mode)",
        addr,
        if cfg.processor.live_mode {
            "live"
        } else {
            "sandbox"
        }
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
