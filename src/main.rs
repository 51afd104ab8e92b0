use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use wms_api::{build_router, config, db, events, handlers, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config()?;
    config::init_tracing(cfg.log_level(), cfg.log_json);
    handlers::health::init_start_time();

    info!(
        environment = %cfg.environment,
        "Starting wms-api {}",
        env!("CARGO_PKG_VERSION")
    );

    let db_pool = db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        db::run_migrations(&db_pool).await?;
    } else {
        warn!("auto_migrate disabled; assuming schema is current");
    }
    let db_arc = Arc::new(db_pool);

    let (event_sender, event_rx) = events::EventSender::channel(cfg.event_channel_capacity);
    tokio::spawn(events::process_events(event_rx));

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port).parse()?;
    let state = AppState::new(db_arc, cfg, event_sender);
    let app = build_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!("wms-api listening on {}", addr);
    info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
