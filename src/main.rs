use habit_tracker::config::Settings;
use habit_tracker::storage::{load_sheets_config, load_tracker};
use habit_tracker::sync::{connect, spawn_background_sync};
use habit_tracker::tracker::date_labels;
use habit_tracker::{router, AppState};
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let settings = Settings::from_env();
    let tracker = load_tracker(&settings.data_path, date_labels(settings.start, settings.end)).await;
    let sheets_config = load_sheets_config(&settings.config_path).await;
    let port = settings.port;
    let state = AppState::new(settings, tracker);

    match sheets_config.spreadsheet_id {
        Some(spreadsheet_id) => {
            if let Err(err) = connect(&state, &spreadsheet_id).await {
                warn!("spreadsheet not connected, using local storage only: {err}");
                state.sheets.write().await.spreadsheet_id = Some(spreadsheet_id);
            }
        }
        None => info!("no spreadsheet configured; POST /api/config to connect one"),
    }
    let _sync = spawn_background_sync(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
