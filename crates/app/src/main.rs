//! Venue - booking service for football fields and an event hall
//!
//! Serves the booking desk over TCP until interrupted.
//!
//! Usage: `venue [CONFIG]` (or set `VENUE_CONFIG`)

use std::path::PathBuf;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use venue_net::{Server, ServerOptions};

mod state;

/// Time given to sessions to flush `ServerShutdown` before exit
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Venue");

    let config_arg = std::env::args_os().nth(1).map(PathBuf::from);
    let app_state = match state::AppState::new(config_arg) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(serve(app_state)) {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn serve(app_state: state::AppState) -> venue_net::Result<()> {
    let desk = app_state.open_desk()?;
    let addr = app_state.bind_addr()?;

    let server = Server::start(addr, desk, ServerOptions::new(app_state.admin_token())).await?;
    tracing::info!(
        addr = %server.addr(),
        config = %app_state.config_path().display(),
        "Accepting bookings"
    );

    tokio::signal::ctrl_c().await?;

    tracing::info!("Interrupted, shutting down");
    server.shutdown();
    tokio::time::sleep(SHUTDOWN_GRACE).await;
    Ok(())
}
