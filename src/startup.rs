//! Application startup and server initialization.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ConfigV1;
use crate::metrics::DogStatsdClient;
use crate::routes;
use crate::state::AppState;

/// Connects the DogStatsD client and serves the demo routes.
///
/// # Errors
///
/// Returns an error if the collector host cannot be resolved, the server
/// fails to bind to the configured address, or serving fails.
pub async fn run(config: Arc<ConfigV1>) -> Result<(), Box<dyn std::error::Error>> {
    let client = DogStatsdClient::from_config(&config.dogstatsd)?;
    if !config.dogstatsd.enabled {
        info!("DogStatsD emission disabled, requests are tagged only");
    }

    let state = AppState::new(config.clone(), Arc::new(client));
    let app = routes::create_router(state);

    info!("Starting server on {}", config.bind_address);
    let listener = TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
