use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vad_service::{routes, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vad_service=info,tower_http=info")),
        )
        .init();

    let (config, loaded_path) = Config::discover()?;
    match &loaded_path {
        Some(path) => info!("Loaded configuration from: {}", path),
        None => info!("No config file found, using built-in defaults"),
    }
    config.validate()?;

    let app_state = AppState::new(config.clone())?;
    let app = routes::create_app(app_state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Starting {} on {}", config.server.service_name, addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
