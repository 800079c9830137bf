use citybikes_api::{AppState, ServerConfig, create_app};
use citybikes_engine::CityBikesSource;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Command line arguments for the citybikes tile server
#[derive(Parser, Debug)]
#[command(name = "citybikes-tiles")]
#[command(about = "Vector tile server for OpenTripPlanner bike rental stations")]
struct Args {
    /// Upstream GraphQL endpoint, e.g. otpcitybikes://host/otp/routers/default/index/graphql
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Path to an optional server configuration JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to bind the server to [default: 3000]
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Defaults to INFO if RUST_LOG is not set
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(env_filter)
        .init();

    let config = match &args.config {
        Some(path) => {
            let config = ServerConfig::load(path).await?;
            tracing::info!(path = %path.display(), "Loaded server config");
            config
        }
        None => ServerConfig::default(),
    }
    .merge(args.endpoint, args.port);

    let endpoint = config
        .endpoint
        .as_deref()
        .ok_or("No upstream endpoint given; pass --endpoint or set it in the config file")?;

    let source = CityBikesSource::with_config(endpoint, config.source.clone())
        .map_err(|e| format!("Failed to create source for '{}': {}", endpoint, e))?;

    let app = create_app(AppState::new(source));

    let bind_addr = format!("0.0.0.0:{}", config.port());
    tracing::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", bind_addr, e))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| format!("Server error: {}", e))?;

    Ok(())
}
