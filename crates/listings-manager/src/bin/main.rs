//! Entry point for the Listings-Manager service.
//!
//! Serves on-demand snapshot fetches (spec §4.3, §4.8) and runs the
//! periodic refresher (spec §4.5) as a background task.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use listings_core::attributes::StaticAttributeDictionary;
use listings_core::config::{list_env, optional_env, require_env, CommonConfig};
use listings_core::schema::StaticSchemaClient;
use listings_core::store::{ListingsStore, MongoStore};
use listings_manager::http::{self, AppState};
use listings_manager::refresher;
use listings_manager::rest_client::RestClient;
use listings_manager::ws_manager_client::WsManagerClient;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "listings-manager", about = "On-demand + periodic marketplace snapshot fetcher")]
struct Cli {
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[arg(long)]
    log_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    listings_core::logging::init_logging(&cli.log_level, cli.log_dir.as_deref(), "listings-manager");

    let config = CommonConfig::from_env()?;
    info!(bind_addr = %config.bind_addr, "listings-manager starting");

    let store: Arc<dyn ListingsStore> = Arc::new(MongoStore::connect(&config.database_url).await?);
    let schema = Arc::new(StaticSchemaClient::new());
    let attributes = Arc::new(StaticAttributeDictionary::new());

    let base_url = optional_env("BPTF_BASE_URL", "https://backpack.tf/api");
    let tokens = list_env("BPTF_TOKEN");
    let ws_manager_url = require_env("WS_MANAGER_URL")?;

    let rest = Arc::new(RestClient::new(base_url, tokens, schema, attributes, store.clone()));
    let ws_manager = Arc::new(WsManagerClient::new(ws_manager_url));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresher_handle = {
        let store = store.clone();
        let rest = rest.clone();
        let ws_manager = ws_manager.clone();
        tokio::spawn(async move { refresher::run(store, rest, ws_manager, shutdown_rx).await })
    };

    let app_state = AppState { rest, ws_manager };
    let router = http::router(app_state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "listings-manager: HTTP surface listening");

    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
    });

    if let Err(err) = server.await {
        error!(%err, "listings-manager: HTTP server exited with error");
    }

    let _ = shutdown_tx.send(true);
    let _ = refresher_handle.await;
    info!("listings-manager: stopped");
    Ok(())
}
