//! Entry point for the WS-Manager service.
//!
//! Maintains the upstream websocket (spec §4.1), drains it into the store
//! via a single dispatcher (spec §4.2), and exposes the registration/purge/
//! poll HTTP surface (spec §4.8) other services call into.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use listings_core::attributes::StaticAttributeDictionary;
use listings_core::config::{num_env, optional_env, CommonConfig};
use listings_core::schema::StaticSchemaClient;
use listings_core::store::{InMemoryUsersStore, ListingsStore, MongoStore, MongoUsersStore, UsersStore};
use listings_ws_manager::cache::ItemCache;
use listings_ws_manager::dispatcher::{self, DispatcherDeps};
use listings_ws_manager::http::{self, AppState};
use listings_ws_manager::ingestor::{self, IngestorConfig};
use listings_ws_manager::notifier::UpdateNotifier;
use listings_ws_manager::queue::UpdateQueue;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "ws-manager", about = "Marketplace websocket ingestor and dispatcher")]
struct Cli {
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[arg(long)]
    log_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    listings_core::logging::init_logging(&cli.log_level, cli.log_dir.as_deref(), "ws-manager");

    let config = CommonConfig::from_env()?;
    info!(bind_addr = %config.bind_addr, "ws-manager starting");

    let store: Arc<dyn ListingsStore> = Arc::new(MongoStore::connect(&config.database_url).await?);
    let mongo_client = mongodb::Client::with_uri_str(&config.database_url).await?;
    let users_store: Arc<dyn UsersStore> = if config.save_user_data {
        Arc::new(MongoUsersStore::new(&mongo_client))
    } else {
        let dropped = MongoUsersStore::new(&mongo_client);
        dropped.drop().await.ok();
        Arc::new(InMemoryUsersStore::new())
    };

    let schema = Arc::new(StaticSchemaClient::new());
    let attributes = Arc::new(StaticAttributeDictionary::new());
    let queue = Arc::new(UpdateQueue::new());
    let notifier = Arc::new(UpdateNotifier::new());
    let cache = Arc::new(ItemCache::new(store.clone(), schema.clone()));

    let ingestor_config = IngestorConfig {
        url: optional_env("WS_URL", "wss://ws.backpack.tf/events"),
        appid: num_env("APP_ID", 440u32),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let ingestor_handle = {
        let queue = queue.clone();
        let shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move { ingestor::run(ingestor_config, queue, shutdown_rx).await })
    };

    let dispatcher_deps = DispatcherDeps::from_config(
        &config,
        cache.clone(),
        queue.clone(),
        notifier.clone(),
        store.clone(),
        users_store.clone(),
        schema.clone(),
        attributes.clone(),
    );
    let dispatcher_handle = {
        let shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move { dispatcher::run(dispatcher_deps, shutdown_rx).await })
    };

    let app_state = AppState { cache, queue, notifier, schema };
    let router = http::router(app_state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "ws-manager: HTTP surface listening");

    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
    });

    if let Err(err) = server.await {
        error!(%err, "ws-manager: HTTP server exited with error");
    }

    let _ = shutdown_tx.send(true);
    let _ = ingestor_handle.await;
    let _ = dispatcher_handle.await;
    info!("ws-manager: stopped");
    Ok(())
}
