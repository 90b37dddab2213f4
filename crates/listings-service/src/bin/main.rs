//! Entry point for the Listings-Service edge API.
//!
//! Serves the client-facing listings/user/websocket surface (spec §4.8) and
//! runs the subscriber broadcaster (spec §4.7) as a background task.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use listings_core::config::{require_env, CommonConfig};
use listings_core::schema::StaticSchemaClient;
use listings_core::store::{InMemoryUsersStore, ListingsStore, MongoStore, MongoUsersStore, UsersStore};
use listings_service::auth::AuthChecker;
use listings_service::broadcaster::{self, Broadcaster};
use listings_service::cache::EdgeCache;
use listings_service::http::{self, AppState};
use listings_service::listings_manager_client::ListingsManagerClient;
use listings_service::ws_manager_client::WsManagerClient;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "listings-service", about = "Client-facing listings edge API")]
struct Cli {
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[arg(long)]
    log_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    listings_core::logging::init_logging(&cli.log_level, cli.log_dir.as_deref(), "listings-service");

    let config = CommonConfig::from_env()?;
    info!(bind_addr = %config.bind_addr, "listings-service starting");

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
    let cache = Arc::new(EdgeCache::new(store.clone()));

    let auth_token = require_env("AUTH_TOKEN")?;
    let auth = Arc::new(AuthChecker::new(auth_token));

    let listings_manager_url = require_env("LISTINGS_MANAGER_URL")?;
    let ws_manager_url = require_env("WS_MANAGER_URL")?;
    let listings_manager = Arc::new(ListingsManagerClient::new(listings_manager_url));
    let ws_manager = Arc::new(WsManagerClient::new(ws_manager_url));
    let broadcaster = Arc::new(Broadcaster::new());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let broadcaster_handle = {
        let broadcaster = broadcaster.clone();
        let ws_manager = ws_manager.clone();
        tokio::spawn(async move { broadcaster::run(broadcaster, ws_manager, shutdown_rx).await })
    };

    let app_state = AppState {
        store,
        users_store,
        schema,
        cache,
        listings_manager,
        auth,
        broadcaster,
        save_user_data: config.save_user_data,
    };
    let router = http::router(app_state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "listings-service: HTTP surface listening");

    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
    });

    if let Err(err) = server.await {
        error!(%err, "listings-service: HTTP server exited with error");
    }

    let _ = shutdown_tx.send(true);
    let _ = broadcaster_handle.await;
    info!("listings-service: stopped");
    Ok(())
}
