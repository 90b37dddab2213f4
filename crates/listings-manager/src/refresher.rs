//! Periodic refresher (spec §4.5): the repo's eventual-consistency
//! guarantee — every known item re-syncs with the marketplace within one
//! full pass.

use std::sync::Arc;
use std::time::Duration;

use listings_core::store::ListingsStore;
use rand::seq::SliceRandom;
use tokio::sync::watch;
use tracing::{error, info};

use crate::rest_client::RestClient;
use crate::ws_manager_client::WsManagerClient;

const EMPTY_STORE_BACKOFF: Duration = Duration::from_secs(60);
const END_OF_PASS_BACKOFF: Duration = Duration::from_secs(60);
const FAST_ITEM_SLEEP: Duration = Duration::from_millis(500);
const SLOW_ITEM_SLEEP: Duration = Duration::from_secs(1);
const FAST_THRESHOLD: usize = 1000;

pub async fn run(
    store: Arc<dyn ListingsStore>,
    rest: Arc<RestClient>,
    ws_manager: Arc<WsManagerClient>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            return;
        }

        let mut collections = match store.get_collections().await {
            Ok(c) => c,
            Err(err) => {
                error!(%err, "refresher: failed to enumerate known items");
                if wait_or_shutdown(END_OF_PASS_BACKOFF, &mut shutdown).await {
                    return;
                }
                continue;
            }
        };

        if collections.is_empty() {
            info!("refresher: no items known, sleeping");
            if wait_or_shutdown(EMPTY_STORE_BACKOFF, &mut shutdown).await {
                return;
            }
            continue;
        }

        collections.shuffle(&mut rand::thread_rng());
        let per_item_sleep = if collections.len() < FAST_THRESHOLD { SLOW_ITEM_SLEEP } else { FAST_ITEM_SLEEP };

        info!(count = collections.len(), "refresher: starting pass");
        for sku in &collections {
            match rest.get_listings(sku).await {
                Ok(listings) if !listings.is_empty() => {
                    ws_manager.remove_updates_from_queue(sku).await;
                    info!(sku, count = listings.len(), "refresher: refreshed item");
                }
                Ok(_) => {
                    error!(sku, "refresher: no listings found");
                }
                Err(err) => {
                    error!(sku, %err, "refresher: failed to refresh item");
                }
            }

            if wait_or_shutdown(per_item_sleep, &mut shutdown).await {
                return;
            }
        }

        info!("refresher: pass complete, pausing 60s");
        if wait_or_shutdown(END_OF_PASS_BACKOFF, &mut shutdown).await {
            return;
        }
    }
}

async fn wait_or_shutdown(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = shutdown.changed() => true,
    }
}
