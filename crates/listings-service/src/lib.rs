pub mod auth;
pub mod broadcaster;
pub mod cache;
pub mod http;
pub mod listings_manager_client;
pub mod ws_manager_client;
