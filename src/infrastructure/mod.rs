// Infrastructure layer - external dependencies and adapters
pub mod analytics_store;
pub mod config;
pub mod hass_client;
pub mod session_tracker;
pub mod ttl_cache;
