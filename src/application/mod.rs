// Application layer - use-case services and the upstream provider trait
pub mod analytics_service;
pub mod history_service;
pub mod snapshot_service;
pub mod state_provider;
pub mod stats_service;
