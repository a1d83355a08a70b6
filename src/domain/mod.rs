// Domain layer - pure models and computation
pub mod analytics;
pub mod history;
pub mod sensor;
pub mod stats;
