pub mod config;
pub mod crawlers;
pub mod error;
pub mod monitor;
pub mod notifiers;
pub mod offer;
pub mod parsers;
pub mod server;
pub mod store;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::{MonitorConfig, ServiceConfig};
pub use monitor::{Monitor, MonitorStatus};
pub use offer::Offer;
