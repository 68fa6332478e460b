//! Error types shared across the watcher.
//!
//! None of these are fatal to the process. Fetch, extraction, delivery and
//! store failures are logged by the monitor loop and the loop carries on;
//! control errors are returned to the caller of `start`/`stop`.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to obtain rendered markup for one URL.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no WebDriver server reachable (tried {tried})")]
    Connect { tried: String },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("fetching {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    #[error("scanning {url} panicked: {reason}")]
    Panicked { url: String, reason: String },
}

/// Failure to turn one product element into an [`Offer`](crate::Offer).
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("product has no discount element")]
    MissingDiscount,

    #[error("discount text {0:?} has no number")]
    UnparsableDiscount(String),

    #[error("discount {0}% is out of range")]
    DiscountOutOfRange(u64),

    #[error("link {href:?} cannot be resolved: {source}")]
    BadLink {
        href: String,
        #[source]
        source: url::ParseError,
    },
}

/// Failure to deliver a notification.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("notification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gateway rejected notification ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("notifier panicked: {0}")]
    Panicked(String),
}

/// Failure of the seen-set persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("seen-set file {path} is unreadable: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("cannot write seen-set file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("seen-set store panicked: {0}")]
    Panicked(String),
}

/// Errors returned synchronously by the monitor's control operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    #[error("the monitor is already running")]
    AlreadyRunning,

    #[error("the monitor is not running")]
    NotRunning,

    #[error("the previous run is still finishing its cycle; try again shortly")]
    Stopping,

    #[error("invalid monitor configuration: {0}")]
    InvalidConfig(String),
}

/// Failure to load the service configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}
