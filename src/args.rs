use clap::Parser;
use deal_watch::config::{ServiceConfig, StartDefaults};
use deal_watch::server::StartRequest;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "deal-watch")]
#[command(about = "Watches deal pages and notifies about new discounted offers")]
#[command(version)]
pub struct Args {
    /// JSON service configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address the control API listens on
    #[arg(short, long)]
    pub bind: Option<String>,

    /// File the seen offers are persisted to
    #[arg(long)]
    pub state_file: Option<PathBuf>,

    /// WebDriver server URL
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Start monitoring immediately instead of waiting for a start request
    #[arg(long)]
    pub autostart: bool,

    /// Notification recipient (phone number)
    #[arg(short, long)]
    pub recipient: Option<String>,

    /// Page to monitor; may be repeated
    #[arg(short, long = "url")]
    pub urls: Vec<String>,

    /// Seconds between cycles
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Lowest discount to report, in percent
    #[arg(long)]
    pub min_discount: Option<u8>,

    /// Highest discount to report, in percent
    #[arg(long)]
    pub max_discount: Option<u8>,
}

impl Args {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut ServiceConfig) {
        if let Some(bind) = &self.bind {
            config.bind_addr = bind.clone();
        }
        if let Some(state_file) = &self.state_file {
            config.state_file = state_file.clone();
        }
        if let Some(webdriver_url) = &self.webdriver_url {
            config.webdriver_url = webdriver_url.clone();
        }
    }

    /// The start request used for `--autostart`
    pub fn start_request(&self) -> StartRequest {
        StartRequest {
            recipient: self.recipient.clone(),
            urls: (!self.urls.is_empty()).then(|| self.urls.clone()),
            interval_seconds: self.interval,
            discount_min: self.min_discount,
            discount_max: self.max_discount,
        }
    }
}

/// Defaults for start requests, with any run flags given on the command line
pub fn start_defaults(args: &Args, config: &ServiceConfig) -> StartDefaults {
    let request = args.start_request();
    let base = &config.defaults;
    StartDefaults {
        recipient: request.recipient.or_else(|| base.recipient.clone()),
        urls: request.urls.unwrap_or_else(|| base.urls.clone()),
        interval_secs: request.interval_seconds.unwrap_or(base.interval_secs),
        discount_min: request.discount_min.unwrap_or(base.discount_min),
        discount_max: request.discount_max.unwrap_or(base.discount_max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "deal-watch",
            "--bind",
            "127.0.0.1:9000",
            "--webdriver-url",
            "http://driver:4444",
            "--url",
            "https://a/1",
            "--url",
            "https://a/2",
            "--min-discount",
            "70",
        ]);
        let mut config = ServiceConfig::default();
        args.apply(&mut config);

        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.webdriver_url, "http://driver:4444");
        assert_eq!(config.state_file, PathBuf::from("ofertas_vistas.json"));

        let defaults = start_defaults(&args, &config);
        assert_eq!(defaults.urls, vec!["https://a/1", "https://a/2"]);
        assert_eq!(defaults.discount_min, 70);
        assert_eq!(defaults.discount_max, 100);
        assert_eq!(defaults.interval_secs, 60);
    }

    #[test]
    fn test_no_flags_keeps_config_defaults() {
        let args = Args::parse_from(["deal-watch"]);
        let config = ServiceConfig::default();

        let request = args.start_request();
        assert!(request.urls.is_none());
        assert!(!args.autostart);

        let defaults = start_defaults(&args, &config);
        assert_eq!(defaults.urls, config.defaults.urls);
        assert!(defaults.recipient.is_none());
    }
}
