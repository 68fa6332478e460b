use crate::error::{ConfigError, ControlError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use url::Url;

/// Parameters of one monitoring run; immutable while the run is active
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Who receives the notifications (a phone number for WhatsApp)
    pub recipient: String,

    /// Pages to poll, in order
    pub urls: Vec<String>,

    /// Seconds to sleep between cycles
    pub interval_secs: u64,

    /// Lowest accepted discount, inclusive
    pub discount_min: u8,

    /// Highest accepted discount, inclusive
    pub discount_max: u8,
}

impl MonitorConfig {
    /// Check the configuration before a run is started
    pub fn validate(&self) -> Result<(), ControlError> {
        let invalid = |msg: String| Err(ControlError::InvalidConfig(msg));

        if self.recipient.trim().is_empty() {
            return invalid("recipient is empty".to_string());
        }
        if self.urls.is_empty() {
            return invalid("no URLs to monitor".to_string());
        }
        for url in &self.urls {
            match Url::parse(url) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
                _ => return invalid(format!("{url:?} is not an absolute http(s) URL")),
            }
        }
        if self.interval_secs == 0 {
            return invalid("interval must be at least one second".to_string());
        }
        if self.discount_max > 100 {
            return invalid(format!("discount_max {} exceeds 100", self.discount_max));
        }
        if self.discount_min > self.discount_max {
            return invalid(format!(
                "discount range [{}, {}] is empty",
                self.discount_min, self.discount_max
            ));
        }
        Ok(())
    }

    /// Whether a discount lies within the configured inclusive range
    pub fn accepts(&self, discount_percent: u8) -> bool {
        (self.discount_min..=self.discount_max).contains(&discount_percent)
    }
}

/// Values used for start requests that omit a field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartDefaults {
    #[serde(default)]
    pub recipient: Option<String>,

    #[serde(default = "default_urls")]
    pub urls: Vec<String>,

    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_discount_min")]
    pub discount_min: u8,

    #[serde(default = "default_discount_max")]
    pub discount_max: u8,
}

impl Default for StartDefaults {
    fn default() -> Self {
        Self {
            recipient: None,
            urls: default_urls(),
            interval_secs: default_interval_secs(),
            discount_min: default_discount_min(),
            discount_max: default_discount_max(),
        }
    }
}

/// Configuration of the whole service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Address the control surface listens on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Where the seen-set is persisted
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Seconds to let the page render after navigation
    #[serde(default = "default_render_wait_secs")]
    pub render_wait_secs: u64,

    /// Seconds to let lazy content load after scrolling
    #[serde(default = "default_scroll_wait_secs")]
    pub scroll_wait_secs: u64,

    /// Upper bound for a single page fetch
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Origin relative product links are resolved against
    /// (defaults to the origin of the monitored page)
    #[serde(default)]
    pub base_origin: Option<String>,

    /// CallMeBot API key; without one notifications are only logged
    #[serde(default)]
    pub callmebot_api_key: Option<String>,

    #[serde(default)]
    pub defaults: StartDefaults,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            state_file: default_state_file(),
            webdriver_url: default_webdriver_url(),
            render_wait_secs: default_render_wait_secs(),
            scroll_wait_secs: default_scroll_wait_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            base_origin: None,
            callmebot_api_key: None,
            defaults: StartDefaults::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut contents = String::new();
        File::open(path)
            .and_then(|mut file| file.read_to_string(&mut contents))
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply overrides from the environment
    pub fn apply_env(&mut self) {
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.webdriver_url = webdriver_url;
            }
        }
        if let Ok(key) = std::env::var("CALLMEBOT_API_KEY") {
            if !key.is_empty() {
                self.callmebot_api_key = Some(key);
            }
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_state_file() -> PathBuf {
    PathBuf::from("ofertas_vistas.json")
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_render_wait_secs() -> u64 {
    5
}

fn default_scroll_wait_secs() -> u64 {
    2
}

fn default_fetch_timeout_secs() -> u64 {
    45
}

fn default_urls() -> Vec<String> {
    vec!["https://www.falabella.com/falabella-cl/page/ultimas-oportunidades".to_string()]
}

fn default_interval_secs() -> u64 {
    60
}

fn default_discount_min() -> u8 {
    98
}

fn default_discount_max() -> u8 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MonitorConfig {
        MonitorConfig {
            recipient: "+56900000000".to_string(),
            urls: vec!["https://x/deals".to_string()],
            interval_secs: 60,
            discount_min: 98,
            discount_max: 100,
        }
    }

    #[test]
    fn test_valid_config() {
        assert_eq!(config().validate(), Ok(()));
    }

    #[test]
    fn test_invalid_configs() {
        let cases = [
            MonitorConfig {
                recipient: " ".to_string(),
                ..config()
            },
            MonitorConfig {
                urls: vec![],
                ..config()
            },
            MonitorConfig {
                urls: vec!["/relative/path".to_string()],
                ..config()
            },
            MonitorConfig {
                urls: vec!["ftp://x/deals".to_string()],
                ..config()
            },
            MonitorConfig {
                interval_secs: 0,
                ..config()
            },
            MonitorConfig {
                discount_max: 101,
                ..config()
            },
            MonitorConfig {
                discount_min: 60,
                discount_max: 50,
                ..config()
            },
        ];

        for case in cases {
            assert!(
                matches!(case.validate(), Err(ControlError::InvalidConfig(_))),
                "expected {case:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_accepts_is_inclusive() {
        let cfg = config();
        assert!(cfg.accepts(98));
        assert!(cfg.accepts(100));
        assert!(!cfg.accepts(97));
    }

    #[test]
    fn test_service_defaults_from_empty_json() {
        let cfg = ServiceConfig::from_json("{}").unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:5000");
        assert_eq!(cfg.state_file, PathBuf::from("ofertas_vistas.json"));
        assert_eq!(cfg.fetch_timeout_secs, 45);
        assert_eq!(cfg.defaults.interval_secs, 60);
        assert_eq!(cfg.defaults.discount_min, 98);
        assert_eq!(cfg.defaults.urls.len(), 1);
        assert!(cfg.callmebot_api_key.is_none());
    }

    #[test]
    fn test_service_config_overrides() {
        let cfg = ServiceConfig::from_json(
            r#"{
                "bind_addr": "127.0.0.1:8080",
                "base_origin": "https://www.falabella.com",
                "defaults": { "recipient": "+56911111111", "discount_min": 70 }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:8080");
        assert_eq!(cfg.base_origin.as_deref(), Some("https://www.falabella.com"));
        assert_eq!(cfg.defaults.recipient.as_deref(), Some("+56911111111"));
        assert_eq!(cfg.defaults.discount_min, 70);
        assert_eq!(cfg.defaults.discount_max, 100);
    }

    #[test]
    fn test_missing_config_file() {
        assert!(matches!(
            ServiceConfig::from_file("/definitely/not/here.json"),
            Err(ConfigError::Read { .. })
        ));
    }
}
