use crate::config::ServiceConfig;
use crate::crawlers::PageFetcher;
use crate::error::FetchError;
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout, timeout_at};

/// Ports WebDriver servers commonly listen on, tried when the configured one is down
const FALLBACK_WEBDRIVER_URLS: [&str; 4] = [
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4723", // Appium default
    "http://localhost:9222", // Chrome debug port default
    "http://127.0.0.1:4444", // Try with IP instead of localhost
];

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Upper bound for ending a session once the page is done
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// Fetches pages through a headless browser driven over WebDriver
///
/// Every fetch opens its own browser session and closes it afterwards, so a
/// crashed browser only costs the URL it was rendering.
#[derive(Debug, Clone)]
pub struct WebDriverFetcher {
    webdriver_url: String,
    render_wait: Duration,
    scroll_wait: Duration,
    fetch_timeout: Duration,
}

impl WebDriverFetcher {
    /// Create a fetcher for the given WebDriver URL with default timings
    pub fn new(webdriver_url: &str) -> Self {
        Self {
            webdriver_url: webdriver_url.to_string(),
            render_wait: Duration::from_secs(5),
            scroll_wait: Duration::from_secs(2),
            fetch_timeout: Duration::from_secs(45),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(&config.webdriver_url)
            .with_render_wait(config.render_wait_secs)
            .with_scroll_wait(config.scroll_wait_secs)
            .with_fetch_timeout(config.fetch_timeout_secs)
    }

    /// Set how long to let the page render after navigation
    pub fn with_render_wait(mut self, seconds: u64) -> Self {
        self.render_wait = Duration::from_secs(seconds);
        self
    }

    /// Set how long to let lazy-loaded products arrive after scrolling
    pub fn with_scroll_wait(mut self, seconds: u64) -> Self {
        self.scroll_wait = Duration::from_secs(seconds);
        self
    }

    /// Set the upper bound for rendering a single page
    pub fn with_fetch_timeout(mut self, seconds: u64) -> Self {
        self.fetch_timeout = Duration::from_secs(seconds);
        self
    }

    /// WebDriver URLs to try, configured one first
    fn candidate_urls(&self) -> Vec<&str> {
        let mut urls = vec![self.webdriver_url.as_str()];
        urls.extend(
            FALLBACK_WEBDRIVER_URLS
                .iter()
                .copied()
                .filter(|url| *url != self.webdriver_url),
        );
        urls
    }

    /// Browser capabilities for a headless Chrome session
    fn capabilities() -> serde_json::Map<String, serde_json::Value> {
        let mut caps = serde_json::Map::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({
                "args": [
                    "--headless",
                    "--no-sandbox",
                    "--disable-dev-shm-usage",
                    "--disable-blink-features=AutomationControlled",
                    format!("user-agent={USER_AGENT}"),
                ]
            }),
        );
        caps
    }

    /// Connects to the first reachable WebDriver server
    async fn connect(&self) -> Result<Client, FetchError> {
        let candidates = self.candidate_urls();

        for (i, url) in candidates.iter().enumerate() {
            let mut builder = ClientBuilder::native();
            builder.capabilities(Self::capabilities());

            match builder.connect(url).await {
                Ok(client) => {
                    ::log::debug!("Connected to WebDriver at {}", url);
                    return Ok(client);
                }
                Err(e) if i == 0 => {
                    ::log::warn!("Failed to connect to WebDriver at {}: {}", url, e);
                }
                Err(_) => {
                    // Don't log error for fallbacks to avoid log spam
                }
            }
        }

        ::log::error!(
            "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
        );
        Err(FetchError::Connect {
            tried: candidates.join(", "),
        })
    }

    /// Navigates, waits for rendering, scrolls to load lazy content and returns the source
    async fn render(&self, client: &Client, url: &str) -> Result<String, FetchError> {
        let nav_err = |e: fantoccini::error::CmdError| FetchError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        };

        client.goto(url).await.map_err(nav_err)?;
        sleep(self.render_wait).await;

        client
            .execute(SCROLL_TO_BOTTOM, vec![])
            .await
            .map_err(nav_err)?;
        sleep(self.scroll_wait).await;

        client.source().await.map_err(nav_err)
    }
}

#[async_trait]
impl PageFetcher for WebDriverFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let started = std::time::Instant::now();
        ::log::debug!("FETCH: {}", url);

        // Connecting and rendering share one deadline
        let deadline = Instant::now() + self.fetch_timeout;
        let timed_out = || FetchError::Timeout {
            url: url.to_string(),
            secs: self.fetch_timeout.as_secs(),
        };

        let client = timeout_at(deadline, self.connect())
            .await
            .map_err(|_| timed_out())??;
        let result = timeout_at(deadline, self.render(&client, url)).await;

        match timeout(CLOSE_TIMEOUT, client.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => ::log::warn!("Failed to close WebDriver session: {}", e),
            Err(_) => ::log::warn!("Timed out closing WebDriver session"),
        }

        let html = result.map_err(|_| timed_out())??;

        ::log::debug!(
            "Fetched {} ({} bytes) in {:.2} seconds",
            url,
            html.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(html)
    }
}
