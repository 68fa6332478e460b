use crate::error::FetchError;
use async_trait::async_trait;

/// Source of rendered page markup
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the fully rendered HTML for `url`
    ///
    /// Implementations must run client-side scripts and trigger lazy loading
    /// before returning, since deal pages populate their products dynamically.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}
