use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::truncate_chars;

/// Maximum length of an offer name, in characters
pub const MAX_NAME_LEN: usize = 100;

/// One discount listing extracted from a monitored page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    /// Product name (truncated to [`MAX_NAME_LEN`])
    pub name: String,

    /// Price text as shown on the page, or "N/A"
    pub price: String,

    /// Discount percentage, 0-100
    pub discount_percent: u8,

    /// Absolute product URL; identifies the offer for deduplication
    pub link: String,

    /// When the offer was extracted
    pub observed_at: DateTime<Utc>,
}

impl Offer {
    /// Create a new offer observed now
    pub fn new(name: &str, price: &str, discount_percent: u8, link: &str) -> Self {
        Self {
            name: truncate_chars(name, MAX_NAME_LEN),
            price: price.to_string(),
            discount_percent,
            link: link.to_string(),
            observed_at: Utc::now(),
        }
    }

    /// The deduplication key
    pub fn id(&self) -> &str {
        &self.link
    }
}
