pub mod html;

#[cfg(test)]
mod tests;

use crate::error::ExtractionError;
use crate::offer::Offer;
use url::Url;

pub use html::HtmlOfferExtractor;

/// Turns rendered markup into candidate offers
///
/// Each product found on the page yields its own result so that one
/// malformed product does not hide the others.
pub trait OfferExtractor: Send + Sync {
    /// Extract candidate offers, resolving relative links against `base_origin`
    fn extract(&self, markup: &str, base_origin: &Url) -> Vec<Result<Offer, ExtractionError>>;
}

/// Keeps the successfully extracted offers and logs the ones that failed
///
/// Offers without a link cannot be deduplicated and are dropped silently.
pub fn collect_offers(url: &str, results: Vec<Result<Offer, ExtractionError>>) -> Vec<Offer> {
    let total = results.len();
    let mut failed = 0;

    let offers: Vec<Offer> = results
        .into_iter()
        .filter_map(|result| match result {
            Ok(offer) => Some(offer),
            Err(e) => {
                failed += 1;
                ::log::debug!("Dropping product from {}: {}", url, e);
                None
            }
        })
        .filter(|offer| !offer.link.is_empty())
        .collect();

    ::log::debug!(
        "{} of {} products from {} usable ({} failed extraction)",
        offers.len(),
        total,
        url,
        failed
    );
    offers
}
