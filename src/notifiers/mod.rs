pub mod callmebot;

use crate::error::DeliveryError;
use crate::offer::Offer;
use async_trait::async_trait;
use std::fmt::Write;

pub use callmebot::CallMeBotNotifier;

/// Outbound message channel
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `text` to `recipient`
    async fn send(&self, recipient: &str, text: &str) -> Result<(), DeliveryError>;
}

/// Notifier that only writes messages to the log
///
/// Used when no messaging gateway is configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), DeliveryError> {
        ::log::info!("Notification for {} (not delivered):\n{}", recipient, text);
        Ok(())
    }
}

/// Formats one message listing every offer
pub fn format_offers_message(offers: &[Offer]) -> String {
    let mut message = String::from("🔥 OFERTAS DETECTADAS 🔥\n\n");
    for offer in offers {
        let _ = write!(
            message,
            "📦 {}\n💰 Precio: {}\n🎯 Descuento: {}%\n🔗 {}\n\n",
            offer.name, offer.price, offer.discount_percent, offer.link
        );
    }
    message
}
