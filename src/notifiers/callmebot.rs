use crate::error::DeliveryError;
use crate::notifiers::Notifier;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};

const DEFAULT_ENDPOINT: &str = "https://api.callmebot.com/whatsapp.php";

/// Sends WhatsApp messages through the CallMeBot gateway
#[derive(Debug, Clone)]
pub struct CallMeBotNotifier {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl CallMeBotNotifier {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Override the gateway URL
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }
}

/// Phone number in the form the gateway expects (no leading '+')
fn gateway_phone(recipient: &str) -> String {
    recipient.trim().replace('+', "")
}

#[async_trait]
impl Notifier for CallMeBotNotifier {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), DeliveryError> {
        let phone = gateway_phone(recipient);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("phone", phone.as_str()),
                ("text", text),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        ::log::debug!("Gateway accepted message for {}", phone);
        Ok(())
    }
}
