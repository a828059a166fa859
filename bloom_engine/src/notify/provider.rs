use log::info;
use rand::{distributions::Alphanumeric, Rng};
use thiserror::Error;

use crate::helpers::mask_phone;

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("The provider rejected the message: {0}")]
    Rejected(String),
    #[error("Could not reach the provider: {0}")]
    Transport(String),
}

/// A messaging gateway capable of delivering to a phone number over the two supported channels. Implementations
/// return the provider's message id on success; the id is logged and then discarded, never stored or exposed.
#[allow(async_fn_in_trait)]
pub trait MessagingProvider: Clone + Send + Sync {
    async fn send_text_message(&self, phone: &str, body: &str) -> Result<String, ProviderError>;
    async fn send_chat_message(&self, phone: &str, body: &str) -> Result<String, ProviderError>;
}

/// The default provider: writes the message to the log instead of a gateway. Useful in development and as the
/// fallback when no gateway is configured.
#[derive(Debug, Clone, Default)]
pub struct LoggingProvider;

fn fake_message_id(prefix: &str) -> String {
    let suffix: String = rand::thread_rng().sample_iter(&Alphanumeric).take(12).map(char::from).collect();
    format!("{prefix}-{suffix}")
}

impl MessagingProvider for LoggingProvider {
    async fn send_text_message(&self, phone: &str, body: &str) -> Result<String, ProviderError> {
        info!("📨️ [text → {}] {body}", mask_phone(phone));
        Ok(fake_message_id("text"))
    }

    async fn send_chat_message(&self, phone: &str, body: &str) -> Result<String, ProviderError> {
        info!("📨️ [chat → {}] {body}", mask_phone(phone));
        Ok(fake_message_id("chat"))
    }
}
