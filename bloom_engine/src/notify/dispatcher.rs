use log::*;

use crate::{
    db_types::{NotificationChannel, NotificationResult, Order},
    helpers::{mask_phone, normalize_phone},
    notify::{provider::MessagingProvider, templates},
};

/// Fans order notifications out to the text and chat channels concurrently. The two channels fail independently;
/// one bad gateway never silences the other. Results are returned for logging and tests, never persisted.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher<P> {
    provider: P,
}

impl<P> NotificationDispatcher<P>
where P: MessagingProvider
{
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub async fn send_order_confirmation(&self, order: &Order) -> Vec<NotificationResult> {
        self.send_both(order, templates::order_confirmation_text(order), templates::order_confirmation_chat(order))
            .await
    }

    pub async fn send_status_update(&self, order: &Order) -> Vec<NotificationResult> {
        self.send_both(order, templates::status_update_text(order), templates::status_update_chat(order)).await
    }

    async fn send_both(&self, order: &Order, text_body: String, chat_body: String) -> Vec<NotificationResult> {
        // An unusable phone number fails both channels up front; there is no point hitting the gateway.
        let phone = match normalize_phone(&order.customer_phone) {
            Ok(p) => p,
            Err(e) => {
                warn!("📨️ Cannot notify for order {}: {e}", order.order_no);
                return vec![
                    NotificationResult::failed(NotificationChannel::TextMessage, e.to_string()),
                    NotificationResult::failed(NotificationChannel::ChatMessage, e.to_string()),
                ];
            },
        };
        let (text, chat) = tokio::join!(
            self.provider.send_text_message(&phone, &text_body),
            self.provider.send_chat_message(&phone, &chat_body)
        );
        let masked = mask_phone(&phone);
        let results = vec![
            to_result(NotificationChannel::TextMessage, text),
            to_result(NotificationChannel::ChatMessage, chat),
        ];
        for r in &results {
            if r.success {
                debug!("📨️ {} notification for order {} sent to {masked}", r.channel, order.order_no);
            } else {
                warn!(
                    "📨️ {} notification for order {} to {masked} failed: {}",
                    r.channel,
                    order.order_no,
                    r.error.as_deref().unwrap_or("unknown")
                );
            }
        }
        results
    }
}

fn to_result(channel: NotificationChannel, outcome: Result<String, super::ProviderError>) -> NotificationResult {
    match outcome {
        Ok(message_id) => NotificationResult::sent(channel, message_id),
        Err(e) => NotificationResult::failed(channel, e.to_string()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::notify::{LoggingProvider, ProviderError};

    /// A provider where each channel's outcome can be scripted.
    #[derive(Clone)]
    struct ScriptedProvider {
        text_fails: bool,
        chat_fails: bool,
    }

    impl MessagingProvider for ScriptedProvider {
        async fn send_text_message(&self, _phone: &str, _body: &str) -> Result<String, ProviderError> {
            if self.text_fails {
                Err(ProviderError::Transport("text gateway down".into()))
            } else {
                Ok("txt-1".into())
            }
        }

        async fn send_chat_message(&self, _phone: &str, _body: &str) -> Result<String, ProviderError> {
            if self.chat_fails {
                Err(ProviderError::Rejected("no chat account".into()))
            } else {
                Ok("chat-1".into())
            }
        }
    }

    #[tokio::test]
    async fn channels_fail_independently() {
        let dispatcher = NotificationDispatcher::new(ScriptedProvider { text_fails: true, chat_fails: false });
        let results = dispatcher.send_order_confirmation(&Order::default()).await;
        assert_eq!(results.len(), 2);
        assert!(!results[0].success);
        assert!(results[1].success);
        assert_eq!(results[1].message_id.as_deref(), Some("chat-1"));
    }

    #[tokio::test]
    async fn bad_phone_short_circuits_both_channels() {
        let dispatcher = NotificationDispatcher::new(LoggingProvider);
        let mut order = Order::default();
        order.customer_phone = "not-a-number".into();
        let results = dispatcher.send_order_confirmation(&order).await;
        assert!(results.iter().all(|r| !r.success));
    }
}
