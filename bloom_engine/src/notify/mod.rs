//! Customer notifications.
//!
//! The dispatcher fans an order event out to the configured messaging channels. Notifications are strictly
//! best-effort: every failure is logged and swallowed, and nothing here can affect an order's fate.
mod dispatcher;
mod provider;
pub mod templates;

pub use dispatcher::NotificationDispatcher;
pub use provider::{LoggingProvider, MessagingProvider, ProviderError};
