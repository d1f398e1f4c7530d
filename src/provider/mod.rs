//! Delivery layer for sending messages to external chat services.
//!
//! This module provides:
//! - HTTP request/response value types and a client seam ([`HttpClient`])
//! - Production HTTP client implementation ([`ReqwestClient`])
//! - Retry policy with fatal-status classification ([`RetryPolicy`])
//! - URI-derived provider options ([`ProviderOptions`])
//! - The sender abstraction used by destination workers ([`MessageSender`])
//! - The Telegram Bot API provider ([`TelegramProvider`])

mod client;
mod error;
mod http;
mod options;
mod retry;
mod sender;
mod telegram;

#[cfg(test)]
mod telegram_tests;

pub use client::ReqwestClient;
pub use error::{AttemptError, DeliveryError, HttpError, InvalidTimeout};
pub use http::{HttpClient, HttpRequest, HttpResponse};
pub use options::ProviderOptions;
pub use retry::RetryPolicy;
pub use sender::MessageSender;
pub use telegram::TelegramProvider;
