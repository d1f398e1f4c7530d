//! chat-relay: queue and deliver chat notifications
//!
//! A library for relaying messages to named chat destinations. Each
//! destination is built from a URI, owns a bounded queue and a single
//! delivery worker, and sends through the Telegram Bot API with timeouts
//! and exponential-backoff retries.

pub mod config;
pub mod destination;
pub mod message;
pub mod provider;
pub mod time;
