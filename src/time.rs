//! Sleep abstraction for testability.
//!
//! This module provides a [`Sleeper`] trait that allows retry loops to
//! wait between attempts without hard-wiring `tokio::time::sleep`, so tests
//! can run retry schedules instantly.

use std::time::Duration;

/// Abstraction over async sleeping.
///
/// Implementations pause the current task for (at most) the given duration.
///
/// # Example
///
/// ```
/// use chat_relay::time::{InstantSleeper, Sleeper};
/// use std::time::Duration;
///
/// # async fn example() {
/// InstantSleeper.sleep(Duration::from_secs(30)).await; // returns immediately
/// # }
/// ```
pub trait Sleeper: Send + Sync {
    /// Sleeps for the given duration.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}

/// Production sleeper backed by [`tokio::time::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Sleeper that returns immediately.
///
/// Useful for exercising retry paths in tests without real delays.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstantSleeper;

impl Sleeper for InstantSleeper {
    async fn sleep(&self, _duration: Duration) {}
}
