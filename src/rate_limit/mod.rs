//! Rate limiting module
//!
//! Provides a sliding-window limiter that admits at most N operations per
//! rolling window (60 seconds for [`create_limiter`]).
//!
//! The limiter never rejects: a caller over the limit is suspended until
//! the oldest admission leaves the window, then re-checks. Concurrent callers each recompute their own wait, so
//! admission is fair in aggregate but not FIFO.
//!
//! # Example
//!
//! ```rust,no_run
//! use resilience::rate_limit::create_limiter;
//!
//! #[tokio::main]
//! async fn main() {
//!     let limiter = create_limiter(30);
//!
//!     let reply = limiter
//!         .run(|| async { Ok::<_, anyhow::Error>("recommendations") })
//!         .await;
//! }
//! ```

pub mod limiter;

pub use limiter::SlidingWindowLimiter;

use std::time::Duration;

/// Length of the window used by [`create_limiter`]
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Create a limiter admitting `requests_per_minute` operations per rolling minute
pub fn create_limiter(requests_per_minute: u32) -> SlidingWindowLimiter {
    SlidingWindowLimiter::new(requests_per_minute, DEFAULT_WINDOW)
}
