//! Async scheduling primitives.
//!
//! Currently this is home to the [`RateLimiter`], the FIFO scheduler that
//! keeps every outbound metadata request inside the provider's published
//! request budget. It's a separate crate so the windowing rules can be tested
//! against a paused Tokio clock without dragging an HTTP client along.

pub mod error;
mod limiter;

pub use crate::limiter::{RateLimiter, RatePolicy, Scheduled};
