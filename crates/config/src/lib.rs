//! Configuration for tankobon, layered with `figment`.
//!
//! See [`Config::figment`] for where values come from and in which order.

mod config;
pub mod error;
mod load;

pub use crate::config::{
    ArchiveConfig, Config, LogConfig, LogFormat, MetadataConfig, PROVIDERS, RateLimitConfig, ThumbnailConfig,
};
