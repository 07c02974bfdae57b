use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::time::Duration;
use tankobon_archive::{DEFAULT_MAX_DIMENSION, DEFAULT_QUALITY, DEFAULT_READ_BUFFER_BYTES, Inspector, Thumbnailer};
use tankobon_asyncutils::RatePolicy;

pub(crate) const APPLICATION: &str = "tankobon";

pub(crate) fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APPLICATION)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite catalog.
    pub database: PathBuf,
    /// Parent directory for temporary per-archive work (RAR normalization).
    pub scratch_dir: PathBuf,
    pub log: LogConfig,
    pub metadata: MetadataConfig,
    pub thumbnails: ThumbnailConfig,
    pub archive: ArchiveConfig,
}
impl Default for Config {
    fn default() -> Self {
        let database = project_dirs()
            .map(|dirs| dirs.data_dir().join("catalog.db"))
            .unwrap_or_else(|| PathBuf::from("tankobon.db"));
        Self {
            database,
            scratch_dir: std::env::temp_dir().join(APPLICATION),
            log: LogConfig::default(),
            metadata: MetadataConfig::default(),
            thumbnails: ThumbnailConfig::default(),
            archive: ArchiveConfig::default(),
        }
    }
}
impl Config {
    /// The archive inspector these settings describe.
    pub fn inspector(&self) -> Inspector {
        Inspector {
            scratch_dir: self.scratch_dir.clone(),
            read_buffer_bytes: self.archive.read_buffer_bytes,
            thumbnailer: self.thumbnails.thumbnailer(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
impl Display for LogFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// An `EnvFilter` directive; `RUST_LOG` wins when set.
    pub level: String,
    pub format: LogFormat,
}
impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Providers we know how to talk to.
pub const PROVIDERS: [&str; 1] = ["jikan"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// When disabled, new series are created without metadata.
    pub enabled: bool,
    pub provider: String,
    pub base_url: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Pause after creating a series that got metadata, on top of the rate
    /// limit.
    pub cooldown_ms: u64,
    pub rate_limit: RateLimitConfig,
}
impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: "jikan".to_string(),
            base_url: "https://api.jikan.moe/v4".to_string(),
            timeout_secs: 30,
            cooldown_ms: 1000,
            rate_limit: RateLimitConfig::default(),
        }
    }
}
impl MetadataConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_secs: u64,
    pub min_gap_ms: u64,
}
impl Default for RateLimitConfig {
    fn default() -> Self {
        let policy = RatePolicy::default();
        Self {
            max_requests: policy.max_requests,
            window_secs: policy.window.as_secs(),
            min_gap_ms: u64::try_from(policy.min_gap.as_millis()).unwrap_or(u64::MAX),
        }
    }
}
impl RateLimitConfig {
    pub fn policy(&self) -> RatePolicy {
        RatePolicy {
            max_requests: self.max_requests,
            window: Duration::from_secs(self.window_secs),
            min_gap: Duration::from_millis(self.min_gap_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    pub max_dimension: u32,
    /// JPEG quality, 1 to 100.
    pub quality: u8,
}
impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            quality: DEFAULT_QUALITY,
        }
    }
}
impl ThumbnailConfig {
    pub fn thumbnailer(&self) -> Thumbnailer {
        Thumbnailer {
            max_dimension: self.max_dimension,
            quality: self.quality,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub read_buffer_bytes: usize,
}
impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            read_buffer_bytes: DEFAULT_READ_BUFFER_BYTES,
        }
    }
}
