use crate::config::{Config, PROVIDERS, project_dirs};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use std::path::Path;
use tracing::instrument;

const ENV_PREFIX: &str = "TANKOBON_";
const ENV_SEPARATOR: &str = "__";

impl Config {
    /// Every configuration source, lowest precedence first:
    ///
    /// 1. Built-in defaults
    /// 2. `tankobon.{toml,yaml,json}` in the platform config directory
    /// 3. `explicit`, if given
    /// 4. `TANKOBON_*` environment variables, `__` separating nested keys
    ///    (`TANKOBON_METADATA__RATE_LIMIT__MAX_REQUESTS=30`)
    pub fn figment(explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(dirs) = project_dirs() {
            let dir = dirs.config_dir();
            figment = figment
                .merge(Toml::file(dir.join("tankobon.toml")))
                .merge(Yaml::file(dir.join("tankobon.yaml")))
                .merge(Json::file(dir.join("tankobon.json")));
        }
        if let Some(path) = explicit {
            let extension = path.extension().and_then(|e| e.to_str()).map(str::to_lowercase);
            figment = match extension.as_deref() {
                Some("toml") => figment.merge(Toml::file_exact(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
                Some("json") => figment.merge(Json::file_exact(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFile(path.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split(ENV_SEPARATOR)))
    }

    /// Load and validate the configuration from every source.
    #[instrument]
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::from_figment(&Self::figment(explicit)?)
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would parse but can't work.
    pub fn validate(&self) -> Result<()> {
        let invalid = |key: &'static str, reason: &str| {
            exn::Exn::from(ErrorKind::Invalid {
                key,
                reason: reason.to_string(),
            })
        };
        if !PROVIDERS.contains(&self.metadata.provider.as_str()) {
            let reason = format!("unknown provider {:?}, expected one of {PROVIDERS:?}", self.metadata.provider);
            return Err(invalid("metadata.provider", &reason));
        }
        if self.metadata.base_url.trim().is_empty() {
            return Err(invalid("metadata.base_url", "must not be empty"));
        }
        if self.metadata.timeout_secs == 0 {
            return Err(invalid("metadata.timeout_secs", "must be greater than zero"));
        }
        let limit = &self.metadata.rate_limit;
        if limit.max_requests == 0 {
            return Err(invalid("metadata.rate_limit.max_requests", "must be greater than zero"));
        }
        if limit.window_secs == 0 {
            return Err(invalid("metadata.rate_limit.window_secs", "must be greater than zero"));
        }
        if self.thumbnails.max_dimension == 0 {
            return Err(invalid("thumbnails.max_dimension", "must be greater than zero"));
        }
        // jpeg-encoder clamps anything out of range, which would hide typos.
        if !(1..=100).contains(&self.thumbnails.quality) {
            return Err(invalid("thumbnails.quality", "must be between 1 and 100"));
        }
        if self.archive.read_buffer_bytes == 0 {
            return Err(invalid("archive.read_buffer_bytes", "must be greater than zero"));
        }
        Ok(())
    }
}
