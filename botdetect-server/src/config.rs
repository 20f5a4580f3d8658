//! Server settings
//!
//! Load order (highest priority first):
//! 1. Environment variables (`DATABASE_URL`, `BOTDETECT_*`)
//! 2. ./botdetect.toml (deployment-specific)
//! 3. ~/.botdetect/config.toml (user defaults)
//! 4. Built-in defaults
//!
//! CLI flags are applied on top by the binary.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub detections: DetectionSettings,

    #[serde(default)]
    pub scraper: ScraperSettings,

    #[serde(default)]
    pub model: ModelSettings,

    #[serde(default)]
    pub webhook: WebhookSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// Allow any origin. The plugin and the website both call the API
    /// cross-origin, so this is on unless a deployment fronts it with a proxy.
    #[serde(default = "default_true")]
    pub cors_permissive: bool,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            cors_permissive: true,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ServerSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Apply bundled migrations on startup
    #[serde(default)]
    pub run_migrations: bool,

    /// Session `lock_timeout`; a blocked statement fails after this long so
    /// the hiscore insert can retry. `0` waits forever.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            run_migrations: false,
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSettings {
    /// Worker tasks draining the detection queue
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Batches that may wait in the queue before submissions get a 503
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperSettings {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Retries of a hiscore batch after a lock timeout
    #[serde(default = "default_max_lock_retries")]
    pub max_lock_retries: u32,

    #[serde(default = "default_min_backoff_ms")]
    pub min_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_lock_retries: default_max_lock_retries(),
            min_backoff_ms: default_min_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    /// Ask an external inference service over HTTP
    Remote,
    /// Read precomputed rows from the `predictions` table
    #[default]
    Stored,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default)]
    pub backend: ModelBackend,

    /// Inference endpoint, required for the remote backend
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            backend: ModelBackend::default(),
            url: None,
            timeout_secs: default_model_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookSettings {
    /// Discord webhook receiving feedback broadcasts; unset disables them
    #[serde(default)]
    pub feedback_url: Option<String>,
}

// Default value functions for serde
fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000))
}

fn default_true() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_database_url() -> String {
    "postgres://localhost/botdetect".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_lock_timeout_ms() -> u64 {
    5000
}

fn default_workers() -> usize {
    num_cpus::get().clamp(1, 4)
}

fn default_queue_capacity() -> usize {
    64
}

fn default_batch_size() -> usize {
    botdetect_core::hiscore::HISCORE_BATCH_SIZE
}

fn default_max_lock_retries() -> u32 {
    3
}

fn default_min_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    5100
}

fn default_model_timeout_secs() -> u64 {
    30
}

/// Get the config directory path (~/.botdetect)
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".botdetect"))
}

impl Settings {
    /// Config files in ascending priority.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = config_dir() {
            paths.push(dir.join("config.toml"));
        }
        paths.push(PathBuf::from("botdetect.toml"));
        paths
    }

    /// Load from the default search paths and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Self::load_files(&Self::search_paths())?;
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Merge the given files, later ones overriding earlier ones key by key.
    /// Missing files are skipped.
    pub fn load_files(paths: &[PathBuf]) -> Result<Self, ConfigError> {
        let mut merged = toml::Table::new();

        for path in paths.iter().filter(|p| p.exists()) {
            let table = read_table(path)?;
            debug!("Loaded config from {}", path.display());
            merge_tables(&mut merged, table);
        }

        toml::Value::Table(merged)
            .try_into()
            .map_err(|source| ConfigError::Parse {
                path: paths.last().cloned().unwrap_or_default(),
                source,
            })
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }

        if let Some(bind) = lookup("BOTDETECT_BIND") {
            self.server.bind_addr = bind.parse().map_err(|e| ConfigError::Invalid {
                key: "BOTDETECT_BIND",
                reason: format!("{}", e),
            })?;
        }

        if let Some(url) = lookup("BOTDETECT_MODEL_URL") {
            self.model.url = Some(url);
        }

        if let Some(url) = lookup("BOTDETECT_FEEDBACK_WEBHOOK") {
            self.webhook.feedback_url = Some(url);
        }

        Ok(())
    }

    /// Reject combinations that would only fail at request time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.backend == ModelBackend::Remote && self.model.url.is_none() {
            return Err(ConfigError::Invalid {
                key: "model.url",
                reason: "required when model.backend = \"remote\"".into(),
            });
        }

        if self.detections.workers == 0 || self.detections.queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "detections",
                reason: "workers and queue_capacity must be at least 1".into(),
            });
        }

        if self.scraper.batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "scraper.batch_size",
                reason: "must be at least 1".into(),
            });
        }

        if self.scraper.min_backoff_ms > self.scraper.max_backoff_ms {
            return Err(ConfigError::Invalid {
                key: "scraper.min_backoff_ms",
                reason: "must not exceed scraper.max_backoff_ms".into(),
            });
        }

        Ok(())
    }
}

fn read_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_owned(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_owned(),
        source,
    })
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
