//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8420").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Directory where raw uploads are spooled before rigging.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    /// Hard ceiling for model uploads in bytes, independent of tier.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_bytes: u64,
}

fn default_bind() -> String {
    "127.0.0.1:8420".to_string()
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./data/uploads")
}

fn default_max_upload_size() -> u64 {
    crate::MAX_UPLOAD_SIZE
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            upload_dir: default_upload_dir(),
            max_upload_size_bytes: default_max_upload_size(),
        }
    }
}

/// Permanent object storage configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for stored avatars.
        path: PathBuf,
    },
    /// S3-compatible storage.
    S3 {
        /// Bucket name.
        bucket: String,
        /// Optional endpoint URL (for MinIO, etc.).
        endpoint: Option<String>,
        /// AWS region.
        region: Option<String>,
        /// Optional key prefix.
        prefix: Option<String>,
        /// AWS access key ID. Falls back to AWS_ACCESS_KEY_ID env var if not set.
        /// WARNING: Prefer env vars or IAM roles over storing secrets in config files.
        access_key_id: Option<String>,
        /// AWS secret access key. Falls back to AWS_SECRET_ACCESS_KEY env var if not set.
        /// WARNING: Prefer env vars or IAM roles over storing secrets in config files.
        secret_access_key: Option<String>,
        /// Force path-style URLs (`endpoint/bucket/key`). Required for MinIO
        /// and some S3-compatible services; AWS S3 itself wants virtual-hosted
        /// style (false).
        #[serde(default)]
        force_path_style: bool,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/avatars"),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            StorageConfig::Filesystem { path } => {
                if path.as_os_str().is_empty() {
                    return Err("storage.path must not be empty".to_string());
                }
                Ok(())
            }
            StorageConfig::S3 {
                bucket,
                access_key_id,
                secret_access_key,
                ..
            } => {
                if bucket.is_empty() {
                    return Err("storage.bucket must not be empty".to_string());
                }
                match (access_key_id.as_ref(), secret_access_key.as_ref()) {
                    (Some(_), Some(_)) | (None, None) => Ok(()),
                    _ => Err(
                        "s3 config requires both access_key_id and secret_access_key when either is set"
                            .to_string(),
                    ),
                }
            }
        }
    }
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database (recommended for testing and small deployments).
    Sqlite {
        /// Database file path, or ":memory:" for ephemeral stores.
        path: PathBuf,
    },
    /// PostgreSQL database.
    Postgres {
        /// Connection URL.
        url: String,
        /// Maximum connections in the pool.
        #[serde(default = "default_max_connections")]
        max_connections: u32,
    },
}

fn default_max_connections() -> u32 {
    10
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/armature.db"),
        }
    }
}

impl MetadataConfig {
    /// Validate metadata configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            MetadataConfig::Sqlite { path } => {
                if path.as_os_str().is_empty() {
                    return Err("metadata.path must not be empty".to_string());
                }
                Ok(())
            }
            MetadataConfig::Postgres { url, .. } => {
                if url.is_empty() {
                    return Err("metadata.url must not be empty".to_string());
                }
                Ok(())
            }
        }
    }
}

/// Rigged-artifact cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory for cached rig binaries and their sidecar records.
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    /// Entry time-to-live in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    /// Interval between background eviction sweeps in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Run the background sweeper (disable when an external scheduler
    /// drives `DELETE /api/v1/rig-cache/expired` instead).
    #[serde(default = "default_auto_sweep")]
    pub auto_sweep: bool,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./data/rig-cache")
}

fn default_cache_ttl_secs() -> u64 {
    crate::DEFAULT_RIG_TTL_SECS
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_auto_sweep() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            ttl_secs: default_cache_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            auto_sweep: default_auto_sweep(),
        }
    }
}

impl CacheConfig {
    /// Entry time-to-live as a std Duration.
    pub fn ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.ttl_secs)
    }

    /// Sweep interval as a std Duration.
    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }

    /// Validate cache configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.dir.as_os_str().is_empty() {
            return Err("cache.dir must not be empty".to_string());
        }
        if self.auto_sweep && self.sweep_interval_secs == 0 {
            return Err(
                "cache.sweep_interval_secs cannot be 0 when auto_sweep is enabled. \
                 This would cause a panic when creating the sweep timer."
                    .to_string(),
            );
        }
        Ok(())
    }
}

/// Inference collaborator configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Base URL of the rigging inference service.
    pub endpoint: String,
    /// Optional bearer token for the inference service.
    pub api_token: Option<String>,
    /// Ceiling for one rig job in seconds. Large models can take tens of
    /// minutes, hence the generous default.
    #[serde(default = "default_inference_timeout_secs")]
    pub timeout_secs: u64,
    /// TCP connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_inference_timeout_secs() -> u64 {
    1800 // 30 minutes
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl InferenceConfig {
    /// Job timeout as a std Duration.
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }

    /// Connect timeout as a std Duration.
    pub fn connect_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.connect_timeout_secs)
    }

    /// Validate inference configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.is_empty() {
            return Err("inference.endpoint must not be empty".to_string());
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(format!(
                "inference.endpoint must be an http(s) URL, got {:?}",
                self.endpoint
            ));
        }
        if self.timeout_secs == 0 {
            return Err("inference.timeout_secs cannot be 0".to_string());
        }
        Ok(())
    }
}

/// Metrics configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    /// SECURITY: When enabled, ensure this endpoint is network-restricted
    /// to authorized Prometheus scraper IPs only at the infrastructure level.
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Permanent object storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Metadata store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Rigged-artifact cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Inference collaborator configuration (required).
    pub inference: InferenceConfig,
    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl AppConfig {
    /// Validate the whole configuration, returning the first violation.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind.is_empty() {
            return Err("server.bind must not be empty".to_string());
        }
        if self.server.max_upload_size_bytes == 0 {
            return Err("server.max_upload_size_bytes cannot be 0".to_string());
        }
        self.storage.validate()?;
        self.metadata.validate()?;
        self.cache.validate()?;
        self.inference.validate()?;
        Ok(())
    }

    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses filesystem storage, SQLite metadata, and
    /// a dummy inference endpoint that is never dialed (tests inject a mock
    /// engine).
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            metadata: MetadataConfig::default(),
            cache: CacheConfig::default(),
            inference: InferenceConfig {
                endpoint: "http://127.0.0.1:1".to_string(),
                api_token: None,
                timeout_secs: default_inference_timeout_secs(),
                connect_timeout_secs: default_connect_timeout_secs(),
            },
            metrics: MetricsConfig::default(),
        }
    }
}
