//! Configuration types for media-dl

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Download behavior configuration (directories and output format)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Durable artifact directory (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Root for per-job private working directories (default: "./temp")
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Format selector used when a submission leaves it empty (default: "best")
    #[serde(default = "default_format")]
    pub default_format: String,

    /// Container the extractor merges separate audio/video streams into (default: "mp4")
    #[serde(default = "default_merge_output_format")]
    pub merge_output_format: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            temp_dir: default_temp_dir(),
            default_format: default_format(),
            merge_output_format: default_merge_output_format(),
        }
    }
}

/// Attempt budget and delay range for one retried phase
///
/// The delay before an attempt is drawn uniformly from `[min_delay, max_delay]`.
/// It is not exponential: every gap uses the same range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first (values below 1 behave as 1)
    pub max_attempts: u32,

    /// Lower bound of the random inter-attempt delay
    #[serde(with = "duration_serde")]
    pub min_delay: Duration,

    /// Upper bound of the random inter-attempt delay
    #[serde(with = "duration_serde")]
    pub max_delay: Duration,

    /// Also sleep before the very first attempt
    #[serde(default)]
    pub delay_first_attempt: bool,
}

impl RetryPolicy {
    /// Metadata lookups: one attempt per extraction profile, short pause before each
    pub fn metadata() -> Self {
        Self {
            max_attempts: 3,
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(2),
            delay_first_attempt: true,
        }
    }

    /// Transfers: same operation repeated, longer pause between attempts
    pub fn download() -> Self {
        Self {
            max_attempts: 3,
            min_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
            delay_first_attempt: false,
        }
    }

    /// Policy with no sleeping at all, used by tests and local tooling
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            delay_first_attempt: false,
        }
    }
}

/// Per-phase retry policies
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Policy for metadata lookups
    #[serde(default = "RetryPolicy::metadata")]
    pub metadata: RetryPolicy,

    /// Policy for byte transfers
    #[serde(default = "RetryPolicy::download")]
    pub download: RetryPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            metadata: RetryPolicy::metadata(),
            download: RetryPolicy::download(),
        }
    }
}

/// Reclamation of finished jobs
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExpiryConfig {
    /// Delay after a terminal state before the job and its artifact are removed (default: 300s)
    #[serde(default = "default_ttl", with = "duration_serde")]
    pub ttl: Duration,

    /// Age past terminal state after which a manual sweep evicts a job (default: 3600s)
    #[serde(default = "default_sweep_threshold", with = "duration_serde")]
    pub sweep_threshold: Duration,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            sweep_threshold: default_sweep_threshold(),
        }
    }
}

/// yt-dlp binary discovery and invocation settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Whether to search PATH for yt-dlp if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Network socket timeout handed to the extractor (default: 30s)
    #[serde(default = "default_socket_timeout", with = "duration_serde")]
    pub socket_timeout: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            search_path: true,
            socket_timeout: default_socket_timeout(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:5000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Largest accepted request body in bytes (default: 100 MiB)
    #[serde(default = "default_max_request_body_bytes")]
    pub max_request_body_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            max_request_body_bytes: default_max_request_body_bytes(),
        }
    }
}

/// Main configuration for [`JobManager`](crate::JobManager)
///
/// Every field has a default, so `Config::default()` is a working local setup
/// and a JSON config file only needs to name the values it changes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Directories and output format
    #[serde(default)]
    pub download: DownloadConfig,

    /// Retry policies for metadata and transfers
    #[serde(default)]
    pub retry: RetryConfig,

    /// Timed reclamation of finished jobs
    #[serde(default)]
    pub expiry: ExpiryConfig,

    /// External extractor settings
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// HTTP server settings
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Durable artifact directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }

    /// Root of per-job working directories
    pub fn temp_dir(&self) -> &PathBuf {
        &self.download.temp_dir
    }

    /// Load a configuration from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: &std::path::Path) -> crate::Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| crate::Error::Config {
            message: format!("cannot read {}: {}", path.display(), e),
            key: None,
        })?;
        serde_json::from_str(&raw).map_err(|e| crate::Error::Config {
            message: format!("invalid config file {}: {}", path.display(), e),
            key: None,
        })
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("temp")
}

fn default_format() -> String {
    "best".to_string()
}

fn default_merge_output_format() -> String {
    "mp4".to_string()
}

fn default_true() -> bool {
    true
}

fn default_ttl() -> Duration {
    Duration::from_secs(300)
}

fn default_sweep_threshold() -> Duration {
    Duration::from_secs(3600)
}

fn default_socket_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_max_request_body_bytes() -> usize {
    100 * 1024 * 1024
}

// Durations are written as seconds; fractional values are accepted on input.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_u64(duration.as_secs())
        } else {
            serializer.serialize_f64(duration.as_secs_f64())
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
