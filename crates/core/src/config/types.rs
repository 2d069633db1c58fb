use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum accepted request body for multipart uploads, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

fn default_max_upload_bytes() -> usize {
    2 * 1024 * 1024 * 1024
}

/// Configuration for the merge pipeline (workspace, encoder, output).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Directory under which per-merge workspaces are created.
    #[serde(default = "default_temp_root")]
    pub temp_root: PathBuf,

    /// Where finished merges are moved before the workspace is removed.
    /// When unset the reported path points inside the (already removed) workspace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Timeout for a single ffmpeg invocation in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum merges running at the same time.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,

    /// File name of the merged output inside the workspace.
    #[serde(default = "default_output_file_name")]
    pub output_file_name: String,

    /// Additional ffmpeg arguments, inserted before the output path.
    #[serde(default)]
    pub extra_ffmpeg_args: Vec<String>,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_temp_root() -> PathBuf {
    std::env::temp_dir()
}

fn default_timeout() -> u64 {
    3600 // 1 hour
}

fn default_max_concurrent() -> usize {
    4
}

fn default_log_level() -> String {
    "error".to_string()
}

fn default_output_file_name() -> String {
    "merged_video.mp4".to_string()
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            temp_root: default_temp_root(),
            output_dir: None,
            timeout_secs: default_timeout(),
            max_concurrent: default_max_concurrent(),
            ffmpeg_log_level: default_log_level(),
            output_file_name: default_output_file_name(),
            extra_ffmpeg_args: Vec::new(),
        }
    }
}

impl MergeConfig {
    /// Sets the ffmpeg binary path.
    pub fn with_ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    /// Sets the workspace root.
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = root.into();
        self
    }

    /// Sets the directory finished merges are moved to.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets the maximum concurrent merges.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }
}

/// Remote fetch limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// URL schemes accepted for remote inputs.
    #[serde(default = "default_allowed_schemes")]
    pub allowed_schemes: Vec<String>,

    /// Hosts accepted for remote inputs. Empty means any host.
    #[serde(default)]
    pub allowed_hosts: Vec<String>,

    /// Maximum size of a single fetched file in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,

    /// Whole-request timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Maximum redirects followed per request.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_allowed_schemes() -> Vec<String> {
    vec!["http".to_string(), "https".to_string()]
}

fn default_max_bytes() -> u64 {
    2 * 1024 * 1024 * 1024
}

fn default_fetch_timeout() -> u64 {
    600
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_redirects() -> usize {
    5
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            allowed_schemes: default_allowed_schemes(),
            allowed_hosts: Vec::new(),
            max_bytes: default_max_bytes(),
            timeout_secs: default_fetch_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            max_redirects: default_max_redirects(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Sanitized config for API responses
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub merge: SanitizedMergeConfig,
    pub fetch: SanitizedFetchConfig,
}

/// Merge config without local filesystem layout.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedMergeConfig {
    pub timeout_secs: u64,
    pub max_concurrent: usize,
    pub output_file_name: String,
    pub persists_output: bool,
}

/// Fetch config without the host allowlist contents.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedFetchConfig {
    pub allowed_schemes: Vec<String>,
    pub host_allowlist_configured: bool,
    pub max_bytes: u64,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            merge: SanitizedMergeConfig {
                timeout_secs: config.merge.timeout_secs,
                max_concurrent: config.merge.max_concurrent,
                output_file_name: config.merge.output_file_name.clone(),
                persists_output: config.merge.output_dir.is_some(),
            },
            fetch: SanitizedFetchConfig {
                allowed_schemes: config.fetch.allowed_schemes.clone(),
                host_allowlist_configured: !config.fetch.allowed_hosts.is_empty(),
                max_bytes: config.fetch.max_bytes,
                timeout_secs: config.fetch.timeout_secs,
            },
        }
    }
}
