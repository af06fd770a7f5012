use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration, built once at startup and carried in `AppState`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Absolute path of the ExifTool binary (default: "/usr/bin/exiftool")
    pub exiftool_path: PathBuf,

    /// Directory uploaded files and text reports are written to (default: "uploaded_files")
    pub upload_dir: PathBuf,

    /// Maximum upload size in bytes (default: 256 MB)
    pub max_file_size: usize,

    /// Idle lifetime of a server-side session (default: 30 minutes)
    pub session_ttl: Duration,

    /// How often expired sessions are swept (default: 5 minutes)
    pub session_sweep_interval: Duration,

    /// Upper bound on a single ExifTool invocation (default: 60 seconds)
    pub tool_timeout: Duration,

    /// Mark the session cookie `Secure` (default: false, local tool over plain HTTP)
    pub session_cookie_secure: bool,

    /// Listen address (default: 127.0.0.1:5000)
    pub bind_addr: SocketAddr,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            exiftool_path: PathBuf::from("/usr/bin/exiftool"),
            upload_dir: PathBuf::from("uploaded_files"),
            max_file_size: 256 * 1024 * 1024, // 256 MB
            session_ttl: Duration::from_secs(1800),
            session_sweep_interval: Duration::from_secs(300),
            tool_timeout: Duration::from_secs(60),
            session_cookie_secure: false,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            exiftool_path: env::var("EXIFTOOL_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.exiftool_path),

            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.upload_dir),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            session_ttl: env::var("SESSION_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.session_ttl),

            session_sweep_interval: env::var("SESSION_SWEEP_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.session_sweep_interval),

            tool_timeout: env::var("TOOL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.tool_timeout),

            session_cookie_secure: env::var("SESSION_COOKIE_SECURE")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(default.session_cookie_secure),

            bind_addr: env::var("BIND_ADDR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.bind_addr),
        }
    }

    /// Config for tests and local development: files under the given directory,
    /// short tool timeout.
    pub fn development(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            tool_timeout: Duration::from_secs(10),
            ..Self::default()
        }
    }
}
