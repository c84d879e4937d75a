use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use atelier_core::paths::JobPaths;

use crate::engine::watcher::WatcherSettings;
use crate::error::{AppError, AppResult};

/// Server configuration loaded from environment variables.
///
/// All fields have defaults matching a local single-user install, so an
/// empty environment is a valid configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `127.0.0.1`).
    pub host: String,
    /// Bind port (default: `8081`).
    pub port: u16,
    /// Directory holding every job file (default: `./tmp`).
    pub tmp_dir: PathBuf,
    /// Directory holding the per-platform trainer binaries (default: `bin`).
    pub bin_dir: PathBuf,
    /// Explicit trainer path. Skips platform lookup when set.
    pub trainer_executable: Option<PathBuf>,
    /// Bundled front-end page (default: `web/index.html`).
    pub ui_file: PathBuf,
    /// Open `ui_file` in the default browser after startup (default: `true`).
    pub open_browser: bool,
    /// Upper bound on how long a stop request waits for the trainer.
    /// `None` waits indefinitely.
    pub stop_timeout: Option<Duration>,
    /// Delay before the watcher takes its first sample (default: 500 ms).
    pub watch_grace: Duration,
    /// Delay between watcher samples (default: 200 ms).
    pub watch_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8081,
            tmp_dir: PathBuf::from("./tmp"),
            bin_dir: PathBuf::from("bin"),
            trainer_executable: None,
            ui_file: PathBuf::from("web/index.html"),
            open_browser: true,
            stop_timeout: None,
            watch_grace: Duration::from_millis(500),
            watch_interval: Duration::from_millis(200),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default          |
    /// |----------------------|------------------|
    /// | `HOST`               | `127.0.0.1`      |
    /// | `PORT`               | `8081`           |
    /// | `TMP_DIR`            | `./tmp`          |
    /// | `BIN_DIR`            | `bin`            |
    /// | `TRAINER_EXECUTABLE` | unset            |
    /// | `UI_FILE`            | `web/index.html` |
    /// | `OPEN_BROWSER`       | `true`           |
    /// | `STOP_TIMEOUT_SECS`  | unset            |
    /// | `WATCH_GRACE_MS`     | `500`            |
    /// | `WATCH_INTERVAL_MS`  | `200`            |
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parse_or(var("PORT"), "PORT", defaults.port)?,
            tmp_dir: var("TMP_DIR").map(PathBuf::from).unwrap_or(defaults.tmp_dir),
            bin_dir: var("BIN_DIR").map(PathBuf::from).unwrap_or(defaults.bin_dir),
            trainer_executable: var("TRAINER_EXECUTABLE").map(PathBuf::from),
            ui_file: var("UI_FILE").map(PathBuf::from).unwrap_or(defaults.ui_file),
            open_browser: parse_or(var("OPEN_BROWSER"), "OPEN_BROWSER", defaults.open_browser)?,
            stop_timeout: var("STOP_TIMEOUT_SECS")
                .map(|v| parse::<u64>(&v, "STOP_TIMEOUT_SECS"))
                .transpose()?
                .map(Duration::from_secs),
            watch_grace: Duration::from_millis(parse_or(
                var("WATCH_GRACE_MS"),
                "WATCH_GRACE_MS",
                defaults.watch_grace.as_millis() as u64,
            )?),
            watch_interval: Duration::from_millis(parse_or(
                var("WATCH_INTERVAL_MS"),
                "WATCH_INTERVAL_MS",
                defaults.watch_interval.as_millis() as u64,
            )?),
        })
    }

    /// Layout of the job files under `tmp_dir`.
    pub fn job_paths(&self) -> JobPaths {
        JobPaths::new(&self.tmp_dir)
    }

    pub fn watcher_settings(&self) -> WatcherSettings {
        WatcherSettings {
            grace: self.watch_grace,
            interval: self.watch_interval,
        }
    }
}

fn parse<T: FromStr>(raw: &str, key: &str) -> AppResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{key} has an invalid value: {raw:?}")))
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &str, default: T) -> AppResult<T> {
    match raw {
        Some(raw) => parse(&raw, key),
        None => Ok(default),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
