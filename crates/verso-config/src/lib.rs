//! Configuration and logging setup for Verso binaries.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once, OnceLock};

use parking_lot::ReentrantMutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt, TestWriter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Top-level `verso.toml` contents.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersoConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub resolve: ResolveConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveConfig {
    /// Resolve symlinks when decoding and normalizing locators.
    ///
    /// When disabled, paths are passed through exactly as given.
    #[serde(default = "ResolveConfig::default_symlinks")]
    pub symlinks: bool,
}

impl ResolveConfig {
    fn default_symlinks() -> bool {
        true
    }
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            symlinks: Self::default_symlinks(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level for all Verso crates.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs in JSON format.
    #[serde(default)]
    pub json: bool,

    /// Write logs to stderr.
    #[serde(default = "LoggingConfig::default_stderr")]
    pub stderr: bool,

    /// Append logs to the given file path.
    ///
    /// If the file cannot be opened, file logging is disabled while stderr logging remains.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    fn default_stderr() -> bool {
        true
    }

    /// The configured `level` as filter directives.
    ///
    /// Bare level names are matched case-insensitively (`WARNING` is accepted for `warn`);
    /// anything else, such as `verso.vfs=trace`, is passed through as a directive string.
    pub(crate) fn level_directives(&self) -> String {
        let level = self.level.trim();
        let lowered = level.to_ascii_lowercase();
        match lowered.as_str() {
            "" => Self::default_level(),
            "warning" => "warn".to_owned(),
            name @ ("trace" | "debug" | "info" | "warn" | "error" | "off") => name.to_owned(),
            _ => level.to_owned(),
        }
    }

    /// Builds the filter for the `verso.*` targets.
    ///
    /// A non-empty `RUST_LOG` is layered over the configured level. Candidates that fail to
    /// parse are skipped, ending at a plain `info` filter.
    pub fn env_filter(&self) -> EnvFilter {
        let configured = self.level_directives();
        let from_env = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        let candidates = match from_env {
            Some(env) => vec![format!("{configured},{env}"), env, configured],
            None => vec![configured],
        };
        candidates
            .iter()
            .find_map(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::default().add_directive(LevelFilter::INFO.into()))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: Self::default_stderr(),
            file: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // Keep the message without the source snippet.
        ConfigError::Toml(err.message().to_owned())
    }
}

impl VersoConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

/// Environment variable that overrides config discovery.
pub const VERSO_CONFIG_ENV_VAR: &str = "VERSO_CONFIG_PATH";

/// File names looked up in the workspace root, highest priority first.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["verso.toml", ".verso.toml"];

static CONFIG_ENV_LOCK: OnceLock<ReentrantMutex<()>> = OnceLock::new();

/// Runs `f` while no other thread reads or writes [`VERSO_CONFIG_ENV_VAR`] through this crate.
///
/// Discovery takes the same lock, so callers that set the variable and then discover can do
/// both inside `f`.
pub fn with_config_env_lock<R>(f: impl FnOnce() -> R) -> R {
    let _guard = CONFIG_ENV_LOCK.get_or_init(|| ReentrantMutex::new(())).lock();
    f()
}

/// Finds the config file for `workspace_root`.
///
/// [`VERSO_CONFIG_ENV_VAR`] wins when set, even if the file it names does not exist; a
/// relative value is taken from `workspace_root`. Otherwise the first of
/// [`CONFIG_FILE_NAMES`] that is a file is returned.
pub fn discover_config_path(workspace_root: &Path) -> Option<PathBuf> {
    let found = with_config_env_lock(|| match std::env::var_os(VERSO_CONFIG_ENV_VAR) {
        Some(value) => Some(workspace_root.join(value)),
        None => CONFIG_FILE_NAMES
            .iter()
            .map(|name| workspace_root.join(name))
            .find(|candidate| candidate.is_file()),
    })?;
    Some(found.canonicalize().unwrap_or(found))
}

/// Discovers and loads the config for `workspace_root`.
///
/// Returns the defaults and `None` when nothing is found; a discovered file that cannot be
/// read or parsed is an error.
pub fn load_for_workspace(
    workspace_root: &Path,
) -> Result<(VersoConfig, Option<PathBuf>), ConfigError> {
    match discover_config_path(workspace_root) {
        Some(path) => Ok((VersoConfig::load_from_path(&path)?, Some(path))),
        None => Ok((VersoConfig::default(), None)),
    }
}

static TRACING_INIT: Once = Once::new();

// Stderr (or nothing), teed into the log file when one is configured and can be opened.
fn log_writer(logging: &LoggingConfig) -> (BoxMakeWriter, Option<io::Error>) {
    let stderr = match (logging.stderr, cfg!(debug_assertions)) {
        // `TestWriter` goes through `eprint!`, which the test harness captures.
        (true, true) => BoxMakeWriter::new(TestWriter::with_stderr),
        (true, false) => BoxMakeWriter::new(io::stderr),
        (false, _) => BoxMakeWriter::new(io::sink),
    };

    let Some(path) = &logging.file else {
        return (stderr, None);
    };
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => (BoxMakeWriter::new(stderr.and(Mutex::new(file))), None),
        Err(err) => (stderr, Some(err)),
    }
}

/// Installs the global `tracing` subscriber described by `logging`.
///
/// Only the first call in a process has any effect.
pub fn init_tracing(logging: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let (writer, file_error) = log_writer(logging);
        let fmt = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false);
        let layer: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = if logging.json {
            fmt.json().boxed()
        } else {
            fmt.boxed()
        };

        let subscriber = tracing_subscriber::registry()
            .with(logging.env_filter())
            .with(layer);
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            return;
        }

        if let (Some(path), Some(err)) = (&logging.file, file_error) {
            tracing::warn!(
                target: "verso.config",
                path = %path.display(),
                error = %err,
                "failed to open log file; file logging disabled"
            );
        }
    });
}
