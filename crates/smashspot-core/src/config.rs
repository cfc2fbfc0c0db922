// Configuration loading and parsing (engine.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub eligibility: EligibilityConfig,
    pub percentile: PercentileConfig,
    pub props: PropsConfig,
    pub feed: FeedConfig,
    pub server_port: u16,
    pub db_path: String,
}

// ---------------------------------------------------------------------------
// engine.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire engine.toml file.
#[derive(Debug, Clone, Deserialize)]
struct EngineFile {
    eligibility: EligibilityConfig,
    percentile: PercentileConfig,
    #[serde(default)]
    props: PropsConfig,
    feed: FeedConfig,
    server: ServerSection,
    database: DatabaseSection,
}

#[derive(Debug, Clone, Deserialize)]
struct ServerSection {
    port: u16,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

/// Season-volume minimums and the strict prop-inclusion switch. These are
/// per deployment, never per request.
#[derive(Debug, Clone, Deserialize)]
pub struct EligibilityConfig {
    pub min_targets: u32,
    pub min_rush_attempts: u32,
    pub min_pass_attempts: u32,
    /// Exclude players without a canonical prop quote for the game.
    pub require_prop: bool,
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            min_targets: 20,
            min_rush_attempts: 30,
            min_pass_attempts: 100,
            require_prop: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PercentileConfig {
    /// Fewer teams than this with a valid value -> neutral percentiles.
    pub min_teams: usize,
}

impl Default for PercentileConfig {
    fn default() -> Self {
        Self { min_teams: 8 }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropsConfig {
    /// Quotes older than this (relative to the request time) are treated as
    /// absent. `None` disables the window.
    #[serde(default)]
    pub max_quote_age_hours: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    pub flags_per_player: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_limit: 25,
            max_limit: 200,
            flags_per_player: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/engine.toml` relative to
/// `base_dir`. Does not copy defaults; see [`load_config`].
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let engine_path = base_dir.join("config").join("engine.toml");
    let text = read_file(&engine_path)?;
    let file: EngineFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: engine_path.clone(),
        source: e,
    })?;

    let config = Config {
        eligibility: file.eligibility,
        percentile: file.percentile,
        props: file.props,
        feed: file.feed,
        server_port: file.server.port,
        db_path: file.database.path,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to `base_dir` after copying
/// any missing defaults into place.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let e = &config.eligibility;
    let minimums: &[(&str, u32)] = &[
        ("eligibility.min_targets", e.min_targets),
        ("eligibility.min_rush_attempts", e.min_rush_attempts),
        ("eligibility.min_pass_attempts", e.min_pass_attempts),
    ];
    for (name, val) in minimums {
        if *val == 0 {
            return Err(invalid(name, "must be > 0"));
        }
    }

    if config.percentile.min_teams < 2 {
        return Err(invalid(
            "percentile.min_teams",
            format!("must be at least 2, got {}", config.percentile.min_teams),
        ));
    }

    if config.props.max_quote_age_hours == Some(0) {
        return Err(invalid(
            "props.max_quote_age_hours",
            "must be > 0 when set; omit it to disable the window",
        ));
    }

    let feed = &config.feed;
    if feed.default_limit == 0 {
        return Err(invalid("feed.default_limit", "must be > 0"));
    }
    if feed.default_limit > feed.max_limit {
        return Err(invalid(
            "feed.default_limit",
            format!(
                "must not exceed feed.max_limit ({}), got {}",
                feed.max_limit, feed.default_limit
            ),
        ));
    }
    if !(2..=3).contains(&feed.flags_per_player) {
        return Err(invalid(
            "feed.flags_per_player",
            format!("must be 2 or 3, got {}", feed.flags_per_player),
        ));
    }

    if config.db_path.trim().is_empty() {
        return Err(invalid("database.path", "must not be empty"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
