// Configuration loading and parsing (scout.toml, credentials.toml).

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

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub grid: GridConfig,
    pub cache: CacheConfig,
    pub analysis: AnalysisConfig,
    pub credentials: CredentialsConfig,
}

// ---------------------------------------------------------------------------
// scout.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire scout.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ScoutFile {
    server: ServerConfig,
    grid: GridConfig,
    cache: CacheConfig,
    analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// GRID endpoint settings and the retry policy for upstream calls.
#[derive(Debug, Clone, Deserialize)]
pub struct GridConfig {
    pub central_data_url: String,
    pub series_state_url: String,
    pub timeout_secs: u64,
    /// Total attempts per request, including the first.
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

/// TTLs for the read-through telemetry caches. Team metadata moves rarely,
/// series listings roll over between matches, and live series detail is the
/// most volatile of the three.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub team_ttl_secs: u64,
    pub series_list_ttl_secs: u64,
    pub series_state_ttl_secs: u64,
}

/// Tunable thresholds for the analysis engine. The veto fields feed
/// `VetoPolicy`, the buy-rate fields the economy buckets, and
/// `advantage_threshold` the head-to-head comparator (percentage points).
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    pub veto_prior_games: f64,
    pub veto_ban_threshold: f64,
    pub veto_must_ban_threshold: f64,
    pub advantage_threshold: f64,
    pub force_buy_often: f64,
    pub force_buy_rarely: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            veto_prior_games: 8.0,
            veto_ban_threshold: 10.0,
            veto_must_ban_threshold: 25.0,
            advantage_threshold: 10.0,
            force_buy_often: 0.20,
            force_buy_rarely: 0.05,
        }
    }
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub grid_api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/scout.toml` and (optionally)
/// `config/credentials.toml`, both relative to the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- scout.toml (required) ---
    let scout_path = config_dir.join("scout.toml");
    let scout_text = read_file(&scout_path)?;
    let scout_file: ScoutFile =
        toml::from_str(&scout_text).map_err(|e| ConfigError::ParseError {
            path: scout_path.clone(),
            source: e,
        })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        server: scout_file.server,
        grid: scout_file.grid,
        cache: scout_file.cache,
        analysis: scout_file.analysis,
        credentials,
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
        // Without defaults/ the only workable state is an already-populated
        // config/ directory.
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
        let path = entry
            .map_err(|e| ConfigError::DefaultsCopyError {
                message: format!("failed to read defaults entry: {e}"),
            })?
            .path();

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !path.is_file() || name.ends_with(".example") {
            continue;
        }

        let target = config_dir.join(name);
        if copy_if_missing(&path, &target)? {
            copied.push(target);
        }
    }

    Ok(copied)
}

/// Copy `src` to `dst` unless `dst` already exists. Returns whether a copy
/// happened.
fn copy_if_missing(src: &Path, dst: &Path) -> Result<bool, ConfigError> {
    let mut dest = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dst)
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => {
            return Err(ConfigError::DefaultsCopyError {
                message: format!("failed to create {}: {e}", dst.display()),
            })
        }
    };

    let content = std::fs::read(src).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read {}: {e}", src.display()),
    })?;
    std::io::Write::write_all(&mut dest, &content).map_err(|e| {
        ConfigError::DefaultsCopyError {
            message: format!("failed to write {}: {e}", dst.display()),
        }
    })?;

    Ok(true)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError {
            field: "server.port".into(),
            message: "must be greater than 0".into(),
        });
    }

    // Timeouts and TTLs must all be positive
    let duration_fields: &[(&str, u64)] = &[
        ("grid.timeout_secs", config.grid.timeout_secs),
        ("cache.team_ttl_secs", config.cache.team_ttl_secs),
        (
            "cache.series_list_ttl_secs",
            config.cache.series_list_ttl_secs,
        ),
        (
            "cache.series_state_ttl_secs",
            config.cache.series_state_ttl_secs,
        ),
    ];
    for (name, val) in duration_fields {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be > 0".into(),
            });
        }
    }

    if config.grid.max_retries == 0 {
        return Err(ConfigError::ValidationError {
            field: "grid.max_retries".into(),
            message: "must be at least 1".into(),
        });
    }

    // Analysis thresholds
    let a = &config.analysis;
    if a.veto_prior_games <= 0.0 {
        return Err(ConfigError::ValidationError {
            field: "analysis.veto_prior_games".into(),
            message: format!("must be > 0, got {}", a.veto_prior_games),
        });
    }
    if a.veto_ban_threshold <= 0.0 {
        return Err(ConfigError::ValidationError {
            field: "analysis.veto_ban_threshold".into(),
            message: format!("must be > 0, got {}", a.veto_ban_threshold),
        });
    }
    if a.veto_must_ban_threshold <= a.veto_ban_threshold {
        return Err(ConfigError::ValidationError {
            field: "analysis.veto_must_ban_threshold".into(),
            message: format!(
                "must be greater than veto_ban_threshold ({}), got {}",
                a.veto_ban_threshold, a.veto_must_ban_threshold
            ),
        });
    }
    if a.advantage_threshold <= 0.0 {
        return Err(ConfigError::ValidationError {
            field: "analysis.advantage_threshold".into(),
            message: format!("must be > 0, got {}", a.advantage_threshold),
        });
    }
    if a.force_buy_rarely <= 0.0 || a.force_buy_rarely >= a.force_buy_often {
        return Err(ConfigError::ValidationError {
            field: "analysis.force_buy_rarely".into(),
            message: format!(
                "must be between 0 and force_buy_often ({}), got {}",
                a.force_buy_often, a.force_buy_rarely
            ),
        });
    }
    if a.force_buy_often >= 1.0 {
        return Err(ConfigError::ValidationError {
            field: "analysis.force_buy_often".into(),
            message: format!("must be < 1, got {}", a.force_buy_often),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
