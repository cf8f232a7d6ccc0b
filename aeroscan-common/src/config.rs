//! Configuration loading and resolution
//!
//! Every setting is resolved independently in this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`AEROSCAN_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: the remaining tiers apply and
//! [`ConfigSource::Missing`] tells the caller so it can warn once logging
//! is up. A TOML file that exists but does not parse is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5730;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_DEFECT_COUNT: usize = 27;
pub const DEFAULT_PHASE_DELAY_MS: u64 = 500;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 1800;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable names
pub const ENV_HOST: &str = "AEROSCAN_HOST";
pub const ENV_PORT: &str = "AEROSCAN_PORT";
pub const ENV_SEED: &str = "AEROSCAN_SEED";
pub const ENV_DEFECT_COUNT: &str = "AEROSCAN_DEFECT_COUNT";
pub const ENV_PHASE_DELAY_MS: &str = "AEROSCAN_PHASE_DELAY_MS";
pub const ENV_SESSION_TTL_SECS: &str = "AEROSCAN_SESSION_TTL_SECS";
pub const ENV_LOG_LEVEL: &str = "AEROSCAN_LOG_LEVEL";

/// Logging section of the TOML file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// On-disk TOML configuration; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub seed: Option<u64>,
    pub defect_count: Option<usize>,
    pub phase_delay_ms: Option<u64>,
    pub session_ttl_secs: Option<u64>,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

/// Values supplied on the command line (highest priority tier)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub seed: Option<u64>,
    pub defect_count: Option<usize>,
    pub phase_delay_ms: Option<u64>,
    pub session_ttl_secs: Option<u64>,
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DemoConfig {
    /// Interface to bind the HTTP server to
    pub host: String,
    /// HTTP port
    pub port: u16,
    /// Seed for synthetic defect and surface generation
    pub seed: u64,
    /// Number of defect records generated per project
    pub defect_count: usize,
    /// Pause after each simulated processing phase
    pub phase_delay_ms: u64,
    /// Idle time after which a session is discarded
    pub session_ttl_secs: u64,
    pub logging: LoggingConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            seed: DEFAULT_SEED,
            defect_count: DEFAULT_DEFECT_COUNT,
            phase_delay_ms: DEFAULT_PHASE_DELAY_MS,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            logging: LoggingConfig::default(),
        }
    }
}

impl DemoConfig {
    /// `host:port` string suitable for `TcpListener::bind`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn phase_delay(&self) -> Duration {
        crate::time::millis_to_duration(self.phase_delay_ms)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Reject settings that would only fail later (empty data set, unbindable host)
    pub fn validate(&self) -> Result<()> {
        if self.defect_count == 0 {
            return Err(Error::Config(
                "defect_count must be at least 1".to_string(),
            ));
        }
        if self.session_ttl_secs == 0 {
            return Err(Error::Config(
                "session_ttl_secs must be at least 1".to_string(),
            ));
        }
        if self.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Default TOML location: `<config_dir>/aeroscan/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("aeroscan").join("config.toml"))
}

/// Where the TOML tier came from during resolution
///
/// Resolution runs before the tracing subscriber exists, so it reports
/// the outcome instead of logging it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// TOML file found and parsed
    File(PathBuf),
    /// TOML path known but no file there
    Missing(PathBuf),
    /// No explicit path and no platform config directory
    NoPath,
}

/// Load a TOML config file
///
/// Returns `Ok(None)` when the file does not exist.
pub fn load_toml_config(path: &Path) -> Result<Option<TomlConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str::<TomlConfig>(&content).map_err(|e| {
        Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e))
    })?;

    Ok(Some(config))
}

/// Resolves a [`DemoConfig`] from all configuration tiers
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    config_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Resolver reading the TOML file at `config_path`, or the platform
    /// default location when `None`
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> Option<PathBuf> {
        self.config_path.clone().or_else(default_config_path)
    }

    pub fn resolve(&self, cli: &ConfigOverrides) -> Result<DemoConfig> {
        self.resolve_with_source(cli).map(|(config, _)| config)
    }

    /// Resolve and report which TOML file, if any, contributed
    pub fn resolve_with_source(
        &self,
        cli: &ConfigOverrides,
    ) -> Result<(DemoConfig, ConfigSource)> {
        let (toml, source) = match self.config_path() {
            Some(path) => match load_toml_config(&path)? {
                Some(toml) => (toml, ConfigSource::File(path)),
                None => (TomlConfig::default(), ConfigSource::Missing(path)),
            },
            None => (TomlConfig::default(), ConfigSource::NoPath),
        };
        let defaults = DemoConfig::default();

        let config = DemoConfig {
            host: pick(cli.host.clone(), env_value(ENV_HOST)?, toml.host, defaults.host),
            port: pick(cli.port, env_value(ENV_PORT)?, toml.port, defaults.port),
            seed: pick(cli.seed, env_value(ENV_SEED)?, toml.seed, defaults.seed),
            defect_count: pick(
                cli.defect_count,
                env_value(ENV_DEFECT_COUNT)?,
                toml.defect_count,
                defaults.defect_count,
            ),
            phase_delay_ms: pick(
                cli.phase_delay_ms,
                env_value(ENV_PHASE_DELAY_MS)?,
                toml.phase_delay_ms,
                defaults.phase_delay_ms,
            ),
            session_ttl_secs: pick(
                cli.session_ttl_secs,
                env_value(ENV_SESSION_TTL_SECS)?,
                toml.session_ttl_secs,
                defaults.session_ttl_secs,
            ),
            logging: LoggingConfig {
                level: pick(
                    cli.log_level.clone(),
                    env_value(ENV_LOG_LEVEL)?,
                    toml.logging.map(|l| l.level),
                    defaults.logging.level,
                ),
            },
        };

        config.validate()?;
        Ok((config, source))
    }
}

fn pick<T>(cli: Option<T>, env: Option<T>, toml: Option<T>, default: T) -> T {
    cli.or(env).or(toml).unwrap_or(default)
}

/// Read and parse an environment variable; unset or empty means absent
fn env_value<T: FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DemoConfig::default();
        assert_eq!(config.bind_address(), "127.0.0.1:5730");
        assert_eq!(config.seed, 42);
        assert_eq!(config.defect_count, 27);
        assert_eq!(config.phase_delay(), Duration::from_millis(500));
        assert_eq!(config.session_ttl(), Duration::from_secs(1800));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_defect_count_rejected() {
        let config = DemoConfig {
            defect_count: 0,
            ..DemoConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_pick_priority() {
        assert_eq!(pick(Some(1), Some(2), Some(3), 4), 1);
        assert_eq!(pick(None, Some(2), Some(3), 4), 2);
        assert_eq!(pick(None, None, Some(3), 4), 3);
        assert_eq!(pick::<i32>(None, None, None, 4), 4);
    }

    #[test]
    fn test_toml_partial_fields_parse() {
        let parsed: TomlConfig = toml::from_str("port = 6000\n[logging]\nlevel = \"debug\"\n").unwrap();
        assert_eq!(parsed.port, Some(6000));
        assert_eq!(parsed.seed, None);
        assert_eq!(parsed.logging.unwrap().level, "debug");
    }
}
