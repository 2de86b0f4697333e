//! Configuration loading and resolution
//!
//! Per-field priority order:
//! 1. Environment variable (`TUNEGATE_*`)
//! 2. TOML config file (explicit path, or the platform default)
//! 3. Compiled default
//!
//! A missing config file at the default location is a warning plus
//! defaults, never a startup failure. An explicitly requested config
//! path that cannot be read is an error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Environment variable names, also used by clap `env` fallbacks in
/// the gateway binary.
pub const ENV_BIND_ADDR: &str = "TUNEGATE_BIND_ADDR";
pub const ENV_UPSTREAM_URL: &str = "TUNEGATE_UPSTREAM_URL";
pub const ENV_TIER_TIMEOUT_MS: &str = "TUNEGATE_TIER_TIMEOUT_MS";
pub const ENV_LOG_FILTER: &str = "TUNEGATE_LOG";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:6750";
const DEFAULT_UPSTREAM_URL: &str = "https://music.163.com/api";
const DEFAULT_TIER_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_LOG_FILTER: &str = "tunegate_gw=debug,tower_http=debug";

/// Resolved gateway configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// Socket address the HTTP server binds to.
    pub bind_addr: String,
    /// Base URL of the upstream catalog service.
    pub upstream_base_url: String,
    /// Per-tier upstream call timeout in milliseconds.
    pub tier_timeout_ms: u64,
    /// Default tracing filter when RUST_LOG is unset.
    pub log_filter: String,
}

impl GatewayConfig {
    /// Compiled defaults, used when no other source provides a value.
    pub fn defaults() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            upstream_base_url: DEFAULT_UPSTREAM_URL.to_string(),
            tier_timeout_ms: DEFAULT_TIER_TIMEOUT_MS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    /// Resolve configuration from environment, TOML file, and defaults.
    ///
    /// `config_path`: explicit TOML path (highest-priority file source);
    /// when `None` the platform default location is probed.
    pub fn resolve(config_path: Option<&Path>) -> Result<Self> {
        let toml_config = TomlConfig::load(config_path)?;
        let defaults = Self::defaults();

        Ok(Self {
            bind_addr: resolve_field(ENV_BIND_ADDR, toml_config.bind_addr, defaults.bind_addr),
            upstream_base_url: resolve_field(
                ENV_UPSTREAM_URL,
                toml_config.upstream_base_url,
                defaults.upstream_base_url,
            ),
            tier_timeout_ms: resolve_parsed_field(
                ENV_TIER_TIMEOUT_MS,
                toml_config.tier_timeout_ms,
                defaults.tier_timeout_ms,
            ),
            log_filter: resolve_field(ENV_LOG_FILTER, toml_config.log_filter, defaults.log_filter),
        })
    }

    pub fn tier_timeout(&self) -> Duration {
        Duration::from_millis(self.tier_timeout_ms)
    }
}

/// Raw TOML schema; every field optional so partial files are valid.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub bind_addr: Option<String>,
    pub upstream_base_url: Option<String>,
    pub tier_timeout_ms: Option<u64>,
    pub log_filter: Option<String>,
}

impl TomlConfig {
    /// Load the TOML config from `path`, or from the platform default
    /// location when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        explicit.display()
                    )));
                }
                explicit.to_path_buf()
            }
            None => match default_config_path() {
                Some(default) if default.exists() => default,
                _ => {
                    warn!("No config file found, using compiled defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = std::fs::read_to_string(&path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid TOML in {}: {}", path.display(), e)))
    }
}

/// Platform default config file path (~/.config/tunegate/config.toml
/// on Linux, the equivalent config dir elsewhere).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tunegate").join("config.toml"))
}

fn resolve_field(env_name: &str, toml_value: Option<String>, default: String) -> String {
    let env_value = std::env::var(env_name).ok().filter(|v| !v.trim().is_empty());

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "{} set in both environment and TOML config; using environment (highest priority)",
            env_name
        );
    }

    env_value.or(toml_value).unwrap_or(default)
}

fn resolve_parsed_field(env_name: &str, toml_value: Option<u64>, default: u64) -> u64 {
    if let Ok(raw) = std::env::var(env_name) {
        match raw.parse::<u64>() {
            Ok(value) => return value,
            Err(_) => warn!("{} is not a valid integer, ignoring: {:?}", env_name, raw),
        }
    }
    toml_value.unwrap_or(default)
}
