//! Toolkit-wide configuration with environment and config file overrides.
//!
//! # Configuration Precedence
//!
//! Settings are resolved in this order (highest priority first):
//!
//! 1. **Programmatic**: fields set on [`PacerConfig`] after loading
//! 2. **Environment variables**: values from `PACER_*` env vars
//! 3. **Config file**: values loaded from a TOML file (requires `config-file` feature)
//! 4. **Defaults**: [`PacerConfig::default()`]
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `PACER_DEBOUNCE_WAIT_MS` | `u64` | `debounce.wait` |
//! | `PACER_DEBOUNCE_LEADING` | `bool` | `debounce.leading` |
//! | `PACER_DEBOUNCE_TRAILING` | `bool` | `debounce.trailing` |
//! | `PACER_THROTTLE_WAIT_MS` | `u64` | `throttle.wait` |
//! | `PACER_THROTTLE_LEADING` | `bool` | `throttle.leading` |
//! | `PACER_THROTTLE_TRAILING` | `bool` | `throttle.trailing` |
//! | `PACER_RUNNER_CONCURRENCY` | `usize` | `runner_concurrency` |
//! | `PACER_RUNNER_FAILURE_HISTORY` | `usize` | `runner_failure_history` |
//! | `PACER_MAX_STEPS` | `u64` | `event_loop.max_steps` (`0` disables the limit) |

use crate::error::{Error, Result};
use crate::limiter::{DebounceOptions, ThrottleOptions};
use crate::runtime::LoopConfig;
use std::time::Duration;

/// Environment variable name for the debounce quiet period.
pub const ENV_DEBOUNCE_WAIT_MS: &str = "PACER_DEBOUNCE_WAIT_MS";
/// Environment variable name for the debounce leading edge.
pub const ENV_DEBOUNCE_LEADING: &str = "PACER_DEBOUNCE_LEADING";
/// Environment variable name for the debounce trailing edge.
pub const ENV_DEBOUNCE_TRAILING: &str = "PACER_DEBOUNCE_TRAILING";
/// Environment variable name for the throttle window.
pub const ENV_THROTTLE_WAIT_MS: &str = "PACER_THROTTLE_WAIT_MS";
/// Environment variable name for the throttle leading edge.
pub const ENV_THROTTLE_LEADING: &str = "PACER_THROTTLE_LEADING";
/// Environment variable name for the throttle trailing edge.
pub const ENV_THROTTLE_TRAILING: &str = "PACER_THROTTLE_TRAILING";
/// Environment variable name for the task runner concurrency limit.
pub const ENV_RUNNER_CONCURRENCY: &str = "PACER_RUNNER_CONCURRENCY";
/// Environment variable name for how many failures a task runner retains.
pub const ENV_RUNNER_FAILURE_HISTORY: &str = "PACER_RUNNER_FAILURE_HISTORY";
/// Environment variable name for the event loop step limit.
pub const ENV_MAX_STEPS: &str = "PACER_MAX_STEPS";

/// Configuration for the toolkit's components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacerConfig {
    /// Options for debounces built from this config.
    pub debounce: DebounceOptions,
    /// Options for throttles built from this config.
    pub throttle: ThrottleOptions,
    /// Concurrency limit for task runners built from this config.
    pub runner_concurrency: usize,
    /// How many recent failures a task runner keeps for
    /// [`take_failures`](crate::runner::TaskRunner::take_failures).
    pub runner_failure_history: usize,
    /// Event loop settings.
    pub event_loop: LoopConfig,
}

impl PacerConfig {
    /// Default task runner concurrency.
    pub const DEFAULT_RUNNER_CONCURRENCY: usize = 4;

    /// Default number of failures a task runner retains.
    pub const DEFAULT_RUNNER_FAILURE_HISTORY: usize = 64;

    /// Loads the defaults with environment overrides applied, then validates.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidConfig`](crate::error::ErrorKind::InvalidConfig)
    /// if a variable is set to an unparseable value or the result is invalid.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML file over the defaults, applies environment overrides on
    /// top, then validates.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidConfig`](crate::error::ErrorKind::InvalidConfig)
    /// if the file cannot be read or parsed, a variable is unparseable, or the
    /// result is invalid.
    #[cfg(feature = "config-file")]
    pub fn from_toml_file(path: &std::path::Path) -> Result<Self> {
        let toml = parse_toml_file(path)?;
        let mut config = Self::default();
        apply_toml_config(&mut config, &toml);
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `PACER_*` environment variables that are set.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidConfig`](crate::error::ErrorKind::InvalidConfig)
    /// if a variable is set but contains an unparseable value.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Applies overrides read through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidConfig`](crate::error::ErrorKind::InvalidConfig)
    /// if a value is unparseable.
    pub fn apply_overrides_from<L>(&mut self, lookup: L) -> Result<()>
    where
        L: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup(ENV_DEBOUNCE_WAIT_MS) {
            self.debounce.wait = Duration::from_millis(parse_u64(ENV_DEBOUNCE_WAIT_MS, &val)?);
        }
        if let Some(val) = lookup(ENV_DEBOUNCE_LEADING) {
            self.debounce.leading = parse_bool(ENV_DEBOUNCE_LEADING, &val)?;
        }
        if let Some(val) = lookup(ENV_DEBOUNCE_TRAILING) {
            self.debounce.trailing = parse_bool(ENV_DEBOUNCE_TRAILING, &val)?;
        }
        if let Some(val) = lookup(ENV_THROTTLE_WAIT_MS) {
            self.throttle.wait = Duration::from_millis(parse_u64(ENV_THROTTLE_WAIT_MS, &val)?);
        }
        if let Some(val) = lookup(ENV_THROTTLE_LEADING) {
            self.throttle.leading = parse_bool(ENV_THROTTLE_LEADING, &val)?;
        }
        if let Some(val) = lookup(ENV_THROTTLE_TRAILING) {
            self.throttle.trailing = parse_bool(ENV_THROTTLE_TRAILING, &val)?;
        }
        if let Some(val) = lookup(ENV_RUNNER_CONCURRENCY) {
            self.runner_concurrency = parse_usize(ENV_RUNNER_CONCURRENCY, &val)?;
        }
        if let Some(val) = lookup(ENV_RUNNER_FAILURE_HISTORY) {
            self.runner_failure_history = parse_usize(ENV_RUNNER_FAILURE_HISTORY, &val)?;
        }
        if let Some(val) = lookup(ENV_MAX_STEPS) {
            self.event_loop.max_steps = step_limit(parse_u64(ENV_MAX_STEPS, &val)?);
        }
        Ok(())
    }

    /// Checks that the configuration can build working components.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidConcurrency`](crate::error::ErrorKind::InvalidConcurrency)
    /// for a zero runner concurrency, and
    /// [`ErrorKind::InvalidConfig`](crate::error::ErrorKind::InvalidConfig)
    /// for a zero step limit.
    pub fn validate(&self) -> Result<()> {
        if self.runner_concurrency == 0 {
            return Err(Error::invalid_concurrency(self.runner_concurrency));
        }
        if self.event_loop.max_steps == Some(0) {
            return Err(Error::invalid_config(
                "event loop step limit must be at least 1 (use no limit instead of 0)",
            ));
        }
        Ok(())
    }
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            debounce: DebounceOptions::default(),
            throttle: ThrottleOptions::default(),
            runner_concurrency: Self::DEFAULT_RUNNER_CONCURRENCY,
            runner_failure_history: Self::DEFAULT_RUNNER_FAILURE_HISTORY,
            event_loop: LoopConfig::default(),
        }
    }
}

/// `0` in external configuration means "no step limit".
const fn step_limit(raw: u64) -> Option<u64> {
    if raw == 0 {
        None
    } else {
        Some(raw)
    }
}

fn parse_u64(var_name: &str, val: &str) -> Result<u64> {
    val.trim().parse::<u64>().map_err(|e| {
        Error::invalid_config(format!(
            "invalid value for {var_name}: expected unsigned integer, got {val:?}"
        ))
        .with_source(e)
    })
}

fn parse_usize(var_name: &str, val: &str) -> Result<usize> {
    val.trim().parse::<usize>().map_err(|e| {
        Error::invalid_config(format!(
            "invalid value for {var_name}: expected unsigned integer, got {val:?}"
        ))
        .with_source(e)
    })
}

fn parse_bool(var_name: &str, val: &str) -> Result<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::invalid_config(format!(
            "invalid value for {var_name}: expected bool (true/false/1/0/yes/no), got {val:?}"
        ))),
    }
}

// =========================================================================
// TOML config file support (feature-gated)
// =========================================================================

/// TOML-deserializable toolkit configuration.
///
/// ```toml
/// [debounce]
/// wait_ms = 250
/// leading = true
/// trailing = false
///
/// [throttle]
/// wait_ms = 100
///
/// [runner]
/// concurrency = 8
/// failure_history = 16
///
/// [event_loop]
/// max_steps = 0   # no limit
/// ```
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct PacerTomlConfig {
    /// Debounce defaults.
    #[serde(default)]
    pub debounce: EdgeToml,
    /// Throttle defaults.
    #[serde(default)]
    pub throttle: EdgeToml,
    /// Task runner settings.
    #[serde(default)]
    pub runner: RunnerToml,
    /// Event loop settings.
    #[serde(default)]
    pub event_loop: EventLoopToml,
}

/// Debounce or throttle section of the TOML config.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct EdgeToml {
    /// Wait or window length in milliseconds.
    pub wait_ms: Option<u64>,
    /// Fire on the leading edge.
    pub leading: Option<bool>,
    /// Fire on the trailing edge.
    pub trailing: Option<bool>,
}

/// Runner section of the TOML config.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct RunnerToml {
    /// Concurrency limit.
    pub concurrency: Option<usize>,
    /// Failures retained (`0` keeps none).
    pub failure_history: Option<usize>,
}

/// Event loop section of the TOML config.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct EventLoopToml {
    /// Step limit per driving call (`0` = no limit).
    pub max_steps: Option<u64>,
}

/// Apply a parsed TOML config to a [`PacerConfig`].
///
/// Only fields present in the file override the config.
#[cfg(feature = "config-file")]
pub fn apply_toml_config(config: &mut PacerConfig, toml: &PacerTomlConfig) {
    if let Some(v) = toml.debounce.wait_ms {
        config.debounce.wait = Duration::from_millis(v);
    }
    if let Some(v) = toml.debounce.leading {
        config.debounce.leading = v;
    }
    if let Some(v) = toml.debounce.trailing {
        config.debounce.trailing = v;
    }
    if let Some(v) = toml.throttle.wait_ms {
        config.throttle.wait = Duration::from_millis(v);
    }
    if let Some(v) = toml.throttle.leading {
        config.throttle.leading = v;
    }
    if let Some(v) = toml.throttle.trailing {
        config.throttle.trailing = v;
    }
    if let Some(v) = toml.runner.concurrency {
        config.runner_concurrency = v;
    }
    if let Some(v) = toml.runner.failure_history {
        config.runner_failure_history = v;
    }
    if let Some(v) = toml.event_loop.max_steps {
        config.event_loop.max_steps = step_limit(v);
    }
}

/// Parse a TOML string into a [`PacerTomlConfig`].
///
/// # Errors
///
/// Returns [`ErrorKind::InvalidConfig`](crate::error::ErrorKind::InvalidConfig)
/// if the string is not valid TOML for this layout.
#[cfg(feature = "config-file")]
pub fn parse_toml_str(toml_str: &str) -> Result<PacerTomlConfig> {
    toml::from_str(toml_str)
        .map_err(|e| Error::invalid_config("failed to parse TOML config").with_source(e))
}

/// Read and parse a TOML file into a [`PacerTomlConfig`].
///
/// # Errors
///
/// Returns [`ErrorKind::InvalidConfig`](crate::error::ErrorKind::InvalidConfig)
/// if the file cannot be read or parsed.
#[cfg(feature = "config-file")]
pub fn parse_toml_file(path: &std::path::Path) -> Result<PacerTomlConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::invalid_config(format!("failed to read config file {}", path.display()))
            .with_source(e)
    })?;
    parse_toml_str(&content)
}

// =========================================================================
// Tests
// =========================================================================
