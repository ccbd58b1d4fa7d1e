//! Demo configuration
//!
//! Every value has a built-in default, so the demo runs without any file. An optional
//! TOML file overrides individual fields:
//!
//! ```toml
//! [distribution]
//! max_clients = 2
//! unique_id = 0x000307
//! child_index = 0
//! user_name = "Wii U"
//!
//! [session]
//! manual_accept = true
//! channel = 0
//!
//! [poll]
//! interval_ms = 100
//! ```
//!
//! The file is looked up at `$DLPDEMO_CONFIG`, falling back to
//! `<config dir>/dlpdemo/config.toml`.

use crate::dlp::{DistributionParams, SessionPolicy, SimulatorSettings, UserName};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const CONFIG_ENV: &str = "DLPDEMO_CONFIG";
const CONFIG_DIR: &str = "dlpdemo";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub distribution: DistributionConfig,
    pub session: SessionConfig,
    pub poll: PollConfig,
    pub input: InputConfig,
    pub console: ConsoleConfig,
    pub simulator: SimulatorConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DistributionConfig {
    pub max_clients: u8,
    pub unique_id: u32,
    pub child_index: u8,
    /// At most 10 UTF-16 units
    pub user_name: String,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        let params = DistributionParams::default();
        Self {
            max_clients: params.max_clients,
            unique_id: params.unique_id,
            child_index: params.child_index,
            user_name: params.user_name.into(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub manual_accept: bool,
    pub channel: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let policy = SessionPolicy::default();
        Self {
            manual_accept: policy.manual_accept,
            channel: policy.channel,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PollConfig {
    pub interval_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval_ms: 100 }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    /// Pause between two gamepad reads
    pub frame_interval_ms: u64,
    /// Which connected gamepad drives the demo
    pub gamepad_index: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            gamepad_index: 0,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleConfig {
    pub max_lines: usize,
    /// How long the goodbye message stays up before teardown
    pub exit_linger_ms: u64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            max_lines: 18,
            exit_linger_ms: 1000,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SimulatorConfig {
    pub join_interval_ms: u64,
    pub total_units: u32,
    pub units_per_second: u32,
    pub reboot_duration_ms: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        let settings = SimulatorSettings::default();
        Self {
            join_interval_ms: settings.join_interval.as_millis() as u64,
            total_units: settings.total_units,
            units_per_second: settings.units_per_second,
            reboot_duration_ms: settings.reboot_duration.as_millis() as u64,
        }
    }
}

impl Config {
    /// Loads the config file if there is one, otherwise the defaults
    pub fn load() -> Result<Self, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No config directory available, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=16).contains(&self.distribution.max_clients) {
            return Err(ConfigError::Invalid(format!(
                "distribution.max_clients must be between 1 and 16, got {}",
                self.distribution.max_clients
            )));
        }
        self.distribution_params()?;
        if self.poll.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll.interval_ms must not be zero".to_string(),
            ));
        }
        if self.input.frame_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "input.frame_interval_ms must not be zero".to_string(),
            ));
        }
        if self.console.max_lines == 0 {
            return Err(ConfigError::Invalid(
                "console.max_lines must not be zero".to_string(),
            ));
        }
        if self.simulator.join_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "simulator.join_interval_ms must not be zero".to_string(),
            ));
        }
        if self.simulator.units_per_second == 0 {
            return Err(ConfigError::Invalid(
                "simulator.units_per_second must not be zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn distribution_params(&self) -> Result<DistributionParams, ConfigError> {
        let user_name = UserName::new(self.distribution.user_name.as_str())
            .map_err(|e| ConfigError::Invalid(format!("distribution.user_name: {}", e)))?;
        Ok(DistributionParams {
            max_clients: self.distribution.max_clients,
            unique_id: self.distribution.unique_id,
            child_index: self.distribution.child_index,
            user_name,
        })
    }

    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            manual_accept: self.session.manual_accept,
            channel: self.session.channel,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll.interval_ms)
    }

    pub fn simulator_settings(&self) -> SimulatorSettings {
        SimulatorSettings {
            join_interval: Duration::from_millis(self.simulator.join_interval_ms),
            total_units: self.simulator.total_units,
            units_per_second: self.simulator.units_per_second,
            reboot_duration: Duration::from_millis(self.simulator.reboot_duration_ms),
        }
    }
}

fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_demo_constants() {
        let config = Config::default();
        let params = config.distribution_params().unwrap();
        assert_eq!(params.max_clients, 2);
        assert_eq!(params.unique_id, 0x000307);
        assert_eq!(params.child_index, 0);
        assert_eq!(params.user_name.as_str(), "Wii U");
        assert_eq!(config.session_policy(), SessionPolicy::default());
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [distribution]
            unique_id = 0x000abc
            user_name = "Host"

            [poll]
            interval_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.distribution.unique_id, 0xabc);
        assert_eq!(config.distribution.user_name, "Host");
        assert_eq!(config.distribution.max_clients, 2);
        assert_eq!(config.poll.interval_ms, 250);
        assert_eq!(config.console, ConsoleConfig::default());
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            Config::from_toml_str("[distribution]\nmax_clients = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[poll]\ninterval_ms = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[distribution]\nuser_name = \"far too long a name\""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[distribution]\nuser_name = \"\""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[session]\nautostart = true"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn rejects_zero_rates_and_intervals() {
        for content in [
            "[input]\nframe_interval_ms = 0",
            "[simulator]\nunits_per_second = 0",
            "[simulator]\njoin_interval_ms = 0",
        ] {
            assert!(
                matches!(Config::from_toml_str(content), Err(ConfigError::Invalid(_))),
                "accepted {content:?}"
            );
        }
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("dlpdemo-missing-config-for-test.toml");
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }
}
