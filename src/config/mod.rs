// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration for the composer.
//!
//! A config file is TOML or YAML, chosen by extension. Every field has a
//! default, so an empty file is a valid configuration. The service URL
//! can be overridden with `COMPOSER_SERVICE_URL`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::export::{CompositionEncoder, EncoderOptions, Exporter, FileNaming};
use crate::live::{LiveOptions, LiveSession};
use crate::service::http::DEFAULT_BASE_URL;
use crate::session::identity::DEFAULT_LOGOUT_DELAY;
use crate::session::transcript::DEFAULT_MAX_ENTRIES;
use crate::session::{AuthStrategy, Capabilities, SessionOptions, UserProfile};

/// Environment variable overriding `service.base_url`
pub const SERVICE_URL_ENV: &str = "COMPOSER_SERVICE_URL";

/// Invalid configuration values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Root configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    pub service: ServiceConfig,
    pub session: SessionConfig,
    pub capabilities: Capabilities,
    pub encoder: EncoderConfig,
    pub live: LiveOptions,
}

impl ComposerConfig {
    /// Load from a `.toml`, `.yaml` or `.yml` file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&contents),
            Some("yaml") | Some("yml") => Self::from_yaml(&contents),
            other => bail!("Unsupported config format {:?} for {:?}", other, path),
        }
    }

    /// Parse TOML
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse TOML configuration")
    }

    /// Parse YAML
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("Failed to parse YAML configuration")
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }

    /// Apply environment overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(SERVICE_URL_ENV) {
            if !url.trim().is_empty() {
                self.service.base_url = url.trim().to_string();
            }
        }
        self
    }

    /// Reject out-of-range values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.base_url.trim().is_empty() {
            return Err(invalid("service.base_url", "must not be empty"));
        }
        if self.session.max_entries == 0 {
            return Err(invalid("session.max_entries", "must be at least 1"));
        }

        let encoder = &self.encoder.options;
        if !(20.0..=300.0).contains(&encoder.tempo) {
            return Err(invalid("encoder.tempo", format!("{} is outside 20-300 BPM", encoder.tempo)));
        }
        if !(1..=127).contains(&encoder.velocity) {
            return Err(invalid("encoder.velocity", format!("{} is outside 1-127", encoder.velocity)));
        }
        if encoder.channel > 15 {
            return Err(invalid("encoder.channel", format!("{} is outside 0-15", encoder.channel)));
        }
        if encoder.ppqn == 0 || encoder.ppqn > 0x7FFF {
            return Err(invalid("encoder.ppqn", format!("{} is outside 1-32767", encoder.ppqn)));
        }
        let (numerator, denominator) = encoder.time_signature;
        if numerator == 0 || !denominator.is_power_of_two() {
            return Err(invalid(
                "encoder.time_signature",
                format!("{}/{} is not a valid meter", numerator, denominator),
            ));
        }

        if self.live.wake_phrases.iter().all(|p| p.trim().is_empty()) {
            return Err(invalid("live.wake_phrases", "needs at least one phrase"));
        }
        if self.live.input_sample_rate == 0 || self.live.output_sample_rate == 0 {
            return Err(invalid("live", "sample rates must be positive"));
        }
        Ok(())
    }

    /// Auth strategy from the session section
    pub fn auth_strategy(&self) -> AuthStrategy {
        match self.session.auth {
            AuthMode::ClientToken => AuthStrategy::ClientToken,
            AuthMode::ServerSession => AuthStrategy::ServerSession {
                logout_delay: Duration::from_millis(self.session.logout_delay_ms),
            },
            AuthMode::HostedRuntime => AuthStrategy::HostedRuntime,
        }
    }

    /// Controller settings
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            strategy: self.auth_strategy(),
            capabilities: self.capabilities,
            max_entries: self.session.max_entries,
            hands_free: self.session.hands_free,
        }
    }

    /// Live voice session, when the host offers one
    pub fn live_session(&self) -> Option<LiveSession> {
        self.capabilities
            .live_session
            .then(|| LiveSession::new(self.live.clone()))
    }

    /// Exporter using the encoder section
    pub fn exporter(&self) -> Exporter {
        Exporter::new(
            Some(CompositionEncoder::new(self.encoder.options)),
            self.encoder.file_naming,
        )
    }
}

/// Composition service settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL; requests go to `<base_url>/api/compose`
    pub base_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Authentication mode names used in config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    ClientToken,
    #[default]
    ServerSession,
    HostedRuntime,
}

/// Session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub auth: AuthMode,
    /// Delay before the logged-out view after an expired session
    pub logout_delay_ms: u64,
    /// Transcript retention limit
    pub max_entries: usize,
    /// Submit spoken prompts without confirmation
    pub hands_free: bool,
    /// Profile for server-session and hosted-runtime identity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auth: AuthMode::default(),
            logout_delay_ms: DEFAULT_LOGOUT_DELAY.as_millis() as u64,
            max_entries: DEFAULT_MAX_ENTRIES,
            hands_free: false,
            user: None,
        }
    }
}

/// Encoder and export settings
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    #[serde(flatten)]
    pub options: EncoderOptions,
    pub file_naming: FileNaming,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::InstrumentPolicy;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = ComposerConfig::default();
        assert_eq!(config.service.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.session.max_entries, 200);
        assert_eq!(config.encoder.options.ppqn, 128);
        assert_eq!(
            config.auth_strategy(),
            AuthStrategy::ServerSession {
                logout_delay: Duration::from_millis(3000)
            }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[service]
base_url = "https://composer.example.com"

[session]
auth = "client_token"
hands_free = true

[capabilities]
search_mode = true

[encoder]
tempo = 90.0
instrument_policy = "strict"
file_naming = "fixed"

[live]
wake_phrases = ["hey composer"]
"#;
        let config = ComposerConfig::from_toml(toml).unwrap();
        assert_eq!(config.service.base_url, "https://composer.example.com");
        assert_eq!(config.auth_strategy(), AuthStrategy::ClientToken);
        assert!(config.session.hands_free);
        assert!(config.capabilities.search_mode);
        assert!(config.capabilities.voice_input);
        assert_eq!(config.encoder.options.tempo, 90.0);
        assert_eq!(config.encoder.options.velocity, 64);
        assert_eq!(config.encoder.options.instrument_policy, InstrumentPolicy::Strict);
        assert_eq!(config.encoder.file_naming, FileNaming::Fixed);
        assert_eq!(config.live.wake_phrases, vec!["hey composer".to_string()]);
        assert_eq!(config.live.voice, "Zephyr");
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
session:
  auth: hosted_runtime
  max_entries: 50
  user:
    id: "guest"
    name: "Guest"
encoder:
  velocity: 100
"#;
        let config = ComposerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.auth_strategy(), AuthStrategy::HostedRuntime);
        assert_eq!(config.session_options().max_entries, 50);
        assert_eq!(config.session.user.as_ref().map(|u| u.name.as_str()), Some("Guest"));
        assert_eq!(config.encoder.options.velocity, 100);
    }

    #[test]
    fn test_empty_files_are_defaults() {
        assert_eq!(ComposerConfig::from_toml("").unwrap(), ComposerConfig::default());
        assert_eq!(ComposerConfig::from_yaml("").unwrap(), ComposerConfig::default());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = ComposerConfig::default();
        config.encoder.options.channel = 16;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "encoder.channel", .. })
        ));

        let mut config = ComposerConfig::default();
        config.encoder.options.time_signature = (3, 3);
        assert!(config.validate().is_err());

        let mut config = ComposerConfig::default();
        config.live.wake_phrases = vec![" ".to_string()];
        assert!(config.validate().is_err());

        let mut config = ComposerConfig::default();
        config.session.max_entries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempdir().unwrap();
        let toml_path = dir.path().join("composer.toml");
        fs::write(&toml_path, "[session]\nlogout_delay_ms = 500\n").unwrap();
        let config = ComposerConfig::load(&toml_path).unwrap();
        assert_eq!(
            config.auth_strategy().forced_logout_delay(),
            Some(Duration::from_millis(500))
        );

        let yaml_path = dir.path().join("composer.yml");
        fs::write(&yaml_path, "service:\n  base_url: http://127.0.0.1:9000\n").unwrap();
        assert_eq!(
            ComposerConfig::load(&yaml_path).unwrap().service.base_url,
            "http://127.0.0.1:9000"
        );

        let other = dir.path().join("composer.ini");
        fs::write(&other, "").unwrap();
        assert!(ComposerConfig::load(&other).is_err());
        assert!(ComposerConfig::load(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_live_session_requires_capability() {
        let config = ComposerConfig::default();
        assert!(config.live_session().is_none());

        let config = ComposerConfig::from_toml(
            "[capabilities]\nlive_session = true\n\n[live]\nwake_phrases = [\"hey composer\"]\n",
        )
        .unwrap();
        let session = config.live_session().unwrap();
        assert_eq!(session.state(), crate::live::LiveState::Disconnected);
        assert_eq!(session.options().wake_phrases, vec!["hey composer".to_string()]);
    }

    #[test]
    fn test_toml_round_trip_and_exporter() {
        let config = ComposerConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(ComposerConfig::from_toml(&text).unwrap(), config);
        assert!(config.exporter().is_available());
    }
}
