//! Weaving configuration

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix read by [`WeaveConfig::merge_with_env`]
pub const ENV_PREFIX: &str = "WEAVE_";

/// Settings that can be overridden from the environment
const ENV_SETTINGS: [&str; 2] = ["identity_passthrough", "trace_invocations"];

/// Factory and builder settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaveConfig {
    /// Hand back the real object unchanged when no aspect applies to any
    /// method of its contract
    pub identity_passthrough: bool,
    /// Emit a `trace` event for every woven call
    pub trace_invocations: bool,
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self {
            identity_passthrough: true,
            trace_invocations: false,
        }
    }
}

impl WeaveConfig {
    /// Parse a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Override fields from `WEAVE_IDENTITY_PASSTHROUGH` and
    /// `WEAVE_TRACE_INVOCATIONS`.
    ///
    /// Other `WEAVE_*` variables are left alone.
    pub fn merge_with_env(&mut self) -> Result<(), ConfigError> {
        for setting in ENV_SETTINGS {
            let var = format!("{ENV_PREFIX}{}", setting.to_ascii_uppercase());
            match std::env::var(&var) {
                Ok(value) => self.set_from_string(setting, &value)?,
                Err(std::env::VarError::NotPresent) => {}
                Err(std::env::VarError::NotUnicode(_)) => {
                    return Err(ConfigError::Invalid {
                        field: setting.to_string(),
                        message: format!("{var} is not valid unicode"),
                    })
                }
            }
        }
        Ok(())
    }

    /// Set one field from its string form
    pub fn set_from_string(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let flag = parse_flag(key, value)?;
        match key {
            "identity_passthrough" => self.identity_passthrough = flag,
            "trace_invocations" => self.trace_invocations = flag,
            _ => {
                return Err(ConfigError::Invalid {
                    field: key.to_string(),
                    message: "unknown setting".to_string(),
                })
            }
        }
        Ok(())
    }

    /// Set identity pass-through
    pub fn with_identity_passthrough(mut self, enabled: bool) -> Self {
        self.identity_passthrough = enabled;
        self
    }

    /// Set per-call tracing
    pub fn with_trace_invocations(mut self, enabled: bool) -> Self {
        self.trace_invocations = enabled;
        self
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            field: key.to_string(),
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn defaults_pass_unwoven_contracts_through() {
        let config = WeaveConfig::default();
        assert!(config.identity_passthrough);
        assert!(!config.trace_invocations);
    }

    #[test]
    fn parses_partial_toml() {
        let config = WeaveConfig::from_toml_str("trace_invocations = true").unwrap();
        assert!(config.trace_invocations);
        assert!(config.identity_passthrough);
    }

    #[test]
    fn rejects_unknown_toml_types() {
        assert_matches!(
            WeaveConfig::from_toml_str("identity_passthrough = \"sometimes\""),
            Err(ConfigError::Parse(_))
        );
    }

    #[test]
    fn string_overrides() {
        let mut config = WeaveConfig::default();
        config.set_from_string("identity_passthrough", "off").unwrap();
        assert!(!config.identity_passthrough);

        assert_matches!(
            config.set_from_string("trace_invocations", "maybe"),
            Err(ConfigError::Invalid { field, .. }) if field == "trace_invocations"
        );
        assert_matches!(
            config.set_from_string("verbosity", "1"),
            Err(ConfigError::Invalid { message, .. }) if message == "unknown setting"
        );
    }

    #[test]
    fn loads_toml_file() {
        let path = std::env::temp_dir().join(format!(
            "weave-config-{}-{}.toml",
            std::process::id(),
            line!()
        ));
        std::fs::write(&path, "identity_passthrough = false\n").unwrap();
        let loaded = WeaveConfig::load_from_file(&path);
        std::fs::remove_file(&path).unwrap();

        let config = loaded.unwrap();
        assert!(!config.identity_passthrough);
        assert!(!config.trace_invocations);

        assert_matches!(
            WeaveConfig::load_from_file(&path),
            Err(ConfigError::Io(_))
        );
    }

    // Single test so no other test observes these variables mid-change.
    #[test]
    fn env_overrides_ignore_unrelated_weave_vars() {
        std::env::set_var("WEAVE_HOME", "/opt/weave");
        std::env::set_var("WEAVE_LOG", "debug");
        std::env::set_var("WEAVE_TRACE_INVOCATIONS", "on");

        let mut config = WeaveConfig::default();
        let merged = config.merge_with_env();

        std::env::set_var("WEAVE_IDENTITY_PASSTHROUGH", "sometimes");
        let mut rejected = WeaveConfig::default();
        let bad = rejected.merge_with_env();

        for var in [
            "WEAVE_HOME",
            "WEAVE_LOG",
            "WEAVE_TRACE_INVOCATIONS",
            "WEAVE_IDENTITY_PASSTHROUGH",
        ] {
            std::env::remove_var(var);
        }

        merged.unwrap();
        assert!(config.trace_invocations);
        assert!(config.identity_passthrough);
        assert_matches!(
            bad,
            Err(ConfigError::Invalid { field, .. }) if field == "identity_passthrough"
        );
    }
}
