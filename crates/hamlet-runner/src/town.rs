//! Behavioral configuration loading for the dispatcher.
//!
//! The canonical configuration lives in `hamlet-config.yaml` at the
//! project root. This module defines the strongly-typed top-level struct
//! mirroring the YAML sections and provides a loader. Every section and
//! every field has a default matching production values, so a missing
//! file or an empty section is valid.

use std::path::Path;

use serde::Deserialize;

use hamlet_agents::PolicyConfig;

use crate::conversation::PipelineConfig;
use crate::error::DispatchError;
use crate::moderation::ModerationConfig;

/// Top-level behavioral configuration.
///
/// Mirrors the structure of `hamlet-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TownConfig {
    /// Decision policy tunables (cooldowns, trade, discovery, activities).
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Moderation pattern lists and redirect framing.
    #[serde(default)]
    pub moderation: ModerationConfig,

    /// Conversation message pipeline tunables (illustration policy).
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl TownConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Config`] if the file cannot be read or
    /// is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, DispatchError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DispatchError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Config`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, DispatchError> {
        serde_yml::from_str(yaml)
            .map_err(|e| DispatchError::Config(format!("failed to parse config YAML: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_all_defaults() {
        let config = TownConfig::parse("{}").unwrap_or_default();
        assert_eq!(config, TownConfig::default());
        assert_eq!(config.policy.conversation_cooldown_ms, 60_000);
    }

    #[test]
    fn sections_override_independently() {
        let yaml = "
policy:
  conversation_cooldown_ms: 5000
pipeline:
  image_probability: 0.5
";
        let config = TownConfig::parse(yaml).unwrap_or_default();
        assert_eq!(config.policy.conversation_cooldown_ms, 5_000);
        assert!((config.pipeline.image_probability - 0.5).abs() < f64::EPSILON);
        // Untouched sections keep defaults.
        assert_eq!(config.moderation, ModerationConfig::default());
    }

    #[test]
    fn garbage_yaml_is_a_config_error() {
        let result = TownConfig::parse(": not yaml : [");
        assert!(matches!(result, Err(DispatchError::Config(_))));
    }
}
