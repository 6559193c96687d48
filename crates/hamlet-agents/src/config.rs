//! Typed configuration for the decision policy.
//!
//! All tunables the policy engine consults live here as one immutable
//! table, deserialized from the `policy` section of `hamlet-config.yaml`.
//! Every field has a default matching the observed production values, so
//! an empty config section is valid.

use serde::Deserialize;

use crate::activities::{ActivitySpec, default_catalogue};

/// Tunables for the decision policy engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PolicyConfig {
    /// Minimum game-time (ms) between leaving one conversation and
    /// seeking the next, and between consecutive invite attempts.
    #[serde(default = "default_conversation_cooldown_ms")]
    pub conversation_cooldown_ms: u64,

    /// Game-time (ms) after an activity ends during which the agent
    /// wanders instead of starting another activity.
    #[serde(default = "default_activity_cooldown_ms")]
    pub activity_cooldown_ms: u64,

    /// Maximum Manhattan distance (tiles) at which a trade partner is
    /// considered nearby.
    #[serde(default = "default_trade_distance")]
    pub trade_distance: f64,

    /// Probability of actually trading once a nearby partner exists.
    #[serde(default = "default_trade_probability")]
    pub trade_probability: f64,

    /// Probability of proposing a world-object discovery instead of the
    /// trade/invite path.
    ///
    /// Zero in production; the discovery path is kept correct and tested
    /// but disabled.
    #[serde(default = "default_discovery_probability")]
    pub discovery_probability: f64,

    /// The activity catalogue idle agents draw from.
    #[serde(default = "default_catalogue")]
    pub activities: Vec<ActivitySpec>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            conversation_cooldown_ms: default_conversation_cooldown_ms(),
            activity_cooldown_ms: default_activity_cooldown_ms(),
            trade_distance: default_trade_distance(),
            trade_probability: default_trade_probability(),
            discovery_probability: default_discovery_probability(),
            activities: default_catalogue(),
        }
    }
}

const fn default_conversation_cooldown_ms() -> u64 {
    60_000
}

const fn default_activity_cooldown_ms() -> u64 {
    10_000
}

const fn default_trade_distance() -> f64 {
    3.0
}

const fn default_trade_probability() -> f64 {
    0.6
}

const fn default_discovery_probability() -> f64 {
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_section_yields_defaults() {
        let config: Result<PolicyConfig, _> = serde_json::from_value(serde_json::json!({}));
        let config = config.unwrap_or_default();
        assert_eq!(config.conversation_cooldown_ms, 60_000);
        assert_eq!(config.activity_cooldown_ms, 10_000);
        assert!((config.trade_distance - 3.0).abs() < f64::EPSILON);
        assert!((config.discovery_probability).abs() < f64::EPSILON);
        assert!(!config.activities.is_empty());
    }

    #[test]
    fn yaml_overrides_apply() {
        let yaml = "
conversation_cooldown_ms: 15000
trade_probability: 1.0
activities:
  - description: stacking firewood
    emoji: \"\u{1fab5}\"
    duration_ms: 5000
";
        let config: Result<PolicyConfig, _> = serde_yml::from_str(yaml);
        let config = config.unwrap_or_default();
        assert_eq!(config.conversation_cooldown_ms, 15_000);
        assert!((config.trade_probability - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.activities.len(), 1);
        // Untouched fields keep their defaults.
        assert_eq!(config.activity_cooldown_ms, 10_000);
    }
}
