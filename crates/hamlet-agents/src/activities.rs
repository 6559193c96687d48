//! The town activity catalogue.
//!
//! Activities are what idle agents do when they are not walking or
//! talking: visible, timed bits of flavor with an emoji badge. The
//! catalogue is an immutable configuration table injected at startup --
//! operators can replace it wholesale from `hamlet-config.yaml` without
//! recompiling, and nothing in the policy engine assumes any particular
//! entry exists.

use serde::Deserialize;

/// One entry in the activity catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActivitySpec {
    /// Human-readable description shown above the player.
    pub description: String,
    /// Emoji badge shown alongside the description.
    pub emoji: String,
    /// How long the activity runs, in game milliseconds.
    pub duration_ms: u64,
}

impl ActivitySpec {
    /// Convenience constructor for the built-in catalogue.
    fn new(description: &str, emoji: &str, duration_ms: u64) -> Self {
        Self {
            description: String::from(description),
            emoji: String::from(emoji),
            duration_ms,
        }
    }
}

/// The built-in activity catalogue.
///
/// Used when `hamlet-config.yaml` does not override `policy.activities`.
pub fn default_catalogue() -> Vec<ActivitySpec> {
    vec![
        ActivitySpec::new("reading a book", "\u{1f4d6}", 60_000),
        ActivitySpec::new("daydreaming", "\u{1f914}", 60_000),
        ActivitySpec::new("gardening", "\u{1f955}", 60_000),
        ActivitySpec::new("sketching the square", "\u{270f}\u{fe0f}", 45_000),
        ActivitySpec::new("bird watching", "\u{1f426}", 45_000),
        ActivitySpec::new("sweeping the porch", "\u{1f9f9}", 30_000),
        ActivitySpec::new("practicing guitar", "\u{1f3b8}", 90_000),
        ActivitySpec::new("window shopping", "\u{1f6cd}\u{fe0f}", 30_000),
    ]
}
