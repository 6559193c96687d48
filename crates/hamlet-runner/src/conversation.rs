//! Conversation message generation and post-processing.
//!
//! The lifecycle has three transitions -- `start`, `continue`, `leave` --
//! and each selects its own prompt template. After the text adapter
//! produces a raw message the pipeline runs, in order:
//!
//! 1. whitespace trim,
//! 2. the moderation filter,
//! 3. optional illustration: never for `leave` (a farewell should not be
//!    a spectacle), only when the filtered text is long enough, and only
//!    with configured probability. The visual prompt comes from a
//!    secondary, independent LLM call; any failure there -- or an empty
//!    derived prompt -- attaches nothing and never blocks the message.

use rand::Rng;
use tracing::{debug, warn};

use hamlet_types::{Message, MessagePhase, PlayerIdentity};

use serde::Deserialize;

use crate::error::DispatchError;
use crate::image::ImageEndpoint;
use crate::llm::{ChatMessage, LlmBackend};
use crate::moderation::ModerationFilter;
use crate::prompt::PromptEngine;

// ---------------------------------------------------------------------------
// Tuning
// ---------------------------------------------------------------------------

/// System message framing every conversation completion.
const CONVERSATION_SYSTEM: &str = "You speak as one resident of a small town \
    talking to another. Stay in character, keep it casual and brief, and \
    never mention that you are simulated.";

/// System message for the visual-prompt derivation call.
const IMAGE_PROMPT_SYSTEM: &str = "You turn a chat message into a concise, \
    vivid pixel art sticker prompt in English. Output only the prompt, \
    under 80 characters.";

/// Sampling temperature for conversation messages.
const MESSAGE_TEMPERATURE: f64 = 0.7;

/// Maximum tokens for a conversation message.
const MESSAGE_MAX_TOKENS: u32 = 300;

/// Sampling temperature for visual-prompt derivation.
const IMAGE_PROMPT_TEMPERATURE: f64 = 0.6;

/// Maximum tokens for visual-prompt derivation.
const IMAGE_PROMPT_MAX_TOKENS: u32 = 80;

/// Hard cap on the derived visual prompt, in characters.
const IMAGE_PROMPT_MAX_LEN: usize = 160;

/// Tunables for the message pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineConfig {
    /// Probability that an eligible message gets an illustration.
    #[serde(default = "default_image_probability")]
    pub image_probability: f64,

    /// Minimum filtered-text length (characters) before an illustration
    /// is considered.
    #[serde(default = "default_min_image_text_len")]
    pub min_image_text_len: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            image_probability: default_image_probability(),
            min_image_text_len: default_min_image_text_len(),
        }
    }
}

const fn default_image_probability() -> f64 {
    0.12
}

const fn default_min_image_text_len() -> usize {
    8
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// The fully post-processed output of one message generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedMessage {
    /// Trimmed, moderated message text.
    pub text: String,
    /// Derived visual prompt, when an illustration was attached.
    pub image_prompt: Option<String>,
    /// Deterministic generation URL, when an illustration was attached.
    pub image_url: Option<String>,
}

/// The template rendered for each conversation phase.
pub const fn template_for(phase: MessagePhase) -> &'static str {
    match phase {
        MessagePhase::Start => "conversation_start",
        MessagePhase::Continue => "conversation_continue",
        MessagePhase::Leave => "conversation_leave",
    }
}

/// Generate and post-process one conversation message.
///
/// Text-generation failures propagate: a conversation message without
/// text has no value, so the whole operation fails and the world loop
/// retries the agent's turn later. Illustration failures never propagate.
///
/// # Errors
///
/// Returns [`DispatchError::Template`] or [`DispatchError::Llm`] if the
/// primary generation path fails.
#[allow(clippy::too_many_arguments)]
pub async fn generate_message(
    llm: &LlmBackend,
    prompts: &PromptEngine,
    moderation: &ModerationFilter,
    image: &ImageEndpoint,
    config: &PipelineConfig,
    phase: MessagePhase,
    speaker: &PlayerIdentity,
    other: &PlayerIdentity,
    transcript: &[Message],
    seed: u64,
) -> Result<GeneratedMessage, DispatchError> {
    let context = prompt_context(speaker, other, transcript);
    let prompt = prompts.render(template_for(phase), &context)?;
    let raw = llm
        .complete(
            &[
                ChatMessage::system(CONVERSATION_SYSTEM),
                ChatMessage::user(prompt),
            ],
            MESSAGE_TEMPERATURE,
            MESSAGE_MAX_TOKENS,
        )
        .await?;

    let text = moderation.sanitize(raw.trim());
    let mut generated = GeneratedMessage {
        text,
        image_prompt: None,
        image_url: None,
    };

    let illustrate = {
        let mut rng = rand::rng();
        should_illustrate(phase, &generated.text, config, rng.random::<f64>())
    };
    if illustrate {
        match derive_image_prompt(llm, &generated.text).await {
            Ok(Some(visual_prompt)) => {
                generated.image_url = Some(image.image_url(&visual_prompt, seed));
                generated.image_prompt = Some(visual_prompt);
            }
            Ok(None) => {
                debug!("derived visual prompt was empty; sending without image");
            }
            Err(e) => {
                warn!(error = %e, "visual prompt generation failed; sending without image");
            }
        }
    }

    Ok(generated)
}

/// Decide whether a message should get an illustration.
///
/// Pure in the drawn probability value so the gate is testable without a
/// random source: `draw` is compared against `config.image_probability`.
pub fn should_illustrate(
    phase: MessagePhase,
    text: &str,
    config: &PipelineConfig,
    draw: f64,
) -> bool {
    phase != MessagePhase::Leave
        && text.chars().count() > config.min_image_text_len
        && draw < config.image_probability
}

/// Derive a visual prompt for a message via a secondary LLM call.
async fn derive_image_prompt(
    llm: &LlmBackend,
    text: &str,
) -> Result<Option<String>, DispatchError> {
    let content = llm
        .complete(
            &[
                ChatMessage::system(IMAGE_PROMPT_SYSTEM),
                ChatMessage::user(text.to_owned()),
            ],
            IMAGE_PROMPT_TEMPERATURE,
            IMAGE_PROMPT_MAX_TOKENS,
        )
        .await?;
    Ok(clean_image_prompt(&content))
}

/// Normalize a derived visual prompt.
///
/// Strips surrounding whitespace and quote characters, caps the length on
/// a character boundary, and maps an empty result to `None`.
pub fn clean_image_prompt(raw: &str) -> Option<String> {
    let trimmed = raw.trim_matches(|c: char| c == '"' || c == '\'' || c.is_whitespace());
    let capped: String = trimmed.chars().take(IMAGE_PROMPT_MAX_LEN).collect();
    let capped = capped.trim();
    if capped.is_empty() {
        None
    } else {
        Some(capped.to_owned())
    }
}

/// Build the template context for a conversation prompt.
///
/// Transcript authors are rendered by name; any author that is not the
/// speaker is attributed to the conversation partner, since Hamlet
/// conversations are pairwise. Also used for the memory-summary prompt.
pub(crate) fn prompt_context(
    speaker: &PlayerIdentity,
    other: &PlayerIdentity,
    transcript: &[Message],
) -> serde_json::Value {
    let lines: Vec<serde_json::Value> = transcript
        .iter()
        .map(|m| {
            let author = if m.author == speaker.player_id {
                &speaker.name
            } else {
                &other.name
            };
            serde_json::json!({ "author": author, "text": m.text })
        })
        .collect();
    serde_json::json!({
        "speaker": {
            "name": speaker.name,
            "identity": speaker.identity,
            "plan": speaker.plan,
        },
        "other": { "name": other.name },
        "transcript": lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hamlet_types::{ConversationId, MessageId, PlayerId};

    fn identity(name: &str) -> PlayerIdentity {
        PlayerIdentity {
            player_id: PlayerId::new(),
            name: String::from(name),
            identity: String::from("A test resident."),
            plan: String::from("Pass the test."),
        }
    }

    #[test]
    fn leave_messages_are_never_illustrated() {
        let config = PipelineConfig {
            image_probability: 1.0,
            min_image_text_len: 0,
        };
        assert!(!should_illustrate(
            MessagePhase::Leave,
            "a long goodbye message that would otherwise qualify",
            &config,
            0.0,
        ));
    }

    #[test]
    fn short_messages_are_never_illustrated() {
        let config = PipelineConfig::default();
        assert!(!should_illustrate(MessagePhase::Continue, "ok!", &config, 0.0));
        // Exactly at the threshold does not qualify; one past it does.
        assert!(!should_illustrate(MessagePhase::Continue, "12345678", &config, 0.0));
        assert!(should_illustrate(MessagePhase::Continue, "123456789", &config, 0.0));
    }

    #[test]
    fn illustration_gate_respects_the_draw() {
        let config = PipelineConfig::default();
        let text = "plenty long enough to qualify";
        assert!(should_illustrate(MessagePhase::Start, text, &config, 0.11));
        assert!(!should_illustrate(MessagePhase::Start, text, &config, 0.12));
        assert!(!should_illustrate(MessagePhase::Start, text, &config, 0.99));
    }

    #[test]
    fn clean_image_prompt_strips_quotes_and_caps_length() {
        assert_eq!(
            clean_image_prompt("  \"pixel bakery at dawn\"  "),
            Some(String::from("pixel bakery at dawn"))
        );
        let long = "x".repeat(400);
        let cleaned = clean_image_prompt(&long);
        assert_eq!(cleaned.map(|p| p.chars().count()), Some(160));
    }

    #[test]
    fn empty_derived_prompt_maps_to_none() {
        assert_eq!(clean_image_prompt(""), None);
        assert_eq!(clean_image_prompt("  \"\"  "), None);
        assert_eq!(clean_image_prompt("\n'   '\n"), None);
    }

    #[test]
    fn template_selection_covers_all_phases() {
        assert_eq!(template_for(MessagePhase::Start), "conversation_start");
        assert_eq!(template_for(MessagePhase::Continue), "conversation_continue");
        assert_eq!(template_for(MessagePhase::Leave), "conversation_leave");
    }

    #[test]
    fn prompt_context_attributes_transcript_lines_by_name() {
        let speaker = identity("Mabel");
        let other = identity("Pete");
        let transcript = vec![
            Message {
                conversation_id: ConversationId::new(),
                author: other.player_id,
                text: String::from("Morning, Mabel."),
                image_prompt: None,
                image_url: None,
                message_id: MessageId::new(),
                created_at: Utc::now(),
            },
            Message {
                conversation_id: ConversationId::new(),
                author: speaker.player_id,
                text: String::from("Morning! Rye's fresh."),
                image_prompt: None,
                image_url: None,
                message_id: MessageId::new(),
                created_at: Utc::now(),
            },
        ];
        let context = prompt_context(&speaker, &other, &transcript);
        let lines = context
            .get("transcript")
            .and_then(serde_json::Value::as_array)
            .cloned()
            .unwrap_or_default();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines.first().and_then(|l| l.get("author")).and_then(serde_json::Value::as_str),
            Some("Pete")
        );
        assert_eq!(
            lines.get(1).and_then(|l| l.get("author")).and_then(serde_json::Value::as_str),
            Some("Mabel")
        );
    }

    #[test]
    fn pipeline_config_defaults() {
        let config = PipelineConfig::default();
        assert!((config.image_probability - 0.12).abs() < f64::EPSILON);
        assert_eq!(config.min_image_text_len, 8);
    }
}
