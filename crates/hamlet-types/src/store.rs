//! Request/reply contract for the external world store.
//!
//! The dispatcher is stateless: character sheets, conversation transcripts,
//! and memory writes live with the hosting platform's store. These frames
//! define the query boundary; the transport (NATS request/reply in
//! production, an in-memory table in tests) is the runner's concern.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{ConversationId, PlayerId};
use crate::structs::Message;

/// A player's character sheet, served by the external asset store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PlayerIdentity {
    /// The player this sheet describes.
    pub player_id: PlayerId,
    /// Display name.
    pub name: String,
    /// Self-description used in conversation prompts.
    pub identity: String,
    /// Current short-term goal used in conversation prompts.
    pub plan: String,
}

/// A query the dispatcher sends to the world store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreQuery {
    /// Fetch a player's character sheet.
    PlayerIdentity {
        /// The player to look up.
        player_id: PlayerId,
    },
    /// Fetch a conversation's transcript in creation order.
    ConversationMessages {
        /// The conversation to read.
        conversation_id: ConversationId,
    },
    /// Record a conversation summary as a player memory.
    RecordMemory {
        /// The remembering player.
        player_id: PlayerId,
        /// The conversation the memory is about.
        conversation_id: ConversationId,
        /// LLM-produced summary text.
        summary: String,
    },
}

/// The store's reply to a [`StoreQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreReply {
    /// Reply to [`StoreQuery::PlayerIdentity`].
    PlayerIdentity {
        /// The requested character sheet.
        identity: PlayerIdentity,
    },
    /// Reply to [`StoreQuery::ConversationMessages`].
    ConversationMessages {
        /// Transcript in creation order; empty for unknown conversations.
        messages: Vec<Message>,
    },
    /// Acknowledgement of a write query.
    Ack,
    /// The store could not serve the query.
    Error {
        /// Human-readable failure description.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_roundtrip() {
        let query = StoreQuery::RecordMemory {
            player_id: PlayerId::new(),
            conversation_id: ConversationId::new(),
            summary: String::from("talked about the harvest fair"),
        };
        let json = serde_json::to_string(&query).unwrap_or_default();
        let restored: Result<StoreQuery, _> = serde_json::from_str(&json);
        assert_eq!(restored.ok(), Some(query));
    }

    #[test]
    fn error_reply_carries_its_message() {
        let reply = StoreReply::Error {
            message: String::from("unknown player"),
        };
        let value = serde_json::to_value(&reply).unwrap_or_default();
        assert_eq!(
            value.get("kind").and_then(serde_json::Value::as_str),
            Some("error")
        );
    }
}
