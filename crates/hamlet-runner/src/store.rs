//! World-store access for the dispatcher.
//!
//! Character sheets, conversation transcripts, and memory writes live
//! with the hosting platform's store; the dispatcher only queries. Uses
//! enum dispatch instead of trait objects because async methods are not
//! dyn-compatible in Rust. The in-memory variant backs tests and local
//! development without infrastructure.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use hamlet_types::{
    ConversationId, Message, PlayerId, PlayerIdentity, StoreQuery, StoreReply, WorldId,
};

use crate::error::DispatchError;
use crate::nats::NatsClient;

/// Where world-store queries are answered.
#[derive(Debug, Clone)]
pub enum WorldStore {
    /// NATS request/reply against the hosting platform (production).
    Nats(NatsClient),
    /// In-process tables (tests, local development).
    Memory(MemoryStore),
}

impl WorldStore {
    /// Fetch a player's character sheet.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Store`] for unknown players or store
    /// failures.
    pub async fn player_identity(
        &self,
        world_id: WorldId,
        player_id: PlayerId,
    ) -> Result<PlayerIdentity, DispatchError> {
        match self {
            Self::Nats(client) => {
                let reply = client
                    .request_store(world_id, &StoreQuery::PlayerIdentity { player_id })
                    .await?;
                match reply {
                    StoreReply::PlayerIdentity { identity } => Ok(identity),
                    other => Err(unexpected_reply("player identity", &other)),
                }
            }
            Self::Memory(store) => store.player_identity(player_id),
        }
    }

    /// Fetch a conversation's transcript in creation order.
    ///
    /// Unknown conversations yield an empty transcript, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Store`] for store failures.
    pub async fn conversation_messages(
        &self,
        world_id: WorldId,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, DispatchError> {
        match self {
            Self::Nats(client) => {
                let reply = client
                    .request_store(
                        world_id,
                        &StoreQuery::ConversationMessages { conversation_id },
                    )
                    .await?;
                match reply {
                    StoreReply::ConversationMessages { messages } => Ok(messages),
                    other => Err(unexpected_reply("conversation messages", &other)),
                }
            }
            Self::Memory(store) => Ok(store.conversation_messages(conversation_id)),
        }
    }

    /// Record a conversation summary as a player memory.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Store`] if the write is rejected.
    pub async fn record_memory(
        &self,
        world_id: WorldId,
        player_id: PlayerId,
        conversation_id: ConversationId,
        summary: String,
    ) -> Result<(), DispatchError> {
        match self {
            Self::Nats(client) => {
                let reply = client
                    .request_store(
                        world_id,
                        &StoreQuery::RecordMemory {
                            player_id,
                            conversation_id,
                            summary,
                        },
                    )
                    .await?;
                match reply {
                    StoreReply::Ack => Ok(()),
                    other => Err(unexpected_reply("memory write", &other)),
                }
            }
            Self::Memory(store) => {
                store.record_memory(player_id, conversation_id, summary);
                Ok(())
            }
        }
    }
}

/// Map a wrong-variant or error reply to a store error.
fn unexpected_reply(what: &str, reply: &StoreReply) -> DispatchError {
    match reply {
        StoreReply::Error { message } => {
            DispatchError::Store(format!("{what} query failed: {message}"))
        }
        other => DispatchError::Store(format!("unexpected reply to {what} query: {other:?}")),
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// A recorded memory write, inspectable from tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMemory {
    /// The remembering player.
    pub player_id: PlayerId,
    /// The conversation the memory is about.
    pub conversation_id: ConversationId,
    /// The summary text.
    pub summary: String,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    identities: HashMap<PlayerId, PlayerIdentity>,
    conversations: HashMap<ConversationId, Vec<Message>>,
    memories: Vec<RecordedMemory>,
}

/// In-process world store for tests and local development.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a character sheet.
    pub fn insert_identity(&self, identity: PlayerIdentity) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.identities.insert(identity.player_id, identity);
        }
    }

    /// Append a message to a conversation transcript.
    pub fn push_message(&self, message: Message) {
        if let Ok(mut inner) = self.inner.lock() {
            inner
                .conversations
                .entry(message.conversation_id)
                .or_default()
                .push(message);
        }
    }

    /// All memory writes recorded so far, in order.
    pub fn recorded_memories(&self) -> Vec<RecordedMemory> {
        self.inner
            .lock()
            .map(|inner| inner.memories.clone())
            .unwrap_or_default()
    }

    fn player_identity(&self, player_id: PlayerId) -> Result<PlayerIdentity, DispatchError> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.identities.get(&player_id).cloned())
            .ok_or_else(|| DispatchError::Store(format!("unknown player {player_id}")))
    }

    fn conversation_messages(&self, conversation_id: ConversationId) -> Vec<Message> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.conversations.get(&conversation_id).cloned())
            .unwrap_or_default()
    }

    fn record_memory(
        &self,
        player_id: PlayerId,
        conversation_id: ConversationId,
        summary: String,
    ) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.memories.push(RecordedMemory {
                player_id,
                conversation_id,
                summary,
            });
        }
    }
}
