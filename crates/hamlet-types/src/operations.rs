//! Operation request and completion input types.
//!
//! These two enums are the whole contract between the deterministic world
//! loop and the asynchronous operation dispatcher:
//!
//! - [`OperationRequest`] travels world loop -> dispatcher. Every variant
//!   carries a caller-generated [`OperationId`] and whatever snapshot the
//!   operation needs, fully resolved at dispatch time.
//! - [`CompletionInput`] travels dispatcher -> completion sink. Finishing
//!   variants echo the request's operation ID so the sink can drop stale
//!   reports; auxiliary variants ([`CompletionInput::DiscoverItem`],
//!   [`CompletionInput::TradeItem`]) carry no operation ID and piggyback on
//!   a finishing write.
//!
//! Operation kinds form a closed set. An unknown kind is rejected at
//! deserialization on the transport boundary -- there is no default arm to
//! guess with.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{AgentId, ConversationId, MessageId, OperationId, PlayerId, WorldId};
use crate::structs::{Activity, Agent, InventoryItem, Player, Size, Tile, WorldMap};

// ---------------------------------------------------------------------------
// Message phase
// ---------------------------------------------------------------------------

/// Which conversation transition a message-generation request serves.
///
/// Not persisted anywhere: the phase is chosen per request by the world
/// loop and selects the generation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum MessagePhase {
    /// Opening message of a new conversation.
    Start,
    /// Reply within an ongoing conversation.
    Continue,
    /// Farewell message; the speaker leaves after sending it.
    Leave,
}

impl MessagePhase {
    /// Label used in logs and template names.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Continue => "continue",
            Self::Leave => "leave",
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound: operation requests
// ---------------------------------------------------------------------------

/// A unit of asynchronous agent work issued by the world loop.
///
/// Snapshot-carrying variants ([`OperationRequest::DoSomething`],
/// [`OperationRequest::HandleInventory`]) embed owned copies of the player,
/// agent, map, and free-player list as observed at dispatch time. The
/// dispatcher may run arbitrarily long after dispatch and must never read
/// live world state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationRequest {
    /// Summarize a finished conversation into the agent's memory.
    RememberConversation {
        /// World the operation belongs to.
        world_id: WorldId,
        /// The remembering agent's player body.
        player_id: PlayerId,
        /// The remembering agent.
        agent_id: AgentId,
        /// The conversation to remember.
        conversation_id: ConversationId,
        /// Correlation identifier for the completion report.
        operation_id: OperationId,
    },
    /// Generate one conversation message (start, continue, or leave).
    GenerateMessage {
        /// World the operation belongs to.
        world_id: WorldId,
        /// The speaking agent's player body.
        player_id: PlayerId,
        /// The speaking agent.
        agent_id: AgentId,
        /// The conversation being spoken in.
        conversation_id: ConversationId,
        /// The other participant.
        other_player_id: PlayerId,
        /// Correlation identifier for the completion report.
        operation_id: OperationId,
        /// Which transition this message serves.
        phase: MessagePhase,
        /// Deduplication identifier for the message itself.
        message_id: MessageId,
    },
    /// Decide the agent's next move: wander, activity, invite, or discovery.
    DoSomething {
        /// World the operation belongs to.
        world_id: WorldId,
        /// Correlation identifier for the completion report.
        operation_id: OperationId,
        /// Snapshot of the acting player.
        player: Player,
        /// Snapshot of the acting agent.
        agent: Agent,
        /// Map dimensions for placement decisions.
        map: WorldMap,
        /// Snapshot of all other players not currently in a conversation.
        other_free_players: Vec<Player>,
    },
    /// Evaluate the agent's inventory for a possible trade.
    HandleInventory {
        /// World the operation belongs to.
        world_id: WorldId,
        /// Correlation identifier for the completion report.
        operation_id: OperationId,
        /// Snapshot of the acting player.
        player: Player,
        /// Snapshot of the acting agent.
        agent: Agent,
        /// Map dimensions, carried for parity with `DoSomething`.
        map: WorldMap,
        /// Snapshot of all other players not currently in a conversation.
        other_free_players: Vec<Player>,
    },
}

impl OperationRequest {
    /// The correlation identifier this operation must echo on completion.
    pub const fn operation_id(&self) -> OperationId {
        match self {
            Self::RememberConversation { operation_id, .. }
            | Self::GenerateMessage { operation_id, .. }
            | Self::DoSomething { operation_id, .. }
            | Self::HandleInventory { operation_id, .. } => *operation_id,
        }
    }

    /// The world this operation belongs to.
    pub const fn world_id(&self) -> WorldId {
        match self {
            Self::RememberConversation { world_id, .. }
            | Self::GenerateMessage { world_id, .. }
            | Self::DoSomething { world_id, .. }
            | Self::HandleInventory { world_id, .. } => *world_id,
        }
    }

    /// The agent performing this operation.
    pub const fn agent_id(&self) -> AgentId {
        match self {
            Self::RememberConversation { agent_id, .. }
            | Self::GenerateMessage { agent_id, .. } => *agent_id,
            Self::DoSomething { agent, .. } | Self::HandleInventory { agent, .. } => agent.id,
        }
    }

    /// Operation kind label for logging.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RememberConversation { .. } => "remember_conversation",
            Self::GenerateMessage { .. } => "generate_message",
            Self::DoSomething { .. } => "do_something",
            Self::HandleInventory { .. } => "handle_inventory",
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound: completion inputs
// ---------------------------------------------------------------------------

/// Kind of a discovered world object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryKind {
    /// Multi-tile structure placed on the map.
    Building,
    /// Single-tile item that lands in an inventory.
    Item,
}

/// A write proposed to the deterministic completion sink.
///
/// Serialized as `{ "name": ..., "args": {...} }`, the sink's input frame.
/// The sink applies a finishing input iff the echoed `operation_id` still
/// matches the agent's in-progress handle; otherwise the report is stale
/// and dropped without error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "name", content = "args", rename_all = "camelCase")]
pub enum CompletionInput {
    /// A `RememberConversation` operation finished.
    FinishRememberConversation {
        /// The remembering agent.
        agent_id: AgentId,
        /// Echo of the request's correlation identifier.
        operation_id: OperationId,
    },
    /// A `DoSomething` or `HandleInventory` operation finished.
    ///
    /// Exactly one of `destination` / `activity` / `invitee` may be set;
    /// all three absent is the explicit "nothing further" resolution that
    /// still clears the agent's operation handle.
    FinishDoSomething {
        /// Echo of the request's correlation identifier.
        operation_id: OperationId,
        /// The acting agent.
        agent_id: AgentId,
        /// Wander destination, if the decision was to wander.
        #[serde(skip_serializing_if = "Option::is_none")]
        destination: Option<Tile>,
        /// Activity to perform, if the decision was an activity.
        #[serde(skip_serializing_if = "Option::is_none")]
        activity: Option<Activity>,
        /// Player to invite, if the decision was a conversation invite.
        #[serde(skip_serializing_if = "Option::is_none")]
        invitee: Option<PlayerId>,
    },
    /// A generated conversation message, ready to store and display.
    AgentSendMessage {
        /// The conversation being spoken in.
        conversation_id: ConversationId,
        /// The speaking agent.
        agent_id: AgentId,
        /// The speaking agent's player body.
        player_id: PlayerId,
        /// Moderated message text.
        text: String,
        /// Visual prompt for the optional illustration.
        #[serde(skip_serializing_if = "Option::is_none")]
        image_prompt: Option<String>,
        /// URL of the optional illustration.
        #[serde(skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
        /// Deduplication identifier issued with the request.
        message_id: MessageId,
        /// True iff the speaker leaves the conversation after this message.
        leave_conversation: bool,
        /// Echo of the request's correlation identifier.
        operation_id: OperationId,
    },
    /// A newly discovered world object (auxiliary; no operation ID).
    DiscoverItem {
        /// The discovering player.
        player_id: PlayerId,
        /// The discovered item (name plus sprite URL).
        item: InventoryItem,
        /// Placement tile, clamped inside the map.
        place: Tile,
        /// Whether the object is a building or an item.
        kind: DiscoveryKind,
        /// Footprint of the object in tiles.
        size: Size,
    },
    /// An inventory item handed to a nearby player (auxiliary; no
    /// operation ID).
    TradeItem {
        /// The giving player.
        from: PlayerId,
        /// The receiving player.
        to: PlayerId,
        /// Index into the giver's ordered inventory.
        item_index: usize,
    },
}

impl CompletionInput {
    /// The echoed correlation identifier, for finishing inputs.
    ///
    /// Auxiliary inputs (`DiscoverItem`, `TradeItem`) return `None`; they
    /// never clear an operation handle on their own.
    pub const fn operation_id(&self) -> Option<OperationId> {
        match self {
            Self::FinishRememberConversation { operation_id, .. }
            | Self::FinishDoSomething { operation_id, .. }
            | Self::AgentSendMessage { operation_id, .. } => Some(*operation_id),
            Self::DiscoverItem { .. } | Self::TradeItem { .. } => None,
        }
    }

    /// Input name label for logging, matching the serialized `name` field.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FinishRememberConversation { .. } => "finishRememberConversation",
            Self::FinishDoSomething { .. } => "finishDoSomething",
            Self::AgentSendMessage { .. } => "agentSendMessage",
            Self::DiscoverItem { .. } => "discoverItem",
            Self::TradeItem { .. } => "tradeItem",
        }
    }
}
