//! Core entity structs for the Hamlet town simulation.
//!
//! These are the boundary-contract shapes exchanged between the world loop,
//! the operation dispatcher, and the world store. The dispatcher receives
//! owned snapshots of these types and never reads live world state; the
//! snapshot taken at dispatch time is the whole truth for that operation.
//!
//! Game time is measured in epoch milliseconds (`u64`) throughout, matching
//! the world loop's clock. Wall-clock metadata (message creation) uses
//! [`chrono`] timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{AgentId, ConversationId, MessageId, OperationId, PlayerId};

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A live position in the town, in tile units.
///
/// Fractional because the movement subsystem interpolates between tiles;
/// a player mid-step sits between two integral coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Point {
    /// Horizontal coordinate in tile units.
    pub x: f64,
    /// Vertical coordinate in tile units.
    pub y: f64,
}

impl Point {
    /// Manhattan distance to another point.
    ///
    /// Used for proximity checks (trade range) where the grid metric is
    /// what the world loop itself uses.
    pub fn manhattan_distance(&self, other: &Self) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Euclidean distance to another point.
    ///
    /// Used for ranking conversation candidates by closeness.
    pub fn distance(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// An integral tile coordinate.
///
/// Wander destinations and discovery placements always land on whole tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Tile {
    /// Horizontal tile index.
    pub x: u32,
    /// Vertical tile index.
    pub y: u32,
}

/// Width and height of a placed world object, in tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Size {
    /// Width in tiles.
    pub w: u32,
    /// Height in tiles.
    pub h: u32,
}

/// Read-only map dimensions, input to placement decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorldMap {
    /// Map width in tiles.
    pub width: u32,
    /// Map height in tiles.
    pub height: u32,
    /// Edge length of one tile in pixels (display concern, carried for
    /// completeness of the snapshot).
    pub tile_dim: u32,
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// Movement intent, present iff the player is walking toward a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Pathfinding {
    /// The tile the player is heading to.
    pub destination: Tile,
}

/// A timed activity a player is performing (reading, gardening, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Activity {
    /// Human-readable description shown above the player.
    pub description: String,
    /// Emoji shown alongside the description.
    pub emoji: String,
    /// Game time (epoch ms) when the activity ends.
    pub until: u64,
}

/// A single item in a player's inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct InventoryItem {
    /// Display name of the item.
    pub name: String,
    /// Optional sprite URL for discovered items.
    pub image_url: Option<String>,
}

/// The movable body of a simulated entity.
///
/// Position and inventory are mutated by the movement subsystem and the
/// completion sink; the dispatcher only ever sees an owned snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Player {
    /// Player identifier.
    pub id: PlayerId,
    /// Current position in tile units.
    pub position: Point,
    /// Present iff the player is currently moving toward a destination.
    pub pathfinding: Option<Pathfinding>,
    /// Present iff the player is performing a timed activity.
    pub activity: Option<Activity>,
    /// Ordered inventory; trades reference items by index.
    #[serde(default)]
    pub inventory: Vec<InventoryItem>,
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// Handle to the operation currently outstanding for an agent.
///
/// The completion sink compares an incoming report's operation ID against
/// this handle; a mismatch means the report is stale and is silently
/// dropped. At most one handle exists per agent at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct OperationHandle {
    /// Operation kind label, for observability.
    pub name: String,
    /// Correlation identifier of the outstanding operation.
    pub operation_id: OperationId,
    /// Game time (epoch ms) when the operation was dispatched.
    pub started: u64,
}

/// The deciding mind of a simulated entity.
///
/// Cooldown timestamps and the operation handle are mutated exclusively by
/// the completion sink when it accepts a report; the body ([`Player`]) is
/// mutated by the movement subsystem. The two facets share a lifetime and
/// are correlated by `player_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Agent {
    /// Agent identifier.
    pub id: AgentId,
    /// The player body this agent controls.
    pub player_id: PlayerId,
    /// Game time (epoch ms) the agent last left a conversation.
    pub last_conversation: Option<u64>,
    /// Game time (epoch ms) the agent last attempted a conversation invite.
    pub last_invite_attempt: Option<u64>,
    /// The currently outstanding operation, if any.
    pub in_progress_operation: Option<OperationHandle>,
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// Author and time of the most recent message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LastMessage {
    /// Player who sent the message.
    pub author: PlayerId,
    /// Game time (epoch ms) the message was sent.
    pub timestamp: u64,
}

/// A conversation between players.
///
/// Owned by the completion sink; the dispatcher only proposes transitions.
/// Membership is unique; insertion order is preserved because the client
/// renders the message stack by join order. The lifecycle phase is implied
/// by membership and the last message, never stored as an explicit enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Conversation {
    /// Conversation identifier.
    pub id: ConversationId,
    /// Participants in join order, unique.
    pub participants: Vec<PlayerId>,
    /// Game time (epoch ms) the conversation was created.
    pub created: u64,
    /// The most recent message, if any has been sent.
    pub last_message: Option<LastMessage>,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Message {
    /// The conversation this message belongs to.
    pub conversation_id: ConversationId,
    /// The player who authored the message.
    pub author: PlayerId,
    /// Moderated message text.
    pub text: String,
    /// Visual prompt used for the optional illustration.
    pub image_prompt: Option<String>,
    /// URL of the optional illustration.
    pub image_url: Option<String>,
    /// Deduplication identifier issued by the world loop.
    pub message_id: MessageId,
    /// Wall-clock creation time.
    pub created_at: DateTime<Utc>,
}
