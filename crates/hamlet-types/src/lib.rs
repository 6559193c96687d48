//! Shared type definitions for the Hamlet town simulation.
//!
//! This crate is the single source of truth for the shapes exchanged
//! between the deterministic world loop, the asynchronous operation
//! dispatcher, and the external world store. Types defined here flow
//! downstream to `TypeScript` via `ts-rs` for the town web client.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all entity identifiers
//! - [`structs`] -- Core entity structs (players, agents, conversations)
//! - [`operations`] -- Operation request / completion input wire contracts
//! - [`store`] -- Request/reply contract for the external world store

pub mod ids;
pub mod operations;
pub mod store;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use ids::{AgentId, ConversationId, MessageId, OperationId, PlayerId, WorldId};
pub use operations::{CompletionInput, DiscoveryKind, MessagePhase, OperationRequest};
pub use store::{PlayerIdentity, StoreQuery, StoreReply};
pub use structs::{
    Activity, Agent, Conversation, InventoryItem, LastMessage, Message, OperationHandle,
    Pathfinding, Player, Point, Size, Tile, WorldMap,
};

#[cfg(test)]
mod tests {
    //! Integration tests for type exports and `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs generates TypeScript bindings when types with
        // #[ts(export)] are used. Importing them here triggers generation.
        // The actual files are written to the `bindings/` directory
        // relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::WorldId::export_all();
        let _ = crate::ids::PlayerId::export_all();
        let _ = crate::ids::AgentId::export_all();
        let _ = crate::ids::ConversationId::export_all();
        let _ = crate::ids::OperationId::export_all();
        let _ = crate::ids::MessageId::export_all();

        // Structs
        let _ = crate::structs::Point::export_all();
        let _ = crate::structs::Tile::export_all();
        let _ = crate::structs::Size::export_all();
        let _ = crate::structs::WorldMap::export_all();
        let _ = crate::structs::Pathfinding::export_all();
        let _ = crate::structs::Activity::export_all();
        let _ = crate::structs::InventoryItem::export_all();
        let _ = crate::structs::Player::export_all();
        let _ = crate::structs::OperationHandle::export_all();
        let _ = crate::structs::Agent::export_all();
        let _ = crate::structs::LastMessage::export_all();
        let _ = crate::structs::Conversation::export_all();
        let _ = crate::structs::Message::export_all();

        // Operations
        let _ = crate::operations::MessagePhase::export_all();
        let _ = crate::operations::OperationRequest::export_all();
        let _ = crate::operations::DiscoveryKind::export_all();
        let _ = crate::operations::CompletionInput::export_all();

        // Store
        let _ = crate::store::PlayerIdentity::export_all();
        let _ = crate::store::StoreQuery::export_all();
        let _ = crate::store::StoreReply::export_all();
    }
}
