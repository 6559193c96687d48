//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every entity in the town has a strongly-typed ID to prevent accidental
//! mixing of identifiers at compile time. All IDs use UUID v7 (time-ordered)
//! so the world store can index them efficiently.
//!
//! [`OperationId`] and [`MessageId`] are caller-generated correlation
//! identifiers: the world loop mints them when it schedules an operation,
//! and the completion sink uses them to detect stale or duplicate reports.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a world instance.
    WorldId
}

define_id! {
    /// Unique identifier for a player (the movable body of an entity).
    PlayerId
}

define_id! {
    /// Unique identifier for an agent (the deciding mind of an entity).
    AgentId
}

define_id! {
    /// Unique identifier for a conversation.
    ConversationId
}

define_id! {
    /// Correlation identifier for one unit of asynchronous agent work.
    ///
    /// Minted by the world loop at dispatch time; the completion sink
    /// drops any report whose operation ID no longer matches the agent's
    /// in-progress handle.
    OperationId
}

define_id! {
    /// Deduplication identifier for a single conversation message.
    MessageId
}
