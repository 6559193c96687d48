//! The completion sink boundary.
//!
//! Every operation reports its result through exactly one finishing
//! write to the sink; the deterministic world loop applies the write iff
//! the echoed operation ID still matches the agent's in-progress handle.
//! The dispatcher never learns whether its report was applied -- a
//! stale report dropped by the sink is indistinguishable from an applied
//! one, by design.
//!
//! Uses enum dispatch instead of trait objects because async methods are
//! not dyn-compatible in Rust. The channel variant is the result-channel
//! form used by tests and by embedders that run the world loop in
//! process.

use tokio::sync::mpsc;

use hamlet_types::{CompletionInput, WorldId};

use crate::error::DispatchError;
use crate::nats::NatsClient;

/// One completion write, addressed to a world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEnvelope {
    /// The world whose loop should apply this input.
    pub world_id: WorldId,
    /// The input to apply.
    pub input: CompletionInput,
}

/// Where completion inputs are delivered.
pub enum CompletionSink {
    /// Publish to `town.{world_id}.input` over NATS (production).
    Nats(NatsClient),
    /// Send into an in-process channel (tests, embedded world loops).
    Channel(mpsc::UnboundedSender<CompletionEnvelope>),
}

impl CompletionSink {
    /// Build a channel sink plus the receiving half.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<CompletionEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::Channel(tx), rx)
    }

    /// Deliver one completion input.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Nats`] if the transport fails. A
    /// delivered-but-dropped (stale) input is success, not an error.
    pub async fn send(
        &self,
        world_id: WorldId,
        input: CompletionInput,
    ) -> Result<(), DispatchError> {
        match self {
            Self::Nats(client) => client.publish_input(world_id, &input).await,
            Self::Channel(tx) => tx
                .send(CompletionEnvelope { world_id, input })
                .map_err(|e| DispatchError::Nats(format!("completion channel closed: {e}"))),
        }
    }
}

impl std::fmt::Debug for CompletionSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nats(_) => f.write_str("CompletionSink::Nats"),
            Self::Channel(_) => f.write_str("CompletionSink::Channel"),
        }
    }
}
