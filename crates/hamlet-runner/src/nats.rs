//! NATS pub/sub integration for operation intake and completion delivery.
//!
//! The world loop publishes operation requests on subjects matching
//! `town.{world_id}.operation`. The dispatcher subscribes to all worlds,
//! executes each operation, and publishes completion inputs on
//! `town.{world_id}.input`. World-store queries use NATS request/reply
//! on `town.{world_id}.store`.

use futures::StreamExt as _;
use tracing::{debug, info};

use hamlet_types::{CompletionInput, OperationRequest, StoreQuery, StoreReply, WorldId};

use crate::error::DispatchError;

/// NATS client wrapper for the operation dispatcher.
///
/// Manages a single NATS connection and provides methods for subscribing
/// to operation requests, publishing completion inputs, and querying the
/// world store.
#[derive(Clone)]
pub struct NatsClient {
    client: async_nats::Client,
}

impl NatsClient {
    /// Connect to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Nats`] if the connection cannot be
    /// established.
    pub async fn connect(url: &str) -> Result<Self, DispatchError> {
        info!(url = url, "connecting to NATS server");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| DispatchError::Nats(format!("failed to connect to {url}: {e}")))?;
        info!("NATS connection established");
        Ok(Self { client })
    }

    /// Subscribe to operation requests for all worlds.
    ///
    /// Returns a subscription yielding messages on `town.*.operation`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Nats`] if the subscription fails.
    pub async fn subscribe_operations(
        &self,
    ) -> Result<async_nats::Subscriber, DispatchError> {
        let subject = "town.*.operation";
        debug!(subject = subject, "subscribing to operation subjects");
        let subscriber = self
            .client
            .subscribe(subject.to_owned())
            .await
            .map_err(|e| {
                DispatchError::Nats(format!("failed to subscribe to {subject}: {e}"))
            })?;
        info!("subscribed to operation subjects");
        Ok(subscriber)
    }

    /// Publish a completion input for the world loop to apply.
    ///
    /// The subject is `town.{world_id}.input`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Nats`] if serialization or publishing
    /// fails.
    pub async fn publish_input(
        &self,
        world_id: WorldId,
        input: &CompletionInput,
    ) -> Result<(), DispatchError> {
        let subject = format!("town.{world_id}.input");
        let payload = serde_json::to_vec(input)
            .map_err(|e| DispatchError::Nats(format!("failed to serialize input: {e}")))?;
        debug!(
            subject = subject,
            input = input.name(),
            "publishing completion input"
        );
        self.client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| DispatchError::Nats(format!("failed to publish to {subject}: {e}")))?;
        Ok(())
    }

    /// Send a world-store query and await its reply.
    ///
    /// Uses NATS request/reply on `town.{world_id}.store`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Nats`] for transport failures and
    /// [`DispatchError::Store`] when the reply does not parse.
    pub async fn request_store(
        &self,
        world_id: WorldId,
        query: &StoreQuery,
    ) -> Result<StoreReply, DispatchError> {
        let subject = format!("town.{world_id}.store");
        let payload = serde_json::to_vec(query)
            .map_err(|e| DispatchError::Nats(format!("failed to serialize query: {e}")))?;
        let response = self
            .client
            .request(subject.clone(), payload.into())
            .await
            .map_err(|e| DispatchError::Nats(format!("store request on {subject} failed: {e}")))?;
        serde_json::from_slice(&response.payload)
            .map_err(|e| DispatchError::Store(format!("malformed store reply: {e}")))
    }

    /// Deserialize a NATS message payload into an [`OperationRequest`].
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Serde`] if deserialization fails.
    pub fn deserialize_request(data: &[u8]) -> Result<OperationRequest, DispatchError> {
        serde_json::from_slice(data).map_err(DispatchError::Serde)
    }

    /// Extract the world ID from an operation subject string.
    ///
    /// Subject format: `town.{world_id}.operation`.
    ///
    /// Returns `None` if the subject does not match the expected format.
    pub fn extract_world_from_subject(subject: &str) -> Option<WorldId> {
        let mut parts = subject.split('.');
        if parts.next() != Some("town") {
            return None;
        }
        let world = parts.next()?;
        if parts.next() != Some("operation") {
            return None;
        }
        world.parse::<uuid::Uuid>().ok().map(WorldId::from)
    }

    /// Drain the subscription into a request handler until it closes.
    ///
    /// Malformed payloads are logged and skipped; they never stop the
    /// intake loop.
    pub async fn drain_operations<F>(
        &self,
        mut subscriber: async_nats::Subscriber,
        mut handle: F,
    ) where
        F: FnMut(OperationRequest),
    {
        while let Some(message) = subscriber.next().await {
            let subject = message.subject.to_string();
            debug!(
                subject = subject,
                payload_size = message.payload.len(),
                "received operation message"
            );
            match Self::deserialize_request(&message.payload) {
                Ok(request) => {
                    // A payload routed through the wrong world's subject is
                    // a world-loop bug; refuse to act on it.
                    if let Some(world) = Self::extract_world_from_subject(&subject)
                        && world != request.world_id()
                    {
                        tracing::warn!(
                            subject = subject,
                            payload_world = %request.world_id(),
                            "operation subject world does not match payload, skipping"
                        );
                        continue;
                    }
                    handle(request);
                }
                Err(e) => {
                    tracing::warn!(
                        subject = subject,
                        error = %e,
                        "failed to deserialize operation request, skipping"
                    );
                }
            }
        }
        info!("NATS subscription ended");
    }
}

impl std::fmt::Debug for NatsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsClient")
            .field("connected", &true)
            .finish()
    }
}
