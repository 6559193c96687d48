//! The agent operation dispatcher: asynchronous work, exactly-once reporting.
//!
//! The world loop cannot block its tick on an LLM call, so it hands each
//! agent decision to this dispatcher as an [`OperationRequest`] carrying a
//! caller-generated operation ID and a fully-resolved snapshot.
//! [`Dispatcher::dispatch`] is fire-and-forget: work runs on a spawned
//! task, and the only way results travel back is a single finishing write
//! to the completion sink, tagged with the same operation ID. The sink
//! applies the write iff the agent's in-progress handle still matches;
//! stale reports are dropped silently and the dispatcher never knows.
//!
//! Before every finishing write the dispatcher sleeps a uniform random
//! jitter: simultaneous agent decisions otherwise collide at the sink's
//! optimistic concurrency layer.
//!
//! Error policy per operation kind:
//! - conversation message and memory summarization failures propagate --
//!   the agent misses this turn and the world loop retries later;
//! - illustration failures are swallowed inside the message pipeline;
//! - discovery naming failures propagate (the branch is disabled by
//!   default anyway).

use std::sync::Arc;

use tracing::{debug, info, warn};

use hamlet_agents::{Intent, PolicyConfig, policy};
use hamlet_types::{
    Activity, Agent, AgentId, CompletionInput, ConversationId, DiscoveryKind, InventoryItem,
    MessageId, MessagePhase, OperationId, OperationRequest, Player, PlayerId, PlayerIdentity,
    Tile, WorldId, WorldMap,
};

use crate::conversation::{self, PipelineConfig};
use crate::error::DispatchError;
use crate::image::ImageEndpoint;
use crate::jitter::CompletionJitter;
use crate::llm::{ChatMessage, LlmBackend};
use crate::moderation::ModerationFilter;
use crate::prompt::PromptEngine;
use crate::sink::CompletionSink;
use crate::store::WorldStore;

// ---------------------------------------------------------------------------
// Tuning
// ---------------------------------------------------------------------------

/// System message for discovery sprite naming.
const DISCOVERY_SYSTEM: &str =
    "You are a pixel art assistant. Output only an English prompt, no explanations.";

/// User prompt for naming a discovered building sprite.
const DISCOVERY_BUILDING_PROMPT: &str = "Pixel art building sprite, top-down RPG style, \
    clean outline, placed on a white grassy field with visible grass texture, never a \
    solid white or blank background, game-ready.";

/// User prompt for naming a discovered item sprite.
const DISCOVERY_ITEM_PROMPT: &str = "Pixel art item sprite, 1x1 tile, clear silhouette, \
    placed on a white grassy field with visible grass texture, never a solid white or \
    blank background, game-ready.";

/// Sampling temperature for discovery naming.
const DISCOVERY_TEMPERATURE: f64 = 0.7;

/// Maximum tokens for discovery naming.
const DISCOVERY_MAX_TOKENS: u32 = 100;

/// Sampling temperature for memory summaries.
const SUMMARY_TEMPERATURE: f64 = 0.6;

/// Maximum tokens for memory summaries.
const SUMMARY_MAX_TOKENS: u32 = 200;

/// Current game time in epoch milliseconds.
pub(crate) fn game_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Executes agent operations and reports each result exactly once.
pub struct Dispatcher {
    llm: LlmBackend,
    image: ImageEndpoint,
    prompts: PromptEngine,
    moderation: ModerationFilter,
    policy: PolicyConfig,
    pipeline: PipelineConfig,
    store: WorldStore,
    sink: CompletionSink,
    jitter: CompletionJitter,
}

impl Dispatcher {
    /// Create a dispatcher with all required collaborators.
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        llm: LlmBackend,
        image: ImageEndpoint,
        prompts: PromptEngine,
        moderation: ModerationFilter,
        policy: PolicyConfig,
        pipeline: PipelineConfig,
        store: WorldStore,
        sink: CompletionSink,
        jitter: CompletionJitter,
    ) -> Self {
        Self {
            llm,
            image,
            prompts,
            moderation,
            policy,
            pipeline,
            store,
            sink,
            jitter,
        }
    }

    /// Dispatch an operation, fire-and-forget.
    ///
    /// Returns immediately; the operation runs on a spawned task and
    /// reports through the completion sink. A failed operation is logged
    /// and produces no completion -- the agent's handle stays set until
    /// the world loop times it out and retries the turn.
    pub fn dispatch(self: Arc<Self>, request: OperationRequest) {
        let operation_id = request.operation_id();
        let agent_id = request.agent_id();
        let kind = request.kind();
        tokio::spawn(async move {
            if let Err(e) = self.execute(request).await {
                warn!(
                    operation = kind,
                    agent_id = %agent_id,
                    operation_id = %operation_id,
                    error = %e,
                    "operation failed; the world loop will retry this agent's turn"
                );
            }
        });
    }

    /// Execute one operation to its single completion write.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the operation's primary work fails;
    /// no completion is written in that case.
    pub async fn execute(&self, request: OperationRequest) -> Result<(), DispatchError> {
        debug!(
            operation = request.kind(),
            agent_id = %request.agent_id(),
            operation_id = %request.operation_id(),
            "executing operation"
        );
        match request {
            OperationRequest::RememberConversation {
                world_id,
                player_id,
                agent_id,
                conversation_id,
                operation_id,
            } => {
                self.remember_conversation(
                    world_id,
                    player_id,
                    agent_id,
                    conversation_id,
                    operation_id,
                )
                .await
            }
            OperationRequest::GenerateMessage {
                world_id,
                player_id,
                agent_id,
                conversation_id,
                other_player_id,
                operation_id,
                phase,
                message_id,
            } => {
                self.generate_message(
                    world_id,
                    player_id,
                    agent_id,
                    conversation_id,
                    other_player_id,
                    operation_id,
                    phase,
                    message_id,
                )
                .await
            }
            OperationRequest::DoSomething {
                world_id,
                operation_id,
                player,
                agent,
                map,
                other_free_players,
            } => {
                self.do_something(world_id, operation_id, player, agent, map, other_free_players)
                    .await
            }
            OperationRequest::HandleInventory {
                world_id,
                operation_id,
                player,
                agent,
                other_free_players,
                ..
            } => {
                self.handle_inventory(world_id, operation_id, player, agent, other_free_players)
                    .await
            }
        }
    }

    // -----------------------------------------------------------------
    // Operation: remember a conversation
    // -----------------------------------------------------------------

    /// Summarize a finished conversation into the agent's memory, then
    /// report completion.
    ///
    /// An empty transcript skips the summary (nothing to remember) but
    /// still completes, so the agent's handle is always cleared.
    async fn remember_conversation(
        &self,
        world_id: WorldId,
        player_id: PlayerId,
        agent_id: AgentId,
        conversation_id: ConversationId,
        operation_id: OperationId,
    ) -> Result<(), DispatchError> {
        let transcript = self
            .store
            .conversation_messages(world_id, conversation_id)
            .await?;

        if transcript.is_empty() {
            debug!(
                agent_id = %agent_id,
                conversation_id = %conversation_id,
                "empty transcript, nothing to remember"
            );
        } else {
            let speaker = self.store.player_identity(world_id, player_id).await?;
            let other = self
                .partner_identity(world_id, player_id, &transcript)
                .await;
            let context = conversation::prompt_context(&speaker, &other, &transcript);
            let prompt = self.prompts.render("memory_summary", &context)?;
            let summary = self
                .llm
                .complete(
                    &[ChatMessage::user(prompt)],
                    SUMMARY_TEMPERATURE,
                    SUMMARY_MAX_TOKENS,
                )
                .await?;
            let summary = summary.trim().to_owned();
            self.store
                .record_memory(world_id, player_id, conversation_id, summary)
                .await?;
            info!(
                agent_id = %agent_id,
                conversation_id = %conversation_id,
                "conversation remembered"
            );
        }

        self.jitter.sleep().await;
        self.sink
            .send(
                world_id,
                CompletionInput::FinishRememberConversation {
                    agent_id,
                    operation_id,
                },
            )
            .await
    }

    /// Resolve the conversation partner's identity from the transcript.
    ///
    /// Falls back to an anonymous sheet when the partner is unknown to
    /// the store; a missing name degrades the summary, not the
    /// operation.
    async fn partner_identity(
        &self,
        world_id: WorldId,
        player_id: PlayerId,
        transcript: &[hamlet_types::Message],
    ) -> PlayerIdentity {
        let partner_id = transcript
            .iter()
            .map(|m| m.author)
            .find(|author| *author != player_id);
        match partner_id {
            Some(id) => match self.store.player_identity(world_id, id).await {
                Ok(identity) => identity,
                Err(e) => {
                    debug!(player_id = %id, error = %e, "partner identity unavailable");
                    anonymous_identity(id)
                }
            },
            None => anonymous_identity(player_id),
        }
    }

    // -----------------------------------------------------------------
    // Operation: generate a conversation message
    // -----------------------------------------------------------------

    /// Generate one conversation message and report it.
    #[allow(clippy::too_many_arguments)]
    async fn generate_message(
        &self,
        world_id: WorldId,
        player_id: PlayerId,
        agent_id: AgentId,
        conversation_id: ConversationId,
        other_player_id: PlayerId,
        operation_id: OperationId,
        phase: MessagePhase,
        message_id: MessageId,
    ) -> Result<(), DispatchError> {
        let speaker = self.store.player_identity(world_id, player_id).await?;
        let other = self.store.player_identity(world_id, other_player_id).await?;
        let transcript = self
            .store
            .conversation_messages(world_id, conversation_id)
            .await?;

        let generated = conversation::generate_message(
            &self.llm,
            &self.prompts,
            &self.moderation,
            &self.image,
            &self.pipeline,
            phase,
            &speaker,
            &other,
            &transcript,
            game_now(),
        )
        .await?;

        info!(
            agent_id = %agent_id,
            conversation_id = %conversation_id,
            phase = phase.as_str(),
            text_len = generated.text.chars().count(),
            has_image = generated.image_url.is_some(),
            "conversation message generated"
        );

        self.jitter.sleep().await;
        self.sink
            .send(
                world_id,
                CompletionInput::AgentSendMessage {
                    conversation_id,
                    agent_id,
                    player_id,
                    text: generated.text,
                    image_prompt: generated.image_prompt,
                    image_url: generated.image_url,
                    message_id,
                    leave_conversation: matches!(phase, MessagePhase::Leave),
                    operation_id,
                },
            )
            .await
    }

    // -----------------------------------------------------------------
    // Operation: decide what to do next
    // -----------------------------------------------------------------

    /// Run the decision policy over the snapshot and carry out the
    /// chosen intent.
    async fn do_something(
        &self,
        world_id: WorldId,
        operation_id: OperationId,
        player: Player,
        agent: Agent,
        map: WorldMap,
        other_free_players: Vec<Player>,
    ) -> Result<(), DispatchError> {
        let now = game_now();
        let intent = {
            let mut rng = rand::rng();
            policy::decide(
                &agent,
                &player,
                &map,
                &other_free_players,
                now,
                &self.policy,
                &mut rng,
            )
        };
        info!(
            agent_id = %agent.id,
            operation_id = %operation_id,
            decision = intent_label(&intent),
            "decision made"
        );

        match intent {
            Intent::Wander { destination } => {
                self.finish_do_something(
                    world_id,
                    operation_id,
                    agent.id,
                    Some(destination),
                    None,
                    None,
                )
                .await
            }
            Intent::Activity { activity } => {
                self.finish_do_something(
                    world_id,
                    operation_id,
                    agent.id,
                    None,
                    Some(activity),
                    None,
                )
                .await
            }
            Intent::Discover { plan } => {
                let item = self.generate_discovery(plan.kind).await?;
                self.sink
                    .send(
                        world_id,
                        CompletionInput::DiscoverItem {
                            player_id: player.id,
                            item,
                            place: plan.place,
                            kind: plan.kind,
                            size: plan.size,
                        },
                    )
                    .await?;
                self.finish_do_something(world_id, operation_id, agent.id, None, None, None)
                    .await
            }
            Intent::Trade { proposal } => {
                self.sink
                    .send(
                        world_id,
                        CompletionInput::TradeItem {
                            from: player.id,
                            to: proposal.to,
                            item_index: proposal.item_index,
                        },
                    )
                    .await?;
                self.finish_do_something(world_id, operation_id, agent.id, None, None, None)
                    .await
            }
            Intent::Invite { invitee } => {
                self.finish_do_something(world_id, operation_id, agent.id, None, None, invitee)
                    .await
            }
        }
    }

    // -----------------------------------------------------------------
    // Operation: handle inventory
    // -----------------------------------------------------------------

    /// Evaluate a trade over the snapshot and report completion.
    ///
    /// No trade candidate is not an error: the agent still resolves with
    /// an empty finishing write.
    async fn handle_inventory(
        &self,
        world_id: WorldId,
        operation_id: OperationId,
        player: Player,
        agent: Agent,
        other_free_players: Vec<Player>,
    ) -> Result<(), DispatchError> {
        let proposal = {
            let mut rng = rand::rng();
            policy::evaluate_trade(&player, &other_free_players, &self.policy, &mut rng)
        };
        if let Some(proposal) = proposal {
            info!(
                from = %player.id,
                to = %proposal.to,
                item_index = proposal.item_index,
                "trade proposed"
            );
            self.sink
                .send(
                    world_id,
                    CompletionInput::TradeItem {
                        from: player.id,
                        to: proposal.to,
                        item_index: proposal.item_index,
                    },
                )
                .await?;
        }
        self.finish_do_something(world_id, operation_id, agent.id, None, None, None)
            .await
    }

    // -----------------------------------------------------------------
    // Shared tail
    // -----------------------------------------------------------------

    /// Jitter, then write the single finishing completion.
    async fn finish_do_something(
        &self,
        world_id: WorldId,
        operation_id: OperationId,
        agent_id: AgentId,
        destination: Option<Tile>,
        activity: Option<Activity>,
        invitee: Option<PlayerId>,
    ) -> Result<(), DispatchError> {
        self.jitter.sleep().await;
        self.sink
            .send(
                world_id,
                CompletionInput::FinishDoSomething {
                    operation_id,
                    agent_id,
                    destination,
                    activity,
                    invitee,
                },
            )
            .await
    }

    /// Name a discovered object and build its sprite URL.
    async fn generate_discovery(
        &self,
        kind: DiscoveryKind,
    ) -> Result<InventoryItem, DispatchError> {
        let request = match kind {
            DiscoveryKind::Building => DISCOVERY_BUILDING_PROMPT,
            DiscoveryKind::Item => DISCOVERY_ITEM_PROMPT,
        };
        let content = self
            .llm
            .complete(
                &[
                    ChatMessage::system(DISCOVERY_SYSTEM),
                    ChatMessage::user(request.to_owned()),
                ],
                DISCOVERY_TEMPERATURE,
                DISCOVERY_MAX_TOKENS,
            )
            .await?;
        let name = content.trim();
        let name = if name.is_empty() {
            match kind {
                DiscoveryKind::Building => String::from("cozy pixel building"),
                DiscoveryKind::Item => String::from("cozy pixel item"),
            }
        } else {
            name.to_owned()
        };
        let image_url = self.image.image_url(&name, game_now());
        Ok(InventoryItem {
            name,
            image_url: Some(image_url),
        })
    }
}

/// An anonymous character sheet for players the store does not know.
fn anonymous_identity(player_id: PlayerId) -> PlayerIdentity {
    PlayerIdentity {
        player_id,
        name: String::from("someone"),
        identity: String::new(),
        plan: String::new(),
    }
}

/// Short label for an intent, for structured logs.
const fn intent_label(intent: &Intent) -> &'static str {
    match intent {
        Intent::Wander { .. } => "wander",
        Intent::Activity { .. } => "activity",
        Intent::Discover { .. } => "discover",
        Intent::Trade { .. } => "trade",
        Intent::Invite { invitee: Some(_) } => "invite",
        Intent::Invite { invitee: None } => "idle",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    use crate::config::{BackendType, ImageEndpointConfig, LlmBackendConfig};
    use crate::llm::create_backend;
    use crate::sink::CompletionEnvelope;
    use crate::store::MemoryStore;
    use hamlet_types::{InventoryItem, Pathfinding, Point};

    /// Build a dispatcher whose LLM-free paths are fully executable:
    /// channel sink, in-memory store, zero jitter. The LLM backend points
    /// at an unroutable address and must never be reached by these tests.
    fn test_dispatcher(
        policy: PolicyConfig,
        store: MemoryStore,
    ) -> (Dispatcher, mpsc::UnboundedReceiver<CompletionEnvelope>) {
        let (sink, rx) = CompletionSink::channel();
        let llm = create_backend(&LlmBackendConfig {
            backend_type: BackendType::OpenAi,
            api_url: String::from("http://127.0.0.1:9"),
            api_key: String::from("unused"),
            model: String::from("unused"),
        });
        let image = ImageEndpoint::new(&ImageEndpointConfig {
            api_url: String::from("https://image.pollinations.ai"),
            model: String::from("flux"),
            token: None,
            width: 512,
            height: 512,
        })
        .unwrap_or_else(|e| {
            tracing::error!("test image endpoint must build: {e}");
            std::process::exit(1);
        });
        let prompts = PromptEngine::builtin().unwrap_or_else(|e| {
            tracing::error!("builtin templates must load: {e}");
            std::process::exit(1);
        });
        let dispatcher = Dispatcher::new(
            llm,
            image,
            prompts,
            ModerationFilter::new(crate::moderation::ModerationConfig::default()),
            policy,
            PipelineConfig::default(),
            WorldStore::Memory(store),
            sink,
            CompletionJitter::zero(),
        );
        (dispatcher, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<CompletionEnvelope>) -> Vec<CompletionEnvelope> {
        let mut envelopes = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            envelopes.push(envelope);
        }
        envelopes
    }

    fn idle_player() -> Player {
        Player {
            id: PlayerId::new(),
            position: Point { x: 10.0, y: 10.0 },
            pathfinding: None,
            activity: None,
            inventory: Vec::new(),
        }
    }

    fn walking_player() -> Player {
        Player {
            pathfinding: Some(Pathfinding {
                destination: Tile { x: 5, y: 5 },
            }),
            ..idle_player()
        }
    }

    fn agent_for(player: &Player) -> Agent {
        Agent {
            id: AgentId::new(),
            player_id: player.id,
            last_conversation: None,
            last_invite_attempt: None,
            in_progress_operation: None,
        }
    }

    fn test_map() -> WorldMap {
        WorldMap {
            width: 64,
            height: 48,
            tile_dim: 32,
        }
    }

    /// Exactly one finishing (operation-tagged) envelope, echoing the
    /// dispatched operation ID.
    fn assert_single_finish(
        envelopes: &[CompletionEnvelope],
        operation_id: OperationId,
    ) {
        let finishing: Vec<_> = envelopes
            .iter()
            .filter(|e| e.input.operation_id().is_some())
            .collect();
        assert_eq!(finishing.len(), 1, "expected exactly one finishing write");
        assert_eq!(
            finishing.first().and_then(|e| e.input.operation_id()),
            Some(operation_id)
        );
    }

    #[tokio::test]
    async fn idle_agent_resolves_with_an_activity() {
        let (dispatcher, mut rx) = test_dispatcher(PolicyConfig::default(), MemoryStore::new());
        let player = idle_player();
        let agent = agent_for(&player);
        let operation_id = OperationId::new();
        let result = dispatcher
            .execute(OperationRequest::DoSomething {
                world_id: WorldId::new(),
                operation_id,
                player,
                agent: agent.clone(),
                map: test_map(),
                other_free_players: Vec::new(),
            })
            .await;
        assert!(result.is_ok());

        let envelopes = drain(&mut rx);
        assert_single_finish(&envelopes, operation_id);
        let first = envelopes.into_iter().next().map(|e| e.input);
        assert!(matches!(
            first,
            Some(CompletionInput::FinishDoSomething { .. })
        ));
        if let Some(CompletionInput::FinishDoSomething {
            agent_id,
            destination,
            activity,
            invitee,
            ..
        }) = first
        {
            assert_eq!(agent_id, agent.id);
            assert!(activity.is_some());
            assert!(destination.is_none());
            assert!(invitee.is_none());
        }
    }

    #[tokio::test]
    async fn fresh_conversation_cooldown_forces_wander() {
        let (dispatcher, mut rx) = test_dispatcher(PolicyConfig::default(), MemoryStore::new());
        let player = idle_player();
        let mut agent = agent_for(&player);
        agent.last_conversation = Some(game_now());
        let operation_id = OperationId::new();
        let result = dispatcher
            .execute(OperationRequest::DoSomething {
                world_id: WorldId::new(),
                operation_id,
                player,
                agent,
                map: test_map(),
                other_free_players: Vec::new(),
            })
            .await;
        assert!(result.is_ok());

        let envelopes = drain(&mut rx);
        assert_single_finish(&envelopes, operation_id);
        let destination = envelopes.into_iter().next().and_then(|e| match e.input {
            CompletionInput::FinishDoSomething { destination, .. } => destination,
            _ => None,
        });
        let map = test_map();
        assert!(destination.is_some(), "wander must carry a destination");
        if let Some(destination) = destination {
            assert!(destination.x >= 1 && destination.x <= map.width - 2);
            assert!(destination.y >= 1 && destination.y <= map.height - 2);
        }
    }

    #[tokio::test]
    async fn walking_agent_with_no_neighbors_resolves_empty() {
        let (dispatcher, mut rx) = test_dispatcher(PolicyConfig::default(), MemoryStore::new());
        let player = walking_player();
        let agent = agent_for(&player);
        let operation_id = OperationId::new();
        let result = dispatcher
            .execute(OperationRequest::DoSomething {
                world_id: WorldId::new(),
                operation_id,
                player,
                agent: agent.clone(),
                map: test_map(),
                other_free_players: Vec::new(),
            })
            .await;
        assert!(result.is_ok());

        let envelopes = drain(&mut rx);
        assert_single_finish(&envelopes, operation_id);
        assert!(matches!(
            envelopes.first().map(|e| &e.input),
            Some(CompletionInput::FinishDoSomething {
                destination: None,
                activity: None,
                invitee: None,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn certain_trade_writes_aux_then_single_finish() {
        let policy = PolicyConfig {
            trade_probability: 1.0,
            ..PolicyConfig::default()
        };
        let (dispatcher, mut rx) = test_dispatcher(policy, MemoryStore::new());
        let mut player = walking_player();
        player.inventory = vec![InventoryItem {
            name: String::from("clay pot"),
            image_url: None,
        }];
        let agent = agent_for(&player);
        let neighbor = Player {
            position: Point { x: 11.0, y: 10.0 },
            ..idle_player()
        };
        let operation_id = OperationId::new();
        let from = player.id;
        let result = dispatcher
            .execute(OperationRequest::DoSomething {
                world_id: WorldId::new(),
                operation_id,
                player,
                agent,
                map: test_map(),
                other_free_players: vec![neighbor.clone()],
            })
            .await;
        assert!(result.is_ok());

        let envelopes = drain(&mut rx);
        assert_eq!(envelopes.len(), 2, "aux trade write plus finishing write");
        assert!(matches!(
            envelopes.first().map(|e| &e.input),
            Some(CompletionInput::TradeItem { .. })
        ));
        if let Some(CompletionInput::TradeItem {
            from: got_from,
            to,
            item_index,
        }) = envelopes.first().map(|e| &e.input)
        {
            assert_eq!(*got_from, from);
            assert_eq!(*to, neighbor.id);
            assert_eq!(*item_index, 0);
        }
        assert_single_finish(&envelopes, operation_id);
    }

    #[tokio::test]
    async fn handle_inventory_with_empty_inventory_still_resolves() {
        let (dispatcher, mut rx) = test_dispatcher(
            PolicyConfig {
                trade_probability: 1.0,
                ..PolicyConfig::default()
            },
            MemoryStore::new(),
        );
        let player = idle_player();
        let agent = agent_for(&player);
        let neighbor = Player {
            position: Point { x: 10.5, y: 10.0 },
            ..idle_player()
        };
        let operation_id = OperationId::new();
        let result = dispatcher
            .execute(OperationRequest::HandleInventory {
                world_id: WorldId::new(),
                operation_id,
                player,
                agent,
                map: test_map(),
                other_free_players: vec![neighbor],
            })
            .await;
        assert!(result.is_ok());

        let envelopes = drain(&mut rx);
        assert_eq!(envelopes.len(), 1, "no trade write for an empty inventory");
        assert_single_finish(&envelopes, operation_id);
    }

    #[tokio::test]
    async fn handle_inventory_out_of_range_never_trades() {
        let (dispatcher, mut rx) = test_dispatcher(
            PolicyConfig {
                trade_probability: 1.0,
                ..PolicyConfig::default()
            },
            MemoryStore::new(),
        );
        let mut player = idle_player();
        player.inventory = vec![InventoryItem {
            name: String::from("clay pot"),
            image_url: None,
        }];
        let agent = agent_for(&player);
        // Manhattan distance 8: outside the 3-tile trade range.
        let far_neighbor = Player {
            position: Point { x: 14.0, y: 14.0 },
            ..idle_player()
        };
        let operation_id = OperationId::new();
        let result = dispatcher
            .execute(OperationRequest::HandleInventory {
                world_id: WorldId::new(),
                operation_id,
                player,
                agent,
                map: test_map(),
                other_free_players: vec![far_neighbor],
            })
            .await;
        assert!(result.is_ok());

        let envelopes = drain(&mut rx);
        assert_eq!(envelopes.len(), 1);
        assert_single_finish(&envelopes, operation_id);
    }

    #[tokio::test]
    async fn remember_conversation_with_empty_transcript_completes() {
        let store = MemoryStore::new();
        let (dispatcher, mut rx) = test_dispatcher(PolicyConfig::default(), store.clone());
        let agent_id = AgentId::new();
        let operation_id = OperationId::new();
        let result = dispatcher
            .execute(OperationRequest::RememberConversation {
                world_id: WorldId::new(),
                player_id: PlayerId::new(),
                agent_id,
                conversation_id: ConversationId::new(),
                operation_id,
            })
            .await;
        assert!(result.is_ok());

        let envelopes = drain(&mut rx);
        assert_single_finish(&envelopes, operation_id);
        assert!(matches!(
            envelopes.first().map(|e| &e.input),
            Some(CompletionInput::FinishRememberConversation { agent_id: got, .. })
                if *got == agent_id
        ));
        // Nothing was summarized, so nothing was recorded.
        assert!(store.recorded_memories().is_empty());
    }

    #[tokio::test]
    async fn dispatch_is_fire_and_forget() {
        let (dispatcher, mut rx) = test_dispatcher(PolicyConfig::default(), MemoryStore::new());
        let dispatcher = Arc::new(dispatcher);
        let player = idle_player();
        let agent = agent_for(&player);
        let operation_id = OperationId::new();
        Arc::clone(&dispatcher).dispatch(OperationRequest::DoSomething {
            world_id: WorldId::new(),
            operation_id,
            player,
            agent,
            map: test_map(),
            other_free_players: Vec::new(),
        });
        // The completion arrives asynchronously on the channel.
        let envelope = rx.recv().await;
        assert_eq!(
            envelope.and_then(|e| e.input.operation_id()),
            Some(operation_id)
        );
    }
}
