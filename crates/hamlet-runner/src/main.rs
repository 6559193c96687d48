//! Operation dispatcher entry point for the Hamlet town simulation.
//!
//! The dispatcher is the asynchronous half of the town: the deterministic
//! world loop publishes agent operations over NATS, this binary executes
//! them (decision policy, conversation generation, moderation, optional
//! illustration), and reports each result back through exactly one
//! completion write tagged with the operation's correlation ID.
//!
//! # Architecture
//!
//! ```text
//! NATS (operation) --> Dispatcher --> { policy | conversation pipeline }
//!                                 --> LLM / image adapters
//!                                 --> jitter --> NATS (completion input)
//! ```
//!
//! A failed operation produces no completion; the world loop times the
//! agent's handle out and retries the turn.

mod config;
mod conversation;
mod dispatch;
mod error;
mod image;
mod jitter;
mod llm;
mod moderation;
mod nats;
mod prompt;
mod sink;
mod store;
mod town;

use std::path::Path;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::RunnerConfig;
use crate::dispatch::Dispatcher;
use crate::image::ImageEndpoint;
use crate::jitter::CompletionJitter;
use crate::llm::create_backend;
use crate::moderation::ModerationFilter;
use crate::nats::NatsClient;
use crate::prompt::PromptEngine;
use crate::sink::CompletionSink;
use crate::store::WorldStore;
use crate::town::TownConfig;

/// Application entry point.
///
/// Initializes logging, loads configuration, connects to NATS, builds
/// the adapters and the dispatcher, then drains the operation
/// subscription until the connection closes.
///
/// # Errors
///
/// Returns an error if initialization fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("hamlet-runner starting");

    // Load infrastructure configuration from the environment
    let config = RunnerConfig::from_env()?;
    info!(
        nats_url = config.nats_url,
        templates_dir = config.templates_dir,
        completion_jitter_ms = config.completion_jitter.as_millis(),
        "configuration loaded"
    );

    // Load behavioral configuration; a missing file means defaults.
    let town_path = Path::new(&config.town_config_path);
    let town = if town_path.exists() {
        let town = TownConfig::from_file(town_path)?;
        info!(path = config.town_config_path, "town configuration loaded");
        town
    } else {
        info!(
            path = config.town_config_path,
            "no town configuration file, using defaults"
        );
        TownConfig::default()
    };

    // Connect to NATS
    let nats = NatsClient::connect(&config.nats_url).await?;

    // Load prompt templates
    let prompts = PromptEngine::new(&config.templates_dir)?;
    info!(templates_dir = config.templates_dir, "prompt templates loaded");

    // Build the external call adapters
    let llm = create_backend(&config.llm_backend);
    info!(
        backend = llm.name(),
        model = config.llm_backend.model,
        "LLM backend configured"
    );
    let image = ImageEndpoint::new(&config.image)?;

    // Build and run the dispatcher
    let dispatcher = Arc::new(Dispatcher::new(
        llm,
        image,
        prompts,
        ModerationFilter::new(town.moderation),
        town.policy,
        town.pipeline,
        WorldStore::Nats(nats.clone()),
        CompletionSink::Nats(nats.clone()),
        CompletionJitter::new(config.completion_jitter),
    ));

    let subscriber = nats.subscribe_operations().await?;
    info!("dispatcher initialized, awaiting operations");
    nats.drain_operations(subscriber, |request| {
        Arc::clone(&dispatcher).dispatch(request);
    })
    .await;

    info!("operation intake ended, dispatcher shutting down");
    Ok(())
}
