//! Pure decision logic for Hamlet town agents.
//!
//! Everything in this crate is a deterministic function of a snapshot plus
//! a supplied random source. The asynchronous dispatcher
//! (`hamlet-runner`) feeds it snapshots and carries out the returned
//! intents; nothing here performs I/O, reads clocks, or touches shared
//! state.
//!
//! # Modules
//!
//! - [`cooldown`] -- Elapsed/within helpers for game-time cooldowns
//! - [`activities`] -- The injected activity catalogue
//! - [`config`] -- The immutable policy tunables table
//! - [`policy`] -- The decision engine itself

pub mod activities;
pub mod config;
pub mod cooldown;
pub mod policy;

pub use activities::{ActivitySpec, default_catalogue};
pub use config::PolicyConfig;
pub use policy::{
    DiscoveryPlan, Intent, TradeProposal, decide, discovery_plan, evaluate_trade,
    find_conversation_candidate, wander_destination,
};
