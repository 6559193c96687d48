//! Error types for the operation dispatcher.
//!
//! Uses `thiserror` for typed errors that surface through the dispatch
//! pipeline: NATS connectivity, LLM calls, prompt rendering, world-store
//! queries. Image-generation problems never appear here -- they are
//! swallowed at the call site because an illustration is cosmetic.

/// Errors that can occur while executing an operation.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Failed to connect to or communicate with the NATS server.
    #[error("NATS error: {0}")]
    Nats(String),

    /// The LLM backend returned an error or was unreachable.
    #[error("LLM backend error: {0}")]
    Llm(String),

    /// Failed to render a prompt template.
    #[error("template render error: {0}")]
    Template(String),

    /// The world store rejected or could not serve a query.
    #[error("world store error: {0}")]
    Store(String),

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}
