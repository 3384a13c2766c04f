#![deny(missing_docs)]

//! Core library for the portfolio retrieval-augmented assistant.

/// HTTP routing and REST handlers.
pub mod api;
/// Routing, lookups, prompting and conversation handling.
pub mod assistant;
/// Startup sequence producing a ready assistant.
pub mod bootstrap;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// In-memory similarity index over document chunks.
pub mod index;
/// Language model abstraction and adapters.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Session counters.
pub mod metrics;
/// Portfolio REST API client.
pub mod portfolio;
/// Document loading and chunking.
pub mod processing;
