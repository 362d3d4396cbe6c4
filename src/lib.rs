//! Account Prioritizer Library
//!
//! Ranks companies by sales readiness. For each domain the library fetches
//! firmographic, technographic, cloud-spend, IT-spend, functional-area and
//! contract signals from an MCP account-intelligence server, scores them and
//! returns a ranked list with reasons and a recommended action.
//!
//! # Modules
//!
//! - `api`: API-layer namespace.
//! - `core`: Scoring pipeline namespace.
//! - `integrations`: External service namespace.
//! - `badge`: Hot/Warm/Cold timing classifier.
//! - `blurb`: Sales note generation via a chat-completions API.
//! - `config`: Configuration management.
//! - `data_source`: Tool-call abstraction and run-scoped cache.
//! - `errors`: Error handling types.
//! - `extractors`: Payload to summary extractors.
//! - `handlers`: HTTP request handlers.
//! - `mcp_client`: Streamable-HTTP MCP session.
//! - `models`: Core data models.
//! - `orchestrator`: Batch driver with retries and ranking.
//! - `parsing`: Date, amount and payload parsing.
//! - `reasons`: Reasons and recommended action.
//! - `scoring`: Fit and final scores.

pub mod api;
pub mod core;
pub mod integrations;

pub mod badge;
pub mod blurb;
pub mod config;
pub mod data_source;
pub mod errors;
pub mod extractors;
pub mod handlers;
pub mod mcp_client;
pub mod models;
pub mod orchestrator;
pub mod parsing;
pub mod reasons;
pub mod scoring;
