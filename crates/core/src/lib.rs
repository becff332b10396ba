//! PatchGate core library.
//!
//! This crate provides the foundational components of the patch submission
//! pipeline: configuration, database persistence, patch validation and
//! parsing, conflict detection and AI-assisted resolution, the code-review
//! and remote-execution clients, and the submission orchestrator.

pub mod config;
pub mod conflict;
pub mod db;
pub mod deadline;
pub mod errors;
pub mod gerrit;
pub mod models;
pub mod notify;
pub mod orchestrator;
pub mod patch;
pub mod providers;
pub mod remote;

// Re-exports for convenience.
pub use config::AppConfig;
pub use conflict::ResolutionEngine;
pub use db::Database;
pub use orchestrator::Orchestrator;
pub use providers::ProviderRegistry;
