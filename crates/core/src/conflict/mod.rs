//! Three-way conflict detection and AI-assisted resolution.

pub mod detector;
pub mod engine;

pub use detector::{detect, ConflictType, LineConflict};
pub use engine::ResolutionEngine;
