//! Unified-diff validation and parsing.
//!
//! [`validator`] enforces the patch grammar before an upload is accepted;
//! [`parser`] produces per-file addition/deletion statistics. Both are pure
//! text scans with no side effects.

pub mod parser;
pub mod validator;

pub use parser::{parse, FileDiffStat, PatchSummary};
pub use validator::validate;
