//! Carryover Config
//!
//! This crate contains the serializable configuration types for carryover.
//! A pipeline step hands the synchronizer a JSON document describing the
//! resource it depends on, where the workspace lives, and how the
//! synchronizer should behave:
//!
//! ```json
//! {
//!   "resource": {
//!     "name": "db-state",
//!     "type": "state",
//!     "resourceId": "res-42",
//!     "priorContentId": "abc123"
//!   },
//!   "workspaceRoot": "/build/in",
//!   "sync": { "concurrency": 10 }
//! }
//! ```
//!
//! A resource without `priorContentId` is on its first run and has nothing
//! to restore.

mod error;
mod resource;
mod step;

pub use error::ConfigError;
pub use resource::{Resource, is_content_id, is_path_segment};
pub use step::{DEFAULT_CONCURRENCY, StepParams, SyncConfig};
