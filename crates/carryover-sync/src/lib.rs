//! Resource state synchronization for carryover.
//!
//! This crate provides the [`Synchronizer`], which restores the files a
//! previous pipeline run left behind for a resource:
//!
//! ```text
//! ┌──────────────┐   Bootstrap    ┌──────┐
//! │   Resolver   │───────────────▶│ done │
//! └──────────────┘                └──────┘
//!        │ Continue(content id)       ▲
//!        ▼                            │ fetch failed / empty
//! ┌──────────────┐                    │
//! │   Fetcher    │────────────────────┘
//! └──────────────┘
//!        │ snapshot
//!        ▼
//! ┌──────────────┐   bounded pool, first error stops dispatch
//! │ Materializer │
//! └──────────────┘
//!        │ all files written
//!        ▼
//! ┌──────────────┐   bounded pool, first error stops dispatch
//! │ Permissions  │
//! └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use carryover_store::FsStateStore;
//! use carryover_sync::{Synchronizer, TracingConsole};
//!
//! let synchronizer = Synchronizer::new(
//!     Arc::new(FsStateStore::new("/var/lib/carryover")),
//!     Arc::new(TracingConsole),
//! );
//! let report = synchronizer.synchronize(&resource, Path::new("/build/in")).await?;
//! ```
//!
//! [`capture`] is the other half of the cycle: it records a resource
//! directory as a snapshot once a run has finished.

mod capture;
mod console;
mod error;
mod fetcher;
mod filesystem;
mod layout;
mod materializer;
mod permissions;
mod pool;
mod report;
mod resolver;
mod synchronizer;

pub use capture::capture;
pub use console::{ChannelConsole, Console, ConsoleEvent, NoopConsole, TracingConsole};
pub use error::{CaptureError, FetchError, MaterializeError, PermissionError, SyncError};
pub use fetcher::fetch_snapshot;
pub use filesystem::{Filesystem, LocalFilesystem};
pub use layout::ResourceLayout;
pub use materializer::Materializer;
pub use permissions::PermissionApplier;
pub use pool::{PhaseOutcome, run_bounded};
pub use report::{FileOutcome, SyncOutcome, SyncReport};
pub use resolver::{Resolution, resolve};
pub use synchronizer::Synchronizer;
