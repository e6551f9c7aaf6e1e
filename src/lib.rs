//! Locsync - repository synchronization and publish workflow engine for
//! translation files.
//!
//! Locsync owns the lifecycle of local working copies of translation
//! repositories: it clones and refreshes them on demand, materializes
//! in-memory translation tables into per-language YAML files, and proposes
//! the resulting changes upstream as pull requests.
//!
//! # Architecture
//!
//! The crate is layered, adapters at the bottom:
//!
//! - [`config`] - Project and process configuration loading
//! - [`vcs`] - Version-control adapter (single doorway to git operations)
//! - [`forge`] - Abstraction for remote hosting services (GitHub v1)
//! - [`codec`] - Dotted-key flatten/unflatten and YAML encoding
//! - [`registry`] - Process-wide cache of initialized working copies
//! - [`writer`] - Per-language file materialization with failure aggregation
//! - [`workflow`] - The publish workflow engine
//!
//! # Correctness Invariants
//!
//! 1. At most one working-copy handle exists per repository path; concurrent
//!    acquisitions join a single in-flight initialization
//! 2. At most one publish workflow mutates a given working tree at a time;
//!    concurrent callers are rejected with a busy signal rather than queued
//! 3. A written language file is always the complete encoding of the table
//!    snapshot it was given; there are no partial writes within one file
//! 4. A failed publish still attempts to return the working tree to the base
//!    branch before surfacing the error

pub mod codec;
pub mod config;
pub mod forge;
pub mod registry;
pub mod vcs;
pub mod workflow;
pub mod writer;

pub use workflow::{PrMetadata, PublishOutcome, Publisher, WorkflowError};
