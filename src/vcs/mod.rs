//! vcs
//!
//! Version-control adapter: the single doorway to git operations.
//!
//! # Architecture
//!
//! The [`Vcs`] trait defines the primitive operations the engine needs
//! against one working tree: clone, checkout, pull, branch, stage, commit,
//! push, and the uncommitted-changes check. The core invokes only these
//! primitives; it never constructs git invocations itself.
//!
//! # Modules
//!
//! - `traits`: the `Vcs` trait and `VcsError`
//! - [`git_cli`]: production implementation shelling out to the `git` binary
//! - [`mock`]: in-memory implementation for deterministic testing

pub mod git_cli;
pub mod mock;
mod traits;

pub use git_cli::GitCli;
pub use traits::{Vcs, VcsError};
