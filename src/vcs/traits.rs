//! vcs::traits
//!
//! Version-control adapter trait.
//!
//! # Design
//!
//! The `Vcs` trait is the single doorway to version-control operations
//! against one working-tree directory. The core never shells out to git
//! itself; it invokes these primitives and treats each call as a
//! synchronous-per-call operation that either succeeds or fails with a
//! transport/process error. Higher layers add the step context (which part
//! of the publish workflow was running) when wrapping these errors.
//!
//! Implementations must be `Send + Sync`; one instance is bound to one
//! working-tree path for its lifetime.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from version-control operations.
///
/// The adapter surfaces raw process failures; it does not try to classify
/// merge conflicts vs. network errors beyond what the command exit status
/// and stderr carry. The core wraps these with workflow-step context.
#[derive(Debug, Error)]
pub enum VcsError {
    /// The command ran and exited non-zero.
    #[error("git {command} failed: {stderr}")]
    CommandFailed {
        /// The subcommand and arguments that failed.
        command: String,
        /// Trimmed stderr from the process.
        stderr: String,
    },

    /// The command could not be spawned or its output read.
    #[error("failed to run git {command}: {source}")]
    Spawn {
        /// The subcommand that could not be run.
        command: String,
        source: io::Error,
    },

    /// Filesystem error preparing the working tree (e.g. creating the
    /// clone destination).
    #[error("working tree access error at '{}': {source}", path.display())]
    Workdir { path: PathBuf, source: io::Error },
}

/// The version-control adapter: primitive operations against one working
/// tree.
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Clone `url` into `dest`. `dest` may exist as an empty directory.
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), VcsError>;

    /// Check out an existing branch.
    async fn checkout(&self, branch: &str) -> Result<(), VcsError>;

    /// Pull the current branch from its upstream.
    async fn pull(&self) -> Result<(), VcsError>;

    /// Create `name` from `base` and switch to it.
    async fn create_branch(&self, name: &str, base: &str) -> Result<(), VcsError>;

    /// Stage exactly the given paths.
    async fn add(&self, paths: &[PathBuf]) -> Result<(), VcsError>;

    /// Commit staged changes with the given message.
    async fn commit(&self, message: &str) -> Result<(), VcsError>;

    /// Push `branch` to the remote, setting upstream.
    async fn push(&self, branch: &str) -> Result<(), VcsError>;

    /// Whether the working tree differs from its committed state
    /// (unstaged, staged, or untracked files all count).
    async fn has_uncommitted_changes(&self) -> Result<bool, VcsError>;
}
