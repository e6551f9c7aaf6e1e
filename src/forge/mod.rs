//! forge
//!
//! Abstraction for remote hosting services.
//!
//! # Architecture
//!
//! The `Forge` trait defines the one hosting-API operation the publish
//! workflow needs: opening a pull request. It runs only after all local
//! work (branch, commit, push) has succeeded, so a forge failure leaves
//! nothing to undo locally beyond the workflow's normal restore step.
//!
//! # Modules
//!
//! - `traits`: the `Forge` trait and request/response types
//! - [`github`]: GitHub implementation using the REST API
//! - [`mock`]: mock implementation for deterministic testing

pub mod github;
pub mod mock;
mod traits;

pub use github::GitHubForge;
pub use traits::{CreatePrRequest, Forge, ForgeError, PullRequest};
