//! registry
//!
//! Process-wide cache of initialized repository working copies.
//!
//! # Design
//!
//! The registry guarantees that a repository is cloned and checked out to
//! its base branch exactly once before first use, even under concurrent
//! requests for the same path. The map entry for a path is a shared future
//! registered **before** any I/O starts, so concurrent callers join the
//! in-flight initialization instead of starting duplicate clones.
//!
//! Entries are tagged with a generation so that a failed attempt evicts
//! only itself: every waiter on the failed future observes the error and
//! the next `acquire` retries from scratch, while an initialization that
//! was restarted in the meantime is left alone.
//!
//! Completed entries live for the process lifetime. Callers that need a
//! fresh base state call [`RepoHandle::refresh`], not `acquire`.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, info};
use thiserror::Error;

use crate::config::ProjectConfig;
use crate::vcs::{GitCli, Vcs, VcsError};

/// Errors from working-copy initialization.
///
/// Clonable because every caller waiting on one in-flight initialization
/// receives the same failure; the underlying adapter error is shared.
#[derive(Debug, Clone, Error)]
pub enum InitError {
    /// Cloning the repository failed.
    #[error("failed to clone '{url}' into '{}': {source}", path.display())]
    Clone {
        url: String,
        path: PathBuf,
        source: Arc<VcsError>,
    },

    /// Checking out the base branch failed.
    #[error("failed to check out base branch '{branch}': {source}")]
    Checkout {
        branch: String,
        source: Arc<VcsError>,
    },

    /// Pulling the base branch failed.
    #[error("failed to pull base branch '{branch}': {source}")]
    Pull {
        branch: String,
        source: Arc<VcsError>,
    },
}

/// Factory producing the version-control adapter for a project.
///
/// The default builds a [`GitCli`] bound to the project's working tree;
/// tests inject mock adapters here.
pub type VcsFactory = Arc<dyn Fn(&ProjectConfig) -> Arc<dyn Vcs> + Send + Sync>;

/// One initialized local working copy.
///
/// Holds the owning project configuration and the adapter bound to the
/// working-tree path. Created only by [`RepoRegistry::acquire`].
pub struct RepoHandle {
    config: ProjectConfig,
    vcs: Arc<dyn Vcs>,
}

impl fmt::Debug for RepoHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoHandle")
            .field("repo_path", &self.config.repo_path)
            .field("base_branch", &self.config.base_branch)
            .finish()
    }
}

impl RepoHandle {
    /// The owning project configuration.
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// The version-control adapter bound to this working tree.
    pub fn vcs(&self) -> &dyn Vcs {
        self.vcs.as_ref()
    }

    /// Check out the base branch and pull, returning the base branch name.
    ///
    /// Called at the start of every publish workflow so the working tree
    /// starts from a current base state regardless of what prior runs left
    /// behind.
    pub async fn refresh(&self) -> Result<String, VcsError> {
        self.vcs.checkout(&self.config.base_branch).await?;
        self.vcs.pull().await?;
        Ok(self.config.base_branch.clone())
    }
}

type InitFuture = Shared<BoxFuture<'static, Result<Arc<RepoHandle>, InitError>>>;

struct Entry {
    generation: u64,
    future: InitFuture,
}

struct RegistryState {
    entries: HashMap<PathBuf, Entry>,
    next_generation: u64,
}

/// Cache of one initialized working-copy handle per repository path.
pub struct RepoRegistry {
    state: Mutex<RegistryState>,
    factory: VcsFactory,
}

impl fmt::Debug for RepoRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("RepoRegistry")
            .field("entries", &state.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RepoRegistry {
    /// Create a registry backed by the git command-line adapter.
    pub fn new() -> Self {
        Self::with_factory(Arc::new(|config: &ProjectConfig| {
            Arc::new(GitCli::new(&config.repo_path)) as Arc<dyn Vcs>
        }))
    }

    /// Create a registry with a custom adapter factory.
    pub fn with_factory(factory: VcsFactory) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                entries: HashMap::new(),
                next_generation: 0,
            }),
            factory,
        }
    }

    /// Get the initialized handle for a repository, initializing it on
    /// first use.
    ///
    /// Idempotent per repository path: concurrent callers join a single
    /// in-flight initialization, and a completed entry is returned without
    /// re-running checkout or pull. A failed attempt is evicted so a later
    /// call retries from scratch; the failure propagates to every caller
    /// that was waiting on that attempt.
    pub async fn acquire(&self, config: &ProjectConfig) -> Result<Arc<RepoHandle>, InitError> {
        let key = config.repo_path.clone();

        let (future, generation) = {
            let mut state = self.state.lock().unwrap();
            match state.entries.get(&key) {
                Some(entry) => (entry.future.clone(), entry.generation),
                None => {
                    state.next_generation += 1;
                    let generation = state.next_generation;
                    debug!(
                        "registering initialization for '{}' (generation {})",
                        key.display(),
                        generation
                    );
                    let future = Self::initialize(config.clone(), self.factory.clone())
                        .boxed()
                        .shared();
                    state.entries.insert(
                        key.clone(),
                        Entry {
                            generation,
                            future: future.clone(),
                        },
                    );
                    (future, generation)
                }
            }
        };

        match future.await {
            Ok(handle) => Ok(handle),
            Err(err) => {
                // Evict only this attempt; a restarted initialization under
                // a newer generation stays registered.
                let mut state = self.state.lock().unwrap();
                if state
                    .entries
                    .get(&key)
                    .is_some_and(|entry| entry.generation == generation)
                {
                    state.entries.remove(&key);
                }
                Err(err)
            }
        }
    }

    async fn initialize(
        config: ProjectConfig,
        factory: VcsFactory,
    ) -> Result<Arc<RepoHandle>, InitError> {
        let vcs = factory(&config);

        if !config.repo_path.exists() {
            info!(
                "cloning '{}' into '{}'",
                config.clone_url,
                config.repo_path.display()
            );
            vcs.clone_repo(&config.clone_url, &config.repo_path)
                .await
                .map_err(|e| InitError::Clone {
                    url: config.clone_url.clone(),
                    path: config.repo_path.clone(),
                    source: Arc::new(e),
                })?;
        }

        vcs.checkout(&config.base_branch)
            .await
            .map_err(|e| InitError::Checkout {
                branch: config.base_branch.clone(),
                source: Arc::new(e),
            })?;
        vcs.pull().await.map_err(|e| InitError::Pull {
            branch: config.base_branch.clone(),
            source: Arc::new(e),
        })?;

        info!(
            "working copy ready at '{}' on '{}'",
            config.repo_path.display(),
            config.base_branch
        );
        Ok(Arc::new(RepoHandle { config, vcs }))
    }
}

impl Default for RepoRegistry {
    fn default() -> Self {
        Self::new()
    }
}
