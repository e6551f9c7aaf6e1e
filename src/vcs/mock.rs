//! vcs::mock
//!
//! Mock version-control adapter for deterministic testing.
//!
//! # Design
//!
//! The mock tracks branch state in memory, records every operation for
//! verification, and can be configured to fail a specific operation. It
//! never touches the filesystem; tests that need real files on disk pair it
//! with a tempdir written by the language file writer.
//!
//! # Example
//!
//! ```
//! use locsync::vcs::mock::{MockVcs, VcsOperation};
//! use locsync::vcs::Vcs;
//!
//! # tokio_test::block_on(async {
//! let vcs = MockVcs::new("main");
//! vcs.checkout("main").await.unwrap();
//! vcs.create_branch("feature", "main").await.unwrap();
//! assert_eq!(vcs.current_branch(), "feature");
//! assert_eq!(
//!     vcs.operations().last(),
//!     Some(&VcsOperation::CreateBranch {
//!         name: "feature".to_string(),
//!         base: "main".to_string(),
//!     })
//! );
//! # });
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::{Vcs, VcsError};

/// Which operation should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    CloneRepo,
    Checkout,
    Pull,
    CreateBranch,
    Add,
    Commit,
    Push,
    StatusCheck,
}

impl FailOn {
    fn command(self) -> &'static str {
        match self {
            FailOn::CloneRepo => "clone",
            FailOn::Checkout => "checkout",
            FailOn::Pull => "pull",
            FailOn::CreateBranch => "checkout -b",
            FailOn::Add => "add",
            FailOn::Commit => "commit",
            FailOn::Push => "push",
            FailOn::StatusCheck => "status --porcelain",
        }
    }
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsOperation {
    CloneRepo { url: String, dest: PathBuf },
    Checkout { branch: String },
    Pull,
    CreateBranch { name: String, base: String },
    Add { paths: Vec<PathBuf> },
    Commit { message: String },
    Push { branch: String },
    StatusCheck,
}

#[derive(Debug)]
struct MockVcsInner {
    /// Branch the working tree is currently on.
    current_branch: String,
    /// What the next status check reports.
    uncommitted: bool,
    /// Operation to fail, with the stderr to report.
    fail_on: Option<(FailOn, String)>,
    /// Recorded operations in invocation order.
    operations: Vec<VcsOperation>,
}

/// Mock version-control adapter.
///
/// Thread-safe and cheaply cloneable; clones share state, so a test can
/// hand one clone to the code under test and inspect another.
#[derive(Debug, Clone)]
pub struct MockVcs {
    inner: Arc<Mutex<MockVcsInner>>,
}

impl MockVcs {
    /// Create a mock whose working tree starts on `branch` with no
    /// uncommitted changes.
    pub fn new(branch: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockVcsInner {
                current_branch: branch.into(),
                uncommitted: false,
                fail_on: None,
                operations: Vec::new(),
            })),
        }
    }

    /// Configure one operation to fail with the given stderr.
    pub fn fail_on(&self, op: FailOn, stderr: impl Into<String>) {
        self.inner.lock().unwrap().fail_on = Some((op, stderr.into()));
    }

    /// Clear any configured failure.
    pub fn clear_failure(&self) {
        self.inner.lock().unwrap().fail_on = None;
    }

    /// Set what the next status check reports.
    pub fn set_uncommitted_changes(&self, dirty: bool) {
        self.inner.lock().unwrap().uncommitted = dirty;
    }

    /// Branch the mock working tree is currently on.
    pub fn current_branch(&self) -> String {
        self.inner.lock().unwrap().current_branch.clone()
    }

    /// All recorded operations, in order.
    pub fn operations(&self) -> Vec<VcsOperation> {
        self.inner.lock().unwrap().operations.clone()
    }

    /// Count of recorded operations matching a predicate.
    pub fn count_ops(&self, pred: impl Fn(&VcsOperation) -> bool) -> usize {
        self.inner
            .lock()
            .unwrap()
            .operations
            .iter()
            .filter(|op| pred(op))
            .count()
    }

    /// Record `op`, then fail if `failing` is the configured failure.
    fn record(&self, failing: FailOn, op: VcsOperation) -> Result<(), VcsError> {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(op);
        if let Some((target, stderr)) = &inner.fail_on {
            if *target == failing {
                return Err(VcsError::CommandFailed {
                    command: failing.command().to_string(),
                    stderr: stderr.clone(),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Vcs for MockVcs {
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), VcsError> {
        self.record(
            FailOn::CloneRepo,
            VcsOperation::CloneRepo {
                url: url.to_string(),
                dest: dest.to_path_buf(),
            },
        )
    }

    async fn checkout(&self, branch: &str) -> Result<(), VcsError> {
        self.record(
            FailOn::Checkout,
            VcsOperation::Checkout {
                branch: branch.to_string(),
            },
        )?;
        self.inner.lock().unwrap().current_branch = branch.to_string();
        Ok(())
    }

    async fn pull(&self) -> Result<(), VcsError> {
        self.record(FailOn::Pull, VcsOperation::Pull)
    }

    async fn create_branch(&self, name: &str, base: &str) -> Result<(), VcsError> {
        self.record(
            FailOn::CreateBranch,
            VcsOperation::CreateBranch {
                name: name.to_string(),
                base: base.to_string(),
            },
        )?;
        self.inner.lock().unwrap().current_branch = name.to_string();
        Ok(())
    }

    async fn add(&self, paths: &[PathBuf]) -> Result<(), VcsError> {
        self.record(
            FailOn::Add,
            VcsOperation::Add {
                paths: paths.to_vec(),
            },
        )
    }

    async fn commit(&self, message: &str) -> Result<(), VcsError> {
        self.record(
            FailOn::Commit,
            VcsOperation::Commit {
                message: message.to_string(),
            },
        )?;
        self.inner.lock().unwrap().uncommitted = false;
        Ok(())
    }

    async fn push(&self, branch: &str) -> Result<(), VcsError> {
        self.record(
            FailOn::Push,
            VcsOperation::Push {
                branch: branch.to_string(),
            },
        )
    }

    async fn has_uncommitted_changes(&self) -> Result<bool, VcsError> {
        self.record(FailOn::StatusCheck, VcsOperation::StatusCheck)?;
        Ok(self.inner.lock().unwrap().uncommitted)
    }
}
