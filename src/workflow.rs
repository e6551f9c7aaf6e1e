//! workflow
//!
//! The publish workflow engine.
//!
//! # Design
//!
//! `Publisher` executes the full synchronize-write-propose sequence for one
//! repository:
//!
//! 1. refresh (checkout base + pull)
//! 2. materialize language files
//! 3. diff-check (no-changes early out)
//! 4. branch from base, unique name per invocation
//! 5. stage exactly the written paths + commit
//! 6. push
//! 7. open pull request
//! 8. restore (checkout base + pull)
//!
//! Steps run strictly in order; each depends on working-tree state left by
//! the previous one. A failure from step 4 onward still attempts the
//! restore before surfacing, so one failed publish does not leave the
//! shared working tree stuck on a half-finished branch.
//!
//! # Serialization
//!
//! Each repository has its own gate. A publish that arrives while the gate
//! is held receives [`WorkflowError::Busy`] immediately instead of queuing:
//! a queued publish against a base branch that moved underneath it has no
//! clear semantics, so load is shed at the door. Publishes against
//! different repositories proceed independently.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use log::{info, warn};
use thiserror::Error;

use crate::codec::LanguageTables;
use crate::config::{ConfigError, ProjectConfig, Settings};
use crate::forge::{CreatePrRequest, Forge, ForgeError, GitHubForge};
use crate::registry::{InitError, RepoHandle, RepoRegistry};
use crate::vcs::VcsError;
use crate::writer::{self, WriteErrors};

/// The workflow step a failure occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Checkout base + pull before materializing.
    Refresh,
    /// Asking the working tree whether anything changed.
    DiffCheck,
    /// Creating the publish branch from base.
    Branch,
    /// Staging the written paths and committing.
    Commit,
    /// Pushing the publish branch to the remote.
    Push,
    /// Opening the pull request.
    OpenRequest,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Refresh => "refresh",
            Step::DiffCheck => "diff-check",
            Step::Branch => "branch",
            Step::Commit => "commit",
            Step::Push => "push",
            Step::OpenRequest => "open-request",
        };
        write!(f, "{}", name)
    }
}

/// Underlying cause of a workflow step failure.
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Vcs(#[from] VcsError),
    #[error(transparent)]
    Forge(#[from] ForgeError),
}

/// Errors from one publish invocation.
///
/// Callers can distinguish three user-visible non-success shapes: `Busy`
/// (try again later), `Step` (failed at a named step, tree restored
/// best-effort), and the write/init/config wrappers. "Nothing to publish"
/// is not an error; see [`PublishOutcome::NoChanges`].
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Another publish currently holds this repository's gate.
    #[error("a publish is already in progress for '{}'", repo.display())]
    Busy { repo: PathBuf },

    /// Project lookup or configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The working copy could not be initialized.
    #[error("repository initialization failed: {0}")]
    Init(#[from] InitError),

    /// One or more language files could not be written.
    #[error("failed to write language files: {0}")]
    Write(#[from] WriteErrors),

    /// A workflow step failed after materialization.
    #[error("publish failed at step {step}: {source}")]
    Step { step: Step, source: StepError },
}

impl WorkflowError {
    fn at(step: Step, source: impl Into<StepError>) -> Self {
        WorkflowError::Step {
            step,
            source: source.into(),
        }
    }
}

/// Caller-supplied pull-request metadata. Every field has a generated
/// default.
#[derive(Debug, Clone, Default)]
pub struct PrMetadata {
    /// PR title; defaults to a timestamped sync title.
    pub title: Option<String>,
    /// PR body; defaults to a short description of the sync.
    pub body: Option<String>,
    /// Extra branch-name suffix, for callers that want their invocation
    /// identifiable beyond the timestamp.
    pub branch_suffix: Option<String>,
}

/// Result of one successful publish invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Changes were proposed upstream.
    Published {
        /// The branch the changes were pushed on.
        branch: String,
        /// Web URL of the opened pull request.
        pull_request_url: String,
    },
    /// The materialized files matched the base state; no branch, commit,
    /// push, or pull request was created.
    NoChanges,
}

/// The publish workflow engine.
///
/// Owns the per-repository serialization gates and ties the registry,
/// writer, and forge together. One instance serves every configured
/// project in the process.
pub struct Publisher {
    settings: Settings,
    registry: Arc<RepoRegistry>,
    forge: Arc<dyn Forge>,
    gates: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl Publisher {
    /// Create a publisher backed by the git CLI adapter and the GitHub
    /// forge configured in `settings`.
    pub fn new(settings: Settings) -> Self {
        let forge: Arc<dyn Forge> = match settings.api_base() {
            Some(api_base) => Arc::new(GitHubForge::with_api_base(
                settings.github_token(),
                settings.github_owner(),
                settings.github_repo(),
                api_base,
            )),
            None => Arc::new(GitHubForge::new(
                settings.github_token(),
                settings.github_owner(),
                settings.github_repo(),
            )),
        };
        Self::with_components(settings, Arc::new(RepoRegistry::new()), forge)
    }

    /// Create a publisher with explicit registry and forge instances.
    pub fn with_components(
        settings: Settings,
        registry: Arc<RepoRegistry>,
        forge: Arc<dyn Forge>,
    ) -> Self {
        Self {
            settings,
            registry,
            forge,
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Run the full publish workflow for a project.
    ///
    /// `tables` is an immutable snapshot of the translation state to
    /// publish. Returns [`PublishOutcome::NoChanges`] when the materialized
    /// files match the committed base state.
    ///
    /// # Errors
    ///
    /// [`WorkflowError::Busy`] if a publish for this repository is already
    /// in flight; otherwise the error names the failing step. Failures
    /// after branch creation still attempt to return the working tree to
    /// the base branch before surfacing.
    pub async fn publish(
        &self,
        project_id: &str,
        tables: &LanguageTables,
        metadata: PrMetadata,
    ) -> Result<PublishOutcome, WorkflowError> {
        let project = self.settings.project(project_id)?.clone();
        let _gate = self.try_enter(&project)?;

        let handle = self.registry.acquire(&project).await?;

        let base = handle
            .refresh()
            .await
            .map_err(|e| WorkflowError::at(Step::Refresh, e))?;

        let written = writer::write_language_files(tables, &project.translations_path).await?;

        let changed = handle
            .vcs()
            .has_uncommitted_changes()
            .await
            .map_err(|e| WorkflowError::at(Step::DiffCheck, e))?;
        if !changed {
            info!(
                "nothing to publish for '{}': working tree matches '{}'",
                project_id, base
            );
            return Ok(PublishOutcome::NoChanges);
        }

        let branch = branch_name(&metadata);
        let result = self
            .propose(&handle, &base, &branch, &written, &metadata)
            .await;

        // Best-effort restore: the next invocation must start from a clean,
        // current base state whether or not the proposal succeeded.
        if let Err(e) = handle.refresh().await {
            warn!(
                "failed to restore '{}' to base branch '{}': {}",
                project.repo_path.display(),
                base,
                e
            );
        }

        let pull_request_url = result?;
        info!(
            "published '{}' on '{}': {}",
            project_id, branch, pull_request_url
        );
        Ok(PublishOutcome::Published {
            branch,
            pull_request_url,
        })
    }

    /// Materialize language files for a project without publishing.
    ///
    /// Takes the same per-repository gate as [`publish`], so a
    /// materialization cannot race a publish that is mid-flight on the same
    /// working tree.
    ///
    /// [`publish`]: Publisher::publish
    pub async fn materialize_languages(
        &self,
        project_id: &str,
        tables: &LanguageTables,
    ) -> Result<Vec<PathBuf>, WorkflowError> {
        let project = self.settings.project(project_id)?.clone();
        let _gate = self.try_enter(&project)?;

        self.registry.acquire(&project).await?;
        let written = writer::write_language_files(tables, &project.translations_path).await?;
        Ok(written)
    }

    /// Branch, stage, commit, push, and open the pull request.
    ///
    /// Returns the pull-request URL. Errors are step-tagged; restoring the
    /// working tree is the caller's responsibility.
    async fn propose(
        &self,
        handle: &RepoHandle,
        base: &str,
        branch: &str,
        written: &[PathBuf],
        metadata: &PrMetadata,
    ) -> Result<String, WorkflowError> {
        let vcs = handle.vcs();
        let stamp = Utc::now().format("%Y-%m-%d %H:%M UTC").to_string();

        vcs.create_branch(branch, base)
            .await
            .map_err(|e| WorkflowError::at(Step::Branch, e))?;

        vcs.add(written)
            .await
            .map_err(|e| WorkflowError::at(Step::Commit, e))?;
        let title = metadata
            .title
            .clone()
            .unwrap_or_else(|| format!("Sync translations ({})", stamp));
        vcs.commit(&title)
            .await
            .map_err(|e| WorkflowError::at(Step::Commit, e))?;

        vcs.push(branch)
            .await
            .map_err(|e| WorkflowError::at(Step::Push, e))?;

        let body = metadata.body.clone().unwrap_or_else(|| {
            format!(
                "Automated translation sync of {} language file(s) at {}.",
                written.len(),
                stamp
            )
        });
        let pr = self
            .forge
            .create_pr(CreatePrRequest {
                head: branch.to_string(),
                base: base.to_string(),
                title,
                body: Some(body),
            })
            .await
            .map_err(|e| WorkflowError::at(Step::OpenRequest, e))?;

        Ok(pr.url)
    }

    /// Try to take the repository's gate, failing fast when held.
    fn try_enter(
        &self,
        project: &ProjectConfig,
    ) -> Result<tokio::sync::OwnedMutexGuard<()>, WorkflowError> {
        let gate = self.gate_for(&project.repo_path);
        gate.try_lock_owned().map_err(|_| WorkflowError::Busy {
            repo: project.repo_path.clone(),
        })
    }

    fn gate_for(&self, repo: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut gates = self.gates.lock().unwrap();
        gates
            .entry(repo.to_path_buf())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

/// Unique branch name for one publish invocation.
///
/// Timestamped so branches left un-merged by prior runs never collide; an
/// optional caller suffix distinguishes invocations within one second.
fn branch_name(metadata: &PrMetadata) -> String {
    let stamp = Utc::now().format("%Y-%m-%dT%H%M%S");
    match &metadata.branch_suffix {
        Some(suffix) => format!("translations/{}-{}", stamp, suffix),
        None => format!("translations/{}", stamp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::LanguageTables;
    use crate::config::{GithubConfig, SettingsFile};
    use crate::forge::mock::MockForge;
    use crate::vcs::mock::{FailOn, MockVcs, VcsOperation};
    use crate::vcs::Vcs;
    use std::collections::BTreeMap;

    struct Fixture {
        publisher: Publisher,
        vcs: MockVcs,
        forge: MockForge,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let repo_path = dir.path().join("repo");
        std::fs::create_dir(&repo_path).unwrap();

        let mut projects = BTreeMap::new();
        projects.insert(
            "webapp".to_string(),
            ProjectConfig {
                repo_path,
                clone_url: "git@github.com:acme/webapp.git".to_string(),
                base_branch: "main".to_string(),
                translations_path: dir.path().join("repo").join("locale"),
            },
        );
        let settings = Settings::from_file(SettingsFile {
            github: GithubConfig {
                token: Some("token".to_string()),
                owner: Some("acme".to_string()),
                repo: Some("webapp".to_string()),
                api_base: None,
            },
            projects,
        })
        .unwrap();

        let vcs = MockVcs::new("main");
        let vcs_for_factory = vcs.clone();
        let registry = Arc::new(RepoRegistry::with_factory(Arc::new(
            move |_: &ProjectConfig| Arc::new(vcs_for_factory.clone()) as Arc<dyn Vcs>,
        )));
        let forge = MockForge::new();

        Fixture {
            publisher: Publisher::with_components(settings, registry, Arc::new(forge.clone())),
            vcs,
            forge,
            _dir: dir,
        }
    }

    fn sv_table() -> LanguageTables {
        let mut table = BTreeMap::new();
        table.insert("a.b".to_string(), "hej".to_string());
        let mut tables = LanguageTables::new();
        tables.insert("sv".to_string(), table);
        tables
    }

    #[tokio::test]
    async fn publish_runs_full_sequence() {
        let fx = fixture();
        fx.vcs.set_uncommitted_changes(true);

        let outcome = fx
            .publisher
            .publish("webapp", &sv_table(), PrMetadata::default())
            .await
            .unwrap();

        let (branch, url) = match outcome {
            PublishOutcome::Published {
                branch,
                pull_request_url,
            } => (branch, pull_request_url),
            other => panic!("expected Published, got {:?}", other),
        };
        assert!(branch.starts_with("translations/"));
        assert!(url.ends_with("/pull/1"));

        let prs = fx.forge.created_prs();
        assert_eq!(prs.len(), 1);
        assert_eq!(prs[0].head, branch);
        assert_eq!(prs[0].base, "main");

        let ops = fx.vcs.operations();
        let commit_idx = ops
            .iter()
            .position(|op| matches!(op, VcsOperation::Commit { .. }))
            .unwrap();
        let push_idx = ops
            .iter()
            .position(|op| matches!(op, VcsOperation::Push { .. }))
            .unwrap();
        assert!(commit_idx < push_idx);

        // Stage set is exactly the written file.
        let staged = ops
            .iter()
            .find_map(|op| match op {
                VcsOperation::Add { paths } => Some(paths.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(staged.len(), 1);
        assert!(staged[0].ends_with("sv.yml"));

        // Restored to base after the PR.
        assert_eq!(fx.vcs.current_branch(), "main");
    }

    #[tokio::test]
    async fn clean_tree_yields_no_changes() {
        let fx = fixture();
        fx.vcs.set_uncommitted_changes(false);

        let outcome = fx
            .publisher
            .publish("webapp", &sv_table(), PrMetadata::default())
            .await
            .unwrap();
        assert_eq!(outcome, PublishOutcome::NoChanges);

        // No branch, commit, push, or PR was created.
        assert_eq!(
            fx.vcs
                .count_ops(|op| matches!(op, VcsOperation::CreateBranch { .. })),
            0
        );
        assert_eq!(fx.vcs.count_ops(|op| matches!(op, VcsOperation::Push { .. })), 0);
        assert!(fx.forge.created_prs().is_empty());
    }

    #[tokio::test]
    async fn push_failure_restores_base_branch() {
        let fx = fixture();
        fx.vcs.set_uncommitted_changes(true);
        fx.vcs.fail_on(FailOn::Push, "connection reset");

        let err = fx
            .publisher
            .publish("webapp", &sv_table(), PrMetadata::default())
            .await
            .unwrap_err();

        match err {
            WorkflowError::Step { step, .. } => assert_eq!(step, Step::Push),
            other => panic!("expected step error, got {:?}", other),
        }
        assert!(fx.forge.created_prs().is_empty());
        assert_eq!(fx.vcs.current_branch(), "main");
    }

    #[tokio::test]
    async fn forge_failure_is_tagged_open_request() {
        let fx = fixture();
        fx.vcs.set_uncommitted_changes(true);
        fx.forge.fail_with(ForgeError::RateLimited);

        let err = fx
            .publisher
            .publish("webapp", &sv_table(), PrMetadata::default())
            .await
            .unwrap_err();

        match err {
            WorkflowError::Step { step, .. } => assert_eq!(step, Step::OpenRequest),
            other => panic!("expected step error, got {:?}", other),
        }
        // Push already happened; tree still restored.
        assert_eq!(fx.vcs.current_branch(), "main");
    }

    #[tokio::test]
    async fn unknown_project_is_config_error() {
        let fx = fixture();
        let err = fx
            .publisher
            .publish("nope", &sv_table(), PrMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Config(_)));
    }

    #[tokio::test]
    async fn branch_suffix_lands_in_branch_name() {
        let fx = fixture();
        fx.vcs.set_uncommitted_changes(true);

        let outcome = fx
            .publisher
            .publish(
                "webapp",
                &sv_table(),
                PrMetadata {
                    branch_suffix: Some("manual".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        match outcome {
            PublishOutcome::Published { branch, .. } => assert!(branch.ends_with("-manual")),
            other => panic!("expected Published, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn materialize_writes_without_publishing() {
        let fx = fixture();

        let written = fx
            .publisher
            .materialize_languages("webapp", &sv_table())
            .await
            .unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].exists());
        assert!(fx.forge.created_prs().is_empty());
    }
}
