//! Integration tests for the git CLI adapter and the end-to-end publish
//! scenario.
//!
//! These tests use real git repositories created via tempfile: a bare
//! "remote" plus working clones, so clone/pull/push exercise the same code
//! paths production does. The forge stays mocked; nothing leaves the
//! machine.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use tempfile::TempDir;

use locsync::codec::{self, LanguageTables};
use locsync::config::{GithubConfig, ProjectConfig, Settings, SettingsFile};
use locsync::forge::mock::MockForge;
use locsync::registry::RepoRegistry;
use locsync::vcs::{GitCli, Vcs};
use locsync::workflow::Step;
use locsync::{PrMetadata, PublishOutcome, Publisher, WorkflowError};

/// Run a git command in the given directory, panicking on failure.
fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed to run");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Test fixture: a bare remote with an initial commit on `main`, plus a
/// seed clone for manipulating the remote from the side.
struct TestRemote {
    dir: TempDir,
    remote_path: PathBuf,
    seed_path: PathBuf,
}

impl TestRemote {
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let remote_path = dir.path().join("remote.git");
        let seed_path = dir.path().join("seed");

        run_git(
            dir.path(),
            &["init", "--bare", "-b", "main", "remote.git"],
        );
        run_git(dir.path(), &["init", "-b", "main", "seed"]);
        Self::configure_identity(&seed_path);
        std::fs::write(seed_path.join("README.md"), "# Translations\n").unwrap();
        run_git(&seed_path, &["add", "README.md"]);
        run_git(&seed_path, &["commit", "-m", "initial commit"]);
        run_git(
            &seed_path,
            &["remote", "add", "origin", remote_path.to_str().unwrap()],
        );
        run_git(&seed_path, &["push", "-u", "origin", "main"]);

        Self {
            dir,
            remote_path,
            seed_path,
        }
    }

    fn configure_identity(repo: &Path) {
        run_git(repo, &["config", "user.email", "test@example.com"]);
        run_git(repo, &["config", "user.name", "Test User"]);
    }

    fn clone_url(&self) -> String {
        self.remote_path.to_str().unwrap().to_string()
    }

    /// A path under the fixture for a fresh working clone.
    fn workdir(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Branches currently present on the bare remote.
    fn remote_branches(&self) -> Vec<String> {
        run_git(&self.remote_path, &["branch", "--format=%(refname:short)"])
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Merge `branch` into main on the remote, via the seed clone.
    fn merge_into_main(&self, branch: &str) {
        run_git(&self.seed_path, &["fetch", "origin"]);
        run_git(&self.seed_path, &["checkout", "main"]);
        run_git(&self.seed_path, &["pull"]);
        run_git(
            &self.seed_path,
            &["merge", &format!("origin/{}", branch), "--no-edit"],
        );
        run_git(&self.seed_path, &["push", "origin", "main"]);
    }
}

fn sv_table() -> LanguageTables {
    let mut table = BTreeMap::new();
    table.insert("a.b".to_string(), "hej".to_string());
    let mut tables = LanguageTables::new();
    tables.insert("sv".to_string(), table);
    tables
}

/// Publisher wired to a real working clone of the test remote.
fn publisher_for(remote: &TestRemote, workdir: &Path) -> (Publisher, Arc<RepoRegistry>) {
    let mut projects = BTreeMap::new();
    projects.insert(
        "webapp".to_string(),
        ProjectConfig {
            repo_path: workdir.to_path_buf(),
            clone_url: remote.clone_url(),
            base_branch: "main".to_string(),
            translations_path: workdir.join("locale"),
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

    let registry = Arc::new(RepoRegistry::new());
    let publisher = Publisher::with_components(
        settings,
        registry.clone(),
        Arc::new(MockForge::new()),
    );
    (publisher, registry)
}

// =============================================================================
// GitCli Adapter
// =============================================================================

#[tokio::test]
async fn clone_checkout_pull_against_real_remote() {
    let remote = TestRemote::new();
    let work = remote.workdir("work");
    let git = GitCli::new(&work);

    git.clone_repo(&remote.clone_url(), &work).await.unwrap();
    git.checkout("main").await.unwrap();
    git.pull().await.unwrap();

    assert!(work.join("README.md").exists());
    assert!(!git.has_uncommitted_changes().await.unwrap());
}

#[tokio::test]
async fn status_reflects_untracked_and_modified_files() {
    let remote = TestRemote::new();
    let work = remote.workdir("work");
    let git = GitCli::new(&work);
    git.clone_repo(&remote.clone_url(), &work).await.unwrap();

    assert!(!git.has_uncommitted_changes().await.unwrap());

    std::fs::write(work.join("new-file.txt"), "untracked\n").unwrap();
    assert!(git.has_uncommitted_changes().await.unwrap());
}

#[tokio::test]
async fn branch_commit_push_reaches_remote() {
    let remote = TestRemote::new();
    let work = remote.workdir("work");
    let git = GitCli::new(&work);
    git.clone_repo(&remote.clone_url(), &work).await.unwrap();
    TestRemote::configure_identity(&work);

    git.create_branch("translations/test", "main").await.unwrap();
    let file = work.join("sv.yml");
    std::fs::write(&file, "a:\n  b: hej\n").unwrap();
    git.add(&[file]).await.unwrap();
    git.commit("add swedish translations").await.unwrap();
    git.push("translations/test").await.unwrap();

    assert!(remote
        .remote_branches()
        .contains(&"translations/test".to_string()));
}

#[tokio::test]
async fn failed_command_reports_stderr() {
    let remote = TestRemote::new();
    let work = remote.workdir("work");
    let git = GitCli::new(&work);
    git.clone_repo(&remote.clone_url(), &work).await.unwrap();

    let err = git.checkout("no-such-branch").await.unwrap_err();
    assert!(err.to_string().contains("no-such-branch"));
}

// =============================================================================
// End-to-End Publish Scenario
// =============================================================================

#[tokio::test]
async fn publish_then_identical_republish_is_no_changes() {
    let remote = TestRemote::new();
    let work = remote.workdir("work");
    let (publisher, registry) = publisher_for(&remote, &work);

    // Initialize the clone up front so the committer identity can be set
    // before the workflow commits.
    let project = ProjectConfig {
        repo_path: work.clone(),
        clone_url: remote.clone_url(),
        base_branch: "main".to_string(),
        translations_path: work.join("locale"),
    };
    registry.acquire(&project).await.unwrap();
    TestRemote::configure_identity(&work);

    // First publish: a branch and a PR, with the nested YAML on the branch.
    let outcome = publisher
        .publish("webapp", &sv_table(), PrMetadata::default())
        .await
        .unwrap();
    let branch = match outcome {
        PublishOutcome::Published { branch, .. } => branch,
        other => panic!("expected Published, got {:?}", other),
    };
    assert!(remote.remote_branches().contains(&branch));

    // Working tree is back on main.
    assert_eq!(run_git(&work, &["rev-parse", "--abbrev-ref", "HEAD"]), "main");

    // Once the proposal is merged, an identical table has nothing to add.
    remote.merge_into_main(&branch);
    let outcome = publisher
        .publish("webapp", &sv_table(), PrMetadata::default())
        .await
        .unwrap();
    assert_eq!(outcome, PublishOutcome::NoChanges);

    // The merged file carries the nested structure.
    let text = std::fs::read_to_string(work.join("locale").join("sv.yml")).unwrap();
    let flat = codec::decode(&text).unwrap();
    assert_eq!(flat["a.b"], "hej");
}

#[tokio::test]
async fn failed_push_leaves_tree_on_base_branch() {
    let remote = TestRemote::new();
    let work = remote.workdir("work");
    let (publisher, registry) = publisher_for(&remote, &work);

    let project = ProjectConfig {
        repo_path: work.clone(),
        clone_url: remote.clone_url(),
        base_branch: "main".to_string(),
        translations_path: work.join("locale"),
    };
    registry.acquire(&project).await.unwrap();
    TestRemote::configure_identity(&work);

    // Break only the push URL so refresh (fetch) still works and the
    // workflow fails at the push step.
    run_git(
        &work,
        &["remote", "set-url", "--push", "origin", "/nonexistent/remote.git"],
    );

    let err = publisher
        .publish("webapp", &sv_table(), PrMetadata::default())
        .await
        .unwrap_err();
    match err {
        WorkflowError::Step { step, .. } => assert_eq!(step, Step::Push),
        other => panic!("expected step error, got {:?}", other),
    }

    // Best-effort restore put the tree back on main.
    assert_eq!(run_git(&work, &["rev-parse", "--abbrev-ref", "HEAD"]), "main");
}
