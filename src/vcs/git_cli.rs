//! vcs::git_cli
//!
//! Production `Vcs` implementation that shells out to the `git` binary.
//!
//! # Design
//!
//! Each trait method runs one `git` subcommand with the working tree as its
//! current directory, captures output, and maps a non-zero exit status to
//! [`VcsError::CommandFailed`] with the trimmed stderr. There is no output
//! parsing beyond `status --porcelain`, whose emptiness is the
//! uncommitted-changes check.
//!
//! Network operations (clone, pull, push) inherit whatever credentials the
//! process environment provides (ssh agent, credential helper); the adapter
//! adds none of its own.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;
use tokio::process::Command;

use super::traits::{Vcs, VcsError};

/// Git command-line adapter bound to one working-tree directory.
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
}

impl GitCli {
    /// Create an adapter for the given working tree. The directory does not
    /// need to exist yet; `clone_repo` creates it.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// The working-tree directory this adapter operates on.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Run `git <args>` in `dir` and return stdout on success.
    async fn run_in(dir: &Path, args: &[&str]) -> Result<String, VcsError> {
        let command = args.join(" ");
        debug!("running: git {} (in {})", command, dir.display());

        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .await
            .map_err(|source| VcsError::Spawn {
                command: command.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(VcsError::CommandFailed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    /// Run `git <args>` in this adapter's working tree.
    async fn run(&self, args: &[&str]) -> Result<String, VcsError> {
        Self::run_in(&self.workdir, args).await
    }
}

#[async_trait]
impl Vcs for GitCli {
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), VcsError> {
        tokio::fs::create_dir_all(dest)
            .await
            .map_err(|source| VcsError::Workdir {
                path: dest.to_path_buf(),
                source,
            })?;
        // `git clone <url> .` inside the destination keeps the invocation
        // independent of the parent directory's existence semantics.
        Self::run_in(dest, &["clone", url, "."]).await?;
        Ok(())
    }

    async fn checkout(&self, branch: &str) -> Result<(), VcsError> {
        self.run(&["checkout", branch]).await?;
        Ok(())
    }

    async fn pull(&self) -> Result<(), VcsError> {
        self.run(&["pull"]).await?;
        Ok(())
    }

    async fn create_branch(&self, name: &str, base: &str) -> Result<(), VcsError> {
        self.run(&["checkout", "-b", name, base]).await?;
        Ok(())
    }

    async fn add(&self, paths: &[PathBuf]) -> Result<(), VcsError> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args: Vec<&str> = vec!["add", "--"];
        let rendered: Vec<String> = paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        args.extend(rendered.iter().map(String::as_str));
        self.run(&args).await?;
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<(), VcsError> {
        self.run(&["commit", "-m", message]).await?;
        Ok(())
    }

    async fn push(&self, branch: &str) -> Result<(), VcsError> {
        self.run(&["push", "-u", "origin", branch]).await?;
        Ok(())
    }

    async fn has_uncommitted_changes(&self) -> Result<bool, VcsError> {
        let stdout = self.run(&["status", "--porcelain"]).await?;
        Ok(!stdout.trim().is_empty())
    }
}
