//! writer
//!
//! Per-language file materialization with failure aggregation.
//!
//! # Design
//!
//! Given a set of per-language translation tables, the writer writes one
//! `<lang>.yml` file per language into the target directory. Every
//! language is attempted even if some fail: the fan-out joins all writes
//! and only then aggregates failures, so a broken path for one language
//! never prevents writing the others.
//!
//! On failure the call returns a [`WriteErrors`] aggregate naming every
//! failed language and its cause. Successfully written files stay on disk;
//! the publish workflow's diff-check sees whatever subset succeeded. On
//! success the returned paths are exactly the staging set for the commit
//! step, so untracked local state is never swept into a translation
//! commit.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use futures::future::join_all;
use log::{debug, warn};
use thiserror::Error;

use crate::codec::{self, CodecError, LanguageTable, LanguageTables};

/// A single failed write.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The target directory could not be created.
    #[error("failed to create translations directory '{}': {source}", path.display())]
    TargetDir { path: PathBuf, source: io::Error },

    /// The language table could not be encoded.
    #[error("failed to encode language '{language}': {source}")]
    Encode {
        language: String,
        source: CodecError,
    },

    /// The encoded file could not be written.
    #[error("failed to write '{}' for language '{language}': {source}", path.display())]
    Io {
        language: String,
        path: PathBuf,
        source: io::Error,
    },
}

/// Aggregate of every per-language failure from one write invocation.
#[derive(Debug)]
pub struct WriteErrors {
    /// Individual failures, one per language (plus at most one
    /// target-directory failure).
    pub errors: Vec<WriteError>,
}

impl fmt::Display for WriteErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} language file write(s) failed", self.errors.len())?;
        for err in &self.errors {
            write!(f, "; {}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for WriteErrors {}

/// File name for a language's translation file.
pub fn language_file_name(language: &str) -> String {
    format!("{}.yml", language)
}

/// Write one file per language into `target_dir`.
///
/// Returns exactly the set of paths that were successfully written. If one
/// or more languages fail, the call fails as a whole with an aggregate
/// error, but already-written files are not rolled back.
pub async fn write_language_files(
    tables: &LanguageTables,
    target_dir: &Path,
) -> Result<Vec<PathBuf>, WriteErrors> {
    if let Err(source) = tokio::fs::create_dir_all(target_dir).await {
        return Err(WriteErrors {
            errors: vec![WriteError::TargetDir {
                path: target_dir.to_path_buf(),
                source,
            }],
        });
    }

    let results = join_all(
        tables
            .iter()
            .map(|(language, table)| write_one(language, table, target_dir)),
    )
    .await;

    let mut written = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(path) => written.push(path),
            Err(err) => errors.push(err),
        }
    }

    if errors.is_empty() {
        Ok(written)
    } else {
        warn!(
            "wrote {} language file(s), {} failed",
            written.len(),
            errors.len()
        );
        Err(WriteErrors { errors })
    }
}

async fn write_one(
    language: &str,
    table: &LanguageTable,
    target_dir: &Path,
) -> Result<PathBuf, WriteError> {
    let path = target_dir.join(language_file_name(language));
    let text = codec::encode(table).map_err(|source| WriteError::Encode {
        language: language.to_string(),
        source,
    })?;

    tokio::fs::write(&path, text)
        .await
        .map_err(|source| WriteError::Io {
            language: language.to_string(),
            path: path.clone(),
            source,
        })?;

    debug!("wrote {} ({} keys)", path.display(), table.len());
    Ok(path)
}
