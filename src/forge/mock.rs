//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock forge stores created PRs in memory, assigns sequential numbers,
//! and allows configuring a failure for the next `create_pr` call.
//!
//! # Example
//!
//! ```
//! use locsync::forge::mock::MockForge;
//! use locsync::forge::{CreatePrRequest, Forge};
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new();
//!
//! let pr = forge.create_pr(CreatePrRequest {
//!     head: "translations/2026-01-01T000000".to_string(),
//!     base: "main".to_string(),
//!     title: "sync translations".to_string(),
//!     body: None,
//! }).await.unwrap();
//!
//! assert_eq!(pr.number, 1);
//! assert!(pr.url.ends_with("/pull/1"));
//! # });
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::{CreatePrRequest, Forge, ForgeError, PullRequest};

/// Internal mutable state.
#[derive(Debug)]
struct MockForgeInner {
    /// Created PRs, in creation order.
    prs: Vec<PullRequest>,
    /// Next PR number to assign.
    next_pr_number: u64,
    /// Error to return from create_pr while set.
    fail_with: Option<ForgeError>,
}

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockForge {
    inner: Arc<Mutex<MockForgeInner>>,
}

impl MockForge {
    /// Create a new empty mock forge.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockForgeInner {
                prs: Vec::new(),
                next_pr_number: 1,
                fail_with: None,
            })),
        }
    }

    /// Configure create_pr to fail with the given error until cleared.
    pub fn fail_with(&self, error: ForgeError) {
        self.inner.lock().unwrap().fail_with = Some(error);
    }

    /// Clear any configured failure.
    pub fn clear_failure(&self) {
        self.inner.lock().unwrap().fail_with = None;
    }

    /// All PRs created so far, in creation order.
    pub fn created_prs(&self) -> Vec<PullRequest> {
        self.inner.lock().unwrap().prs.clone()
    }
}

impl Default for MockForge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(error) = &inner.fail_with {
            return Err(error.clone());
        }

        let number = inner.next_pr_number;
        inner.next_pr_number += 1;

        let pr = PullRequest {
            number,
            url: format!("https://github.com/mock/repo/pull/{}", number),
            head: request.head,
            base: request.base,
            title: request.title,
        };
        inner.prs.push(pr.clone());
        Ok(pr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(head: &str) -> CreatePrRequest {
        CreatePrRequest {
            head: head.to_string(),
            base: "main".to_string(),
            title: "sync translations".to_string(),
            body: Some("Automated translation sync".to_string()),
        }
    }

    #[tokio::test]
    async fn create_pr_assigns_sequential_numbers() {
        let forge = MockForge::new();
        let pr1 = forge.create_pr(request("branch-1")).await.unwrap();
        let pr2 = forge.create_pr(request("branch-2")).await.unwrap();
        assert_eq!(pr1.number, 1);
        assert_eq!(pr2.number, 2);
        assert_eq!(forge.created_prs().len(), 2);
    }

    #[tokio::test]
    async fn configured_failure_is_returned() {
        let forge = MockForge::new();
        forge.fail_with(ForgeError::RateLimited);
        let err = forge.create_pr(request("branch")).await.unwrap_err();
        assert!(matches!(err, ForgeError::RateLimited));
        assert!(forge.created_prs().is_empty());

        forge.clear_failure();
        assert!(forge.create_pr(request("branch")).await.is_ok());
    }
}
