//! forge::github
//!
//! GitHub forge implementation using the REST API.
//!
//! # Design
//!
//! Implements the `Forge` trait for GitHub. The publish workflow needs one
//! operation, `POST /repos/{owner}/{repo}/pulls`; headers are built with
//! typed constants and responses are mapped per status code so auth,
//! validation, and rate-limit failures stay distinguishable at the caller.
//!
//! # Rate Limiting
//!
//! GitHub has rate limits. This implementation returns
//! `ForgeError::RateLimited` when limits are hit and does not retry;
//! backing off is the caller's responsibility.

use log::{debug, info};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::traits::{CreatePrRequest, Forge, ForgeError, PullRequest};

/// Default GitHub API base URL.
const DEFAULT_API_BASE: &str = "https://api.github.com";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = concat!("locsync/", env!("CARGO_PKG_VERSION"));

/// GitHub forge implementation.
pub struct GitHubForge {
    /// HTTP client for making requests
    client: Client,
    /// API token
    token: String,
    /// Repository owner (user or organization)
    owner: String,
    /// Repository name
    repo: String,
    /// API base URL (configurable for GitHub Enterprise and tests)
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubForge")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubForge {
    /// Create a new GitHub forge.
    pub fn new(
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Create a GitHub forge with a custom API base URL.
    ///
    /// Use this for GitHub Enterprise installations, or to point the forge
    /// at a test server.
    pub fn with_api_base(
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
            api_base: api_base.into(),
        }
    }

    /// Get the repository owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Get the repository name.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, ForgeError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.token))
                .map_err(|_| ForgeError::AuthFailed("token is not a valid header value".into()))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.owner, self.repo, path
        )
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })
        } else {
            // Try to get an error message from the body
            let message = match response.json::<GitHubErrorResponse>().await {
                Ok(err) => err.message,
                Err(_) => "Unknown error".to_string(),
            };

            Err(match status {
                StatusCode::UNAUTHORIZED => {
                    ForgeError::AuthFailed("Invalid or expired token".into())
                }
                StatusCode::FORBIDDEN => {
                    ForgeError::AuthFailed(format!("Permission denied: {}", message))
                }
                StatusCode::NOT_FOUND => ForgeError::NotFound(message),
                StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
                _ => ForgeError::ApiError {
                    status: status.as_u16(),
                    message,
                },
            })
        }
    }
}

#[async_trait::async_trait]
impl Forge for GitHubForge {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError> {
        debug!(
            "creating pull request {} -> {} on {}/{}",
            request.head, request.base, self.owner, self.repo
        );

        let body = CreatePrBody {
            title: &request.title,
            head: &request.head,
            base: &request.base,
            body: request.body.as_deref(),
        };

        let response = self
            .client
            .post(self.repo_url("pulls"))
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        let pr: GitHubPullRequest = self.handle_response(response).await?;
        info!("created pull request #{}: {}", pr.number, pr.html_url);

        Ok(PullRequest {
            number: pr.number,
            url: pr.html_url,
            head: pr.head.r#ref,
            base: pr.base.r#ref,
            title: pr.title,
        })
    }
}

/// Request body for PR creation.
#[derive(Serialize)]
struct CreatePrBody<'a> {
    title: &'a str,
    head: &'a str,
    base: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
}

/// GitHub PR response (the fields we use).
#[derive(Deserialize)]
struct GitHubPullRequest {
    number: u64,
    html_url: String,
    title: String,
    head: GitHubRef,
    base: GitHubRef,
}

/// Branch reference within a PR response.
#[derive(Deserialize)]
struct GitHubRef {
    r#ref: String,
}

/// GitHub error response body.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_url_joins_segments() {
        let forge = GitHubForge::new("token", "acme", "webapp");
        assert_eq!(
            forge.repo_url("pulls"),
            "https://api.github.com/repos/acme/webapp/pulls"
        );
    }

    #[test]
    fn with_api_base_overrides_default() {
        let forge = GitHubForge::with_api_base("token", "acme", "webapp", "http://127.0.0.1:9999");
        assert_eq!(
            forge.repo_url("pulls"),
            "http://127.0.0.1:9999/repos/acme/webapp/pulls"
        );
    }

    #[test]
    fn debug_does_not_leak_token() {
        let forge = GitHubForge::new("ghp_secret", "acme", "webapp");
        let rendered = format!("{:?}", forge);
        assert!(!rendered.contains("ghp_secret"));
    }
}
