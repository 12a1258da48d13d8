//! GitHub REST v3 client.

use crate::config::GitHubConfig;
use crate::errors::{FlapjackError, Result};
use crate::github::{ChecksStatus, CreatePullRequest, MergeMethod, PlatformHost, PullRequest};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT},
    Client,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

/// GitHub API client scoped to one repository.
pub struct GitHubClient {
    client: Client,
    api_url: String,
    owner: String,
    repo: String,
}

impl GitHubClient {
    /// Create a new client from the resolved configuration.
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let token = config
            .resolved_token()
            .ok_or_else(|| FlapjackError::config("GitHub token not configured (set GITHUB_TOKEN)"))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| FlapjackError::config(format!("Invalid auth header: {e}")))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("flapjack"));

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()
            .map_err(|e| FlapjackError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
        })
    }

    /// Repository-scoped API URL.
    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_url,
            self.owner,
            self.repo,
            path.trim_start_matches('/')
        )
    }

    async fn handle_response<T>(&self, response: reqwest::Response) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        if status.is_success() {
            trace!("Response body: {text}");
            serde_json::from_str(&text).map_err(|e| {
                FlapjackError::remote(format!("Failed to parse GitHub response: {e}"))
            })
        } else {
            Err(FlapjackError::github_api(status.as_u16(), text))
        }
    }

    async fn get<T>(&self, path: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = self.repo_url(path);
        debug!("GET {url}");
        let response = self.client.get(&url).send().await?;
        self.handle_response(response).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize,
        T: for<'de> Deserialize<'de>,
    {
        let url = self.repo_url(path);
        debug!("POST {url}");
        let response = self.client.post(&url).json(body).send().await?;
        self.handle_response(response).await
    }

    async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize,
        T: for<'de> Deserialize<'de>,
    {
        let url = self.repo_url(path);
        debug!("PATCH {url}");
        let response = self.client.patch(&url).json(body).send().await?;
        self.handle_response(response).await
    }

    async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize,
        T: for<'de> Deserialize<'de>,
    {
        let url = self.repo_url(path);
        debug!("PUT {url}");
        let response = self.client.put(&url).json(body).send().await?;
        self.handle_response(response).await
    }

    /// The open pull request whose head is `branch`, if any.
    async fn find_open_pr(&self, branch: &str) -> Result<Option<PullRequestPayload>> {
        let path = format!("pulls?head={}:{}&state=open", self.owner, branch);
        let mut prs: Vec<PullRequestPayload> = self.get(&path).await?;
        Ok(if prs.is_empty() {
            None
        } else {
            Some(prs.remove(0))
        })
    }

    async fn require_open_pr(&self, branch: &str) -> Result<PullRequestPayload> {
        self.find_open_pr(branch)
            .await?
            .ok_or_else(|| FlapjackError::remote(format!("No open pull request for '{branch}'")))
    }
}

#[async_trait]
impl PlatformHost for GitHubClient {
    async fn has_open_pr(&self, branch: &str) -> Result<bool> {
        Ok(self.find_open_pr(branch).await?.is_some())
    }

    async fn pr_url(&self, branch: &str) -> Result<Option<String>> {
        Ok(self.find_open_pr(branch).await?.map(|pr| pr.html_url))
    }

    async fn create_pr(&self, request: &CreatePullRequest) -> Result<PullRequest> {
        let payload = CreatePayload {
            title: &request.title,
            body: &request.body,
            head: &request.head,
            base: &request.base,
            draft: request.draft,
        };
        let created: PullRequestPayload = self.post("pulls", &payload).await?;

        if !request.reviewers.is_empty() {
            let path = format!("pulls/{}/requested_reviewers", created.number);
            let body = ReviewersPayload {
                reviewers: &request.reviewers,
            };
            // Reviewer assignment failing shouldn't undo a created PR.
            if let Err(e) = self.post::<_, serde_json::Value>(&path, &body).await {
                tracing::warn!("PR #{} created but reviewer request failed: {e}", created.number);
            }
        }

        Ok(created.into())
    }

    async fn update_pr_base(&self, branch: &str, new_base: &str) -> Result<()> {
        let pr = self.require_open_pr(branch).await?;
        let path = format!("pulls/{}", pr.number);
        let _: PullRequestPayload = self.patch(&path, &serde_json::json!({ "base": new_base })).await?;
        debug!("Re-targeted PR #{} at '{new_base}'", pr.number);
        Ok(())
    }

    async fn merge_pr(&self, branch: &str, method: MergeMethod) -> Result<()> {
        let pr = self.require_open_pr(branch).await?;
        let path = format!("pulls/{}/merge", pr.number);
        let _: serde_json::Value = self
            .put(&path, &serde_json::json!({ "merge_method": method }))
            .await?;
        debug!("Merged PR #{}", pr.number);
        Ok(())
    }

    async fn checks_status(&self, branch: &str) -> Result<ChecksStatus> {
        let path = format!("commits/{branch}/check-runs");
        let runs: CheckRunsPayload = self.get(&path).await?;

        let failed: Vec<String> = runs
            .check_runs
            .iter()
            .filter(|run| {
                !matches!(
                    run.conclusion.as_deref(),
                    Some("success") | Some("neutral") | Some("skipped")
                )
            })
            .map(|run| run.name.clone())
            .collect();

        Ok(ChecksStatus {
            passed: failed.is_empty(),
            failed,
        })
    }
}

#[derive(Debug, Serialize)]
struct CreatePayload<'a> {
    title: &'a str,
    body: &'a str,
    head: &'a str,
    base: &'a str,
    draft: bool,
}

#[derive(Debug, Serialize)]
struct ReviewersPayload<'a> {
    reviewers: &'a [String],
}

/// The slice of GitHub's pull request payload this client reads.
#[derive(Debug, Clone, Deserialize)]
struct PullRequestPayload {
    number: u64,
    html_url: String,
    title: String,
    head: RefPayload,
    base: RefPayload,
}

#[derive(Debug, Clone, Deserialize)]
struct RefPayload {
    #[serde(rename = "ref")]
    name: String,
}

impl From<PullRequestPayload> for PullRequest {
    fn from(payload: PullRequestPayload) -> Self {
        PullRequest {
            number: payload.number,
            url: payload.html_url,
            head: payload.head.name,
            base: payload.base.name,
            title: payload.title,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CheckRunsPayload {
    check_runs: Vec<CheckRunPayload>,
}

#[derive(Debug, Deserialize)]
struct CheckRunPayload {
    name: String,
    conclusion: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(api_url: &str) -> GitHubConfig {
        GitHubConfig {
            api_url: api_url.to_string(),
            owner: "octo".to_string(),
            repo: "stack".to_string(),
            token: Some("test-token".to_string()),
        }
    }

    #[test]
    fn test_repo_url_generation() {
        let client = GitHubClient::new(&test_config("https://api.github.com/")).unwrap();
        assert_eq!(
            client.repo_url("pulls"),
            "https://api.github.com/repos/octo/stack/pulls"
        );
        assert_eq!(
            client.repo_url("/pulls/7/merge"),
            "https://api.github.com/repos/octo/stack/pulls/7/merge"
        );
    }

    #[tokio::test]
    async fn test_has_open_pr() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!([{
            "number": 12,
            "html_url": "https://github.com/octo/stack/pull/12",
            "title": "[feature] change",
            "head": {"ref": "feature"},
            "base": {"ref": "main"}
        }]);
        let mock = server
            .mock("GET", "/repos/octo/stack/pulls")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let client = GitHubClient::new(&test_config(&server.url())).unwrap();
        assert!(client.has_open_pr("feature").await.unwrap());
        assert_eq!(
            client.pr_url("feature").await.unwrap(),
            Some("https://github.com/octo/stack/pull/12".to_string())
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_pr() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!({
            "number": 42,
            "html_url": "https://github.com/octo/stack/pull/42",
            "title": "[feature] change",
            "head": {"ref": "feature"},
            "base": {"ref": "main"}
        });
        let mock = server
            .mock("POST", "/repos/octo/stack/pulls")
            .with_status(201)
            .with_body(body.to_string())
            .create_async()
            .await;

        let client = GitHubClient::new(&test_config(&server.url())).unwrap();
        let created = client
            .create_pr(&CreatePullRequest {
                title: "[feature] change".to_string(),
                body: "part of a stack".to_string(),
                head: "feature".to_string(),
                base: "main".to_string(),
                reviewers: Vec::new(),
                draft: false,
            })
            .await
            .unwrap();

        assert_eq!(created.number, 42);
        assert_eq!(created.base, "main");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_surfaces_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/octo/stack/pulls")
            .match_query(mockito::Matcher::Any)
            .with_status(403)
            .with_body("{\"message\": \"rate limited\"}")
            .create_async()
            .await;

        let client = GitHubClient::new(&test_config(&server.url())).unwrap();
        let err = client.has_open_pr("feature").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("403"));
        assert!(msg.contains("rate limited"));
    }

    #[tokio::test]
    async fn test_checks_status_reports_failures() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!({
            "check_runs": [
                {"name": "build", "conclusion": "success"},
                {"name": "lint", "conclusion": "failure"},
                {"name": "docs", "conclusion": "skipped"}
            ]
        });
        server
            .mock("GET", "/repos/octo/stack/commits/feature/check-runs")
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let client = GitHubClient::new(&test_config(&server.url())).unwrap();
        let status = client.checks_status("feature").await.unwrap();
        assert!(!status.passed);
        assert_eq!(status.failed, vec!["lint"]);
    }

    #[test]
    fn test_missing_token_is_config_error() {
        let mut config = test_config("https://api.github.com");
        config.token = None;
        // Clear env fallback for the assertion
        std::env::remove_var("GITHUB_TOKEN");
        assert!(matches!(
            GitHubClient::new(&config),
            Err(FlapjackError::Config(_))
        ));
    }
}
