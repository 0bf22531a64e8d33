use crate::error::RemoteError;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

// ---------------------------------------------------------------------------
// Request payloads (serialised as the proxy's JSON bodies)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBranch {
    pub owner: String,
    pub repo: String,
    pub branch_name: String,
    pub source_branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushChanges {
    pub owner: String,
    pub repo: String,
    pub commit_message: String,
    pub files: Vec<FileChange>,
    pub branch: String,
    pub parent_branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePullRequest {
    pub owner: String,
    pub repo: String,
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
}

// ---------------------------------------------------------------------------
// RepoAutomation
// ---------------------------------------------------------------------------

/// Branch, commit, and pull-request operations against the source-control
/// host. Responses are passed through as opaque JSON.
#[async_trait]
pub trait RepoAutomation: Send + Sync {
    async fn create_branch(&self, req: &CreateBranch) -> Result<Value>;

    async fn push_changes(&self, req: &PushChanges) -> Result<Value>;

    async fn create_pull_request(&self, req: &CreatePullRequest) -> Result<Value>;

    async fn get_branches(&self, owner: &str, repo: &str) -> Result<Value>;
}

/// JSON-over-HTTP client for the automation proxy.
#[derive(Clone)]
pub struct HttpRepoAutomation {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRepoAutomation {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(RemoteError::Misconfigured(
                "repository automation endpoint is empty".into(),
            ));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: Serialize + ?Sized>(&self, endpoint: &str, body: &T) -> Result<Value> {
        let url = format!("{}/{endpoint}", self.base_url);
        debug!(url = %url, "POST repository automation");
        let response = self.client.post(&url).json(body).send().await?;
        read_response(endpoint, response).await
    }
}

#[async_trait]
impl RepoAutomation for HttpRepoAutomation {
    async fn create_branch(&self, req: &CreateBranch) -> Result<Value> {
        self.post("create-branch", req).await
    }

    async fn push_changes(&self, req: &PushChanges) -> Result<Value> {
        self.post("push-changes", req).await
    }

    async fn create_pull_request(&self, req: &CreatePullRequest) -> Result<Value> {
        self.post("create-pull-request", req).await
    }

    async fn get_branches(&self, owner: &str, repo: &str) -> Result<Value> {
        let url = format!("{}/branches", self.base_url);
        debug!(url = %url, owner, repo, "GET repository automation");
        let response = self
            .client
            .get(&url)
            .query(&[("owner", owner), ("repo", repo)])
            .send()
            .await?;
        read_response("branches", response).await
    }
}

pub(crate) async fn read_response(endpoint: &str, response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(RemoteError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            detail: error_detail(&text),
        });
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| RemoteError::Decode(format!("{endpoint}: {e}")))
}

/// Pull the most specific message out of an error body: the `error`,
/// `detail`, or `message` field of a JSON object, else the raw text.
fn error_detail(text: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        for key in ["error", "detail", "message"] {
            match map.get(key) {
                Some(Value::String(s)) => return s.clone(),
                Some(Value::Null) | None => {}
                Some(other) => return other.to_string(),
            }
        }
    }
    let trimmed = text.trim();
    if trimmed.is_empty() {
        "no response body".to_string()
    } else {
        trimmed.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client(server: &mockito::ServerGuard) -> HttpRepoAutomation {
        HttpRepoAutomation::new(format!("{}/", server.url()), Duration::from_secs(5)).unwrap()
    }

    fn branch_req() -> CreateBranch {
        CreateBranch {
            owner: "alice".into(),
            repo: "demo-repo".into(),
            branch_name: "feature/x".into(),
            source_branch: "main".into(),
        }
    }

    #[tokio::test]
    async fn create_branch_posts_camel_case_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/create-branch")
            .match_body(Matcher::Json(json!({
                "owner": "alice",
                "repo": "demo-repo",
                "branchName": "feature/x",
                "sourceBranch": "main"
            })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ref":"refs/heads/feature/x"}"#)
            .create_async()
            .await;

        let out = client(&server).create_branch(&branch_req()).await.unwrap();
        assert_eq!(out["ref"], "refs/heads/feature/x");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn conflict_is_classified_as_already_exists() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/create-branch")
            .with_status(409)
            .with_body(r#"{"error":"Reference already exists"}"#)
            .create_async()
            .await;

        let err = client(&server).create_branch(&branch_req()).await.unwrap_err();
        assert!(err.is_already_exists());
        assert!(err.to_string().contains("Reference already exists"));
    }

    #[tokio::test]
    async fn server_error_surfaces_detail() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/push-changes")
            .with_status(500)
            .with_body(r#"{"detail":"token expired"}"#)
            .create_async()
            .await;

        let req = PushChanges {
            owner: "alice".into(),
            repo: "demo-repo".into(),
            commit_message: "msg".into(),
            files: vec![FileChange {
                path: "openspec/IMPLEMENTATION.md".into(),
                content: "# Demo".into(),
            }],
            branch: "feature/x".into(),
            parent_branch: "feature/x".into(),
        };
        let err = client(&server).push_changes(&req).await.unwrap_err();
        match err {
            RemoteError::Status {
                endpoint,
                status,
                detail,
            } => {
                assert_eq!(endpoint, "push-changes");
                assert_eq!(status, 500);
                assert_eq!(detail, "token expired");
            }
            other => panic!("expected Status, got {other:?}"),
        }
        assert!(!client(&server).base_url().ends_with('/'));
    }

    #[tokio::test]
    async fn pull_request_body_and_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/create-pull-request")
            .match_body(Matcher::PartialJson(json!({
                "title": "Implement login",
                "head": "feature/x",
                "base": "main"
            })))
            .with_status(200)
            .with_body(r#"{"number":7,"url":"https://example.test/pr/7"}"#)
            .create_async()
            .await;

        let req = CreatePullRequest {
            owner: "alice".into(),
            repo: "demo-repo".into(),
            title: "Implement login".into(),
            body: "Adds SSO".into(),
            head: "feature/x".into(),
            base: "main".into(),
        };
        let pr = client(&server).create_pull_request(&req).await.unwrap();
        assert_eq!(pr["number"], 7);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn get_branches_sends_query() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/branches")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("owner".into(), "alice".into()),
                Matcher::UrlEncoded("repo".into(), "demo-repo".into()),
            ]))
            .with_status(200)
            .with_body(r#"["main","feature/x"]"#)
            .create_async()
            .await;

        let branches = client(&server)
            .get_branches("alice", "demo-repo")
            .await
            .unwrap();
        assert_eq!(branches, json!(["main", "feature/x"]));
    }

    #[test]
    fn error_detail_falls_back_to_text() {
        assert_eq!(error_detail("Bad Gateway"), "Bad Gateway");
        assert_eq!(error_detail(""), "no response body");
        assert_eq!(error_detail(r#"{"message":"nope"}"#), "nope");
    }

    #[test]
    fn empty_endpoint_is_rejected() {
        assert!(matches!(
            HttpRepoAutomation::new("", Duration::from_secs(1)),
            Err(RemoteError::Misconfigured(_))
        ));
    }
}
