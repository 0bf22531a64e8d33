//! Client for the task agent: a service that checks out a branch, works a
//! prompt against it, and reports back a summary.
//!
//! Optional. Generation runs only dispatch to it when an endpoint is
//! configured.

use crate::automation::read_response;
use crate::error::RemoteError;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const FEATURE_TASK_TYPE: &str = "feature-implementation";
pub const DEFAULT_MAX_TURNS: u32 = 25;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTaskRequest {
    pub task_type: String,
    pub repo_url: String,
    pub prompt: String,
    pub max_turns: u32,
}

impl AgentTaskRequest {
    pub fn feature(repo_url: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            task_type: FEATURE_TASK_TYPE.to_string(),
            repo_url: repo_url.into(),
            prompt: prompt.into(),
            max_turns: DEFAULT_MAX_TURNS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTaskStatus {
    pub status: String,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl AgentTaskStatus {
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status.as_str(), "failed" | "error")
    }
}

#[async_trait]
pub trait TaskAgent: Send + Sync {
    /// Queue a task and return the agent's id for it.
    async fn create_task(&self, req: &AgentTaskRequest) -> Result<String>;

    async fn task_status(&self, task_id: &str) -> Result<AgentTaskStatus>;
}

#[derive(Clone)]
pub struct HttpTaskAgent {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTaskAgent {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(RemoteError::Misconfigured("task agent endpoint is empty".into()));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl TaskAgent for HttpTaskAgent {
    async fn create_task(&self, req: &AgentTaskRequest) -> Result<String> {
        let url = format!("{}/tasks", self.base_url);
        debug!(url = %url, repo_url = %req.repo_url, "POST task agent");
        let response = self.client.post(&url).json(req).send().await?;
        let body = read_response("tasks", response).await?;
        body.get("taskId")
            .and_then(|id| id.as_str())
            .map(str::to_string)
            .ok_or_else(|| RemoteError::Decode("tasks: response has no taskId".into()))
    }

    async fn task_status(&self, task_id: &str) -> Result<AgentTaskStatus> {
        let url = format!("{}/tasks/{task_id}", self.base_url);
        let response = self.client.get(&url).send().await?;
        let body = read_response("tasks", response).await?;
        serde_json::from_value(body).map_err(|e| RemoteError::Decode(format!("tasks/{task_id}: {e}")))
    }
}
