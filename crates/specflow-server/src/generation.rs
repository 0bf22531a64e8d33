//! The generation run: create the branch, render the summary, push it.
//!
//! A run owns nothing but its job. The only state it shares with request
//! handlers is the task record, written through the [`TaskRegistry`] after
//! each step.
//!
//! With a task agent configured the run also syncs the uploaded documents
//! to the branch before the agent starts, and waits for the agent during
//! `generating_code`.

use crate::state::AppState;
use specflow_core::project::Project;
use specflow_core::task::{TaskRegistry, TaskStatus};
use specflow_core::types::TaskStep;
use specflow_core::{publish, summary};
use specflow_remote::{
    AgentTaskRequest, CreateBranch, FileChange, PushChanges, RepoAutomation, TaskAgent,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const AGENT_RESULT_PREVIEW_CHARS: usize = 200;

/// One generation attempt. `project` is a snapshot taken when the task
/// was created; later edits to the project do not affect the run.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub task_id: String,
    pub project: Project,
    pub branch_name: String,
    /// Instructions for the task agent. Ignored without one.
    pub prompt: Option<String>,
}

#[derive(Clone)]
struct AgentDispatch {
    agent: Arc<dyn TaskAgent>,
    poll_interval: Duration,
    timeout: Duration,
}

#[derive(Clone)]
pub struct Orchestrator {
    tasks: Arc<Mutex<TaskRegistry>>,
    automation: Arc<dyn RepoAutomation>,
    agent: Option<AgentDispatch>,
    source_branch: String,
    summary_path: String,
}

impl Orchestrator {
    pub fn new(
        tasks: Arc<Mutex<TaskRegistry>>,
        automation: Arc<dyn RepoAutomation>,
        source_branch: impl Into<String>,
        summary_path: impl Into<String>,
    ) -> Self {
        Self {
            tasks,
            automation,
            agent: None,
            source_branch: source_branch.into(),
            summary_path: summary_path.into(),
        }
    }

    /// Hand each run to `agent`, polling every `poll_interval` for at most
    /// `timeout`.
    pub fn with_agent(
        mut self,
        agent: Arc<dyn TaskAgent>,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Self {
        self.agent = Some(AgentDispatch {
            agent,
            poll_interval,
            timeout,
        });
        self
    }

    pub fn from_state(state: &AppState) -> Self {
        let orchestrator = Self::new(
            state.tasks.clone(),
            state.automation.clone(),
            state.config.default_branch.clone(),
            state.config.summary_path.clone(),
        );
        match &state.agent {
            Some(agent) => orchestrator.with_agent(
                agent.clone(),
                Duration::from_secs(state.config.task_agent_poll_secs),
                Duration::from_secs(state.config.task_agent_timeout_secs),
            ),
            None => orchestrator,
        }
    }

    /// Run `job` on the tokio runtime. The caller does not need to await
    /// the handle; tests do.
    pub fn spawn(self, job: GenerationJob) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(&job).await })
    }

    /// Drive `job` to a terminal status. Never returns an error: every
    /// fault ends up in the task record.
    pub async fn run(&self, job: &GenerationJob) {
        let outcome = match self.steps(job).await {
            Ok(agent_result) => {
                info!(task_id = %job.task_id, branch = %job.branch_name, "generation completed");
                let message = match agent_result {
                    Some(result) => format!(
                        "Agent finished: {}. Branch {} is ready for review.",
                        result
                            .chars()
                            .take(AGENT_RESULT_PREVIEW_CHARS)
                            .collect::<String>()
                            .trim_end_matches('.'),
                        job.branch_name
                    ),
                    None => format!(
                        "Code generation completed. Branch {} is ready for review.",
                        job.branch_name
                    ),
                };
                TaskStatus::completed(message)
            }
            Err(e) => {
                error!(task_id = %job.task_id, error = %e, "generation failed");
                TaskStatus::failed(e.to_string())
            }
        };
        if let Err(e) = self.set_status(job, outcome).await {
            error!(task_id = %job.task_id, error = %e, "could not record final task status");
        }
    }

    /// Returns the agent's result when one ran.
    async fn steps(&self, job: &GenerationJob) -> anyhow::Result<Option<String>> {
        let project = &job.project;
        let change_id = publish::change_id(project);
        let mut synced: Vec<FileChange> = publish::synced_files(project)
            .into_iter()
            .map(|f| FileChange {
                path: f.path,
                content: f.content,
            })
            .collect();

        self.set_status(
            job,
            TaskStatus::running(
                TaskStep::CreatingBranch,
                format!("Creating branch {}...", job.branch_name),
            ),
        )
        .await?;
        let branch = CreateBranch {
            owner: project.owner.clone(),
            repo: project.repository.clone(),
            branch_name: job.branch_name.clone(),
            source_branch: self.source_branch.clone(),
        };
        match self.automation.create_branch(&branch).await {
            Ok(_) => info!(task_id = %job.task_id, branch = %job.branch_name, "branch created"),
            Err(e) if e.is_already_exists() => {
                warn!(task_id = %job.task_id, branch = %job.branch_name, error = %e, "branch already exists, continuing");
            }
            Err(e) => return Err(e.into()),
        }
        // The agent reads the documents from the branch, so they go first.
        if self.agent.is_some() && !synced.is_empty() {
            let files = std::mem::take(&mut synced);
            info!(task_id = %job.task_id, change_id = %change_id, files = files.len(), "syncing OpenSpec files");
            self.push(job, publish::sync_commit_message(&change_id), files)
                .await?;
        }

        let agent_result = match &self.agent {
            Some(dispatch) => {
                self.set_status(
                    job,
                    TaskStatus::running(TaskStep::GeneratingCode, "Queuing agent task..."),
                )
                .await?;
                Some(self.dispatch(dispatch, job, &change_id).await?)
            }
            None => {
                if job.prompt.is_some() {
                    warn!(task_id = %job.task_id, "no task agent configured, prompt ignored");
                }
                self.set_status(
                    job,
                    TaskStatus::running(
                        TaskStep::GeneratingCode,
                        "Generating implementation summary...",
                    ),
                )
                .await?;
                None
            }
        };
        let content = summary::render(project);

        self.set_status(
            job,
            TaskStatus::running(TaskStep::PushingChanges, "Pushing changes to repository..."),
        )
        .await?;
        let mut files = vec![FileChange {
            path: self.summary_path.clone(),
            content,
        }];
        files.extend(synced);
        self.push(job, summary::commit_message(project), files)
            .await?;
        Ok(agent_result)
    }

    async fn push(
        &self,
        job: &GenerationJob,
        commit_message: String,
        files: Vec<FileChange>,
    ) -> anyhow::Result<()> {
        let push = PushChanges {
            owner: job.project.owner.clone(),
            repo: job.project.repository.clone(),
            commit_message,
            files,
            branch: job.branch_name.clone(),
            parent_branch: job.branch_name.clone(),
        };
        self.automation.push_changes(&push).await?;
        Ok(())
    }

    /// Queue the agent task and wait for a terminal agent status. Poll
    /// failures are retried until the timeout.
    async fn dispatch(
        &self,
        dispatch: &AgentDispatch,
        job: &GenerationJob,
        change_id: &str,
    ) -> anyhow::Result<String> {
        let prompt = job
            .prompt
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| publish::default_agent_prompt(&job.branch_name, change_id));
        let request =
            AgentTaskRequest::feature(publish::branch_url(&job.project, &job.branch_name), prompt);
        let agent_task = dispatch.agent.create_task(&request).await?;
        info!(task_id = %job.task_id, agent_task = %agent_task, "agent task queued");

        let poll = async {
            loop {
                tokio::time::sleep(dispatch.poll_interval).await;
                match dispatch.agent.task_status(&agent_task).await {
                    Ok(status) if status.is_completed() => {
                        return Ok::<String, anyhow::Error>(
                            status
                                .result
                                .unwrap_or_else(|| "Implementation completed.".to_string()),
                        );
                    }
                    Ok(status) if status.is_failed() => {
                        return Err(anyhow::anyhow!(
                            "agent task failed: {}",
                            status.error.unwrap_or_else(|| "unknown error".to_string())
                        ));
                    }
                    Ok(status) => {
                        debug!(agent_task = %agent_task, status = %status.status, "agent task running")
                    }
                    Err(e) => warn!(agent_task = %agent_task, error = %e, "polling agent task failed"),
                }
            }
        };
        match tokio::time::timeout(dispatch.timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!(
                "agent task {agent_task} did not finish within {:?}",
                dispatch.timeout
            )),
        }
    }

    async fn set_status(&self, job: &GenerationJob, status: TaskStatus) -> anyhow::Result<()> {
        let step = status.step;
        self.tasks.lock().await.set_status(&job.task_id, status)?;
        info!(task_id = %job.task_id, step = %step, "task step");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
