use specflow_core::config::Config;
use specflow_core::project::ProjectRegistry;
use specflow_core::task::TaskRegistry;
use specflow_remote::{
    AnthropicSuggestions, HttpRepoAutomation, HttpTaskAgent, NoSuggestionService,
    RepoAutomation, SuggestionSource, TaskAgent,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub projects: Arc<Mutex<ProjectRegistry>>,
    pub tasks: Arc<Mutex<TaskRegistry>>,
    pub automation: Arc<dyn RepoAutomation>,
    pub suggestions: Arc<dyn SuggestionSource>,
    /// Present only when a task agent endpoint is configured.
    pub agent: Option<Arc<dyn TaskAgent>>,
}

impl AppState {
    /// Wire the real HTTP collaborators from `config`. Without an API key
    /// every suggestion request is answered by the fallback pair.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let automation = HttpRepoAutomation::new(config.github_api_endpoint.clone(), timeout)?;
        let suggestions: Arc<dyn SuggestionSource> = if config.has_ai_key() {
            Arc::new(AnthropicSuggestions::new(
                config.anthropic_base_url.clone(),
                config.anthropic_api_key.clone(),
                config.anthropic_model.clone(),
                timeout,
            )?)
        } else {
            tracing::warn!("ANTHROPIC_API_KEY not set, suggestions will use the fallback");
            Arc::new(NoSuggestionService)
        };
        let agent: Option<Arc<dyn TaskAgent>> = if config.has_task_agent() {
            tracing::info!(endpoint = %config.task_agent_endpoint, "task agent enabled");
            Some(Arc::new(HttpTaskAgent::new(
                config.task_agent_endpoint.clone(),
                timeout,
            )?))
        } else {
            None
        };
        let state = Self::with_services(config, Arc::new(automation), suggestions);
        Ok(match agent {
            Some(agent) => state.with_task_agent(agent),
            None => state,
        })
    }

    pub fn with_services(
        config: Config,
        automation: Arc<dyn RepoAutomation>,
        suggestions: Arc<dyn SuggestionSource>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            projects: Arc::new(Mutex::new(ProjectRegistry::new())),
            tasks: Arc::new(Mutex::new(TaskRegistry::new())),
            automation,
            suggestions,
            agent: None,
        }
    }

    pub fn with_task_agent(mut self, agent: Arc<dyn TaskAgent>) -> Self {
        self.agent = Some(agent);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn from_config_starts_empty() {
        let state = AppState::from_config(Config::default()).unwrap();
        assert!(state.projects.lock().await.is_empty());
        assert!(state.tasks.lock().await.is_empty());
        assert_eq!(state.config.port, 8000);
        assert!(state.agent.is_none());
    }

    #[test]
    fn configured_endpoint_enables_agent() {
        let config = Config {
            task_agent_endpoint: "http://agent.internal:8520".into(),
            ..Config::default()
        };
        assert!(AppState::from_config(config).unwrap().agent.is_some());
    }

    #[test]
    fn empty_endpoint_is_rejected() {
        let config = Config {
            github_api_endpoint: String::new(),
            ..Config::default()
        };
        assert!(AppState::from_config(config).is_err());
    }
}
