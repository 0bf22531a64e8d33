use crate::error::RemoteError;
use crate::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use specflow_core::types::Suggestion;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 2048;

/// What a suggestion request is about.
#[derive(Debug, Clone, Default)]
pub struct SuggestionPrompt {
    pub project_name: String,
    pub content: String,
    pub context: Option<String>,
    pub requirement: Option<String>,
}

impl SuggestionPrompt {
    fn render(&self) -> String {
        let context = self
            .context
            .as_deref()
            .unwrap_or("OpenSpec specification improvement");
        let requirement = self
            .requirement
            .as_deref()
            .unwrap_or("Enhance clarity and testability");
        let project = if self.project_name.is_empty() {
            String::new()
        } else {
            format!("Project: {}\n", self.project_name)
        };
        format!(
            "You are an expert software architect reviewing an OpenSpec specification.\n\
             {project}Context: {context}\n\
             Goal: {requirement}\n\n\
             Provide 2-3 specific suggestions to improve the specification. Focus on \
             clarity and completeness, testability, edge cases, and likely \
             implementation challenges.\n\n\
             Specification content:\n{content}\n\n\
             Respond with a JSON array of suggestions, each with \"id\" and \"content\" fields.",
            content = self.content,
        )
    }
}

/// Produces editorial suggestions for a document.
#[async_trait]
pub trait SuggestionSource: Send + Sync {
    async fn suggest(&self, prompt: &SuggestionPrompt) -> Result<Vec<Suggestion>>;
}

/// The fixed pair returned whenever the AI service is unavailable.
pub fn fallback_suggestions() -> Vec<Suggestion> {
    vec![
        Suggestion::new("Consider adding more specific acceptance criteria for this feature."),
        Suggestion::new("Add error handling scenarios to make the specification more robust."),
    ]
}

/// Ask `source` for suggestions; on failure or an empty answer, log and
/// return [`fallback_suggestions`]. Never fails.
pub async fn suggest_or_fallback(
    source: &dyn SuggestionSource,
    prompt: &SuggestionPrompt,
) -> Vec<Suggestion> {
    match source.suggest(prompt).await {
        Ok(suggestions) if !suggestions.is_empty() => suggestions,
        Ok(_) => {
            warn!("suggestion service returned nothing, using fallback");
            fallback_suggestions()
        }
        Err(e) => {
            warn!(error = %e, "suggestion service failed, using fallback");
            fallback_suggestions()
        }
    }
}

// ---------------------------------------------------------------------------
// NoSuggestionService
// ---------------------------------------------------------------------------

/// Stand-in used when no API key is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSuggestionService;

#[async_trait]
impl SuggestionSource for NoSuggestionService {
    async fn suggest(&self, _prompt: &SuggestionPrompt) -> Result<Vec<Suggestion>> {
        Err(RemoteError::Misconfigured(
            "no AI service API key configured".into(),
        ))
    }
}

// ---------------------------------------------------------------------------
// AnthropicSuggestions
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSuggestion {
    #[serde(default)]
    id: Option<String>,
    content: String,
}

/// Messages API client.
#[derive(Clone)]
pub struct AnthropicSuggestions {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicSuggestions {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RemoteError::Misconfigured("ANTHROPIC_API_KEY is empty".into()));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }
}

#[async_trait]
impl SuggestionSource for AnthropicSuggestions {
    async fn suggest(&self, prompt: &SuggestionPrompt) -> Result<Vec<Suggestion>> {
        debug!(model = %self.model, max_tokens = self.max_tokens, "requesting suggestions");

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt.render(),
            }],
        };
        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                endpoint: "messages".into(),
                status: status.as_u16(),
                detail,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(format!("messages response: {e}")))?;
        let text: String = parsed
            .content
            .iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            return Err(RemoteError::Decode("response has no text content".into()));
        }
        parse_suggestions(&text)
    }
}

fn json_array() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\[.*\]").unwrap())
}

/// Extract the JSON array embedded in model output. Text with no array at
/// all becomes a single suggestion.
fn parse_suggestions(text: &str) -> Result<Vec<Suggestion>> {
    let Some(m) = json_array().find(text) else {
        return Ok(vec![Suggestion::new(text.trim())]);
    };
    let raw: Vec<RawSuggestion> = serde_json::from_str(m.as_str())
        .map_err(|e| RemoteError::Decode(format!("suggestion array: {e}")))?;
    Ok(raw
        .into_iter()
        .map(|r| match r.id {
            Some(id) if !id.is_empty() => Suggestion {
                id,
                content: r.content,
            },
            _ => Suggestion::new(r.content),
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
