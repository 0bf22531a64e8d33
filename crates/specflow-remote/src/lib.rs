//! `specflow-remote`: clients for the network collaborators specflow
//! drives but does not own.
//!
//! - [`RepoAutomation`]: the branch/commit/pull-request proxy in front of
//!   the source-control host. [`HttpRepoAutomation`] talks to it over JSON.
//! - [`SuggestionSource`]: editorial suggestions for a document.
//!   [`AnthropicSuggestions`] calls the Messages API; [`suggest_or_fallback`]
//!   guarantees callers always get suggestions back.
//! - [`TaskAgent`]: an optional coding agent a generation run hands the
//!   synced branch to. [`HttpTaskAgent`] talks to it over JSON.
//!
//! All are object-safe traits so the server can hold `Arc<dyn …>` and tests
//! can substitute in-process fakes.

pub mod agent;
pub mod automation;
pub mod error;
pub mod suggest;

pub use agent::{AgentTaskRequest, AgentTaskStatus, HttpTaskAgent, TaskAgent};
pub use automation::{
    CreateBranch, CreatePullRequest, FileChange, HttpRepoAutomation, PushChanges, RepoAutomation,
};
pub use error::RemoteError;
pub use suggest::{
    fallback_suggestions, suggest_or_fallback, AnthropicSuggestions, NoSuggestionService,
    SuggestionPrompt, SuggestionSource,
};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, RemoteError>;
