use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identifiers and timestamps
// ---------------------------------------------------------------------------

/// Mint a fresh opaque identifier. Every call returns a new v4 UUID, so
/// identifiers never collide across projects or bundles.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Return a timestamp strictly later than `previous`.
///
/// Normally this is just `Utc::now()`, but two writes inside the same clock
/// tick must still observe an advancing `updated_at`.
pub fn advance(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

// ---------------------------------------------------------------------------
// NodeKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Specification,
    Change,
    Directory,
    File,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Specification => "specification",
            NodeKind::Change => "change",
            NodeKind::Directory => "directory",
            NodeKind::File => "file",
        }
    }

    /// Document kinds carry content; directories only group children.
    pub fn is_document(self) -> bool {
        !matches!(self, NodeKind::Directory)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TaskStep
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStep {
    Initializing,
    CreatingBranch,
    GeneratingCode,
    PushingChanges,
    Completed,
    Error,
}

impl TaskStep {
    /// The successful path, in visiting order. `Error` is reachable from any
    /// non-terminal step and is deliberately not part of this sequence.
    pub fn all() -> &'static [TaskStep] {
        &[
            TaskStep::Initializing,
            TaskStep::CreatingBranch,
            TaskStep::GeneratingCode,
            TaskStep::PushingChanges,
            TaskStep::Completed,
        ]
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStep::Completed | TaskStep::Error)
    }

    /// Whether moving from `self` to `next` is a legal forward transition.
    pub fn precedes(self, next: TaskStep) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            TaskStep::Error => true,
            _ => (next as usize) > (self as usize),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStep::Initializing => "initializing",
            TaskStep::CreatingBranch => "creating_branch",
            TaskStep::GeneratingCode => "generating_code",
            TaskStep::PushingChanges => "pushing_changes",
            TaskStep::Completed => "completed",
            TaskStep::Error => "error",
        }
    }
}

impl fmt::Display for TaskStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Suggestion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub content: String,
}

impl Suggestion {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
