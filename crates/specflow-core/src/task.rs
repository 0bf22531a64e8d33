use crate::error::{Result, SpecflowError};
use crate::types::{advance, new_id, TaskStep};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub step: TaskStep,
    pub message: String,
    pub completed: bool,
    pub error: bool,
}

impl TaskStatus {
    pub fn initializing() -> Self {
        Self::running(TaskStep::Initializing, "Starting code generation...")
    }

    /// A non-terminal status.
    pub fn running(step: TaskStep, message: impl Into<String>) -> Self {
        Self {
            step,
            message: message.into(),
            completed: false,
            error: false,
        }
    }

    pub fn completed(message: impl Into<String>) -> Self {
        Self {
            step: TaskStep::Completed,
            message: message.into(),
            completed: true,
            error: false,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            step: TaskStep::Error,
            message: message.into(),
            completed: true,
            error: true,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.completed || self.step.is_terminal()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub project_id: String,
    pub branch_name: String,
    pub status: TaskStatus,
    /// Every status the task has held, oldest first, current last.
    pub history: Vec<TaskStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// TaskRegistry
// ---------------------------------------------------------------------------

/// One record per generation attempt. Records are never removed.
///
/// Writes are plain overwrites: the registry does not police step order,
/// which is the orchestrator's job. It does refuse to touch a task that has
/// already reached `completed` or `error`.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, Task>,
    order: Vec<String>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, project_id: &str, branch_name: &str) -> Task {
        let mut id = new_id();
        while self.tasks.contains_key(&id) {
            id = new_id();
        }
        let now = Utc::now();
        let status = TaskStatus::initializing();
        let task = Task {
            id: id.clone(),
            project_id: project_id.to_string(),
            branch_name: branch_name.to_string(),
            history: vec![status.clone()],
            status,
            created_at: now,
            updated_at: now,
        };
        self.order.push(id.clone());
        self.tasks.insert(id, task.clone());
        task
    }

    pub fn set_status(&mut self, id: &str, status: TaskStatus) -> Result<&Task> {
        let task = self
            .tasks
            .get_mut(id)
            .ok_or_else(|| SpecflowError::TaskNotFound(id.to_string()))?;
        if task.status.is_terminal() {
            return Err(SpecflowError::TaskFinished(id.to_string()));
        }
        task.history.push(status.clone());
        task.status = status;
        task.updated_at = advance(task.updated_at);
        Ok(task)
    }

    pub fn get(&self, id: &str) -> Result<&Task> {
        self.tasks
            .get(id)
            .ok_or_else(|| SpecflowError::TaskNotFound(id.to_string()))
    }

    /// Tasks for one project, oldest first.
    pub fn list_for_project(&self, project_id: &str) -> Vec<&Task> {
        self.order
            .iter()
            .filter_map(|id| self.tasks.get(id))
            .filter(|t| t.project_id == project_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// True when the steps in `history` only ever move forward along the
/// successful path, optionally ending in `error`.
pub fn is_monotonic(history: &[TaskStatus]) -> bool {
    history
        .windows(2)
        .all(|pair| pair[0].step.precedes(pair[1].step))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_is_initializing() {
        let mut reg = TaskRegistry::new();
        let task = reg.create("p1", "feature/x");
        assert_eq!(task.status.step, TaskStep::Initializing);
        assert!(!task.status.message.is_empty());
        assert!(!task.status.completed);
        assert!(!task.status.error);
        assert_eq!(task.history.len(), 1);
        assert_eq!(reg.get(&task.id).unwrap().project_id, "p1");
    }

    #[test]
    fn full_lifecycle_is_monotonic_and_terminal() {
        let mut reg = TaskRegistry::new();
        let id = reg.create("p1", "feature/x").id;
        reg.set_status(&id, TaskStatus::running(TaskStep::CreatingBranch, "branch"))
            .unwrap();
        reg.set_status(&id, TaskStatus::running(TaskStep::GeneratingCode, "gen"))
            .unwrap();
        reg.set_status(&id, TaskStatus::running(TaskStep::PushingChanges, "push"))
            .unwrap();
        let done = reg.set_status(&id, TaskStatus::completed("done")).unwrap();
        assert!(done.status.completed);
        assert!(!done.status.error);

        let steps: Vec<TaskStep> = done.history.iter().map(|s| s.step).collect();
        assert_eq!(steps, TaskStep::all());
        assert!(is_monotonic(&done.history));

        let err = reg
            .set_status(&id, TaskStatus::failed("late"))
            .unwrap_err();
        assert!(matches!(err, SpecflowError::TaskFinished(_)));
        assert_eq!(reg.get(&id).unwrap().status.step, TaskStep::Completed);
    }

    #[test]
    fn error_is_terminal() {
        let mut reg = TaskRegistry::new();
        let id = reg.create("p1", "b").id;
        reg.set_status(&id, TaskStatus::running(TaskStep::CreatingBranch, "branch"))
            .unwrap();
        let failed = reg.set_status(&id, TaskStatus::failed("boom")).unwrap();
        assert!(failed.status.completed && failed.status.error);
        assert!(is_monotonic(&failed.history));
        assert!(reg
            .set_status(&id, TaskStatus::running(TaskStep::GeneratingCode, "x"))
            .is_err());
    }

    #[test]
    fn out_of_order_history_is_detected() {
        let history = vec![
            TaskStatus::initializing(),
            TaskStatus::running(TaskStep::GeneratingCode, "gen"),
            TaskStatus::running(TaskStep::CreatingBranch, "branch"),
        ];
        assert!(!is_monotonic(&history));
    }

    #[test]
    fn unknown_task_is_not_found() {
        let mut reg = TaskRegistry::new();
        assert!(matches!(reg.get("t"), Err(SpecflowError::TaskNotFound(_))));
        assert!(matches!(
            reg.set_status("t", TaskStatus::completed("x")),
            Err(SpecflowError::TaskNotFound(_))
        ));
    }

    #[test]
    fn list_filters_by_project() {
        let mut reg = TaskRegistry::new();
        let a = reg.create("p1", "b1").id;
        reg.create("p2", "b2");
        let b = reg.create("p1", "b3").id;
        let ids: Vec<&str> = reg
            .list_for_project("p1")
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec![a.as_str(), b.as_str()]);
        assert_eq!(reg.len(), 3);
    }
}
