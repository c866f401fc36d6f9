//! Core task and event type definitions.
//!
//! Defines [`TaskState`] (the workflow states), [`Task`] (a ledger row),
//! and [`TaskEvent`] (an append-only log entry).

use serde::{Deserialize, Serialize};

/// Workflow state of a task. Only [`Success`](TaskState::Success) and
/// [`Failure`](TaskState::Failure) are terminal; in-flight tasks carry no
/// reliable outcome and are excluded from similarity retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    Running,
    Success,
    Failure,
}

impl TaskState {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
        }
    }

    /// Whether the task has concluded and yields a usable outcome.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "RUNNING" => Ok(Self::Running),
            "SUCCESS" => Ok(Self::Success),
            "FAILURE" => Ok(Self::Failure),
            _ => Err(format!("unknown task state: {s}")),
        }
    }
}

/// A task record, matching the `tasks` table schema.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    /// Owning project.
    pub project_id: String,
    pub name: String,
    /// The input text the task was created with; also what gets embedded.
    pub input: String,
    /// Final output, set when the task concludes.
    pub result: Option<String>,
    /// Tri-state outcome: unset while in flight.
    pub success: Option<bool>,
    pub state: TaskState,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// An append-only ledger entry attached to a task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskEvent {
    pub id: String,
    pub task_id: String,
    /// Event label, e.g. `"TASK_CREATED"` or `"EMBEDDING_GENERATED"`.
    pub event_type: String,
    pub event_data: serde_json::Value,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_string_roundtrip() {
        for state in [
            TaskState::Pending,
            TaskState::Running,
            TaskState::Success,
            TaskState::Failure,
        ] {
            assert_eq!(state.as_str().parse::<TaskState>().unwrap(), state);
        }
        assert!("DONE".parse::<TaskState>().is_err());
    }

    #[test]
    fn only_concluded_states_are_terminal() {
        assert!(!TaskState::Pending.is_terminal());
        assert!(!TaskState::Running.is_terminal());
        assert!(TaskState::Success.is_terminal());
        assert!(TaskState::Failure.is_terminal());
    }
}
