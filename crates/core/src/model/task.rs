use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{PlanId, TaskId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TaskError {
    #[error("task title cannot be empty")]
    EmptyTitle,

    #[error("unrecognized task status: {0}")]
    UnknownStatus(String),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle state of a task.
///
/// Only `Completed` counts toward completion; every status counts toward the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
    Skipped,
}

impl TaskStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
        }
    }

    #[must_use]
    pub fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "skipped" => Ok(Self::Skipped),
            other => Err(TaskError::UnknownStatus(other.to_string())),
        }
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated task as produced by the upstream scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub topic: String,
    pub date: NaiveDate,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl TaskDraft {
    #[must_use]
    pub fn new(topic: impl Into<String>, date: NaiveDate, title: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            date,
            title: title.into(),
            description: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Trim the topic and title the same way plan topics are trimmed.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.topic = self.topic.trim().to_string();
        self.title = self.title.trim().to_string();
        self
    }

    /// Check the draft before it is scheduled.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::EmptyTitle` if the title is blank.
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.title.trim().is_empty() {
            return Err(TaskError::EmptyTitle);
        }
        Ok(())
    }
}

//
// ─── TASK ──────────────────────────────────────────────────────────────────────
//

/// A dated unit of work owned by exactly one plan.
///
/// The topic label is kept as given; it is not checked against the
/// owning plan's topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    id: TaskId,
    plan_id: PlanId,
    topic: String,
    date: NaiveDate,
    title: String,
    description: Option<String>,
    status: TaskStatus,
    order_index: u32,
}

impl Task {
    /// Create a pending task from a scheduled draft.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::EmptyTitle` if the draft has no title.
    pub fn new(
        id: TaskId,
        plan_id: PlanId,
        draft: TaskDraft,
        order_index: u32,
    ) -> Result<Self, TaskError> {
        draft.validate()?;
        let draft = draft.normalized();
        Ok(Self {
            id,
            plan_id,
            topic: draft.topic,
            date: draft.date,
            title: draft.title,
            description: draft.description,
            status: TaskStatus::Pending,
            order_index,
        })
    }

    /// Rehydrate a task from storage without re-running draft validation.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_persisted(
        id: TaskId,
        plan_id: PlanId,
        topic: String,
        date: NaiveDate,
        title: String,
        description: Option<String>,
        status: TaskStatus,
        order_index: u32,
    ) -> Self {
        Self {
            id,
            plan_id,
            topic,
            date,
            title,
            description,
            status,
            order_index,
        }
    }

    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    #[must_use]
    pub fn plan_id(&self) -> PlanId {
        self.plan_id
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    #[must_use]
    pub fn order_index(&self) -> u32 {
        self.order_index
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }

    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn status_parses_known_values() {
        assert_eq!("pending".parse::<TaskStatus>().unwrap(), TaskStatus::Pending);
        assert_eq!(
            "completed".parse::<TaskStatus>().unwrap(),
            TaskStatus::Completed
        );
        assert_eq!("skipped".parse::<TaskStatus>().unwrap(), TaskStatus::Skipped);
    }

    #[test]
    fn status_rejects_unknown_and_wrong_case() {
        let err = "done".parse::<TaskStatus>().unwrap_err();
        assert_eq!(err, TaskError::UnknownStatus("done".into()));
        assert!("Completed".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn only_completed_counts_as_completed() {
        assert!(TaskStatus::Completed.is_completed());
        assert!(!TaskStatus::Pending.is_completed());
        assert!(!TaskStatus::Skipped.is_completed());
    }

    #[test]
    fn new_task_starts_pending() {
        let draft = TaskDraft::new("Algebra", day(4), "  Factor quadratics ")
            .with_description("chapter 3");
        let task = Task::new(TaskId::new(1), PlanId::new(2), draft, 0).unwrap();
        assert_eq!(task.status(), TaskStatus::Pending);
        assert_eq!(task.title(), "Factor quadratics");
        assert_eq!(task.description(), Some("chapter 3"));
        assert_eq!(task.topic(), "Algebra");
    }

    #[test]
    fn topic_label_is_trimmed_like_plan_topics() {
        let draft = TaskDraft::new(" Algebra ", day(4), "Factor");
        let task = Task::new(TaskId::new(1), PlanId::new(2), draft, 0).unwrap();
        assert_eq!(task.topic(), "Algebra");
    }

    #[test]
    fn blank_title_is_rejected() {
        let draft = TaskDraft::new("Algebra", day(4), "   ");
        let err = Task::new(TaskId::new(1), PlanId::new(2), draft, 0).unwrap_err();
        assert_eq!(err, TaskError::EmptyTitle);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&TaskStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
    }
}
