use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::ids::{PlanId, TaskId, UserId};
use crate::model::task::Task;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlanError {
    #[error("plan title cannot be empty")]
    EmptyTitle,

    #[error("plan needs at least one topic")]
    EmptyTopics,

    #[error("target date {target} is before {today}")]
    TargetDateInPast { target: NaiveDate, today: NaiveDate },

    #[error("task {task} belongs to plan {owner}, not {plan}")]
    ForeignTask {
        task: TaskId,
        owner: PlanId,
        plan: PlanId,
    },
}

//
// ─── PLAN ──────────────────────────────────────────────────────────────────────
//

/// A named set of study topics with dated tasks and a target completion date.
///
/// The plan exclusively owns its tasks. Topics are case-sensitive labels and
/// may contain duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    id: PlanId,
    user_id: UserId,
    title: String,
    topics: Vec<String>,
    start_date: NaiveDate,
    target_date: NaiveDate,
    created_at: DateTime<Utc>,
    tasks: Vec<Task>,
}

impl Plan {
    /// Creates a new plan with no tasks.
    ///
    /// Blank topic labels are dropped after trimming.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::EmptyTitle` or `PlanError::EmptyTopics` for missing
    /// input, and `PlanError::TargetDateInPast` when the target is before the
    /// creation day.
    pub fn new(
        id: PlanId,
        user_id: UserId,
        title: impl Into<String>,
        topics: Vec<String>,
        target_date: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> Result<Self, PlanError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(PlanError::EmptyTitle);
        }

        let topics: Vec<String> = topics
            .into_iter()
            .map(|topic| topic.trim().to_string())
            .filter(|topic| !topic.is_empty())
            .collect();
        if topics.is_empty() {
            return Err(PlanError::EmptyTopics);
        }

        let today = created_at.date_naive();
        if target_date < today {
            return Err(PlanError::TargetDateInPast {
                target: target_date,
                today,
            });
        }

        Ok(Self {
            id,
            user_id,
            title,
            topics,
            start_date: today,
            target_date,
            created_at,
            tasks: Vec::new(),
        })
    }

    /// Rehydrate a plan from storage.
    ///
    /// Persisted plans skip creation-time validation: an empty topic list or a
    /// target date that has since passed are both legal here.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::ForeignTask` if a task is owned by another plan.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: PlanId,
        user_id: UserId,
        title: String,
        topics: Vec<String>,
        start_date: NaiveDate,
        target_date: NaiveDate,
        created_at: DateTime<Utc>,
        tasks: Vec<Task>,
    ) -> Result<Self, PlanError> {
        if let Some(task) = tasks.iter().find(|task| task.plan_id() != id) {
            return Err(PlanError::ForeignTask {
                task: task.id(),
                owner: task.plan_id(),
                plan: id,
            });
        }

        Ok(Self {
            id,
            user_id,
            title,
            topics,
            start_date,
            target_date,
            created_at,
            tasks,
        })
    }

    #[must_use]
    pub fn id(&self) -> PlanId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    #[must_use]
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    #[must_use]
    pub fn target_date(&self) -> NaiveDate {
        self.target_date
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id() == id)
    }

    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id() == id)
    }

    /// Tasks scheduled on `date`, ordered by `order_index` then id.
    #[must_use]
    pub fn tasks_on(&self, date: NaiveDate) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.iter().filter(|t| t.date() == date).collect();
        tasks.sort_by_key(|task| (task.order_index(), task.id()));
        tasks
    }

    /// Next free `order_index` for the given date.
    #[must_use]
    pub fn next_order_index(&self, date: NaiveDate) -> u32 {
        self.tasks
            .iter()
            .filter(|task| task.date() == date)
            .map(|task| task.order_index().saturating_add(1))
            .max()
            .unwrap_or(0)
    }

    /// Attach a task to this plan.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::ForeignTask` if the task is owned by another plan.
    pub fn push_task(&mut self, task: Task) -> Result<(), PlanError> {
        if task.plan_id() != self.id {
            return Err(PlanError::ForeignTask {
                task: task.id(),
                owner: task.plan_id(),
                plan: self.id,
            });
        }
        self.tasks.push(task);
        Ok(())
    }

    /// Replace the placeholder id assigned before persistence.
    ///
    /// Tasks are re-parented along with the plan.
    #[must_use]
    pub fn with_id(mut self, id: PlanId) -> Self {
        self.id = id;
        self.tasks = self
            .tasks
            .into_iter()
            .map(|task| {
                Task::from_persisted(
                    task.id(),
                    id,
                    task.topic().to_string(),
                    task.date(),
                    task.title().to_string(),
                    task.description().map(str::to_owned),
                    task.status(),
                    task.order_index(),
                )
            })
            .collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::{TaskDraft, TaskStatus};
    use crate::time::fixed_now;

    fn topics(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| (*s).to_string()).collect()
    }

    fn target() -> NaiveDate {
        fixed_now().date_naive() + chrono::Duration::days(30)
    }

    #[test]
    fn new_plan_records_start_date() {
        let plan = Plan::new(
            PlanId::new(1),
            UserId::new(1),
            "Math Exam",
            topics(&["Algebra", "Geometry"]),
            target(),
            fixed_now(),
        )
        .unwrap();
        assert_eq!(plan.start_date(), fixed_now().date_naive());
        assert_eq!(plan.topics(), &["Algebra", "Geometry"]);
        assert!(plan.tasks().is_empty());
    }

    #[test]
    fn rejects_blank_title() {
        let err = Plan::new(
            PlanId::new(1),
            UserId::new(1),
            "  ",
            topics(&["Algebra"]),
            target(),
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, PlanError::EmptyTitle);
    }

    #[test]
    fn rejects_missing_topics() {
        let err = Plan::new(
            PlanId::new(1),
            UserId::new(1),
            "Math",
            topics(&["", "  "]),
            target(),
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, PlanError::EmptyTopics);
    }

    #[test]
    fn target_today_is_allowed_but_yesterday_is_not() {
        let today = fixed_now().date_naive();
        assert!(
            Plan::new(
                PlanId::new(1),
                UserId::new(1),
                "Math",
                topics(&["Algebra"]),
                today,
                fixed_now(),
            )
            .is_ok()
        );

        let yesterday = today - chrono::Duration::days(1);
        let err = Plan::new(
            PlanId::new(1),
            UserId::new(1),
            "Math",
            topics(&["Algebra"]),
            yesterday,
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, PlanError::TargetDateInPast { .. }));
    }

    #[test]
    fn tasks_on_date_follow_order_index() {
        let mut plan = Plan::new(
            PlanId::new(3),
            UserId::new(1),
            "Math",
            topics(&["Algebra"]),
            target(),
            fixed_now(),
        )
        .unwrap();
        let day = fixed_now().date_naive();
        for (id, order) in [(10, 1), (11, 0), (12, 2)] {
            let task = Task::new(
                TaskId::new(id),
                plan.id(),
                TaskDraft::new("Algebra", day, format!("t{id}")),
                order,
            )
            .unwrap();
            plan.push_task(task).unwrap();
        }
        let ids: Vec<u64> = plan.tasks_on(day).iter().map(|t| t.id().value()).collect();
        assert_eq!(ids, vec![11, 10, 12]);
        assert_eq!(plan.next_order_index(day), 3);
        assert_eq!(plan.next_order_index(day + chrono::Duration::days(1)), 0);
    }

    #[test]
    fn push_task_rejects_foreign_owner() {
        let mut plan = Plan::new(
            PlanId::new(3),
            UserId::new(1),
            "Math",
            topics(&["Algebra"]),
            target(),
            fixed_now(),
        )
        .unwrap();
        let task = Task::new(
            TaskId::new(1),
            PlanId::new(99),
            TaskDraft::new("Algebra", fixed_now().date_naive(), "t"),
            0,
        )
        .unwrap();
        assert!(matches!(
            plan.push_task(task),
            Err(PlanError::ForeignTask { .. })
        ));
    }

    #[test]
    fn task_mut_updates_status_in_place() {
        let mut plan = Plan::new(
            PlanId::new(3),
            UserId::new(1),
            "Math",
            topics(&["Algebra"]),
            target(),
            fixed_now(),
        )
        .unwrap();
        let task = Task::new(
            TaskId::new(5),
            plan.id(),
            TaskDraft::new("Algebra", fixed_now().date_naive(), "t"),
            0,
        )
        .unwrap();
        plan.push_task(task).unwrap();

        plan.task_mut(TaskId::new(5))
            .unwrap()
            .set_status(TaskStatus::Completed);
        assert!(plan.task(TaskId::new(5)).unwrap().is_completed());
    }
}
