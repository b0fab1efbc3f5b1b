use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use storage::repository::{NewTaskRecord, PlanRepository, StorageError};
use study_core::model::{Plan, PlanId, Task, TaskDraft, TaskId, TaskStatus, UserId};
use study_core::progress::PlanProgress;

use crate::Clock;
use crate::error::PlannerError;

/// Listing order for `PlannerService::list_plans`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlanOrder {
    /// Creation time ascending, most recent last.
    #[default]
    Oldest,
    Newest,
}

/// A task after a status change, with its plan's recomputed progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskStatusUpdate {
    pub task: Task,
    pub progress: PlanProgress,
}

/// Mutation surface for plans and tasks.
#[derive(Clone)]
pub struct PlannerService {
    clock: Clock,
    plans: Arc<dyn PlanRepository>,
}

fn plan_not_found(id: PlanId) -> impl FnOnce(StorageError) -> PlannerError {
    move |err| match err {
        StorageError::NotFound => PlannerError::NotFound {
            entity: "plan",
            id: id.value(),
        },
        other => PlannerError::Storage(other),
    }
}

impl PlannerService {
    #[must_use]
    pub fn new(clock: Clock, plans: Arc<dyn PlanRepository>) -> Self {
        Self { clock, plans }
    }

    /// Create an empty plan.
    ///
    /// # Errors
    ///
    /// Returns `PlannerError::Validation` for a blank title, no topics, or a
    /// target date before today.
    /// Returns `PlannerError::Storage` if persistence fails.
    pub async fn create_plan(
        &self,
        user: UserId,
        title: String,
        topics: Vec<String>,
        target_date: NaiveDate,
    ) -> Result<Plan, PlannerError> {
        let plan = Plan::new(
            PlanId::new(0),
            user,
            title,
            topics,
            target_date,
            self.clock.now(),
        )?;
        let id = self.plans.insert_plan(&plan).await?;
        tracing::debug!(user_id = user.value(), plan_id = id.value(), "created plan");
        Ok(plan.with_id(id))
    }

    /// Delete a plan together with all of its tasks.
    ///
    /// # Errors
    ///
    /// Returns `PlannerError::NotFound` if the user has no such plan.
    pub async fn delete_plan(&self, user: UserId, id: PlanId) -> Result<(), PlannerError> {
        self.plans
            .delete_plan(user, id)
            .await
            .map_err(plan_not_found(id))?;
        tracing::debug!(user_id = user.value(), plan_id = id.value(), "deleted plan");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `PlannerError::NotFound` if the user has no such plan.
    pub async fn get_plan(&self, user: UserId, id: PlanId) -> Result<Plan, PlannerError> {
        self.plans
            .get_plan(user, id)
            .await?
            .ok_or(PlannerError::NotFound {
                entity: "plan",
                id: id.value(),
            })
    }

    /// # Errors
    ///
    /// Returns `PlannerError::Storage` if repository access fails.
    pub async fn list_plans(
        &self,
        user: UserId,
        order: PlanOrder,
    ) -> Result<Vec<Plan>, PlannerError> {
        let mut plans = self.plans.list_plans(user).await?;
        if order == PlanOrder::Newest {
            plans.reverse();
        }
        Ok(plans)
    }

    /// Append scheduled tasks to a plan. Order within a date continues after
    /// the tasks already on that date.
    ///
    /// # Errors
    ///
    /// Returns `PlannerError::Validation` if any draft is invalid; nothing is
    /// stored in that case.
    /// Returns `PlannerError::NotFound` if the user has no such plan.
    pub async fn add_tasks(
        &self,
        user: UserId,
        plan_id: PlanId,
        drafts: Vec<TaskDraft>,
    ) -> Result<Vec<Task>, PlannerError> {
        for draft in &drafts {
            draft.validate()?;
        }
        let plan = self.get_plan(user, plan_id).await?;

        let mut next_index: HashMap<NaiveDate, u32> = HashMap::new();
        let records: Vec<NewTaskRecord> = drafts
            .into_iter()
            .map(|draft| {
                let slot = next_index
                    .entry(draft.date)
                    .or_insert_with(|| plan.next_order_index(draft.date));
                let order_index = *slot;
                *slot += 1;
                NewTaskRecord::from_draft(draft, order_index)
            })
            .collect();

        let tasks = self
            .plans
            .insert_tasks(user, plan_id, records)
            .await
            .map_err(plan_not_found(plan_id))?;
        tracing::debug!(
            user_id = user.value(),
            plan_id = plan_id.value(),
            count = tasks.len(),
            "added tasks"
        );
        Ok(tasks)
    }

    /// Change a task's status and return it with the owning plan's progress.
    ///
    /// # Errors
    ///
    /// Returns `PlannerError::Validation` for an unrecognized status.
    /// Returns `PlannerError::NotFound` if the user has no such task.
    pub async fn update_task_status(
        &self,
        user: UserId,
        task_id: TaskId,
        status: &str,
    ) -> Result<TaskStatusUpdate, PlannerError> {
        let status: TaskStatus = status.parse()?;
        let not_found = || PlannerError::NotFound {
            entity: "task",
            id: task_id.value(),
        };

        let plan = self
            .plans
            .set_task_status(user, task_id, status)
            .await
            .map_err(|err| match err {
                StorageError::NotFound => not_found(),
                other => PlannerError::Storage(other),
            })?;
        let task = plan.task(task_id).cloned().ok_or_else(not_found)?;
        tracing::debug!(
            user_id = user.value(),
            task_id = task_id.value(),
            status = status.as_str(),
            "updated task status"
        );

        Ok(TaskStatusUpdate {
            task,
            progress: PlanProgress::of(&plan),
        })
    }

    /// Tasks of a plan scheduled on `date`, by order index then id.
    ///
    /// # Errors
    ///
    /// Returns `PlannerError::NotFound` if the user has no such plan.
    pub async fn tasks_for_date(
        &self,
        user: UserId,
        plan_id: PlanId,
        date: NaiveDate,
    ) -> Result<Vec<Task>, PlannerError> {
        let plan = self.get_plan(user, plan_id).await?;
        Ok(plan.tasks_on(date).into_iter().cloned().collect())
    }
}
