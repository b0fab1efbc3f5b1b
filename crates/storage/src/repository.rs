use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use study_core::model::{
    Plan, PlanId, Reminder, ReminderId, Task, TaskDraft, TaskId, TaskStatus, UserId,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A validated task waiting for an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTaskRecord {
    pub topic: String,
    pub date: NaiveDate,
    pub title: String,
    pub description: Option<String>,
    pub order_index: u32,
}

impl NewTaskRecord {
    #[must_use]
    pub fn from_draft(draft: TaskDraft, order_index: u32) -> Self {
        let draft = draft.normalized();
        Self {
            topic: draft.topic,
            date: draft.date,
            title: draft.title,
            description: draft.description,
            order_index,
        }
    }

    fn into_task(self, id: TaskId, plan_id: PlanId) -> Task {
        Task::from_persisted(
            id,
            plan_id,
            self.topic,
            self.date,
            self.title,
            self.description,
            TaskStatus::Pending,
            self.order_index,
        )
    }
}

/// Repository contract for plans and the tasks they own.
///
/// Every call is scoped to one user; a plan owned by another user behaves as
/// if it did not exist.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Persist a new plan and return its assigned id.
    ///
    /// The id carried by `plan` is ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the plan cannot be stored.
    async fn insert_plan(&self, plan: &Plan) -> Result<PlanId, StorageError>;

    /// Fetch a plan with its tasks.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_plan(&self, user: UserId, id: PlanId) -> Result<Option<Plan>, StorageError>;

    /// All plans of a user, oldest first (creation time, then id).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_plans(&self, user: UserId) -> Result<Vec<Plan>, StorageError>;

    /// Delete a plan and every task it owns in one step.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the plan does not exist.
    async fn delete_plan(&self, user: UserId, id: PlanId) -> Result<(), StorageError>;

    /// Append tasks to a plan, returning them with their new ids.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the plan does not exist.
    async fn insert_tasks(
        &self,
        user: UserId,
        plan_id: PlanId,
        tasks: Vec<NewTaskRecord>,
    ) -> Result<Vec<Task>, StorageError>;

    /// Change a task's status in place and return the owning plan afterwards.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the task does not exist.
    async fn set_task_status(
        &self,
        user: UserId,
        task_id: TaskId,
        status: TaskStatus,
    ) -> Result<Plan, StorageError>;
}

/// Repository contract for study reminders.
#[async_trait]
pub trait ReminderRepository: Send + Sync {
    /// Persist a new reminder and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the reminder cannot be stored.
    async fn insert_reminder(&self, reminder: &Reminder) -> Result<ReminderId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_reminder(
        &self,
        user: UserId,
        id: ReminderId,
    ) -> Result<Option<Reminder>, StorageError>;

    /// Overwrite tier, schedule, and activity of an existing reminder.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the reminder does not exist.
    async fn update_reminder(&self, reminder: &Reminder) -> Result<(), StorageError>;

    /// Active reminders with `next_fire_at <= now`, earliest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn due_reminders(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reminder>, StorageError>;
}

#[derive(Default)]
struct MemoryState {
    last_plan_id: u64,
    last_task_id: u64,
    last_reminder_id: u64,
    plans: BTreeMap<PlanId, Plan>,
    reminders: BTreeMap<ReminderId, Reminder>,
}

impl MemoryState {
    fn owned_plan_mut(&mut self, user: UserId, id: PlanId) -> Option<&mut Plan> {
        self.plans
            .get_mut(&id)
            .filter(|plan| plan.user_id() == user)
    }
}

/// In-memory repository for tests and prototyping.
///
/// One lock guards all state, so a cascading delete is never observed half done.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl PlanRepository for InMemoryRepository {
    async fn insert_plan(&self, plan: &Plan) -> Result<PlanId, StorageError> {
        let mut guard = self.lock()?;
        guard.last_plan_id += 1;
        let id = PlanId::new(guard.last_plan_id);
        guard.plans.insert(id, plan.clone().with_id(id));
        Ok(id)
    }

    async fn get_plan(&self, user: UserId, id: PlanId) -> Result<Option<Plan>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .plans
            .get(&id)
            .filter(|plan| plan.user_id() == user)
            .cloned())
    }

    async fn list_plans(&self, user: UserId) -> Result<Vec<Plan>, StorageError> {
        let guard = self.lock()?;
        let mut plans: Vec<Plan> = guard
            .plans
            .values()
            .filter(|plan| plan.user_id() == user)
            .cloned()
            .collect();
        plans.sort_by_key(|plan| (plan.created_at(), plan.id()));
        Ok(plans)
    }

    async fn delete_plan(&self, user: UserId, id: PlanId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let task_ids: Vec<TaskId> = guard
            .owned_plan_mut(user, id)
            .map(|plan| plan.tasks().iter().map(Task::id).collect())
            .ok_or(StorageError::NotFound)?;
        guard.plans.remove(&id);

        for reminder in guard.reminders.values_mut() {
            if reminder.task_id().is_some_and(|t| task_ids.contains(&t)) {
                reminder.detach_task();
            }
        }
        Ok(())
    }

    async fn insert_tasks(
        &self,
        user: UserId,
        plan_id: PlanId,
        tasks: Vec<NewTaskRecord>,
    ) -> Result<Vec<Task>, StorageError> {
        let mut guard = self.lock()?;
        if guard.owned_plan_mut(user, plan_id).is_none() {
            return Err(StorageError::NotFound);
        }

        let mut created = Vec::with_capacity(tasks.len());
        for record in tasks {
            guard.last_task_id += 1;
            created.push(record.into_task(TaskId::new(guard.last_task_id), plan_id));
        }

        let plan = guard
            .owned_plan_mut(user, plan_id)
            .ok_or(StorageError::NotFound)?;
        for task in &created {
            plan.push_task(task.clone())
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
        }
        Ok(created)
    }

    async fn set_task_status(
        &self,
        user: UserId,
        task_id: TaskId,
        status: TaskStatus,
    ) -> Result<Plan, StorageError> {
        let mut guard = self.lock()?;
        let plan = guard
            .plans
            .values_mut()
            .filter(|plan| plan.user_id() == user)
            .find(|plan| plan.task(task_id).is_some())
            .ok_or(StorageError::NotFound)?;
        if let Some(task) = plan.task_mut(task_id) {
            task.set_status(status);
        }
        Ok(plan.clone())
    }
}

#[async_trait]
impl ReminderRepository for InMemoryRepository {
    async fn insert_reminder(&self, reminder: &Reminder) -> Result<ReminderId, StorageError> {
        let mut guard = self.lock()?;
        guard.last_reminder_id += 1;
        let id = ReminderId::new(guard.last_reminder_id);
        guard.reminders.insert(id, reminder.clone().with_id(id));
        Ok(id)
    }

    async fn get_reminder(
        &self,
        user: UserId,
        id: ReminderId,
    ) -> Result<Option<Reminder>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .reminders
            .get(&id)
            .filter(|r| r.user_id() == user)
            .cloned())
    }

    async fn update_reminder(&self, reminder: &Reminder) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let slot = guard
            .reminders
            .get_mut(&reminder.id())
            .filter(|r| r.user_id() == reminder.user_id())
            .ok_or(StorageError::NotFound)?;
        *slot = reminder.clone();
        Ok(())
    }

    async fn due_reminders(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reminder>, StorageError> {
        let guard = self.lock()?;
        let mut due: Vec<Reminder> = guard
            .reminders
            .values()
            .filter(|r| r.user_id() == user && r.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|r| (r.next_fire_at(), r.id()));
        Ok(due)
    }
}

/// Repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub plans: Arc<dyn PlanRepository>,
    pub reminders: Arc<dyn ReminderRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let plans: Arc<dyn PlanRepository> = Arc::new(repo.clone());
        let reminders: Arc<dyn ReminderRepository> = Arc::new(repo);
        Self { plans, reminders }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use study_core::time::fixed_now;

    fn build_plan(user: u64, title: &str) -> Plan {
        Plan::new(
            PlanId::new(0),
            UserId::new(user),
            title,
            vec!["Algebra".into(), "Geometry".into()],
            fixed_now().date_naive() + Duration::days(14),
            fixed_now(),
        )
        .unwrap()
    }

    fn record(topic: &str, order_index: u32) -> NewTaskRecord {
        NewTaskRecord::from_draft(
            TaskDraft::new(topic, fixed_now().date_naive(), format!("{topic} drill")),
            order_index,
        )
    }

    #[tokio::test]
    async fn insert_assigns_fresh_ids() {
        let repo = InMemoryRepository::new();
        let a = repo.insert_plan(&build_plan(1, "A")).await.unwrap();
        let b = repo.insert_plan(&build_plan(1, "B")).await.unwrap();
        assert_ne!(a, b);

        let fetched = repo.get_plan(UserId::new(1), b).await.unwrap().unwrap();
        assert_eq!(fetched.id(), b);
        assert_eq!(fetched.title(), "B");
    }

    #[tokio::test]
    async fn plans_are_scoped_per_user() {
        let repo = InMemoryRepository::new();
        let id = repo.insert_plan(&build_plan(1, "Mine")).await.unwrap();

        assert!(repo.get_plan(UserId::new(2), id).await.unwrap().is_none());
        assert!(repo.list_plans(UserId::new(2)).await.unwrap().is_empty());
        assert!(matches!(
            repo.delete_plan(UserId::new(2), id).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn delete_cascades_tasks_and_never_reuses_ids() {
        let repo = InMemoryRepository::new();
        let user = UserId::new(1);
        let plan_id = repo.insert_plan(&build_plan(1, "A")).await.unwrap();
        let tasks = repo
            .insert_tasks(user, plan_id, vec![record("Algebra", 0), record("Geometry", 1)])
            .await
            .unwrap();
        let last_task = tasks.last().unwrap().id();

        repo.delete_plan(user, plan_id).await.unwrap();
        assert!(repo.get_plan(user, plan_id).await.unwrap().is_none());
        assert!(matches!(
            repo.set_task_status(user, last_task, TaskStatus::Completed).await,
            Err(StorageError::NotFound)
        ));

        let next_plan = repo.insert_plan(&build_plan(1, "B")).await.unwrap();
        assert!(next_plan > plan_id);
        let next_tasks = repo
            .insert_tasks(user, next_plan, vec![record("Algebra", 0)])
            .await
            .unwrap();
        assert!(next_tasks[0].id() > last_task);
    }

    #[tokio::test]
    async fn set_task_status_returns_updated_plan() {
        let repo = InMemoryRepository::new();
        let user = UserId::new(1);
        let plan_id = repo.insert_plan(&build_plan(1, "A")).await.unwrap();
        let tasks = repo
            .insert_tasks(user, plan_id, vec![record("Algebra", 0)])
            .await
            .unwrap();

        let plan = repo
            .set_task_status(user, tasks[0].id(), TaskStatus::Completed)
            .await
            .unwrap();
        assert!(plan.task(tasks[0].id()).unwrap().is_completed());
    }

    #[tokio::test]
    async fn deleting_plan_detaches_reminders() {
        let repo = InMemoryRepository::new();
        let user = UserId::new(1);
        let plan_id = repo.insert_plan(&build_plan(1, "A")).await.unwrap();
        let tasks = repo
            .insert_tasks(user, plan_id, vec![record("Algebra", 0)])
            .await
            .unwrap();
        let reminder = Reminder::new(
            ReminderId::new(0),
            user,
            Some(tasks[0].id()),
            "Revise",
            "",
            fixed_now(),
        )
        .unwrap();
        let rid = repo.insert_reminder(&reminder).await.unwrap();

        repo.delete_plan(user, plan_id).await.unwrap();
        let stored = repo.get_reminder(user, rid).await.unwrap().unwrap();
        assert_eq!(stored.task_id(), None);
    }

    #[tokio::test]
    async fn padded_task_topics_land_in_declared_buckets() {
        let repo = InMemoryRepository::new();
        let user = UserId::new(1);
        let plan = Plan::new(
            PlanId::new(0),
            user,
            "Math",
            vec![" Algebra".into()],
            fixed_now().date_naive(),
            fixed_now(),
        )
        .unwrap();
        let plan_id = repo.insert_plan(&plan).await.unwrap();
        let tasks = repo
            .insert_tasks(user, plan_id, vec![record(" Algebra", 0)])
            .await
            .unwrap();
        let updated = repo
            .set_task_status(user, tasks[0].id(), TaskStatus::Completed)
            .await
            .unwrap();

        let stats = study_core::progress::per_topic_stats(&updated);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].topic, "Algebra");
        assert_eq!(stats[0].total_tasks, 1);
        assert_eq!(stats[0].completion_rate, 100);
    }

    #[tokio::test]
    async fn due_reminders_are_sorted_by_fire_time() {
        let repo = InMemoryRepository::new();
        let user = UserId::new(1);
        let early = Reminder::new(ReminderId::new(0), user, None, "early", "", fixed_now())
            .unwrap();
        let late = Reminder::new(
            ReminderId::new(0),
            user,
            None,
            "late",
            "",
            fixed_now() + Duration::hours(1),
        )
        .unwrap();
        repo.insert_reminder(&late).await.unwrap();
        repo.insert_reminder(&early).await.unwrap();

        let due = repo
            .due_reminders(user, fixed_now() + Duration::days(2))
            .await
            .unwrap();
        let titles: Vec<&str> = due.iter().map(Reminder::title).collect();
        assert_eq!(titles, vec!["early", "late"]);
        assert!(repo.due_reminders(user, fixed_now()).await.unwrap().is_empty());
    }
}
