use std::sync::Arc;

use storage::repository::ReminderRepository;
use study_core::model::{Reminder, ReminderId, TaskId, UserId};

use crate::Clock;
use crate::error::ReminderServiceError;

/// Schedules and advances spaced-repetition study reminders.
#[derive(Clone)]
pub struct ReminderService {
    clock: Clock,
    reminders: Arc<dyn ReminderRepository>,
}

impl ReminderService {
    #[must_use]
    pub fn new(clock: Clock, reminders: Arc<dyn ReminderRepository>) -> Self {
        Self { clock, reminders }
    }

    /// Schedule a new first-tier reminder.
    ///
    /// # Errors
    ///
    /// Returns `ReminderServiceError::Reminder` for a blank title.
    /// Returns `ReminderServiceError::Storage` if persistence fails.
    pub async fn schedule(
        &self,
        user: UserId,
        title: String,
        content: String,
        task_id: Option<TaskId>,
    ) -> Result<Reminder, ReminderServiceError> {
        let reminder = Reminder::new(
            ReminderId::new(0),
            user,
            task_id,
            title,
            content,
            self.clock.now(),
        )?;
        let id = self.reminders.insert_reminder(&reminder).await?;
        tracing::debug!(user_id = user.value(), reminder_id = id.value(), "scheduled reminder");
        Ok(reminder.with_id(id))
    }

    /// Active reminders whose fire time has passed.
    ///
    /// # Errors
    ///
    /// Returns `ReminderServiceError::Storage` if repository access fails.
    pub async fn due(&self, user: UserId) -> Result<Vec<Reminder>, ReminderServiceError> {
        Ok(self.reminders.due_reminders(user, self.clock.now()).await?)
    }

    /// Advance a reminder one tier, or deactivate it after the last tier.
    ///
    /// # Errors
    ///
    /// Returns `ReminderServiceError::NotFound` if the user has no such reminder.
    pub async fn dismiss(
        &self,
        user: UserId,
        id: ReminderId,
    ) -> Result<Reminder, ReminderServiceError> {
        let mut reminder = self
            .reminders
            .get_reminder(user, id)
            .await?
            .ok_or(ReminderServiceError::NotFound(id.value()))?;
        let active = reminder.dismiss(self.clock.now());
        self.reminders.update_reminder(&reminder).await?;
        tracing::debug!(
            user_id = user.value(),
            reminder_id = id.value(),
            tier = reminder.tier().as_u8(),
            active,
            "dismissed reminder"
        );
        Ok(reminder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use storage::repository::InMemoryRepository;
    use study_core::model::ReminderTier;
    use study_core::time::fixed_now;

    fn service_at(offset: Duration, repo: &InMemoryRepository) -> ReminderService {
        ReminderService::new(Clock::fixed(fixed_now() + offset), Arc::new(repo.clone()))
    }

    #[tokio::test]
    async fn scheduled_reminder_becomes_due_after_a_day() {
        let repo = InMemoryRepository::new();
        let user = UserId::new(1);
        let created = service_at(Duration::zero(), &repo)
            .schedule(user, "Review algebra".into(), String::new(), None)
            .await
            .unwrap();

        assert!(service_at(Duration::hours(23), &repo).due(user).await.unwrap().is_empty());
        let due = service_at(Duration::days(1), &repo).due(user).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id(), created.id());
        assert!(service_at(Duration::days(1), &repo).due(UserId::new(2)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dismiss_advances_until_inactive() {
        let repo = InMemoryRepository::new();
        let user = UserId::new(1);
        let svc = service_at(Duration::zero(), &repo);
        let created = svc
            .schedule(user, "Review".into(), String::new(), None)
            .await
            .unwrap();

        let mut last = created.clone();
        for _ in 0..4 {
            last = svc.dismiss(user, created.id()).await.unwrap();
        }
        assert_eq!(last.tier(), ReminderTier::Fourth);
        assert!(!last.is_active());
        assert!(service_at(Duration::days(400), &repo).due(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dismiss_unknown_reminder_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = service_at(Duration::zero(), &repo)
            .dismiss(UserId::new(1), ReminderId::new(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ReminderServiceError::NotFound(5)));
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        let repo = InMemoryRepository::new();
        let err = service_at(Duration::zero(), &repo)
            .schedule(UserId::new(1), " ".into(), String::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ReminderServiceError::Reminder(_)));
    }
}
