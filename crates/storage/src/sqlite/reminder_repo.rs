use chrono::{DateTime, Utc};
use study_core::model::{Reminder, ReminderId, UserId};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_reminder_row, reminder_id_from_i64};
use crate::repository::{ReminderRepository, StorageError};

fn task_key(reminder: &Reminder) -> Result<Option<i64>, StorageError> {
    reminder
        .task_id()
        .map(|t| id_i64("task_id", t.value()))
        .transpose()
}

#[async_trait::async_trait]
impl ReminderRepository for SqliteRepository {
    async fn insert_reminder(&self, reminder: &Reminder) -> Result<ReminderId, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO reminders (
                    user_id, task_id, title, content, tier, next_fire_at, is_active, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(id_i64("user_id", reminder.user_id().value())?)
        .bind(task_key(reminder)?)
        .bind(reminder.title())
        .bind(reminder.content())
        .bind(i64::from(reminder.tier().as_u8()))
        .bind(reminder.next_fire_at())
        .bind(i64::from(reminder.is_active()))
        .bind(reminder.created_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        reminder_id_from_i64(res.last_insert_rowid())
    }

    async fn get_reminder(
        &self,
        user: UserId,
        id: ReminderId,
    ) -> Result<Option<Reminder>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, user_id, task_id, title, content, tier, next_fire_at, is_active, created_at
                FROM reminders
                WHERE id = ?1 AND user_id = ?2
            ",
        )
        .bind(id_i64("reminder_id", id.value())?)
        .bind(id_i64("user_id", user.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_reminder_row).transpose()
    }

    async fn update_reminder(&self, reminder: &Reminder) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
                UPDATE reminders
                SET task_id = ?1, tier = ?2, next_fire_at = ?3, is_active = ?4
                WHERE id = ?5 AND user_id = ?6
            ",
        )
        .bind(task_key(reminder)?)
        .bind(i64::from(reminder.tier().as_u8()))
        .bind(reminder.next_fire_at())
        .bind(i64::from(reminder.is_active()))
        .bind(id_i64("reminder_id", reminder.id().value())?)
        .bind(id_i64("user_id", reminder.user_id().value())?)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn due_reminders(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reminder>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, user_id, task_id, title, content, tier, next_fire_at, is_active, created_at
                FROM reminders
                WHERE user_id = ?1 AND is_active = 1 AND next_fire_at <= ?2
                ORDER BY next_fire_at ASC, id ASC
            ",
        )
        .bind(id_i64("user_id", user.value())?)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_reminder_row).collect()
    }
}
