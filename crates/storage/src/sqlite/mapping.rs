use chrono::{DateTime, NaiveDate, Utc};
use sqlx::Row;
use study_core::model::{
    PlanId, Reminder, ReminderId, ReminderTier, Task, TaskId, TaskStatus, UserId,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn plan_id_from_i64(v: i64) -> Result<PlanId, StorageError> {
    Ok(PlanId::new(i64_to_u64("plan_id", v)?))
}

pub(crate) fn task_id_from_i64(v: i64) -> Result<TaskId, StorageError> {
    Ok(TaskId::new(i64_to_u64("task_id", v)?))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn reminder_id_from_i64(v: i64) -> Result<ReminderId, StorageError> {
    Ok(ReminderId::new(i64_to_u64("reminder_id", v)?))
}

pub(crate) fn parse_task_status(s: &str) -> Result<TaskStatus, StorageError> {
    s.parse()
        .map_err(|_| StorageError::Serialization(format!("invalid status: {s}")))
}

pub(crate) fn tier_from_i64(value: i64) -> Result<ReminderTier, StorageError> {
    u8::try_from(value)
        .ok()
        .and_then(|v| ReminderTier::from_u8(v).ok())
        .ok_or_else(|| StorageError::Serialization(format!("invalid tier: {value}")))
}

/// Topics are stored as a JSON array of strings.
pub(crate) fn topics_to_json(topics: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(topics).map_err(ser)
}

pub(crate) fn topics_from_json(raw: &str) -> Result<Vec<String>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn map_task_row(row: &sqlx::sqlite::SqliteRow) -> Result<Task, StorageError> {
    let date: NaiveDate = row.try_get("date").map_err(ser)?;
    let status: String = row.try_get("status").map_err(ser)?;
    let order_index_i64: i64 = row.try_get("order_index").map_err(ser)?;
    let order_index = u32::try_from(order_index_i64).map_err(|_| {
        StorageError::Serialization(format!("invalid order_index: {order_index_i64}"))
    })?;

    Ok(Task::from_persisted(
        task_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        plan_id_from_i64(row.try_get::<i64, _>("plan_id").map_err(ser)?)?,
        row.try_get("topic").map_err(ser)?,
        date,
        row.try_get("title").map_err(ser)?,
        row.try_get("description").map_err(ser)?,
        parse_task_status(status.as_str())?,
        order_index,
    ))
}

pub(crate) fn map_reminder_row(row: &sqlx::sqlite::SqliteRow) -> Result<Reminder, StorageError> {
    let next_fire_at: DateTime<Utc> = row.try_get("next_fire_at").map_err(ser)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(ser)?;
    let is_active: i64 = row.try_get("is_active").map_err(ser)?;

    Ok(Reminder::from_persisted(
        reminder_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
        row.try_get::<Option<i64>, _>("task_id")
            .map_err(ser)?
            .map(task_id_from_i64)
            .transpose()?,
        row.try_get("title").map_err(ser)?,
        row.try_get("content").map_err(ser)?,
        tier_from_i64(row.try_get::<i64, _>("tier").map_err(ser)?)?,
        next_fire_at,
        is_active != 0,
        created_at,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_survive_json_encoding() {
        let topics = vec!["Algebra".to_string(), "Geometry, Euclid".to_string()];
        let raw = topics_to_json(&topics).unwrap();
        assert_eq!(topics_from_json(&raw).unwrap(), topics);
    }

    #[test]
    fn rejects_unknown_codes() {
        assert!(parse_task_status("archived").is_err());
        assert!(tier_from_i64(5).is_err());
        assert!(tier_from_i64(-1).is_err());
        assert_eq!(tier_from_i64(2).unwrap(), ReminderTier::Second);
    }

    #[test]
    fn negative_ids_are_rejected() {
        assert!(plan_id_from_i64(-4).is_err());
        assert!(id_i64("plan_id", u64::MAX).is_err());
    }
}
