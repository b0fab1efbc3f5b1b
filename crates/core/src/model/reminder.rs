use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::ids::{ReminderId, TaskId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReminderError {
    #[error("reminder title cannot be empty")]
    EmptyTitle,

    #[error("reminder tier must be between 1 and 4, got {0}")]
    InvalidTier(u8),
}

/// Spaced-repetition tier. Each tier waits longer before firing again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(into = "u8")]
pub enum ReminderTier {
    First,
    Second,
    Third,
    Fourth,
}

impl ReminderTier {
    /// # Errors
    ///
    /// Returns `ReminderError::InvalidTier` outside 1..=4.
    pub fn from_u8(value: u8) -> Result<Self, ReminderError> {
        match value {
            1 => Ok(Self::First),
            2 => Ok(Self::Second),
            3 => Ok(Self::Third),
            4 => Ok(Self::Fourth),
            other => Err(ReminderError::InvalidTier(other)),
        }
    }

    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
            Self::Third => 3,
            Self::Fourth => 4,
        }
    }

    /// Delay before a reminder at this tier fires.
    #[must_use]
    pub fn delay(self) -> Duration {
        match self {
            Self::First => Duration::days(1),
            Self::Second => Duration::days(4),
            Self::Third => Duration::days(10),
            Self::Fourth => Duration::days(30),
        }
    }

    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::First => Some(Self::Second),
            Self::Second => Some(Self::Third),
            Self::Third => Some(Self::Fourth),
            Self::Fourth => None,
        }
    }
}

impl From<ReminderTier> for u8 {
    fn from(tier: ReminderTier) -> Self {
        tier.as_u8()
    }
}

/// A study reminder, optionally tied to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reminder {
    id: ReminderId,
    user_id: UserId,
    task_id: Option<TaskId>,
    title: String,
    content: String,
    tier: ReminderTier,
    next_fire_at: DateTime<Utc>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl Reminder {
    /// Schedule a first-tier reminder.
    ///
    /// # Errors
    ///
    /// Returns `ReminderError::EmptyTitle` if the title is blank.
    pub fn new(
        id: ReminderId,
        user_id: UserId,
        task_id: Option<TaskId>,
        title: impl Into<String>,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, ReminderError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(ReminderError::EmptyTitle);
        }
        let tier = ReminderTier::First;
        Ok(Self {
            id,
            user_id,
            task_id,
            title,
            content: content.into(),
            tier,
            next_fire_at: now + tier.delay(),
            is_active: true,
            created_at: now,
        })
    }

    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_persisted(
        id: ReminderId,
        user_id: UserId,
        task_id: Option<TaskId>,
        title: String,
        content: String,
        tier: ReminderTier,
        next_fire_at: DateTime<Utc>,
        is_active: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            task_id,
            title,
            content,
            tier,
            next_fire_at,
            is_active,
            created_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> ReminderId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn task_id(&self) -> Option<TaskId> {
        self.task_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn tier(&self) -> ReminderTier {
        self.tier
    }

    #[must_use]
    pub fn next_fire_at(&self) -> DateTime<Utc> {
        self.next_fire_at
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Replace the placeholder id assigned before persistence.
    #[must_use]
    pub fn with_id(mut self, id: ReminderId) -> Self {
        self.id = id;
        self
    }

    /// Drop the link to a task that no longer exists.
    pub fn detach_task(&mut self) {
        self.task_id = None;
    }

    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.next_fire_at <= now
    }

    /// Move to the next tier and reschedule, or deactivate after the last tier.
    ///
    /// Returns `true` if the reminder is still active.
    pub fn dismiss(&mut self, now: DateTime<Utc>) -> bool {
        match self.tier.next() {
            Some(next) => {
                self.tier = next;
                self.next_fire_at = now + next.delay();
            }
            None => self.is_active = false,
        }
        self.is_active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn first_tier_fires_after_a_day() {
        let now = fixed_now();
        let reminder =
            Reminder::new(ReminderId::new(1), UserId::new(1), None, "Review", "", now).unwrap();
        assert_eq!(reminder.tier(), ReminderTier::First);
        assert_eq!(reminder.next_fire_at(), now + Duration::days(1));
        assert!(!reminder.is_due(now));
        assert!(reminder.is_due(now + Duration::days(1)));
    }

    #[test]
    fn dismiss_walks_tiers_then_deactivates() {
        let now = fixed_now();
        let mut reminder =
            Reminder::new(ReminderId::new(1), UserId::new(1), None, "Review", "", now).unwrap();

        assert!(reminder.dismiss(now));
        assert_eq!(reminder.tier(), ReminderTier::Second);
        assert_eq!(reminder.next_fire_at(), now + Duration::days(4));

        assert!(reminder.dismiss(now));
        assert_eq!(reminder.next_fire_at(), now + Duration::days(10));

        assert!(reminder.dismiss(now));
        assert_eq!(reminder.tier(), ReminderTier::Fourth);
        assert_eq!(reminder.next_fire_at(), now + Duration::days(30));

        assert!(!reminder.dismiss(now));
        assert!(!reminder.is_active());
        assert!(!reminder.is_due(now + Duration::days(365)));
    }

    #[test]
    fn tier_conversion_rejects_out_of_range() {
        assert_eq!(ReminderTier::from_u8(3).unwrap(), ReminderTier::Third);
        assert_eq!(
            ReminderTier::from_u8(0).unwrap_err(),
            ReminderError::InvalidTier(0)
        );
    }
}
