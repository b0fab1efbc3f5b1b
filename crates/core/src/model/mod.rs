mod chat;
mod ids;
mod plan;
mod reminder;
mod task;
mod upload;

pub use ids::{ParseIdError, PlanId, ReminderId, TaskId, UploadId, UserId};

pub use chat::{ChatActivity, ChatSessionStat};
pub use plan::{Plan, PlanError};
pub use reminder::{Reminder, ReminderError, ReminderTier};
pub use task::{Task, TaskDraft, TaskError, TaskStatus};
pub use upload::{ParsedCounts, Upload, UploadStatus, parse_timestamp};
