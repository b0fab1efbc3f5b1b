//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use study_core::model::{PlanError, ReminderError, TaskError};

/// Errors emitted by `PlannerService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlannerError {
    #[error(transparent)]
    Validation(#[from] study_core::Error),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },
    #[error(transparent)]
    Storage(StorageError),
}

impl From<PlanError> for PlannerError {
    fn from(err: PlanError) -> Self {
        Self::Validation(err.into())
    }
}

impl From<TaskError> for PlannerError {
    fn from(err: TaskError) -> Self {
        Self::Validation(err.into())
    }
}

impl From<StorageError> for PlannerError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

/// A failed call to an external activity collaborator.
///
/// Never surfaced by summary operations; those substitute defaults instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UpstreamError {
    #[error("{source_name} is unavailable: {reason}")]
    Unavailable {
        source_name: &'static str,
        reason: String,
    },
    #[error("{0} did not answer in time")]
    Timeout(&'static str),
    #[error("activity api is not configured")]
    Disabled,
    #[error("invalid activity api base url: {0}")]
    InvalidBaseUrl(String),
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error("activity api request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `SummaryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SummaryError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ReminderService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReminderServiceError {
    #[error(transparent)]
    Reminder(#[from] ReminderError),
    #[error("reminder {0} not found")]
    NotFound(u64),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("invalid activity api configuration: {0}")]
    Config(String),
}
