#![forbid(unsafe_code)]

pub mod activity;
pub mod app_services;
pub mod error;
pub mod planner_service;
pub mod reminder_service;
pub mod summary_service;

pub use study_core::Clock;

pub use activity::{
    ActivityApiConfig, ChatActivitySource, HttpActivityClient, StudyMetricsSource, UploadSource,
    parse_base_url,
};
pub use app_services::AppServices;
pub use error::{
    AppServicesError, PlannerError, ReminderServiceError, SummaryError, UpstreamError,
};
pub use planner_service::{PlanOrder, PlannerService, TaskStatusUpdate};
pub use reminder_service::ReminderService;
pub use summary_service::SummaryService;
