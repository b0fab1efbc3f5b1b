use std::sync::Arc;
use std::time::Duration;

use storage::repository::Storage;

use crate::activity::{ActivityApiConfig, HttpActivityClient, parse_base_url};
use crate::error::AppServicesError;
use crate::planner_service::PlannerService;
use crate::reminder_service::ReminderService;
use crate::summary_service::SummaryService;
use crate::Clock;

/// Assembles app-facing services over one storage backend and one
/// activity API client.
#[derive(Clone)]
pub struct AppServices {
    planner: Arc<PlannerService>,
    summaries: Arc<SummaryService>,
    reminders: Arc<ReminderService>,
    upstream_enabled: bool,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the
    /// activity API base URL is malformed.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        api: Option<ActivityApiConfig>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(storage, clock, api)
    }

    /// Build services over in-memory storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Config` if the activity API base URL is
    /// malformed.
    pub fn in_memory(clock: Clock, api: Option<ActivityApiConfig>) -> Result<Self, AppServicesError> {
        Self::from_storage(Storage::in_memory(), clock, api)
    }

    fn from_storage(
        storage: Storage,
        clock: Clock,
        api: Option<ActivityApiConfig>,
    ) -> Result<Self, AppServicesError> {
        if let Some(config) = &api {
            parse_base_url(&config.base_url)
                .map_err(|e| AppServicesError::Config(e.to_string()))?;
        }
        let timeout = api
            .as_ref()
            .map_or_else(ActivityApiConfig::default_timeout, |c| c.timeout);
        let client = Arc::new(HttpActivityClient::new(api));
        let upstream_enabled = client.enabled();

        let planner = Arc::new(PlannerService::new(clock, Arc::clone(&storage.plans)));
        let summaries = Arc::new(
            SummaryService::new(
                Arc::clone(&storage.plans),
                client.clone(),
                client.clone(),
                client,
            )
            .with_timeout(non_zero(timeout)),
        );
        let reminders = Arc::new(ReminderService::new(clock, Arc::clone(&storage.reminders)));

        Ok(Self {
            planner,
            summaries,
            reminders,
            upstream_enabled,
        })
    }

    #[must_use]
    pub fn planner(&self) -> Arc<PlannerService> {
        Arc::clone(&self.planner)
    }

    #[must_use]
    pub fn summaries(&self) -> Arc<SummaryService> {
        Arc::clone(&self.summaries)
    }

    #[must_use]
    pub fn reminders(&self) -> Arc<ReminderService> {
        Arc::clone(&self.reminders)
    }

    #[must_use]
    pub fn upstream_enabled(&self) -> bool {
        self.upstream_enabled
    }
}

fn non_zero(timeout: Duration) -> Duration {
    if timeout.is_zero() {
        ActivityApiConfig::default_timeout()
    } else {
        timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use study_core::time::fixed_clock;

    fn api(base_url: &str) -> ActivityApiConfig {
        ActivityApiConfig {
            base_url: base_url.into(),
            token: None,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn rejects_malformed_base_urls() {
        for raw in ["localhost:8000", "https://", "http://", "ftp://files.example.com"] {
            assert!(
                matches!(
                    AppServices::in_memory(fixed_clock(), Some(api(raw))),
                    Err(AppServicesError::Config(_))
                ),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn accepts_base_url_with_host_and_path() {
        let services =
            AppServices::in_memory(fixed_clock(), Some(api("http://127.0.0.1:5000/api"))).unwrap();
        assert!(services.upstream_enabled());
    }

    #[test]
    fn upstream_disabled_without_config() {
        let services = AppServices::in_memory(fixed_clock(), None).unwrap();
        assert!(!services.upstream_enabled());
    }
}
