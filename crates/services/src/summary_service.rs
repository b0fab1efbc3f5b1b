use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use storage::repository::PlanRepository;
use study_core::model::{ChatActivity, UserId};
use study_core::summary::{AnalyticsSummary, DashboardSummary, build_analytics, build_dashboard};

use crate::activity::{ActivityApiConfig, ChatActivitySource, StudyMetricsSource, UploadSource};
use crate::error::{SummaryError, UpstreamError};

/// Builds the dashboard and analytics views.
///
/// Each upstream collaborator is awaited once under `timeout`. A failed or
/// late call is logged and replaced by its default; only storage errors
/// reach the caller.
#[derive(Clone)]
pub struct SummaryService {
    plans: Arc<dyn PlanRepository>,
    uploads: Arc<dyn UploadSource>,
    chat: Arc<dyn ChatActivitySource>,
    metrics: Arc<dyn StudyMetricsSource>,
    timeout: Duration,
}

impl SummaryService {
    #[must_use]
    pub fn new(
        plans: Arc<dyn PlanRepository>,
        uploads: Arc<dyn UploadSource>,
        chat: Arc<dyn ChatActivitySource>,
        metrics: Arc<dyn StudyMetricsSource>,
    ) -> Self {
        Self {
            plans,
            uploads,
            chat,
            metrics,
            timeout: ActivityApiConfig::default_timeout(),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn bounded<T, F>(&self, user: UserId, source: &'static str, call: F) -> T
    where
        T: Default,
        F: Future<Output = Result<T, UpstreamError>>,
    {
        let outcome = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout(source)),
        };
        outcome.unwrap_or_else(|error| {
            tracing::warn!(
                user_id = user.value(),
                source,
                %error,
                "upstream call failed; using defaults"
            );
            T::default()
        })
    }

    /// # Errors
    ///
    /// Returns `SummaryError::Storage` if plans cannot be loaded.
    pub async fn get_dashboard(&self, user: UserId) -> Result<DashboardSummary, SummaryError> {
        let plans = self.plans.list_plans(user).await?;
        let uploads = self
            .bounded(user, "uploads", self.uploads.list_uploads(user))
            .await;
        let metrics = self
            .bounded(user, "metrics", self.metrics.study_metrics(user))
            .await;
        Ok(build_dashboard(&plans, &uploads, &metrics))
    }

    /// # Errors
    ///
    /// Returns `SummaryError::Storage` if plans cannot be loaded.
    pub async fn get_analytics(&self, user: UserId) -> Result<AnalyticsSummary, SummaryError> {
        let plans = self.plans.list_plans(user).await?;
        let sessions = self
            .bounded(user, "chat", self.chat.list_sessions(user))
            .await;
        Ok(build_analytics(
            &plans,
            ChatActivity::from_sessions(&sessions),
        ))
    }
}
