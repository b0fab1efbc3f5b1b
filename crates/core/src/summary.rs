//! Dashboard and analytics snapshots assembled from plans plus
//! externally supplied activity.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{ChatActivity, Plan, Upload};
use crate::progress::{
    most_recent_days, per_day_completion, per_topic_stats_across, topics_mastered,
    weighted_adherence, DailyCompletion, Rate, TopicStat,
};

/// How many recent plans and uploads the dashboard shows.
pub const RECENT_ACTIVITY_LIMIT: usize = 3;

/// How many distinct task dates the analytics view keeps.
pub const RECENT_DAYS_LIMIT: usize = 7;

/// Study metrics owned by an external collaborator.
///
/// Both values are passed through untouched apart from summing the minutes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StudyMetrics {
    pub session_minutes: Vec<u32>,
    pub efficiency_score: f64,
}

impl StudyMetrics {
    #[must_use]
    pub fn time_spent_minutes(&self) -> u64 {
        self.session_minutes.iter().map(|m| u64::from(*m)).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub plan_adherence: Rate,
    pub topics_mastered: usize,
    pub time_spent_minutes: u64,
    pub efficiency_score: f64,
    pub total_plans: usize,
    pub total_uploads: usize,
    pub recent_plans: Vec<Plan>,
    pub recent_uploads: Vec<Upload>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub chat_activity: ChatActivity,
    pub topic_stats: Vec<TopicStat>,
    pub daily_completions: Vec<DailyCompletion>,
}

/// Stable newest-first window: creation time descending, ties broken by
/// the larger id first.
pub fn most_recent<T, K: Ord>(
    items: &[T],
    n: usize,
    created_at: impl Fn(&T) -> DateTime<Utc>,
    id: impl Fn(&T) -> K,
) -> Vec<T>
where
    T: Clone,
{
    let mut sorted: Vec<&T> = items.iter().collect();
    sorted.sort_by(|a, b| {
        created_at(b)
            .cmp(&created_at(a))
            .then_with(|| id(b).cmp(&id(a)))
    });
    sorted.into_iter().take(n).cloned().collect()
}

/// Build the dashboard for one user's plans.
#[must_use]
pub fn build_dashboard(
    plans: &[Plan],
    uploads: &[Upload],
    metrics: &StudyMetrics,
) -> DashboardSummary {
    let topic_stats = per_topic_stats_across(plans);
    DashboardSummary {
        plan_adherence: weighted_adherence(plans),
        topics_mastered: topics_mastered(&topic_stats),
        time_spent_minutes: metrics.time_spent_minutes(),
        efficiency_score: metrics.efficiency_score,
        total_plans: plans.len(),
        total_uploads: uploads.len(),
        recent_plans: most_recent(plans, RECENT_ACTIVITY_LIMIT, Plan::created_at, Plan::id),
        recent_uploads: most_recent(
            uploads,
            RECENT_ACTIVITY_LIMIT,
            |u: &Upload| u.created_at,
            |u: &Upload| u.id,
        ),
    }
}

/// Build the analytics view for one user's plans.
#[must_use]
pub fn build_analytics(plans: &[Plan], chat_activity: ChatActivity) -> AnalyticsSummary {
    let all_tasks = plans.iter().flat_map(Plan::tasks);
    AnalyticsSummary {
        chat_activity,
        topic_stats: per_topic_stats_across(plans),
        daily_completions: most_recent_days(per_day_completion(all_tasks, None), RECENT_DAYS_LIMIT),
    }
}
