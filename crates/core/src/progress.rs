//! Completion-rate rollups over plans and tasks.
//!
//! Every function here is read-only and deterministic for a given snapshot.
//! Rates are whole percentages in `0..=100`, rounded half up, and a zero
//! denominator always yields `0`.

use std::collections::BTreeMap;
use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{Plan, PlanId, Task};

/// Completion percentage in `0..=100`.
pub type Rate = u8;

//
// ─── RATE ──────────────────────────────────────────────────────────────────────
//

/// `round(100 * completed / total)` with ties rounded up; `0` when `total == 0`.
///
/// `completed` is clamped to `total` so the result never exceeds 100.
#[must_use]
pub fn completion_rate(completed: u64, total: u64) -> Rate {
    if total == 0 {
        return 0;
    }
    let completed = u128::from(completed.min(total));
    let total = u128::from(total);
    let rounded = (200 * completed + total) / (2 * total);
    Rate::try_from(rounded).unwrap_or(100)
}

/// Completed/total tally for any grouping of tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    pub total: u64,
    pub completed: u64,
}

impl Tally {
    #[must_use]
    pub fn of<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut tally = Self::default();
        for task in tasks {
            tally.add(task);
        }
        tally
    }

    pub fn add(&mut self, task: &Task) {
        self.total += 1;
        if task.is_completed() {
            self.completed += 1;
        }
    }

    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            total: self.total + other.total,
            completed: self.completed + other.completed,
        }
    }

    #[must_use]
    pub fn rate(&self) -> Rate {
        completion_rate(self.completed, self.total)
    }
}

//
// ─── TOPICS ────────────────────────────────────────────────────────────────────
//

/// Completion for one topic label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicStat {
    pub topic: String,
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub completion_rate: Rate,
}

impl TopicStat {
    fn from_tally(topic: String, tally: Tally) -> Self {
        Self {
            topic,
            total_tasks: tally.total,
            completed_tasks: tally.completed,
            completion_rate: tally.rate(),
        }
    }

    #[must_use]
    pub fn is_mastered(&self) -> bool {
        self.completion_rate == 100
    }
}

/// Completion rate of the given tasks, all assumed to share one topic.
#[must_use]
pub fn topic_completion_rate<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Rate {
    Tally::of(tasks).rate()
}

/// Insertion-ordered buckets keyed by topic label.
#[derive(Default)]
struct TopicBuckets {
    order: Vec<String>,
    tallies: HashMap<String, Tally>,
}

impl TopicBuckets {
    fn declare(&mut self, topic: &str) {
        if !self.tallies.contains_key(topic) {
            self.order.push(topic.to_string());
            self.tallies.insert(topic.to_string(), Tally::default());
        }
    }

    fn absorb(&mut self, plan: &Plan) {
        let mut local = TopicBuckets::default();
        for topic in plan.topics() {
            self.declare(topic);
            local.declare(topic);
        }
        // Tasks whose topic was not declared on their plan fall into no bucket.
        for task in plan.tasks() {
            if let Some(tally) = local.tallies.get_mut(task.topic()) {
                tally.add(task);
            }
        }
        for (topic, tally) in local.tallies {
            if let Some(total) = self.tallies.get_mut(&topic) {
                *total = total.merge(tally);
            }
        }
    }

    fn into_stats(mut self) -> Vec<TopicStat> {
        self.order
            .into_iter()
            .map(|topic| {
                let tally = self.tallies.remove(&topic).unwrap_or_default();
                TopicStat::from_tally(topic, tally)
            })
            .collect()
    }
}

/// One entry per distinct declared topic of `plan`, in first-declared order.
///
/// Declared topics without tasks still appear with zero totals.
#[must_use]
pub fn per_topic_stats(plan: &Plan) -> Vec<TopicStat> {
    per_topic_stats_across(std::slice::from_ref(plan))
}

/// Topic stats merged across plans by exact label.
///
/// Order is first appearance, walking plans in the given order.
#[must_use]
pub fn per_topic_stats_across(plans: &[Plan]) -> Vec<TopicStat> {
    let mut buckets = TopicBuckets::default();
    for plan in plans {
        buckets.absorb(plan);
    }
    buckets.into_stats()
}

/// Number of topics whose completion rate is exactly 100.
#[must_use]
pub fn topics_mastered(stats: &[TopicStat]) -> usize {
    stats.iter().filter(|stat| stat.is_mastered()).count()
}

//
// ─── DAYS ──────────────────────────────────────────────────────────────────────
//

/// Completion for one scheduled date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCompletion {
    pub date: NaiveDate,
    pub total: u64,
    pub completed: u64,
    pub rate: Rate,
}

impl DailyCompletion {
    fn from_tally(date: NaiveDate, tally: Tally) -> Self {
        Self {
            date,
            total: tally.total,
            completed: tally.completed,
            rate: tally.rate(),
        }
    }
}

/// Inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    #[must_use]
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

fn tally_by_date<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
    range: Option<DateRange>,
) -> BTreeMap<NaiveDate, Tally> {
    let mut days: BTreeMap<NaiveDate, Tally> = BTreeMap::new();
    for task in tasks {
        if range.is_some_and(|r| !r.contains(task.date())) {
            continue;
        }
        days.entry(task.date()).or_default().add(task);
    }
    days
}

/// One entry per distinct task date, ascending. No gap filling.
///
/// With a range, tasks dated outside it are ignored.
#[must_use]
pub fn per_day_completion<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
    range: Option<DateRange>,
) -> Vec<DailyCompletion> {
    tally_by_date(tasks, range)
        .into_iter()
        .map(|(date, tally)| DailyCompletion::from_tally(date, tally))
        .collect()
}

/// One entry per calendar day in `range`, zero-filled where nothing is scheduled.
///
/// An inverted range yields no entries.
#[must_use]
pub fn per_day_completion_padded<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
    range: DateRange,
) -> Vec<DailyCompletion> {
    let days = tally_by_date(tasks, Some(range));
    range
        .from
        .iter_days()
        .take_while(|date| *date <= range.to)
        .map(|date| DailyCompletion::from_tally(date, days.get(&date).copied().unwrap_or_default()))
        .collect()
}

/// Keep the `n` most recent entries of an ascending daily series.
#[must_use]
pub fn most_recent_days(mut days: Vec<DailyCompletion>, n: usize) -> Vec<DailyCompletion> {
    let excess = days.len().saturating_sub(n);
    days.drain(..excess);
    days
}

//
// ─── PLANS ─────────────────────────────────────────────────────────────────────
//

/// Completed over total tasks of one plan.
#[must_use]
pub fn plan_adherence(plan: &Plan) -> Rate {
    Tally::of(plan.tasks()).rate()
}

/// Task-count weighted adherence over several plans.
///
/// Weighted by task count rather than averaged per plan.
#[must_use]
pub fn weighted_adherence(plans: &[Plan]) -> Rate {
    plans
        .iter()
        .map(|plan| Tally::of(plan.tasks()))
        .fold(Tally::default(), Tally::merge)
        .rate()
}

/// Derived progress of a single plan, returned after task mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanProgress {
    pub plan_id: PlanId,
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub adherence: Rate,
    pub topic_stats: Vec<TopicStat>,
}

impl PlanProgress {
    #[must_use]
    pub fn of(plan: &Plan) -> Self {
        let tally = Tally::of(plan.tasks());
        Self {
            plan_id: plan.id(),
            total_tasks: tally.total,
            completed_tasks: tally.completed,
            adherence: tally.rate(),
            topic_stats: per_topic_stats(plan),
        }
    }
}
