use chrono::{Duration, NaiveDate};
use storage::repository::{NewTaskRecord, PlanRepository, ReminderRepository, StorageError};
use storage::sqlite::SqliteRepository;
use study_core::model::{Plan, PlanId, Reminder, ReminderId, TaskDraft, TaskStatus, UserId};
use study_core::time::fixed_now;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn build_plan(user: u64, title: &str, created_offset_mins: i64) -> Plan {
    let created_at = fixed_now() + Duration::minutes(created_offset_mins);
    Plan::new(
        PlanId::new(0),
        UserId::new(user),
        title,
        vec!["Algebra".into(), "Geometry".into()],
        created_at.date_naive() + Duration::days(30),
        created_at,
    )
    .unwrap()
}

fn record(topic: &str, date: NaiveDate, order_index: u32) -> NewTaskRecord {
    NewTaskRecord::from_draft(
        TaskDraft::new(topic, date, format!("{topic} drill")).with_description("chapter 3"),
        order_index,
    )
}

#[tokio::test]
async fn sqlite_persists_plan_with_tasks() {
    let repo = connect("memdb_plan_roundtrip").await;
    let user = UserId::new(1);
    let plan_id = repo.insert_plan(&build_plan(1, "Math Exam", 0)).await.unwrap();
    let day = fixed_now().date_naive();
    let tasks = repo
        .insert_tasks(
            user,
            plan_id,
            vec![record("Algebra", day, 0), record("Geometry", day, 1)],
        )
        .await
        .unwrap();
    assert_eq!(tasks.len(), 2);
    assert!(tasks[0].id() < tasks[1].id());

    let plan = repo.get_plan(user, plan_id).await.unwrap().expect("plan");
    assert_eq!(plan.title(), "Math Exam");
    assert_eq!(plan.topics(), ["Algebra".to_string(), "Geometry".to_string()]);
    assert_eq!(plan.created_at(), fixed_now());
    assert_eq!(plan.tasks().len(), 2);
    assert_eq!(plan.tasks()[1].description(), Some("chapter 3"));
    assert_eq!(plan.tasks()[1].order_index(), 1);
    assert_eq!(plan.tasks()[0].status(), TaskStatus::Pending);
}

#[tokio::test]
async fn sqlite_lists_plans_oldest_first_per_user() {
    let repo = connect("memdb_plan_listing").await;
    let newer = repo.insert_plan(&build_plan(1, "Newer", 10)).await.unwrap();
    let older = repo.insert_plan(&build_plan(1, "Older", 0)).await.unwrap();
    repo.insert_plan(&build_plan(2, "Other", 5)).await.unwrap();

    let plans = repo.list_plans(UserId::new(1)).await.unwrap();
    let ids: Vec<PlanId> = plans.iter().map(Plan::id).collect();
    assert_eq!(ids, vec![older, newer]);
    assert!(repo.get_plan(UserId::new(2), older).await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_status_update_returns_fresh_plan() {
    let repo = connect("memdb_status_update").await;
    let user = UserId::new(1);
    let plan_id = repo.insert_plan(&build_plan(1, "Math", 0)).await.unwrap();
    let day = fixed_now().date_naive();
    let tasks = repo
        .insert_tasks(user, plan_id, vec![record("Algebra", day, 0)])
        .await
        .unwrap();

    let plan = repo
        .set_task_status(user, tasks[0].id(), TaskStatus::Completed)
        .await
        .unwrap();
    assert!(plan.tasks()[0].is_completed());

    let err = repo
        .set_task_status(UserId::new(9), tasks[0].id(), TaskStatus::Skipped)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_delete_cascades_and_detaches_reminders() {
    let repo = connect("memdb_delete_cascade").await;
    let user = UserId::new(1);
    let plan_id = repo.insert_plan(&build_plan(1, "Math", 0)).await.unwrap();
    let day = fixed_now().date_naive();
    let tasks = repo
        .insert_tasks(user, plan_id, vec![record("Algebra", day, 0)])
        .await
        .unwrap();
    let reminder = Reminder::new(
        ReminderId::new(0),
        user,
        Some(tasks[0].id()),
        "Revise",
        "",
        fixed_now(),
    )
    .unwrap();
    let reminder_id = repo.insert_reminder(&reminder).await.unwrap();

    repo.delete_plan(user, plan_id).await.unwrap();
    assert!(repo.get_plan(user, plan_id).await.unwrap().is_none());
    assert!(matches!(
        repo.delete_plan(user, plan_id).await,
        Err(StorageError::NotFound)
    ));
    let stored = repo.get_reminder(user, reminder_id).await.unwrap().unwrap();
    assert_eq!(stored.task_id(), None);

    let next = repo.insert_plan(&build_plan(1, "Again", 0)).await.unwrap();
    assert!(next > plan_id);
}

#[tokio::test]
async fn sqlite_reminders_follow_tiers() {
    let repo = connect("memdb_reminders").await;
    let user = UserId::new(1);
    let reminder =
        Reminder::new(ReminderId::new(0), user, None, "Review", "notes", fixed_now()).unwrap();
    let id = repo.insert_reminder(&reminder).await.unwrap();

    let later = fixed_now() + Duration::days(1);
    let mut due = repo.due_reminders(user, later).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id(), id);

    let mut stored = due.remove(0);
    assert!(stored.dismiss(later));
    repo.update_reminder(&stored).await.unwrap();

    assert!(repo.due_reminders(user, later).await.unwrap().is_empty());
    let fetched = repo.get_reminder(user, id).await.unwrap().unwrap();
    assert_eq!(fetched.tier().as_u8(), 2);
    assert_eq!(fetched.next_fire_at(), later + Duration::days(4));
}
