use std::fmt;

use chrono::{DateTime, Duration, Utc};
use storage::repository::{NewTaskRecord, Storage};
use study_core::model::{Plan, PlanId, Reminder, ReminderId, TaskDraft, TaskStatus, UserId};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    user_id: UserId,
    plan_title: String,
    days: u32,
    reminders: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidUserId { raw: String },
    InvalidDays { raw: String },
    InvalidReminders { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user-id value: {raw}"),
            ArgsError::InvalidDays { raw } => write!(f, "invalid --days value: {raw}"),
            ArgsError::InvalidReminders { raw } => write!(f, "invalid --reminders value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("STUDY_DB_URL").unwrap_or_else(|_| "sqlite://dev.sqlite3".into());
        let mut user_id = std::env::var("STUDY_USER_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| UserId::new(1), UserId::new);
        let mut plan_title = "Math Exam".to_string();
        let mut days = 5;
        let mut reminders = 2;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--user-id" => {
                    let value = require_value(&mut args, "--user-id")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidUserId { raw: value.clone() })?;
                    user_id = UserId::new(parsed);
                }
                "--title" => {
                    plan_title = require_value(&mut args, "--title")?;
                }
                "--days" => {
                    let value = require_value(&mut args, "--days")?;
                    days = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidDays { raw: value.clone() })?;
                }
                "--reminders" => {
                    let value = require_value(&mut args, "--reminders")?;
                    reminders = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidReminders { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            user_id,
            plan_title,
            days,
            reminders,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://dev.sqlite3)");
    eprintln!("  --user-id <id>            Owner of the seeded plan (default: 1)");
    eprintln!("  --title <text>            Plan title (default: Math Exam)");
    eprintln!("  --days <n>                Days of tasks to generate (default: 5)");
    eprintln!("  --reminders <n>           Reminders to schedule (default: 2)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  STUDY_DB_URL, STUDY_USER_ID");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);
    let topics = vec!["Algebra".to_string(), "Geometry".to_string()];

    let plan = Plan::new(
        PlanId::new(0),
        args.user_id,
        args.plan_title.clone(),
        topics.clone(),
        now.date_naive() + Duration::days(i64::from(args.days.max(1))),
        now,
    )?;
    let plan_id = storage.plans.insert_plan(&plan).await?;

    let mut records = Vec::new();
    for day in 0..args.days {
        let date = now.date_naive() + Duration::days(i64::from(day));
        for (order_index, topic) in (0_u32..).zip(&topics) {
            let draft = TaskDraft::new(topic.clone(), date, format!("{topic} practice set"));
            records.push(NewTaskRecord::from_draft(draft, order_index));
        }
    }
    let tasks = storage
        .plans
        .insert_tasks(args.user_id, plan_id, records)
        .await?;

    // First day starts out completed.
    for task in tasks.iter().filter(|t| t.date() == now.date_naive()) {
        storage
            .plans
            .set_task_status(args.user_id, task.id(), TaskStatus::Completed)
            .await?;
    }

    for (i, task) in (0..args.reminders).zip(tasks.iter().cycle()) {
        let reminder = Reminder::new(
            ReminderId::new(0),
            args.user_id,
            Some(task.id()),
            format!("Revisit {}", task.topic()),
            task.title(),
            now - Duration::days(i64::from(i) + 1),
        )?;
        storage.reminders.insert_reminder(&reminder).await?;
    }

    println!(
        "Seeded plan {} with {} tasks and {} reminders into {}",
        plan_id.value(),
        tasks.len(),
        args.reminders,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
