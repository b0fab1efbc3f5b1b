use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use services::{ActivityApiConfig, AppServices, Clock, PlanOrder};
use study_core::model::{PlanId, ReminderId, TaskDraft, TaskId, UserId};
use tracing_subscriber::{EnvFilter, fmt as log_fmt, prelude::*};

#[derive(Debug)]
enum ArgsError {
    MissingCommand,
    UnknownCommand(String),
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidId { flag: &'static str, raw: String },
    InvalidDate { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingCommand => write!(f, "missing command"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDate { flag, raw } => {
                write!(f, "invalid {flag} value (expected YYYY-MM-DD): {raw}")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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

fn parse_id(flag: &'static str, raw: String) -> Result<u64, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidId { flag, raw })
}

fn parse_date(flag: &'static str, raw: String) -> Result<NaiveDate, ArgsError> {
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| ArgsError::InvalidDate { flag, raw })
}

fn required<T>(value: Option<T>, flag: &'static str) -> Result<T, ArgsError> {
    value.ok_or(ArgsError::MissingFlag { flag })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Dashboard,
    Analytics,
    PlansList,
    PlansCreate,
    PlansShow,
    PlansDelete,
    PlansAddTask,
    PlansStatus,
    RemindersDue,
    RemindersAdd,
    RemindersDismiss,
}

impl Command {
    fn from_args(first: &str, second: Option<&str>) -> Option<Self> {
        match (first, second) {
            ("dashboard", _) => Some(Self::Dashboard),
            ("analytics", _) => Some(Self::Analytics),
            ("plans", Some("list")) => Some(Self::PlansList),
            ("plans", Some("create")) => Some(Self::PlansCreate),
            ("plans", Some("show")) => Some(Self::PlansShow),
            ("plans", Some("delete")) => Some(Self::PlansDelete),
            ("plans", Some("add-task")) => Some(Self::PlansAddTask),
            ("plans", Some("status")) => Some(Self::PlansStatus),
            ("reminders", Some("due")) => Some(Self::RemindersDue),
            ("reminders", Some("add")) => Some(Self::RemindersAdd),
            ("reminders", Some("dismiss")) => Some(Self::RemindersDismiss),
            _ => None,
        }
    }

    fn takes_action(self) -> bool {
        !matches!(self, Self::Dashboard | Self::Analytics)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    command: Command,
    db_url: String,
    user_id: UserId,
    id: Option<u64>,
    task: Option<u64>,
    title: Option<String>,
    topics: Vec<String>,
    target: Option<NaiveDate>,
    date: Option<NaiveDate>,
    status: Option<String>,
    content: Option<String>,
    description: Option<String>,
    newest: bool,
}

impl Args {
    fn parse(argv: Vec<String>, db_url: String, user_id: UserId) -> Result<Self, ArgsError> {
        let mut args = argv.into_iter();
        let first = args.next().ok_or(ArgsError::MissingCommand)?;
        let mut rest: Vec<String> = args.collect();
        let command = Command::from_args(&first, rest.first().map(String::as_str))
            .ok_or_else(|| ArgsError::UnknownCommand(first.clone()))?;
        if command.takes_action() {
            rest.remove(0);
        }

        let mut parsed = Self {
            command,
            db_url,
            user_id,
            id: None,
            task: None,
            title: None,
            topics: Vec::new(),
            target: None,
            date: None,
            status: None,
            content: None,
            description: None,
            newest: false,
        };

        let mut args = rest.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = normalize_sqlite_url(value);
                }
                "--user-id" => {
                    let value = require_value(&mut args, "--user-id")?;
                    parsed.user_id = UserId::new(parse_id("--user-id", value)?);
                }
                "--id" => {
                    let value = require_value(&mut args, "--id")?;
                    parsed.id = Some(parse_id("--id", value)?);
                }
                "--task" => {
                    let value = require_value(&mut args, "--task")?;
                    parsed.task = Some(parse_id("--task", value)?);
                }
                "--title" => parsed.title = Some(require_value(&mut args, "--title")?),
                "--topic" => parsed.topics.push(require_value(&mut args, "--topic")?),
                "--target" => {
                    let value = require_value(&mut args, "--target")?;
                    parsed.target = Some(parse_date("--target", value)?);
                }
                "--date" => {
                    let value = require_value(&mut args, "--date")?;
                    parsed.date = Some(parse_date("--date", value)?);
                }
                "--status" => parsed.status = Some(require_value(&mut args, "--status")?),
                "--content" => parsed.content = Some(require_value(&mut args, "--content")?),
                "--description" => {
                    parsed.description = Some(require_value(&mut args, "--description")?);
                }
                "--newest" => parsed.newest = true,
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  dashboard");
    eprintln!("  analytics");
    eprintln!("  plans list [--newest]");
    eprintln!("  plans create --title <text> --topic <label>... --target <YYYY-MM-DD>");
    eprintln!("  plans show --id <plan> [--date <YYYY-MM-DD>]");
    eprintln!("  plans delete --id <plan>");
    eprintln!(
        "  plans add-task --id <plan> --topic <label> --date <YYYY-MM-DD> --title <text> [--description <text>]"
    );
    eprintln!("  plans status --task <task> --status <pending|completed|skipped>");
    eprintln!("  reminders due");
    eprintln!("  reminders add --title <text> [--content <text>] [--task <task>]");
    eprintln!("  reminders dismiss --id <reminder>");
    eprintln!();
    eprintln!("Global options:");
    eprintln!("  --db <sqlite_url>     (default: sqlite://dev.sqlite3)");
    eprintln!("  --user-id <id>        (default: 1)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STUDY_DB_URL, STUDY_USER_ID, STUDY_API_BASE_URL, STUDY_API_TOKEN,");
    eprintln!("  STUDY_API_TIMEOUT_MS, RUST_LOG");
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn execute(services: &AppServices, args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let user = args.user_id;
    let planner = services.planner();
    let reminders = services.reminders();

    match args.command {
        Command::Dashboard => print_json(&services.summaries().get_dashboard(user).await?),
        Command::Analytics => print_json(&services.summaries().get_analytics(user).await?),
        Command::PlansList => {
            let order = if args.newest {
                PlanOrder::Newest
            } else {
                PlanOrder::Oldest
            };
            print_json(&planner.list_plans(user, order).await?)
        }
        Command::PlansCreate => {
            let plan = planner
                .create_plan(
                    user,
                    required(args.title, "--title")?,
                    args.topics,
                    required(args.target, "--target")?,
                )
                .await?;
            print_json(&plan)
        }
        Command::PlansShow => {
            let plan_id = PlanId::new(required(args.id, "--id")?);
            match args.date {
                Some(date) => print_json(&planner.tasks_for_date(user, plan_id, date).await?),
                None => print_json(&planner.get_plan(user, plan_id).await?),
            }
        }
        Command::PlansDelete => {
            let plan_id = PlanId::new(required(args.id, "--id")?);
            planner.delete_plan(user, plan_id).await?;
            println!("deleted plan {}", plan_id.value());
            Ok(())
        }
        Command::PlansAddTask => {
            let mut draft = TaskDraft::new(
                required(args.topics.into_iter().next(), "--topic")?,
                required(args.date, "--date")?,
                required(args.title, "--title")?,
            );
            if let Some(description) = args.description {
                draft = draft.with_description(description);
            }
            let plan_id = PlanId::new(required(args.id, "--id")?);
            print_json(&planner.add_tasks(user, plan_id, vec![draft]).await?)
        }
        Command::PlansStatus => {
            let task_id = TaskId::new(required(args.task, "--task")?);
            let status = required(args.status, "--status")?;
            print_json(&planner.update_task_status(user, task_id, &status).await?)
        }
        Command::RemindersDue => print_json(&reminders.due(user).await?),
        Command::RemindersAdd => {
            let reminder = reminders
                .schedule(
                    user,
                    required(args.title, "--title")?,
                    args.content.unwrap_or_default(),
                    args.task.map(TaskId::new),
                )
                .await?;
            print_json(&reminder)
        }
        Command::RemindersDismiss => {
            let id = ReminderId::new(required(args.id, "--id")?);
            print_json(&reminders.dismiss(user, id).await?)
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if argv.is_empty() || matches!(argv[0].as_str(), "--help" | "-h") {
        print_usage();
        return Ok(());
    }

    let db_url = std::env::var("STUDY_DB_URL")
        .ok()
        .map_or_else(|| "sqlite://dev.sqlite3".into(), normalize_sqlite_url);
    let user_id = std::env::var("STUDY_USER_ID")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map_or_else(|| UserId::new(1), UserId::new);

    let args = Args::parse(argv, db_url, user_id).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&args.db_url)?;
    let api = ActivityApiConfig::from_env();
    let services = AppServices::new_sqlite(&args.db_url, Clock::default_clock(), api).await?;
    if !services.upstream_enabled() {
        tracing::info!("STUDY_API_BASE_URL not set; activity sections use defaults");
    }

    execute(&services, args).await
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(log_fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
