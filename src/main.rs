//! Cairn CLI - a task manager built around renegotiating overdue work.

use cairn::cli::{
    CategoryCommands, Cli, Commands, CommitmentCommands, ConfigCommands, OutcomeCommands,
    SystemCommands, TaskCommands, ViewCommands,
};
use cairn::commands::{self, Output, RenegotiateArgs};
use cairn::filters::TaskFilters;
use cairn::grouping::SortMode;
use cairn::models::{
    NewCategory, NewCommitment, NewOutcome, NewTask, OutcomePatch, OutcomeStatus, Priority,
    RecurrenceRule, TaskPatch, TaskStatus,
};
use cairn::prefs::{OutputFormat, Prefs};
use cairn::renegotiate::QuickPick;
use cairn::store;
use cairn::{Error, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::Parser;
use std::path::Path;
use std::process;
use std::str::FromStr;

fn main() {
    let cli = Cli::parse();

    // Determine data dir: --data-dir flag > CAIRN_DATA_DIR env > platform default
    let data_dir = match store::resolve_data_dir(cli.data_dir.as_deref()) {
        Ok(dir) => dir,
        Err(e) => {
            print_error(&e, cli.human_readable);
            process::exit(1);
        }
    };

    // The -H flag wins; otherwise the configured output format decides
    let human = cli.human_readable
        || matches!(
            Prefs::load(&data_dir).output_format,
            Some(OutputFormat::Human)
        );

    if let Err(e) = run_command(cli.command, &data_dir, human) {
        print_error(&e, human);
        process::exit(1);
    }
}

fn print_error(error: &Error, human: bool) {
    if human {
        eprintln!("Error: {}", error);
        if let Error::Conflict { dependents, .. } = error {
            eprintln!("Blocked by: {}", dependents.join(", "));
        }
    } else {
        let body = match error {
            Error::Conflict {
                message,
                dependents,
            } => serde_json::json!({ "error": message, "dependents": dependents }),
            other => serde_json::json!({ "error": other.to_string() }),
        };
        eprintln!("{}", body);
    }
}

/// Print a command result in the requested format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

fn run_command(command: Option<Commands>, data_dir: &Path, human: bool) -> Result<()> {
    match command {
        Some(Commands::Task { command }) => match command {
            TaskCommands::Add {
                title,
                due,
                time,
                priority,
                category,
                outcome,
                repeat,
                until,
            } => {
                let new = NewTask {
                    title,
                    due_date: due.as_deref().map(parse_date).transpose()?,
                    due_time: time.as_deref().map(parse_time).transpose()?,
                    priority: priority.as_deref().map(parse_enum::<Priority>).transpose()?,
                    category_id: category,
                    outcome_id: outcome,
                    recurrence: build_recurrence(repeat.as_deref(), until.as_deref())?,
                    category_confidence: None,
                };
                let result = commands::task_add(data_dir, new)?;
                output(&result, human);
            }
            TaskCommands::List {
                status,
                category,
                priority,
                due,
                recurring,
                view,
                sort,
                flat,
            } => {
                let mut filters = TaskFilters::default();
                if let Some(status) = status {
                    for part in status.split(',') {
                        filters.statuses.insert(parse_enum::<TaskStatus>(part.trim())?);
                    }
                }
                if let Some(category) = category {
                    for part in category.split(',') {
                        filters.categories.insert(part.trim().to_string());
                    }
                }
                if let Some(priority) = priority {
                    for part in priority.split(',') {
                        filters.priorities.insert(parse_enum::<Priority>(part.trim())?);
                    }
                }
                if let Some(due) = due.as_deref() {
                    filters.due = Some(parse_enum(due)?);
                }
                filters.recurring = recurring;

                let sort = sort.as_deref().map(parse_enum::<SortMode>).transpose()?;
                let result = commands::task_list(data_dir, filters, sort, view.as_deref(), flat)?;
                output(&result, human);
            }
            TaskCommands::Show { id } => {
                let result = commands::task_show(data_dir, &id)?;
                output(&result, human);
            }
            TaskCommands::Update {
                id,
                title,
                status,
                due,
                time,
                priority,
                category,
                outcome,
                position,
                repeat,
                until,
            } => {
                let mut patch = TaskPatch {
                    title,
                    status: status.as_deref().map(parse_enum::<TaskStatus>).transpose()?,
                    position,
                    ..Default::default()
                };
                if let Some(due) = due.as_deref() {
                    patch.due_date = Some(clearable(due, parse_date)?);
                }
                if let Some(time) = time.as_deref() {
                    patch.due_time = Some(clearable(time, parse_time)?);
                }
                if let Some(priority) = priority.as_deref() {
                    patch.priority = Some(clearable(priority, parse_enum::<Priority>)?);
                }
                if let Some(category) = category {
                    patch.category_id = Some(clear_string(category));
                }
                if let Some(outcome) = outcome {
                    patch.outcome_id = Some(clear_string(outcome));
                }
                if repeat.as_deref() == Some("none") {
                    if until.is_some() {
                        return Err(Error::InvalidInput("--until needs --repeat".to_string()));
                    }
                    patch.recurrence_rule = Some(None);
                } else if let Some(rule) = build_recurrence(repeat.as_deref(), until.as_deref())? {
                    patch.recurrence_rule = Some(Some(rule));
                }
                let result = commands::task_update(data_dir, &id, patch)?;
                output(&result, human);
            }
            TaskCommands::Done { id } => {
                let result = commands::task_done(data_dir, &id)?;
                output(&result, human);
            }
            TaskCommands::Skip { id } => {
                let result = commands::task_skip(data_dir, &id)?;
                output(&result, human);
            }
            TaskCommands::Drop { id } => {
                let result = commands::task_drop(data_dir, &id)?;
                output(&result, human);
            }
            TaskCommands::Reorder { ids } => {
                let result = commands::task_reorder(data_dir, &ids)?;
                output(&result, human);
            }
        },
        Some(Commands::Category { command }) => match command {
            CategoryCommands::Add { name, color, icon } => {
                let result = commands::category_add(data_dir, NewCategory { name, color, icon })?;
                output(&result, human);
            }
            CategoryCommands::List => {
                let result = commands::category_list(data_dir)?;
                output(&result, human);
            }
            CategoryCommands::Rm { id } => {
                let result = commands::category_rm(data_dir, &id)?;
                output(&result, human);
            }
        },
        Some(Commands::View { command }) => match command {
            ViewCommands::List => {
                let result = commands::view_list(data_dir)?;
                output(&result, human);
            }
            ViewCommands::Save { name, query } => {
                let result = commands::view_save(data_dir, &name, &query)?;
                output(&result, human);
            }
            ViewCommands::Rm { id } => {
                let result = commands::view_rm(data_dir, &id)?;
                output(&result, human);
            }
        },
        Some(Commands::Outcome { command }) => match command {
            OutcomeCommands::Add {
                title,
                description,
                target,
            } => {
                let new = NewOutcome {
                    title,
                    description,
                    target_date: target.as_deref().map(parse_date).transpose()?,
                };
                let result = commands::outcome_add(data_dir, new)?;
                output(&result, human);
            }
            OutcomeCommands::List => {
                let result = commands::outcome_list(data_dir)?;
                output(&result, human);
            }
            OutcomeCommands::Show { id } => {
                let result = commands::outcome_show(data_dir, &id)?;
                output(&result, human);
            }
            OutcomeCommands::Update {
                id,
                title,
                description,
                target,
                status,
            } => {
                let mut patch = OutcomePatch {
                    title,
                    status: status
                        .as_deref()
                        .map(parse_enum::<OutcomeStatus>)
                        .transpose()?,
                    ..Default::default()
                };
                if let Some(description) = description {
                    patch.description = Some(clear_string(description));
                }
                if let Some(target) = target.as_deref() {
                    patch.target_date = Some(clearable(target, parse_date)?);
                }
                let result = commands::outcome_update(data_dir, &id, patch)?;
                output(&result, human);
            }
            OutcomeCommands::Rm { id } => {
                let result = commands::outcome_rm(data_dir, &id)?;
                output(&result, human);
            }
        },
        Some(Commands::Commitment { command }) => match command {
            CommitmentCommands::Add {
                outcome,
                title,
                cadence,
            } => {
                let new = NewCommitment {
                    outcome_id: outcome,
                    title,
                    cadence,
                };
                let result = commands::commitment_add(data_dir, new)?;
                output(&result, human);
            }
            CommitmentCommands::List { outcome } => {
                let result = commands::commitment_list(data_dir, outcome.as_deref())?;
                output(&result, human);
            }
            CommitmentCommands::Rm { id } => {
                let result = commands::commitment_rm(data_dir, &id)?;
                output(&result, human);
            }
        },
        Some(Commands::Renegotiate {
            task,
            action,
            reason,
            note,
            pick,
            date,
            steps,
            estimate,
            preview,
        }) => {
            if preview {
                let result = commands::renegotiate_preview(data_dir, &task, estimate)?;
                output(&result, human);
            } else {
                let action = action.ok_or_else(|| {
                    Error::InvalidInput("Renegotiate needs --action (or --preview)".to_string())
                })?;
                let reason = reason
                    .ok_or_else(|| Error::InvalidInput("Renegotiate needs --reason".to_string()))?;
                let args = RenegotiateArgs {
                    task_id: task,
                    action: parse_enum(&action)?,
                    reason_code: parse_enum(&reason)?,
                    reason_text: note,
                    pick: pick.as_deref().map(parse_enum::<QuickPick>).transpose()?,
                    date: date.as_deref().map(parse_date).transpose()?,
                    steps,
                    estimate,
                };
                let result = commands::renegotiate_apply(data_dir, args)?;
                output(&result, human);
            }
        }
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Get { key } => {
                let result = commands::config_get(data_dir, &key)?;
                output(&result, human);
            }
            ConfigCommands::Set { key, value } => {
                let result = commands::config_set(data_dir, &key, &value)?;
                output(&result, human);
            }
            ConfigCommands::List => {
                let result = commands::config_list(data_dir)?;
                output(&result, human);
            }
        },
        Some(Commands::System { command }) => match command {
            SystemCommands::Init => {
                let result = commands::system_init(data_dir)?;
                output(&result, human);
            }
        },
        #[cfg(feature = "server")]
        Some(Commands::Serve { port, host }) => {
            if !store::Store::exists(data_dir) {
                return Err(Error::NotInitialized);
            }
            cairn::server::init_tracing();
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|e| Error::Other(format!("Failed to start async runtime: {}", e)))?;
            runtime.block_on(async {
                cairn::server::start_server(data_dir, port, &host)
                    .await
                    .map_err(|e| Error::Other(format!("Server error: {}", e)))
            })?;
        }
        None => {
            // Bare `cairn` shows the grouped summary for today
            match commands::status(data_dir) {
                Ok(result) => output(&result, human),
                Err(Error::NotInitialized) => {
                    if human {
                        println!("No cairn data yet. Run `cairn system init` to get started.");
                    } else {
                        println!(r#"{{"initialized": false, "tasks": []}}"#);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    Ok(())
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    s.parse().map_err(|_| {
        Error::InvalidInput(format!("Invalid date (expected YYYY-MM-DD): {}", s))
    })
}

fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| Error::InvalidInput(format!("Invalid time (expected HH:MM): {}", s)))
}

fn parse_enum<T>(s: &str) -> Result<T>
where
    T: FromStr<Err = String>,
{
    s.parse().map_err(Error::InvalidInput)
}

/// Parse an update value, treating the literal "none" as a clear.
fn clearable<T>(value: &str, parse: impl Fn(&str) -> Result<T>) -> Result<Option<T>> {
    if value == "none" {
        Ok(None)
    } else {
        parse(value).map(Some)
    }
}

fn clear_string(value: String) -> Option<String> {
    if value == "none" { None } else { Some(value) }
}

fn build_recurrence(
    repeat: Option<&str>,
    until: Option<&str>,
) -> Result<Option<RecurrenceRule>> {
    match repeat {
        Some(frequency) => {
            let mut rule = RecurrenceRule::new(parse_enum(frequency)?);
            rule.end_date = until.map(parse_date).transpose()?;
            Ok(Some(rule))
        }
        None => {
            if until.is_some() {
                return Err(Error::InvalidInput("--until needs --repeat".to_string()));
            }
            Ok(None)
        }
    }
}
