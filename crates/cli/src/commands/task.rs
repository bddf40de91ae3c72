//! task command - Inspect, wait for or cancel ingestion and export tasks

use clap::Subcommand;
use serde::Serialize;

use super::GlobalOptions;
use super::session::Session;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, ProgressBar};
use eeu_core::{TaskRunner as _, TaskStatus, tasks};

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Show the state of tasks
    Status(StatusArgs),

    /// Wait until tasks finish
    Wait(WaitArgs),

    /// Cancel tasks
    Cancel(CancelArgs),
}

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    /// Task ids
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct WaitArgs {
    /// Task ids
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// Seconds to wait before giving up
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(clap::Args, Debug)]
pub struct CancelArgs {
    /// Task ids
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
struct WaitOutput {
    completed: bool,
    tasks: Vec<TaskStatus>,
}

#[derive(Debug, Serialize)]
struct CancelOutput {
    status: &'static str,
    cancelled: Vec<String>,
}

/// Execute a task subcommand
pub async fn execute(cmd: TaskCommands, globals: GlobalOptions) -> ExitCode {
    let formatter = Formatter::new(globals.output.clone());
    let session = match Session::open(globals.profile.as_deref()) {
        Ok(s) => s,
        Err(e) => return super::fail(&formatter, "Failed to open session", &e),
    };

    match cmd {
        TaskCommands::Status(args) => execute_status(args, &session, &formatter).await,
        TaskCommands::Wait(args) => execute_wait(args, &session, &formatter).await,
        TaskCommands::Cancel(args) => execute_cancel(args, &session, &formatter).await,
    }
}

async fn statuses(session: &Session, ids: &[String]) -> eeu_core::Result<Vec<TaskStatus>> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        out.push(session.client().task_status(id).await?);
    }
    Ok(out)
}

fn print_statuses(formatter: &Formatter, statuses: &[TaskStatus]) {
    formatter.table(&["TASK", "STATE", "PROGRESS", "DETAIL"], status_rows(statuses));
}

fn status_rows(statuses: &[TaskStatus]) -> Vec<Vec<String>> {
    statuses
        .iter()
        .map(|status| {
            vec![
                status.id.clone(),
                status.state.to_string(),
                status
                    .progress
                    .map(|p| format!("{:.0}%", p * 100.0))
                    .unwrap_or_else(|| "-".to_string()),
                status
                    .error_message
                    .clone()
                    .or_else(|| status.description.clone())
                    .unwrap_or_default(),
            ]
        })
        .collect()
}

async fn execute_status(args: StatusArgs, session: &Session, formatter: &Formatter) -> ExitCode {
    match statuses(session, &args.ids).await {
        Ok(statuses) => {
            if formatter.is_json() {
                formatter.json(&statuses);
            } else {
                print_statuses(formatter, &statuses);
            }
            ExitCode::Success
        }
        Err(e) => super::fail(formatter, "Failed to get task status", &e),
    }
}

async fn execute_wait(args: WaitArgs, session: &Session, formatter: &Formatter) -> ExitCode {
    let options = match args.timeout {
        Some(secs) => session.defaults.wait_options(secs),
        None => session.defaults.download_wait(),
    };

    let spinner = ProgressBar::spinner(
        formatter.config(),
        &format!("Waiting for {} task(s)", args.ids.len()),
    );
    let result = tasks::wait_for_tasks(session.client(), &args.ids, &options).await;
    spinner.finish_and_clear();

    let completed = match result {
        Ok(c) => c,
        Err(e) => return super::fail(formatter, "Wait failed", &e),
    };
    let statuses = match statuses(session, &args.ids).await {
        Ok(s) => s,
        Err(e) => return super::fail(formatter, "Failed to get task status", &e),
    };

    if formatter.is_json() {
        formatter.json(&WaitOutput {
            completed,
            tasks: statuses.clone(),
        });
    } else {
        print_statuses(formatter, &statuses);
    }

    if completed {
        ExitCode::Success
    } else if statuses.iter().all(|s| s.state.is_terminal()) {
        ExitCode::TaskFailed
    } else {
        ExitCode::Timeout
    }
}

async fn execute_cancel(args: CancelArgs, session: &Session, formatter: &Formatter) -> ExitCode {
    let mut cancelled = Vec::with_capacity(args.ids.len());
    for id in &args.ids {
        if let Err(e) = session.client().cancel_task(id).await {
            return super::fail(formatter, &format!("Failed to cancel {id}"), &e);
        }
        formatter.success(&format!("Cancelled {id}"));
        cancelled.push(id.clone());
    }
    if formatter.is_json() {
        formatter.json(&CancelOutput {
            status: "success",
            cancelled,
        });
    }
    ExitCode::Success
}

#[cfg(test)]
mod tests {
    use super::*;
    use eeu_core::TaskState;

    #[test]
    fn test_status_rows() {
        let mut running = TaskStatus::new("ABC", TaskState::Running);
        running.progress = Some(0.42);
        running.description = Some("Ingest image: users/a/img".into());
        let mut failed = TaskStatus::new("DEF", TaskState::Failed);
        failed.error_message = Some("Invalid GeoTIFF".into());

        let rows = status_rows(&[running, failed]);
        assert_eq!(
            rows[0],
            vec!["ABC", "RUNNING", "42%", "Ingest image: users/a/img"]
        );
        assert_eq!(rows[1], vec!["DEF", "FAILED", "-", "Invalid GeoTIFF"]);
    }
}
