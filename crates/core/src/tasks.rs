//! Task polling
//!
//! Ingestion and export tasks run asynchronously on the platform. These
//! helpers poll their status until every task is terminal or a timeout
//! elapses.

use std::time::Duration;

use tokio::time::Instant;

use crate::asset::{TaskState, TaskStatus};
use crate::error::{Error, Result};
use crate::traits::TaskRunner;

/// How to wait for tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOptions {
    /// Give up after this long
    pub timeout: Duration,
    /// Delay between polls
    pub poll_interval: Duration,
    /// Turn failed tasks and timeouts into errors
    pub strict: bool,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3600),
            poll_interval: Duration::from_secs(5),
            strict: true,
        }
    }
}

impl WaitOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Result of a single status check
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Pending(TaskStatus),
    Succeeded(TaskStatus),
    Failed(TaskStatus),
}

/// Check one task
///
/// A failed or cancelled task is an error in strict mode; otherwise it is
/// logged and reported as `TaskOutcome::Failed`.
pub async fn check_task<R>(runner: &R, task_id: &str, strict: bool) -> Result<TaskOutcome>
where
    R: TaskRunner + ?Sized,
{
    let status = runner.task_status(task_id).await?;

    if status.state.is_failure() {
        if let Some(message) = &status.error_message {
            tracing::error!("{message}");
        }
        if strict {
            return Err(Error::TaskFailed {
                task: status.id,
                state: status.state,
                message: status.error_message,
            });
        }
        tracing::error!("Task {} ended with state {}", status.id, status.state);
        return Ok(TaskOutcome::Failed(status));
    }

    if status.state == TaskState::Succeeded {
        Ok(TaskOutcome::Succeeded(status))
    } else {
        Ok(TaskOutcome::Pending(status))
    }
}

/// Wait for a single task; see [`wait_for_tasks`]
pub async fn wait_for_task<R>(runner: &R, task_id: &str, options: &WaitOptions) -> Result<bool>
where
    R: TaskRunner + ?Sized,
{
    wait_for_tasks(runner, &[task_id.to_string()], options).await
}

/// Wait until every task is terminal
///
/// Returns `true` when all tasks succeeded. In non-strict mode failed tasks
/// and a timeout yield `false` instead of an error.
pub async fn wait_for_tasks<R>(runner: &R, task_ids: &[String], options: &WaitOptions) -> Result<bool>
where
    R: TaskRunner + ?Sized,
{
    let start = Instant::now();
    let mut pending: Vec<&str> = task_ids.iter().map(String::as_str).collect();
    let mut all_succeeded = true;

    loop {
        let mut still_pending = Vec::new();
        for id in &pending {
            match check_task(runner, id, options.strict).await? {
                TaskOutcome::Pending(status) => {
                    tracing::debug!("Task {id} is {}", status.state);
                    still_pending.push(*id);
                }
                TaskOutcome::Succeeded(_) => tracing::debug!("Task {id} completed"),
                TaskOutcome::Failed(_) => all_succeeded = false,
            }
        }
        pending = still_pending;

        if pending.is_empty() {
            return Ok(all_succeeded);
        }

        let elapsed = start.elapsed();
        if elapsed >= options.timeout {
            break;
        }
        let remaining = options.timeout - elapsed;
        tokio::time::sleep(options.poll_interval.min(remaining)).await;
    }

    tracing::error!(
        "Tasks timed out after {} seconds",
        options.timeout.as_secs()
    );
    if options.strict {
        return Err(Error::Timeout(format!(
            "tasks {} did not finish within {} seconds",
            pending.join(", "),
            options.timeout.as_secs()
        )));
    }
    Ok(false)
}
