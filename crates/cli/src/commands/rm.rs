//! rm command - Remove assets
//!
//! Removes one or more assets. Containers must be empty unless
//! `--recursive` is given.

use clap::Args;
use serde::Serialize;

use super::GlobalOptions;
use super::session::Session;
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Remove assets
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Asset path(s) to remove
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Remove containers with everything below them
    #[arg(short, long)]
    pub recursive: bool,

    /// Continue with the remaining paths after a failure
    #[arg(long)]
    pub continue_on_error: bool,
}

#[derive(Debug, Serialize)]
struct RmOutput {
    status: &'static str,
    deleted: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failed: Vec<String>,
    total: usize,
}

/// Execute the rm command
pub async fn execute(args: RmArgs, globals: GlobalOptions) -> ExitCode {
    let formatter = Formatter::new(globals.output);
    let session = match Session::open(globals.profile.as_deref()) {
        Ok(s) => s,
        Err(e) => return super::fail(&formatter, "Failed to open session", &e),
    };
    let assets = session.assets();

    let mut deleted = Vec::new();
    let mut failed = Vec::new();
    let mut exit_code = ExitCode::Success;

    for path in &args.paths {
        match assets.remove(path, args.recursive).await {
            Ok(ids) => {
                for id in &ids {
                    formatter.success(&format!("Removed {id}"));
                }
                deleted.extend(ids);
            }
            Err(e) => {
                exit_code = super::fail(&formatter, &format!("Failed to remove {path}"), &e);
                failed.push(path.clone());
                if !args.continue_on_error {
                    break;
                }
            }
        }
    }

    if formatter.is_json() {
        formatter.json(&RmOutput {
            status: if failed.is_empty() { "success" } else { "partial" },
            total: deleted.len(),
            deleted,
            failed,
        });
    }
    exit_code
}
