//! mv command - Move assets
//!
//! Moves assets between locations (copy + delete).

use clap::Args;
use serde::Serialize;

use super::GlobalOptions;
use super::session::Session;
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Move assets
#[derive(Args, Debug)]
pub struct MvArgs {
    /// Source asset path
    pub source: String,

    /// Destination asset path
    pub target: String,

    /// Move containers and everything below them
    #[arg(short, long)]
    pub recursive: bool,

    /// Replace existing destination assets
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Debug, Serialize)]
struct MvOutput {
    status: &'static str,
    source: String,
    target: String,
    created: Vec<String>,
}

/// Execute the mv command
pub async fn execute(args: MvArgs, globals: GlobalOptions) -> ExitCode {
    let formatter = Formatter::new(globals.output);
    let session = match Session::open(globals.profile.as_deref()) {
        Ok(s) => s,
        Err(e) => return super::fail(&formatter, "Failed to open session", &e),
    };

    match session
        .assets()
        .move_asset(&args.source, &args.target, args.overwrite, args.recursive)
        .await
    {
        Ok(created) => {
            if formatter.is_json() {
                formatter.json(&MvOutput {
                    status: "success",
                    source: args.source,
                    target: args.target,
                    created,
                });
            } else {
                formatter.success(&format!("{} -> {}", args.source, args.target));
            }
            ExitCode::Success
        }
        Err(e) => super::fail(
            &formatter,
            &format!("Failed to move {} to {}", args.source, args.target),
            &e,
        ),
    }
}
