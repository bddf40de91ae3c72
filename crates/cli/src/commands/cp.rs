//! cp command - Copy assets
//!
//! Copies a single asset, or a whole folder or image collection with
//! `--recursive`.

use clap::Args;
use serde::Serialize;

use super::GlobalOptions;
use super::session::Session;
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Copy assets
#[derive(Args, Debug)]
pub struct CpArgs {
    /// Source asset path
    pub source: String,

    /// Destination asset path
    pub target: String,

    /// Copy containers and everything below them
    #[arg(short, long)]
    pub recursive: bool,

    /// Replace existing destination assets
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Debug, Serialize)]
struct CpOutput {
    status: &'static str,
    source: String,
    target: String,
    created: Vec<String>,
}

/// Execute the cp command
pub async fn execute(args: CpArgs, globals: GlobalOptions) -> ExitCode {
    let formatter = Formatter::new(globals.output);
    let session = match Session::open(globals.profile.as_deref()) {
        Ok(s) => s,
        Err(e) => return super::fail(&formatter, "Failed to open session", &e),
    };

    match session
        .assets()
        .copy(&args.source, &args.target, args.overwrite, args.recursive)
        .await
    {
        Ok(created) => {
            if formatter.is_json() {
                formatter.json(&CpOutput {
                    status: "success",
                    source: args.source,
                    target: args.target,
                    created,
                });
            } else {
                for id in &created {
                    formatter.success(&format!("Created {id}"));
                }
            }
            ExitCode::Success
        }
        Err(e) => super::fail(
            &formatter,
            &format!("Failed to copy {} to {}", args.source, args.target),
            &e,
        ),
    }
}
