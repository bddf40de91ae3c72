//! props command - Read or set asset properties

use clap::Args;
use serde::Serialize;

use super::GlobalOptions;
use super::session::Session;
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Read or set properties
#[derive(Args, Debug)]
pub struct PropsArgs {
    /// Asset path
    pub path: String,

    /// Property to set as key=value; JSON values keep their type
    #[arg(short, long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}

#[derive(Debug, Serialize)]
struct PropsSetOutput {
    status: &'static str,
    asset: String,
    properties: eeu_core::Properties,
}

/// Execute the props command
pub async fn execute(args: PropsArgs, globals: GlobalOptions) -> ExitCode {
    let formatter = Formatter::new(globals.output);

    let updates = match super::parse_properties(&args.set) {
        Ok(p) => p,
        Err(e) => {
            formatter.error(&e);
            return ExitCode::UsageError;
        }
    };

    let session = match Session::open(globals.profile.as_deref()) {
        Ok(s) => s,
        Err(e) => return super::fail(&formatter, "Failed to open session", &e),
    };
    let assets = session.assets();

    if updates.is_empty() {
        return match assets.info(&args.path).await {
            Ok(info) => {
                if formatter.is_json() {
                    formatter.json(&info.properties);
                } else {
                    for (key, value) in &info.properties {
                        formatter.println(&format!("{key}: {value}"));
                    }
                }
                ExitCode::Success
            }
            Err(e) => super::fail(&formatter, &format!("Failed to get {}", args.path), &e),
        };
    }

    match assets.set_properties(&args.path, &updates).await {
        Ok(()) => {
            if formatter.is_json() {
                formatter.json(&PropsSetOutput {
                    status: "success",
                    asset: args.path,
                    properties: updates,
                });
            } else {
                formatter.success(&format!(
                    "Set {} properties on {}",
                    updates.len(),
                    args.path
                ));
            }
            ExitCode::Success
        }
        Err(e) => super::fail(
            &formatter,
            &format!("Failed to set properties on {}", args.path),
            &e,
        ),
    }
}
