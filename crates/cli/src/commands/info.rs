//! info and exists commands - Asset metadata

use clap::Args;
use serde::Serialize;

use super::GlobalOptions;
use super::session::Session;
use crate::exit_code::ExitCode;
use crate::output::Formatter;
use eeu_core::AssetInfo;

/// Show asset metadata
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Asset path, absolute or relative to the asset root
    pub path: String,
}

/// Check whether an asset exists
#[derive(Args, Debug)]
pub struct ExistsArgs {
    /// Asset path, absolute or relative to the asset root
    pub path: String,
}

#[derive(Debug, Serialize)]
struct ExistsOutput {
    path: String,
    exists: bool,
}

/// Execute the info command
pub async fn execute_info(args: InfoArgs, globals: GlobalOptions) -> ExitCode {
    let formatter = Formatter::new(globals.output);
    let session = match Session::open(globals.profile.as_deref()) {
        Ok(s) => s,
        Err(e) => return super::fail(&formatter, "Failed to open session", &e),
    };

    match session.assets().info(&args.path).await {
        Ok(info) => {
            if formatter.is_json() {
                formatter.json(&info);
            } else {
                for line in info_lines(&info) {
                    formatter.println(&line);
                }
            }
            ExitCode::Success
        }
        Err(e) => super::fail(&formatter, &format!("Failed to get {}", args.path), &e),
    }
}

/// Execute the exists command
///
/// Exits with NotFound when the asset is missing so scripts can branch on it.
pub async fn execute_exists(args: ExistsArgs, globals: GlobalOptions) -> ExitCode {
    let formatter = Formatter::new(globals.output);
    let session = match Session::open(globals.profile.as_deref()) {
        Ok(s) => s,
        Err(e) => return super::fail(&formatter, "Failed to open session", &e),
    };

    match session.assets().exists(&args.path).await {
        Ok(exists) => {
            if formatter.is_json() {
                formatter.json(&ExistsOutput {
                    path: args.path,
                    exists,
                });
            } else {
                formatter.println(if exists { "true" } else { "false" });
            }
            if exists {
                ExitCode::Success
            } else {
                ExitCode::NotFound
            }
        }
        Err(e) => super::fail(&formatter, &format!("Failed to check {}", args.path), &e),
    }
}

fn info_lines(info: &AssetInfo) -> Vec<String> {
    let mut lines = vec![
        format!("Id:         {}", info.id),
        format!("Type:       {}", info.asset_type),
    ];
    if let Some(t) = info.update_time {
        lines.push(format!("Updated:    {}", t.strftime("%Y-%m-%d %H:%M:%S")));
    }
    if let Some(t) = info.start_time {
        lines.push(format!("Start time: {}", t.strftime("%Y-%m-%d %H:%M:%S")));
    }
    if let Some(t) = info.end_time {
        lines.push(format!("End time:   {}", t.strftime("%Y-%m-%d %H:%M:%S")));
    }
    if let Some(size) = &info.size_human {
        lines.push(format!("Size:       {size}"));
    }
    if !info.properties.is_empty() {
        lines.push("Properties:".to_string());
        for (key, value) in &info.properties {
            lines.push(format!("  {key}: {value}"));
        }
    }
    lines
}
