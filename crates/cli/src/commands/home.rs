//! home and quota commands - Show the asset root and its usage

use clap::Args;
use serde::Serialize;

use super::GlobalOptions;
use super::session::Session;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, format_size};
use eeu_core::Quota;

/// Show the asset root
#[derive(Args, Debug)]
pub struct HomeArgs {}

/// Show storage quota
#[derive(Args, Debug)]
pub struct QuotaArgs {}

#[derive(Debug, Serialize)]
struct HomeOutput {
    project: String,
    home: String,
}

/// Execute the home command
pub async fn execute_home(_args: HomeArgs, globals: GlobalOptions) -> ExitCode {
    let formatter = Formatter::new(globals.output);
    let session = match Session::open(globals.profile.as_deref()) {
        Ok(s) => s,
        Err(e) => return super::fail(&formatter, "Failed to open session", &e),
    };
    let assets = session.assets();

    match assets.home().await {
        Ok(home) => {
            if formatter.is_json() {
                formatter.json(&HomeOutput {
                    project: assets.project().to_string(),
                    home: home.to_string(),
                });
            } else {
                formatter.println(home.as_str());
            }
            ExitCode::Success
        }
        Err(e) => super::fail(&formatter, "Failed to find asset root", &e),
    }
}

/// Execute the quota command
pub async fn execute_quota(_args: QuotaArgs, globals: GlobalOptions) -> ExitCode {
    let formatter = Formatter::new(globals.output);
    let session = match Session::open(globals.profile.as_deref()) {
        Ok(s) => s,
        Err(e) => return super::fail(&formatter, "Failed to open session", &e),
    };

    match session.assets().quota().await {
        Ok(quota) => {
            if formatter.is_json() {
                formatter.json(&quota);
            } else {
                for line in quota_lines(&quota) {
                    formatter.println(&line);
                }
            }
            ExitCode::Success
        }
        Err(e) => super::fail(&formatter, "Failed to read quota", &e),
    }
}

fn quota_lines(quota: &Quota) -> Vec<String> {
    let assets = match quota.max_assets {
        Some(max) => format!("Assets: {} of {max}", quota.asset_count),
        None => format!("Assets: {}", quota.asset_count),
    };
    let size = match (quota.max_size_bytes, quota.size_ratio()) {
        (Some(max), Some(ratio)) => format!(
            "Size:   {} of {} ({:.1}%)",
            format_size(quota.size_bytes),
            format_size(max),
            ratio * 100.0
        ),
        _ => format!("Size:   {}", format_size(quota.size_bytes)),
    };
    vec![assets, size]
}
