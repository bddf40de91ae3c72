//! upload command - Stage local files and ingest them as image assets

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use super::GlobalOptions;
use super::session::Session;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, ProgressBar};
use eeu_core::{Transfer, UploadOptions, parse_date, path};

/// Upload files as image assets
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Files or glob patterns
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Folder or image collection; each asset is named after its file
    #[arg(long, conflicts_with = "assets")]
    pub to: Option<String>,

    /// Destination asset per file, in order (repeatable)
    #[arg(long = "asset")]
    pub assets: Vec<String>,

    /// Acquisition date per file, in order (repeatable)
    #[arg(long = "date")]
    pub dates: Vec<String>,

    /// Band name, in file order (repeatable)
    #[arg(short, long = "band")]
    pub bands: Vec<String>,

    /// Property applied to every asset as key=value (repeatable)
    #[arg(long = "property", value_name = "KEY=VALUE")]
    pub properties: Vec<String>,

    /// Object prefix in the staging bucket
    #[arg(long, default_value = "")]
    pub prefix: String,

    /// Replace existing assets
    #[arg(long)]
    pub overwrite: bool,

    /// Make the new assets world-readable
    #[arg(long)]
    pub public: bool,

    /// Keep staged files in the bucket
    #[arg(long)]
    pub keep: bool,

    /// Seconds to wait for the ingestion tasks
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Debug, Serialize)]
struct UploadOutput {
    status: &'static str,
    items: Vec<UploadItem>,
}

#[derive(Debug, Serialize)]
struct UploadItem {
    file: String,
    asset: String,
    task: String,
    completed: bool,
}

/// Destination asset for each file
fn destinations(files: &[PathBuf], to: Option<&str>, assets: &[String]) -> Vec<String> {
    match to {
        Some(folder) => files
            .iter()
            .map(|file| {
                let stem = file
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                path::join(folder, &stem)
            })
            .collect(),
        None => assets.to_vec(),
    }
}

/// Execute the upload command
pub async fn execute(args: UploadArgs, globals: GlobalOptions) -> ExitCode {
    let formatter = Formatter::new(globals.output.clone());

    let files = match super::expand_files(&args.files) {
        Ok(f) => f,
        Err(e) => {
            formatter.error(&e);
            return ExitCode::UsageError;
        }
    };
    if args.to.is_none() && args.assets.is_empty() {
        formatter.error("Give a destination with --to or one --asset per file");
        return ExitCode::UsageError;
    }
    let targets = destinations(&files, args.to.as_deref(), &args.assets);
    let dates = match args.dates.iter().map(|d| parse_date(d)).collect::<Result<Vec<_>, _>>() {
        Ok(d) => d,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::UsageError;
        }
    };
    let ingest = match super::ingest::ingest_options(None, args.bands, &args.properties, args.overwrite) {
        Ok(o) => o,
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
    let staging = match session.staging(&assets).await {
        Ok(s) => s,
        Err(e) => return super::fail(&formatter, "Failed to open staging bucket", &e),
    };
    let transfer = Transfer::new(&assets, &staging);

    if let Err(e) = transfer.ensure_bucket().await {
        return super::fail(&formatter, "Failed to create staging bucket", &e);
    }

    let options = UploadOptions {
        gs_prefix: args.prefix,
        ingest,
        public: args.public,
        clean: !args.keep,
        wait: match args.timeout {
            Some(secs) => session.defaults.wait_options(secs),
            None => session.defaults.upload_wait(),
        },
    };

    let spinner = ProgressBar::spinner(
        formatter.config(),
        &format!("Uploading {} file(s)", files.len()),
    );
    let result = transfer
        .upload_many(&files, &targets, &dates, &options)
        .await;
    spinner.finish_and_clear();

    let reports = match result {
        Ok(r) => r,
        Err(e) => return super::fail(&formatter, "Upload failed", &e),
    };

    let all_completed = reports.iter().all(|r| r.completed);
    if formatter.is_json() {
        formatter.json(&UploadOutput {
            status: if all_completed { "success" } else { "partial" },
            items: files
                .iter()
                .zip(&reports)
                .map(|(file, report)| UploadItem {
                    file: file.display().to_string(),
                    asset: report.asset.clone(),
                    task: report.task.clone(),
                    completed: report.completed,
                })
                .collect(),
        });
    } else {
        for (file, report) in files.iter().zip(&reports) {
            if report.completed {
                formatter.success(&format!("{} -> {}", file.display(), report.asset));
            } else {
                formatter.warning(&format!(
                    "{} was not ingested (task {})",
                    file.display(),
                    report.task
                ));
            }
        }
    }

    if all_completed {
        ExitCode::Success
    } else {
        ExitCode::TaskFailed
    }
}
