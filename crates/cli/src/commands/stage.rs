//! stage command - Upload local files to the staging bucket

use clap::Args;
use serde::Serialize;

use super::GlobalOptions;
use super::session::Session;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, ProgressBar};
use eeu_core::Transfer;

/// Upload files to the staging bucket
#[derive(Args, Debug)]
pub struct StageArgs {
    /// Files or glob patterns
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Object prefix in the bucket
    #[arg(long, default_value = "")]
    pub prefix: String,
}

#[derive(Debug, Serialize)]
struct StageOutput {
    status: &'static str,
    uris: Vec<String>,
}

/// Execute the stage command
pub async fn execute(args: StageArgs, globals: GlobalOptions) -> ExitCode {
    let formatter = Formatter::new(globals.output.clone());

    let files = match super::expand_files(&args.files) {
        Ok(f) => f,
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

    let progress = ProgressBar::new(formatter.config(), files.len() as u64);
    let mut uris = Vec::with_capacity(files.len());
    for file in &files {
        progress.set_message(&file.display().to_string());
        match transfer.stage(std::slice::from_ref(file), &args.prefix).await {
            Ok(staged) => uris.extend(staged.into_iter().map(|uri| uri.to_string())),
            Err(e) => {
                progress.finish_and_clear();
                return super::fail(&formatter, &format!("Failed to stage {}", file.display()), &e);
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    if formatter.is_json() {
        formatter.json(&StageOutput {
            status: "success",
            uris,
        });
    } else {
        for uri in &uris {
            formatter.println(uri);
        }
    }
    ExitCode::Success
}
