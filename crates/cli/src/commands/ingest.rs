//! ingest command - Ingest a staged file as an image asset

use clap::Args;
use serde::Serialize;

use super::GlobalOptions;
use super::session::Session;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, ProgressBar};
use eeu_core::{GsUri, IngestOptions, Transfer, parse_date};

/// Ingest a staged file
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Staged object (gs://bucket/object)
    pub uri: String,

    /// Destination asset path
    pub asset: String,

    /// Acquisition date (YYYY-MM-DD, RFC 3339, or epoch milliseconds)
    #[arg(long)]
    pub date: Option<String>,

    /// Band name, in file order (repeatable)
    #[arg(short, long = "band")]
    pub bands: Vec<String>,

    /// Property as key=value (repeatable)
    #[arg(long = "property", value_name = "KEY=VALUE")]
    pub properties: Vec<String>,

    /// Replace an existing asset
    #[arg(long)]
    pub overwrite: bool,

    /// Return as soon as the task is started
    #[arg(long)]
    pub no_wait: bool,

    /// Seconds to wait for the task
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Debug, Serialize)]
struct IngestOutput {
    asset: String,
    task: String,
    waited: bool,
}

/// Parse the ingestion flags shared with `upload`
pub(crate) fn ingest_options(
    date: Option<&str>,
    bands: Vec<String>,
    properties: &[String],
    overwrite: bool,
) -> Result<IngestOptions, String> {
    let date = date
        .map(parse_date)
        .transpose()
        .map_err(|e| e.to_string())?;
    Ok(IngestOptions {
        date,
        bands,
        properties: super::parse_properties(properties)?,
        overwrite,
    })
}

/// Execute the ingest command
pub async fn execute(args: IngestArgs, globals: GlobalOptions) -> ExitCode {
    let formatter = Formatter::new(globals.output.clone());

    let uri = match GsUri::parse(&args.uri) {
        Ok(u) => u,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::UsageError;
        }
    };
    let options = match ingest_options(
        args.date.as_deref(),
        args.bands,
        &args.properties,
        args.overwrite,
    ) {
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

    let wait = (!args.no_wait).then(|| match args.timeout {
        Some(secs) => session.defaults.wait_options(secs),
        None => session.defaults.upload_wait(),
    });

    let spinner = ProgressBar::spinner(formatter.config(), &format!("Ingesting {}", args.asset));
    let result = transfer
        .ingest(&uri, &args.asset, &options, wait.as_ref())
        .await;
    spinner.finish_and_clear();

    match result {
        Ok(task) => {
            if formatter.is_json() {
                formatter.json(&IngestOutput {
                    asset: args.asset,
                    task,
                    waited: wait.is_some(),
                });
            } else if wait.is_some() {
                formatter.success(&format!("Ingested {} ({task})", args.asset));
            } else {
                formatter.println(&task);
            }
            ExitCode::Success
        }
        Err(e) => super::fail(&formatter, &format!("Failed to ingest {}", args.uri), &e),
    }
}
