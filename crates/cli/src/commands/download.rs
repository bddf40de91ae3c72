//! download command - Export image assets and fetch the GeoTIFFs

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use super::GlobalOptions;
use super::session::Session;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, ProgressBar};
use eeu_core::{DownloadOptions, Properties, TaskReport, Transfer};

/// Download image assets
#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Image asset paths
    #[arg(required = true)]
    pub assets: Vec<String>,

    /// Local file name (single asset only); `.tif` is appended
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Directory for downloaded files
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Object prefix in the staging bucket
    #[arg(long, default_value = "")]
    pub prefix: String,

    /// Output projection, e.g. EPSG:4326
    #[arg(long)]
    pub crs: Option<String>,

    /// Maximum number of pixels to export
    #[arg(long)]
    pub max_pixels: Option<u64>,

    /// Extra export parameter as key=value (repeatable)
    #[arg(long = "option", value_name = "KEY=VALUE")]
    pub options: Vec<String>,

    /// Keep exported files in the bucket
    #[arg(long)]
    pub keep: bool,

    /// Seconds to wait for the export tasks
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Debug, Serialize)]
struct DownloadOutput {
    status: &'static str,
    items: Vec<DownloadItem>,
}

#[derive(Debug, Serialize)]
struct DownloadItem {
    asset: String,
    task: String,
    completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<String>,
}

impl From<&TaskReport> for DownloadItem {
    fn from(report: &TaskReport) -> Self {
        Self {
            asset: report.asset.clone(),
            task: report.task.clone(),
            completed: report.completed,
            file: report.local.as_ref().map(|p| p.display().to_string()),
        }
    }
}

/// Export parameters from the dedicated flags and `--option` pairs
fn export_options(
    crs: Option<&str>,
    max_pixels: Option<u64>,
    pairs: &[String],
) -> Result<Properties, String> {
    let mut options = super::parse_properties(pairs)?;
    if let Some(crs) = crs {
        options.insert("grid".into(), serde_json::json!({ "crsCode": crs }));
    }
    if let Some(max) = max_pixels {
        options.insert("maxPixels".into(), serde_json::json!(max.to_string()));
    }
    Ok(options)
}

/// Execute the download command
pub async fn execute(args: DownloadArgs, globals: GlobalOptions) -> ExitCode {
    let formatter = Formatter::new(globals.output.clone());

    if args.output.is_some() && args.assets.len() > 1 {
        formatter.error("--output can only be used with a single asset");
        return ExitCode::UsageError;
    }
    let export = match export_options(args.crs.as_deref(), args.max_pixels, &args.options) {
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

    let options = DownloadOptions {
        gs_prefix: args.prefix,
        directory: args.dir,
        clean: !args.keep,
        export,
        wait: match args.timeout {
            Some(secs) => session.defaults.wait_options(secs),
            None => session.defaults.download_wait(),
        },
    };

    let spinner = ProgressBar::spinner(
        formatter.config(),
        &format!("Exporting {} asset(s)", args.assets.len()),
    );
    let result = match (&args.output, args.assets.as_slice()) {
        (Some(output), [asset]) => transfer
            .download(asset, Some(output.as_path()), &options)
            .await
            .map(|report| vec![report]),
        _ => transfer.download_many(&args.assets, &options).await,
    };
    spinner.finish_and_clear();

    let reports = match result {
        Ok(r) => r,
        Err(e) => return super::fail(&formatter, "Download failed", &e),
    };

    let all_completed = reports.iter().all(|r| r.completed);
    if formatter.is_json() {
        formatter.json(&DownloadOutput {
            status: if all_completed { "success" } else { "partial" },
            items: reports.iter().map(DownloadItem::from).collect(),
        });
    } else {
        for report in &reports {
            match &report.local {
                Some(file) => {
                    formatter.success(&format!("{} -> {}", report.asset, file.display()))
                }
                None => formatter.warning(&format!(
                    "{} was not exported (task {})",
                    report.asset, report.task
                )),
            }
        }
    }

    if all_completed {
        ExitCode::Success
    } else {
        ExitCode::TaskFailed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_options() {
        let options = export_options(
            Some("EPSG:4326"),
            Some(1_000_000),
            &["description=\"scene\"".to_string()],
        )
        .unwrap();
        assert_eq!(options["grid"], serde_json::json!({"crsCode": "EPSG:4326"}));
        assert_eq!(options["maxPixels"], serde_json::json!("1000000"));
        assert_eq!(options["description"], serde_json::json!("scene"));
    }

    #[test]
    fn test_download_item_from_report() {
        let report = TaskReport {
            asset: "users/a/img".into(),
            task: "EXPORT_1".into(),
            completed: true,
            local: Some(PathBuf::from("out/img.tif")),
        };
        let item = DownloadItem::from(&report);
        assert_eq!(item.file.as_deref(), Some("out/img.tif"));
        assert!(item.completed);
    }
}
