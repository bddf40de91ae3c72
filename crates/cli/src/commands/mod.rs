//! CLI command definitions and execution
//!
//! This module contains all CLI commands and their implementations.
//! Each command builds a [`Formatter`] from the global flags, opens a
//! [`session::Session`] when it needs the platform, and maps errors onto
//! exit codes.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod acl;
pub mod completions;
mod cp;
mod download;
mod home;
mod info;
mod ingest;
mod ls;
mod mkdir;
mod mv;
mod profile;
mod props;
mod rm;
mod session;
mod stage;
mod task;
mod upload;

/// eeu - Earth Engine asset management
///
/// Manage Earth Engine assets and move imagery in and out of the platform
/// through a Cloud Storage staging bucket.
#[derive(Parser, Debug)]
#[command(name = "eeu")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress spinners
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    /// Profile to use instead of the configured default
    #[arg(long, global = true, env = "EEU_PROFILE")]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage connection profiles
    #[command(subcommand)]
    Profile(profile::ProfileCommands),

    /// Show the asset root relative paths resolve against
    Home(home::HomeArgs),

    /// Show storage quota of the asset root
    Quota(home::QuotaArgs),

    /// Show asset metadata
    Info(info::InfoArgs),

    /// Check whether an asset exists
    Exists(info::ExistsArgs),

    /// List the children of a folder or image collection
    Ls(ls::LsArgs),

    /// Read or change access control lists
    #[command(subcommand)]
    Acl(acl::AclCommands),

    /// Read or set asset properties
    Props(props::PropsArgs),

    /// Create a folder or image collection
    Mkdir(mkdir::MkdirArgs),

    /// Copy assets
    Cp(cp::CpArgs),

    /// Move assets (copy + delete source)
    Mv(mv::MvArgs),

    /// Remove assets
    Rm(rm::RmArgs),

    /// Upload local files to the staging bucket
    Stage(stage::StageArgs),

    /// Ingest a staged file as an image asset
    Ingest(ingest::IngestArgs),

    /// Stage and ingest local files as image assets
    Upload(upload::UploadArgs),

    /// Export image assets and download them
    Download(download::DownloadArgs),

    /// Inspect, wait for or cancel tasks
    #[command(subcommand)]
    Task(task::TaskCommands),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Flags shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub output: OutputConfig,
    pub profile: Option<String>,
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let globals = GlobalOptions {
        output: OutputConfig {
            json: cli.json,
            no_color: cli.no_color,
            no_progress: cli.no_progress,
            quiet: cli.quiet,
        },
        profile: cli.profile,
    };

    match cli.command {
        Commands::Profile(cmd) => profile::execute(cmd, globals).await,
        Commands::Home(args) => home::execute_home(args, globals).await,
        Commands::Quota(args) => home::execute_quota(args, globals).await,
        Commands::Info(args) => info::execute_info(args, globals).await,
        Commands::Exists(args) => info::execute_exists(args, globals).await,
        Commands::Ls(args) => ls::execute(args, globals).await,
        Commands::Acl(cmd) => acl::execute(cmd, globals).await,
        Commands::Props(args) => props::execute(args, globals).await,
        Commands::Mkdir(args) => mkdir::execute(args, globals).await,
        Commands::Cp(args) => cp::execute(args, globals).await,
        Commands::Mv(args) => mv::execute(args, globals).await,
        Commands::Rm(args) => rm::execute(args, globals).await,
        Commands::Stage(args) => stage::execute(args, globals).await,
        Commands::Ingest(args) => ingest::execute(args, globals).await,
        Commands::Upload(args) => upload::execute(args, globals).await,
        Commands::Download(args) => download::execute(args, globals).await,
        Commands::Task(cmd) => task::execute(cmd, globals).await,
        Commands::Completions(args) => completions::execute(args),
    }
}

/// Print an error and pick the matching exit code
pub(crate) fn fail(formatter: &Formatter, context: &str, err: &eeu_core::Error) -> ExitCode {
    formatter.error(&format!("{context}: {err}"));
    ExitCode::from(err)
}

/// Parse `key=value` pairs into a property map
///
/// Values that parse as JSON keep their type; anything else is a string.
pub(crate) fn parse_properties(pairs: &[String]) -> Result<eeu_core::Properties, String> {
    let mut properties = eeu_core::Properties::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("Expected key=value, got '{pair}'"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("Empty property name in '{pair}'"));
        }
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        properties.insert(key.to_string(), value);
    }
    Ok(properties)
}

/// Expand glob patterns into a list of files
///
/// A pattern that matches nothing is an error rather than silently skipped.
pub(crate) fn expand_files(patterns: &[String]) -> Result<Vec<PathBuf>, String> {
    let mut files = Vec::new();
    for pattern in patterns {
        let matches = glob::glob(pattern).map_err(|e| format!("Invalid pattern '{pattern}': {e}"))?;
        let before = files.len();
        for entry in matches {
            let path = entry.map_err(|e| e.to_string())?;
            if path.is_file() {
                files.push(path);
            }
        }
        if files.len() == before {
            return Err(format!("No files match '{pattern}'"));
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["eeu", "ls", "folder", "--json", "--profile", "work"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.profile.as_deref(), Some("work"));
    }

    #[test]
    fn test_parse_properties() {
        let props = parse_properties(&[
            "cloud=12.5".to_string(),
            "sensor=landsat".to_string(),
            "tags=[\"a\",\"b\"]".to_string(),
        ])
        .unwrap();
        assert_eq!(props["cloud"], serde_json::json!(12.5));
        assert_eq!(props["sensor"], serde_json::json!("landsat"));
        assert_eq!(props["tags"], serde_json::json!(["a", "b"]));

        assert!(parse_properties(&["novalue".to_string()]).is_err());
        assert!(parse_properties(&["=1".to_string()]).is_err());
    }

    #[test]
    fn test_expand_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.tif"), b"a").unwrap();
        std::fs::write(dir.path().join("b.tif"), b"b").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"c").unwrap();
        std::fs::create_dir(dir.path().join("sub.tif")).unwrap();

        let pattern = dir.path().join("*.tif").to_string_lossy().to_string();
        let mut files = expand_files(&[pattern]).unwrap();
        files.sort();
        assert_eq!(files, vec![dir.path().join("a.tif"), dir.path().join("b.tif")]);

        let missing = dir.path().join("*.jp2").to_string_lossy().to_string();
        assert!(expand_files(&[missing]).is_err());
    }
}
