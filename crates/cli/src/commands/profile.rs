//! Profile management commands
//!
//! Profiles are named sets of credentials and defaults for one Earth Engine
//! project and its staging bucket.

use clap::Subcommand;
use serde::Serialize;

use super::GlobalOptions;
use crate::exit_code::ExitCode;
use crate::output::Formatter;
use eeu_core::{Profile, ProfileManager};

/// Profile subcommands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Add or update a profile
    Set(SetArgs),

    /// List all configured profiles
    List(ListArgs),

    /// Show a profile with environment overrides applied
    Show(ShowArgs),

    /// Remove a profile
    Remove(RemoveArgs),
}

/// Arguments for the `profile set` command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Profile name (e.g., "work", "research")
    pub name: String,

    /// Cloud project; the legacy project when unset
    #[arg(long)]
    pub project: Option<String>,

    /// Service account email
    #[arg(long)]
    pub service_account: Option<String>,

    /// Path to a service account key or authorized-user credentials file
    #[arg(long)]
    pub credentials: Option<String>,

    /// Staging bucket
    #[arg(long)]
    pub bucket: Option<String>,

    /// Asset root relative paths resolve against
    #[arg(long)]
    pub root: Option<String>,

    /// HMAC access key for the staging bucket
    #[arg(long)]
    pub hmac_access_key: Option<String>,

    /// HMAC secret for the staging bucket
    #[arg(long)]
    pub hmac_secret: Option<String>,

    /// Earth Engine API endpoint
    #[arg(long)]
    pub ee_endpoint: Option<String>,

    /// Cloud Storage endpoint
    #[arg(long)]
    pub storage_endpoint: Option<String>,

    /// Make this the default profile
    #[arg(long, default_value = "false")]
    pub default: bool,
}

/// Arguments for the `profile list` command
#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Show full details
    #[arg(short, long)]
    pub long: bool,
}

/// Arguments for the `profile show` command
#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Profile name; the active profile when omitted
    pub name: Option<String>,
}

/// Arguments for the `profile remove` command
#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Name of the profile to remove
    pub name: String,
}

/// JSON output for profile list
#[derive(Serialize)]
struct ProfileListOutput {
    profiles: Vec<ProfileInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<String>,
}

/// Profile information for output (without secrets)
#[derive(Serialize)]
struct ProfileInfo {
    name: String,
    project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    service_account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    credentials: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    root: Option<String>,
    hmac_configured: bool,
    ee_endpoint: String,
    storage_endpoint: String,
}

impl From<&Profile> for ProfileInfo {
    fn from(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            project: profile.project().to_string(),
            service_account: profile.service_account.clone(),
            credentials: profile.credential_path.clone().or_else(|| {
                profile
                    .credential_json
                    .as_ref()
                    .map(|_| "<inline JSON>".to_string())
            }),
            bucket: profile.bucket.clone(),
            root: profile.root.clone(),
            hmac_configured: profile.hmac_access_key.is_some() && profile.hmac_secret.is_some(),
            ee_endpoint: profile.ee_endpoint.clone(),
            storage_endpoint: profile.storage_endpoint.clone(),
        }
    }
}

/// JSON output for profile set/remove operations
#[derive(Serialize)]
struct ProfileOperationOutput {
    success: bool,
    profile: String,
    message: String,
}

/// Execute a profile subcommand
pub async fn execute(cmd: ProfileCommands, globals: GlobalOptions) -> ExitCode {
    let formatter = Formatter::new(globals.output.clone());
    let manager = match ProfileManager::new() {
        Ok(pm) => pm,
        Err(e) => return super::fail(&formatter, "Failed to load profiles", &e),
    };

    match cmd {
        ProfileCommands::Set(args) => execute_set(args, &manager, &formatter),
        ProfileCommands::List(args) => execute_list(args, &manager, &formatter),
        ProfileCommands::Show(args) => execute_show(args, &manager, &globals, &formatter),
        ProfileCommands::Remove(args) => execute_remove(args, &manager, &formatter),
    }
}

/// Start from the stored profile, if any, and apply the given flags
fn merge_profile(args: SetArgs, existing: Option<Profile>) -> Profile {
    let mut profile = existing.unwrap_or_else(|| Profile::new(&args.name));
    if args.project.is_some() {
        profile.project = args.project;
    }
    if args.service_account.is_some() {
        profile.service_account = args.service_account;
    }
    if args.credentials.is_some() {
        profile.credential_path = args.credentials;
    }
    if args.bucket.is_some() {
        profile.bucket = args.bucket;
    }
    if args.root.is_some() {
        profile.root = args.root;
    }
    if args.hmac_access_key.is_some() {
        profile.hmac_access_key = args.hmac_access_key;
    }
    if args.hmac_secret.is_some() {
        profile.hmac_secret = args.hmac_secret;
    }
    if let Some(endpoint) = args.ee_endpoint {
        profile.ee_endpoint = endpoint;
    }
    if let Some(endpoint) = args.storage_endpoint {
        profile.storage_endpoint = endpoint;
    }
    profile
}

fn execute_set(args: SetArgs, manager: &ProfileManager, formatter: &Formatter) -> ExitCode {
    if args.name.is_empty() {
        formatter.error("Profile name cannot be empty");
        return ExitCode::UsageError;
    }

    let name = args.name.clone();
    let make_default = args.default;
    let existing = match manager.get(&name) {
        Ok(p) => Some(p),
        Err(eeu_core::Error::ProfileNotFound(_)) => None,
        Err(e) => return super::fail(formatter, "Failed to load profiles", &e),
    };
    let profile = merge_profile(args, existing);

    if let Err(e) = manager.set(profile) {
        return super::fail(formatter, "Failed to save profile", &e);
    }
    if make_default && let Err(e) = manager.set_default(&name) {
        return super::fail(formatter, "Failed to set default profile", &e);
    }

    if formatter.is_json() {
        formatter.json(&ProfileOperationOutput {
            success: true,
            profile: name.clone(),
            message: format!("Profile '{name}' configured successfully"),
        });
    } else {
        formatter.success(&format!("Profile '{name}' configured successfully."));
    }
    ExitCode::Success
}

fn execute_list(args: ListArgs, manager: &ProfileManager, formatter: &Formatter) -> ExitCode {
    let config = match manager.config() {
        Ok(c) => c,
        Err(e) => return super::fail(formatter, "Failed to load profiles", &e),
    };
    let default = config.defaults.default_profile.clone();

    if formatter.is_json() {
        formatter.json(&ProfileListOutput {
            profiles: config.profiles.iter().map(ProfileInfo::from).collect(),
            default,
        });
    } else if config.profiles.is_empty() {
        formatter.println("No profiles configured.");
    } else {
        for profile in &config.profiles {
            let marker = if default.as_deref() == Some(profile.name.as_str()) {
                "*"
            } else {
                " "
            };
            if args.long {
                formatter.println(&format!(
                    "{marker} {:<12} {} (bucket: {}, root: {})",
                    profile.name,
                    profile.project(),
                    profile.bucket.as_deref().unwrap_or("-"),
                    profile.root.as_deref().unwrap_or("-"),
                ));
            } else {
                formatter.println(&format!("{marker} {:<12} {}", profile.name, profile.project()));
            }
        }
    }
    ExitCode::Success
}

fn execute_show(
    args: ShowArgs,
    manager: &ProfileManager,
    globals: &GlobalOptions,
    formatter: &Formatter,
) -> ExitCode {
    let name = args.name.as_deref().or(globals.profile.as_deref());
    let profile = match manager.resolve(name, |key| std::env::var(key).ok()) {
        Ok(p) => p,
        Err(e) => return super::fail(formatter, "Failed to resolve profile", &e),
    };
    let info = ProfileInfo::from(&profile);

    if formatter.is_json() {
        formatter.json(&info);
    } else {
        let opt = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
        formatter.println(&format!("Name:             {}", info.name));
        formatter.println(&format!("Project:          {}", info.project));
        formatter.println(&format!("Service account:  {}", opt(&info.service_account)));
        formatter.println(&format!("Credentials:      {}", opt(&info.credentials)));
        formatter.println(&format!("Bucket:           {}", opt(&info.bucket)));
        formatter.println(&format!("Root:             {}", opt(&info.root)));
        formatter.println(&format!("HMAC keys:        {}", info.hmac_configured));
        formatter.println(&format!("EE endpoint:      {}", info.ee_endpoint));
        formatter.println(&format!("Storage endpoint: {}", info.storage_endpoint));
    }
    ExitCode::Success
}

fn execute_remove(args: RemoveArgs, manager: &ProfileManager, formatter: &Formatter) -> ExitCode {
    match manager.remove(&args.name) {
        Ok(()) => {
            if formatter.is_json() {
                formatter.json(&ProfileOperationOutput {
                    success: true,
                    profile: args.name.clone(),
                    message: format!("Profile '{}' removed successfully", args.name),
                });
            } else {
                formatter.success(&format!("Profile '{}' removed successfully.", args.name));
            }
            ExitCode::Success
        }
        Err(eeu_core::Error::ProfileNotFound(_)) => {
            formatter.error(&format!("Profile '{}' not found", args.name));
            ExitCode::NotFound
        }
        Err(e) => super::fail(formatter, "Failed to remove profile", &e),
    }
}
