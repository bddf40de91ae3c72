//! acl command - Read or change access control lists

use clap::Subcommand;
use serde::Serialize;

use super::GlobalOptions;
use super::session::Session;
use crate::exit_code::ExitCode;
use crate::output::Formatter;
use eeu_core::{Acl, AclUpdate};

/// ACL subcommands
#[derive(Subcommand, Debug)]
pub enum AclCommands {
    /// Print the ACL of an asset
    Get(GetArgs),

    /// Update the ACL of an asset
    Set(SetArgs),
}

#[derive(clap::Args, Debug)]
pub struct GetArgs {
    /// Asset path
    pub path: String,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Asset path
    pub path: String,

    /// `public`, `private`, or a JSON object with writers, readers and
    /// all_users_can_read
    pub acl: String,

    /// Start from an empty ACL instead of the current one
    #[arg(long)]
    pub overwrite: bool,

    /// Apply to every descendant as well
    #[arg(short, long)]
    pub recursive: bool,
}

#[derive(Debug, Serialize)]
struct AclSetOutput {
    status: &'static str,
    updated: Vec<String>,
}

/// Execute an acl subcommand
pub async fn execute(cmd: AclCommands, globals: GlobalOptions) -> ExitCode {
    let formatter = Formatter::new(globals.output);

    // Reject a malformed ACL before authenticating
    let update = match &cmd {
        AclCommands::Set(args) => match args.acl.parse::<AclUpdate>() {
            Ok(update) => Some(update),
            Err(e) => {
                formatter.error(&format!("Invalid ACL '{}': {e}", args.acl));
                return ExitCode::UsageError;
            }
        },
        AclCommands::Get(_) => None,
    };

    let session = match Session::open(globals.profile.as_deref()) {
        Ok(s) => s,
        Err(e) => return super::fail(&formatter, "Failed to open session", &e),
    };
    let assets = session.assets();

    match (cmd, update) {
        (AclCommands::Get(args), _) => match assets.get_acl(&args.path).await {
            Ok(acl) => {
                if formatter.is_json() {
                    formatter.json(&acl);
                } else {
                    for line in acl_lines(&acl) {
                        formatter.println(&line);
                    }
                }
                ExitCode::Success
            }
            Err(e) => super::fail(&formatter, &format!("Failed to get ACL of {}", args.path), &e),
        },
        (AclCommands::Set(args), Some(update)) => {
            match assets
                .set_acl(&args.path, &update, args.overwrite, args.recursive)
                .await
            {
                Ok(updated) => {
                    if formatter.is_json() {
                        formatter.json(&AclSetOutput {
                            status: "success",
                            updated,
                        });
                    } else {
                        for id in &updated {
                            formatter.success(&format!("Updated ACL of {id}"));
                        }
                    }
                    ExitCode::Success
                }
                Err(e) => {
                    super::fail(&formatter, &format!("Failed to set ACL of {}", args.path), &e)
                }
            }
        }
        (AclCommands::Set(_), None) => ExitCode::UsageError,
    }
}

fn acl_lines(acl: &Acl) -> Vec<String> {
    let list = |members: &[String]| {
        if members.is_empty() {
            "-".to_string()
        } else {
            members.join(", ")
        }
    };
    vec![
        format!("Owners:  {}", list(&acl.owners)),
        format!("Writers: {}", list(&acl.writers)),
        format!("Readers: {}", list(&acl.readers)),
        format!("Public:  {}", acl.all_users_can_read),
    ]
}
