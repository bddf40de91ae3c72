//! mkdir command - Create folders and image collections

use clap::Args;
use serde::Serialize;

use super::GlobalOptions;
use super::session::Session;
use crate::exit_code::ExitCode;
use crate::output::Formatter;
use eeu_core::AssetType;

/// Create a folder or image collection
#[derive(Args, Debug)]
pub struct MkdirArgs {
    /// Paths to create
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Create missing parent folders; an existing container is not an error
    #[arg(short, long)]
    pub parents: bool,

    /// Create an image collection instead of a folder
    #[arg(short = 'c', long)]
    pub collection: bool,

    /// Replace an existing asset
    #[arg(long)]
    pub overwrite: bool,

    /// Make the new containers world-readable
    #[arg(long)]
    pub public: bool,
}

#[derive(Debug, Serialize)]
struct MkdirOutput {
    status: &'static str,
    created: Vec<String>,
    #[serde(rename = "type")]
    kind: AssetType,
}

/// Execute the mkdir command
pub async fn execute(args: MkdirArgs, globals: GlobalOptions) -> ExitCode {
    let formatter = Formatter::new(globals.output);
    let session = match Session::open(globals.profile.as_deref()) {
        Ok(s) => s,
        Err(e) => return super::fail(&formatter, "Failed to open session", &e),
    };
    let assets = session.assets();

    let kind = if args.collection {
        AssetType::ImageCollection
    } else {
        AssetType::Folder
    };

    let mut created = Vec::with_capacity(args.paths.len());
    for path in &args.paths {
        match assets
            .create_folder(path, kind, args.parents, args.overwrite, args.public)
            .await
        {
            Ok(id) => {
                formatter.success(&format!("Created {kind} {id}"));
                created.push(id);
            }
            Err(e) => return super::fail(&formatter, &format!("Failed to create {path}"), &e),
        }
    }

    if formatter.is_json() {
        formatter.json(&MkdirOutput {
            status: "success",
            created,
            kind,
        });
    }
    ExitCode::Success
}
