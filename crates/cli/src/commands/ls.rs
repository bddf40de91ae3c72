//! ls command - List the children of a container
//!
//! Lists the asset root when no path is given.

use clap::Args;
use serde::Serialize;

use super::GlobalOptions;
use super::session::Session;
use crate::exit_code::ExitCode;
use crate::output::Formatter;
use eeu_core::AssetInfo;

/// List assets
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Folder or image collection; the asset root when omitted
    #[arg(default_value = "")]
    pub path: String,

    /// Print absolute asset ids instead of names
    #[arg(short, long)]
    pub abspath: bool,

    /// Show type, size and update time
    #[arg(short, long)]
    pub long: bool,
}

/// Output structure for ls command (JSON format)
#[derive(Debug, Serialize)]
struct LsOutput {
    items: Vec<AssetInfo>,
    total: usize,
}

/// Execute the ls command
pub async fn execute(args: LsArgs, globals: GlobalOptions) -> ExitCode {
    let formatter = Formatter::new(globals.output);
    let session = match Session::open(globals.profile.as_deref()) {
        Ok(s) => s,
        Err(e) => return super::fail(&formatter, "Failed to open session", &e),
    };
    let assets = session.assets();

    let items = match assets.list(&args.path).await {
        Ok(items) => items,
        Err(e) => {
            let target = if args.path.is_empty() { "asset root" } else { &args.path };
            return super::fail(&formatter, &format!("Failed to list {target}"), &e);
        }
    };

    if formatter.is_json() {
        formatter.json(&LsOutput {
            total: items.len(),
            items,
        });
    } else if args.long {
        formatter.table(&["TYPE", "SIZE", "UPDATED", "NAME"], long_rows(&items, args.abspath));
    } else {
        for item in &items {
            formatter.println(display_name(item, args.abspath));
        }
    }
    ExitCode::Success
}

fn display_name(item: &AssetInfo, abspath: bool) -> &str {
    if abspath { &item.id } else { item.basename() }
}

fn long_rows(items: &[AssetInfo], abspath: bool) -> Vec<Vec<String>> {
    items
        .iter()
        .map(|item| {
            vec![
                item.asset_type.to_string(),
                item.size_human.clone().unwrap_or_else(|| "-".to_string()),
                item.update_time
                    .map(|t| t.strftime("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string()),
                display_name(item, abspath).to_string(),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eeu_core::AssetType;

    #[test]
    fn test_display_name() {
        let item = AssetInfo::new("projects/p/assets/dir/scene", AssetType::Image);
        assert_eq!(display_name(&item, false), "scene");
        assert_eq!(display_name(&item, true), "projects/p/assets/dir/scene");
    }

    #[test]
    fn test_long_rows() {
        let items = vec![
            AssetInfo::new("users/a/dir", AssetType::Folder),
            AssetInfo::new("users/a/img", AssetType::Image).with_size(10),
        ];
        let rows = long_rows(&items, false);
        assert_eq!(rows[0], vec!["FOLDER", "-", "-", "dir"]);
        assert_eq!(rows[1][0], "IMAGE");
        assert_eq!(rows[1][1], "10 B");
        assert_eq!(rows[1][3], "img");
    }
}
