//! Shell completion scripts for eeu

use std::io::Write;

use clap::CommandFactory;
use clap_complete::Shell;

use super::Cli;
use crate::exit_code::ExitCode;

const BIN_NAME: &str = "eeu";

/// Arguments for the completions command
#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Print the completion script for a shell
pub fn execute(args: CompletionsArgs) -> ExitCode {
    let script = render(args.shell);
    match std::io::stdout().write_all(&script) {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            tracing::error!("Failed to write completions: {e}");
            ExitCode::GeneralError
        }
    }
}

fn render(shell: Shell) -> Vec<u8> {
    let mut cmd = Cli::command();
    let mut buf = Vec::new();
    clap_complete::generate(shell, &mut cmd, BIN_NAME, &mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(shell: Shell) -> String {
        String::from_utf8(render(shell)).unwrap()
    }

    #[test]
    fn test_scripts_cover_asset_and_transfer_commands() {
        for shell in [Shell::Bash, Shell::Zsh, Shell::Fish, Shell::PowerShell] {
            let output = script(shell);
            for command in ["upload", "download", "acl", "task", "mkdir", "profile"] {
                assert!(
                    output.contains(command),
                    "{shell} completions lack `{command}`"
                );
            }
        }
    }

    #[test]
    fn test_scripts_cover_nested_subcommands() {
        let output = script(Shell::Fish);
        for command in ["cancel", "wait", "status", "show"] {
            assert!(output.contains(command), "missing `{command}`");
        }
    }

    #[test]
    fn test_bash_completes_upload_flags() {
        let output = script(Shell::Bash);
        assert!(output.contains("complete -F _eeu"));
        assert!(output.contains("--asset"));
        assert!(output.contains("--keep"));
        assert!(output.contains("--profile"));
    }

    #[test]
    fn test_zsh_registers_eeu() {
        let output = script(Shell::Zsh);
        assert!(output.contains("#compdef eeu"));
    }
}
