//! # Shell Completion Module
//!
//! ```bash
//! tanda completion bash > ~/.local/share/bash-completion/completions/tanda
//! tanda completion zsh > ~/.config/zsh/completions/_tanda
//! ```

use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io::{self, Write};

/// Write completions for `cmd` to stdout.
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command) {
    write_completions(gen, cmd, &mut io::stdout());
}

pub fn write_completions<G: Generator>(gen: G, cmd: &mut Command, out: &mut dyn Write) {
    let name = cmd.get_name().to_string();
    generate(gen, cmd, name, out);
}

pub fn shell_to_completion_shell(shell: &crate::cli::Shell) -> CompletionShell {
    match shell {
        crate::cli::Shell::Bash => CompletionShell::Bash,
        crate::cli::Shell::Zsh => CompletionShell::Zsh,
        crate::cli::Shell::Fish => CompletionShell::Fish,
        crate::cli::Shell::PowerShell => CompletionShell::PowerShell,
        crate::cli::Shell::Elvish => CompletionShell::Elvish,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Args, Shell};
    use clap::CommandFactory;

    #[test]
    fn test_shell_conversion() {
        assert_eq!(shell_to_completion_shell(&Shell::Bash), CompletionShell::Bash);
        assert_eq!(shell_to_completion_shell(&Shell::Zsh), CompletionShell::Zsh);
        assert_eq!(shell_to_completion_shell(&Shell::Fish), CompletionShell::Fish);
        assert_eq!(shell_to_completion_shell(&Shell::PowerShell), CompletionShell::PowerShell);
        assert_eq!(shell_to_completion_shell(&Shell::Elvish), CompletionShell::Elvish);
    }

    #[test]
    fn test_bash_completion_mentions_subcommands() {
        let mut cmd = Args::command();
        let mut out = Vec::new();
        write_completions(CompletionShell::Bash, &mut cmd, &mut out);

        let script = String::from_utf8(out).expect("utf-8 script");
        assert!(script.contains("_tanda"));
        assert!(script.contains("simulate"));
        assert!(script.contains("init-db"));
    }
}
