//! Capabilities the core needs from whatever front end drives it.

use std::io::{self, BufRead, Write};
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::config::CommandExec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
}

impl NotificationKind {
    pub fn label(self) -> &'static str {
        match self {
            NotificationKind::Success => "ok",
            NotificationKind::Error => "error",
            NotificationKind::Warning => "warning",
        }
    }
}

/// Transient success/error toasts.
pub trait Notifier {
    fn notify(&mut self, kind: NotificationKind, title: &str, message: &str);
}

/// Yes/no question put to the user before a destructive action.
pub trait Confirmer {
    fn confirm(&mut self, title: &str, text: &str) -> bool;
}

/// Hands `tel:` and `mailto:` links to the platform handler.
pub trait Launcher {
    fn open(&mut self, uri: &str) -> Result<()>;
}

/// Writes notifications to stderr, one line each.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, kind: NotificationKind, title: &str, message: &str) {
        match kind {
            NotificationKind::Success => eprintln!("{} {}", title, message),
            _ => eprintln!("{}: {} {}", kind.label(), title, message),
        }
    }
}

/// Asks on stdin; anything but `y`/`yes` declines.
#[derive(Debug, Default)]
pub struct PromptConfirmer;

impl Confirmer for PromptConfirmer {
    fn confirm(&mut self, title: &str, text: &str) -> bool {
        eprint!("{} {} [y/N] ", title, text);
        let _ = io::stderr().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

/// Confirms without asking (`--yes`).
#[derive(Debug, Default)]
pub struct AssumeYes;

impl Confirmer for AssumeYes {
    fn confirm(&mut self, _title: &str, _text: &str) -> bool {
        true
    }
}

/// Runs the configured opener with the URI as its last argument.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    command: CommandExec,
    quiet: bool,
}

impl CommandLauncher {
    pub fn new(command: CommandExec) -> Self {
        Self {
            command,
            quiet: false,
        }
    }

    /// Discard the handler's output. Needed while the TUI owns the terminal.
    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }
}

impl Launcher for CommandLauncher {
    fn open(&mut self, uri: &str) -> Result<()> {
        debug!(program = %self.command.program, uri, "launching handler");
        let mut command = Command::new(&self.command.program);
        command.args(&self.command.args).arg(uri).stdin(Stdio::null());
        if self.quiet {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }
        let status = command
            .status()
            .with_context(|| format!("failed to run {}", self.command.program))?;
        if !status.success() {
            bail!("{} exited with status {}", self.command.program, status);
        }
        Ok(())
    }
}


#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_command_launcher_passes_uri_last() {
        let mut launcher = CommandLauncher::new(CommandExec {
            program: "sh".into(),
            args: vec!["-c".into(), "test \"$0\" = tel:01012345678".into()],
        });
        launcher.open("tel:01012345678").unwrap();
        assert!(launcher.open("tel:0").is_err());
    }

    #[test]
    fn test_command_launcher_missing_program() {
        let mut launcher = CommandLauncher::new(CommandExec {
            program: "quickdial-no-such-opener".into(),
            args: Vec::new(),
        });
        let err = launcher.open("mailto:a@b.io").unwrap_err();
        assert!(err.to_string().contains("failed to run"));
    }
}
