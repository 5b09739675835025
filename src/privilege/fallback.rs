use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use super::{PrivilegedChannel, PrivilegedResult};

const OSASCRIPT: &str = "/usr/bin/osascript";
const GENERIC_FAILURE: &str = "administrator removal failed";
const USER_CANCELED_CODE: &str = "(-128)";

/// Exit status plus stdout and stderr, concatenated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal
    pub status: Option<i32>,
    pub output: String,
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let out = tokio::process::Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to launch {}", program))?;

        let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&out.stderr));
        Ok(CommandOutput {
            status: out.status.code(),
            output,
        })
    }
}

/// Secondary channel: one `rm -rf` for every path, run through the
/// administrator password prompt.
pub struct AdminShellChannel {
    runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for AdminShellChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminShellChannel").finish_non_exhaustive()
    }
}

impl Default for AdminShellChannel {
    fn default() -> Self {
        Self::new(Arc::new(TokioCommandRunner))
    }
}

impl AdminShellChannel {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// The shell command, paths quoted for `/bin/sh`
    pub fn removal_command(paths: &[String]) -> String {
        format!("/bin/rm -rf -- {}", shell_words::join(paths))
    }

    /// `osascript` arguments wrapping `removal_command` in an AppleScript string
    pub fn osascript_args(paths: &[String]) -> Vec<String> {
        let command = Self::removal_command(paths);
        let script = format!(
            "do shell script \"{}\" with administrator privileges",
            escape_applescript(&command)
        );
        vec!["-e".to_string(), script]
    }
}

fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// AppleScript reports a dismissed prompt as `execution error: User canceled. (-128)`.
/// Only the trailing error code counts, never a `-128` inside an echoed path.
fn is_cancellation(output: &str) -> bool {
    output
        .lines()
        .map(str::trim_end)
        .filter(|line| line.contains("execution error:"))
        .any(|line| {
            line.ends_with(USER_CANCELED_CODE) || line.to_lowercase().contains("user canceled")
        })
}

#[async_trait]
impl PrivilegedChannel for AdminShellChannel {
    fn name(&self) -> &'static str {
        "admin-shell"
    }

    async fn remove_items(&self, paths: &[String]) -> PrivilegedResult {
        let args = Self::osascript_args(paths);
        tracing::debug!(count = paths.len(), "running administrator removal");

        match self.runner.run(OSASCRIPT, &args).await {
            Ok(CommandOutput { status: Some(0), .. }) => PrivilegedResult::Success,
            Ok(CommandOutput { output, .. }) if is_cancellation(&output) => {
                PrivilegedResult::Cancelled
            }
            Ok(CommandOutput { output, status }) => {
                let output = output.trim();
                tracing::warn!(?status, output, "administrator removal failed");
                if output.is_empty() {
                    PrivilegedResult::Failure(GENERIC_FAILURE.to_string())
                } else {
                    PrivilegedResult::Failure(output.to_string())
                }
            }
            Err(e) => PrivilegedResult::Failure(format!("{:#}", e)),
        }
    }
}
