use async_trait::async_trait;
use colored::Colorize;
use std::io::Write;

use crate::common::format;

/// What the user is asked to approve before any privileged channel runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    pub count: usize,
    /// A representative path, plus how many others are included
    pub preview: String,
}

impl ConfirmationRequest {
    pub fn for_paths(paths: &[String]) -> Self {
        let preview = match paths {
            [] => String::new(),
            [only] => only.clone(),
            [first, rest @ ..] => format!("{} and {} more", first, rest.len()),
        };
        Self {
            count: paths.len(),
            preview,
        }
    }

    pub fn message(&self) -> String {
        let noun = if self.count == 1 { "item needs" } else { "items need" };
        format!(
            "{} {} administrator rights to remove ({}). Continue?",
            self.count, noun, self.preview
        )
    }
}

#[async_trait]
pub trait Confirmer: Send + Sync {
    /// Ask once. `true` means the user approved.
    async fn confirm(&self, request: &ConfirmationRequest) -> bool;
}

/// Approves everything (`--yes`)
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

#[async_trait]
impl Confirmer for AutoConfirm {
    async fn confirm(&self, _request: &ConfirmationRequest) -> bool {
        true
    }
}

/// Declines everything; privileged removal never happens
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyAll;

#[async_trait]
impl Confirmer for DenyAll {
    async fn confirm(&self, _request: &ConfirmationRequest) -> bool {
        false
    }
}

/// y/N prompt on the controlling terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirmer;

#[async_trait]
impl Confirmer for TerminalConfirmer {
    async fn confirm(&self, request: &ConfirmationRequest) -> bool {
        let message = format!(
            "{} {}",
            format::truncate(&request.message(), 160),
            "[y/N]".dimmed()
        );
        let answer = tokio::task::spawn_blocking(move || -> std::io::Result<String> {
            print!("\n  {} {} ", "🔐", message);
            std::io::stdout().flush()?;
            let mut input = String::new();
            std::io::stdin().read_line(&mut input)?;
            Ok(input)
        })
        .await;

        match answer {
            Ok(Ok(input)) => input.trim().eq_ignore_ascii_case("y"),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "could not read confirmation, treating as declined");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "confirmation prompt task failed");
                false
            }
        }
    }
}
