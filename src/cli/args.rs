use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cleaner::CategoryStep;
pub use crate::common::config::OutputFormat;

/// TidyGuard: guarded cleanup for macOS caches, logs and temporary files
#[derive(Parser, Debug)]
#[command(
    name = "tidyguard",
    version,
    about = "Guarded cleanup for macOS caches, logs and temporary files",
    long_about = "TidyGuard finds reclaimable caches, logs and temp files, checks every path\n\
                   against your exclusions and a fixed set of safe locations, and asks once\n\
                   before anything that needs administrator rights.",
    after_help = "EXAMPLES:\n  \
        tidyguard scan                                  List what can be cleaned\n  \
        tidyguard scan --format json                    Scan with JSON output\n  \
        tidyguard clean --dry-run                       Preview a cleanup\n  \
        tidyguard clean --category user_caches,user_logs Clean selected categories\n  \
        tidyguard clean -y                              Clean without prompting\n  \
        tidyguard exclude add ~/Library/Caches/com.app  Never touch this path\n  \
        tidyguard config set select_caution_items true  Pre-select review items"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (defaults to the configured one)
    #[arg(long, global = true)]
    pub format: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Quiet mode, minimal output
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan for cleanable files
    Scan {
        /// Show individual items in results
        #[arg(long)]
        detailed: bool,
    },

    /// Remove selected files
    Clean {
        /// Skip confirmation prompts, including the administrator prompt
        #[arg(long, short = 'y')]
        yes: bool,

        /// Show what would be cleaned without removing anything
        #[arg(long)]
        dry_run: bool,

        /// Only clean specific categories
        #[arg(long = "category", value_delimiter = ',', value_name = "CATEGORY")]
        categories: Vec<CategoryStep>,

        /// Also clean items marked for review
        #[arg(long)]
        include_caution: bool,
    },

    /// Manage paths that are never cleaned
    Exclude {
        #[command(subcommand)]
        action: ExcludeAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run the privileged removal helper (launched as root by launchd)
    #[command(hide = true)]
    Helper {
        /// Socket to listen on (defaults to the configured one)
        #[arg(long)]
        socket: Option<PathBuf>,

        /// Home of the user the helper serves; its owner is the only
        /// non-root user allowed on the socket
        #[arg(long)]
        client_home: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ExcludeAction {
    /// Never clean this path
    Add { path: String },

    /// Allow this path to be cleaned again
    Remove { path: String },

    /// Show all excluded paths
    List,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset to default configuration
    Reset,

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },

    /// Initialize TidyGuard directories and default config
    Init,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

impl From<CompletionShell> for clap_complete::Shell {
    fn from(shell: CompletionShell) -> Self {
        match shell {
            CompletionShell::Bash => clap_complete::Shell::Bash,
            CompletionShell::Zsh => clap_complete::Shell::Zsh,
            CompletionShell::Fish => clap_complete::Shell::Fish,
        }
    }
}

impl Cli {
    /// `--quiet` wins, then `--format`, then the configured default
    pub fn output_format(&self, configured: OutputFormat) -> OutputFormat {
        if self.quiet {
            OutputFormat::Quiet
        } else {
            self.format.unwrap_or(configured)
        }
    }
}
