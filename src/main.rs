use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tidyguard::cleaner::{CategoryStep, CleanupOrchestrator, DiagnosticsSink, FanoutSink, JsonlSink, TracingSink};
use tidyguard::cli::args::{Cli, Commands, ConfigAction, ExcludeAction, OutputFormat};
use tidyguard::cli::output;
use tidyguard::common::config::Config;
use tidyguard::common::logging;
use tidyguard::common::safety::SafeRoots;
use tidyguard::guard::{ConfigExclusions, PathGuard};
use tidyguard::privilege::{self, AutoConfirm, Confirmer, DenyAll, PrivilegeEscalator, TerminalConfirmer};
use tidyguard::scanner;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let _log_guard = match logging::init(cli.verbose, Some(&Config::logs_dir())) {
        Ok(guard) => guard,
        Err(_) => logging::init(cli.verbose, None).ok().flatten(),
    };

    match cli.command {
        Commands::Scan { detailed } => cmd_scan(&cli, detailed).await,

        Commands::Clean {
            yes,
            dry_run,
            ref categories,
            include_caution,
        } => cmd_clean(&cli, yes, dry_run, categories, include_caution).await,

        Commands::Exclude { ref action } => cmd_exclude(action),

        Commands::Config { ref action } => cmd_config(action),

        Commands::Helper {
            ref socket,
            ref client_home,
        } => cmd_helper(socket.clone(), client_home.clone()).await,

        Commands::Completions { shell } => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            clap_complete::generate(
                clap_complete::Shell::from(shell),
                &mut cmd,
                "tidyguard",
                &mut std::io::stdout(),
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Wire guard, escalator, executors and diagnostics from the config
fn build_orchestrator(config: &Config, confirmer: Arc<dyn Confirmer>) -> Result<Arc<CleanupOrchestrator>> {
    let exclusions = ConfigExclusions::open_default().context("Failed to load exclusions")?;
    let guard = Arc::new(PathGuard::new(Arc::new(exclusions)));
    let escalator = Arc::new(PrivilegeEscalator::from_config(config, confirmer));
    let executors = scanner::default_executors(escalator, config);
    let safe_roots = SafeRoots::system_default().with_extra(config.extra_safe_roots());

    let diagnostics: Arc<dyn DiagnosticsSink> = Arc::new(FanoutSink::new(vec![
        Box::new(TracingSink),
        Box::new(JsonlSink::open_default()),
    ]));

    Ok(Arc::new(
        CleanupOrchestrator::new(executors, guard, safe_roots).with_diagnostics(diagnostics),
    ))
}

// ─── Scan ─────────────────────────────────────────────────────────────────────

async fn cmd_helper(socket: Option<PathBuf>, client_home: Option<PathBuf>) -> Result<ExitCode> {
    use std::os::unix::fs::MetadataExt;

    let config = Config::load()?;
    let socket = socket.unwrap_or_else(|| config.helper.socket_path.clone());
    let home = client_home
        .or_else(dirs::home_dir)
        .context("No client home directory to serve")?;
    let client_uid = std::fs::metadata(&home)
        .with_context(|| format!("Failed to stat client home: {}", home.display()))?
        .uid();

    let safe_roots = SafeRoots::for_home(&home).with_extra(config.extra_safe_roots());
    let guard = Arc::new(PathGuard::new(Arc::new(ConfigExclusions::open_default()?)));
    let policy = privilege::helper::HelperPolicy::new(guard, safe_roots, client_uid);
    privilege::helper::serve_at(&socket, Arc::new(policy)).await?;
    Ok(ExitCode::SUCCESS)
}

async fn cmd_scan(cli: &Cli, detailed: bool) -> Result<ExitCode> {
    let config = Config::load()?;
    let format = cli.output_format(config.output_format);
    let orchestrator = build_orchestrator(&config, Arc::new(DenyAll))?;

    let spinner = (format == OutputFormat::Human).then(|| {
        let pb = indicatif::ProgressBar::new_spinner();
        pb.set_message("Scanning caches, logs and temporary files...");
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    });

    let report = orchestrator
        .scan()
        .await
        .context("A scan is already in progress")?;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    match format {
        OutputFormat::Human => output::print_scan_results(&report, detailed),
        OutputFormat::Json => output::print_scan_json(&report),
        OutputFormat::Quiet => output::print_scan_quiet(&report),
    }
    Ok(ExitCode::SUCCESS)
}

// ─── Clean ────────────────────────────────────────────────────────────────────

async fn cmd_clean(
    cli: &Cli,
    yes: bool,
    dry_run: bool,
    categories: &[CategoryStep],
    include_caution: bool,
) -> Result<ExitCode> {
    let config = Config::load()?;
    let format = cli.output_format(config.output_format);
    let interactive = format == OutputFormat::Human && std::io::stdin().is_terminal();

    let confirmer: Arc<dyn Confirmer> = if yes {
        Arc::new(AutoConfirm)
    } else if interactive {
        Arc::new(TerminalConfirmer)
    } else {
        Arc::new(DenyAll)
    };
    let orchestrator = build_orchestrator(&config, confirmer)?;

    orchestrator
        .scan()
        .await
        .context("A scan is already in progress")?;

    if include_caution {
        orchestrator.select_all(true);
    }
    if !categories.is_empty() {
        for step in CategoryStep::ALL {
            if !categories.contains(&step) {
                orchestrator.set_category_enabled(step, false);
            }
        }
    }

    let state = orchestrator.state();
    if state.active_categories().next().is_none() {
        if format != OutputFormat::Json {
            println!("  {} Nothing to clean!", "✨");
        }
        return Ok(ExitCode::SUCCESS);
    }

    if format == OutputFormat::Human {
        output::print_clean_plan(&state);
    }

    if !dry_run && !yes {
        if !interactive {
            anyhow::bail!("Refusing to clean without confirmation; pass --yes to proceed");
        }
        let selected: usize = state.active_categories().map(|c| c.selected_count()).sum();
        let bytes: u64 = state.active_categories().map(|c| c.selected_size()).sum();
        print!(
            "  {} Remove {} ({})? [y/N] ",
            "❓",
            tidyguard::common::format::format_count(selected),
            tidyguard::common::format::format_size(bytes)
        );
        use std::io::Write;
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("  {} Cancelled", "✗".red());
            return Ok(ExitCode::SUCCESS);
        }
    }

    let bar = (format == OutputFormat::Human).then(|| {
        let pb = output::progress_bar();
        let follower = tokio::spawn(output::follow_progress(orchestrator.subscribe(), pb.clone()));
        (pb, follower)
    });

    let summary = if dry_run {
        orchestrator.preview().await
    } else {
        orchestrator.run().await
    };

    if let Some((pb, follower)) = bar {
        follower.abort();
        pb.finish_and_clear();
    }

    let Some(summary) = summary else {
        anyhow::bail!("Another cleanup is already running");
    };

    match format {
        OutputFormat::Human => {
            output::print_run_summary(&summary, &orchestrator.state().run_states, dry_run)
        }
        OutputFormat::Json => output::print_summary_json(&summary),
        OutputFormat::Quiet => output::print_summary_quiet(&summary),
    }

    Ok(if summary.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

// ─── Exclude ──────────────────────────────────────────────────────────────────

fn cmd_exclude(action: &ExcludeAction) -> Result<ExitCode> {
    let guard = PathGuard::new(Arc::new(ConfigExclusions::open_default()?));
    match action {
        ExcludeAction::Add { path } => {
            guard.set_excluded(path, true)?;
            println!(
                "  {} Excluded {}",
                "✓".green(),
                tidyguard::guard::normalize(path).display()
            );
        }
        ExcludeAction::Remove { path } => {
            guard.set_excluded(path, false)?;
            println!(
                "  {} No longer excluded: {}",
                "✓".green(),
                tidyguard::guard::normalize(path).display()
            );
        }
        ExcludeAction::List => output::print_exclusions(&guard.exclusions()),
    }
    Ok(ExitCode::SUCCESS)
}

// ─── Config ───────────────────────────────────────────────────────────────────

fn cmd_config(action: &ConfigAction) -> Result<ExitCode> {
    match action {
        ConfigAction::Init => {
            Config::init_dirs()?;
            let config = Config::default();
            config.save()?;
            println!("  {} TidyGuard initialized at ~/.tidyguard", "✓".green());
            println!("  Created: config.toml, logs/");
        }
        ConfigAction::Show => {
            let config = Config::load()?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            println!("  {} Configuration reset to defaults", "✓".green());
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(key, value)?;
            config.save()?;
            println!("  {} Set {} = {}", "✓".green(), key, value);
        }
    }
    Ok(ExitCode::SUCCESS)
}
