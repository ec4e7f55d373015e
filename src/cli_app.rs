//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use race_dash::core::config::Config;
use race_dash::core::errors::DashError;
use race_dash::feed::poller::poll_once;
use race_dash::feed::record::PayloadSnapshot;
use race_dash::feed::source::open_source;
use race_dash::logger::activity::{ActivityLoggerHandle, spawn_logger};
use race_dash::logger::jsonl::JsonlConfig;
use race_dash::tui::render::live_block_lines;
use race_dash::tui::{DashboardRuntimeConfig, SessionSummary, run_dashboard};

/// Race Dash: live parameter dashboard for a vehicle controller feed.
#[derive(Debug, Parser)]
#[command(
    name = "rdash",
    author,
    version,
    about = "Race Dash - live vehicle parameter dashboard",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Live terminal dashboard.
    Dashboard(DashboardArgs),
    /// Fetch the feed once and print every record.
    Snapshot(SnapshotArgs),
    /// Inspect configuration.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct DashboardArgs {
    /// Feed address (URL or file path), overriding `feed.source`.
    #[arg(long, value_name = "ADDR")]
    source: Option<String>,
    /// Poll interval, overriding `feed.poll_interval_ms`.
    #[arg(long, value_name = "MILLISECONDS")]
    interval_ms: Option<u64>,
    /// Do not write the activity log for this session.
    #[arg(long)]
    no_log: bool,
}

#[derive(Debug, Clone, Args, Default)]
struct SnapshotArgs {
    /// Feed address (URL or file path), overriding `feed.source`.
    #[arg(long, value_name = "ADDR")]
    source: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print the config file path in use.
    Path,
    /// Print the effective configuration.
    Show,
    /// Load and validate the configuration.
    Validate,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
        }
    }
}

impl From<DashError> for CliError {
    fn from(e: DashError) -> Self {
        match e {
            DashError::InvalidConfig { .. }
            | DashError::MissingConfig { .. }
            | DashError::ConfigParse { .. } => Self::User(e.to_string()),
            other => Self::Runtime(other.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Dashboard(args) => run_dashboard_command(cli, args),
        Command::Snapshot(args) => run_snapshot(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// dashboard
// ---------------------------------------------------------------------------

fn run_dashboard_command(cli: &Cli, args: &DashboardArgs) -> Result<(), CliError> {
    if cli.json {
        return Err(CliError::User(
            "dashboard is interactive and does not support --json".to_string(),
        ));
    }
    if !io::stdout().is_terminal() {
        return Err(CliError::User(
            "dashboard requires an interactive terminal (try `rdash snapshot`)".to_string(),
        ));
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(source) = &args.source {
        config.feed.source = source.trim().to_string();
    }
    if let Some(ms) = args.interval_ms {
        config.feed.poll_interval_ms = ms;
    }
    config.validate()?;

    let (logger, logger_join) = if config.logging.enabled && !args.no_log {
        let (handle, join) = spawn_logger(JsonlConfig::from_logging(&config.logging))?;
        (handle, Some(join))
    } else {
        (ActivityLoggerHandle::disabled(), None)
    };

    let runtime = DashboardRuntimeConfig {
        config,
        color: !cli.no_color,
        logger: logger.clone(),
    };
    let result = run_dashboard(&runtime);

    logger.shutdown();
    if let Some(join) = logger_join
        && join.join().is_err()
    {
        eprintln!("[RD-LOGGER] logger thread panicked during shutdown");
    }
    if let Some(warning) = lost_events_warning(logger.dropped_events()) {
        eprintln!("{warning}");
    }

    let summary = result?;
    if !cli.quiet {
        print_session_summary(&summary);
    }
    Ok(())
}

fn print_session_summary(summary: &SessionSummary) {
    println!(
        "{} {} polls, {} failures, {}",
        "session ended:".bold(),
        summary.polls,
        summary.failures,
        human_duration(summary.uptime),
    );
}

/// Events dropped after the logger's last write never reach the file.
fn lost_events_warning(dropped: u64) -> Option<String> {
    (dropped > 0).then(|| {
        format!("[RD-LOGGER] {dropped} activity events were dropped and are missing from the log")
    })
}

fn human_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

// ---------------------------------------------------------------------------
// snapshot
// ---------------------------------------------------------------------------

fn run_snapshot(cli: &Cli, args: &SnapshotArgs) -> Result<(), CliError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(source) = &args.source {
        config.feed.source = source.trim().to_string();
        config.validate()?;
    }

    let mut source = open_source(&config.feed.source, config.feed.fetch_timeout());
    let label = source.describe();
    let outcome = poll_once(source.as_mut(), 1);
    let latency_ms = u64::try_from(outcome.latency.as_millis()).unwrap_or(u64::MAX);

    match (outcome.result, output_mode(cli)) {
        (Ok(snapshot), OutputMode::Human) => {
            print_snapshot_human(cli, &label, latency_ms, &snapshot);
            Ok(())
        }
        (Ok(snapshot), OutputMode::Json) => {
            let payload = json!({
                "command": "snapshot",
                "ok": true,
                "source": label,
                "latency_ms": latency_ms,
                "snapshot": serde_json::to_value(&snapshot)?,
            });
            write_json_line(&payload)
        }
        (Err(e), mode) => {
            if mode == OutputMode::Json {
                let payload = json!({
                    "command": "snapshot",
                    "ok": false,
                    "source": label,
                    "error_code": e.code(),
                    "error": e.to_string(),
                });
                write_json_line(&payload)?;
            }
            Err(CliError::Runtime(e.to_string()))
        }
    }
}

fn print_snapshot_human(cli: &Cli, label: &str, latency_ms: u64, snapshot: &PayloadSnapshot) {
    if !cli.quiet {
        println!("{} {label}", "Snapshot of".bold());
        if cli.verbose {
            println!(
                "  {} records, {} named values, fetched in {latency_ms} ms",
                snapshot.records.len(),
                snapshot.named_count()
            );
        }
        println!();
    }

    let blocks = live_block_lines(&snapshot.records);
    if blocks.is_empty() {
        println!("  {}", "(no named records)".dimmed());
    }
    for line in blocks {
        println!("  {line}");
    }

    if !cli.quiet {
        println!();
        println!("  page:     {}", optional(snapshot.page));
        println!("  focus:    {}", optional(snapshot.focus));
        let auto = if snapshot.auto_mode {
            "on".yellow().bold()
        } else {
            "off".normal()
        };
        println!("  autoMode: {auto}");
    }
}

fn optional(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = Config::load(cli.config.as_deref())?;

            match output_mode(cli) {
                OutputMode::Human => println!("{}", config.to_toml_string()?),
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => match Config::load(cli.config.as_deref()) {
            Ok(config) => {
                let hash = config.stable_hash()?;

                match output_mode(cli) {
                    OutputMode::Human => {
                        println!("{}", "Configuration is valid.".green());
                        println!("  Source: {}", config.config_file.display());
                        println!(
                            "  Tabs: {} ({} parameters)",
                            config.tabs.len(),
                            config.parameter_count()
                        );
                        println!("  Hash: {hash}");
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": true,
                            "path": config.config_file.to_string_lossy(),
                            "tabs": config.tabs.len(),
                            "parameters": config.parameter_count(),
                            "hash": hash,
                        });
                        write_json_line(&payload)?;
                    }
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => {
                        eprintln!("{} {e}", "Configuration is INVALID:".red().bold());
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": false,
                            "error_code": e.code(),
                            "error": e.to_string(),
                        });
                        write_json_line(&payload)?;
                    }
                }
                Err(CliError::User(format!("invalid config: {e}")))
            }
        },
    }
}

// ---------------------------------------------------------------------------
// output helpers
// ---------------------------------------------------------------------------

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("RDASH_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
