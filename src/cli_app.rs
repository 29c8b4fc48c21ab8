//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use backup_lifecycle_helper::analysis::chart::TrendChart;
use backup_lifecycle_helper::analysis::health::HealthReport;
use backup_lifecycle_helper::analysis::statistics::DatabaseStatistics;
use backup_lifecycle_helper::core::config::Config;
use backup_lifecycle_helper::core::errors::BlhError;
use backup_lifecycle_helper::core::format::{format_age, format_size};
use backup_lifecycle_helper::inventory::artifact::{
    BackupArtifact, DatabaseInventory, DatabaseKind,
};
use backup_lifecycle_helper::inventory::layout::BackupLayout;
use backup_lifecycle_helper::inventory::scanner::{ArtifactScanner, ScanFailure};
use backup_lifecycle_helper::logger::activity::{ActivityEvent, ActivityLogger};
use backup_lifecycle_helper::retention::cleanup::{CleanupExecutor, CleanupReport, CleanupStatus};
use backup_lifecycle_helper::retention::policy::{self, RetentionPolicy};

const HEAVY_RULE: &str = "═══════════════════════════════════════════════════════════════";
const LIGHT_RULE: &str = "───────────────────────────────────────────────────────────────";

/// Backup Lifecycle Helper: inventory, health analysis and retention for database backups.
#[derive(Debug, Parser)]
#[command(
    name = "blh",
    author,
    version,
    about = "Backup Lifecycle Helper - inventory, health and retention for database backups",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Override the backup root directory.
    #[arg(long, global = true, value_name = "PATH")]
    root: Option<PathBuf>,
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
    /// List all backups, newest first.
    List(ListArgs),
    /// Analyze backup health: statistics, trends, anomalies, advisories.
    Doctor(DoctorArgs),
    /// Delete backups outside a retention policy.
    Cleanup(CleanupArgs),
    /// Show the newest backup (the one a restore would use).
    Latest(LatestArgs),
    /// View configuration state.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct ListArgs {
    /// Only list one database type.
    #[arg(value_name = "DATABASE", value_parser = parse_database)]
    database: Option<DatabaseKind>,
}

#[derive(Debug, Clone, Args, Default)]
struct DoctorArgs {
    /// Skip the size trend charts.
    #[arg(long)]
    no_chart: bool,
}

#[derive(Debug, Clone, Args)]
struct CleanupArgs {
    /// Database to clean: mongodb, mysql, postgresql or all.
    #[arg(value_name = "TARGET", value_parser = parse_cleanup_target)]
    target: CleanupTarget,
    /// Delete backups older than this many days.
    #[arg(long, value_name = "DAYS")]
    days: Option<u32>,
    /// Keep only this many most recent backups.
    #[arg(long, value_name = "COUNT")]
    keep: Option<usize>,
    /// Show what would be deleted without deleting anything.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Args)]
struct LatestArgs {
    /// Database type.
    #[arg(value_name = "DATABASE", value_parser = parse_database)]
    database: DatabaseKind,
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
    /// Validate configuration and exit.
    Validate,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CleanupTarget {
    All,
    One(DatabaseKind),
}

impl CleanupTarget {
    fn databases(self) -> Vec<DatabaseKind> {
        match self {
            Self::All => DatabaseKind::ALL.to_vec(),
            Self::One(database) => vec![database],
        }
    }
}

fn parse_database(raw: &str) -> Result<DatabaseKind, BlhError> {
    raw.parse()
}

fn parse_cleanup_target(raw: &str) -> Result<CleanupTarget, BlhError> {
    if raw.trim().eq_ignore_ascii_case("all") {
        Ok(CleanupTarget::All)
    } else {
        raw.parse().map(CleanupTarget::One)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// Operation partially succeeded.
    #[error("{0}")]
    Partial(String),
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
            Self::Internal(_) | Self::Json(_) => 3,
            Self::Partial(_) => 4,
        }
    }
}

impl From<BlhError> for CliError {
    fn from(err: BlhError) -> Self {
        match err {
            BlhError::InvalidConfig { .. }
            | BlhError::MissingConfig { .. }
            | BlhError::ConfigParse { .. }
            | BlhError::InvalidPolicy { .. }
            | BlhError::UnknownDatabase { .. }
            | BlhError::NoArtifacts { .. } => Self::User(err.to_string()),
            BlhError::Serialization { .. } => Self::Internal(err.to_string()),
            BlhError::PermissionDenied { .. }
            | BlhError::Io { .. }
            | BlhError::Collaborator { .. }
            | BlhError::Runtime { .. } => Self::Runtime(err.to_string()),
        }
    }
}

/// Resolved per-invocation state shared by the commands.
struct Context {
    config: Config,
    layout: BackupLayout,
    mode: OutputMode,
    verbose: bool,
    quiet: bool,
}

impl Context {
    fn load(cli: &Cli) -> Result<Self, CliError> {
        let mut config = Config::load(cli.config.as_deref())?;
        if let Some(root) = &cli.root {
            config.backup.root.clone_from(root);
        }
        let layout = BackupLayout::new(config.backup.root.clone());
        Ok(Self {
            config,
            layout,
            mode: output_mode(cli),
            verbose: cli.verbose,
            quiet: cli.quiet,
        })
    }

    fn human(&self) -> bool {
        self.mode == OutputMode::Human && !self.quiet
    }

    fn report_scan_problems(&self, inventories: &[DatabaseInventory], failures: &[ScanFailure]) {
        if self.quiet {
            return;
        }
        for failure in failures {
            eprintln!(
                "[BLH-SCAN] {} skipped: {}",
                failure.database.label(),
                failure.error
            );
        }
        if self.verbose {
            for inventory in inventories {
                for skipped in &inventory.skipped {
                    eprintln!(
                        "[BLH-SCAN] unreadable path {}: {}",
                        skipped.path.display(),
                        skipped.error
                    );
                }
            }
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::List(args) => run_list(cli, args),
        Command::Doctor(args) => run_doctor(cli, args),
        Command::Cleanup(args) => run_cleanup(cli, args),
        Command::Latest(args) => run_latest(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ──────────────────── list ────────────────────

fn run_list(cli: &Cli, args: &ListArgs) -> Result<(), CliError> {
    let ctx = Context::load(cli)?;
    let catalog = ArtifactScanner::new().scan_all(&ctx.layout);
    ctx.report_scan_problems(&catalog.inventories, &catalog.failures);

    let selected: Vec<&DatabaseInventory> = catalog
        .inventories
        .iter()
        .filter(|inv| args.database.is_none_or(|db| inv.database == db))
        .collect();

    match ctx.mode {
        OutputMode::Json => {
            let databases: Vec<Value> = selected
                .iter()
                .map(|inv| {
                    json!({
                        "database": inv.database,
                        "count": inv.len(),
                        "total_size_bytes": inv.total_size(),
                        "artifacts": inv.descending(),
                    })
                })
                .collect();
            let payload = json!({
                "command": "list",
                "root": ctx.layout.root().to_string_lossy(),
                "databases": databases,
                "scan_failures": catalog.failures,
            });
            write_json_line(&payload)?;
        }
        OutputMode::Human if ctx.quiet => {}
        OutputMode::Human => {
            if !ctx.layout.root().exists() {
                println!(
                    "No backups found. The {} directory doesn't exist yet.",
                    ctx.layout.root().display()
                );
                println!("Run a backup first to create backups.");
                return Ok(());
            }
            let mut any = false;
            for inventory in selected.iter().filter(|inv| !inv.is_empty()) {
                any = true;
                println!("\n{}", format!("{} Backups:", inventory.database).bold());
                println!("{HEAVY_RULE}");
                for artifact in inventory.descending() {
                    print_artifact_line(artifact);
                }
            }
            if any {
                println!();
            } else {
                println!("\nNo backups found.");
                println!("Run a backup to create your first backup.");
            }
        }
    }
    Ok(())
}

fn print_artifact_line(artifact: &BackupArtifact) {
    let marker = if artifact.is_dir() { "dir " } else { "file" };
    println!(
        "  [{marker}] {:<40} {:>10}  {}",
        artifact.name,
        format_size(artifact.size_bytes),
        artifact.modified_at.format("%Y-%m-%d %H:%M:%S"),
    );
}

// ──────────────────── doctor ────────────────────

fn run_doctor(cli: &Cli, args: &DoctorArgs) -> Result<(), CliError> {
    let ctx = Context::load(cli)?;
    let catalog = ArtifactScanner::new().scan_all(&ctx.layout);
    ctx.report_scan_problems(&catalog.inventories, &catalog.failures);

    let report = HealthReport::build(&catalog.inventories, &ctx.config, Utc::now());

    if ctx.mode == OutputMode::Json {
        let payload = json!({
            "command": "doctor",
            "root": ctx.layout.root().to_string_lossy(),
            "score": report.score,
            "grade": report.grade,
            "total_count": report.total_count(),
            "total_size_bytes": report.total_size(),
            "databases": report.databases,
            "deductions": report.deductions,
            "recommendations": report
                .recommendations
                .iter()
                .map(|rec| json!({ "advice": rec, "message": rec.to_string() }))
                .collect::<Vec<_>>(),
            "scan_failures": catalog.failures,
        });
        return write_json_line(&payload);
    }
    if ctx.quiet {
        return Ok(());
    }

    println!("\n{}", "Backup Health Analysis".bold());
    println!("{HEAVY_RULE}");
    if report.total_count() == 0 {
        println!("\nNo backups found. Run some backups first!");
        return Ok(());
    }

    for stats in report.databases.iter().filter(|s| s.has_backups()) {
        print_database_analysis(stats, !args.no_chart);
    }
    print_health_summary(&ctx, &report);
    print_recommendations(&report);
    Ok(())
}

fn print_database_analysis(stats: &DatabaseStatistics, with_chart: bool) {
    println!("\n\n{}", format!("{} Analysis", stats.database).bold());
    println!("{LIGHT_RULE}");
    println!("  Total Backups:  {}", stats.total_count);
    println!("  Total Size:     {}", format_size(stats.total_size_bytes));
    if let Some(average) = stats.average_size_bytes {
        println!("  Average Size:   {}", format_size(average));
    }
    if let (Some(oldest), Some(newest)) = (stats.oldest_at, stats.newest_at) {
        println!(
            "  Date Range:     {} → {}",
            oldest.format("%Y-%m-%d"),
            newest.format("%Y-%m-%d")
        );
    }
    if let Some(growth) = stats.growth_rate_percent {
        let arrow = if growth < 0.0 { "↓" } else { "↑" };
        println!("  Growth Rate:    {arrow} {growth:.1}%");
    }

    if with_chart {
        if let Some(chart) = TrendChart::render(&stats.size_history) {
            println!("\n  Size Trend:");
            for line in chart.to_lines() {
                println!("{line}");
            }
        }
    }

    if !stats.anomalies.is_empty() {
        println!("\n  {}", "Anomalies Detected:".yellow());
        for anomaly in &stats.anomalies {
            println!("     • {anomaly}");
        }
    }
}

fn print_health_summary(ctx: &Context, report: &HealthReport) {
    println!("\n\n{}", "Overall Health Score".bold());
    println!("{HEAVY_RULE}");

    let label = report.grade.to_string();
    let label = match report.score {
        70.. => label.green(),
        50..=69 => label.yellow(),
        30..=49 => label.bright_red(),
        _ => label.red(),
    };
    println!("\n  {label}");
    println!("  {} {}/100\n", report.score_bar(), report.score);

    if ctx.verbose {
        for deduction in &report.deductions {
            println!(
                "  -{:<3} {} ({:?})",
                deduction.points, deduction.database, deduction.reason
            );
        }
        if !report.deductions.is_empty() {
            println!();
        }
    }

    println!("  Total Backups: {}", report.total_count());
    println!("  Total Storage: {}", format_size(report.total_size()));
}

fn print_recommendations(report: &HealthReport) {
    println!("\n\n{}", "Recommendations".bold());
    println!("{HEAVY_RULE}");
    for (i, rec) in report.recommendations.iter().enumerate() {
        println!("\n  {}. {rec}", i + 1);
    }
    println!();
}

// ──────────────────── cleanup ────────────────────

fn run_cleanup(cli: &Cli, args: &CleanupArgs) -> Result<(), CliError> {
    let policy = RetentionPolicy::new(args.days, args.keep, args.dry_run)?;
    let ctx = Context::load(cli)?;
    let logger = ActivityLogger::open(&ctx.config.paths.activity_log);
    let executor = CleanupExecutor::new(Some(logger.clone()));
    let scanner = ArtifactScanner::new();
    let now = Utc::now();

    let databases = args.target.databases();
    let mut inventories = Vec::with_capacity(databases.len());
    let mut scan_failures = Vec::new();
    for database in databases {
        match scan_logged(&scanner, &ctx.layout, database, &logger) {
            Ok(inventory) => inventories.push(inventory),
            Err(err) => scan_failures.push(ScanFailure {
                database,
                error_code: err.code().to_string(),
                error: err.to_string(),
            }),
        }
    }
    ctx.report_scan_problems(&inventories, &scan_failures);

    if ctx.human() && policy.dry_run {
        println!("{}", "DRY RUN MODE - No files will be deleted".yellow());
        println!();
    }

    let mut reports = Vec::with_capacity(inventories.len());
    for inventory in &inventories {
        let plan = policy::select(inventory, &policy, now);
        let report = executor.execute(&plan);
        // Databases with nothing on disk get no section.
        if ctx.human() && !inventory.is_empty() {
            print_cleanup_section(&report, &policy, now, ctx.verbose);
        }
        reports.push(report);
    }
    logger.flush();

    let total_deleted: usize = reports.iter().map(|r| r.deleted_count).sum();
    let total_freed: u64 = reports.iter().map(|r| r.freed_bytes).sum();
    let total_failed: usize = reports.iter().map(|r| r.failures.len()).sum();

    match ctx.mode {
        OutputMode::Json => {
            let payload = json!({
                "command": "cleanup",
                "root": ctx.layout.root().to_string_lossy(),
                "policy": policy,
                "dry_run": policy.dry_run,
                "deleted_count": total_deleted,
                "freed_bytes": total_freed,
                "failed_count": total_failed,
                "databases": reports,
                "scan_failures": scan_failures,
            });
            write_json_line(&payload)?;
        }
        OutputMode::Human if ctx.quiet => {}
        OutputMode::Human => {
            println!("{}", "═".repeat(60));
            if policy.dry_run {
                println!(
                    "Would delete: {total_deleted} backup(s), freeing {}",
                    format_size(total_freed)
                );
                println!("\nRun without --dry-run to actually delete these backups.");
            } else if total_deleted > 0 {
                println!(
                    "{} {total_deleted} backup(s), freed {}",
                    "Deleted:".green(),
                    format_size(total_freed)
                );
            } else {
                println!("No backups needed cleanup");
            }
        }
    }

    if total_failed > 0 || !scan_failures.is_empty() {
        return Err(CliError::Partial(format!(
            "cleanup incomplete: {total_failed} deletion(s) failed, {} database(s) could not be scanned",
            scan_failures.len()
        )));
    }
    Ok(())
}

fn scan_logged(
    scanner: &ArtifactScanner,
    layout: &BackupLayout,
    database: DatabaseKind,
    logger: &ActivityLogger,
) -> Result<DatabaseInventory, BlhError> {
    let start = Instant::now();
    let inventory = scanner.scan(layout, database)?;
    #[allow(clippy::cast_possible_truncation)]
    let duration_ms = start.elapsed().as_millis() as u64;
    logger.log(&ActivityEvent::ScanCompleted {
        database,
        artifacts: inventory.len(),
        total_bytes: inventory.total_size(),
        skipped_paths: inventory.skipped.len(),
        duration_ms,
    });
    Ok(inventory)
}

fn print_cleanup_section(
    report: &CleanupReport,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
    verbose: bool,
) {
    println!("{}", format!("{} Backups", report.database).bold());
    println!("{LIGHT_RULE}");

    if report.is_noop() {
        println!("   No old backups to clean ({})", policy.mode);
        println!();
        return;
    }

    let verb = if report.dry_run {
        "Would delete:"
    } else {
        "Deleting:"
    };
    for outcome in &report.outcomes {
        println!(
            "   {verb} {:<35} {:>10}  {} old",
            outcome.name,
            format_size(outcome.size_bytes),
            format_age(now - outcome.modified_at),
        );
        match &outcome.status {
            CleanupStatus::Failed { error, .. } => {
                println!("      {} {error}", "Error:".red());
            }
            CleanupStatus::AlreadyGone => println!("      (already gone)"),
            CleanupStatus::Deleted | CleanupStatus::WouldDelete => {}
        }
    }
    println!(
        "   Total: {} backup(s), {}",
        report.deleted_count,
        format_size(report.freed_bytes)
    );
    if verbose {
        println!("   Took: {} ms", report.duration_ms);
    }
    println!();
}

// ──────────────────── latest ────────────────────

fn run_latest(cli: &Cli, args: &LatestArgs) -> Result<(), CliError> {
    let ctx = Context::load(cli)?;
    let inventory = ArtifactScanner::new().scan(&ctx.layout, args.database)?;
    ctx.report_scan_problems(std::slice::from_ref(&inventory), &[]);

    let latest = inventory.latest().ok_or_else(|| BlhError::NoArtifacts {
        database: args.database.label().to_string(),
    })?;

    match ctx.mode {
        OutputMode::Json => {
            let payload = json!({
                "command": "latest",
                "database": args.database,
                "artifact": latest,
            });
            write_json_line(&payload)?;
        }
        OutputMode::Human if ctx.quiet => println!("{}", latest.path.display()),
        OutputMode::Human => {
            println!("{}", latest.path.display());
            if ctx.verbose {
                println!(
                    "  {}  {}",
                    format_size(latest.size_bytes),
                    latest.modified_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
    }
    Ok(())
}

// ──────────────────── config ────────────────────

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
            let config = Context::load(cli)?.config;

            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Internal(format!("serialize config: {e}")))?;
                    println!("{toml_str}");
                }
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
                        println!("Configuration is valid.");
                        println!("  Source: {}", config.paths.config_file.display());
                        println!("  Hash: {hash}");
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": true,
                            "path": config.paths.config_file.to_string_lossy(),
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
                        eprintln!("Configuration is INVALID: {e}");
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

// ──────────────────── output helpers ────────────────────

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("BLH_OUTPUT_FORMAT").ok();
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
