#![deny(missing_docs)]
//! runtcheck command-line interface.
//!
//! Reports whether protocol-server repositories are runts or state of the
//! art, one at a time or across a whole directory tree.

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, warn};
use runtcheck_core::{
    Baseline, CacheConfig, CacheKey, DEFAULT_CACHE_TTL, DEFAULT_MAX_FILES, Deduction,
    ExtractorConfig, FileSystem, FleetSummary, RepoOutcome, Rule, RuleCatalog, ScanCache, ScanMode,
    ScanResult, Scanner, StdFileSystem, render_fleet_markdown, render_json, render_status_markdown,
    render_value,
};
use std::collections::HashMap;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};

pub(crate) type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser, Debug)]
#[command(name = "runtcheck", version, about = "Protocol-server compliance audit")]
struct Cli {
    #[command(flatten)]
    settings: SettingsArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Debug)]
struct SettingsArgs {
    /// Directory holding cached scan results.
    #[arg(long, global = true, env = "RUNTCHECK_CACHE_DIR")]
    cache_dir: Option<PathBuf>,
    /// Seconds a cached result stays fresh.
    #[arg(
        long,
        global = true,
        env = "RUNTCHECK_CACHE_TTL",
        default_value_t = DEFAULT_CACHE_TTL.as_secs()
    )]
    cache_ttl: u64,
    /// Rescan every repository without reading or writing the cache.
    #[arg(long, global = true)]
    no_cache: bool,
    /// Maximum number of files walked per repository.
    #[arg(long, global = true, env = "RUNTCHECK_MAX_FILES", default_value_t = DEFAULT_MAX_FILES)]
    max_files: usize,
}

#[derive(Args, Clone, Debug)]
struct ModeArgs {
    /// Rule set to evaluate.
    #[arg(long, value_enum, default_value_t = ModeArg::Fast)]
    mode: ModeArg,
}

#[derive(ValueEnum, Copy, Clone, Debug, Eq, PartialEq)]
enum ModeArg {
    Fast,
    Thorough,
}

impl From<ModeArg> for ScanMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Fast => ScanMode::Fast,
            ModeArg::Thorough => ScanMode::Thorough,
        }
    }
}

#[derive(Args, Clone, Debug)]
struct BatchArgs {
    /// Directory to search for repositories.
    #[arg(long)]
    root: PathBuf,
    /// How many directory levels below the root to search.
    #[arg(long, default_value_t = 2)]
    max_depth: usize,
    /// Maximum number of repositories scanned at once.
    #[arg(short = 'j', long, default_value_t = 5)]
    concurrency: usize,
    /// Seconds allowed per repository before it is reported as failed.
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,
}

#[derive(Args, Clone, Debug)]
struct OutputArgs {
    /// Output format for report data.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Write the report to a file instead of stdout.
    #[arg(long = "report-output")]
    report_output: Option<PathBuf>,
}

#[derive(ValueEnum, Copy, Clone, Debug, Eq, PartialEq)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Report the status of one repository.
    Status {
        /// Repository path.
        #[arg(long, default_value = ".")]
        path: PathBuf,
        #[command(flatten)]
        mode: ModeArgs,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// Discover and scan every repository under a directory.
    Scan {
        #[command(flatten)]
        batch: BatchArgs,
        #[command(flatten)]
        mode: ModeArgs,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// List the compliance rules.
    Rules {
        /// Only list rules evaluated in this mode.
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// Inspect or clear cached results.
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// Remove cached results, for one repository or all of them.
    Clear {
        /// Only drop results for this repository.
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the cache location and size.
    Stats,
    /// Render the cached result for one repository.
    Show {
        /// Repository path.
        #[arg(long, default_value = ".")]
        path: PathBuf,
        #[command(flatten)]
        mode: ModeArgs,
    },
}

#[cfg(not(test))]
#[tokio::main]
async fn main() -> CliResult<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    run(Cli::parse()).await
}

#[cfg(test)]
fn main() {}

async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Status { path, mode, report } => {
            let scanner = Arc::new(build_scanner(&cli.settings)?);
            run_status(scanner, path, mode.mode.into(), report).await?
        }
        Commands::Scan {
            batch,
            mode,
            report,
        } => {
            let scanner = Arc::new(build_scanner(&cli.settings)?);
            run_scan(scanner, batch, mode.mode.into(), report).await?
        }
        Commands::Rules { mode, report } => run_rules(mode.map(ScanMode::from), report).await?,
        Commands::Cache { action } => {
            let cache = ScanCache::new(cache_config(&cli.settings));
            let message = run_cache(&cache, action)?;
            println!("{message}");
        }
    }

    Ok(())
}

fn build_scanner(settings: &SettingsArgs) -> CliResult<Scanner<StdFileSystem>> {
    let config = ExtractorConfig::default().with_max_files(settings.max_files);
    let catalog = RuleCatalog::standard(&Baseline::default())?;
    let scanner = Scanner::new(StdFileSystem::new(), config, catalog);
    if settings.no_cache {
        return Ok(scanner);
    }
    Ok(scanner.with_cache(ScanCache::new(cache_config(settings))))
}

fn cache_config(settings: &SettingsArgs) -> CacheConfig {
    let root = settings
        .cache_dir
        .clone()
        .unwrap_or_else(|| CacheConfig::default().root);
    CacheConfig::new(root, Duration::from_secs(settings.cache_ttl))
}

async fn run_status(
    scanner: Arc<Scanner<StdFileSystem>>,
    path: PathBuf,
    mode: ScanMode,
    report: OutputArgs,
) -> CliResult<()> {
    let result = tokio::task::spawn_blocking(move || scanner.status(&path, mode)).await??;
    emit_status(&result, &report).await
}

async fn run_scan<F>(
    scanner: Arc<Scanner<F>>,
    batch: BatchArgs,
    mode: ScanMode,
    report: OutputArgs,
) -> CliResult<()>
where
    F: FileSystem + Send + Sync + 'static,
{
    let root = batch.root.clone();
    let max_depth = batch.max_depth;
    let discovery = scanner.clone();
    let repos =
        tokio::task::spawn_blocking(move || discovery.discover(&root, max_depth)).await??;
    if repos.is_empty() {
        println!("No repositories found under {}.", batch.root.display());
        return Ok(());
    }

    let timeout = Duration::from_secs(batch.timeout_secs);
    let outcomes = scan_fleet(scanner, repos, mode, batch.concurrency, timeout).await?;
    emit_fleet(&outcomes, &report).await
}

/// Scan `repos` with at most `concurrency` in flight; every repository yields an outcome.
async fn scan_fleet<F>(
    scanner: Arc<Scanner<F>>,
    repos: Vec<PathBuf>,
    mode: ScanMode,
    concurrency: usize,
    timeout: Duration,
) -> CliResult<Vec<RepoOutcome>>
where
    F: FileSystem + Send + Sync + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let mut in_flight = HashMap::new();

    for repo in repos {
        let permit = semaphore.clone().acquire_owned().await?;
        let scanner = scanner.clone();
        let path = repo.clone();
        let handle = tasks.spawn(async move {
            let _permit = permit;
            scan_repo(scanner, path, mode, timeout).await
        });
        in_flight.insert(handle.id(), repo);
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((id, outcome)) => {
                in_flight.remove(&id);
                outcomes.push(outcome);
            }
            Err(err) => outcomes.push(outcome_from_task_error(&mut in_flight, err)),
        }
    }
    outcomes.sort_by(|left, right| left.path.cmp(&right.path));
    Ok(outcomes)
}

async fn scan_repo<F>(
    scanner: Arc<Scanner<F>>,
    repo: PathBuf,
    mode: ScanMode,
    timeout: Duration,
) -> RepoOutcome
where
    F: FileSystem + Send + Sync + 'static,
{
    let path = repo.clone();
    let task = tokio::task::spawn_blocking(move || scanner.status(&path, mode));
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(result))) => RepoOutcome::scanned(repo, result),
        Ok(Ok(Err(err))) => {
            if err.is_repo_failure() {
                info!("{} not scanned: {err}", repo.display());
            } else {
                warn!("scan of {} failed: {err}", repo.display());
            }
            RepoOutcome::failed(repo, err.to_string())
        }
        Ok(Err(err)) => RepoOutcome::failed(repo, format!("scan task failed: {err}")),
        Err(_) => {
            warn!(
                "scan of {} exceeded {}s",
                repo.display(),
                timeout.as_secs()
            );
            RepoOutcome::failed(repo, format!("timed out after {}s", timeout.as_secs()))
        }
    }
}

fn outcome_from_task_error(
    in_flight: &mut HashMap<Id, PathBuf>,
    error: JoinError,
) -> RepoOutcome {
    let repo = in_flight.remove(&error.id()).unwrap_or_default();
    warn!("scan task for {} failed: {error}", repo.display());
    RepoOutcome::failed(repo, format!("scan task failed: {error}"))
}

async fn run_rules(mode: Option<ScanMode>, report: OutputArgs) -> CliResult<()> {
    let catalog = RuleCatalog::standard(&Baseline::default())?;
    let catalog = match mode {
        Some(mode) => catalog.for_mode(mode),
        None => catalog,
    };
    let contents = match report.format {
        OutputFormat::Text => render_rules_text(catalog.rules()),
        OutputFormat::Markdown => render_rules_markdown(catalog.rules()),
        OutputFormat::Json => render_json(catalog.rules())?,
    };
    emit_output(&report, contents).await
}

fn run_cache(cache: &ScanCache, action: CacheCommand) -> CliResult<String> {
    match action {
        CacheCommand::Clear { path: Some(path) } => {
            let mut removed = 0;
            for mode in [ScanMode::Fast, ScanMode::Thorough] {
                if cache.invalidate(&CacheKey::derive(&path, mode))? {
                    removed += 1;
                }
            }
            Ok(format!(
                "Removed {removed} cached result(s) for {}.",
                path.display()
            ))
        }
        CacheCommand::Clear { path: None } => {
            let removed = cache.clear()?;
            Ok(format!(
                "Removed {removed} cached result(s) from {}.",
                cache.root().display()
            ))
        }
        CacheCommand::Stats => {
            let stats = cache.stats()?;
            Ok(format!(
                "Cache: {}\nEntries: {}\nSize: {} bytes\nTTL: {}s",
                stats.root.display(),
                stats.entries,
                stats.bytes,
                cache.ttl().as_secs()
            ))
        }
        CacheCommand::Show { path, mode } => {
            let mode = ScanMode::from(mode.mode);
            let entry = cache.entry_path(&CacheKey::derive(&path, mode));
            let raw = match std::fs::read_to_string(&entry) {
                Ok(raw) => raw,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    return Ok(format!("No cached {mode} result for {}.", path.display()));
                }
                Err(err) => return Err(err.into()),
            };
            let payload = serde_json::from_str::<serde_json::Value>(&raw)
                .map(|entry| entry["result"].clone())
                .unwrap_or(serde_json::Value::Null);
            Ok(render_value(&payload))
        }
    }
}

async fn emit_status(result: &ScanResult, output: &OutputArgs) -> CliResult<()> {
    let contents = match output.format {
        OutputFormat::Text => render_status_text(result),
        OutputFormat::Markdown => render_status_markdown(result),
        OutputFormat::Json => render_json(result)?,
    };
    emit_output(output, contents).await
}

async fn emit_fleet(outcomes: &[RepoOutcome], output: &OutputArgs) -> CliResult<()> {
    let contents = match output.format {
        OutputFormat::Text => render_fleet_text(outcomes),
        OutputFormat::Markdown => render_fleet_markdown(outcomes),
        OutputFormat::Json => render_json(&FleetReport {
            summary: FleetSummary::from_outcomes(outcomes),
            repositories: outcomes,
        })?,
    };
    emit_output(output, contents).await
}

#[derive(serde::Serialize)]
struct FleetReport<'a> {
    summary: FleetSummary,
    repositories: &'a [RepoOutcome],
}

async fn emit_output(output: &OutputArgs, contents: String) -> CliResult<()> {
    if let Some(path) = &output.report_output {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, contents).await?;
    } else {
        print!("{contents}");
    }
    Ok(())
}

fn render_status_text(result: &ScanResult) -> String {
    let mut output = String::new();
    append_result_text(&mut output, &result.facts.path, result);
    if !result.warnings.is_empty() {
        let _ = writeln!(output, "Warnings:");
        for warning in &result.warnings {
            let _ = writeln!(output, "- {warning}");
        }
    }
    output
}

fn render_fleet_text(outcomes: &[RepoOutcome]) -> String {
    let mut output = String::new();
    for outcome in outcomes {
        match (&outcome.result, &outcome.error) {
            (Some(result), _) => append_result_text(&mut output, &outcome.path, result),
            (None, error) => {
                let _ = writeln!(output, "Path: {}", outcome.path.display());
                let _ = writeln!(
                    output,
                    "Status: failed ({})",
                    error.as_deref().unwrap_or("no result")
                );
            }
        }
        let _ = writeln!(output);
    }

    let summary = FleetSummary::from_outcomes(outcomes);
    let _ = writeln!(
        output,
        "Summary: {} repositories, {} runt, {} SOTA, {} failed",
        summary.total, summary.runts, summary.sota, summary.failed
    );
    if let Some(mean) = summary.mean_score {
        let _ = writeln!(output, "Mean score: {mean:.1}");
    }
    output
}

fn append_result_text(output: &mut String, path: &Path, result: &ScanResult) {
    let status = if result.is_runt { "RUNT" } else { "SOTA" };
    let _ = writeln!(output, "Path: {}", path.display());
    let _ = writeln!(
        output,
        "Status: {status} (score {}/100, tier {}, mode {})",
        result.score, result.tier, result.mode
    );
    let _ = writeln!(
        output,
        "Framework: {}, tools: {}",
        result
            .facts
            .framework_version
            .as_deref()
            .unwrap_or("not detected"),
        result.facts.tool_count
    );
    if result.violations.is_empty() {
        let _ = writeln!(output, "Violations: none");
        return;
    }
    let _ = writeln!(output, "Violations:");
    for violation in &result.violations {
        let _ = writeln!(
            output,
            "- [{}] {} (-{}): {}",
            violation.severity, violation.rule_id, violation.deduction, violation.message
        );
    }
}

fn render_rules_text(rules: &[Rule]) -> String {
    let mut output = String::new();
    for rule in rules {
        let _ = writeln!(
            output,
            "{:<32} {:<8} {:<13} {}",
            rule.id,
            rule.severity,
            rule.category,
            describe_deduction(&rule.deduction)
        );
    }
    output
}

fn render_rules_markdown(rules: &[Rule]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# runtcheck rules\n");
    let _ = writeln!(output, "| Rule | Severity | Category | Deduction | Remediation |");
    let _ = writeln!(output, "| --- | --- | --- | --- | --- |");
    for rule in rules {
        let _ = writeln!(
            output,
            "| `{}` | {} | {} | {} | {} |",
            rule.id,
            rule.severity,
            rule.category,
            describe_deduction(&rule.deduction),
            rule.remediation
        );
    }
    output
}

fn describe_deduction(deduction: &Deduction) -> String {
    match deduction {
        Deduction::Fixed { points } => format!("-{points}"),
        Deduction::Graduated {
            above,
            per_unit,
            max,
            ..
        } => format!("-{per_unit} per unit above {above} (max {max})"),
    }
}
