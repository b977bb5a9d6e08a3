//! SCORM Processor - command-line entry point.
//!
//! # Overview
//!
//! This binary wraps the package transformation pipeline. It initializes:
//! - Configuration loading ([`ConfigManager`]: YAML file + environment)
//! - Logging infrastructure (daily rotating file + optional console output)
//! - Tokio runtime (jobs run on its blocking pool, progress is streamed back)
//!
//! # Commands
//!
//! - `process`: convert one archive and stream its progress to stdout
//! - `batch`: convert every `.zip` in a folder and print a summary
//! - `collect`: pack finished outputs into one archive and delete them
//! - `purge`: empty the upload and processed directories
//!
//! Input archives are copied into the upload directory before processing,
//! so the files passed on the command line are never consumed.

use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use glob::{MatchOptions, Pattern};
use scorm_processor::workspace::BATCH_ARCHIVE_NAME;
use scorm_processor::{
    APP_NAME, ConfigManager, JobReport, LogoAsset, Orchestrator, OutputLocks, PackageJob,
    TargetVersion, VERSION, Workspace,
};
use std::fs;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "scorm-processor", version, about = "Convert SCORM packages between SCORM 1.2 and 2004")]
struct Cli {
    /// Directory holding scorm-processor.yaml
    #[arg(long, default_value = ".")]
    config_dir: Utf8PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a single package
    Process {
        archive: Utf8PathBuf,

        /// Target SCORM version: 1.2 or 2004
        #[arg(long)]
        target: TargetVersion,

        /// Replace scorm_2004.js with the customer reference copy
        #[arg(long)]
        customer_variant: bool,

        /// Branding logo to place into the package
        #[arg(long)]
        logo: Option<Utf8PathBuf>,

        #[arg(long)]
        license_key: Option<String>,
    },

    /// Convert every .zip package in a folder
    Batch {
        dir: Utf8PathBuf,

        #[arg(long)]
        target: TargetVersion,

        #[arg(long)]
        customer_variant: bool,
    },

    /// Pack processed outputs into one archive and remove them
    Collect {
        #[arg(required = true)]
        names: Vec<String>,

        #[arg(long, default_value = BATCH_ARCHIVE_NAME)]
        out: Utf8PathBuf,
    },

    /// Delete everything in the upload and processed directories
    Purge,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::new(&cli.config_dir)?;
    let config = config_manager.load()?;

    let _log_guard = scorm_processor::logging::setup_logging(&config.logging)?;
    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    scorm_processor::config::ensure_directories(&config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("scorm-worker")
        .build()
        .context("Failed to create tokio runtime")?;

    let output_locks = Arc::new(OutputLocks::new());
    let workspace = Workspace::with_output_locks(&config, Arc::clone(&output_locks));
    let orchestrator = Orchestrator::new(Arc::new(config)).with_output_locks(output_locks);

    let result = runtime.block_on(run_command(cli.command, &orchestrator, &workspace));

    orchestrator.metrics().log_summary();
    runtime.shutdown_timeout(Duration::from_secs(5));
    tracing::info!("Shutdown complete");

    result
}

async fn run_command(
    command: Commands,
    orchestrator: &Orchestrator,
    workspace: &Workspace,
) -> Result<ExitCode> {
    match command {
        Commands::Process {
            archive,
            target,
            customer_variant,
            logo,
            license_key,
        } => {
            let logo = logo.as_deref().map(read_logo).transpose()?;
            let job = workspace
                .stage_upload(&archive)?
                .into_job(target)
                .with_customer_variant(customer_variant)
                .with_logo(logo)
                .with_license_key(license_key);
            let report = run_streaming(orchestrator, job).await?;
            Ok(exit_code(report.succeeded()))
        }
        Commands::Batch {
            dir,
            target,
            customer_variant,
        } => run_batch(orchestrator, workspace, &dir, target, customer_variant).await,
        Commands::Collect { names, out } => {
            let batch = workspace.collect_batch(&names)?;
            fs::write(&out, &batch.archive)
                .with_context(|| format!("Failed to write {}", out))?;
            println!("Collected {} file(s) into {}", batch.collected.len(), out);
            for name in &batch.missing {
                println!("  -> Not found: {}", name);
            }
            Ok(exit_code(!batch.collected.is_empty()))
        }
        Commands::Purge => {
            let report = workspace.purge()?;
            println!("Removed {} entries.", report.removed);
            for failure in &report.failures {
                println!("  -> Could not remove: {}", failure);
            }
            Ok(exit_code(report.failures.is_empty()))
        }
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn read_logo(path: &Utf8Path) -> Result<LogoAsset> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read logo {}", path))?;
    Ok(LogoAsset::new(path.file_name().unwrap_or_default(), bytes))
}

/// Run one job, printing each progress line as it arrives
async fn run_streaming(orchestrator: &Orchestrator, job: PackageJob) -> Result<JobReport> {
    let (mut events, handle) = orchestrator.spawn(job);
    while let Some(event) = events.recv().await {
        println!("{}", event.to_line());
    }
    handle.await.context("Job task failed")
}

async fn run_batch(
    orchestrator: &Orchestrator,
    workspace: &Workspace,
    dir: &Utf8Path,
    target: TargetVersion,
    customer_variant: bool,
) -> Result<ExitCode> {
    if !dir.is_dir() {
        bail!("Not a directory: {}", dir);
    }

    let pattern = format!("{}/*.zip", Pattern::escape(dir.as_str()));
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };
    let mut archives: Vec<Utf8PathBuf> = glob::glob_with(&pattern, options)
        .with_context(|| format!("Invalid search pattern {}", pattern))?
        .filter_map(|entry| match entry {
            Ok(path) => Utf8PathBuf::from_path_buf(path).ok(),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .collect();
    archives.sort();

    if archives.is_empty() {
        println!("No .zip packages found in {}", dir);
        return Ok(ExitCode::SUCCESS);
    }

    let mut reports = Vec::with_capacity(archives.len());
    for (index, archive) in archives.iter().enumerate() {
        println!("\n=== [{}/{}] {} ===", index + 1, archives.len(), archive);
        let job = workspace
            .stage_upload(archive)?
            .into_job(target)
            .with_customer_variant(customer_variant);
        reports.push(run_streaming(orchestrator, job).await?);
    }

    print_summary(&reports);
    Ok(exit_code(reports.iter().all(JobReport::succeeded)))
}

fn print_summary(reports: &[JobReport]) {
    let succeeded: Vec<&JobReport> = reports.iter().filter(|r| r.succeeded()).collect();
    let failed: Vec<&JobReport> = reports.iter().filter(|r| !r.succeeded()).collect();
    let with_problems = succeeded.iter().filter(|r| !r.is_clean()).count();

    println!("\n=== Batch summary ===");
    println!("Succeeded: {} ({} with problems)", succeeded.len(), with_problems);
    for report in &succeeded {
        let output = report
            .output
            .as_ref()
            .map(|p| p.as_str())
            .unwrap_or_default();
        if report.is_clean() {
            println!("  -> {} => {}", report.original_name, output);
            continue;
        }
        println!(
            "  -> {} => {} ({} warning(s), {} error(s))",
            report.original_name,
            output,
            report.warnings.len(),
            report.errors.len()
        );
        for error in &report.errors {
            println!("       ! {}", error);
        }
        for warning in &report.warnings {
            println!("       - {}", warning);
        }
    }
    println!("Failed: {}", failed.len());
    for report in &failed {
        println!(
            "  -> {}: {}",
            report.original_name,
            report.failure().unwrap_or_default()
        );
    }
}
