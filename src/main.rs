mod cli;

use anyhow::Context;
use cli::{Args, Command};
use depscan::application::dto::{ScanHandle, ScanOutcome, ScanRequest};
use depscan::config::PipelineConfig;
use depscan::context::AppContext;
use depscan::scan_pipeline::domain::DeleteOutcome;
use depscan::shared::{ExitCode, Result};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    init_tracing();

    let args = Args::parse_args();

    match run(args).await {
        Ok(code) => process::exit(code.as_i32()),
        Err(e) => {
            eprintln!("\n❌ An error occurred:\n");
            eprintln!("{}", e);

            // Display error chain
            let mut source = e.source();
            while let Some(err) = source {
                eprintln!("\nCaused by: {}", err);
                source = err.source();
            }

            eprintln!();
            process::exit(ExitCode::ApplicationError.as_i32());
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "depscan=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(args: Args) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("Failed to determine working directory")?;
    let config = PipelineConfig::load(args.config.as_deref(), &cwd)?;
    let context = AppContext::initialize(config).await?;

    match args.command {
        Command::Scan {
            archives,
            owner,
            compliance,
            json,
        } => scan(&context, archives, owner, compliance, json).await,
        Command::History { owner, json } => {
            let scans = context.manage_scans().history(owner.as_deref()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&scans)?);
            } else {
                print!("{}", cli::format_history(&scans));
            }
            Ok(ExitCode::Success)
        }
        Command::Stats { owner, json } => {
            let scans = context.manage_scans().history(owner.as_deref()).await?;
            let aggregator = context.stats();
            let stats = tokio::task::block_in_place(|| aggregator.aggregate(&scans));
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print!("{}", cli::format_stats(&stats));
            }
            Ok(ExitCode::Success)
        }
        Command::Report { scan_id, principal } => {
            match context
                .manage_scans()
                .report_for_download(&scan_id, &principal)
                .await?
            {
                Some(path) => {
                    println!("{}", path.display());
                    Ok(ExitCode::Success)
                }
                None => anyhow::bail!(
                    "No report available for scan {}\n\n💡 Hint: Reports exist only for completed scans whose reports were not deleted.",
                    scan_id
                ),
            }
        }
        Command::DeleteSource { scan_id, principal } => {
            let outcome = context.manage_scans().delete_source(&scan_id, &principal).await?;
            print_delete_outcome(outcome, "source", &scan_id.to_string());
            Ok(ExitCode::Success)
        }
        Command::DeleteReport { scan_id, principal } => {
            let outcome = context.manage_scans().delete_reports(&scan_id, &principal).await?;
            print_delete_outcome(outcome, "report", &scan_id.to_string());
            Ok(ExitCode::Success)
        }
    }
}

async fn scan(
    context: &AppContext,
    archives: Vec<PathBuf>,
    owner: String,
    compliance: bool,
    json: bool,
) -> Result<ExitCode> {
    let orchestrator = context.orchestrator()?;

    let mut submitted: Vec<(String, ScanHandle)> = Vec::with_capacity(archives.len());
    for path in &archives {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read archive: {}", path.display()))?;
        let filename = display_name(path);
        let handle = orchestrator
            .submit(ScanRequest::new(owner.clone(), filename.clone(), compliance, bytes))
            .await
            .with_context(|| format!("Failed to submit scan for {}", path.display()))?;
        submitted.push((filename, handle));
    }

    // Ctrl-C cancels every scan; each one still reaches `failed`
    let canceller = orchestrator.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let cancelled = canceller.cancel_all();
            tracing::warn!(cancelled, "Interrupted, cancelling in-flight scans");
        }
    });

    let (names, handles): (Vec<String>, Vec<ScanHandle>) = submitted.into_iter().unzip();
    let outcomes: Vec<ScanOutcome> =
        futures::future::join_all(handles.into_iter().map(ScanHandle::wait)).await;
    signal_task.abort();

    if json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    } else {
        for (name, outcome) in names.iter().zip(&outcomes) {
            println!("{}", cli::format_outcome(outcome, name));
        }
    }

    if outcomes.iter().all(ScanOutcome::is_completed) {
        Ok(ExitCode::Success)
    } else {
        Ok(ExitCode::ScanFailed)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_delete_outcome(outcome: DeleteOutcome, kind: &str, scan_id: &str) {
    match outcome {
        DeleteOutcome::Deleted => println!("🗑️  Deleted {} artifacts of scan {}", kind, scan_id),
        DeleteOutcome::NothingToDelete => {
            println!("Nothing to delete: no {} artifacts for scan {}", kind, scan_id)
        }
    }
}
