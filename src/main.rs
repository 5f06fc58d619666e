//! scopeup - batch component updater CLI tool
//!
//! Advances a set of components to new versions together, pins their
//! dependencies to exact versions, builds them and commits the batch.

use clap::Parser;
use log::{debug, LevelFilter};
use scopeup::build::{BuildPipeline, CommandPipeline, NoopPipeline};
use scopeup::cli::{read_request, CliArgs};
use scopeup::domain::{BuildStatus, UpdateOutcome};
use scopeup::error::AppError;
use scopeup::graph::ManifestGraph;
use scopeup::orchestrator::{OrchestratorConfig, UpdateOrchestrator};
use scopeup::output::{create_formatter, OutputConfig};
use scopeup::scope::{LocalScope, OfflineRemote};
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

/// Build failed but the batch was committed
const EXIT_BUILD_FAILED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(&args);

    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    debug!("scopeup v{}", env!("CARGO_PKG_VERSION"));
    debug!("Request: {}", args.request.display());
    debug!("Scope: {}", args.scope.display());

    let output_config = OutputConfig::from_cli(args.json, args.verbose, args.quiet);
    let formatter = create_formatter(output_config);
    let mut stdout = io::stdout().lock();

    let outcome = match update(&args).await {
        Ok(outcome) => outcome,
        Err(e) => {
            if args.json {
                formatter.format_error(&e.to_string(), &mut stdout)?;
                stdout.flush()?;
                return Ok(ExitCode::FAILURE);
            }
            return Err(e.into());
        }
    };

    formatter.format(&outcome, &mut stdout)?;
    stdout.flush()?;

    if outcome.build_status() == BuildStatus::Failed {
        Ok(ExitCode::from(EXIT_BUILD_FAILED))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Read the request, wire the collaborators and run the batch
async fn update(args: &CliArgs) -> Result<UpdateOutcome, AppError> {
    let request = read_request(&args.request)?;
    let options = args.update_options();

    let scope = Arc::new(LocalScope::open(&args.scope)?);
    let remote = Arc::new(OfflineRemote::new());
    let pipeline: Arc<dyn BuildPipeline> = match args.build_cmd {
        Some(ref command) => Arc::new(CommandPipeline::from_command_line(command)?),
        None => Arc::new(NoopPipeline),
    };
    let config = OrchestratorConfig {
        show_progress: args.show_progress(),
        ..Default::default()
    };
    let orchestrator = UpdateOrchestrator::new(
        scope,
        remote.clone(),
        remote,
        pipeline,
        Arc::new(ManifestGraph::new()),
    )
    .with_config(config);

    Ok(orchestrator.run(&request, &options).await?)
}

fn init_logging(args: &CliArgs) {
    let verbose = args.verbose;
    let mut builder = env_logger::builder();
    builder
        .filter_level(if args.verbose {
            LevelFilter::Debug
        } else if args.quiet {
            LevelFilter::Warn
        } else {
            LevelFilter::Info
        })
        .format(move |buf, record| {
            let level = record.level();
            let style = &buf.default_level_style(level);
            if verbose {
                writeln!(
                    buf,
                    "{} [{style}{level}{style:#}] {}",
                    buf.timestamp(),
                    record.args()
                )
            } else {
                writeln!(buf, "[{style}{level}{style:#}] {}", record.args())
            }
        });

    builder.init();
}
