// crates/intel-gate-cli/src/main.rs
// ============================================================================
// Module: Intel Gate CLI Entry Point
// Description: Command dispatcher for export and gateway processes.
// Purpose: Run the orchestrator, the gateway, and config validation.
// Dependencies: clap, intel-gate-config, intel-gate-export, intel-gate-gateway, tokio
// ============================================================================

//! ## Overview
//! The `intel-gate` binary runs the two deployable processes of the
//! dissemination pipeline and a config check. `export` runs the orchestrator,
//! periodically by default or once with `--once`. `serve` runs the HTTP
//! gateway over the share tree. `check-config` loads and validates the
//! configuration. Every command loads config first and fails closed: an
//! invalid policy set never exports or serves.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use clap::Subcommand;
use intel_gate_config::ApiKeyRegistry;
use intel_gate_config::IntelGateConfig;
use intel_gate_config::PolicyStore;
use intel_gate_export::ArtifactTree;
use intel_gate_export::ExportAuditSink;
use intel_gate_export::ExportOrchestrator;
use intel_gate_export::ExportRunner;
use intel_gate_export::StderrExportAuditSink;
use intel_gate_gateway::GatewayState;
use intel_gate_gateway::ShareAuthz;
use intel_gate_gateway::StderrGatewayAuditSink;
use intel_gate_source::HttpSourceClient;
use thiserror::Error;
use tokio::sync::watch;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "intel-gate", version, disable_help_subcommand = true)]
struct Cli {
    /// Config file path; falls back to `INTEL_GATE_CONFIG`, then the default.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the export orchestrator.
    Export {
        /// Run a single cycle and exit instead of running periodically.
        #[arg(long)]
        once: bool,
    },
    /// Run the serving gateway.
    Serve,
    /// Load and validate the configuration, then print a summary.
    CheckConfig,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI result alias.
type CliResult<T> = Result<T, CliError>;

/// CLI failure with a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// User-facing failure description.
    message: String,
}

impl CliError {
    /// Creates a CLI error from a message.
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let config = IntelGateConfig::load(cli.config.as_deref())
        .map_err(|err| CliError::new(format!("config load failed: {err}")))?;
    match cli.command {
        Commands::Export {
            once,
        } => command_export(config, once).await,
        Commands::Serve => command_serve(config).await,
        Commands::CheckConfig => command_check_config(&config),
    }
}

// ============================================================================
// SECTION: Export Command
// ============================================================================

/// Executes the `export` command.
async fn command_export(config: IntelGateConfig, once: bool) -> CliResult<ExitCode> {
    let policy = PolicyStore::from_config(&config)
        .map_err(|err| CliError::new(format!("policy compile failed: {err}")))?;
    let source = HttpSourceClient::new(&config.source)
        .map_err(|err| CliError::new(format!("source client init failed: {err}")))?;
    let audit: Arc<dyn ExportAuditSink> = Arc::new(StderrExportAuditSink);
    let orchestrator = Arc::new(ExportOrchestrator::new(
        policy,
        Arc::new(source),
        ArtifactTree::new(&config.export.share_dir),
        Arc::clone(&audit),
        config.export.lookback_days,
        config.export.fetch_limit,
    ));

    if once {
        let report = tokio::task::spawn_blocking(move || orchestrator.run_cycle())
            .await
            .map_err(|err| CliError::new(format!("cycle join failed: {err}")))?
            .map_err(|err| CliError::new(format!("export cycle failed: {err}")))?;
        let summary = format!(
            "cycle {} complete: {} published, {} failed, {} objects skipped",
            report.generated_at,
            report.published.len(),
            report.failed.len(),
            report.skipped_objects
        );
        write_stdout_line(&summary)
            .map_err(|err| CliError::new(format!("stdout write failed: {err}")))?;
        return Ok(if report.failed.is_empty() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let interval = Duration::from_secs(config.export.interval_secs);
    let runner = ExportRunner::new(orchestrator, interval, audit);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner_task = tokio::spawn(async move {
        runner.run(shutdown_rx).await;
    });
    wait_for_shutdown().await?;
    let _ = shutdown_tx.send(true);
    runner_task
        .await
        .map_err(|err| CliError::new(format!("export runner failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(config: IntelGateConfig) -> CliResult<ExitCode> {
    // Policy is compiled even though the gateway only needs keys, so a
    // broken audience set refuses to serve.
    let _policy = PolicyStore::from_config(&config)
        .map_err(|err| CliError::new(format!("policy compile failed: {err}")))?;
    let bind: SocketAddr = config
        .gateway
        .bind
        .parse()
        .map_err(|_| CliError::new("invalid gateway bind address".to_string()))?;
    let state = Arc::new(GatewayState::new(
        ArtifactTree::new(&config.export.share_dir),
        ShareAuthz::new(ApiKeyRegistry::from_config(&config)),
        Arc::new(StderrGatewayAuditSink),
    ));
    tokio::select! {
        served = intel_gate_gateway::serve(state, bind) => {
            served.map_err(|err| CliError::new(format!("gateway failed: {err}")))?;
        }
        shutdown = wait_for_shutdown() => {
            shutdown?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Check Config Command
// ============================================================================

/// Executes the `check-config` command.
fn command_check_config(config: &IntelGateConfig) -> CliResult<ExitCode> {
    let policy = PolicyStore::from_config(config)
        .map_err(|err| CliError::new(format!("policy compile failed: {err}")))?;
    let summary = format!(
        "config ok: {} audiences, share_dir={}, gateway={}, interval={}s, lookback={}d",
        policy.len(),
        config.export.share_dir.display(),
        config.gateway.bind,
        config.export.interval_secs,
        config.export.lookback_days
    );
    write_stdout_line(&summary)
        .map_err(|err| CliError::new(format!("stdout write failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Waits for Ctrl-C.
async fn wait_for_shutdown() -> CliResult<()> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|err| CliError::new(format!("signal handler failed: {err}")))
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Reports a fatal error and returns the failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
