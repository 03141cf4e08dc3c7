use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{Parser, Subcommand};
use jw_app::{AppError, AppResult, project_service, script, session};
use jw_core::SignalKind;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "joinwave")]
#[command(about = "joinwave - mock control system for touch-panel development", long_about = None)]
struct Cli {
    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a project file and report publish loops
    Validate {
        /// Path to the project file (.yaml or .json)
        project_path: PathBuf,
    },
    /// Print the join map
    Joins {
        /// Path to the project file (.yaml or .json)
        project_path: PathBuf,
        /// Group resolved addresses by kind
        #[arg(long)]
        by_kind: bool,
    },
    /// Run the project's script, then any extra steps
    Run {
        /// Path to the project file (.yaml or .json)
        project_path: PathBuf,
        /// Extra step: kind:address=value or wait:<ms>
        #[arg(long = "step", value_name = "STEP")]
        steps: Vec<String>,
        /// Print the transcript as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print bus state after the project's script has run
    State {
        /// Path to the project file (.yaml or .json)
        project_path: PathBuf,
        /// Only show joins of this kind
        #[arg(long)]
        kind: Option<String>,
        /// Skip the project's script
        #[arg(long)]
        no_script: bool,
        /// Print rows as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::Joins {
            project_path,
            by_kind,
        } => cmd_joins(&project_path, by_kind),
        Commands::Run {
            project_path,
            steps,
            json,
        } => cmd_run(&project_path, &steps, json),
        Commands::State {
            project_path,
            kind,
            no_script,
            json,
        } => cmd_state(&project_path, kind.as_deref(), no_script, json),
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_validate(project_path: &Path) -> AppResult<()> {
    println!("Validating project: {}", project_path.display());
    let project = project_service::load_project(project_path)?;
    let summary = project_service::summarize_project(&project)?;

    println!("✓ Project '{}' is valid (version {})", summary.name, summary.version);
    println!(
        "  {} joins ({} addresses), {} mocks, {} rules, {} script steps",
        summary.join_count,
        summary.address_count,
        summary.mock_count,
        summary.rule_count,
        summary.step_count
    );
    for warning in &summary.warnings {
        println!("  warning: {warning}");
    }
    Ok(())
}

fn cmd_joins(project_path: &Path, by_kind: bool) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    println!("{}", project_service::render_joins(&project, by_kind)?);
    Ok(())
}

fn cmd_run(project_path: &Path, extra: &[String], json: bool) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    let mut steps = project.script.clone();
    for step in extra {
        steps.push(script::parse_step(step)?);
    }
    debug!(
        project = %project_path.display(),
        scripted = project.script.len(),
        extra = extra.len(),
        "running steps"
    );

    let session = session::compile(project)?;
    let transcript = script::run(&session, &steps);

    if json {
        let text = serde_json::to_string_pretty(&transcript)
            .map_err(|e| AppError::InvalidInput(format!("Failed to render transcript: {e}")))?;
        println!("{text}");
    } else {
        println!("{transcript}");
    }

    let failed = transcript.failures().count();
    if failed > 0 {
        return Err(AppError::InvalidInput(format!("{failed} script steps failed")));
    }
    Ok(())
}

fn cmd_state(
    project_path: &Path,
    kind: Option<&str>,
    no_script: bool,
    json: bool,
) -> AppResult<()> {
    let kind = kind.map(SignalKind::from_str).transpose()?;
    let project = project_service::load_project(project_path)?;
    let session = session::compile(project)?;

    if !no_script {
        let steps = session.project().script.clone();
        debug!(steps = steps.len(), "replaying project script before reading state");
        let transcript = script::run(&session, &steps);
        for failure in transcript.failures() {
            eprintln!("warning: script step {} failed: {}", failure.index, failure.step);
        }
    }

    let rows = session.state_table(kind);
    debug!(rows = rows.len(), ?kind, "state table built");
    if json {
        let text = serde_json::to_string_pretty(&rows)
            .map_err(|e| AppError::InvalidInput(format!("Failed to render state: {e}")))?;
        println!("{text}");
        return Ok(());
    }

    if rows.is_empty() {
        println!("No joins have a value");
    }
    for row in rows {
        let key = row.key.to_string();
        let value = row.value.to_string();
        if row.paths.is_empty() {
            println!("  {key:<16} {value}");
        } else {
            println!("  {key:<16} {value:<12} {}", row.paths.join(", "));
        }
    }
    Ok(())
}
