pub mod ai;
pub mod config;
pub mod document;
pub mod error;
pub mod extraction;
pub mod session;

use anyhow::Context;
use clap::Parser;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use ai::{AnalysisResponse, Mode, VisionModel};
use config::AppConfig;
use document::Document;
use extraction::Normalized;
use session::{render, SessionManager, ViewState};

#[derive(Parser, Debug)]
#[command(name = "summa", about = "Extract expenses or itemized receipts from documents with a vision LLM.")]
pub struct Args {
    /// expense or receipt; defaults to the configured mode
    #[arg(short, long)]
    pub mode: Option<Mode>,

    /// Print the {success, data, error} envelope instead of a table
    #[arg(long, conflicts_with = "tsv")]
    pub json: bool,

    /// Print tab-separated clipboard text
    #[arg(long)]
    pub tsv: bool,

    /// Directory holding config.json
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

pub fn run() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let config_dir = args.config_dir.clone().unwrap_or_else(AppConfig::default_dir);
    let config = AppConfig::load(&config_dir);

    match run_with(args, &config) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failed) => {
            log::warn!("{} document(s) could not be analyzed", failed);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("summa: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Analyzes every file in turn. Returns how many failed.
pub fn run_with(args: Args, config: &AppConfig) -> anyhow::Result<usize> {
    let mode = args.mode.unwrap_or(config.default_mode);
    log::info!("Using {:?} in {} mode", config.llm_provider, mode);

    let model = ai::client_for(config).context("LLM provider is not usable")?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    let session = Arc::new(Mutex::new(SessionManager::new(mode)));
    let mut failed = 0;
    for path in &args.files {
        let outcome = runtime.block_on(analyze_path(&session, model.as_ref(), path))?;
        if outcome.is_err() {
            failed += 1;
        }
        print_outcome(&args, path, outcome);
    }
    Ok(failed)
}

async fn analyze_path(
    session: &Arc<Mutex<SessionManager>>,
    model: &dyn VisionModel,
    path: &Path,
) -> anyhow::Result<Result<Normalized, String>> {
    let document = match Document::open(path) {
        Ok(document) => document,
        Err(e) => return Ok(Err(e.to_string())),
    };
    session.lock().select_file(document);

    session::analyze(session, model)
        .await
        .with_context(|| format!("analyzing {}", path.display()))?;

    let state = session.lock().state().clone();
    Ok(match state {
        ViewState::Success(result) => Ok(result),
        ViewState::Failed(message) => Err(message),
        other => Err(format!("analysis did not finish ({:?})", other)),
    })
}

fn print_outcome(args: &Args, path: &Path, outcome: Result<Normalized, String>) {
    if args.json {
        let envelope = match outcome {
            Ok(result) => AnalysisResponse::success(result),
            Err(message) => AnalysisResponse::failure(message),
        };
        match serde_json::to_string_pretty(&envelope) {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("Failed to serialize result for {}: {}", path.display(), e),
        }
        return;
    }

    match outcome {
        Ok(result) if args.tsv => println!("{}", render::copy_text(&result)),
        Ok(result) => {
            if args.files.len() > 1 {
                println!("{}", path.display());
            }
            println!("{}", render::render(&result));
        }
        Err(message) => eprintln!("{}: {}", path.display(), message),
    }
}
