use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use vox_emotion::{
    analysis::EmotionAnalyzer,
    config::Config,
    encoding::{AudioSource, FileEncoder},
    export,
    queue::{BatchJobRunner, JobQueue, JobStatus},
    settings::SettingsStorage,
    tui,
    utils::{format_size, init_logger, LogMode},
};

#[derive(Parser, Debug)]
#[command(name = "vox-emotion", version)]
#[command(about = "Batch voice emotion analysis with Gemini")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Files to queue when starting the TUI
    files: Vec<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive queue (default)
    Tui {
        files: Vec<PathBuf>,
    },
    /// Analyze files without the TUI and print one line per file
    Analyze {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Also write the results as CSV
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Some(Command::Analyze { files, csv }) => {
            init_logger(LogMode::Cli, &config.logging)?;
            analyze(config, files, csv).await
        }
        Some(Command::Tui { files }) => run_tui(config, files).await,
        None => run_tui(config, cli.files).await,
    }
}

async fn run_tui(config: Config, files: Vec<PathBuf>) -> anyhow::Result<()> {
    let _guard = init_logger(LogMode::Tui, &config.logging)?;
    tui::run(config, files).await
}

async fn analyze(mut config: Config, files: Vec<PathBuf>, csv: Option<PathBuf>) -> anyhow::Result<()> {
    let settings = SettingsStorage::new().load().await.unwrap_or_else(|e| {
        warn!("Failed to load settings, using environment only: {}", e);
        Default::default()
    });
    settings.apply_to(&mut config.llm);

    if !config.llm.has_api_key() {
        bail!("No API key configured. Set GOOGLE_API_KEY or save one from the TUI settings.");
    }

    let queue = JobQueue::new();
    for path in &files {
        match AudioSource::from_path(path).await {
            Ok(source) => {
                info!(file = %source.name, size = %format_size(source.size_bytes), "Queued");
                queue.push(source);
            }
            Err(e) => eprintln!("skipping {}: {}", path.display(), e),
        }
    }
    if queue.is_empty() {
        bail!("None of the given files could be read");
    }

    let analyzer = EmotionAnalyzer::from_config(&config.llm).context("Failed to create analyzer")?;
    let runner = BatchJobRunner::from_config(
        queue.clone(),
        Arc::new(FileEncoder::new()),
        Arc::new(analyzer),
        &config.batch,
    );

    let summary = runner
        .run()
        .await
        .context("A run is already active on this queue")?;

    let jobs = queue.snapshot().jobs;
    for job in &jobs {
        match &job.status {
            JobStatus::Completed { result } => println!(
                "{}\t{}\t{}/10\t{}",
                job.name(),
                result.emotion_type,
                result.emotion_level,
                result.voice_identity
            ),
            JobStatus::Failed { error } => println!("{}\t{}", job.name(), error.kind.user_message()),
            other => println!("{}\t{}", job.name(), other.label()),
        }
    }

    if let Some(path) = csv {
        export::write_csv(&path, &jobs)?;
        println!("wrote {}", path.display());
    }

    info!(
        completed = summary.completed,
        failed = summary.failed,
        "Analysis finished"
    );
    Ok(())
}
