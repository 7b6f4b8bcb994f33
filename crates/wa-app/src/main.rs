//! Command line entry point for the annotation workbench

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parking_lot::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use wa_core::events::events::OverlapDetected;
use wa_core::events::handler_from_fn;
use wa_core::{AnnotationSession, MergeDirection, RegionId};
use wa_data::{JsonProjectStore, LocalMergeApi, ProjectStore, WorkbenchConfig};

mod replay;

use replay::{fallback_duration, ReplayHost, ReplayScript, Replayer, SaveQueue};

#[derive(Parser)]
#[command(name = "waveannotate")]
#[command(about = "Inspect and edit audio annotation projects")]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Storage root overriding the configured one
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report invalid and overlapping annotations of an audio file
    Validate { project: String, audio: String },

    /// Merge an annotation into its touching neighbor
    Merge {
        project: String,
        audio: String,
        source: String,
        direction: MergeDirection,
    },

    /// Split an annotation in two at a time in seconds
    Split {
        project: String,
        audio: String,
        id: String,
        at: f64,
    },

    /// Replay a JSON pointer script against an audio file's annotations
    Replay {
        project: String,
        audio: String,
        script: PathBuf,

        /// Audio duration in seconds
        #[arg(long)]
        duration: Option<f64>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn load_config(cli: &Cli) -> Result<WorkbenchConfig> {
    let mut config = match &cli.config {
        Some(path) => WorkbenchConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => WorkbenchConfig::load().context("failed to load config")?,
    };
    if let Some(storage) = &cli.storage {
        config.storage_root = storage.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    info!("Using storage at {}", config.storage_root.display());
    let store = Arc::new(JsonProjectStore::new(&config.storage_root));

    match cli.command {
        Commands::Validate { project, audio } => validate(&config, store, &project, &audio).await,
        Commands::Merge {
            project,
            audio,
            source,
            direction,
        } => merge(&config, store, &project, &audio, source, direction).await,
        Commands::Split {
            project,
            audio,
            id,
            at,
        } => split(&config, store, &project, &audio, id, at).await,
        Commands::Replay {
            project,
            audio,
            script,
            duration,
        } => run_replay(&config, store, &project, &audio, script, duration).await,
    }
}

async fn validate(config: &WorkbenchConfig, store: Arc<JsonProjectStore>, project: &str, audio: &str) -> Result<()> {
    let annotations = store
        .load_audio(project, audio)
        .await
        .with_context(|| format!("failed to load annotations of {}/{}", project, audio))?;

    let invalid = annotations
        .iter()
        .filter(|a| !a.region().is_valid())
        .inspect(|a| warn!("Invalid annotation {}: {}..{}", a.id, a.start, a.end))
        .count();

    let session = AnnotationSession::headless(project, audio, config.timeline.clone());
    let overlaps = Arc::new(Mutex::new(0usize));
    let counter = overlaps.clone();
    session.event_bus.subscribe::<OverlapDetected>(handler_from_fn(move |event| {
        if let Some(event) = event.as_any().downcast_ref::<OverlapDetected>() {
            *counter.lock() += event.pairs.len();
        }
    }));

    let total = annotations.len();
    let loaded = session.load_regions(annotations.into_iter().map(|a| a.into_pair()));
    let overlapping = *overlaps.lock();

    println!(
        "{}/{}: {} annotations, {} loaded, {} invalid, {} overlapping pair(s)",
        project,
        audio,
        total,
        loaded,
        invalid,
        overlapping
    );
    Ok(())
}

async fn merge(
    config: &WorkbenchConfig,
    store: Arc<JsonProjectStore>,
    project: &str,
    audio: &str,
    source: String,
    direction: MergeDirection,
) -> Result<()> {
    let session = AnnotationSession::headless(project, audio, config.timeline.clone());
    session
        .load_from(store.as_ref())
        .await
        .context("failed to load annotations")?;

    let api = LocalMergeApi::new(store.clone());
    let merged = session
        .merge(&RegionId::from(source), direction, &api)
        .await
        .context("merge failed")?;

    println!("{}", serde_json::to_string_pretty(&merged)?);
    Ok(())
}

async fn split(
    config: &WorkbenchConfig,
    store: Arc<JsonProjectStore>,
    project: &str,
    audio: &str,
    id: String,
    at: f64,
) -> Result<()> {
    let session = AnnotationSession::headless(project, audio, config.timeline.clone());
    session
        .load_from(store.as_ref())
        .await
        .context("failed to load annotations")?;

    let (first, second) = session
        .split_region(&RegionId::from(id), at)
        .context("split failed")?;
    session
        .save_to(store.as_ref())
        .await
        .context("failed to save annotations")?;

    println!("{} {}", first, second);
    Ok(())
}

async fn run_replay(
    config: &WorkbenchConfig,
    store: Arc<JsonProjectStore>,
    project: &str,
    audio: &str,
    script_path: PathBuf,
    duration: Option<f64>,
) -> Result<()> {
    let contents = tokio::fs::read_to_string(&script_path)
        .await
        .with_context(|| format!("failed to read {}", script_path.display()))?;
    let script: ReplayScript = serde_json::from_str(&contents)
        .with_context(|| format!("invalid replay script {}", script_path.display()))?;

    let host = ReplayHost::new();
    let session = AnnotationSession::new(project, audio, config.timeline.clone(), host.clone());
    session
        .load_from(store.as_ref())
        .await
        .context("failed to load annotations")?;

    let duration = duration
        .or(script.duration)
        .unwrap_or_else(|| fallback_duration(&session.annotations_snapshot()));

    let api = LocalMergeApi::new(store.clone());
    let saves = SaveQueue::spawn(store.clone(), project.to_string(), audio.to_string());
    let summary = Replayer::new(&session, host, &api, &saves)
        .run(script, duration)
        .await?;
    let saved = saves.finish().await?;

    println!(
        "{} steps, {} commits, {} created, {} removed, {} merged, {} seeks, {} frames, {} saves",
        summary.steps,
        summary.commits,
        summary.created,
        summary.removed,
        summary.merged,
        summary.seeks,
        summary.frames,
        saved
    );
    Ok(())
}
