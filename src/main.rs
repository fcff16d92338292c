use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use polyscribe::{
    normalize, split_by_protagonist, CompletionStore, ComputeTier, Dispatcher, Driver, FsCatalog,
    JobKey, NormalizeOptions, PipelineError, RecordingId, RunOptions, Service, SpeakerType,
    Timeframe,
};

#[derive(Parser)]
#[command(name = "polyscribe")]
#[command(author, version, about = "Multi-vendor interview transcription pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which (service, chunk) jobs are still outstanding for a recording
    Plan {
        /// Catalog root directory
        #[arg(short, long)]
        catalog: PathBuf,

        #[arg(long)]
        project: String,

        /// Speaker's name
        #[arg(long)]
        speaker: String,

        /// Performance date (YYYY-MM-DD)
        #[arg(long)]
        performance_date: NaiveDate,

        /// Part number when one performance spans several files
        #[arg(long, default_value = "1")]
        part: u32,

        /// Speaker type (single, both, interviewee, interviewer)
        #[arg(long)]
        speaker_type: SpeakerType,

        /// Total decoded audio length in seconds
        #[arg(long)]
        duration_secs: u64,

        /// Chunk length in hours
        #[arg(long, default_value = "3.0")]
        timeframe_hours: f64,

        /// Services to plan for
        #[arg(long, value_delimiter = ',', default_values_t = Service::ALL)]
        services: Vec<Service>,

        /// Rescan the catalog for externally written partitions first
        #[arg(long)]
        refresh: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run one pipeline pass: invalidate stale artifacts, dispatch
    /// outstanding submissions, parse transcribed chunks
    Run {
        /// Catalog root directory
        #[arg(short, long)]
        catalog: PathBuf,

        #[arg(long)]
        project: String,

        /// Speaker's name
        #[arg(long)]
        speaker: String,

        /// Performance date (YYYY-MM-DD)
        #[arg(long)]
        performance_date: NaiveDate,

        /// Part number when one performance spans several files
        #[arg(long, default_value = "1")]
        part: u32,

        /// Speaker type (single, both, interviewee, interviewer)
        #[arg(long)]
        speaker_type: SpeakerType,

        /// Total decoded audio length in seconds
        #[arg(long)]
        duration_secs: u64,

        /// Chunk length in hours
        #[arg(long, default_value = "3.0")]
        timeframe_hours: f64,

        /// Services to run
        #[arg(long, value_delimiter = ',', default_values_t = Service::ALL)]
        services: Vec<Service>,

        /// Rescan the catalog for externally written partitions first
        #[arg(long)]
        refresh: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Normalize one raw vendor transcript file into canonical words
    Parse {
        /// Which vendor produced the transcript
        #[arg(long)]
        service: Service,

        /// Speaker type (single, both, interviewee, interviewer)
        #[arg(long)]
        speaker_type: SpeakerType,

        /// Raw transcript JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the canonical word list (JSON)
        #[arg(short, long)]
        output: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Plan {
            catalog,
            project,
            speaker,
            performance_date,
            part,
            speaker_type,
            duration_secs,
            timeframe_hours,
            services,
            refresh,
            verbose,
        } => {
            setup_logging(verbose);
            let recording = RecordingId {
                project,
                speaker,
                performance_date,
                part,
            };
            plan_recording(
                catalog,
                recording,
                speaker_type,
                duration_secs,
                timeframe_hours,
                services,
                refresh,
            )
            .await
        }
        Commands::Run {
            catalog,
            project,
            speaker,
            performance_date,
            part,
            speaker_type,
            duration_secs,
            timeframe_hours,
            services,
            refresh,
            verbose,
        } => {
            setup_logging(verbose);
            let recording = RecordingId {
                project,
                speaker,
                performance_date,
                part,
            };
            run_recording(
                catalog,
                recording,
                speaker_type,
                duration_secs,
                timeframe_hours,
                services,
                refresh,
            )
            .await
        }
        Commands::Parse {
            service,
            speaker_type,
            input,
            output,
            verbose,
        } => {
            setup_logging(verbose);
            parse_file(service, speaker_type, input, output)
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

/// Dispatch collaborator for CLI runs: names and logs the job handoff.
/// Actual vendor submission happens out of process, on the workers.
struct LogDispatcher;

#[async_trait]
impl Dispatcher for LogDispatcher {
    async fn dispatch(&self, job: &JobKey, tier: ComputeTier) -> Result<(), PipelineError> {
        let worker_name = format!(
            "{}_{}_{}_{}",
            job.service,
            job.recording.speaker,
            job.speaker_type,
            uuid::Uuid::new_v4()
        );
        info!(
            "handing off {} to worker {} ({:?} tier)",
            job.describe(),
            worker_name,
            tier
        );
        Ok(())
    }
}

async fn plan_recording(
    catalog: PathBuf,
    recording: RecordingId,
    speaker_type: SpeakerType,
    duration_secs: u64,
    timeframe_hours: f64,
    services: Vec<Service>,
    refresh: bool,
) -> Result<()> {
    let store = FsCatalog::open(&catalog)
        .with_context(|| format!("Failed to open catalog at {:?}", catalog))?;
    if refresh {
        store.refresh_index().await.context("Failed to refresh catalog index")?;
    }

    let timeframe = Timeframe::from_hours(timeframe_hours)?;
    let options = RunOptions {
        services,
        duration_secs,
        timeframe,
    };
    let dispatcher = LogDispatcher;
    let driver = Driver::new(&store, &dispatcher);
    let (chunk_plan, plan) = driver.plan(&recording, speaker_type, &options).await?;

    println!("Chunk plan");
    println!("----------");
    println!("Chunks: {}", chunk_plan.chunks.len());
    println!("Compute tier: {:?}", chunk_plan.tier);
    println!();

    if !plan.stale_timeframes.is_empty() {
        println!("Stale timeframes (will be invalidated on the next run):");
        for stale in &plan.stale_timeframes {
            println!("  {}s", stale.as_secs());
        }
        println!();
    }

    println!("To submit: {}", plan.to_submit.len());
    for job in &plan.to_submit {
        println!("  {}", job.describe());
    }
    println!("To parse: {}", plan.to_parse.len());
    for job in &plan.to_parse {
        println!("  {}", job.describe());
    }
    if plan.is_settled() {
        println!("Nothing outstanding.");
    }

    Ok(())
}

async fn run_recording(
    catalog: PathBuf,
    recording: RecordingId,
    speaker_type: SpeakerType,
    duration_secs: u64,
    timeframe_hours: f64,
    services: Vec<Service>,
    refresh: bool,
) -> Result<()> {
    let store = FsCatalog::open(&catalog)
        .with_context(|| format!("Failed to open catalog at {:?}", catalog))?;
    if refresh {
        store.refresh_index().await.context("Failed to refresh catalog index")?;
    }

    let timeframe = Timeframe::from_hours(timeframe_hours)?;
    let options = RunOptions {
        services,
        duration_secs,
        timeframe,
    };
    let dispatcher = LogDispatcher;
    let driver = Driver::new(&store, &dispatcher);
    let summary = driver.run(&recording, speaker_type, &options).await?;

    info!(
        "pass complete: {} chunks, {} submitted, {} parsed, {} failed",
        summary.chunk_count,
        summary.submitted,
        summary.parsed,
        summary.failures.len()
    );
    for failure in &summary.failures {
        eprintln!("FAILED {}: {}", failure.job.describe(), failure.error);
    }
    if !summary.all_succeeded() {
        anyhow::bail!("{} job(s) failed; re-run after fixing the cause", summary.failures.len());
    }

    Ok(())
}

fn parse_file(
    service: Service,
    speaker_type: SpeakerType,
    input: PathBuf,
    output: PathBuf,
) -> Result<()> {
    let content = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read file: {:?}", input))?;
    let raw: serde_json::Value =
        serde_json::from_str(&content).context("Failed to parse input as JSON")?;

    let words = normalize(service, raw, speaker_type, &NormalizeOptions::default())?;
    let (protagonist_words, other_words) = split_by_protagonist(words);
    info!(
        "normalized {} transcript: {} protagonist words, {} other",
        service,
        protagonist_words.len(),
        other_words.len()
    );

    let mut all_words = protagonist_words;
    all_words.extend(other_words);
    all_words.sort_by_key(|w| w.seq_num);

    let file = std::fs::File::create(&output)
        .with_context(|| format!("Failed to create file: {:?}", output))?;
    serde_json::to_writer_pretty(file, &all_words).context("Failed to write JSON")?;
    info!("wrote {} words to {:?}", all_words.len(), output);

    Ok(())
}
