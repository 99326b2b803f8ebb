//! Glyphpad - Touchpad symbol recognizer
//!
//! Learns symbols drawn on the touchpad and runs the command bound to each.

mod cli;

use anyhow::{bail, Context};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, SourceArgs};
use glyphpad_lib::classifier::Classifier;
use glyphpad_lib::config::Config;
use glyphpad_lib::dispatch::{CommandTable, Dispatcher, MemoryDispatcher, ShellDispatcher};
use glyphpad_lib::features::{get_features, get_new_points};
use glyphpad_lib::pipeline::{self, Interpreter, Listener, StopReason};
use glyphpad_lib::state::{self, ModelStore, SqliteStore};
use glyphpad_lib::touchpad::{
    read_journal_file, JournalEntry, JournalWriter, ReplaySource, SampleSource, TouchpadDevice,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments first so we can use --verbose to set log level
    let cli = Cli::parse_args();

    // `log` records from the library are forwarded through tracing-log
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    if let Some(partition) = cli.partition {
        config.partition = partition;
    }
    if let Some(database) = &cli.database {
        config.database_path = Some(database.clone());
    }

    let store = open_store(&config)?;

    match cli.command {
        Commands::Run {
            source,
            dry_run,
            journal,
        } => run_recognition(&config, store, source, dry_run, journal).await?,
        Commands::Train {
            symbol,
            size,
            source,
        } => run_training(&config, store, &symbol, size, source).await?,
        Commands::List => run_list(&config, store)?,
        Commands::Delete { symbols, all } => {
            let mut classifier = Classifier::new(store, config.partition)?;
            let deleted = if all {
                classifier.delete_all_symbols()?
            } else {
                classifier.delete_symbols(&symbols)?
            };
            println!("Deleted {} symbol(s) from {}", deleted, config.partition);
        }
        Commands::Activate { symbols } => {
            let changed = Classifier::new(store, config.partition)?.activate_symbols(&symbols)?;
            println!("Activated {} symbol(s)", changed);
        }
        Commands::Deactivate { symbols } => {
            let changed = Classifier::new(store, config.partition)?.deactivate_symbols(&symbols)?;
            println!("Deactivated {} symbol(s)", changed);
        }
        Commands::Relearn => {
            let count = Classifier::new(store, config.partition)?.relearn_all_symbols()?;
            println!("Relearned {} symbol(s) of {}", count, config.partition);
        }
        Commands::Export { path } => {
            let summary = state::export_partition(store.as_ref(), config.partition, &path)?;
            println!(
                "Exported {} symbols ({} artifacts) to {}",
                summary.symbols,
                summary.artifacts,
                path.display()
            );
        }
        Commands::Import { path } => {
            let summary = state::import_partition(store.as_ref(), &path, Some(config.partition))?;
            println!(
                "Imported {} symbols ({} artifacts) into {}",
                summary.symbols, summary.artifacts, summary.partition
            );
        }
        Commands::Record { output, device } => run_record(&config, &output, device).await?,
        Commands::Inspect { journal, points } => run_inspect(&config, store, &journal, points)?,
    }

    Ok(())
}

fn open_store(config: &Config) -> anyhow::Result<Arc<dyn ModelStore>> {
    let store = match &config.database_path {
        Some(path) => SqliteStore::open(path)
            .with_context(|| format!("Failed to open model database {}", path.display()))?,
        None => SqliteStore::open_default().context("Failed to open model database")?,
    };
    Ok(Arc::new(store))
}

fn open_source(config: &Config, args: &SourceArgs) -> anyhow::Result<Box<dyn SampleSource>> {
    if let Some(path) = &args.replay {
        return Ok(Box::new(ReplaySource::open(path)?));
    }
    let device = args.device.as_deref().or(config.device_path.as_deref());
    let touchpad = TouchpadDevice::initialize(device).context(
        "Failed to open the touchpad (is the event device readable by this user?)",
    )?;
    Ok(Box::new(touchpad))
}

fn apply_source_overrides(config: &Config, args: &SourceArgs) -> anyhow::Result<Config> {
    let mut config = config.clone();
    if let Some(gap) = args.idle_gap {
        config.idle_gap_secs = gap;
    }
    if args.end_on_finger_lift {
        config.end_on_finger_lift = true;
    }
    config.validate()?;
    Ok(config)
}

fn stop_listener(listener: Listener) {
    listener.stop();
    if listener.is_running() {
        // The device read blocks, the thread exits with the next event
        log::debug!("Touchpad reader still waiting for its last event");
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn run_recognition(
    config: &Config,
    store: Arc<dyn ModelStore>,
    source: SourceArgs,
    dry_run: bool,
    journal: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = apply_source_overrides(config, &source)?;
    let classifier = Classifier::open_for_recognition(store, config.partition)
        .context("Cannot start recognition, train some symbols first")?;
    log::info!(
        "Recognizing {} of {}",
        classifier.registry().active_names().join(", "),
        classifier.partition()
    );

    let dispatcher: Arc<dyn Dispatcher> = if dry_run {
        Arc::new(MemoryDispatcher::new())
    } else {
        Arc::new(ShellDispatcher::new(CommandTable::new(
            config.partition,
            config.commands.clone(),
        )))
    };

    let mut interpreter = Interpreter::recognition(classifier, dispatcher);
    if let Some(path) = journal.or_else(|| config.journal_path.clone()) {
        interpreter = interpreter.with_journal(JournalWriter::new(path));
    }

    let (listener, samples) = Listener::spawn(open_source(&config, &source)?);
    log::info!("Listening for symbols, press Ctrl-C to quit");

    let (reason, summary) =
        pipeline::run(samples, &mut interpreter, config.segmenter(), shutdown_signal()).await?;
    stop_listener(listener);

    log::info!(
        "Stopped ({:?}): {} recognized, {} not similar",
        reason,
        summary.recognized,
        summary.unrecognized
    );
    Ok(())
}

async fn run_training(
    config: &Config,
    store: Arc<dyn ModelStore>,
    symbol: &str,
    size: Option<usize>,
    source: SourceArgs,
) -> anyhow::Result<()> {
    let config = apply_source_overrides(config, &source)?;
    let classifier = Classifier::new(store, config.partition)?;
    let target = size.unwrap_or(config.training_size);
    let mut interpreter = Interpreter::training(classifier, symbol, target)?;

    let (listener, samples) = Listener::spawn(open_source(&config, &source)?);
    println!("Draw '{}' on the touchpad {} times", symbol, target);

    let (reason, _) =
        pipeline::run(samples, &mut interpreter, config.segmenter(), shutdown_signal()).await?;
    stop_listener(listener);

    let classifier = interpreter.into_classifier();
    match reason {
        StopReason::TrainingComplete => {
            let tolerance = classifier
                .model(symbol)
                .map(|model| model.tolerance_distance)
                .unwrap_or_default();
            println!("Learned '{}' (tolerance {:.3})", symbol, tolerance);
            Ok(())
        }
        StopReason::Shutdown | StopReason::EndOfStream => {
            let collected = classifier
                .session()
                .map(|session| session.collected())
                .unwrap_or_default();
            bail!(
                "Training of '{}' interrupted after {} of {} strokes",
                symbol,
                collected,
                target
            )
        }
    }
}

fn run_list(config: &Config, store: Arc<dyn ModelStore>) -> anyhow::Result<()> {
    let classifier = Classifier::new(store, config.partition)?;
    let summaries = classifier.summaries();
    if summaries.is_empty() {
        println!("No symbols in {}", config.partition);
        return Ok(());
    }

    println!("Symbols in {}:", config.partition);
    if !classifier.has_joint_model() {
        println!("  (no joint model, run `glyphpad relearn` before recognizing)");
    }
    for summary in summaries {
        let status = if summary.active { "active" } else { "inactive" };
        match (summary.samples, summary.tolerance) {
            (Some(samples), Some(tolerance)) => println!(
                "  {:<20} {:<8} {:>3} strokes  tolerance {:.3}",
                summary.name, status, samples, tolerance
            ),
            _ => println!("  {:<20} {:<8} (incomplete model)", summary.name, status),
        }
    }
    Ok(())
}

async fn run_record(config: &Config, output: &Path, device: Option<PathBuf>) -> anyhow::Result<()> {
    let args = SourceArgs {
        device,
        ..SourceArgs::default()
    };
    let (listener, samples) = Listener::spawn(open_source(config, &args)?);
    let journal = JournalWriter::new(output.to_path_buf());
    println!("Recording to {}, press Ctrl-C to stop", output.display());

    let written = pipeline::record(samples, &journal, shutdown_signal()).await?;
    stop_listener(listener);
    println!("Recorded {} samples", written);
    Ok(())
}

fn run_inspect(
    config: &Config,
    store: Arc<dyn ModelStore>,
    journal: &Path,
    show_points: bool,
) -> anyhow::Result<()> {
    let samples = read_journal_file(journal)?
        .into_iter()
        .filter_map(|entry| match entry {
            JournalEntry::Sample(sample) => Some(sample),
            JournalEntry::Stroke(_) => None,
        });
    let windows = pipeline::split_windows(samples, config.segmenter());
    let classifier = Classifier::new(store, config.partition)?;

    for (i, window) in windows.iter().enumerate() {
        let Some(points) = get_new_points(window) else {
            println!("#{:<3} {} samples, no positions", i + 1, window.len());
            continue;
        };
        let verdict = get_features(window)
            .and_then(|features| classifier.classify(&features))
            .unwrap_or_else(|| "no match".to_string());
        println!("#{:<3} {} samples -> {}", i + 1, window.len(), verdict);

        if show_points {
            for point in points {
                println!("      {:>9.2} {:>9.2}", point.x, point.y);
            }
        }
    }
    Ok(())
}
