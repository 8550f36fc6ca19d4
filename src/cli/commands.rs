//! Command implementations for the PSG loader CLI
//!
//! Thin consumers of the library: each command loads what it needs, prints
//! a human-readable report with `colored`, and leaves all decoding and
//! orchestration to the library types.

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use crate::cli::args::{Args, Commands, HeaderArgs, LoadArgs};
use crate::edf::{EdfHeader, SignalHeader};
use crate::loader::{LoadEvent, Loader};
use crate::model::{Recording, SourceData};
use crate::LoaderConfig;

/// Dispatch the parsed CLI arguments to their command.
pub async fn run(args: Args) -> Result<()> {
    setup_logging(&args)?;
    debug!("command line arguments: {:?}", args);

    match args.command.clone() {
        Some(Commands::Header(header_args)) => run_header(header_args),
        Some(Commands::Load(load_args)) => run_load(load_args, args.quiet).await,
        Some(Commands::Stats(load_args)) => run_stats(load_args, args.quiet).await,
        None => unreachable!("main prints help when no command is given"),
    }
}

/// Set up structured logging from the verbosity flags
fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("psg_loader={}", args.log_level())));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
        .ok();

    Ok(())
}

/// Decode and print the header and channel table of a recording.
fn run_header(args: HeaderArgs) -> Result<()> {
    let buf = std::fs::read(&args.edf_path)
        .with_context(|| format!("failed to read {}", args.edf_path.display()))?;
    let header = EdfHeader::parse(&buf)?;
    let signals = SignalHeader::parse_all(&buf, header.num_signals)?;

    println!("{}", "Recording".bold());
    println!("  patient:   {}", header.patient_id);
    println!("  recording: {}", header.record_id);
    println!("  start:     {}", header.start);
    println!(
        "  duration:  {:.1}s ({} records x {}s)",
        header.num_records as f64 * header.record_duration,
        header.num_records,
        header.record_duration
    );
    println!();
    println!("{}", "Channels".bold());
    for signal in &signals {
        println!(
            "  {:<16} {:>6} samples/record, {}..{} {}",
            signal.label,
            signal.samples_per_record,
            signal.physical_min,
            signal.physical_max,
            signal.physical_dimension
        );
    }
    Ok(())
}

/// Full concurrent load with a progress spinner and availability summary.
async fn run_load(args: LoadArgs, quiet: bool) -> Result<()> {
    let recording = load_with_progress(&args, quiet).await?;
    print_summary(&recording);
    Ok(())
}

/// Load, then print the feature statistics table.
async fn run_stats(args: LoadArgs, quiet: bool) -> Result<()> {
    let recording = load_with_progress(&args, quiet).await?;

    match &recording.feature_stats {
        None => println!("{}", "No epoch features loaded; no statistics.".yellow()),
        Some(table) => {
            println!(
                "{:<32} {:>10} {:>10} {:>10} {:>10} {:>10}",
                "feature".bold(),
                "min",
                "p25",
                "p50",
                "p75",
                "max"
            );
            for (name, stats) in table {
                println!(
                    "{:<32} {:>10.3} {:>10.3} {:>10.3} {:>10.3} {:>10.3}",
                    name, stats.min, stats.p25, stats.p50, stats.p75, stats.max
                );
            }
        }
    }
    Ok(())
}

async fn load_with_progress(args: &LoadArgs, quiet: bool) -> Result<Recording> {
    args.validate()?;

    let mut config = LoaderConfig::default().with_epoch_seconds(args.epoch_seconds);
    if args.strict {
        config = config.with_strict_auxiliary();
    }

    let (sender, receiver) = mpsc::unbounded_channel();
    let progress = if quiet {
        None
    } else {
        Some(tokio::spawn(drive_spinner(receiver)))
    };

    let loader = Loader::new(config).with_progress(sender);
    let result = loader
        .load(&args.edf_path)
        .await
        .with_context(|| format!("failed to load {}", args.edf_path.display()));

    // Dropping the loader closes the channel so the spinner task can exit.
    drop(loader);
    if let Some(task) = progress {
        let _ = task.await;
    }
    result
}

/// Consume progress events into a stderr spinner until the channel closes.
async fn drive_spinner(mut receiver: mpsc::UnboundedReceiver<LoadEvent>) {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));

    while let Some(event) = receiver.recv().await {
        match event {
            LoadEvent::Started { path } => {
                spinner.set_message(format!("loading {}", path.display()));
            }
            LoadEvent::PhaseFinished { phase, elapsed } => {
                spinner.set_message(format!("{} done in {:.2?}", phase.label(), elapsed));
            }
            LoadEvent::SourceUnavailable { phase, reason } => {
                spinner.println(format!("  {} unavailable: {}", phase.label(), reason));
            }
            LoadEvent::Finished { elapsed } => {
                spinner.finish_with_message(format!("loaded in {:.2?}", elapsed));
            }
        }
    }
}

/// Print the per-source availability summary of a loaded recording.
fn print_summary(recording: &Recording) {
    println!("{}", "Signals".bold());
    println!(
        "  {} channels, {:.1}s ({} epochs), start {}",
        recording.edf.signals.len(),
        recording.edf.duration_secs,
        recording.epoch_count(),
        recording.edf.start
    );

    println!("{}", "Sources".bold());
    print_source(
        "epoch features",
        &recording.epoch_features,
        |epochs| format!("{} epochs", epochs.len()),
    );
    print_source("slow waves", &recording.slow_waves, |groups| {
        format!(
            "{} events on {} channels",
            groups.values().map(Vec::len).sum::<usize>(),
            groups.len()
        )
    });
    print_source("spindles", &recording.spindles, |groups| {
        format!(
            "{} events on {} channels",
            groups.values().map(Vec::len).sum::<usize>(),
            groups.len()
        )
    });
    print_source("night events", &recording.night_events, |events| {
        format!("{} events", events.len())
    });
    print_source(
        "fitbit hypnogram",
        &recording.fitbit_hypnogram,
        |intervals| format!("{} intervals", intervals.len()),
    );
    print_source("microwakings", &recording.microwakings, |list| {
        format!("{} intervals", list.len())
    });
    println!(
        "  {:<18} {}",
        "scorings",
        format!(
            "{} entries, {} marks",
            recording.scorings.len(),
            recording.marks.len()
        )
        .normal()
    );
}

fn print_summary_line(name: &str, status: colored::ColoredString) {
    println!("  {:<18} {}", name, status);
}

fn print_source<T>(name: &str, source: &SourceData<T>, describe: impl Fn(&T) -> String) {
    match source {
        SourceData::Available(value) => {
            print_summary_line(name, describe(value).green());
        }
        SourceData::Unavailable { reason } => {
            print_summary_line(name, format!("unavailable: {}", reason).yellow());
        }
    }
}
