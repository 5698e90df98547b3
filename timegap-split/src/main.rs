//! timegap-split CLI
//!
//! # Usage
//!
//! ```bash
//! # Print the folds of a daily dataset
//! timegap-split split --data data/rows.csv --time-column date --train 10d --valid 2d --gap 1d
//!
//! # Same folds as a summary table, or JSON
//! timegap-split summary --data data/rows.csv --train 10d --valid 5d --gap 1d
//! timegap-split summary --config config/default.toml --json
//!
//! # Check every fold against the split invariants
//! timegap-split check --config config/default.toml
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Duration;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use timegap_split::config::RunConfig;
use timegap_split::data::load_frame;
use timegap_split::split::{format_duration, parse_duration, render_table, Fold, TimeGapSplit, WindowMode};
use timegap_split::validation::FoldIntegrityValidator;

#[derive(Parser)]
#[command(name = "timegap-split")]
#[command(about = "Gap-aware time-series cross-validation splits")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print train/validation windows and row counts for every fold
    Split(SplitArgs),

    /// Print per-fold start, end, period and sample counts
    Summary(SplitArgs),

    /// Validate every fold against the split invariants
    Check(SplitArgs),
}

#[derive(Args)]
struct SplitArgs {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CSV or Parquet file with the rows to split
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Name of the timestamp column
    #[arg(short, long)]
    time_column: Option<String>,

    /// Train window length (e.g. 10d)
    #[arg(long, value_parser = parse_duration, allow_hyphen_values = true)]
    train: Option<Duration>,

    /// Validation window length and roll step (e.g. 2d)
    #[arg(long, value_parser = parse_duration, allow_hyphen_values = true)]
    valid: Option<Duration>,

    /// Gap between train and validation (e.g. 1d)
    #[arg(long, value_parser = parse_duration, allow_hyphen_values = true)]
    gap: Option<Duration>,

    /// Number of folds, counted back from the end of the data
    #[arg(long)]
    n_splits: Option<usize>,

    /// Grow the train window instead of rolling it
    #[arg(long)]
    expanding: bool,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

impl SplitArgs {
    /// Merge the config file (if any) with command line overrides.
    fn resolve(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => RunConfig::default(),
        };

        if let Some(data) = &self.data {
            config.data.path = Some(data.clone());
        }
        if let Some(column) = &self.time_column {
            config.data.time_column = column.clone();
        }
        if self.train.is_some() {
            config.split.train_duration = self.train;
        }
        if self.valid.is_some() {
            config.split.valid_duration = self.valid;
        }
        if self.gap.is_some() {
            config.split.gap_duration = self.gap;
        }
        if self.n_splits.is_some() {
            config.split.n_splits = self.n_splits;
        }
        if self.expanding {
            config.split.window = Some(WindowMode::Expanding);
        }

        Ok(config)
    }

    fn build_splitter(&self) -> Result<TimeGapSplit> {
        let config = self.resolve()?;
        let path = config
            .data
            .path
            .clone()
            .context("No data file given (use --data or [data] path)")?;
        let window = config.split.to_window_config()?;

        let df = load_frame(&path).with_context(|| format!("Failed to load {}", path.display()))?;
        let split = TimeGapSplit::from_frame(&df, &config.data.time_column, window)
            .with_context(|| format!("Invalid split for {}", path.display()))?;
        Ok(split)
    }
}

/// JSON view of a fold without the full index lists.
#[derive(Serialize)]
struct FoldView<'a> {
    #[serde(flatten)]
    fold: &'a Fold,
    train_rows: usize,
    valid_rows: usize,
}

fn cmd_split(args: &SplitArgs) -> Result<()> {
    let split = args.build_splitter()?;
    let folds: Vec<Fold> = split.split().collect();

    if args.json {
        let view: Vec<FoldView> = folds
            .iter()
            .map(|fold| FoldView {
                fold,
                train_rows: fold.train_len(),
                valid_rows: fold.valid_len(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    let config = split.config();
    println!("Time gap split ({}):", config.window);
    println!("  Rows: {}", split.index().len());
    if let (Some(first), Some(last)) = (split.index().first(), split.index().last()) {
        println!("  Date range: {} to {}", first, last);
    }
    println!(
        "  Train: {}  Gap: {}  Valid: {}",
        split.train_duration().map(format_duration).unwrap_or_default(),
        format_duration(config.gap_duration),
        format_duration(config.valid_duration)
    );
    println!("  Folds: {}", folds.len());
    println!();

    for fold in &folds {
        println!(
            "Fold {:>3}: train {} -> {} ({} rows) | valid {} -> {} ({} rows)",
            fold.fold,
            fold.train_window.start,
            fold.train_window.end,
            fold.train_len(),
            fold.valid_window.start,
            fold.valid_window.end,
            fold.valid_len()
        );
    }

    Ok(())
}

fn cmd_summary(args: &SplitArgs) -> Result<()> {
    let split = args.build_splitter()?;
    let rows = split.summary();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print!("{}", render_table(&rows));
    }
    Ok(())
}

fn cmd_check(args: &SplitArgs) -> Result<()> {
    let split = args.build_splitter()?;
    let report = FoldIntegrityValidator::validate(&split);

    println!("{}", report.summary());
    for check in &report.checks {
        let mark = if check.passed { "PASS" } else { "FAIL" };
        println!("  [{}] {}: {}", mark, check.name, check.message);
        if let Some(details) = &check.details {
            println!("         {}", details);
        }
    }

    if !report.all_passed() {
        bail!("{} checks failed", report.failed_checks().len());
    }
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("timegap_split=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Split(args) => cmd_split(args),
        Commands::Summary(args) => cmd_summary(args),
        Commands::Check(args) => cmd_check(args),
    }
}
