//! Integration tests for the time gap splitter.
//!
//! Coverage
//! --------
//! - Loading CSV and Parquet files and extracting the timestamp column.
//! - The thirty-day scenarios (10d train, 1d gap, 2d or 5d validation).
//! - Boundary behavior: exact-fit and too-short date ranges.
//! - Features/labels alignment, summaries, and fold integrity validation.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use tempfile::TempDir;

use timegap_split::{
    load_frame, time_index_from_frame, FoldIntegrityValidator, FoldPart, LoaderError, SplitError,
    TimeGapSplit, TimeIndex, WindowConfig, WindowMode,
};

fn day(d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_time(NaiveTime::MIN) + Duration::days(d as i64)
}

/// Write `days` consecutive daily rows starting 2024-01-01, shuffled by a stride.
fn write_daily_csv(dir: &Path, days: usize) -> std::path::PathBuf {
    let path = dir.join("rows.csv");
    let mut file = File::create(&path).unwrap();
    writeln!(file, "date,x,y").unwrap();
    for i in 0..days {
        // 7 is coprime with the test sizes, so every day appears once.
        let d = (i * 7) % days;
        writeln!(file, "{},{},{}", day(d as u32).date(), d as f64 * 0.5, d % 2).unwrap();
    }
    path
}

fn config(train: i64, valid: i64, gap: i64) -> WindowConfig {
    WindowConfig::new(Duration::days(train), Duration::days(valid), Duration::days(gap))
}

#[test]
fn test_thirty_days_from_csv() {
    let dir = TempDir::new().unwrap();
    let path = write_daily_csv(dir.path(), 30);

    let df = load_frame(&path).unwrap();
    assert_eq!(df.height(), 30);

    let split = TimeGapSplit::from_frame(&df, "date", config(10, 2, 1)).unwrap();
    let index = split.index();
    let folds: Vec<_> = split.split().collect();
    assert_eq!(folds.len(), 9);

    for fold in &folds {
        let (train_lo, train_hi) = index.bounds(&fold.train_indices).unwrap();
        let (valid_lo, valid_hi) = index.bounds(&fold.valid_indices).unwrap();

        assert!(train_hi - train_lo <= Duration::days(10));
        assert!(valid_hi - valid_lo <= Duration::days(2));
        assert!(train_hi + Duration::days(1) <= valid_lo);
    }
}

#[test]
fn test_longer_validation_window_gives_fewer_larger_folds() {
    let index: TimeIndex = (0..30).map(day).collect();

    let short = TimeGapSplit::new(index.clone(), config(10, 2, 1)).unwrap();
    let long = TimeGapSplit::new(index, config(10, 5, 1)).unwrap();

    let short_folds: Vec<_> = short.split().collect();
    let long_folds: Vec<_> = long.split().collect();

    assert!(long_folds.len() < short_folds.len());
    assert!(long_folds.iter().all(|f| f.valid_len() == 5));
    assert!(short_folds.iter().all(|f| f.valid_len() == 2));
}

#[test]
fn test_exact_range_is_one_fold_and_short_range_is_none() {
    // 0..=13 spans exactly 10 + 1 + 2 days.
    let exact: TimeIndex = (0..=13).map(day).collect();
    assert_eq!(TimeGapSplit::new(exact, config(10, 2, 1)).unwrap().n_splits(), 1);

    // 0..=9 spans 9 days, shorter than train + gap.
    let short: TimeIndex = (0..=9).map(day).collect();
    let split = TimeGapSplit::new(short, config(10, 2, 1)).unwrap();
    assert_eq!(split.split().count(), 0);
    assert!(split.summary().is_empty());
}

#[test]
fn test_exact_range_needs_a_row_before_the_last() {
    // Spans exactly 10 + 1 + 2 days, but nothing falls in [day 11, day 13).
    let sparse = TimeIndex::new(vec![day(0), day(13)]);
    let split = TimeGapSplit::new(sparse, config(10, 2, 1)).unwrap();
    assert_eq!(split.n_splits(), 0);

    // One row inside the last validation window restores the fold.
    let filled = TimeIndex::new(vec![day(0), day(12), day(13)]);
    let folds: Vec<_> = TimeGapSplit::new(filled, config(10, 2, 1))
        .unwrap()
        .split()
        .collect();
    assert_eq!(folds.len(), 1);
    assert_eq!(folds[0].train_indices, vec![0]);
    assert_eq!(folds[0].valid_indices, vec![1]);
}

#[test]
fn test_intraday_timestamps_from_csv() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hourly.csv");
    let mut file = File::create(&path).unwrap();
    writeln!(file, "ts,value").unwrap();
    for h in 0..72 {
        let ts = day(0) + Duration::hours(h);
        writeln!(file, "{},{}", ts.format("%Y-%m-%d %H:%M:%S"), h).unwrap();
    }
    drop(file);

    let df = load_frame(&path).unwrap();
    let config = WindowConfig::new(Duration::hours(24), Duration::hours(6), Duration::hours(2));
    let split = TimeGapSplit::from_frame(&df, "ts", config).unwrap();

    let first = split.split().next().unwrap();
    assert_eq!(first.train_len(), 24);
    assert_eq!(first.valid_len(), 6);
    // Hours 24 and 25 fall in the gap.
    assert_eq!(first.valid_indices[0], 26);
}

#[test]
fn test_parquet_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rows.parquet");

    let dates: Vec<NaiveDate> = (0..30).map(|d| day(d).date()).collect();
    let values: Vec<f64> = (0..30).map(|v| v as f64).collect();
    let mut df = DataFrame::new(vec![
        Column::new("date".into(), dates),
        Column::new("x".into(), values),
    ])
    .unwrap();

    let file = File::create(&path).unwrap();
    ParquetWriter::new(file).finish(&mut df).unwrap();

    let loaded = load_frame(&path).unwrap();
    let index = time_index_from_frame(&loaded, "date").unwrap();
    assert_eq!(index.len(), 30);
    assert_eq!(index.first(), Some(day(0)));

    let split = TimeGapSplit::new(index, config(10, 2, 1)).unwrap();
    assert_eq!(split.n_splits(), 9);
}

#[test]
fn test_features_and_labels_must_align() {
    let dir = TempDir::new().unwrap();
    let path = write_daily_csv(dir.path(), 30);
    let df = load_frame(&path).unwrap();

    let split = TimeGapSplit::from_frame(&df, "date", config(10, 2, 1)).unwrap();
    let features = df.select(["x"]).unwrap();
    let labels = df.column("y").unwrap().as_materialized_series().clone();

    let folds: Vec<_> = split.split_frame(&features, Some(&labels)).unwrap().collect();
    assert_eq!(folds.len(), 9);

    let err = split
        .split_frame(&features.head(Some(29)), Some(&labels))
        .unwrap_err();
    assert!(matches!(err, SplitError::LengthMismatch { .. }));
}

#[test]
fn test_configuration_errors() {
    let index: TimeIndex = (0..30).map(day).collect();

    let err = TimeGapSplit::new(index.clone(), config(10, 2, -1)).unwrap_err();
    assert!(matches!(err, SplitError::NegativeDuration { name: "gap_duration", .. }));

    let err = TimeGapSplit::new(index, config(0, 2, 1)).unwrap_err();
    assert!(matches!(err, SplitError::ZeroDuration("train_duration")));

    let df = df!("date" => &[1.5, 2.5]).unwrap();
    let err = TimeGapSplit::from_frame(&df, "date", config(10, 2, 1)).unwrap_err();
    assert!(matches!(
        err,
        SplitError::Loader(LoaderError::UnsupportedType { .. })
    ));

    let err = TimeGapSplit::from_frame(&df, "when", config(10, 2, 1)).unwrap_err();
    assert!(matches!(err, SplitError::Loader(LoaderError::MissingColumn(_))));
}

#[test]
fn test_load_frame_errors() {
    let dir = TempDir::new().unwrap();

    let err = load_frame(&dir.path().join("missing.csv")).unwrap_err();
    assert!(matches!(err, LoaderError::FileNotFound(_)));

    let path = write_daily_csv(dir.path(), 5);
    let err = load_frame(&path.join("nested.csv")).unwrap_err();
    assert!(matches!(err, LoaderError::Io(_)));

    let text = dir.path().join("rows.txt");
    File::create(&text).unwrap();
    let err = load_frame(&text).unwrap_err();
    assert!(matches!(err, LoaderError::UnsupportedFormat(_)));
}

#[test]
fn test_summary_covers_every_fold() {
    let index: TimeIndex = (0..30).map(day).collect();
    let split = TimeGapSplit::new(index, config(10, 5, 1)).unwrap();
    let rows = split.summary();

    assert_eq!(rows.len(), 6);
    for (i, pair) in rows.chunks(2).enumerate() {
        assert_eq!(pair[0].fold, i);
        assert_eq!(pair[0].part, FoldPart::Train);
        assert_eq!(pair[1].part, FoldPart::Valid);
        assert_eq!(pair[1].samples, 5);
        assert!(pair[0].end < pair[1].start);
    }
}

#[test]
fn test_validator_over_file() {
    let dir = TempDir::new().unwrap();
    let path = write_daily_csv(dir.path(), 60);

    for mode in [WindowMode::Rolling, WindowMode::Expanding] {
        let cfg = config(14, 3, 2).with_window(mode);
        let report = FoldIntegrityValidator::validate_file(&path, "date", cfg).unwrap();
        assert!(report.all_passed(), "{}: {:?}", mode, report.failed_checks());
        assert!(report.fold_count > 0);
    }
}
