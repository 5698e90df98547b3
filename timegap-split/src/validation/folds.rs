//! Fold integrity validation.
//!
//! Re-derives every fold a splitter emits and checks:
//! - Index bounds (every index is a row of the dataset)
//! - Window membership (every row's timestamp lies in its fold's window)
//! - Disjointness (no row is both train and validation)
//! - Gap (latest train timestamp + gap <= earliest validation timestamp)
//! - Train span (rolling windows only) and validation span
//! - Chronological order (fold numbers consecutive, validation windows increasing)
//! - Determinism (a second pass yields the same folds)

use std::collections::HashSet;
use std::path::Path;

use chrono::Duration;
use polars::prelude::DataFrame;
use thiserror::Error;

use crate::data::{load_frame, LoaderError, TimeIndex, TimeWindow};
use crate::split::{Fold, SplitError, TimeGapSplit, WindowConfig, WindowMode};

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),

    #[error("Split error: {0}")]
    Split(#[from] SplitError),
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result of a single validation check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
}

impl CheckResult {
    pub fn pass(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message: message.to_string(),
            details: None,
        }
    }

    pub fn fail(name: &str, message: &str, details: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            message: message.to_string(),
            details,
        }
    }

    fn from_violations(name: &str, ok_message: &str, violations: Vec<String>) -> Self {
        if violations.is_empty() {
            Self::pass(name, ok_message)
        } else {
            Self::fail(
                name,
                &format!("{} folds violate {}", violations.len(), name),
                Some(violations.join("; ")),
            )
        }
    }
}

/// Complete fold integrity report for one splitter.
#[derive(Debug)]
pub struct FoldIntegrityReport {
    pub row_count: usize,
    pub fold_count: usize,
    pub checks: Vec<CheckResult>,
}

impl FoldIntegrityReport {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failed_checks(&self) -> Vec<&CheckResult> {
        self.checks.iter().filter(|c| !c.passed).collect()
    }

    pub fn summary(&self) -> String {
        let passed = self.checks.iter().filter(|c| c.passed).count();
        let total = self.checks.len();
        format!(
            "{} folds over {} rows: {}/{} checks passed",
            self.fold_count, self.row_count, passed, total
        )
    }
}

/// Validator for the folds of a `TimeGapSplit`.
pub struct FoldIntegrityValidator;

impl FoldIntegrityValidator {
    /// Run all checks against the folds of `split`.
    pub fn validate(split: &TimeGapSplit) -> FoldIntegrityReport {
        let folds: Vec<Fold> = split.split().collect();
        let index = split.index();
        let config = split.config();

        let mut checks = vec![
            check_index_bounds(&folds, index.len()),
            check_windows(&folds, index),
            check_disjoint(&folds),
            check_gap(&folds, index, config.gap_duration),
        ];

        if config.window == WindowMode::Rolling {
            if let Some(train) = split.train_duration() {
                checks.push(check_span(&folds, index, "train_span", train, |f| {
                    &f.train_indices
                }));
            }
        }
        checks.push(check_span(
            &folds,
            index,
            "valid_span",
            config.valid_duration,
            |f| &f.valid_indices,
        ));
        checks.push(check_chronological(&folds));
        checks.push(check_deterministic(&folds, split));

        FoldIntegrityReport {
            row_count: index.len(),
            fold_count: folds.len(),
            checks,
        }
    }

    /// Build a splitter over `df` and validate it.
    pub fn validate_frame(
        df: &DataFrame,
        column: &str,
        config: WindowConfig,
    ) -> ValidationResult<FoldIntegrityReport> {
        let split = TimeGapSplit::from_frame(df, column, config)?;
        Ok(Self::validate(&split))
    }

    /// Load a CSV or Parquet file and validate the splitter built over it.
    pub fn validate_file(
        path: &Path,
        column: &str,
        config: WindowConfig,
    ) -> ValidationResult<FoldIntegrityReport> {
        let df = load_frame(path)?;
        Self::validate_frame(&df, column, config)
    }
}

fn check_index_bounds(folds: &[Fold], rows: usize) -> CheckResult {
    let violations: Vec<String> = folds
        .iter()
        .filter_map(|f| {
            let bad = f
                .train_indices
                .iter()
                .chain(&f.valid_indices)
                .filter(|&&i| i >= rows)
                .count();
            (bad > 0).then(|| format!("fold {}: {} indices >= {}", f.fold, bad, rows))
        })
        .collect();

    CheckResult::from_violations(
        "index_bounds",
        &format!("All indices are rows of the {}-row dataset", rows),
        violations,
    )
}

fn check_windows(folds: &[Fold], index: &TimeIndex) -> CheckResult {
    let outside = |rows: &[usize], window: &TimeWindow| {
        rows.iter()
            .filter(|&&row| !index.timestamp(row).is_some_and(|ts| window.contains(ts)))
            .count()
    };

    let violations: Vec<String> = folds
        .iter()
        .filter_map(|f| {
            let train = outside(f.train_indices.as_slice(), &f.train_window);
            let valid = outside(f.valid_indices.as_slice(), &f.valid_window);
            (train + valid > 0).then(|| {
                format!(
                    "fold {}: {} train and {} validation rows outside their window",
                    f.fold, train, valid
                )
            })
        })
        .collect();

    CheckResult::from_violations(
        "windows",
        "Every row lies inside its fold's window",
        violations,
    )
}

fn check_disjoint(folds: &[Fold]) -> CheckResult {
    let violations: Vec<String> = folds
        .iter()
        .filter_map(|f| {
            let train: HashSet<usize> = f.train_indices.iter().copied().collect();
            let shared = f.valid_indices.iter().filter(|i| train.contains(i)).count();
            (shared > 0).then(|| format!("fold {}: {} shared rows", f.fold, shared))
        })
        .collect();

    CheckResult::from_violations(
        "disjoint",
        "Train and validation rows never overlap",
        violations,
    )
}

fn check_gap(folds: &[Fold], index: &TimeIndex, gap: Duration) -> CheckResult {
    let violations: Vec<String> = folds
        .iter()
        .filter_map(|f| {
            let (_, train_max) = index.bounds(&f.train_indices)?;
            let (valid_min, _) = index.bounds(&f.valid_indices)?;
            (train_max + gap > valid_min).then(|| {
                format!(
                    "fold {}: train ends {}, validation starts {}",
                    f.fold, train_max, valid_min
                )
            })
        })
        .collect();

    CheckResult::from_violations(
        "gap",
        &format!("Validation starts at least {} after train", gap),
        violations,
    )
}

fn check_span(
    folds: &[Fold],
    index: &TimeIndex,
    name: &str,
    limit: Duration,
    rows: impl Fn(&Fold) -> &Vec<usize>,
) -> CheckResult {
    let violations: Vec<String> = folds
        .iter()
        .filter_map(|f| {
            let (lo, hi) = index.bounds(rows(f))?;
            (hi - lo > limit).then(|| format!("fold {}: span {} > {}", f.fold, hi - lo, limit))
        })
        .collect();

    CheckResult::from_violations(name, &format!("Every span is at most {}", limit), violations)
}

fn check_chronological(folds: &[Fold]) -> CheckResult {
    let mut violations = Vec::new();
    for (i, f) in folds.iter().enumerate() {
        if f.fold != i {
            violations.push(format!("fold {} at position {}", f.fold, i));
        }
    }
    for pair in folds.windows(2) {
        if pair[1].valid_window.start <= pair[0].valid_window.start {
            violations.push(format!(
                "fold {} validation starts at {}, not after fold {}",
                pair[1].fold, pair[1].valid_window.start, pair[0].fold
            ));
        }
    }

    CheckResult::from_violations(
        "chronological",
        "Folds are numbered in order and move forward in time",
        violations,
    )
}

fn check_deterministic(folds: &[Fold], split: &TimeGapSplit) -> CheckResult {
    if split.split().eq(folds.iter().cloned()) {
        CheckResult::pass("deterministic", "A second pass yields the same folds")
    } else {
        CheckResult::fail(
            "deterministic",
            "A second pass yields different folds",
            None,
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

    use super::*;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    fn daily(n: u32) -> TimeIndex {
        (1..=n).map(day).collect()
    }

    fn fold(n: usize, train: Vec<usize>, valid: Vec<usize>, valid_start: u32) -> Fold {
        Fold {
            fold: n,
            train_window: TimeWindow::new(day(1), day(2)),
            valid_window: TimeWindow::new(day(valid_start), day(valid_start + 1)),
            train_indices: train,
            valid_indices: valid,
        }
    }

    #[test]
    fn test_check_result() {
        let pass = CheckResult::pass("test", "passed");
        assert!(pass.passed);

        let fail = CheckResult::fail("test", "failed", Some("details".to_string()));
        assert!(!fail.passed);
        assert_eq!(fail.details, Some("details".to_string()));
    }

    #[test]
    fn test_valid_split_passes_all_checks() {
        let config = WindowConfig::new(Duration::days(10), Duration::days(2), Duration::days(1));
        let split = TimeGapSplit::new(daily(30), config).unwrap();
        let report = FoldIntegrityValidator::validate(&split);

        assert!(report.all_passed(), "{:?}", report.failed_checks());
        assert_eq!(report.fold_count, 9);
        assert_eq!(report.row_count, 30);
        assert_eq!(report.checks.len(), 8);
        assert_eq!(report.summary(), "9 folds over 30 rows: 8/8 checks passed");
    }

    #[test]
    fn test_expanding_split_skips_train_span() {
        let config = WindowConfig::new(Duration::days(5), Duration::days(3), Duration::zero())
            .with_window(WindowMode::Expanding);
        let split = TimeGapSplit::new(daily(30), config).unwrap();
        let report = FoldIntegrityValidator::validate(&split);

        assert!(report.all_passed());
        assert!(report.checks.iter().all(|c| c.name != "train_span"));
    }

    #[test]
    fn test_detects_out_of_bounds_and_overlap() {
        let folds = vec![fold(0, vec![0, 1, 2], vec![2, 40], 3)];

        assert!(!check_index_bounds(&folds, 30).passed);
        let disjoint = check_disjoint(&folds);
        assert!(!disjoint.passed);
        assert_eq!(disjoint.details.as_deref(), Some("fold 0: 1 shared rows"));
    }

    #[test]
    fn test_detects_rows_outside_window() {
        let index = daily(10);
        // Train window is Jan 1 only; Jan 3 (row 2) falls outside it.
        let folds = vec![fold(0, vec![0, 2], vec![5], 6)];

        let check = check_windows(&folds, &index);
        assert!(!check.passed);
        assert_eq!(
            check.details.as_deref(),
            Some("fold 0: 1 train and 0 validation rows outside their window")
        );

        assert!(check_windows(&[fold(0, vec![0], vec![5], 6)], &index).passed);
    }

    #[test]
    fn test_detects_gap_violation() {
        let index = daily(10);
        // Train ends Jan 5, validation starts Jan 6; a 2 day gap is violated.
        let folds = vec![fold(0, vec![3, 4], vec![5, 6], 6)];

        assert!(check_gap(&folds, &index, Duration::days(1)).passed);
        assert!(!check_gap(&folds, &index, Duration::days(2)).passed);
    }

    #[test]
    fn test_detects_span_violation() {
        let index = daily(10);
        let folds = vec![fold(0, vec![0, 1, 2, 3], vec![5], 6)];

        let check = check_span(&folds, &index, "train_span", Duration::days(2), |f| {
            &f.train_indices
        });
        assert!(!check.passed);
        assert_eq!(check.name, "train_span");
    }

    #[test]
    fn test_detects_out_of_order_folds() {
        let folds = vec![
            fold(0, vec![0], vec![3], 4),
            fold(2, vec![1], vec![2], 3),
        ];
        let check = check_chronological(&folds);
        assert!(!check.passed);
        assert_eq!(check.message, "2 folds violate chronological");
    }
}
