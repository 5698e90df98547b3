//! Gap-aware time-series splitting.
//!
//! Rolls a validation window across the timestamp range of a dataset and
//! pairs it with a train window that ends `gap_duration` before it:
//!
//! ```text
//! |----- train -----|-- gap --|-- valid --|
//!                   |----- train -----|-- gap --|-- valid --|
//! ```
//!
//! Folds come out earliest first. The cursor steps by `valid_duration`,
//! and a validation window that would reach past the latest timestamp is
//! dropped rather than truncated.
//!
//! Windows are half-open, so the row at the latest timestamp is never
//! validation data. A range of exactly `train + gap + valid` yields one
//! fold only when some row falls in `[last - valid, last)` and some row in
//! the train window before it; sparser data yields none.

use std::iter::FusedIterator;

use chrono::{Duration, NaiveDateTime};
use polars::prelude::{DataFrame, Series};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::data::{time_index_from_frame, LoaderError, TimeIndex, TimeWindow};

use super::window::{format_duration, WindowConfig, WindowMode};

#[derive(Error, Debug)]
pub enum SplitError {
    #[error("{name} must not be negative, got {value}")]
    NegativeDuration { name: &'static str, value: Duration },

    #[error("{0} must be positive")]
    ZeroDuration(&'static str),

    #[error("Either train_duration or n_splits must be set")]
    MissingTrainDuration,

    #[error("n_splits must be at least 1")]
    ZeroSplits,

    #[error("Date range {available} is too short for {n_splits} folds (needs at least {required})")]
    InsufficientHistory {
        available: Duration,
        required: Duration,
        n_splits: usize,
    },

    #[error("Date range {available} leaves no train window after {reserved} of gap and validation for {n_splits} folds")]
    NoTrainWindow {
        available: Duration,
        reserved: Duration,
        n_splits: usize,
    },

    #[error("{what} has {actual} rows, expected {expected} to match the timestamp column")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),
}

pub type SplitResult<T> = Result<T, SplitError>;

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// A single train/validation fold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    /// Fold number (0-indexed, chronological).
    pub fold: usize,
    /// Window the train rows were selected from.
    pub train_window: TimeWindow,
    /// Window the validation rows were selected from.
    pub valid_window: TimeWindow,
    /// Train row positions, chronological.
    pub train_indices: Vec<usize>,
    /// Validation row positions, chronological.
    pub valid_indices: Vec<usize>,
}

impl Fold {
    pub fn train_len(&self) -> usize {
        self.train_indices.len()
    }

    pub fn valid_len(&self) -> usize {
        self.valid_indices.len()
    }
}

/// Durations resolved against the data range.
#[derive(Debug, Clone, Copy)]
struct Schedule {
    train: Duration,
    valid: Duration,
    gap: Duration,
    mode: WindowMode,
    /// Start of the first train window.
    anchor: NaiveDateTime,
    /// Start of the first validation window.
    first_cursor: Option<NaiveDateTime>,
    /// Latest timestamp in the data.
    last: NaiveDateTime,
}

impl Schedule {
    fn resolve(
        config: &WindowConfig,
        first: NaiveDateTime,
        last: NaiveDateTime,
    ) -> SplitResult<Self> {
        let span = last - first;
        let valid = config.valid_duration;
        let gap = config.gap_duration;

        let (train, first_cursor) = match (config.train_duration, config.n_splits) {
            (Some(train), None) => {
                let cursor = train
                    .checked_add(&gap)
                    .and_then(|offset| first.checked_add_signed(offset));
                (train, cursor)
            }
            (None, Some(n_splits)) => {
                let reserved = roll_span(valid, n_splits).and_then(|s| s.checked_add(&gap));
                let train = reserved
                    .and_then(|used| span.checked_sub(&used))
                    .filter(|train| *train > Duration::zero())
                    .ok_or_else(|| SplitError::NoTrainWindow {
                        available: span,
                        reserved: reserved.unwrap_or(Duration::MAX),
                        n_splits,
                    })?;
                (train, first.checked_add_signed(train + gap))
            }
            (Some(train), Some(n_splits)) => {
                let shift = roll_span(valid, n_splits);
                let required = shift
                    .and_then(|s| s.checked_add(&train))
                    .and_then(|r| r.checked_add(&gap));
                match required {
                    Some(required) if required <= span => {}
                    _ => {
                        return Err(SplitError::InsufficientHistory {
                            available: span,
                            required: required.unwrap_or(Duration::MAX),
                            n_splits,
                        });
                    }
                }
                // `required <= span` bounds every offset below by the data range.
                let cursor = last - shift.unwrap_or(Duration::zero());
                (train, Some(cursor))
            }
            (None, None) => return Err(SplitError::MissingTrainDuration),
        };

        let anchor = first_cursor
            .and_then(|c| c.checked_sub_signed(gap))
            .and_then(|c| c.checked_sub_signed(train))
            .unwrap_or(first);

        Ok(Self {
            train,
            valid,
            gap,
            mode: config.window,
            anchor,
            first_cursor,
            last,
        })
    }

    /// Train and validation windows for a validation start, or `None`
    /// once the validation window would end after the latest timestamp.
    fn windows_at(&self, cursor: NaiveDateTime) -> Option<(TimeWindow, TimeWindow)> {
        let valid_end = cursor.checked_add_signed(self.valid)?;
        if valid_end > self.last {
            return None;
        }

        let train_end = cursor.checked_sub_signed(self.gap)?;
        let train_start = match self.mode {
            WindowMode::Rolling => train_end.checked_sub_signed(self.train)?,
            WindowMode::Expanding => self.anchor,
        };

        Some((
            TimeWindow::new(train_start, train_end),
            TimeWindow::new(cursor, valid_end),
        ))
    }

    /// Latest validation start on the `cursor + k * valid` grid that is
    /// not after `ts`.
    fn align(&self, cursor: NaiveDateTime, ts: NaiveDateTime) -> Option<NaiveDateTime> {
        let step = total_nanos(self.valid);
        let distance = total_nanos(ts - cursor);
        let offset = distance - distance.rem_euclid(step);
        cursor.checked_add_signed(from_nanos(offset)?)
    }
}

fn total_nanos(d: Duration) -> i128 {
    i128::from(d.num_seconds()) * NANOS_PER_SEC + i128::from(d.subsec_nanos())
}

fn from_nanos(nanos: i128) -> Option<Duration> {
    let secs = i64::try_from(nanos.div_euclid(NANOS_PER_SEC)).ok()?;
    let rest = i64::try_from(nanos.rem_euclid(NANOS_PER_SEC)).ok()?;
    Duration::try_seconds(secs)?.checked_add(&Duration::nanoseconds(rest))
}

/// `valid * n_splits`, or `None` on overflow.
fn roll_span(valid: Duration, n_splits: usize) -> Option<Duration> {
    i32::try_from(n_splits)
        .ok()
        .and_then(|n| valid.checked_mul(n))
}

/// Iterator over the (train, validation) window pairs of a schedule whose
/// validation window holds at least one row. Train windows may be empty.
///
/// Runs of empty validation windows are jumped in one step, so a pass
/// costs one lookup per emitted pair rather than one per window.
#[derive(Debug, Clone)]
struct Windows<'a> {
    index: &'a TimeIndex,
    schedule: Option<Schedule>,
    cursor: Option<NaiveDateTime>,
}

impl Iterator for Windows<'_> {
    type Item = (TimeWindow, TimeWindow);

    fn next(&mut self) -> Option<Self::Item> {
        let schedule = self.schedule?;

        while let Some(cursor) = self.cursor {
            let Some(pair) = schedule.windows_at(cursor) else {
                self.cursor = None;
                break;
            };

            if self.index.count_in(&pair.1) > 0 {
                self.cursor = Some(pair.1.end);
                return Some(pair);
            }

            self.cursor = self
                .index
                .next_at_or_after(pair.1.end)
                .and_then(|next| schedule.align(cursor, next));
        }
        None
    }
}

/// Gap-aware time-series cross-validation splitter.
///
/// Holds the timestamp column of one dataset and an immutable window
/// configuration. Every call to [`TimeGapSplit::split`] starts a fresh,
/// lazy pass over the folds.
#[derive(Debug, Clone)]
pub struct TimeGapSplit {
    index: TimeIndex,
    config: WindowConfig,
    schedule: Option<Schedule>,
}

impl TimeGapSplit {
    /// Create a splitter over a timestamp column.
    ///
    /// Fails on an invalid configuration, or when `n_splits` folds cannot
    /// fit in the data range. A range too short for a single fold is not an
    /// error; the splitter then yields no folds.
    pub fn new(index: TimeIndex, config: WindowConfig) -> SplitResult<Self> {
        config.validate()?;

        let schedule = match (index.first(), index.last()) {
            (Some(first), Some(last)) => Some(Schedule::resolve(&config, first, last)?),
            _ => None,
        };

        let split = Self {
            index,
            config,
            schedule,
        };

        let n_splits = split.n_splits();
        if n_splits == 0 {
            warn!("No folds for {} rows: {}", split.index.len(), split.range_report());
        } else {
            info!(
                "{} {} folds over {} rows (train {}, gap {}, valid {})",
                n_splits,
                split.config.window,
                split.index.len(),
                split.train_duration().unwrap_or_else(Duration::zero),
                split.config.gap_duration,
                split.config.valid_duration
            );
        }

        Ok(split)
    }

    /// Create a splitter from the timestamp column `column` of a frame.
    pub fn from_frame(df: &DataFrame, column: &str, config: WindowConfig) -> SplitResult<Self> {
        let index = time_index_from_frame(df, column)?;
        Self::new(index, config)
    }

    /// Lazily generate folds over the timestamp column.
    pub fn split(&self) -> Folds<'_> {
        Folds {
            index: &self.index,
            windows: self.windows(),
            next_fold: 0,
        }
    }

    /// Generate folds for features (and optionally labels) aligned with the
    /// timestamp column by row position.
    pub fn split_frame(&self, features: &DataFrame, labels: Option<&Series>) -> SplitResult<Folds<'_>> {
        self.check_rows("features", features.height())?;
        if let Some(labels) = labels {
            self.check_rows("labels", labels.len())?;
        }
        Ok(self.split())
    }

    /// Number of folds `split` yields.
    pub fn n_splits(&self) -> usize {
        self.windows()
            .filter(|(train, _)| self.index.count_in(train) > 0)
            .count()
    }

    /// Train window length in effect, derived from the data when the
    /// configuration only sets `n_splits`.
    pub fn train_duration(&self) -> Option<Duration> {
        self.schedule
            .map(|s| s.train)
            .or(self.config.train_duration)
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    pub fn index(&self) -> &TimeIndex {
        &self.index
    }

    fn windows(&self) -> Windows<'_> {
        Windows {
            index: &self.index,
            schedule: self.schedule,
            cursor: self.schedule.and_then(|s| s.first_cursor),
        }
    }

    /// Date range next to the length one fold spans.
    fn range_report(&self) -> String {
        let needed = self
            .train_duration()
            .and_then(|t| t.checked_add(&self.config.gap_duration))
            .and_then(|t| t.checked_add(&self.config.valid_duration));
        format!(
            "date range {}, train + gap + valid {}",
            format_duration(self.index.span().unwrap_or_else(Duration::zero)),
            needed.map_or_else(|| "out of range".to_string(), format_duration)
        )
    }

    fn check_rows(&self, what: &'static str, actual: usize) -> SplitResult<()> {
        if actual != self.index.len() {
            return Err(SplitError::LengthMismatch {
                what,
                expected: self.index.len(),
                actual,
            });
        }
        Ok(())
    }
}

/// Lazy, chronological sequence of folds.
///
/// Window pairs where either side selects no rows are skipped; fold
/// numbers stay consecutive.
#[derive(Debug, Clone)]
pub struct Folds<'a> {
    index: &'a TimeIndex,
    windows: Windows<'a>,
    next_fold: usize,
}

impl Iterator for Folds<'_> {
    type Item = Fold;

    fn next(&mut self) -> Option<Self::Item> {
        for (train_window, valid_window) in self.windows.by_ref() {
            let train_indices = self.index.rows_in(&train_window);
            let valid_indices = self.index.rows_in(&valid_window);

            if train_indices.is_empty() || valid_indices.is_empty() {
                debug!(
                    "Skipping window at {}: {} train rows, {} valid rows",
                    valid_window.start,
                    train_indices.len(),
                    valid_indices.len()
                );
                continue;
            }

            let fold = Fold {
                fold: self.next_fold,
                train_window,
                valid_window,
                train_indices,
                valid_indices,
            };
            self.next_fold += 1;

            debug!(
                "Fold {}: train {} -> {} ({} rows), valid {} -> {} ({} rows)",
                fold.fold,
                fold.train_window.start,
                fold.train_window.end,
                fold.train_len(),
                fold.valid_window.start,
                fold.valid_window.end,
                fold.valid_len()
            );
            return Some(fold);
        }
        None
    }
}

impl FusedIterator for Folds<'_> {}
