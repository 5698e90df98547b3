//! Core data types for time-based splitting.
//!
//! These types carry the timestamp column of a dataset, aligned to row
//! positions, together with the chronological ordering the splitter
//! needs to select rows by time window.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// A half-open time span `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    /// First instant inside the window.
    pub start: NaiveDateTime,
    /// First instant after the window.
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Whether `ts` falls inside the window.
    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Length of the window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Timestamp column of a dataset.
///
/// Entry `i` is the timestamp of row position `i` in the original data,
/// which does not need to be sorted. The index keeps a stable
/// chronological ordering of the rows so that window lookups are two
/// binary searches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeIndex {
    timestamps: Vec<NaiveDateTime>,
    /// Row positions sorted by timestamp; ties keep row order.
    order: Vec<usize>,
}

impl TimeIndex {
    /// Build an index from one timestamp per row.
    pub fn new(timestamps: Vec<NaiveDateTime>) -> Self {
        let mut order: Vec<usize> = (0..timestamps.len()).collect();
        order.sort_by_key(|&row| timestamps[row]);
        Self { timestamps, order }
    }

    /// Build an index from calendar dates, each taken at midnight.
    pub fn from_dates(dates: &[NaiveDate]) -> Self {
        Self::new(dates.iter().map(|d| d.and_time(NaiveTime::MIN)).collect())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Timestamp of a row position.
    pub fn timestamp(&self, row: usize) -> Option<NaiveDateTime> {
        self.timestamps.get(row).copied()
    }

    /// Earliest timestamp.
    pub fn first(&self) -> Option<NaiveDateTime> {
        self.order.first().map(|&row| self.timestamps[row])
    }

    /// Latest timestamp.
    pub fn last(&self) -> Option<NaiveDateTime> {
        self.order.last().map(|&row| self.timestamps[row])
    }

    /// Distance between the earliest and latest timestamp.
    pub fn span(&self) -> Option<Duration> {
        Some(self.last()? - self.first()?)
    }

    /// Row positions whose timestamp falls inside `window`, in chronological order.
    pub fn rows_in(&self, window: &TimeWindow) -> Vec<usize> {
        let lo = self
            .order
            .partition_point(|&row| self.timestamps[row] < window.start);
        let hi = self
            .order
            .partition_point(|&row| self.timestamps[row] < window.end);

        if lo >= hi {
            return Vec::new();
        }
        self.order[lo..hi].to_vec()
    }

    /// Number of rows whose timestamp falls inside `window`.
    pub fn count_in(&self, window: &TimeWindow) -> usize {
        let lo = self
            .order
            .partition_point(|&row| self.timestamps[row] < window.start);
        let hi = self
            .order
            .partition_point(|&row| self.timestamps[row] < window.end);
        hi.saturating_sub(lo)
    }

    /// Earliest timestamp at or after `ts`.
    pub fn next_at_or_after(&self, ts: NaiveDateTime) -> Option<NaiveDateTime> {
        let pos = self.order.partition_point(|&row| self.timestamps[row] < ts);
        self.order.get(pos).map(|&row| self.timestamps[row])
    }

    /// Number of distinct timestamps among `rows`.
    pub fn unique_timestamps(&self, rows: &[usize]) -> usize {
        let mut ts: Vec<NaiveDateTime> = rows
            .iter()
            .filter_map(|&row| self.timestamp(row))
            .collect();
        ts.sort();
        ts.dedup();
        ts.len()
    }

    /// Earliest and latest timestamp among `rows`.
    pub fn bounds(&self, rows: &[usize]) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let mut iter = rows.iter().filter_map(|&row| self.timestamp(row));
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), ts| (lo.min(ts), hi.max(ts))))
    }
}

impl From<Vec<NaiveDateTime>> for TimeIndex {
    fn from(timestamps: Vec<NaiveDateTime>) -> Self {
        Self::new(timestamps)
    }
}

impl FromIterator<NaiveDateTime> for TimeIndex {
    fn from_iter<I: IntoIterator<Item = NaiveDateTime>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
