//! Per-fold summaries.
//!
//! One row per fold and part, with the actual first and last timestamp the
//! part selected. This is what a plotting or reporting consumer draws from.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::data::TimeIndex;

use super::splitter::{Fold, TimeGapSplit};
use super::window::{duration_literal, format_duration};

/// Which side of a fold a summary row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoldPart {
    Train,
    Valid,
}

impl FoldPart {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Valid => "valid",
        }
    }
}

/// Summary of one part of one fold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldSummary {
    pub fold: usize,
    pub part: FoldPart,
    /// Earliest selected timestamp.
    pub start: NaiveDateTime,
    /// Latest selected timestamp.
    pub end: NaiveDateTime,
    /// `end - start`.
    #[serde(with = "duration_literal")]
    pub period: Duration,
    pub unique_timestamps: usize,
    pub samples: usize,
}

impl FoldSummary {
    fn from_rows(fold: usize, part: FoldPart, index: &TimeIndex, rows: &[usize]) -> Option<Self> {
        let (start, end) = index.bounds(rows)?;
        Some(Self {
            fold,
            part,
            start,
            end,
            period: end - start,
            unique_timestamps: index.unique_timestamps(rows),
            samples: rows.len(),
        })
    }

    /// Train and validation rows for a fold.
    pub fn for_fold(fold: &Fold, index: &TimeIndex) -> Vec<Self> {
        [
            (FoldPart::Train, &fold.train_indices),
            (FoldPart::Valid, &fold.valid_indices),
        ]
        .into_iter()
        .filter_map(|(part, rows)| Self::from_rows(fold.fold, part, index, rows))
        .collect()
    }
}

impl TimeGapSplit {
    /// Summary rows for every fold, train before valid.
    pub fn summary(&self) -> Vec<FoldSummary> {
        self.split()
            .flat_map(|fold| FoldSummary::for_fold(&fold, self.index()))
            .collect()
    }
}

/// Render summary rows as a fixed-width text table.
pub fn render_table(rows: &[FoldSummary]) -> String {
    let mut out = format!(
        "{:>4}  {:<5}  {:<19}  {:<19}  {:>8}  {:>6}  {:>7}\n",
        "fold", "part", "start", "end", "period", "unique", "samples"
    );
    for row in rows {
        out.push_str(&format!(
            "{:>4}  {:<5}  {:<19}  {:<19}  {:>8}  {:>6}  {:>7}\n",
            row.fold,
            row.part.as_str(),
            row.start.format("%Y-%m-%d %H:%M:%S").to_string(),
            row.end.format("%Y-%m-%d %H:%M:%S").to_string(),
            format_duration(row.period),
            row.unique_timestamps,
            row.samples
        ));
    }
    out
}
