//! Gap-aware time-series cross-validation.
//!
//! Rolls a validation window over the timestamp range of a dataset:
//! - Train: rows in the window ending `gap_duration` before validation
//! - Gap: rows skipped so train never touches the validation period
//! - Valid: rows in `[cursor, cursor + valid_duration)`
//! - Roll: `valid_duration`

pub mod splitter;
pub mod summary;
pub mod window;

pub use splitter::{Fold, Folds, SplitError, SplitResult, TimeGapSplit};
pub use summary::{render_table, FoldPart, FoldSummary};
pub use window::{format_duration, parse_duration, DurationParseError, WindowConfig, WindowMode};
