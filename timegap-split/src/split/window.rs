//! Window configuration for gap-aware splits.
//!
//! Three durations drive every fold:
//! - Train: span of rows used for fitting
//! - Gap: span skipped between the train and validation windows
//! - Valid: span of rows used for evaluation, and the roll step
//!
//! Durations are written as an integer followed by a unit (`10d`, `36h`,
//! `2w`, `90m`, `30s`, `500ms`) in config files and on the command line.

use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::splitter::SplitError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DurationParseError {
    #[error("Empty duration")]
    Empty,

    #[error("Invalid duration amount: {0}")]
    InvalidAmount(String),

    #[error("Unknown duration unit '{unit}' in '{input}' (expected w, d, h, m, s or ms)")]
    UnknownUnit { input: String, unit: String },

    #[error("Duration out of range: {0}")]
    OutOfRange(String),
}

/// Parse a duration literal such as `10d` or `-2h`.
pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(DurationParseError::Empty);
    }

    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, s),
    };

    let split_at = body
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(body.len());
    let (amount, unit) = body.split_at(split_at);

    let amount: i64 = amount
        .parse()
        .map_err(|_| DurationParseError::InvalidAmount(s.to_string()))?;
    let amount = if negative { -amount } else { amount };

    let duration = match unit.trim() {
        "w" => Duration::try_weeks(amount),
        "d" => Duration::try_days(amount),
        "h" => Duration::try_hours(amount),
        "m" => Duration::try_minutes(amount),
        "s" => Duration::try_seconds(amount),
        "ms" => Duration::try_milliseconds(amount),
        other => {
            return Err(DurationParseError::UnknownUnit {
                input: s.to_string(),
                unit: other.to_string(),
            });
        }
    };

    duration.ok_or_else(|| DurationParseError::OutOfRange(s.to_string()))
}

/// Format a duration as a literal `parse_duration` reads back.
///
/// Uses the largest unit that divides the duration exactly; weeks are
/// written as days. Sub-millisecond precision is dropped.
pub fn format_duration(duration: Duration) -> String {
    const UNITS: &[(i64, &str)] = &[
        (86_400_000, "d"),
        (3_600_000, "h"),
        (60_000, "m"),
        (1_000, "s"),
    ];

    let ms = duration.num_milliseconds();
    if ms == 0 {
        return "0d".to_string();
    }
    for &(size, unit) in UNITS {
        if ms % size == 0 {
            return format!("{}{}", ms / size, unit);
        }
    }
    format!("{}ms", ms)
}

/// Serde adapter for durations written as literals.
pub mod duration_literal {
    use chrono::Duration;
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::{format_duration, parse_duration};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(de::Error::custom)
    }

    /// Same as the parent module, for optional fields.
    pub mod option {
        use chrono::Duration;
        use serde::{de, Deserialize, Deserializer, Serializer};

        use super::super::{format_duration, parse_duration};

        pub fn serialize<S: Serializer>(
            duration: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match duration {
                Some(d) => serializer.serialize_some(&format_duration(*d)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|s| parse_duration(&s).map_err(de::Error::custom))
                .transpose()
        }
    }
}

/// How the train window moves from fold to fold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowMode {
    /// Fixed-length train window that rolls with the validation window.
    #[default]
    Rolling,
    /// Train window keeps its first start and grows every fold.
    Expanding,
}

impl WindowMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rolling => "rolling",
            Self::Expanding => "expanding",
        }
    }
}

impl fmt::Display for WindowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durations and roll policy for a split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Train window length. Derived from the data when `None` and
    /// `n_splits` is set.
    #[serde(default, with = "duration_literal::option")]
    pub train_duration: Option<Duration>,
    /// Validation window length, also the step between folds.
    #[serde(with = "duration_literal")]
    pub valid_duration: Duration,
    /// Minimum offset between a train window end and its validation start.
    #[serde(default = "Duration::zero", with = "duration_literal")]
    pub gap_duration: Duration,
    /// Number of folds, counted back from the end of the data.
    #[serde(default)]
    pub n_splits: Option<usize>,
    #[serde(default)]
    pub window: WindowMode,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            train_duration: Some(Duration::days(10)),
            valid_duration: Duration::days(2),
            gap_duration: Duration::days(1),
            n_splits: None,
            window: WindowMode::Rolling,
        }
    }
}

impl WindowConfig {
    /// Config with explicit train, validation and gap durations.
    pub fn new(train: Duration, valid: Duration, gap: Duration) -> Self {
        Self {
            train_duration: Some(train),
            valid_duration: valid,
            gap_duration: gap,
            n_splits: None,
            window: WindowMode::Rolling,
        }
    }

    /// Config that derives the train duration from the data so that
    /// exactly `n_splits` folds fit.
    pub fn from_n_splits(n_splits: usize, valid: Duration, gap: Duration) -> Self {
        Self {
            train_duration: None,
            valid_duration: valid,
            gap_duration: gap,
            n_splits: Some(n_splits),
            window: WindowMode::Rolling,
        }
    }

    /// Limit the number of folds, anchoring the last one at the end of the data.
    pub fn with_n_splits(mut self, n_splits: usize) -> Self {
        self.n_splits = Some(n_splits);
        self
    }

    pub fn with_window(mut self, window: WindowMode) -> Self {
        self.window = window;
        self
    }

    /// Check durations and fold count.
    pub fn validate(&self) -> Result<(), SplitError> {
        if let Some(train) = self.train_duration {
            check_positive("train_duration", train)?;
        }
        check_positive("valid_duration", self.valid_duration)?;

        if self.gap_duration < Duration::zero() {
            return Err(SplitError::NegativeDuration {
                name: "gap_duration",
                value: self.gap_duration,
            });
        }

        match (self.train_duration, self.n_splits) {
            (None, None) => Err(SplitError::MissingTrainDuration),
            (_, Some(0)) => Err(SplitError::ZeroSplits),
            _ => Ok(()),
        }
    }
}

fn check_positive(name: &'static str, value: Duration) -> Result<(), SplitError> {
    if value < Duration::zero() {
        Err(SplitError::NegativeDuration { name, value })
    } else if value.is_zero() {
        Err(SplitError::ZeroDuration(name))
    } else {
        Ok(())
    }
}
