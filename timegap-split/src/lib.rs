pub mod config;
pub mod data;
pub mod split;
pub mod validation;

// Re-export commonly used types
pub use config::{ConfigError, RunConfig};
pub use data::{load_frame, time_index_from_frame, LoaderError, TimeIndex, TimeWindow};
pub use split::{
    Fold, FoldPart, FoldSummary, Folds, SplitError, SplitResult, TimeGapSplit, WindowConfig,
    WindowMode,
};
pub use validation::{FoldIntegrityReport, FoldIntegrityValidator};
