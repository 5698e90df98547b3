//! Validation of emitted folds.
//!
//! Re-checks the invariants every fold must satisfy:
//! - Train and validation rows are disjoint and in bounds
//! - The gap separates train from validation
//! - Windows respect their configured spans

pub mod folds;

pub use folds::{
    CheckResult, FoldIntegrityReport, FoldIntegrityValidator, ValidationError, ValidationResult,
};
