//! Invoice field extraction module.

mod blocks;
pub mod convert;
mod engine;
pub mod fuzzy;
pub mod rules;

pub use blocks::{normalize, BlockNormalizer, TextBlock};
pub use engine::{ExtractionResult, RuleEngine, RuleMatch};
pub use fuzzy::partial_ratio;
pub use rules::{rules_for, Capture, Extraction, FieldRule};

use crate::error::ExtractionError;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;
