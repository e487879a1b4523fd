//! PlateLens Core
//!
//! Core types and utilities shared across PlateLens components.
//!
//! This crate provides:
//! - Error types and result handling
//! - The fixed ingredient vocabulary, index-aligned with the classifier head
//! - Shared types for scored predictions

pub mod error;
pub mod labels;
pub mod types;

pub use error::{Error, Result};
pub use labels::INGREDIENT_LABELS;
pub use types::ScoredLabel;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::labels::INGREDIENT_LABELS;
    pub use crate::types::ScoredLabel;
}
