//! PlateLens Vision
//!
//! Candle-backed ingredient classification for food photographs.
//!
//! This crate provides:
//! - Checkpoint resolution from a local directory or the HuggingFace Hub
//! - Image preprocessing faithful to the checkpoint's exported processor
//! - A ViT classifier producing softmax scores over the ingredient vocabulary
//! - Threshold-based label selection in vocabulary order

pub mod classifier;
pub mod config;
pub mod hub;
pub mod preprocess;

pub use classifier::{select_labels, IngredientClassifier, IngredientDetector};
pub use config::{DeviceSpec, ModelConfig, ModelSource};
pub use hub::ModelArtifacts;
pub use preprocess::ImageProcessor;
