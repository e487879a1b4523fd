//! Classifier integration tests against the published checkpoint
//!
//! These download `ssevan/ug-food-detector` from the HuggingFace Hub, so
//! they are gated behind the `hub-tests` feature and need network access
//! on the first run.
//!
//! Run with: cargo test -p platelens-vision --features hub-tests

#![cfg(feature = "hub-tests")]

use image::{DynamicImage, Rgb, RgbImage};
use platelens_core::INGREDIENT_LABELS;
use platelens_vision::{IngredientClassifier, IngredientDetector, ModelConfig, ModelSource};

fn load_classifier() -> IngredientClassifier {
    IngredientClassifier::load(&ModelConfig::default())
        .expect("Failed to load published checkpoint")
}

fn synthetic_plate() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(640, 480, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x / 3 + y / 3) % 256) as u8])
    }))
}

#[test]
fn test_load_published_checkpoint() {
    let classifier = load_classifier();
    assert!((classifier.threshold() - 0.3).abs() < f32::EPSILON);
}

#[test]
fn test_scores_cover_the_vocabulary() {
    let classifier = load_classifier();
    let scores = classifier.scores(&synthetic_plate()).unwrap();

    assert_eq!(scores.len(), INGREDIENT_LABELS.len());
    let total: f32 = scores.iter().map(|s| s.score).sum();
    assert!((total - 1.0).abs() < 1e-3, "scores should sum to ~1.0, got {}", total);
}

#[test]
fn test_detection_is_deterministic() {
    let classifier = load_classifier();
    let image = synthetic_plate();

    let first = classifier.detect(&image).unwrap();
    let second = classifier.detect(&image).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_detected_labels_are_ordered_vocabulary_entries() {
    let classifier = load_classifier();
    let detected = classifier.detect(&synthetic_plate()).unwrap();

    let indices: Vec<usize> = detected
        .iter()
        .map(|label| {
            INGREDIENT_LABELS
                .iter()
                .position(|known| known == label)
                .expect("detected label outside the vocabulary")
        })
        .collect();

    // Vocabulary order implies strictly increasing indices and no duplicates.
    assert!(indices.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn test_missing_repo_fails_to_load() {
    let config = ModelConfig {
        source: ModelSource::HuggingFace {
            repo: "platelens/this-model-does-not-exist-12345".to_string(),
            revision: "main".to_string(),
        },
        ..ModelConfig::default()
    };

    assert!(IngredientClassifier::load(&config).is_err());
}
