//! Classify a food photograph from the command line
//!
//! Loads the published ug-food-detector checkpoint (or a local export) and
//! prints every vocabulary label with its probability, marking the ones that
//! clear the detection threshold.
//!
//! Run with: cargo run --example classify_image -- photo.jpg [model-dir]

use platelens_vision::{IngredientClassifier, IngredientDetector, ModelConfig, ModelSource};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut args = std::env::args().skip(1);
    let image_path = args
        .next()
        .ok_or("usage: classify_image <photo> [model-dir]")?;

    let mut config = ModelConfig::default();
    if let Some(dir) = args.next() {
        config.source = ModelSource::Local { path: dir.into() };
    }

    println!("=== PlateLens Ingredient Classifier ===\n");
    println!("Loading model...");
    println!("(This may take a minute on first run to download the checkpoint)\n");

    let classifier = IngredientClassifier::load(&config)?;

    let image = image::open(&image_path)?;
    println!("Classifying {}\n", image_path);

    let mut scores = classifier.scores(&image)?;
    scores.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    for scored in &scores {
        let marker = if scored.clears(classifier.threshold()) {
            "*"
        } else {
            " "
        };
        println!("{} {:<22} {:.3}", marker, scored.label, scored.score);
    }

    let detected = classifier.detect(&image)?;
    println!("\nDetected ingredients: {:?}", detected);

    Ok(())
}
