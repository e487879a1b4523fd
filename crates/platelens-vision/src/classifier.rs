//! ViT-backed ingredient classifier

use crate::config::ModelConfig;
use crate::hub::ModelArtifacts;
use crate::preprocess::ImageProcessor;
use candle_core::{DType, Device, Tensor, D};
use candle_nn::VarBuilder;
use candle_transformers::models::vit;
use image::DynamicImage;
use platelens_core::{Error, Result, ScoredLabel, INGREDIENT_LABELS};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Detection interface the HTTP layer depends on
pub trait IngredientDetector: Send + Sync {
    /// All vocabulary labels scoring strictly above the detector's
    /// threshold, in vocabulary order
    fn detect(&self, image: &DynamicImage) -> Result<Vec<&'static str>>;
}

/// Image classifier over the fixed ingredient vocabulary
pub struct IngredientClassifier {
    model: vit::Model,
    processor: ImageProcessor,
    device: Device,
    threshold: f32,
}

impl IngredientClassifier {
    /// Load the classifier described by `config`
    ///
    /// Resolves checkpoint files, builds the image processor from the
    /// checkpoint's exported settings (ViT defaults when absent), and maps
    /// the weights onto a ViT with a 40-way classification head.
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let artifacts = ModelArtifacts::resolve(&config.source)?;
        let device = config.device.device()?;

        let vit_config: vit::Config = parse_json_config(&artifacts.config)?;

        let processor = match &artifacts.preprocessor {
            Some(path) => ImageProcessor::from_file(path)?,
            None => {
                tracing::debug!("No processor config in checkpoint, using ViT defaults");
                ImageProcessor::default()
            }
        };

        let vb = load_var_builder(&artifacts, &device)?;
        let model = vit::Model::new(&vit_config, INGREDIENT_LABELS.len(), vb)
            .map_err(|e| Error::model(format!("Failed to load ViT model: {}", e)))?;

        tracing::info!(
            "Loaded ingredient classifier ({} labels, {}x{} input, threshold {})",
            INGREDIENT_LABELS.len(),
            processor.width(),
            processor.height(),
            config.threshold
        );

        Ok(Self {
            model,
            processor,
            device,
            threshold: config.threshold,
        })
    }

    /// Softmax probabilities over the full vocabulary, in logit order
    pub fn probabilities(&self, image: &DynamicImage) -> Result<Vec<f32>> {
        let input = self.processor.preprocess(image, &self.device)?;
        let batch = input
            .unsqueeze(0)
            .map_err(|e| Error::model(format!("Failed to batch input: {}", e)))?;

        let logits = self
            .model
            .forward(&batch)
            .map_err(|e| Error::model(format!("Model forward pass failed: {}", e)))?;

        to_probabilities(&logits)
    }

    /// Every label paired with its probability, in logit order
    pub fn scores(&self, image: &DynamicImage) -> Result<Vec<ScoredLabel>> {
        let probs = self.probabilities(image)?;
        Ok(INGREDIENT_LABELS
            .iter()
            .zip(probs)
            .map(|(&label, score)| ScoredLabel::new(label, score))
            .collect())
    }

    /// Detection threshold this classifier was configured with
    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

impl IngredientDetector for IngredientClassifier {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<&'static str>> {
        let probs = self.probabilities(image)?;
        Ok(select_labels(&probs, self.threshold))
    }
}

/// Labels whose probability is strictly greater than `threshold`,
/// preserving vocabulary order
pub fn select_labels(probs: &[f32], threshold: f32) -> Vec<&'static str> {
    INGREDIENT_LABELS
        .iter()
        .zip(probs)
        .filter(|(_, &prob)| prob > threshold)
        .map(|(&label, _)| label)
        .collect()
}

fn parse_json_config<T: DeserializeOwned>(config_path: &Path) -> Result<T> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        Error::model(format!(
            "Failed to read config {}: {}",
            config_path.display(),
            e
        ))
    })?;

    serde_json::from_str(&config_str).map_err(|e| {
        Error::model(format!(
            "Failed to parse config {}: {}",
            config_path.display(),
            e
        ))
    })
}

fn load_var_builder(artifacts: &ModelArtifacts, device: &Device) -> Result<VarBuilder<'static>> {
    if artifacts.weights_are_safetensors() {
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[artifacts.weights.clone()], DType::F32, device)
                .map_err(|e| Error::model(format!("Failed to load weights: {}", e)))?
        };
        Ok(vb)
    } else {
        VarBuilder::from_pth(&artifacts.weights, DType::F32, device)
            .map_err(|e| Error::model(format!("Failed to load weights: {}", e)))
    }
}

fn to_probabilities(logits: &Tensor) -> Result<Vec<f32>> {
    candle_nn::ops::softmax(logits, D::Minus1)
        .map_err(|e| Error::model(format!("Softmax failed: {}", e)))?
        .squeeze(0)
        .map_err(|e| Error::model(format!("Squeeze failed: {}", e)))?
        .to_vec1()
        .map_err(|e| Error::model(format!("Failed to convert to vec: {}", e)))
}
