//! Classifier source, device, and threshold configuration

use candle_core::Device;
use platelens_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Model source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModelSource {
    /// Load from a local directory holding the exported checkpoint
    Local { path: PathBuf },

    /// Download from HuggingFace Hub
    HuggingFace {
        repo: String,
        #[serde(default = "default_revision")]
        revision: String,
    },
}

fn default_revision() -> String {
    "main".to_string()
}

fn default_repo() -> String {
    "ssevan/ug-food-detector".to_string()
}

impl Default for ModelSource {
    fn default() -> Self {
        Self::HuggingFace {
            repo: default_repo(),
            revision: default_revision(),
        }
    }
}

/// Device to run inference on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSpec {
    Cpu,
    Cuda {
        #[serde(default)]
        index: usize,
    },
    Metal {
        #[serde(default)]
        index: usize,
    },
}

impl Default for DeviceSpec {
    fn default() -> Self {
        Self::Cpu
    }
}

impl DeviceSpec {
    /// Materialize the candle device
    pub fn device(&self) -> Result<Device> {
        match self {
            Self::Cpu => Ok(Device::Cpu),
            Self::Cuda { index } => Device::new_cuda(*index)
                .map_err(|e| Error::model(format!("Failed to initialize CUDA: {}", e))),
            Self::Metal { index } => Device::new_metal(*index)
                .map_err(|e| Error::model(format!("Failed to initialize Metal: {}", e))),
        }
    }
}

/// Configuration for the ingredient classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model source (where to load from)
    #[serde(default)]
    pub source: ModelSource,

    /// Device to run on
    #[serde(default)]
    pub device: DeviceSpec,

    /// Detection threshold; a label is reported only when its probability
    /// is strictly greater than this value
    #[serde(default = "default_threshold")]
    pub threshold: f32,
}

fn default_threshold() -> f32 {
    0.3
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            source: ModelSource::default(),
            device: DeviceSpec::default(),
            threshold: default_threshold(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_published_checkpoint() {
        let config = ModelConfig::default();

        match &config.source {
            ModelSource::HuggingFace { repo, revision } => {
                assert_eq!(repo, "ssevan/ug-food-detector");
                assert_eq!(revision, "main");
            }
            _ => panic!("Expected huggingface source"),
        }
        assert_eq!(config.device, DeviceSpec::Cpu);
        assert!((config.threshold - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_local_source() {
        let yaml = r#"
source:
  type: local
  path: "./models/ug-food-detector"
threshold: 0.5
"#;

        let config: ModelConfig = serde_yaml::from_str(yaml).unwrap();
        match &config.source {
            ModelSource::Local { path } => {
                assert_eq!(path.to_str().unwrap(), "./models/ug-food-detector");
            }
            _ => panic!("Expected local source"),
        }
        assert!((config.threshold - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_hub_source_with_default_revision() {
        let yaml = r#"
source:
  type: huggingface
  repo: "ssevan/ug-food-detector"
device: cpu
"#;

        let config: ModelConfig = serde_yaml::from_str(yaml).unwrap();
        match &config.source {
            ModelSource::HuggingFace { repo, revision } => {
                assert_eq!(repo, "ssevan/ug-food-detector");
                assert_eq!(revision, "main");
            }
            _ => panic!("Expected huggingface source"),
        }
    }

    #[test]
    fn test_parse_cuda_device() {
        let yaml = r#"
device:
  cuda:
    index: 1
"#;

        let config: ModelConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.device, DeviceSpec::Cuda { index: 1 });
    }
}
