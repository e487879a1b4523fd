//! Checkpoint artifact resolution
//!
//! Locates the weight file, model config, and image-processor config for a
//! configured [`ModelSource`], either inside a local export directory or via
//! the HuggingFace Hub cache.

use crate::config::ModelSource;
use platelens_core::{Error, Result};
use std::path::{Path, PathBuf};

/// Weight file names probed in order
const WEIGHT_FILES: [&str; 2] = ["model.safetensors", "pytorch_model.bin"];

const CONFIG_FILE: &str = "config.json";
const PREPROCESSOR_FILE: &str = "preprocessor_config.json";

/// Resolved on-disk locations of checkpoint files
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    /// Weight file (safetensors preferred, pickle fallback)
    pub weights: PathBuf,

    /// Model architecture config (`config.json`)
    pub config: PathBuf,

    /// Image processor config, when the checkpoint ships one
    pub preprocessor: Option<PathBuf>,
}

impl ModelArtifacts {
    /// Resolve all checkpoint files for the given source
    pub fn resolve(source: &ModelSource) -> Result<Self> {
        match source {
            ModelSource::Local { path } => Self::from_local_dir(path),
            ModelSource::HuggingFace { repo, revision } => Self::from_hub(repo, revision),
        }
    }

    /// Whether the resolved weights are in safetensors format
    pub fn weights_are_safetensors(&self) -> bool {
        self.weights
            .extension()
            .is_some_and(|ext| ext == "safetensors")
    }

    fn from_local_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::model(format!(
                "Model path does not exist: {}",
                dir.display()
            )));
        }

        let weights = WEIGHT_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
            .ok_or_else(|| {
                Error::model(format!(
                    "No model weights found in {} (tried {})",
                    dir.display(),
                    WEIGHT_FILES.join(", ")
                ))
            })?;

        let config = dir.join(CONFIG_FILE);
        if !config.exists() {
            return Err(Error::model(format!(
                "{} not found in {}",
                CONFIG_FILE,
                dir.display()
            )));
        }

        let preprocessor = dir.join(PREPROCESSOR_FILE);
        let preprocessor = preprocessor.exists().then_some(preprocessor);

        Ok(Self {
            weights,
            config,
            preprocessor,
        })
    }

    fn from_hub(repo: &str, revision: &str) -> Result<Self> {
        tracing::info!("Fetching model from HuggingFace: {}", repo);

        let api = hf_hub::api::sync::Api::new().map_err(|e| {
            Error::model(format!("Failed to initialize HuggingFace API: {}", e))
        })?;

        let repo = api.repo(hf_hub::Repo::with_revision(
            repo.to_string(),
            hf_hub::RepoType::Model,
            revision.to_string(),
        ));

        let mut weights = None;
        for weight_file in &WEIGHT_FILES {
            match repo.get(weight_file) {
                Ok(path) => {
                    tracing::debug!("Found weight file: {}", weight_file);
                    weights = Some(path);
                    break;
                }
                Err(_) => continue,
            }
        }

        let weights = weights.ok_or_else(|| {
            Error::model(format!(
                "No model weights found (tried {})",
                WEIGHT_FILES.join(", ")
            ))
        })?;

        let config = repo
            .get(CONFIG_FILE)
            .map_err(|e| Error::model(format!("Failed to download {}: {}", CONFIG_FILE, e)))?;

        let preprocessor = match repo.get(PREPROCESSOR_FILE) {
            Ok(path) => Some(path),
            Err(_) => {
                tracing::debug!("File not found: {}", PREPROCESSOR_FILE);
                None
            }
        };

        Ok(Self {
            weights,
            config,
            preprocessor,
        })
    }
}
