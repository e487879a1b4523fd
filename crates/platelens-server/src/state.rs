//! Shared application state

use crate::config::ServerConfig;
use anyhow::Result;
use metrics_exporter_prometheus::PrometheusHandle;
use platelens_vision::{IngredientClassifier, IngredientDetector};
use std::sync::Arc;
use tracing::info;

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<ServerConfig>,

    /// Ingredient detector backing the prediction endpoint
    pub detector: Arc<dyn IngredientDetector>,

    /// Prometheus metrics handle for rendering
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    /// Initialize application state from configuration
    ///
    /// Loads the classifier exactly once; every request shares the instance.
    pub fn new(config: ServerConfig, metrics_handle: PrometheusHandle) -> Result<Self> {
        info!("Loading ingredient classifier");
        let classifier = IngredientClassifier::load(&config.model)?;
        info!("Classifier ready");

        Ok(Self {
            config: Arc::new(config),
            detector: Arc::new(classifier),
            metrics_handle,
        })
    }

    /// State with an externally supplied detector, for tests
    #[cfg(test)]
    pub(crate) fn with_detector(
        config: ServerConfig,
        detector: Arc<dyn IngredientDetector>,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        Self {
            config: Arc::new(config),
            detector,
            metrics_handle,
        }
    }
}
