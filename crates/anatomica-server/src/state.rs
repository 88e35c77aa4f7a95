//! Application state

use anatomica_core::MockClassifier;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::gemini::GeminiClient;

/// Shared application state
pub struct AppState {
    /// Configuration
    pub config: Config,
    /// Organ classifier for uploaded images
    pub classifier: MockClassifier,
    /// Label generator, `None` when generation is disabled or has no key
    pub generator: Option<GeminiClient>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config) -> Result<Arc<Self>> {
        let classifier = MockClassifier::new(config.classifier.organ);

        let generator = if !config.generation.enabled {
            info!("Label generation disabled, serving fallback tables");
            None
        } else if let Some(key) = config.generation.resolved_api_key() {
            // Leave headroom so the race timeout fires before the client's own
            let timeout = Duration::from_secs(config.generation.timeout_secs + 5);
            Some(GeminiClient::new(&config.generation.api_url, &key, timeout)?)
        } else {
            warn!("No API key configured, label generation disabled");
            None
        };

        Ok(Arc::new(Self {
            config,
            classifier,
            generator,
        }))
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.config.generation.timeout_secs)
    }
}
