use std::sync::Arc;

use common::Configuration;

use crate::metrics::RotationMetrics;

/// State shared by the dispatcher and the executors.
///
/// Built once at startup from the loaded configuration and handed down
/// explicitly; nothing in the engine reads configuration from globals.
#[derive(Debug, Clone)]
pub struct EngineContext {
    config: Arc<Configuration>,
    metrics: RotationMetrics,
}

impl EngineContext {
    pub fn new(config: Configuration) -> Self {
        Self {
            config: Arc::new(config),
            metrics: RotationMetrics::new(),
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn metrics(&self) -> &RotationMetrics {
        &self.metrics
    }

    pub fn dry_run(&self) -> bool {
        self.config.dry_run
    }
}
