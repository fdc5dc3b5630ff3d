use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::CoreState;

/// Application state that can be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    /// Core layer state holding the synthesis pipeline collaborators
    pub core_state: Arc<CoreState>,
}

impl AppState {
    /// Build the application state, failing fast on unusable configuration.
    pub async fn new(config: ServerConfig) -> Result<Arc<Self>, Box<dyn std::error::Error>> {
        let core_state = CoreState::new(&config).await?;
        Ok(Self::from_parts(config, core_state))
    }

    pub fn from_parts(config: ServerConfig, core_state: Arc<CoreState>) -> Arc<Self> {
        Arc::new(Self { config, core_state })
    }
}
