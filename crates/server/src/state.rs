use std::sync::Arc;
use reelsplice_core::{Config, MergeService, RecentEvents, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    merger: Arc<MergeService>,
    recent_events: RecentEvents,
}

impl AppState {
    pub fn new(config: Config, merger: Arc<MergeService>, recent_events: RecentEvents) -> Self {
        Self {
            config,
            merger,
            recent_events,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn merger(&self) -> &MergeService {
        &self.merger
    }

    pub fn recent_events(&self) -> &RecentEvents {
        &self.recent_events
    }
}
