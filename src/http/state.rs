use crate::controller::VoiceActivationController;
use crate::store::NotificationStore;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: VoiceActivationController,
    pub store: Arc<dyn NotificationStore>,
}

impl AppState {
    pub fn new(
        controller: VoiceActivationController,
        store: Arc<dyn NotificationStore>,
    ) -> Self {
        Self { controller, store }
    }
}
