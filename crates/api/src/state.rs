//! Shared application state for the Axum API server.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use courier_common::config::AppConfig;
use courier_common::types::Channel;
use courier_notifier::orchestrator::DeliveryOrchestrator;
use courier_notifier::providers::{ChannelProvider, Provider, build_providers};
use courier_notifier::store::NotificationStore;

/// Application state shared across all route handlers via Axum `State`.
pub struct AppState<P: ChannelProvider = Provider> {
    pub store: Arc<dyn NotificationStore>,
    pub orchestrator: Arc<DeliveryOrchestrator<P>>,
    pub config: AppConfig,
}

impl<P: ChannelProvider> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            orchestrator: self.orchestrator.clone(),
            config: self.config.clone(),
        }
    }
}

impl AppState {
    /// Wire the configured provider registry and orchestrator around an already-open store.
    pub fn new(store: Arc<dyn NotificationStore>, config: AppConfig) -> Self {
        let providers = build_providers(&config);
        Self::with_providers(store, providers, config)
    }
}

impl<P: ChannelProvider> AppState<P> {
    /// Same as [`AppState::new`] with an explicit provider registry.
    pub fn with_providers(
        store: Arc<dyn NotificationStore>,
        providers: HashMap<Channel, P>,
        config: AppConfig,
    ) -> Self {
        let orchestrator = DeliveryOrchestrator::new(store.clone(), providers)
            .with_send_timeout(Duration::from_secs(config.send_timeout_secs));

        Self {
            store,
            orchestrator: Arc::new(orchestrator),
            config,
        }
    }
}
