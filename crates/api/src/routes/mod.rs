pub mod health;
pub mod notifications;

use axum::Router;

use courier_notifier::providers::ChannelProvider;

use crate::state::AppState;

/// Build the complete API router with all routes.
pub fn create_router<P: ChannelProvider + 'static>(state: AppState<P>) -> Router {
    Router::new()
        .merge(health::router())
        .merge(notifications::router())
        .with_state(state)
}
