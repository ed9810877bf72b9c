//! UPSRS worklist server.
//!
//! The HTTP/WebSocket surface over `upsrs-core`: work item CRUD and
//! state transitions, subscription management, and the push channel
//! that delivers event reports.

pub mod config;
pub mod error;
pub mod push_url;
pub mod routes;
pub mod warnings;

pub use config::{Args, ServerConfig};
pub use error::ApiError;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use upsrs_core::{
    ChannelRegistry, Notifier, PendingEventQueue, RestartStatus, ScpStatus, SubscriptionService,
    SubscriptionStore, WorkItemService, WorkItemStore,
};

/// Application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Work item service.
    pub workitems: Arc<WorkItemService>,
    /// Subscription service.
    pub subscriptions: Arc<SubscriptionService>,
    /// Push channel registry.
    pub registry: Arc<ChannelRegistry>,
    /// Server configuration.
    pub config: ServerConfig,
}

impl AppState {
    /// Build the full dependency graph for one server instance.
    ///
    /// Everything is wired here by constructor injection; the notifier
    /// is the dispatcher both services share, and its reconnect drain is
    /// installed as a registry connect callback.
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(ChannelRegistry::new());
        let pending = Arc::new(PendingEventQueue::with_cap(config.pending_cap));
        let subscription_store = Arc::new(SubscriptionStore::new());
        let workitem_store = Arc::new(WorkItemStore::new());

        let mut notifier =
            Notifier::new(registry.clone(), pending.clone(), subscription_store.clone());
        if config.announce_restart {
            notifier = notifier
                .with_startup_announcement(ScpStatus::Restarted, RestartStatus::ColdStart);
        }
        let notifier = Arc::new(notifier);
        notifier.install();

        let workitems = Arc::new(WorkItemService::new(workitem_store.clone(), notifier.clone()));
        let subscriptions = Arc::new(SubscriptionService::new(
            subscription_store,
            workitem_store,
            registry.clone(),
            notifier,
        ));

        AppState { workitems, subscriptions, registry, config }
    }
}

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .merge(routes::workitems::routes())
        .merge(routes::subscriptions::routes())
        .merge(routes::ws::routes())
        .layer(TraceLayer::new_for_http());

    if state.config.cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router = router.layer(cors);
    }

    router.with_state(state)
}
