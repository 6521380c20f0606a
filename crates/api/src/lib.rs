//! HTTP API server for purchase and sale documents.
//!
//! Exposes the document lifecycle and read side over REST, with structured
//! logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod seed;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{DocumentService, InMemoryInventoryLedger, ServiceConfig};
use store::{DocumentStore, InMemoryCatalog};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use views::DocumentReader;

use routes::documents::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: DocumentStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/{kind}",
            post(routes::documents::create::<S>).get(routes::documents::list::<S>),
        )
        .route(
            "/{kind}/{id}",
            get(routes::documents::detail::<S>)
                .put(routes::documents::update::<S>)
                .delete(routes::documents::delete::<S>),
        )
        .route(
            "/{kind}/{id}/status",
            post(routes::documents::change_status::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state over the given document store,
/// with an in-memory catalog and ledger.
pub fn create_default_state<S: DocumentStore + Clone + 'static>(
    store: S,
    config: ServiceConfig,
) -> Arc<AppState<S>> {
    let catalog = InMemoryCatalog::new();
    let ledger = InMemoryInventoryLedger::new();

    let documents = DocumentService::new(store.clone(), catalog.clone(), ledger.clone(), config);
    let reader = DocumentReader::new(store, catalog.clone());

    Arc::new(AppState {
        documents,
        reader,
        catalog,
        ledger,
    })
}
