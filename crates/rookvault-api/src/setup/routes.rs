//! Route configuration and setup

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use rookvault_core::ServiceConfig;
use rookvault_infra::request_id_middleware;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

/// Setup all application routes
///
/// The router cannot hold two parameter names at the same position of a path, and the block
/// and snapshot families overlap (`/block/{pool}` vs `/block/{region}/...`, the list and delete
/// snapshot routes share their shape). Each position therefore carries one name, and handlers
/// read the segments positionally from a tuple.
pub fn setup_routes(config: &ServiceConfig, state: Arc<AppState>) -> Router<()> {
    let block_routes = Router::new()
        // {region} is the pool here
        .route("/block/{region}", get(handlers::block::list_images))
        // {region}/{bucket} are pool/image here
        .route("/block/{region}/{bucket}", get(handlers::block::image_size))
        .route(
            "/block/{region}/{bucket}/{prefix}/{tag}/{pool}/{image}",
            post(handlers::block::restore_volume),
        );

    let snapshot_routes = Router::new()
        .route(
            "/snapshot/{region}/{bucket}/{prefix}/{tag}/{pool}/{image}",
            post(handlers::snapshot::create_snapshot),
        )
        // GET reads {tag}/{pool} as pool/image
        .route(
            "/snapshot/{region}/{bucket}/{prefix}/{tag}/{pool}",
            get(handlers::snapshot::list_snapshots).delete(handlers::snapshot::delete_snapshot),
        );

    let http_concurrency_limit = config.http_concurrency_limit.max(1);
    tracing::info!(
        http_concurrency_limit = http_concurrency_limit,
        "HTTP concurrency limit layer enabled"
    );

    Router::new()
        .route("/", get(handlers::health::index))
        .route("/health", get(handlers::health::liveness_check))
        .merge(block_routes)
        .merge(snapshot_routes)
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state)
}
