//! # rr-api
//!
//! The web routing and orchestration layer for Rusty-Reviews.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;

use std::time::Duration;

use axum::routing::{get, put};
use axum::Router;

pub use error::{ApiError, ApiResult};
pub use handlers::{AppState, SharedState};

/// Builds the full application router.
///
/// # Developer Note
/// Review and catalogue routes live under `/api` so the frontend's existing
/// base URL keeps working; `/health` stays at the root for probes.
pub fn router(state: SharedState, cors_max_age: Duration) -> Router {
    let api = Router::new()
        // Catalogue
        .route("/products", get(handlers::list_products))
        .route("/products/{productId}", get(handlers::get_product))
        .route("/categories", get(handlers::list_categories))
        // Reviews of one product
        .route(
            "/products/{productId}/reviews",
            get(handlers::list_reviews).post(handlers::submit_review),
        )
        .route("/products/{productId}/tags", get(handlers::popular_tags))
        // A single review, owner only
        .route(
            "/reviews/{reviewId}",
            put(handlers::edit_review).delete(handlers::delete_review),
        );

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api)
        .layer(middleware::trace_layer())
        .layer(middleware::cors_policy(cors_max_age))
        .with_state(state)
}
