//! # rr-api Handlers
//!
//! This module coordinates the flow between HTTP requests and Core traits.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use rr_core::models::{NewReview, Product, ProductFilter, Review, ReviewPage, ReviewQuery, TagCount};
use rr_core::traits::{AuthProvider, ProductRepo};
use rr_core::{AppError, ReviewService};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{AuthUser, JsonBody, PathParam, QueryParams};

/// State shared across all request handlers.
pub struct AppState {
    pub reviews: ReviewService,
    pub products: Arc<dyn ProductRepo>,
    pub auth: Arc<dyn AuthProvider>,
}

pub type SharedState = Arc<AppState>;

/// `POST /api/products/{productId}/reviews`
pub async fn submit_review(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
    PathParam(product_id): PathParam<Uuid>,
    JsonBody(input): JsonBody<NewReview>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    let review = state.reviews.submit_review(user_id, product_id, input).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// `GET /api/products/{productId}/reviews?page&limit&sort`
pub async fn list_reviews(
    State(state): State<SharedState>,
    PathParam(product_id): PathParam<Uuid>,
    QueryParams(query): QueryParams<ReviewQuery>,
) -> ApiResult<Json<ReviewPage>> {
    Ok(Json(state.reviews.list_reviews(product_id, query).await?))
}

/// `PUT /api/reviews/{reviewId}`
pub async fn edit_review(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
    PathParam(review_id): PathParam<Uuid>,
    JsonBody(input): JsonBody<NewReview>,
) -> ApiResult<Json<Review>> {
    Ok(Json(state.reviews.edit_review(user_id, review_id, input).await?))
}

/// `DELETE /api/reviews/{reviewId}`
pub async fn delete_review(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
    PathParam(review_id): PathParam<Uuid>,
) -> ApiResult<Json<Value>> {
    state.reviews.delete_review(user_id, review_id).await?;
    Ok(Json(json!({ "message": "Review deleted successfully" })))
}

/// `GET /api/products/{productId}/tags`
pub async fn popular_tags(
    State(state): State<SharedState>,
    PathParam(product_id): PathParam<Uuid>,
) -> ApiResult<Json<Vec<TagCount>>> {
    Ok(Json(state.reviews.popular_tags(product_id).await?))
}

/// `GET /api/products?category&minRating&q`
pub async fn list_products(
    State(state): State<SharedState>,
    QueryParams(mut filter): QueryParams<ProductFilter>,
) -> ApiResult<Json<Vec<Product>>> {
    // An empty form field means "no filter"
    filter.category = filter.category.filter(|c| !c.trim().is_empty());
    filter.q = filter.q.filter(|q| !q.trim().is_empty());

    Ok(Json(state.products.list_products(filter).await?))
}

/// `GET /api/products/{productId}`
pub async fn get_product(
    State(state): State<SharedState>,
    PathParam(product_id): PathParam<Uuid>,
) -> ApiResult<Json<Product>> {
    let product = state
        .products
        .get_product(product_id)
        .await?
        .ok_or(AppError::NotFound("Product", product_id))?;
    Ok(Json(product))
}

/// `GET /api/categories`
pub async fn list_categories(State(state): State<SharedState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.products.list_categories().await?))
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}
