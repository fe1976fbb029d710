//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Product, ProductAggregate, ProductFilter, Review, ReviewChanges, ReviewSort};

/// Data persistence contract for reviews.
///
/// Implementations must enforce one review per (user, product) and report a
/// clash as [`AppError::DuplicateReview`](crate::AppError::DuplicateReview).
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReviewRepo: Send + Sync {
    async fn create_review(&self, review: Review) -> Result<Review>;
    async fn find_review(&self, id: Uuid) -> Result<Option<Review>>;
    async fn find_by_user_and_product(&self, user_id: Uuid, product_id: Uuid) -> Result<Option<Review>>;
    async fn find_all_for_product(&self, product_id: Uuid) -> Result<Vec<Review>>;

    /// Returns one page, newest/highest first, plus the product's review count.
    async fn list_for_product(
        &self,
        product_id: Uuid,
        sort: ReviewSort,
        limit: u32,
        offset: u64,
    ) -> Result<(Vec<Review>, u64)>;

    /// Fails with `NotFound` when the review is gone.
    async fn update_review(&self, id: Uuid, changes: ReviewChanges) -> Result<Review>;
    async fn delete_review(&self, id: Uuid) -> Result<()>;
}

/// Data persistence contract for the product catalogue.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ProductRepo: Send + Sync {
    async fn get_product(&self, id: Uuid) -> Result<Option<Product>>;
    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>>;
    async fn list_categories(&self) -> Result<Vec<String>>;
    async fn create_product(&self, product: Product) -> Result<Product>;

    /// Overwrites the cached rating fields. Fails with `NotFound` for unknown ids.
    async fn update_aggregate(&self, id: Uuid, aggregate: ProductAggregate) -> Result<()>;
}

/// Identity contract. Credentials are issued elsewhere; we only verify them.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait AuthProvider: Send + Sync {
    /// Returns the user a bearer token belongs to, or `None` if it is
    /// malformed, forged or expired.
    fn verify_token(&self, token: &str) -> Option<Uuid>;

    /// Mints a token for `user_id`. Used by tooling and tests.
    fn issue_token(&self, user_id: Uuid) -> Option<String>;
}
