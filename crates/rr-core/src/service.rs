//! # ReviewService
//!
//! Orchestrates review writes and keeps each product's cached rating fields
//! equal to a recomputation over its current reviews.
//!
//! Writes for one product are serialized through a per-product async lock:
//! the duplicate check, the review write and the aggregate write-back all run
//! while holding it. If the write-back fails after the review write went
//! through, the error is reported and the cache stays stale until the next
//! write for that product recomputes it.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::aggregate::{rank_tags, summarize_ratings, POPULAR_TAG_LIMIT};
use crate::error::{AppError, Result};
use crate::models::{NewReview, Product, ProductAggregate, Review, ReviewPage, ReviewQuery, TagCount};
use crate::traits::{ProductRepo, ReviewRepo};
use crate::validation::{validate_changes, validate_query, validate_review};

pub struct ReviewService {
    reviews: Arc<dyn ReviewRepo>,
    products: Arc<dyn ProductRepo>,
    write_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl ReviewService {
    pub fn new(reviews: Arc<dyn ReviewRepo>, products: Arc<dyn ProductRepo>) -> Self {
        Self {
            reviews,
            products,
            write_locks: DashMap::new(),
        }
    }

    /// Creates `user_id`'s review of `product_id`.
    #[instrument(skip(self, input))]
    pub async fn submit_review(&self, user_id: Uuid, product_id: Uuid, input: NewReview) -> Result<Review> {
        let valid = validate_review(input)?;
        self.require_product(product_id).await?;

        self.serialized(product_id, async move {
            if self
                .reviews
                .find_by_user_and_product(user_id, product_id)
                .await?
                .is_some()
            {
                return Err(AppError::DuplicateReview { user_id, product_id });
            }

            let review = self.reviews.create_review(Review::new(user_id, product_id, valid)).await?;
            info!(review_id = %review.id, rating = review.rating, "review created");

            self.refresh_aggregate(product_id).await?;
            Ok(review)
        })
        .await
    }

    /// One page of a product's reviews, sorted descending on the requested field.
    pub async fn list_reviews(&self, product_id: Uuid, query: ReviewQuery) -> Result<ReviewPage> {
        let page = validate_query(&query)?;
        self.require_product(product_id).await?;

        let (reviews, total) = self
            .reviews
            .list_for_product(product_id, page.sort, page.limit, page.offset())
            .await?;

        Ok(ReviewPage {
            reviews,
            total,
            total_pages: total.div_ceil(u64::from(page.limit)),
            current_page: page.page,
        })
    }

    /// Edits a review owned by `user_id`.
    #[instrument(skip(self, input))]
    pub async fn edit_review(&self, user_id: Uuid, review_id: Uuid, input: NewReview) -> Result<Review> {
        let changes = validate_changes(input)?;
        let existing = self.owned_review(user_id, review_id).await?;

        self.serialized(existing.product_id, async move {
            let review = self.reviews.update_review(review_id, changes).await?;
            info!(product_id = %review.product_id, rating = review.rating, "review updated");

            self.refresh_aggregate(review.product_id).await?;
            Ok(review)
        })
        .await
    }

    /// Removes a review owned by `user_id`.
    #[instrument(skip(self))]
    pub async fn delete_review(&self, user_id: Uuid, review_id: Uuid) -> Result<()> {
        let existing = self.owned_review(user_id, review_id).await?;

        let product_id = existing.product_id;
        self.serialized(product_id, async move {
            self.reviews.delete_review(review_id).await?;
            info!(%product_id, "review deleted");

            self.refresh_aggregate(product_id).await
        })
        .await
        .map(|_| ())
    }

    /// The most used tags across a product's reviews.
    pub async fn popular_tags(&self, product_id: Uuid) -> Result<Vec<TagCount>> {
        self.require_product(product_id).await?;
        let reviews = self.reviews.find_all_for_product(product_id).await?;
        Ok(rank_tags(reviews.iter().map(|r| &r.tags), POPULAR_TAG_LIMIT))
    }

    /// Recomputes and stores a product's rating fields from its reviews.
    pub async fn refresh_aggregate(&self, product_id: Uuid) -> Result<ProductAggregate> {
        let reviews = self.reviews.find_all_for_product(product_id).await?;
        let aggregate = summarize_ratings(reviews.iter().map(|r| r.rating));
        self.products.update_aggregate(product_id, aggregate).await?;
        debug!(
            %product_id,
            average_rating = aggregate.average_rating,
            total_reviews = aggregate.total_reviews,
            "product aggregate refreshed"
        );
        Ok(aggregate)
    }

    /// Runs `work` while holding the product's write lock. The lock entry is
    /// dropped again once no other writer holds or awaits it.
    async fn serialized<T>(&self, product_id: Uuid, work: impl Future<Output = Result<T>>) -> Result<T> {
        let lock = self
            .write_locks
            .entry(product_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            work.await
        };

        drop(lock);
        self.write_locks
            .remove_if(&product_id, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    async fn require_product(&self, product_id: Uuid) -> Result<Product> {
        self.products
            .get_product(product_id)
            .await?
            .ok_or(AppError::NotFound("Product", product_id))
    }

    async fn owned_review(&self, user_id: Uuid, review_id: Uuid) -> Result<Review> {
        let review = self
            .reviews
            .find_review(review_id)
            .await?
            .ok_or(AppError::NotFound("Review", review_id))?;

        if review.user_id != user_id {
            return Err(AppError::Unauthorized(format!(
                "review {review_id} belongs to another user"
            )));
        }
        Ok(review)
    }
}
