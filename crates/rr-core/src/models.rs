//! # Domain Models
//!
//! These structs represent the core entities of Rusty-Reviews.
//! We use UUID v7 for time-ordered, globally unique identification.
//! Wire names are camelCase so the existing frontend can talk to us unchanged.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current time truncated to whole milliseconds, the precision the stores keep.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// A catalogue entry that users can review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    /// Absolute URL of the product picture
    pub image: String,
    pub category: String,
    /// Mean of all review ratings, 0 when there are none. Derived.
    pub average_rating: f64,
    /// Number of reviews. Derived.
    pub total_reviews: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        price: f64,
        image: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        let now = now_millis();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            description: description.into(),
            price,
            image: image.into(),
            category: category.into(),
            average_rating: 0.0,
            total_reviews: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The denormalized fields cached on a [`Product`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAggregate {
    pub average_rating: f64,
    pub total_reviews: u64,
}

/// A user's rating of one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    /// 1 to 5 stars
    pub rating: u8,
    pub comment: Option<String>,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    /// How many readers marked the review as helpful
    pub helpful: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    /// Builds a fresh review from an already validated submission.
    pub fn new(user_id: Uuid, product_id: Uuid, submission: ValidReview) -> Self {
        let now = now_millis();
        Self {
            id: Uuid::now_v7(),
            user_id,
            product_id,
            rating: submission.rating,
            comment: submission.comment,
            tags: submission.tags,
            images: submission.images,
            helpful: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies an edit. Omitted optional fields keep their stored value;
    /// a comment cannot be cleared once written.
    pub fn apply(&mut self, changes: &ReviewChanges) {
        self.rating = changes.rating;
        if let Some(comment) = &changes.comment {
            self.comment = Some(comment.clone());
        }
        if let Some(tags) = &changes.tags {
            self.tags = tags.clone();
        }
        if let Some(images) = &changes.images {
            self.images = images.clone();
        }
        self.updated_at = now_millis();
    }
}

/// Raw review payload as submitted by a client.
///
/// The rating is kept wide so that out-of-range values reach validation
/// instead of failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
}

/// A submission that passed validation, with comment and tags trimmed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidReview {
    pub rating: u8,
    pub comment: Option<String>,
    pub tags: Vec<String>,
    pub images: Vec<String>,
}

/// Validated edit of an existing review.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewChanges {
    pub rating: u8,
    pub comment: Option<String>,
    pub tags: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
}

/// Field a review listing can be ordered by. Ordering is always descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReviewSort {
    #[default]
    CreatedAt,
    UpdatedAt,
    Rating,
    Helpful,
}

impl ReviewSort {
    /// Storage column backing this sort key.
    pub fn column(self) -> &'static str {
        match self {
            ReviewSort::CreatedAt => "created_at",
            ReviewSort::UpdatedAt => "updated_at",
            ReviewSort::Rating => "rating",
            ReviewSort::Helpful => "helpful",
        }
    }
}

impl FromStr for ReviewSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt" | "created_at" => Ok(ReviewSort::CreatedAt),
            "updatedAt" | "updated_at" => Ok(ReviewSort::UpdatedAt),
            "rating" => Ok(ReviewSort::Rating),
            "helpful" => Ok(ReviewSort::Helpful),
            other => Err(format!("cannot sort reviews by '{other}'")),
        }
    }
}

impl fmt::Display for ReviewSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReviewSort::CreatedAt => "createdAt",
            ReviewSort::UpdatedAt => "updatedAt",
            ReviewSort::Rating => "rating",
            ReviewSort::Helpful => "helpful",
        };
        f.write_str(name)
    }
}

/// Query string of the review listing, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
}

/// One page of a product's reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPage {
    pub reviews: Vec<Review>,
    pub total: u64,
    pub total_pages: u64,
    pub current_page: u32,
}

/// How often a tag was used across a product's reviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: u64,
}

/// Catalogue filter. Every present field must match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    pub category: Option<String>,
    pub min_rating: Option<f64>,
    /// Case-insensitive substring of name, description or category
    pub q: Option<String>,
}
