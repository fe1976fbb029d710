//! # rr-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `rr-core` domain models.
//!
//! Ids are stored as hyphenated TEXT, timestamps as INTEGER milliseconds since
//! the epoch and tag/image lists as JSON arrays.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rr_core::error::{AppError, Result};
use rr_core::models::{now_millis, Product, ProductAggregate, ProductFilter, Review, ReviewChanges, ReviewSort};
use rr_core::traits::{ProductRepo, ReviewRepo};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::info;
use uuid::Uuid;

const SCHEMA: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL,
        price REAL NOT NULL CHECK (price >= 0),
        image TEXT NOT NULL,
        category TEXT NOT NULL,
        average_rating REAL NOT NULL DEFAULT 0,
        total_reviews INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS reviews (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        product_id TEXT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
        rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
        comment TEXT,
        tags TEXT NOT NULL DEFAULT '[]',
        images TEXT NOT NULL DEFAULT '[]',
        helpful INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS unique_user_product_review ON reviews(user_id, product_id)",
    "CREATE INDEX IF NOT EXISTS idx_reviews_product_created ON reviews(product_id, created_at DESC)",
];

pub struct SqliteReviewRepo {
    pool: SqlitePool,
}

impl SqliteReviewRepo {
    /// Opens (creating if needed) the database at `url` and applies the schema.
    pub async fn new(url: &str) -> Result<Self> {
        Self::connect(url, 5).await
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(AppError::store)?
            .create_if_missing(true)
            .foreign_keys(true);

        // SQLite creates the file but not its directory.
        if !url.contains(":memory:") {
            if let Some(dir) = options.get_filename().parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir).map_err(AppError::store)?;
            }
        }

        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
        // Every connection to `:memory:` is a separate database, so keep exactly one alive.
        if url.contains(":memory:") {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(AppError::store)?;

        let repo = Self { pool };
        repo.migrate().await?;
        info!(url, "sqlite store ready");
        Ok(repo)
    }

    async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(AppError::store)?;
        }
        Ok(())
    }
}

// Helpers for id/time conversion
fn parse_uuid(text: &str) -> std::result::Result<Uuid, sqlx::Error> {
    Uuid::parse_str(text).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

fn to_json(list: &[String]) -> String {
    serde_json::Value::from(list.to_vec()).to_string()
}

fn from_json(text: &str) -> std::result::Result<Vec<String>, sqlx::Error> {
    serde_json::from_str(text).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn review_from_row(row: &SqliteRow) -> std::result::Result<Review, sqlx::Error> {
    Ok(Review {
        id: parse_uuid(row.try_get("id")?)?,
        user_id: parse_uuid(row.try_get("user_id")?)?,
        product_id: parse_uuid(row.try_get("product_id")?)?,
        rating: row.try_get::<i64, _>("rating")? as u8,
        comment: row.try_get("comment")?,
        tags: from_json(row.try_get("tags")?)?,
        images: from_json(row.try_get("images")?)?,
        helpful: row.try_get::<i64, _>("helpful")? as u64,
        created_at: from_millis(row.try_get("created_at")?),
        updated_at: from_millis(row.try_get("updated_at")?),
    })
}

fn product_from_row(row: &SqliteRow) -> std::result::Result<Product, sqlx::Error> {
    Ok(Product {
        id: parse_uuid(row.try_get("id")?)?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        image: row.try_get("image")?,
        category: row.try_get("category")?,
        average_rating: row.try_get("average_rating")?,
        total_reviews: row.try_get::<i64, _>("total_reviews")? as u64,
        created_at: from_millis(row.try_get("created_at")?),
        updated_at: from_millis(row.try_get("updated_at")?),
    })
}

/// Escapes LIKE wildcards so user text matches literally.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl ReviewRepo for SqliteReviewRepo {
    async fn create_review(&self, review: Review) -> Result<Review> {
        sqlx::query(
            "INSERT INTO reviews (id, user_id, product_id, rating, comment, tags, images, helpful, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(review.id.to_string())
        .bind(review.user_id.to_string())
        .bind(review.product_id.to_string())
        .bind(i64::from(review.rating))
        .bind(review.comment.as_deref())
        .bind(to_json(&review.tags))
        .bind(to_json(&review.images))
        .bind(review.helpful as i64)
        .bind(to_millis(review.created_at))
        .bind(to_millis(review.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateReview {
                    user_id: review.user_id,
                    product_id: review.product_id,
                }
            } else {
                AppError::store(e)
            }
        })?;

        Ok(review)
    }

    async fn find_review(&self, id: Uuid) -> Result<Option<Review>> {
        let row = sqlx::query("SELECT * FROM reviews WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::store)?;

        row.as_ref()
            .map(review_from_row)
            .transpose()
            .map_err(AppError::store)
    }

    async fn find_by_user_and_product(&self, user_id: Uuid, product_id: Uuid) -> Result<Option<Review>> {
        let row = sqlx::query("SELECT * FROM reviews WHERE user_id = ? AND product_id = ?")
            .bind(user_id.to_string())
            .bind(product_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::store)?;

        row.as_ref()
            .map(review_from_row)
            .transpose()
            .map_err(AppError::store)
    }

    async fn find_all_for_product(&self, product_id: Uuid) -> Result<Vec<Review>> {
        sqlx::query("SELECT * FROM reviews WHERE product_id = ? ORDER BY created_at ASC, id ASC")
            .bind(product_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::store)?
            .iter()
            .map(review_from_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(AppError::store)
    }

    async fn list_for_product(
        &self,
        product_id: Uuid,
        sort: ReviewSort,
        limit: u32,
        offset: u64,
    ) -> Result<(Vec<Review>, u64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE product_id = ?")
            .bind(product_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::store)?;

        // The column comes from a closed enum, never from user text.
        let sql = format!(
            "SELECT * FROM reviews WHERE product_id = ? \
             ORDER BY {} DESC, created_at DESC, id DESC LIMIT ? OFFSET ?",
            sort.column()
        );
        let reviews = sqlx::query(&sql)
            .bind(product_id.to_string())
            .bind(i64::from(limit))
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::store)?
            .iter()
            .map(review_from_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(AppError::store)?;

        Ok((reviews, total as u64))
    }

    /// Read-apply-write inside one transaction so concurrent edits of the
    /// same row cannot interleave.
    async fn update_review(&self, id: Uuid, changes: ReviewChanges) -> Result<Review> {
        let mut tx = self.pool.begin().await.map_err(AppError::store)?;

        let row = sqlx::query("SELECT * FROM reviews WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::store)?
            .ok_or(AppError::NotFound("Review", id))?;
        let mut review = review_from_row(&row).map_err(AppError::store)?;
        review.apply(&changes);

        sqlx::query(
            "UPDATE reviews SET rating = ?, comment = ?, tags = ?, images = ?, updated_at = ? WHERE id = ?",
        )
        .bind(i64::from(review.rating))
        .bind(review.comment.as_deref())
        .bind(to_json(&review.tags))
        .bind(to_json(&review.images))
        .bind(to_millis(review.updated_at))
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(AppError::store)?;

        tx.commit().await.map_err(AppError::store)?;
        Ok(review)
    }

    async fn delete_review(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(AppError::store)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Review", id));
        }
        Ok(())
    }
}

#[async_trait]
impl ProductRepo for SqliteReviewRepo {
    async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT * FROM products WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::store)?;

        row.as_ref()
            .map(product_from_row)
            .transpose()
            .map_err(AppError::store)
    }

    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>> {
        sqlx::query(
            r#"
            SELECT * FROM products
            WHERE (?1 IS NULL OR category = ?1)
              AND (?2 IS NULL OR average_rating >= ?2)
              AND (?3 IS NULL
                   OR name LIKE ?3 ESCAPE '\'
                   OR description LIKE ?3 ESCAPE '\'
                   OR category LIKE ?3 ESCAPE '\')
            ORDER BY name ASC
            "#,
        )
        .bind(filter.category)
        .bind(filter.min_rating)
        .bind(filter.q.as_deref().map(like_pattern))
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::store)?
        .iter()
        .map(product_from_row)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(AppError::store)
    }

    async fn list_categories(&self) -> Result<Vec<String>> {
        sqlx::query_scalar("SELECT DISTINCT category FROM products ORDER BY category ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::store)
    }

    async fn create_product(&self, product: Product) -> Result<Product> {
        sqlx::query(
            "INSERT INTO products (id, name, description, price, image, category, average_rating, total_reviews, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(product.id.to_string())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.image)
        .bind(&product.category)
        .bind(product.average_rating)
        .bind(product.total_reviews as i64)
        .bind(to_millis(product.created_at))
        .bind(to_millis(product.updated_at))
        .execute(&self.pool)
        .await
        .map_err(AppError::store)?;

        Ok(product)
    }

    async fn update_aggregate(&self, id: Uuid, aggregate: ProductAggregate) -> Result<()> {
        let result = sqlx::query(
            "UPDATE products SET average_rating = ?, total_reviews = ?, updated_at = ? WHERE id = ?",
        )
        .bind(aggregate.average_rating)
        .bind(aggregate.total_reviews as i64)
        .bind(to_millis(now_millis()))
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(AppError::store)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product", id));
        }
        Ok(())
    }
}
