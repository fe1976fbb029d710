//! Input checks for review payloads and listing queries.
//!
//! Every violation is collected so the caller sees all offending fields at once.

use crate::error::{AppError, FieldError, Result};
use crate::models::{NewReview, ReviewChanges, ReviewQuery, ReviewSort, ValidReview};
use url::Url;

pub const RATING_RANGE: std::ops::RangeInclusive<i64> = 1..=5;
pub const COMMENT_LEN: std::ops::RangeInclusive<usize> = 10..=1000;
pub const TAG_LEN: std::ops::RangeInclusive<usize> = 2..=20;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// A listing request that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
    pub sort: ReviewSort,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// Checks and normalizes a new submission.
pub fn validate_review(input: NewReview) -> Result<ValidReview> {
    let mut errors = Vec::new();

    let rating = check_rating(input.rating, &mut errors);
    let comment = input.comment.map(|c| check_comment(&c, &mut errors));
    let tags = input.tags.map(|t| check_tags(t, &mut errors)).unwrap_or_default();
    let images = input.images.map(|i| check_images(i, &mut errors)).unwrap_or_default();

    if !errors.is_empty() {
        return Err(AppError::ValidationFailed(errors));
    }

    Ok(ValidReview {
        rating,
        comment,
        tags,
        images,
    })
}

/// Same rules as [`validate_review`], but omitted fields stay omitted.
pub fn validate_changes(input: NewReview) -> Result<ReviewChanges> {
    let mut errors = Vec::new();

    let rating = check_rating(input.rating, &mut errors);
    let comment = input.comment.map(|c| check_comment(&c, &mut errors));
    let tags = input.tags.map(|t| check_tags(t, &mut errors));
    let images = input.images.map(|i| check_images(i, &mut errors));

    if !errors.is_empty() {
        return Err(AppError::ValidationFailed(errors));
    }

    Ok(ReviewChanges {
        rating,
        comment,
        tags,
        images,
    })
}

pub fn validate_query(query: &ReviewQuery) -> Result<PageRequest> {
    let mut errors = Vec::new();

    let page = query.page.unwrap_or(1);
    if page == 0 {
        errors.push(FieldError::new("page", "Page must be at least 1"));
    }

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if limit == 0 || limit > MAX_PAGE_SIZE {
        errors.push(FieldError::new(
            "limit",
            format!("Limit must be between 1 and {MAX_PAGE_SIZE}"),
        ));
    }

    let sort = match query.sort.as_deref().map(str::parse::<ReviewSort>) {
        None => ReviewSort::default(),
        Some(Ok(sort)) => sort,
        Some(Err(msg)) => {
            errors.push(FieldError::new("sort", msg));
            ReviewSort::default()
        }
    };

    if !errors.is_empty() {
        return Err(AppError::ValidationFailed(errors));
    }

    Ok(PageRequest { page, limit, sort })
}

fn check_rating(rating: i64, errors: &mut Vec<FieldError>) -> u8 {
    if !RATING_RANGE.contains(&rating) {
        errors.push(FieldError::new("rating", "Rating must be between 1 and 5"));
        return 0;
    }
    rating as u8
}

fn check_comment(comment: &str, errors: &mut Vec<FieldError>) -> String {
    let trimmed = comment.trim();
    if !COMMENT_LEN.contains(&trimmed.chars().count()) {
        errors.push(FieldError::new(
            "comment",
            "Comment must be between 10 and 1000 characters",
        ));
    }
    trimmed.to_string()
}

fn check_tags(tags: Vec<String>, errors: &mut Vec<FieldError>) -> Vec<String> {
    tags.into_iter()
        .enumerate()
        .map(|(i, tag)| {
            let trimmed = tag.trim();
            if !TAG_LEN.contains(&trimmed.chars().count()) {
                errors.push(FieldError::new(
                    format!("tags[{i}]"),
                    "Each tag must be between 2 and 20 characters",
                ));
            }
            trimmed.to_string()
        })
        .collect()
}

fn check_images(images: Vec<String>, errors: &mut Vec<FieldError>) -> Vec<String> {
    for (i, image) in images.iter().enumerate() {
        if !is_web_url(image) {
            errors.push(FieldError::new(
                format!("images[{i}]"),
                "Each image must be a valid URL",
            ));
        }
    }
    images
}

/// Absolute `scheme://host` http(s) URL without whitespace.
fn is_web_url(candidate: &str) -> bool {
    if candidate.chars().any(char::is_whitespace) {
        return false;
    }
    let Ok(url) = Url::parse(candidate) else {
        return false;
    };

    // The URL parser forgives `https:/x` and `https:///x`; require a literal authority.
    let after_scheme = &candidate[url.scheme().len()..];
    matches!(url.scheme(), "http" | "https")
        && url.host().is_some()
        && after_scheme.starts_with("://")
        && !after_scheme.starts_with(":///")
}
