//! Single-pass aggregations over a product's reviews.

use std::collections::HashMap;

use crate::models::{ProductAggregate, TagCount};

/// How many tags the popular-tags query returns.
pub const POPULAR_TAG_LIMIT: usize = 10;

/// Mean and count of a rating sequence. An empty sequence yields `(0, 0)`.
pub fn summarize_ratings<I>(ratings: I) -> ProductAggregate
where
    I: IntoIterator<Item = u8>,
{
    let (sum, count) = ratings
        .into_iter()
        .fold((0u64, 0u64), |(sum, count), r| (sum + u64::from(r), count + 1));

    if count == 0 {
        return ProductAggregate::default();
    }

    ProductAggregate {
        average_rating: sum as f64 / count as f64,
        total_reviews: count,
    }
}

/// Counts every tag occurrence and returns the `limit` most frequent.
///
/// Equal counts keep the order in which the tags were first seen.
pub fn rank_tags<'a, L, T>(tag_lists: L, limit: usize) -> Vec<TagCount>
where
    L: IntoIterator<Item = T>,
    T: IntoIterator<Item = &'a String>,
{
    let mut ranked: Vec<TagCount> = Vec::new();
    let mut slots: HashMap<&'a str, usize> = HashMap::new();

    for tag in tag_lists.into_iter().flatten() {
        match slots.get(tag.as_str()) {
            Some(&slot) => ranked[slot].count += 1,
            None => {
                slots.insert(tag.as_str(), ranked.len());
                ranked.push(TagCount {
                    tag: tag.clone(),
                    count: 1,
                });
            }
        }
    }

    // stable: ties stay in first-seen order
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(limit);
    ranked
}
