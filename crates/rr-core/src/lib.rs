//! rusty-reviews/crates/rr-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Rusty-Reviews.

pub mod aggregate;
pub mod error;
pub mod models;
pub mod service;
pub mod traits;
pub mod validation;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use service::ReviewService;
pub use traits::*;
