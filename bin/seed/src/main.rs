//! Fills an empty catalogue with demo products and prints a bearer token
//! for a fresh demo user.

use std::time::Duration;

use anyhow::Context;
use rr_auth_jwt::JwtAuthProvider;
use rr_config::Settings;
use rr_core::traits::{AuthProvider, ProductRepo};
use rr_core::Product;
use rr_db_sqlite::SqliteReviewRepo;
use tracing::info;
use uuid::Uuid;

fn demo_products() -> Vec<Product> {
    vec![
        Product::new(
            "Wireless Bluetooth Headphones",
            "Premium noise-cancelling wireless headphones with 30-hour battery life and superior sound quality.",
            199.99,
            "https://images.pexels.com/photos/3394650/pexels-photo-3394650.jpeg?auto=compress&cs=tinysrgb&w=500",
            "Electronics",
        ),
        Product::new(
            "Smart Fitness Watch",
            "Advanced fitness tracker with heart rate monitoring, GPS, and 7-day battery life.",
            299.99,
            "https://images.pexels.com/photos/393047/pexels-photo-393047.jpeg?auto=compress&cs=tinysrgb&w=500",
            "Wearables",
        ),
        Product::new(
            "Organic Cotton T-Shirt",
            "Comfortable and sustainable cotton t-shirt for everyday wear.",
            29.99,
            "https://images.pexels.com/photos/1521572163474-6864f9cf17ab?w=400",
            "Clothing",
        ),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("Failed to load settings")?;
    rr_config::init_tracing(&settings.log);

    let repo = SqliteReviewRepo::connect(&settings.database.url, settings.database.max_connections)
        .await
        .context("Failed to init SQLite")?;

    let existing = repo.list_products(Default::default()).await?;
    if existing.is_empty() {
        for product in demo_products() {
            let product = repo.create_product(product).await?;
            info!(id = %product.id, name = %product.name, "seeded product");
        }
    } else {
        info!(count = existing.len(), "catalogue already populated, skipping products");
    }

    let auth = JwtAuthProvider::new(
        &settings.auth.token_secret,
        Duration::from_secs(settings.auth.token_ttl_secs),
    )?;
    let user_id = Uuid::now_v7();
    let token = auth.issue_token(user_id).context("Failed to sign demo token")?;
    println!("demo user: {user_id}");
    println!("token:     {token}");

    Ok(())
}
