use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use rr_api::{router, AppState};
use rr_auth_jwt::JwtAuthProvider;
use rr_core::models::Product;
use rr_core::traits::{AuthProvider, MockProductRepo, MockReviewRepo, ProductRepo};
use rr_core::{AppError, ReviewService};
use rr_db_sqlite::SqliteReviewRepo;
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    router: Router,
    auth: Arc<JwtAuthProvider>,
    product_id: Uuid,
}

impl TestApp {
    async fn new() -> Self {
        let repo = Arc::new(SqliteReviewRepo::new("sqlite::memory:").await.unwrap());
        let product = repo
            .create_product(Product::new(
                "Wireless Bluetooth Headphones",
                "Premium noise-cancelling wireless headphones with 30-hour battery life.",
                199.99,
                "https://images.example.com/headphones.jpeg",
                "Electronics",
            ))
            .await
            .unwrap();
        repo.create_product(Product::new(
            "Smart Fitness Watch",
            "Heart-rate monitoring and GPS tracking.",
            299.99,
            "https://images.example.com/watch.jpeg",
            "Wearables",
        ))
        .await
        .unwrap();

        let auth = Arc::new(
            JwtAuthProvider::new(&SecretString::from("test-secret".to_string()), Duration::from_secs(600))
                .unwrap(),
        );
        let state = Arc::new(AppState {
            reviews: ReviewService::new(repo.clone(), repo.clone()),
            products: repo,
            auth: auth.clone(),
        });

        Self {
            router: router(state, Duration::from_secs(3600)),
            auth,
            product_id: product.id,
        }
    }

    fn user(&self) -> String {
        self.auth.issue_token(Uuid::new_v4()).unwrap()
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        send(&self.router, method, uri, token, body).await
    }

    async fn review(&self, token: &str, body: Value) -> (StatusCode, Value) {
        let uri = format!("/api/products/{}/reviews", self.product_id);
        self.call(Method::POST, &uri, Some(token), Some(body)).await
    }

    async fn cached(&self) -> (f64, u64) {
        let uri = format!("/api/products/{}", self.product_id);
        let (status, product) = self.call(Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        (
            product["averageRating"].as_f64().unwrap(),
            product["totalReviews"].as_u64().unwrap(),
        )
    }
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn review_lifecycle_keeps_product_aggregate_current() {
    let app = TestApp::new().await;

    let (status, first) = app
        .review(
            &app.user(),
            json!({
                "rating": 5,
                "comment": "Absolutely amazing sound quality!",
                "tags": ["sound quality", "battery life"]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["rating"], 5);
    assert_eq!(first["helpful"], 0);

    let (status, _) = app.review(&app.user(), json!({ "rating": 4 })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.cached().await, (4.5, 2));

    let author = app.user();
    let (_, third) = app.review(&author, json!({ "rating": 3 })).await;
    assert_eq!(app.cached().await, (4.0, 3));

    let uri = format!("/api/reviews/{}", third["id"].as_str().unwrap());
    let (status, body) = app.call(Method::DELETE, &uri, Some(&author), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Review deleted successfully");
    assert_eq!(app.cached().await, (4.5, 2));
}

#[tokio::test]
async fn edit_changes_rating_and_keeps_omitted_fields() {
    let app = TestApp::new().await;
    let author = app.user();

    let (_, created) = app
        .review(
            &author,
            json!({ "rating": 2, "comment": "Sound cuts out every few minutes.", "tags": ["bluetooth"] }),
        )
        .await;
    let uri = format!("/api/reviews/{}", created["id"].as_str().unwrap());

    let (status, edited) = app
        .call(Method::PUT, &uri, Some(&author), Some(json!({ "rating": 4 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["rating"], 4);
    assert_eq!(edited["comment"], "Sound cuts out every few minutes.");
    assert_eq!(edited["tags"], json!(["bluetooth"]));
    assert_eq!(app.cached().await, (4.0, 1));

    // null reads as omitted, so the comment survives
    let (status, edited) = app
        .call(Method::PUT, &uri, Some(&author), Some(json!({ "rating": 5, "comment": null })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["comment"], "Sound cuts out every few minutes.");
}

#[tokio::test]
async fn deleting_last_review_resets_product() {
    let app = TestApp::new().await;
    let author = app.user();

    let (_, created) = app.review(&author, json!({ "rating": 1 })).await;
    assert_eq!(app.cached().await, (1.0, 1));

    let uri = format!("/api/reviews/{}", created["id"].as_str().unwrap());
    app.call(Method::DELETE, &uri, Some(&author), None).await;
    assert_eq!(app.cached().await, (0.0, 0));
}

#[tokio::test]
async fn second_review_from_same_user_conflicts() {
    let app = TestApp::new().await;
    let author = app.user();

    app.review(&author, json!({ "rating": 5 })).await;
    let (status, body) = app
        .review(&author, json!({ "rating": 1, "comment": "Actually, I changed my mind." }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "You have already reviewed this product");
    assert_eq!(app.cached().await, (5.0, 1));
}

#[tokio::test]
async fn writes_require_a_valid_token() {
    let app = TestApp::new().await;
    let uri = format!("/api/products/{}/reviews", app.product_id);

    let (status, _) = app.call(Method::POST, &uri, None, Some(json!({ "rating": 5 }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .call(Method::POST, &uri, Some("demo-token-123"), Some(json!({ "rating": 5 })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);

    // reads stay public
    let (status, _) = app.call(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn only_the_owner_may_edit_or_delete() {
    let app = TestApp::new().await;
    let (_, created) = app.review(&app.user(), json!({ "rating": 4 })).await;
    let uri = format!("/api/reviews/{}", created["id"].as_str().unwrap());
    let stranger = app.user();

    let (status, _) = app
        .call(Method::PUT, &uri, Some(&stranger), Some(json!({ "rating": 1 })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call(Method::DELETE, &uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(app.cached().await, (4.0, 1));
}

#[tokio::test]
async fn validation_errors_name_each_field() {
    let app = TestApp::new().await;

    let (status, body) = app
        .review(
            &app.user(),
            json!({
                "rating": 7,
                "comment": "meh",
                "tags": ["ok", "x"],
                "images": ["not a url"]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["rating", "comment", "tags[1]", "images[0]"]);
    assert_eq!(app.cached().await, (0.0, 0));
}

#[tokio::test]
async fn unparseable_payloads_get_field_errors() {
    let app = TestApp::new().await;
    let token = app.user();

    for (body, field) in [
        (json!({ "rating": 4.5 }), "rating"),
        (json!({ "comment": "Great sound and battery." }), "rating"),
        (json!({ "rating": "five" }), "rating"),
        (json!({ "rating": 4, "tags": "aa" }), "tags"),
    ] {
        let (status, response) = app.review(&token, body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(response["status"], 400, "{body}");
        assert_eq!(response["errors"][0]["field"], field, "{body}");
    }
    assert_eq!(app.cached().await, (0.0, 0));
}

#[tokio::test]
async fn malformed_ids_and_queries_get_field_errors() {
    let app = TestApp::new().await;

    let (status, body) = app.call(Method::GET, "/api/products/not-a-uuid/reviews", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert_eq!(body["errors"][0]["field"], "productId");

    let (status, body) = app
        .call(Method::PUT, "/api/reviews/42", Some(&app.user()), Some(json!({ "rating": 3 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "reviewId");

    let uri = format!("/api/products/{}/reviews?page=abc", app.product_id);
    let (status, body) = app.call(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "page");
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let app = TestApp::new().await;
    let missing = Uuid::new_v4();

    let uri = format!("/api/products/{missing}/reviews");
    let (status, _) = app.call(Method::POST, &uri, Some(&app.user()), Some(json!({ "rating": 3 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.call(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/api/reviews/{missing}");
    let (status, _) = app.call(Method::DELETE, &uri, Some(&app.user()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/api/products/{missing}");
    let (status, body) = app.call(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn listing_pages_and_sorts_reviews() {
    let app = TestApp::new().await;
    for rating in [2, 5, 3, 4, 1] {
        app.review(&app.user(), json!({ "rating": rating })).await;
    }

    let uri = format!("/api/products/{}/reviews?page=1&limit=2&sort=rating", app.product_id);
    let (status, page) = app.call(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 5);
    assert_eq!(page["totalPages"], 3);
    assert_eq!(page["currentPage"], 1);
    let ratings: Vec<u64> = page["reviews"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["rating"].as_u64().unwrap())
        .collect();
    assert_eq!(ratings, vec![5, 4]);

    let uri = format!("/api/products/{}/reviews?sort=userId", app.product_id);
    let (status, body) = app.call(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "sort");
}

#[tokio::test]
async fn popular_tags_are_ranked() {
    let app = TestApp::new().await;
    app.review(&app.user(), json!({ "rating": 5, "tags": ["aa", "bb"] })).await;
    app.review(&app.user(), json!({ "rating": 4, "tags": ["aa"] })).await;
    app.review(&app.user(), json!({ "rating": 4, "tags": ["bb", "bb"] })).await;

    let uri = format!("/api/products/{}/tags", app.product_id);
    let (status, tags) = app.call(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tags, json!([{ "tag": "bb", "count": 3 }, { "tag": "aa", "count": 2 }]));
}

#[tokio::test]
async fn catalogue_filters_and_categories() {
    let app = TestApp::new().await;
    app.review(&app.user(), json!({ "rating": 5 })).await;

    let (_, all) = app.call(Method::GET, "/api/products", None, None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, rated) = app.call(Method::GET, "/api/products?minRating=4.5", None, None).await;
    assert_eq!(rated.as_array().unwrap().len(), 1);
    assert_eq!(rated[0]["name"], "Wireless Bluetooth Headphones");

    let (_, searched) = app
        .call(Method::GET, "/api/products?q=gps&category=", None, None)
        .await;
    assert_eq!(searched.as_array().unwrap().len(), 1);
    assert_eq!(searched[0]["category"], "Wearables");

    let (status, categories) = app.call(Method::GET, "/api/categories", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(categories, json!(["Electronics", "Wearables"]));

    let (status, _) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn store_failures_do_not_leak_details() {
    let mut products = MockProductRepo::new();
    products
        .expect_get_product()
        .returning(|_| Err(AppError::store("database is locked: /var/lib/reviews.db")));
    let auth = Arc::new(
        JwtAuthProvider::new(&SecretString::from("test-secret".to_string()), Duration::from_secs(600)).unwrap(),
    );
    let products: Arc<dyn ProductRepo> = Arc::new(products);
    let state = Arc::new(AppState {
        reviews: ReviewService::new(Arc::new(MockReviewRepo::new()), products.clone()),
        products,
        auth: auth.clone(),
    });
    let app = router(state, Duration::from_secs(60));

    let uri = format!("/api/products/{}/reviews", Uuid::new_v4());
    let token = auth.issue_token(Uuid::new_v4()).unwrap();
    let (status, body) = send(&app, Method::POST, &uri, Some(&token), Some(json!({ "rating": 5 }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Internal server error", "status": 500 }));
}
