//! # Rusty-Reviews Binary
//!
//! The entry point that assembles the application based on compile-time features.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rr_api::{router, AppState};
use rr_config::Settings;
use rr_core::ReviewService;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

// Feature-gated imports: adapters are chosen at compile time
#[cfg(feature = "db-sqlite")]
use rr_db_sqlite::SqliteReviewRepo;

#[cfg(feature = "auth-jwt")]
use rr_auth_jwt::JwtAuthProvider;

#[cfg(not(all(feature = "db-sqlite", feature = "auth-jwt")))]
compile_error!("rusty-reviews needs a store (`db-sqlite`) and an auth provider (`auth-jwt`)");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("Failed to load settings")?;
    rr_config::init_tracing(&settings.log);

    if settings.auth.uses_placeholder_secret() {
        warn!("auth.token_secret is the built-in placeholder; set REVIEWS__AUTH__TOKEN_SECRET");
    }

    // 1. Initialize Database Implementation
    let repo = Arc::new(
        SqliteReviewRepo::connect(&settings.database.url, settings.database.max_connections)
            .await
            .context("Failed to init SQLite")?,
    );

    // 2. Initialize Auth Implementation
    let auth = JwtAuthProvider::new(
        &settings.auth.token_secret,
        Duration::from_secs(settings.auth.token_ttl_secs),
    )
    .context("Failed to init token auth")?;

    // 3. Wrap in AppState (Using dynamic dispatch for maximum flexibility)
    let state = Arc::new(AppState {
        reviews: ReviewService::new(repo.clone(), repo.clone()),
        products: repo,
        auth: Arc::new(auth),
    });

    let app = router(state, Duration::from_secs(settings.server.cors_max_age_secs));

    let address = settings.server_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Rusty-Reviews listening on http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
