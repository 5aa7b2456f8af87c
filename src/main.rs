use std::sync::{Arc, Mutex};

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use barbershop::config::AppConfig;
use barbershop::db;
use barbershop::handlers;
use barbershop::services::accounts::SqlAccounts;
use barbershop::services::catalog::SqlCatalog;
use barbershop::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;
    let db = Arc::new(Mutex::new(conn));

    let state = Arc::new(AppState {
        db: Arc::clone(&db),
        config: config.clone(),
        catalog: Box::new(SqlCatalog::new(Arc::clone(&db))),
        accounts: Box::new(SqlAccounts::new(db)),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/slots/occupied", get(handlers::slots::occupied_slots))
        .route(
            "/api/bookings",
            get(handlers::bookings::get_bookings_by_user).post(handlers::bookings::create_booking),
        )
        .route("/api/bookings/:id", get(handlers::bookings::get_booking_detail))
        .route(
            "/api/bookings/:id/status",
            post(handlers::bookings::update_status),
        )
        .route(
            "/api/admin/bookings",
            get(handlers::bookings::admin_get_bookings),
        )
        .route(
            "/api/admin/bookings/:id/status",
            post(handlers::bookings::admin_update_status),
        )
        .route("/api/reviews", post(handlers::reviews::submit_review))
        .route(
            "/api/reviews/booking/:booking_id",
            get(handlers::reviews::get_review_by_booking),
        )
        .route(
            "/api/reviews/service/:service_id",
            get(handlers::reviews::get_reviews_by_service),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
