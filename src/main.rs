use anyhow::Result;
use axum::{
    routing::{get, post, put},
    Extension, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::info;

use trip_api_server::config::Settings;
use trip_api_server::database::{DbPool, Repository};
use trip_api_server::handlers;
use trip_api_server::services::RegistrationService;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,trip_api_server=debug".to_string()),
        )
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .init();

    info!("🚀 Starting Trip API Server...");

    // Load configuration
    let settings = Settings::load()?;
    info!("✅ Configuration loaded");

    // Initialize database pool
    let db_pool = DbPool::new(&settings.database).await?;
    info!("✅ Database connection established");

    // Initialize repository
    let repository = Arc::new(Repository::new(db_pool));
    repository.ensure_schema().await?;
    info!("✅ Schema ensured");

    // Initialize services
    let registration_service = Arc::new(RegistrationService::new(repository.clone()));

    // Build router
    let app = build_router(repository, registration_service);

    // Server address
    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    info!("🎯 Server listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(
    repository: Arc<Repository>,
    registration_service: Arc<RegistrationService>,
) -> Router {
    let health_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check));

    let api_routes = Router::new()
        .route("/api/trips", get(handlers::trips::get_trips))
        .route("/api/trips/{client_id}", get(handlers::trips::get_client_trips))
        .route("/api/clients", post(handlers::clients::create_client))
        .route(
            "/api/clients/{client_id}/trips/{trip_id}",
            put(handlers::clients::register_for_trip)
                .delete(handlers::clients::unregister_from_trip),
        );

    // Combine routes
    Router::new()
        .merge(health_routes)
        .merge(api_routes)
        // Shared state
        .layer(Extension(repository))
        .layer(Extension(registration_service))
        // CORS
        .layer(CorsLayer::permissive())
        // Tracing
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
}
