use anyhow::Result;
use aws_config::BehaviorVersion;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod jwt;
mod middleware;
mod models;
mod rate_limiter;
mod repositories;
mod routes;
mod services;
mod state;
mod validation;

use common::database::{DatabaseConfig, init_pool};

use crate::{
    config::AppConfig,
    jwt::{JwtConfig, JwtService},
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::{CartRepository, OrderRepository, ProductRepository, UserRepository},
    services::{AiClient, EmailService, PaymentClient, RegistryClient, StorageService},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_max_level(Level::INFO)
        .init();

    info!("Starting SehatMart API service");

    let config = AppConfig::from_env()?;
    let jwt_config = JwtConfig::from_env()?;
    error::set_development(config.server.environment.is_development());

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    common::database::run_migrations(&pool, &sqlx::migrate!()).await?;

    // One AWS credential chain shared by the S3 and SES clients
    let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let s3_client = aws_sdk_s3::Client::new(&aws_config);
    let ses_client = aws_sdk_sesv2::Client::new(&aws_config);

    // Initialize repositories
    let user_repository = UserRepository::new(pool.clone());
    let product_repository = ProductRepository::new(pool.clone());
    let cart_repository = CartRepository::new(pool.clone());
    let order_repository = OrderRepository::new(pool.clone());

    let state = AppState {
        db_pool: pool,
        user_repository,
        product_repository,
        cart_repository,
        order_repository,
        jwt_service: JwtService::new(jwt_config),
        ai_client: AiClient::new(&config.ai)?,
        registry_client: RegistryClient::new(&config.registry)?,
        payment_client: PaymentClient::new(&config.payment)?,
        storage: StorageService::new(s3_client, &config.storage),
        email: EmailService::new(ses_client, &config.email),
        api_limiter: RateLimiter::new(RateLimiterConfig::default()),
        ai_limiter: RateLimiter::new(RateLimiterConfig {
            max_requests: 10,
            window_seconds: 900,
        }),
    };

    let cors = build_cors(&config)?;

    // Start the web server
    let app = routes::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(config.server.max_body_size));

    let addr = config.server_address();
    let listener = TcpListener::bind(&addr).await?;
    info!("API service listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped gracefully");

    Ok(())
}

/// CORS layer from configuration; no configured origins allows any origin
fn build_cors(config: &AppConfig) -> Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if config.cors.allowed_origins.is_empty() {
        return Ok(cors.allow_origin(Any));
    }

    let origins = config
        .cors
        .allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|_| anyhow::anyhow!("Invalid CORS origin: {}", origin))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(cors.allow_origin(origins))
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutting down gracefully");
}
