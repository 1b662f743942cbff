//! Application state shared across handlers

use sqlx::PgPool;

use crate::jwt::JwtService;
use crate::rate_limiter::RateLimiter;
use crate::repositories::{CartRepository, OrderRepository, ProductRepository, UserRepository};
use crate::services::{AiClient, EmailService, PaymentClient, RegistryClient, StorageService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub user_repository: UserRepository,
    pub product_repository: ProductRepository,
    pub cart_repository: CartRepository,
    pub order_repository: OrderRepository,
    pub jwt_service: JwtService,
    pub ai_client: AiClient,
    pub registry_client: RegistryClient,
    pub payment_client: PaymentClient,
    pub storage: StorageService,
    pub email: EmailService,
    pub api_limiter: RateLimiter,
    pub ai_limiter: RateLimiter,
}
