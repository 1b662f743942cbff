//! Application configuration loaded from environment variables
//!
//! Every section is read once at startup in `main` and handed to the
//! components that need it. Nothing reads process environment after boot.

use anyhow::Result;
use std::env;

/// Deployment environment flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Read `APP_ENV`; anything other than `production` is development
    pub fn from_env() -> Self {
        match env::var("APP_ENV").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_development(self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Global JSON body limit in bytes (multipart routes raise it per route)
    pub max_body_size: usize,
    pub environment: Environment,
}

/// CORS configuration
///
/// An empty origin list means any origin is allowed (development mode).
#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

/// Object storage configuration for product and profile images
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    /// Overrides the virtual-hosted S3 URL when serving through a CDN
    pub public_base_url: Option<String>,
}

/// AI chat adapter configuration
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub model: String,
}

/// Medication registry (Kemenkes) adapter configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub api_base_url: String,
    pub api_key: Option<String>,
}

/// Payment gateway (Midtrans) adapter configuration
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub server_key: Option<String>,
    pub api_base_url: String,
}

/// Transactional email configuration
///
/// Leaving `EMAIL_SENDER` unset disables payment-confirmation mail.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub sender: Option<String>,
}

/// Aggregated application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub storage: StorageConfig,
    pub ai: AiConfig,
    pub registry: RegistryConfig,
    pub payment: PaymentConfig,
    pub email: EmailConfig,
}

impl AppConfig {
    /// Build the full configuration from environment variables
    ///
    /// # Environment Variables
    /// - `HOST` (default 0.0.0.0), `PORT` (default 5000)
    /// - `MAX_BODY_SIZE`: global body limit in bytes (default 10240)
    /// - `APP_ENV`: `development` | `production` (default development)
    /// - `CORS_ALLOWED_ORIGINS`: comma-separated list; unset allows any origin
    /// - `S3_BUCKET`: bucket for uploaded images (required)
    /// - `S3_PUBLIC_BASE_URL`: optional CDN base for stored objects
    /// - `AI_API_KEY`, `AI_API_BASE_URL`, `AI_MODEL`
    /// - `KEMENKES_API_BASE_URL`, `KEMENKES_API_KEY`
    /// - `MIDTRANS_SERVER_KEY`, `MIDTRANS_API_BASE_URL`
    /// - `EMAIL_SENDER`: verified sender address for confirmation mail
    pub fn from_env() -> Result<Self> {
        let server = ServerConfig {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid PORT value"))?,
            max_body_size: env::var("MAX_BODY_SIZE")
                .unwrap_or_else(|_| "10240".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid MAX_BODY_SIZE value"))?,
            environment: Environment::from_env(),
        };

        let cors = CorsConfig {
            allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        };

        let storage = StorageConfig {
            bucket: env::var("S3_BUCKET")
                .map_err(|_| anyhow::anyhow!("S3_BUCKET environment variable not set"))?,
            public_base_url: env::var("S3_PUBLIC_BASE_URL").ok(),
        };

        let ai = AiConfig {
            api_key: env::var("AI_API_KEY").ok(),
            api_base_url: env::var("AI_API_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            model: env::var("AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
        };

        let registry = RegistryConfig {
            api_base_url: env::var("KEMENKES_API_BASE_URL")
                .unwrap_or_else(|_| "https://api-satusehat.kemkes.go.id".to_string()),
            api_key: env::var("KEMENKES_API_KEY").ok(),
        };

        let payment = PaymentConfig {
            server_key: env::var("MIDTRANS_SERVER_KEY").ok(),
            api_base_url: env::var("MIDTRANS_API_BASE_URL")
                .unwrap_or_else(|_| "https://app.sandbox.midtrans.com".to_string()),
        };

        let email = EmailConfig {
            sender: env::var("EMAIL_SENDER").ok(),
        };

        Ok(AppConfig {
            server,
            cors,
            storage,
            ai,
            registry,
            payment,
            email,
        })
    }

    /// Bind address for the HTTP listener
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
