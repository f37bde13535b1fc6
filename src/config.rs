/// Configuration management for the Owode Agent server
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub email: Option<EmailConfig>,
    pub sms: Option<SmsConfig>,
    pub admin: AdminConfig,
    pub cors: CorsConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Externally reachable base URL, used in email links
    pub public_url: String,
    /// Admin dashboard URL linked from the deletion review pages
    pub frontend_url: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of login tokens in seconds
    pub token_ttl_seconds: i64,
    /// Lifetime of signed deletion-review links in hours
    pub link_token_ttl_hours: i64,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// SMS gateway configuration (Twilio REST API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub api_base: String,
}

/// Administrator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Address that receives registration and deletion-request emails
    pub notification_email: Option<String>,
    pub super_admin_email: Option<String>,
    pub super_admin_password: Option<String>,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Empty means any origin
    pub allowed_origins: Vec<String>,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_second: u32,
    pub burst_size: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level for this crate and the HTTP trace layer when `RUST_LOG` is unset
    pub level: String,
    pub json: bool,
}

impl LoggingConfig {
    /// Fallback filter directives built from `level`
    pub fn default_directives(&self) -> String {
        format!("owode_agent={0},tower_http={0}", self.level)
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_list(key: &str) -> Vec<String> {
    env::var(key)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .map_err(|_| AppError::Internal("Invalid port number".to_string()))?;
        let public_url =
            env::var("PUBLIC_URL").unwrap_or_else(|_| format!("http://localhost:{}", port));
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let database_path = env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/owode.sqlite"));

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| AppError::Internal("JWT_SECRET is required".to_string()))?;

        let email = if let Ok(smtp_url) = env::var("SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| "Owode Agent <noreply@localhost>".to_string()),
            })
        } else {
            None
        };

        let sms = match (
            env::var("TWILIO_SID"),
            env::var("TWILIO_AUTH_TOKEN"),
            env::var("TWILIO_PHONE_NUMBER"),
        ) {
            (Ok(account_sid), Ok(auth_token), Ok(from_number)) => Some(SmsConfig {
                account_sid,
                auth_token,
                from_number,
                api_base: env::var("TWILIO_API_BASE")
                    .unwrap_or_else(|_| "https://api.twilio.com".to_string()),
            }),
            _ => None,
        };

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                public_url,
                frontend_url,
            },
            storage: StorageConfig { database_path },
            authentication: AuthConfig {
                jwt_secret,
                token_ttl_seconds: env_or("TOKEN_TTL_SECONDS", 3600),
                link_token_ttl_hours: env_or("LINK_TOKEN_TTL_HOURS", 72),
            },
            email,
            sms,
            admin: AdminConfig {
                notification_email: env::var("ADMIN_EMAIL").ok(),
                super_admin_email: env::var("SUPER_ADMIN_EMAIL").ok(),
                super_admin_password: env::var("SUPER_ADMIN_PASSWORD").ok(),
            },
            cors: CorsConfig {
                allowed_origins: env_list("CORS_ALLOWED_ORIGINS"),
            },
            rate_limit: RateLimitConfig {
                enabled: env_or("RATE_LIMITS_ENABLED", true),
                requests_per_second: env_or("RATE_LIMIT_REQUESTS_PER_SECOND", 50),
                burst_size: env_or("RATE_LIMIT_BURST", 100),
            },
            logging: LoggingConfig {
                level: env::var("LOG_LEVEL").unwrap_or_else(|_| "debug".to_string()),
                json: env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false),
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AppError::Internal("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(AppError::Internal(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.authentication.token_ttl_seconds <= 0 {
            return Err(AppError::Internal(
                "Token lifetime must be positive".to_string(),
            ));
        }

        if self.admin.notification_email.is_none() {
            tracing::warn!("ADMIN_EMAIL not set; admin notifications will be skipped");
        }

        Ok(())
    }

    /// Configuration suitable for tests: in-memory database, no transports
    pub fn for_tests() -> Self {
        ServerConfig {
            service: ServiceConfig {
                hostname: "127.0.0.1".to_string(),
                port: 5000,
                public_url: "http://localhost:5000".to_string(),
                frontend_url: "http://localhost:3000".to_string(),
            },
            storage: StorageConfig {
                database_path: PathBuf::from(":memory:"),
            },
            authentication: AuthConfig {
                jwt_secret: "test-secret-key-for-testing-only-0123456789".to_string(),
                token_ttl_seconds: 3600,
                link_token_ttl_hours: 72,
            },
            email: None,
            sms: None,
            admin: AdminConfig {
                notification_email: Some("admin@owode.test".to_string()),
                super_admin_email: None,
                super_admin_password: None,
            },
            cors: CorsConfig {
                allowed_origins: vec![],
            },
            rate_limit: RateLimitConfig {
                enabled: false,
                requests_per_second: 50,
                burst_size: 100,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
        }
    }
}
