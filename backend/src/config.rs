//! Configuration management for the group-order marketplace
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with GOM_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Allowed browser origins
    pub cors: CorsConfig,

    /// SMS gateway configuration
    pub sms: SmsConfig,

    /// Image hosting configuration
    pub image_host: ImageHostConfig,

    /// Phone verification limits
    pub verification: VerificationConfig,

    /// Order numbering
    pub orders: OrderConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Login token expiration in seconds
    pub access_token_expiry: i64,

    /// Expiration in seconds of a token issued by `extend`
    pub extended_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CorsConfig {
    /// Empty means any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmsConfig {
    /// Gateway endpoint
    pub endpoint: String,

    /// Gateway account
    pub username: String,

    /// Gateway password
    pub password: String,

    /// Minutes the gateway keeps retrying delivery
    pub retry_time: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImageHostConfig {
    /// Cloud name used to build the upload URL
    pub cloud_name: String,

    /// API key
    pub api_key: String,

    /// API secret used to sign uploads
    pub api_secret: String,

    /// Upload endpoint base URL
    pub upload_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VerificationConfig {
    /// Maximum codes sent to one phone per day
    pub daily_limit: i32,

    /// Minimum seconds between two sends
    pub cooldown_secs: i64,

    /// Seconds a code stays valid
    pub code_ttl_secs: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OrderConfig {
    /// Offset from UTC in seconds of the calendar that order numbers follow
    pub utc_offset_secs: i32,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("GOM_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 4000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 86_400)?
            .set_default("jwt.extended_token_expiry", 604_800)?
            .set_default("cors.allowed_origins", Vec::<String>::new())?
            .set_default("sms.endpoint", "https://api.e8d.tw/API21/HTTP/SendSMS.ashx")?
            .set_default("sms.username", "")?
            .set_default("sms.password", "")?
            .set_default("sms.retry_time", 10)?
            .set_default("image_host.cloud_name", "")?
            .set_default("image_host.api_key", "")?
            .set_default("image_host.api_secret", "")?
            .set_default("image_host.upload_url", "https://api.cloudinary.com/v1_1")?
            .set_default("verification.daily_limit", 10)?
            .set_default("verification.cooldown_secs", 600)?
            .set_default("verification.code_ttl_secs", 600)?
            // Taiwan, UTC+8
            .set_default("orders.utc_offset_secs", 28_800)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (GOM_ prefix)
            .add_source(
                Environment::with_prefix("GOM")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 4000,
            host: "0.0.0.0".to_string(),
        }
    }
}
