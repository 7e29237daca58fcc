// config.rs
use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` runs the service on the in-memory store.
    pub database_url: Option<String>,
    pub app_url: String,
    pub frontend_url: String,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub port: u16,

    pub payment_gateway_base_url: String,
    pub payment_gateway_api_key: String,
    pub payment_gateway_private_key: String,
    pub payment_gateway_merchant_code: String,
    pub payment_gateway_timeout_secs: u64,

    pub auto_complete_interval_secs: u64,
    pub auto_complete_grace_hours: i64,
    pub hub_channel_capacity: usize,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {}", name, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn init() -> anyhow::Result<Config> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());
        let jwt_secret = std::env::var("JWT_SECRET_KEY").context("JWT_SECRET_KEY must be set")?;
        let payment_gateway_private_key = std::env::var("PAYMENT_GATEWAY_PRIVATE_KEY")
            .context("PAYMENT_GATEWAY_PRIVATE_KEY must be set")?;

        Ok(Config {
            database_url,
            app_url: var_or("APP_URL", "http://localhost:8000"),
            frontend_url: var_or("FRONTEND_URL", "http://localhost:3000"),
            jwt_secret,
            jwt_maxage: parse_or("JWT_MAXAGE", 60)?,
            port: parse_or("PORT", 8000)?,
            payment_gateway_base_url: var_or(
                "PAYMENT_GATEWAY_BASE_URL",
                "https://tripay.co.id/api-sandbox",
            ),
            payment_gateway_api_key: var_or("PAYMENT_GATEWAY_API_KEY", ""),
            payment_gateway_private_key,
            payment_gateway_merchant_code: var_or("PAYMENT_GATEWAY_MERCHANT_CODE", ""),
            payment_gateway_timeout_secs: parse_or("PAYMENT_GATEWAY_TIMEOUT_SECS", 15)?,
            auto_complete_interval_secs: parse_or("AUTO_COMPLETE_INTERVAL_SECS", 3600)?,
            auto_complete_grace_hours: parse_or("AUTO_COMPLETE_GRACE_HOURS", 72)?,
            hub_channel_capacity: parse_or("HUB_CHANNEL_CAPACITY", 64)?,
        })
    }

    /// Settings for tests and local runs without an environment.
    pub fn for_tests(jwt_secret: &str, gateway_private_key: &str) -> Config {
        Config {
            database_url: None,
            app_url: "http://localhost:8000".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            jwt_secret: jwt_secret.to_string(),
            jwt_maxage: 60,
            port: 8000,
            payment_gateway_base_url: "http://localhost:9999".to_string(),
            payment_gateway_api_key: String::new(),
            payment_gateway_private_key: gateway_private_key.to_string(),
            payment_gateway_merchant_code: String::new(),
            payment_gateway_timeout_secs: 15,
            auto_complete_interval_secs: 3600,
            auto_complete_grace_hours: 72,
            hub_channel_capacity: 64,
        }
    }
}
