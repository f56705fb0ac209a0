use std::env;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::set_security_headers;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub paystack_secret_key: String,
    pub whatsapp_provider: String,
    pub sms_provider: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/stayflex".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            paystack_secret_key: env::var("PAYSTACK_SECRET_KEY").unwrap_or_default(),
            whatsapp_provider: env::var("WHATSAPP_PROVIDER").unwrap_or_else(|_| "stub".to_string()),
            sms_provider: env::var("SMS_PROVIDER").unwrap_or_else(|_| "stub".to_string()),
        }
    }
}
