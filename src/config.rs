use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub base_url: String,
    pub host: String,
    pub port: u16,

    // Paystack payment gateway
    pub paystack_base_url: String,
    pub paystack_secret_key: Secret<String>,

    // Local shoutout notification fan-out (optional; disabled when unset)
    pub notifier_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        Ok(Self {
            database_url: config.get("database_url")?,
            base_url: config.get("base_url")?,
            host: config.get("host").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: config.get("port")?,

            paystack_base_url: config
                .get("paystack_base_url")
                .unwrap_or_else(|_| "https://api.paystack.co".to_string()),
            paystack_secret_key: Secret::new(config.get("paystack_secret_key")?),

            notifier_url: config.get("notifier_url").ok(),
        })
    }
}
