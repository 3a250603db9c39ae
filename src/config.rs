use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config {
        port: get_env_parsed_or("PORT", 3001),
        mongo_uri: get_env("MONGO_URI"),
        mongo_db_name: get_env_or_default("MONGO_DB_NAME", "easyflight"),
        front_end_origin: env::var("FRONT_END_ORIGIN").ok(),
        currency_api_url: get_env_or_default("CURRENCY_API_URL", "https://api.frankfurter.app"),
        currency_timeout: Duration::from_millis(get_env_parsed_or("CURRENCY_TIMEOUT_MS", 3000)),
        provider_base_url: get_env_or_default(
            "PROVIDER_BASE_URL",
            "https://test.api.amadeus.com",
        ),
        provider_client_id: get_env_or_default("PROVIDER_CLIENT_ID", ""),
        provider_client_secret: get_env_or_default("PROVIDER_CLIENT_SECRET", ""),
        provider_timeout: Duration::from_millis(get_env_parsed_or("PROVIDER_TIMEOUT_MS", 10_000)),
        search_log_queue_capacity: get_env_parsed_or("SEARCH_LOG_QUEUE_CAPACITY", 1024),
        search_log_save_timeout: Duration::from_millis(get_env_parsed_or(
            "SEARCH_LOG_SAVE_TIMEOUT_MS",
            5_000,
        )),
    }
});

pub struct Config {
    pub port: u16,
    pub mongo_uri: String,
    pub mongo_db_name: String,
    pub front_end_origin: Option<String>,
    pub currency_api_url: String,
    pub currency_timeout: Duration,
    pub provider_base_url: String,
    pub provider_client_id: String,
    pub provider_client_secret: String,
    pub provider_timeout: Duration,
    pub search_log_queue_capacity: usize,
    pub search_log_save_timeout: Duration,
}

fn get_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("Missing required environment variable: {key}"))
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("Invalid value for environment variable {key}: {raw}")),
        Err(_) => default,
    }
}
