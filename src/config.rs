use anyhow::{anyhow, Result};
use std::env;

/// Runtime configuration, read once at startup. Everything downstream gets
/// this (or the context built from it) passed in explicitly.
#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub database_url: String,
    pub requests_per_minute: u32,
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let api_key = match env::var("BALLDONTLIE_API_KEY") {
            Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
            Ok(_) => return Err(anyhow!("BALLDONTLIE_API_KEY is set but empty")),
            Err(_) => return Err(anyhow!("BALLDONTLIE_API_KEY is not set")),
        };

        // Catch sample keys copied out of docs before they hit the API.
        let key_lower = api_key.to_lowercase();
        if key_lower.contains("change_me") || key_lower.contains("your_") {
            return Err(anyhow!(
                "BALLDONTLIE_API_KEY appears to be a placeholder value; replace with your real key"
            ));
        }

        // Prefer a full DATABASE_URL; otherwise compose one from the NBA_DB_*
        // parts so local setups only need host/user/password.
        let database_url = match env::var("DATABASE_URL") {
            Ok(v) if !v.trim().is_empty() => v,
            _ => {
                let host = env::var("NBA_DB_HOST").unwrap_or_else(|_| "localhost".to_string());
                let port = env::var("NBA_DB_PORT").unwrap_or_else(|_| "5432".to_string());
                let name = env::var("NBA_DB_NAME").unwrap_or_else(|_| "nba_analytics".to_string());
                let user = env::var("NBA_DB_USER").unwrap_or_else(|_| "postgres".to_string());
                let password = env::var("NBA_DB_PASSWORD")
                    .map_err(|_| anyhow!("neither DATABASE_URL nor NBA_DB_PASSWORD is set"))?;
                format!("postgresql://{}:{}@{}:{}/{}", user, password, host, port, name)
            }
        };

        Ok(Self {
            api_key,
            database_url,
            requests_per_minute: env::var("API_REQUESTS_PER_MINUTE")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
        })
    }
}
