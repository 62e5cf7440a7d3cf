use crate::api::ApiClient;
use crate::config::Config;
use crate::db;
use anyhow::Result;
use sqlx::PgPool;

/// Everything an adapter needs, passed explicitly. There is no process-wide
/// connection singleton; the pool is dropped (and connections released) when
/// this goes out of scope at the end of main.
pub struct AppContext {
    pub db: PgPool,
    pub api: ApiClient,
}

impl AppContext {
    pub async fn init(config: &Config) -> Result<Self> {
        let db = db::connect_with_retry(&config.database_url, 5).await?;
        let api = ApiClient::new(config)?;
        Ok(Self { db, api })
    }
}
