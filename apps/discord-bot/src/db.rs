use crate::config::Config;
use crate::context::ConnectionPool;
use crate::error::Error;
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};
use std::time::Duration;
use tracing::info;

/// Initialize the PostgreSQL connection pool.
pub async fn init_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(config.database_acquire_timeout)
        .connect(&config.database_url)
        .await?;

    info!(
        max_connections = config.database_max_connections,
        "Database pool initialized"
    );

    Ok(pool)
}

#[async_trait]
impl ConnectionPool for PgPool {
    type Connection = PoolConnection<Postgres>;

    async fn acquire(&self, timeout: Option<Duration>) -> Result<Self::Connection, Error> {
        let conn = match timeout {
            Some(limit) => tokio::time::timeout(limit, PgPool::acquire(self))
                .await
                .map_err(|_| sqlx::Error::PoolTimedOut)??,
            None => PgPool::acquire(self).await?,
        };
        Ok(conn)
    }

    async fn release(&self, conn: Self::Connection) {
        // PoolConnection hands itself back to the pool on drop.
        drop(conn);
    }
}
