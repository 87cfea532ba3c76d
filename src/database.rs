use std::collections::HashMap;
use std::str::FromStr;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use crate::config::Config;
use crate::error::{StoreError, StoreResult};

/// Named connection pools, one per configured database resource.
///
/// Managers ask for a resource by name ("db-customer") and get the shared
/// "db" pool when no dedicated one is configured. Connections return to
/// their pool when dropped, so release happens on every exit path.
#[derive(Debug)]
pub struct DatabaseManager {
    pools: HashMap<String, Pool<Sqlite>>,
}

impl DatabaseManager {
    /// Connects all resources listed under "resources" in the configuration
    pub async fn connect(config: &Config) -> StoreResult<Self> {
        let mut pools = HashMap::new();

        for (name, url) in config.resources() {
            tracing::debug!(resource = %name, "connecting database resource");
            let pool = open_pool(&url).await?;
            pools.insert(name, pool);
        }

        if !pools.contains_key("db") {
            return Err(StoreError::Config(
                "No \"db\" database resource configured".to_string(),
            ));
        }

        Ok(Self { pools })
    }

    /// Acquires a connection for the given resource, falling back to "db"
    pub async fn acquire(&self, resource: &str) -> StoreResult<PoolConnection<Sqlite>> {
        self.pool(resource)?
            .acquire()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    pub fn pool(&self, resource: &str) -> StoreResult<&Pool<Sqlite>> {
        self.pools
            .get(resource)
            .or_else(|| self.pools.get("db"))
            .ok_or_else(|| {
                StoreError::Config(format!("No database resource for \"{}\"", resource))
            })
    }
}

async fn open_pool(url: &str) -> StoreResult<Pool<Sqlite>> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| StoreError::Config(format!("Invalid database URL \"{}\": {}", url, e)))?
        .create_if_missing(true);

    // A private in-memory database exists per connection, so the pool must
    // keep exactly one connection alive and never recycle it.
    let pool_options = if url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };

    pool_options
        .connect_with(options)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))
}
