use std::sync::Arc;
use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DbConn, DbErr};

/// Configuration for the database pool.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub sqlx_logging: bool,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 20,
            min_connections: 2,
            connect_timeout: Duration::from_secs(10),
            sqlx_logging: false,
        }
    }
}

/// Database connection pool, shared by every repository.
#[derive(Clone)]
pub struct DatabaseConnections {
    pub main: Arc<DbConn>,
}

impl DatabaseConnections {
    /// Connect using the given configuration.
    pub async fn init(config: &DatabaseConfig) -> Result<Self, DbErr> {
        tracing::info!("Initializing database connection pool...");

        let opts = ConnectOptions::new(&config.url)
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(config.connect_timeout)
            .idle_timeout(Duration::from_secs(300))
            .sqlx_logging(config.sqlx_logging)
            .to_owned();

        let main = Database::connect(opts).await?;
        tracing::info!(pool = config.max_connections, "Database connected");

        Ok(Self::from_connection(main))
    }

    pub fn from_connection(main: DbConn) -> Self {
        Self { main: Arc::new(main) }
    }

    /// Round-trip a trivial query, for readiness checks.
    pub async fn ping(&self) -> Result<(), DbErr> {
        self.main
            .execute_unprepared("SELECT 1")
            .await
            .map(|_| ())
    }
}
