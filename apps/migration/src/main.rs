//! Migration CLI tool.
//!
//! `DATABASE_URL` selects the database; run `migration up` to apply
//! pending migrations, `migration status` to list them.

use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    cli::run_cli(migration::Migrator).await;
}
