//! Database connection management and SeaORM repositories.

mod connections;
pub mod entity;
mod postgres_base;
pub mod postgres_repo;

pub use connections::{DatabaseConfig, DatabaseConnections};
pub use postgres_base::PostgresBaseRepository;
pub use postgres_repo::{
    PostgresCommentRepository, PostgresLikeRepository, PostgresMediaRepository,
    PostgresOAuthAccountRepository, PostgresPostRepository, PostgresProfileRepository,
    PostgresSessionRepository, PostgresUserRepository,
};
