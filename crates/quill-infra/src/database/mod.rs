//! PostgreSQL persistence via SeaORM.

mod connections;
mod postgres;

pub mod entity;

pub use connections::{DatabaseConfig, connect};
pub use postgres::{
    PostgresCommentRepository, PostgresPostRepository, PostgresTokenBlacklist,
    PostgresUserRepository,
};

#[cfg(test)]
mod tests;
