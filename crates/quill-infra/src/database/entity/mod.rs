//! SeaORM entities mirroring the domain model.

pub mod comment;
pub mod post;
pub mod post_like;
pub mod revoked_token;
pub mod user;
