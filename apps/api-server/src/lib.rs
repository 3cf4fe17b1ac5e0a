//! # Quill API Server
//!
//! Actix-web wiring for the Quill blogging backend. The binary lives in
//! `main.rs`; this library exists so integration tests can build the same
//! application.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod state;
