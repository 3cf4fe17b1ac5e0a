//! HTTP handlers and route configuration.

mod auth;
mod comments;
mod health;
mod posts;

use actix_web::web;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // Public routes
            .route("/health", web::get().to(health::health_check))
            // Session lifecycle
            .route("/register", web::post().to(auth::register))
            .route("/token", web::post().to(auth::token))
            .route("/refresh", web::post().to(auth::refresh))
            .route("/logout", web::post().to(auth::logout))
            .route("/me", web::get().to(auth::me))
            // Content
            .service(
                web::scope("/posts")
                    .route("", web::get().to(posts::list))
                    .route("", web::post().to(posts::create))
                    // Literal segment must be registered before `{id}`.
                    .route("/my_posts", web::get().to(posts::my_posts))
                    .route("/{id}", web::get().to(posts::retrieve))
                    .route("/{id}", web::put().to(posts::update))
                    .route("/{id}", web::delete().to(posts::delete))
                    .route("/{id}/toggle_like", web::post().to(posts::toggle_like))
                    .route("/{id}/likes", web::get().to(posts::likes))
                    .route("/{post_id}/comments", web::get().to(comments::list))
                    .route("/{post_id}/comments", web::post().to(comments::create))
                    .route("/{post_id}/comments/{id}", web::get().to(comments::retrieve))
                    .route("/{post_id}/comments/{id}", web::put().to(comments::update))
                    .route(
                        "/{post_id}/comments/{id}",
                        web::delete().to(comments::delete),
                    ),
            ),
    );
}
