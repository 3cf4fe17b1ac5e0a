//! Post handlers: CRUD, like toggling, and the author's own feed.
//!
//! Every mutating handler takes [`Identity`] (401 before anything else) and
//! then runs the ownership predicate from `quill_core::policy` (403), so the
//! ordering contract holds per-route.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use uuid::Uuid;

use quill_core::domain::{Post, PostView};
use quill_core::policy;
use quill_shared::dto::{LikesCountResponse, PostRequest, PostResponse, UserResponse};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn post_response(view: PostView) -> PostResponse {
    PostResponse {
        id: view.post.id,
        title: view.post.title,
        content: view.post.content,
        author: view.author,
        created_at: view.post.created_at,
        updated_at: view.post.updated_at,
        likes_count: view.likes_count,
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Post {id} not found"))
}

fn validate(req: &PostRequest) -> AppResult<()> {
    if req.title.trim().is_empty() {
        return Err(AppError::Validation("Title must not be empty".to_string()));
    }
    Ok(())
}

/// GET /api/posts - public, newest first.
pub async fn list(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let views = state.posts.list_recent().await?;

    Ok(HttpResponse::Ok().json(views.into_iter().map(post_response).collect::<Vec<_>>()))
}

/// POST /api/posts - the acting identity becomes the author.
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<PostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    validate(&req)?;

    let post = Post::new(identity.user_id, req.title, req.content);
    let saved = state.posts.create(post).await?;

    tracing::debug!(post_id = %saved.id, author = %identity.username, "post created");

    Ok(HttpResponse::Created().json(post_response(PostView {
        post: saved,
        author: identity.username,
        likes_count: 0,
    })))
}

/// GET /api/posts/{id} - public.
pub async fn retrieve(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();

    let view = state.posts.view(id).await?.ok_or_else(|| not_found(id))?;

    Ok(HttpResponse::Ok().json(post_response(view)))
}

/// PUT /api/posts/{id} - author only.
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<PostRequest>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let req = body.into_inner();
    validate(&req)?;

    let mut post = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found(id))?;

    policy::require_author(Some(identity.user_id), post.author_id)?;

    post.title = req.title;
    post.content = req.content;
    post.updated_at = Utc::now();

    let saved = state.posts.update(post).await?;
    let view = state
        .posts
        .view(saved.id)
        .await?
        .ok_or_else(|| not_found(id))?;

    Ok(HttpResponse::Ok().json(post_response(view)))
}

/// DELETE /api/posts/{id} - author only.
pub async fn delete(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();

    let post = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found(id))?;

    policy::require_author(Some(identity.user_id), post.author_id)?;

    state.posts.delete(id).await?;

    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/posts/{id}/toggle_like - any authenticated user, author included.
pub async fn toggle_like(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();

    // The like must attach to an existing post.
    state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found(id))?;

    let likes_count = state.posts.toggle_like(id, identity.user_id).await?;

    Ok(HttpResponse::Ok().json(LikesCountResponse { likes_count }))
}

/// GET /api/posts/{id}/likes - public list of the liker set.
pub async fn likes(state: web::Data<AppState>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let id = path.into_inner();

    state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found(id))?;

    let likers = state.posts.likers(id).await?;

    Ok(HttpResponse::Ok().json(
        likers
            .into_iter()
            .map(|u| UserResponse {
                id: u.id,
                username: u.username,
                email: u.email,
            })
            .collect::<Vec<_>>(),
    ))
}

/// GET /api/posts/my_posts - posts authored by the acting identity.
pub async fn my_posts(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let views = state.posts.list_by_author(identity.user_id).await?;

    Ok(HttpResponse::Ok().json(views.into_iter().map(post_response).collect::<Vec<_>>()))
}
