//! Comment handlers, scoped under their parent post.
//!
//! Every route carries the post id; a comment addressed through the wrong
//! post is a 404, and the post association never changes after creation.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use uuid::Uuid;

use quill_core::domain::{Comment, CommentView};
use quill_core::policy;
use quill_shared::dto::{CommentRequest, CommentResponse};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn comment_response(view: CommentView) -> CommentResponse {
    CommentResponse {
        id: view.comment.id,
        post_id: view.comment.post_id,
        text: view.comment.text,
        author: view.author,
        created_at: view.comment.created_at,
        updated_at: view.comment.updated_at,
    }
}

fn validate(req: &CommentRequest) -> AppResult<()> {
    if req.text.trim().is_empty() {
        return Err(AppError::Validation("Text must not be empty".to_string()));
    }
    Ok(())
}

async fn require_post(state: &AppState, post_id: Uuid) -> AppResult<()> {
    state
        .posts
        .find_by_id(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post {post_id} not found")))?;
    Ok(())
}

/// Resolve a comment within its post scope.
async fn find_scoped(state: &AppState, post_id: Uuid, id: Uuid) -> AppResult<Comment> {
    let comment = state
        .comments
        .find_by_id(id)
        .await?
        .filter(|c| c.post_id == post_id)
        .ok_or_else(|| AppError::NotFound(format!("Comment {id} not found")))?;
    Ok(comment)
}

/// GET /api/posts/{post_id}/comments - public, in creation order.
pub async fn list(state: web::Data<AppState>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    require_post(&state, post_id).await?;

    let views = state.comments.list_for_post(post_id).await?;

    Ok(HttpResponse::Ok().json(views.into_iter().map(comment_response).collect::<Vec<_>>()))
}

/// POST /api/posts/{post_id}/comments - any authenticated user may comment.
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<CommentRequest>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let req = body.into_inner();
    validate(&req)?;

    // Comments must point at an existing post at creation time.
    require_post(&state, post_id).await?;

    let comment = Comment::new(post_id, identity.user_id, req.text);
    let saved = state.comments.create(comment).await?;

    Ok(HttpResponse::Created().json(comment_response(CommentView {
        comment: saved,
        author: identity.username,
    })))
}

/// GET /api/posts/{post_id}/comments/{id} - public.
pub async fn retrieve(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (post_id, id) = path.into_inner();

    let comment = find_scoped(&state, post_id, id).await?;
    let author = state
        .users
        .find_by_id(comment.author_id)
        .await?
        .map(|u| u.username)
        .ok_or_else(|| AppError::Internal("comment author missing".to_string()))?;

    Ok(HttpResponse::Ok().json(comment_response(CommentView { comment, author })))
}

/// PUT /api/posts/{post_id}/comments/{id} - author only.
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<CommentRequest>,
) -> AppResult<HttpResponse> {
    let (post_id, id) = path.into_inner();
    let req = body.into_inner();
    validate(&req)?;

    let mut comment = find_scoped(&state, post_id, id).await?;

    policy::require_author(Some(identity.user_id), comment.author_id)?;

    comment.text = req.text;
    comment.updated_at = Utc::now();

    let saved = state.comments.update(comment).await?;

    Ok(HttpResponse::Ok().json(comment_response(CommentView {
        comment: saved,
        author: identity.username,
    })))
}

/// DELETE /api/posts/{post_id}/comments/{id} - author only.
pub async fn delete(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (post_id, id) = path.into_inner();

    let comment = find_scoped(&state, post_id, id).await?;

    policy::require_author(Some(identity.user_id), comment.author_id)?;

    state.comments.delete(id).await?;

    Ok(HttpResponse::NoContent().finish())
}
