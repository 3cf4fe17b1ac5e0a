//! Registration and session lifecycle handlers.

use actix_web::{HttpResponse, web};
use std::sync::Arc;

use quill_core::domain::User;
use quill_core::error::RepoError;
use quill_core::ports::{PasswordService, TokenService};
use quill_shared::dto::{
    AccessTokenResponse, LogoutRequest, RefreshRequest, RegisterRequest, TokenPairResponse,
    TokenRequest, UserResponse,
};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn user_response(user: User) -> UserResponse {
    UserResponse {
        id: user.id,
        username: user.username,
        email: user.email,
    }
}

/// POST /api/register
pub async fn register(
    state: web::Data<AppState>,
    password_service: web::Data<Arc<dyn PasswordService>>,
    body: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    // Validate input
    if req.username.trim().is_empty() {
        return Err(AppError::Validation("Username must not be empty".to_string()));
    }
    if req.email.is_empty() || !req.email.contains('@') {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }
    if req.password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    // Hash password
    let password_hash = password_service.hash(&req.password)?;

    // Create user; the unique username constraint turns a duplicate into a 400.
    let user = User::new(req.username, req.email, password_hash);
    let saved = state.users.create(user).await.map_err(|e| match e {
        RepoError::Constraint(_) => AppError::Validation("Username already taken".to_string()),
        other => other.into(),
    })?;

    tracing::info!(username = %saved.username, "user registered");

    Ok(HttpResponse::Created().json(user_response(saved)))
}

/// POST /api/token
pub async fn token(
    state: web::Data<AppState>,
    token_service: web::Data<Arc<dyn TokenService>>,
    password_service: web::Data<Arc<dyn PasswordService>>,
    body: web::Json<TokenRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    // Find user by username
    let user = state
        .users
        .find_by_username(&req.username)
        .await?
        .ok_or(AppError::Unauthorized)?;

    // Verify password
    let valid = password_service.verify(&req.password, &user.password_hash)?;

    if !valid {
        return Err(AppError::Unauthorized);
    }

    // Issue the access/refresh pair
    let pair = token_service.issue_pair(user.id, &user.username)?;

    Ok(HttpResponse::Ok().json(TokenPairResponse {
        access: pair.access,
        refresh: pair.refresh,
    }))
}

/// POST /api/refresh
pub async fn refresh(
    token_service: web::Data<Arc<dyn TokenService>>,
    body: web::Json<RefreshRequest>,
) -> AppResult<HttpResponse> {
    let access = token_service.refresh(&body.refresh).await?;

    Ok(HttpResponse::Ok().json(AccessTokenResponse { access }))
}

/// POST /api/logout - blacklist the refresh token permanently.
pub async fn logout(
    token_service: web::Data<Arc<dyn TokenService>>,
    body: web::Json<LogoutRequest>,
) -> AppResult<HttpResponse> {
    token_service.revoke(&body.refresh).await?;

    Ok(HttpResponse::Ok().finish())
}

/// GET /api/me - the acting identity's own profile.
pub async fn me(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    // The token outliving its user is the only way this lookup can miss.
    let user = state
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(HttpResponse::Ok().json(user_response(user)))
}
