//! HTTP-level tests over the in-memory state: registration, the token
//! lifecycle, and the ownership rules on posts and comments.

use std::sync::Arc;

use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::middleware::NormalizePath;
use actix_web::{App, test, web};
use serde_json::{Value, json};

use api_server::handlers;
use api_server::state::AppState;
use quill_core::ports::{PasswordService, TokenService};
use quill_infra::auth::{Argon2PasswordService, JwtConfig, JwtTokenService};

macro_rules! test_app {
    () => {{
        let (state, blacklist) = AppState::in_memory();
        let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(
            JwtConfig {
                secret: "test-secret".to_string(),
                access_minutes: 15,
                refresh_days: 1,
                issuer: "quill-test".to_string(),
            },
            blacklist,
        ));
        let passwords: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());

        test::init_service(
            App::new()
                .wrap(NormalizePath::trim())
                .app_data(web::Data::new(state))
                .app_data(web::Data::new(tokens))
                .app_data(web::Data::new(passwords))
                .configure(handlers::configure_routes),
        )
        .await
    }};
}

async fn get<S, B>(app: &S, path: &str, token: Option<&str>) -> ServiceResponse<B>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let mut req = test::TestRequest::get().uri(path);
    if let Some(token) = token {
        req = req.insert_header(("Authorization", format!("Bearer {token}")));
    }
    test::call_service(app, req.to_request()).await
}

async fn send_json<S, B>(
    app: &S,
    method: &str,
    path: &str,
    body: Value,
    token: Option<&str>,
) -> ServiceResponse<B>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let mut req = match method {
        "POST" => test::TestRequest::post(),
        "PUT" => test::TestRequest::put(),
        "DELETE" => test::TestRequest::delete(),
        other => panic!("unsupported method {other}"),
    }
    .uri(path)
    .set_json(body);

    if let Some(token) = token {
        req = req.insert_header(("Authorization", format!("Bearer {token}")));
    }
    test::call_service(app, req.to_request()).await
}

async fn register<S, B>(app: &S, username: &str)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let res = send_json(
        app,
        "POST",
        "/api/register/",
        json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "strongpass123",
        }),
        None,
    )
    .await;
    assert_eq!(res.status(), 201);
}

/// Register (if needed) and obtain a token pair. Returns (access, refresh).
async fn login<S, B>(app: &S, username: &str) -> (String, String)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let res = send_json(
        app,
        "POST",
        "/api/token/",
        json!({ "username": username, "password": "strongpass123" }),
        None,
    )
    .await;
    assert_eq!(res.status(), 200);

    let body: Value = test::read_body_json(res).await;
    (
        body["access"].as_str().unwrap().to_string(),
        body["refresh"].as_str().unwrap().to_string(),
    )
}

async fn create_post<S, B>(app: &S, token: &str, title: &str) -> String
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let res = send_json(
        app,
        "POST",
        "/api/posts/",
        json!({ "title": title, "content": "This is the content" }),
        Some(token),
    )
    .await;
    assert_eq!(res.status(), 201);

    let body: Value = test::read_body_json(res).await;
    body["id"].as_str().unwrap().to_string()
}

#[actix_rt::test]
async fn register_then_duplicate_username() {
    let app = test_app!();

    register(&app, "testuser").await;

    // Same username again is a validation failure, not a conflict.
    let res = send_json(
        &app,
        "POST",
        "/api/register/",
        json!({
            "username": "testuser",
            "email": "other@example.com",
            "password": "strongpass123",
        }),
        None,
    )
    .await;
    assert_eq!(res.status(), 400);
}

#[actix_rt::test]
async fn register_rejects_weak_input() {
    let app = test_app!();

    let res = send_json(
        &app,
        "POST",
        "/api/register/",
        json!({ "username": "u", "email": "not-an-email", "password": "strongpass123" }),
        None,
    )
    .await;
    assert_eq!(res.status(), 400);

    let res = send_json(
        &app,
        "POST",
        "/api/register/",
        json!({ "username": "u", "email": "u@example.com", "password": "short" }),
        None,
    )
    .await;
    assert_eq!(res.status(), 400);
}

#[actix_rt::test]
async fn token_issuance_and_me() {
    let app = test_app!();
    register(&app, "user1").await;

    let (access, refresh) = login(&app, "user1").await;
    assert!(!refresh.is_empty());

    let res = get(&app, "/api/me/", Some(&access)).await;
    assert_eq!(res.status(), 200);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["username"], "user1");
    assert_eq!(body["email"], "user1@example.com");
}

#[actix_rt::test]
async fn token_rejects_bad_credentials() {
    let app = test_app!();
    register(&app, "user1").await;

    let res = send_json(
        &app,
        "POST",
        "/api/token/",
        json!({ "username": "user1", "password": "wrong-password" }),
        None,
    )
    .await;
    assert_eq!(res.status(), 401);

    let res = send_json(
        &app,
        "POST",
        "/api/token/",
        json!({ "username": "nobody", "password": "strongpass123" }),
        None,
    )
    .await;
    assert_eq!(res.status(), 401);
}

#[actix_rt::test]
async fn me_requires_authentication() {
    let app = test_app!();

    let res = get(&app, "/api/me/", None).await;
    assert_eq!(res.status(), 401);
}

#[actix_rt::test]
async fn refresh_rotates_access_token() {
    let app = test_app!();
    register(&app, "user1").await;
    let (_, refresh) = login(&app, "user1").await;

    let res = send_json(&app, "POST", "/api/refresh/", json!({ "refresh": refresh }), None).await;
    assert_eq!(res.status(), 200);

    let body: Value = test::read_body_json(res).await;
    let new_access = body["access"].as_str().unwrap();

    // The rotated access token works.
    let res = get(&app, "/api/me/", Some(new_access)).await;
    assert_eq!(res.status(), 200);
}

#[actix_rt::test]
async fn logout_blacklists_refresh_token_permanently() {
    let app = test_app!();
    register(&app, "user1").await;
    let (_, refresh) = login(&app, "user1").await;

    let res = send_json(&app, "POST", "/api/logout/", json!({ "refresh": &refresh }), None).await;
    assert_eq!(res.status(), 200);

    // Refresh with the blacklisted token fails, permanently.
    for _ in 0..2 {
        let res =
            send_json(&app, "POST", "/api/refresh/", json!({ "refresh": &refresh }), None).await;
        assert_eq!(res.status(), 401);
    }

    // A second logout of the same token also fails.
    let res = send_json(&app, "POST", "/api/logout/", json!({ "refresh": refresh }), None).await;
    assert_eq!(res.status(), 401);
}

#[actix_rt::test]
async fn logout_rejects_garbage_token() {
    let app = test_app!();

    let res = send_json(
        &app,
        "POST",
        "/api/logout/",
        json!({ "refresh": "not-a-token" }),
        None,
    )
    .await;
    assert_eq!(res.status(), 401);
}

#[actix_rt::test]
async fn post_crud_as_author() {
    let app = test_app!();
    register(&app, "user1").await;
    let (access, _) = login(&app, "user1").await;

    let post_id = create_post(&app, &access, "First Post").await;

    // Public list and retrieve.
    let res = get(&app, "/api/posts/", None).await;
    assert_eq!(res.status(), 200);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["author"], "user1");

    let res = get(&app, &format!("/api/posts/{post_id}/"), None).await;
    assert_eq!(res.status(), 200);

    // Author updates.
    let res = send_json(
        &app,
        "PUT",
        &format!("/api/posts/{post_id}/"),
        json!({ "title": "Updated", "content": "New content" }),
        Some(&access),
    )
    .await;
    assert_eq!(res.status(), 200);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["title"], "Updated");

    // Author deletes.
    let res = send_json(
        &app,
        "DELETE",
        &format!("/api/posts/{post_id}/"),
        json!({}),
        Some(&access),
    )
    .await;
    assert_eq!(res.status(), 204);

    let res = get(&app, &format!("/api/posts/{post_id}/"), None).await;
    assert_eq!(res.status(), 404);
}

#[actix_rt::test]
async fn post_mutation_by_non_author_is_forbidden() {
    let app = test_app!();
    register(&app, "user1").await;
    register(&app, "user2").await;
    let (author, _) = login(&app, "user1").await;
    let (intruder, _) = login(&app, "user2").await;

    let post_id = create_post(&app, &author, "First Post").await;

    let res = send_json(
        &app,
        "PUT",
        &format!("/api/posts/{post_id}/"),
        json!({ "title": "Hack", "content": "Should not work" }),
        Some(&intruder),
    )
    .await;
    assert_eq!(res.status(), 403);

    let res = send_json(
        &app,
        "DELETE",
        &format!("/api/posts/{post_id}/"),
        json!({}),
        Some(&intruder),
    )
    .await;
    assert_eq!(res.status(), 403);
}

#[actix_rt::test]
async fn post_mutation_unauthenticated_is_401_before_ownership() {
    let app = test_app!();
    register(&app, "user1").await;
    let (author, _) = login(&app, "user1").await;
    let post_id = create_post(&app, &author, "First Post").await;

    // No credentials at all: 401, not 403, even though the caller could
    // never own the post either.
    let res = send_json(
        &app,
        "PUT",
        &format!("/api/posts/{post_id}/"),
        json!({ "title": "x", "content": "y" }),
        None,
    )
    .await;
    assert_eq!(res.status(), 401);

    let res = send_json(&app, "DELETE", &format!("/api/posts/{post_id}/"), json!({}), None).await;
    assert_eq!(res.status(), 401);

    let res = send_json(
        &app,
        "POST",
        "/api/posts/",
        json!({ "title": "t", "content": "c" }),
        None,
    )
    .await;
    assert_eq!(res.status(), 401);
}

#[actix_rt::test]
async fn toggle_like_is_an_involution() {
    let app = test_app!();
    register(&app, "user1").await;
    let (access, _) = login(&app, "user1").await;
    let post_id = create_post(&app, &access, "First Post").await;

    let res = send_json(
        &app,
        "POST",
        &format!("/api/posts/{post_id}/toggle_like/"),
        json!({}),
        Some(&access),
    )
    .await;
    assert_eq!(res.status(), 200);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["likes_count"], 1);

    // The liker set now contains exactly the one user.
    let res = get(&app, &format!("/api/posts/{post_id}/likes/"), None).await;
    assert_eq!(res.status(), 200);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["username"], "user1");

    // Unlike returns to the original count.
    let res = send_json(
        &app,
        "POST",
        &format!("/api/posts/{post_id}/toggle_like/"),
        json!({}),
        Some(&access),
    )
    .await;
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["likes_count"], 0);
}

#[actix_rt::test]
async fn toggle_like_requires_authentication() {
    let app = test_app!();
    register(&app, "user1").await;
    let (access, _) = login(&app, "user1").await;
    let post_id = create_post(&app, &access, "First Post").await;

    let res = send_json(
        &app,
        "POST",
        &format!("/api/posts/{post_id}/toggle_like/"),
        json!({}),
        None,
    )
    .await;
    assert_eq!(res.status(), 401);
}

#[actix_rt::test]
async fn my_posts_lists_only_own_posts() {
    let app = test_app!();
    register(&app, "user1").await;
    register(&app, "user2").await;
    let (user1, _) = login(&app, "user1").await;
    let (user2, _) = login(&app, "user2").await;

    create_post(&app, &user1, "Mine").await;
    create_post(&app, &user2, "Not mine").await;

    let res = get(&app, "/api/posts/my_posts/", Some(&user1)).await;
    assert_eq!(res.status(), 200);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["author"], "user1");

    let res = get(&app, "/api/posts/my_posts/", None).await;
    assert_eq!(res.status(), 401);
}

#[actix_rt::test]
async fn comments_are_scoped_to_their_post() {
    let app = test_app!();
    register(&app, "user1").await;
    register(&app, "user2").await;
    let (user1, _) = login(&app, "user1").await;
    let (user2, _) = login(&app, "user2").await;

    let post_id = create_post(&app, &user1, "First Post").await;
    let other_post = create_post(&app, &user2, "Second Post").await;

    // Anyone authenticated may comment on any post.
    let res = send_json(
        &app,
        "POST",
        &format!("/api/posts/{post_id}/comments/"),
        json!({ "text": "Great post!" }),
        Some(&user2),
    )
    .await;
    assert_eq!(res.status(), 201);
    let body: Value = test::read_body_json(res).await;
    let comment_id = body["id"].as_str().unwrap().to_string();
    assert_eq!(body["post_id"].as_str().unwrap(), post_id);

    let res = send_json(
        &app,
        "POST",
        &format!("/api/posts/{post_id}/comments/"),
        json!({ "text": "Me again" }),
        Some(&user2),
    )
    .await;
    assert_eq!(res.status(), 201);

    // Listed under the parent post in creation order, without auth.
    let res = get(&app, &format!("/api/posts/{post_id}/comments/"), None).await;
    assert_eq!(res.status(), 200);
    let body: Value = test::read_body_json(res).await;
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["text"], "Great post!");
    assert_eq!(listed[1]["text"], "Me again");

    // The other post has no comments.
    let res = get(&app, &format!("/api/posts/{other_post}/comments/"), None).await;
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body.as_array().unwrap().len(), 0);

    // Addressing the comment through the wrong post is a 404.
    let res = get(
        &app,
        &format!("/api/posts/{other_post}/comments/{comment_id}/"),
        None,
    )
    .await;
    assert_eq!(res.status(), 404);
}

#[actix_rt::test]
async fn comment_ownership_matrix() {
    let app = test_app!();
    register(&app, "user1").await;
    register(&app, "user2").await;
    let (user1, _) = login(&app, "user1").await;
    let (user2, _) = login(&app, "user2").await;

    let post_id = create_post(&app, &user1, "First Post").await;

    let res = send_json(
        &app,
        "POST",
        &format!("/api/posts/{post_id}/comments/"),
        json!({ "text": "Original" }),
        Some(&user1),
    )
    .await;
    let body: Value = test::read_body_json(res).await;
    let comment_id = body["id"].as_str().unwrap().to_string();
    let comment_path = format!("/api/posts/{post_id}/comments/{comment_id}/");

    // Author may update.
    let res = send_json(
        &app,
        "PUT",
        &comment_path,
        json!({ "text": "Updated text" }),
        Some(&user1),
    )
    .await;
    assert_eq!(res.status(), 200);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["text"], "Updated text");

    // Non-author gets 403, anonymous gets 401.
    let res = send_json(
        &app,
        "PUT",
        &comment_path,
        json!({ "text": "Hacked" }),
        Some(&user2),
    )
    .await;
    assert_eq!(res.status(), 403);

    let res = send_json(&app, "PUT", &comment_path, json!({ "text": "x" }), None).await;
    assert_eq!(res.status(), 401);

    let res = send_json(&app, "DELETE", &comment_path, json!({}), None).await;
    assert_eq!(res.status(), 401);

    let res = send_json(&app, "DELETE", &comment_path, json!({}), Some(&user2)).await;
    assert_eq!(res.status(), 403);

    let res = send_json(&app, "DELETE", &comment_path, json!({}), Some(&user1)).await;
    assert_eq!(res.status(), 204);
}

#[actix_rt::test]
async fn comment_requires_existing_post() {
    let app = test_app!();
    register(&app, "user1").await;
    let (access, _) = login(&app, "user1").await;

    let missing = uuid::Uuid::new_v4();
    let res = send_json(
        &app,
        "POST",
        &format!("/api/posts/{missing}/comments/"),
        json!({ "text": "into the void" }),
        Some(&access),
    )
    .await;
    assert_eq!(res.status(), 404);
}

#[actix_rt::test]
async fn health_check_is_public() {
    let app = test_app!();

    let res = get(&app, "/api/health/", None).await;
    assert_eq!(res.status(), 200);
}
