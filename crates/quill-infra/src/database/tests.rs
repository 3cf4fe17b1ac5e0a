#[cfg(test)]
mod tests {
    use crate::database::entity::{post, revoked_token, user};
    use crate::database::postgres::{
        PostgresPostRepository, PostgresTokenBlacklist, PostgresUserRepository,
    };
    use quill_core::ports::{PostRepository, TokenBlacklist, UserRepository};
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_find_post_by_id() {
        let post_id = uuid::Uuid::new_v4();
        let author_id = uuid::Uuid::new_v4();
        let now = chrono::Utc::now();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![post::Model {
                id: post_id,
                author_id,
                title: "Test Post".to_owned(),
                content: "Content".to_owned(),
                created_at: now.into(),
                updated_at: now.into(),
            }]])
            .into_connection();

        let repo = PostgresPostRepository::new(db);

        let result = repo.find_by_id(post_id).await.unwrap();

        assert!(result.is_some());
        let found = result.unwrap();
        assert_eq!(found.title, "Test Post");
        assert_eq!(found.id, post_id);
        assert_eq!(found.author_id, author_id);
    }

    #[tokio::test]
    async fn test_find_user_by_username() {
        let user_id = uuid::Uuid::new_v4();
        let now = chrono::Utc::now();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![user::Model {
                id: user_id,
                username: "alice".to_owned(),
                email: "alice@example.com".to_owned(),
                password_hash: "hash".to_owned(),
                created_at: now.into(),
            }]])
            .into_connection();

        let repo = PostgresUserRepository::new(db);

        let result = repo.find_by_username("alice").await.unwrap();

        assert!(result.is_some());
        assert_eq!(result.unwrap().id, user_id);
    }

    #[tokio::test]
    async fn test_revoked_jti_is_reported() {
        let jti = uuid::Uuid::new_v4();
        let now = chrono::Utc::now();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![revoked_token::Model {
                jti,
                expires_at: now.into(),
                revoked_at: now.into(),
            }]])
            .append_query_results(vec![Vec::<revoked_token::Model>::new()])
            .into_connection();

        let blacklist = PostgresTokenBlacklist::new(db);

        assert!(blacklist.is_revoked(jti).await.unwrap());
        assert!(!blacklist.is_revoked(uuid::Uuid::new_v4()).await.unwrap());
    }
}
