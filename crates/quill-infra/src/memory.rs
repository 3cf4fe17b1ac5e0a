//! In-memory store - used when no database is configured, and by the HTTP
//! integration tests.
//!
//! One store implements every repository port plus the token blacklist so
//! post views can resolve author usernames without a second component.
//! Note: Data is lost on process restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use quill_core::domain::{Comment, CommentView, Post, PostView, User};
use quill_core::error::RepoError;
use quill_core::ports::{CommentRepository, PostRepository, TokenBlacklist, UserRepository};

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    // Insertion order doubles as creation order for posts and comments.
    posts: Vec<Post>,
    comments: Vec<Comment>,
    // (post_id, user_id) pairs in like order; set semantics enforced on insert.
    likes: Vec<(Uuid, Uuid)>,
    revoked: HashMap<Uuid, DateTime<Utc>>,
}

impl Inner {
    fn username(&self, user_id: Uuid) -> Result<String, RepoError> {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.username.clone())
            .ok_or_else(|| RepoError::Query("author missing".to_string()))
    }

    fn likes_count(&self, post_id: Uuid) -> u64 {
        self.likes.iter().filter(|(p, _)| *p == post_id).count() as u64
    }

    fn post_view(&self, post: &Post) -> Result<PostView, RepoError> {
        Ok(PostView {
            post: post.clone(),
            author: self.username(post.author_id)?,
            likes_count: self.likes_count(post.id),
        })
    }
}

/// In-memory implementation of every persistence port.
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, user: User) -> Result<User, RepoError> {
        let mut inner = self.inner.write().await;

        if inner.users.iter().any(|u| u.username == user.username) {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }

        inner.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.username == username).cloned())
    }
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn create(&self, post: Post) -> Result<Post, RepoError> {
        let mut inner = self.inner.write().await;
        inner.posts.push(post.clone());
        Ok(post)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let inner = self.inner.read().await;
        Ok(inner.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let mut inner = self.inner.write().await;

        let slot = inner
            .posts
            .iter_mut()
            .find(|p| p.id == post.id)
            .ok_or(RepoError::NotFound)?;
        *slot = post.clone();

        Ok(post)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut inner = self.inner.write().await;

        let before = inner.posts.len();
        inner.posts.retain(|p| p.id != id);
        if inner.posts.len() == before {
            return Err(RepoError::NotFound);
        }

        inner.comments.retain(|c| c.post_id != id);
        inner.likes.retain(|(p, _)| *p != id);
        Ok(())
    }

    async fn list_recent(&self) -> Result<Vec<PostView>, RepoError> {
        let inner = self.inner.read().await;
        inner
            .posts
            .iter()
            .rev()
            .map(|p| inner.post_view(p))
            .collect()
    }

    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<PostView>, RepoError> {
        let inner = self.inner.read().await;
        inner
            .posts
            .iter()
            .rev()
            .filter(|p| p.author_id == author_id)
            .map(|p| inner.post_view(p))
            .collect()
    }

    async fn view(&self, id: Uuid) -> Result<Option<PostView>, RepoError> {
        let inner = self.inner.read().await;
        inner
            .posts
            .iter()
            .find(|p| p.id == id)
            .map(|p| inner.post_view(p))
            .transpose()
    }

    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<u64, RepoError> {
        let mut inner = self.inner.write().await;

        let key = (post_id, user_id);
        if inner.likes.contains(&key) {
            inner.likes.retain(|k| *k != key);
        } else {
            inner.likes.push(key);
        }

        Ok(inner.likes_count(post_id))
    }

    async fn likers(&self, post_id: Uuid) -> Result<Vec<User>, RepoError> {
        let inner = self.inner.read().await;

        Ok(inner
            .likes
            .iter()
            .filter(|(p, _)| *p == post_id)
            .filter_map(|(_, user_id)| inner.users.iter().find(|u| u.id == *user_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CommentRepository for InMemoryStore {
    async fn create(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut inner = self.inner.write().await;
        inner.comments.push(comment.clone());
        Ok(comment)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        let inner = self.inner.read().await;
        Ok(inner.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn update(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut inner = self.inner.write().await;

        let slot = inner
            .comments
            .iter_mut()
            .find(|c| c.id == comment.id)
            .ok_or(RepoError::NotFound)?;
        *slot = comment.clone();

        Ok(comment)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut inner = self.inner.write().await;

        let before = inner.comments.len();
        inner.comments.retain(|c| c.id != id);
        if inner.comments.len() == before {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentView>, RepoError> {
        let inner = self.inner.read().await;

        inner
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .map(|c| {
                Ok(CommentView {
                    comment: c.clone(),
                    author: inner.username(c.author_id)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl TokenBlacklist for InMemoryStore {
    async fn revoke(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<bool, RepoError> {
        let mut inner = self.inner.write().await;

        if inner.revoked.contains_key(&jti) {
            return Ok(false);
        }

        inner.revoked.insert(jti, expires_at);
        Ok(true)
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, RepoError> {
        let inner = self.inner.read().await;
        Ok(inner.revoked.contains_key(&jti))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> User {
        User::new(name.to_string(), format!("{name}@example.com"), "x".into())
    }

    #[tokio::test]
    async fn duplicate_username_is_a_constraint_violation() {
        let store = InMemoryStore::new();

        UserRepository::create(&store, user("alice")).await.unwrap();
        let result = UserRepository::create(&store, user("alice")).await;

        assert!(matches!(result, Err(RepoError::Constraint(_))));
    }

    #[tokio::test]
    async fn toggle_like_flips_set_membership() {
        let store = InMemoryStore::new();
        let author = UserRepository::create(&store, user("alice")).await.unwrap();
        let post = PostRepository::create(&store, Post::new(author.id, "t".into(), "c".into()))
            .await
            .unwrap();

        assert_eq!(store.toggle_like(post.id, author.id).await.unwrap(), 1);
        assert_eq!(store.toggle_like(post.id, author.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn comments_are_listed_in_creation_order() {
        let store = InMemoryStore::new();
        let author = UserRepository::create(&store, user("alice")).await.unwrap();
        let post = PostRepository::create(&store, Post::new(author.id, "t".into(), "c".into()))
            .await
            .unwrap();

        for text in ["first", "second", "third"] {
            CommentRepository::create(&store, Comment::new(post.id, author.id, text.into()))
                .await
                .unwrap();
        }

        let listed = store.list_for_post(post.id).await.unwrap();
        let texts: Vec<&str> = listed.iter().map(|v| v.comment.text.as_str()).collect();
        assert_eq!(texts, ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn revoke_is_terminal_and_reports_repeats() {
        let store = InMemoryStore::new();
        let jti = Uuid::new_v4();

        assert!(store.revoke(jti, Utc::now()).await.unwrap());
        assert!(store.is_revoked(jti).await.unwrap());
        assert!(!store.revoke(jti, Utc::now()).await.unwrap());
        assert!(store.is_revoked(jti).await.unwrap());
    }
}
