use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Comment, CommentView, Post, PostView, User};
use crate::error::RepoError;

/// User repository - the credential store.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new user. Duplicate usernames surface as
    /// [`RepoError::Constraint`].
    async fn create(&self, user: User) -> Result<User, RepoError>;

    /// Find a user by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError>;

    /// Find a user by their unique username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;
}

/// Post repository, including the liker set.
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: Post) -> Result<Post, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError>;

    async fn update(&self, post: Post) -> Result<Post, RepoError>;

    async fn delete(&self, id: Uuid) -> Result<(), RepoError>;

    /// All posts, newest first, with author usernames and like counts.
    async fn list_recent(&self) -> Result<Vec<PostView>, RepoError>;

    /// Posts authored by the given user, newest first.
    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<PostView>, RepoError>;

    /// A single post with its display fields.
    async fn view(&self, id: Uuid) -> Result<Option<PostView>, RepoError>;

    /// Flip the user's membership in the post's liker set and return the
    /// resulting cardinality of that set.
    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<u64, RepoError>;

    /// Users currently in the post's liker set.
    async fn likers(&self, post_id: Uuid) -> Result<Vec<User>, RepoError>;
}

/// Comment repository. Comments are always addressed through their post.
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, comment: Comment) -> Result<Comment, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError>;

    async fn update(&self, comment: Comment) -> Result<Comment, RepoError>;

    async fn delete(&self, id: Uuid) -> Result<(), RepoError>;

    /// Comments under a post, in creation order, with author usernames.
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentView>, RepoError>;
}

/// Permanent revocation record for refresh tokens.
///
/// Rows are keyed by the token's `jti` claim; nothing ever transitions a
/// token back out of the revoked state.
#[async_trait]
pub trait TokenBlacklist: Send + Sync {
    /// Record a revocation. Returns `false` when the jti was already
    /// revoked, so callers can distinguish a repeat logout.
    async fn revoke(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<bool, RepoError>;

    /// Whether the jti has been revoked.
    async fn is_revoked(&self, jti: Uuid) -> Result<bool, RepoError>;
}
