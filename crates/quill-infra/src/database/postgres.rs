//! PostgreSQL repository implementations.
//!
//! One explicit repository per resource; no generic CRUD dispatch. Each
//! method maps SeaORM errors into `RepoError` so the domain layer never sees
//! database types.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbConn, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use quill_core::domain::{Comment, CommentView, Post, PostView, User};
use quill_core::error::RepoError;
use quill_core::ports::{CommentRepository, PostRepository, TokenBlacklist, UserRepository};

use super::entity::comment::{self, Entity as CommentEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::entity::post_like::{self, Entity as PostLikeEntity};
use super::entity::revoked_token::{self, Entity as RevokedTokenEntity};
use super::entity::user::{self, Entity as UserEntity};

fn map_db_err(e: DbErr) -> RepoError {
    let err_str = e.to_string();
    if err_str.contains("duplicate") || err_str.contains("unique") {
        RepoError::Constraint("Entity already exists".to_string())
    } else {
        RepoError::Query(err_str)
    }
}

fn map_update_err(e: DbErr) -> RepoError {
    match e {
        DbErr::RecordNotUpdated => RepoError::NotFound,
        other => map_db_err(other),
    }
}

/// Fetch the usernames for a set of user ids in one query.
async fn usernames_for(db: &DbConn, ids: Vec<Uuid>) -> Result<HashMap<Uuid, String>, RepoError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let users = UserEntity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await
        .map_err(map_db_err)?;

    Ok(users.into_iter().map(|u| (u.id, u.username)).collect())
}

/// PostgreSQL user repository.
pub struct PostgresUserRepository {
    db: DbConn,
}

impl PostgresUserRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: User) -> Result<User, RepoError> {
        let model = user::ActiveModel::from(user)
            .insert(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(model.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let result = UserEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(%username, "Finding user by username");

        let result = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }
}

/// PostgreSQL post repository, including the liker set.
pub struct PostgresPostRepository {
    db: DbConn,
}

impl PostgresPostRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }

    /// Join author usernames and like counts onto a page of posts.
    async fn assemble_views(&self, posts: Vec<post::Model>) -> Result<Vec<PostView>, RepoError> {
        let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let author_ids: Vec<Uuid> = posts.iter().map(|p| p.author_id).collect();

        let usernames = usernames_for(&self.db, author_ids).await?;

        let mut like_counts: HashMap<Uuid, u64> = HashMap::new();
        if !post_ids.is_empty() {
            let likes = PostLikeEntity::find()
                .filter(post_like::Column::PostId.is_in(post_ids))
                .all(&self.db)
                .await
                .map_err(map_db_err)?;
            for like in likes {
                *like_counts.entry(like.post_id).or_insert(0) += 1;
            }
        }

        let mut views = Vec::with_capacity(posts.len());
        for model in posts {
            let author = usernames
                .get(&model.author_id)
                .cloned()
                .ok_or_else(|| RepoError::Query("post author missing".to_string()))?;
            let likes_count = like_counts.get(&model.id).copied().unwrap_or(0);
            views.push(PostView {
                post: model.into(),
                author,
                likes_count,
            });
        }

        Ok(views)
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn create(&self, post: Post) -> Result<Post, RepoError> {
        let model = post::ActiveModel::from(post)
            .insert(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(model.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let result = PostEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let model = post::ActiveModel::from(post)
            .update(&self.db)
            .await
            .map_err(map_update_err)?;

        Ok(model.into())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let result = PostEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }

    async fn list_recent(&self) -> Result<Vec<PostView>, RepoError> {
        let posts = PostEntity::find()
            .order_by_desc(post::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        self.assemble_views(posts).await
    }

    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<PostView>, RepoError> {
        let posts = PostEntity::find()
            .filter(post::Column::AuthorId.eq(author_id))
            .order_by_desc(post::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        self.assemble_views(posts).await
    }

    async fn view(&self, id: Uuid) -> Result<Option<PostView>, RepoError> {
        let Some(model) = PostEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(map_db_err)?
        else {
            return Ok(None);
        };

        Ok(self.assemble_views(vec![model]).await?.pop())
    }

    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<u64, RepoError> {
        let existing = PostLikeEntity::find_by_id((post_id, user_id))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        if existing.is_some() {
            PostLikeEntity::delete_by_id((post_id, user_id))
                .exec(&self.db)
                .await
                .map_err(map_db_err)?;
        } else {
            let like = post_like::ActiveModel {
                post_id: Set(post_id),
                user_id: Set(user_id),
                created_at: Set(Utc::now().into()),
            };
            like.insert(&self.db).await.map_err(map_db_err)?;
        }

        PostLikeEntity::find()
            .filter(post_like::Column::PostId.eq(post_id))
            .count(&self.db)
            .await
            .map_err(map_db_err)
    }

    async fn likers(&self, post_id: Uuid) -> Result<Vec<User>, RepoError> {
        let likes = PostLikeEntity::find()
            .filter(post_like::Column::PostId.eq(post_id))
            .order_by_asc(post_like::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        if likes.is_empty() {
            return Ok(Vec::new());
        }

        let user_ids: Vec<Uuid> = likes.iter().map(|l| l.user_id).collect();
        let users = UserEntity::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        // Preserve like order, not whatever the IN query returned.
        let by_id: HashMap<Uuid, user::Model> = users.into_iter().map(|u| (u.id, u)).collect();
        Ok(likes
            .iter()
            .filter_map(|l| by_id.get(&l.user_id).cloned())
            .map(Into::into)
            .collect())
    }
}

/// PostgreSQL comment repository.
pub struct PostgresCommentRepository {
    db: DbConn,
}

impl PostgresCommentRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn create(&self, comment: Comment) -> Result<Comment, RepoError> {
        let model = comment::ActiveModel::from(comment)
            .insert(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(model.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        let result = CommentEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn update(&self, comment: Comment) -> Result<Comment, RepoError> {
        let model = comment::ActiveModel::from(comment)
            .update(&self.db)
            .await
            .map_err(map_update_err)?;

        Ok(model.into())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let result = CommentEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentView>, RepoError> {
        let comments = CommentEntity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_asc(comment::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        let author_ids: Vec<Uuid> = comments.iter().map(|c| c.author_id).collect();
        let usernames = usernames_for(&self.db, author_ids).await?;

        let mut views = Vec::with_capacity(comments.len());
        for model in comments {
            let author = usernames
                .get(&model.author_id)
                .cloned()
                .ok_or_else(|| RepoError::Query("comment author missing".to_string()))?;
            views.push(CommentView {
                comment: model.into(),
                author,
            });
        }

        Ok(views)
    }
}

/// PostgreSQL refresh-token blacklist.
pub struct PostgresTokenBlacklist {
    db: DbConn,
}

impl PostgresTokenBlacklist {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TokenBlacklist for PostgresTokenBlacklist {
    async fn revoke(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<bool, RepoError> {
        let row = revoked_token::ActiveModel {
            jti: Set(jti),
            expires_at: Set(expires_at.into()),
            revoked_at: Set(Utc::now().into()),
        };

        // A second revocation trips the primary key, which is exactly the
        // "already blacklisted" signal.
        match row.insert(&self.db).await {
            Ok(_) => Ok(true),
            Err(e) => match map_db_err(e) {
                RepoError::Constraint(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, RepoError> {
        let found = RevokedTokenEntity::find_by_id(jti)
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(found.is_some())
    }
}
