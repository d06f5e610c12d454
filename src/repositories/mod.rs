//! Storage seam for the authorization core.
//!
//! The permission cache, the resource preparers and the login flow only see
//! these traits. `SqliteRepository` backs all of them in the running server;
//! tests substitute in-memory fakes.

#[cfg(test)]
pub(crate) mod memory;
mod sqlite;

pub use sqlite::SqliteRepository;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::errors::AppResult;
use crate::models::content::{Comment, CommentMutation, File, FileUpload, Post, PostMutation};
use crate::models::role::{ActionValue, Permission, Role, RoleMutation};
use crate::models::user::User;

#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Every role, in a stable order.
    async fn all_roles(&self) -> AppResult<Vec<Role>>;
    /// Every stored permission row across all roles.
    async fn all_permissions(&self) -> AppResult<Vec<Permission>>;
    async fn role_by_id(&self, id: i64) -> AppResult<Role>;
    /// Creates the role when `id` is `None`, otherwise updates it.
    async fn save_role(&self, id: Option<i64>, data: &RoleMutation) -> AppResult<Role>;
    /// Replaces the whole permission set of a role.
    async fn set_permissions(&self, role_id: i64, permissions: &[ActionValue]) -> AppResult<()>;
    /// Inserts only the actions the role has no row for; returns how many were written.
    async fn seed_permissions(&self, role_id: i64, permissions: &[ActionValue]) -> AppResult<u64>;
    async fn delete_role(&self, id: i64) -> AppResult<()>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn by_username(&self, username: &str) -> AppResult<User>;
    /// The user and its stored password hash, if the username exists.
    async fn credentials(&self, username: &str) -> AppResult<Option<(User, String)>>;
    /// Creates an active local account holding `role_ids`. Fails with a
    /// conflict if the username is taken.
    async fn create_local_user(&self, username: &str, password_hash: &str, role_ids: &[i64]) -> AppResult<User>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn post_by_id(&self, id: i64) -> AppResult<Post>;
    async fn posts_by_user(&self, user_id: i64) -> AppResult<Vec<Post>>;
    async fn create_post(&self, user_id: i64, data: &PostMutation) -> AppResult<Post>;
    async fn update_post(&self, id: i64, data: &PostMutation) -> AppResult<Post>;
    async fn delete_post(&self, id: i64) -> AppResult<()>;
}

#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn file_by_id(&self, id: i64) -> AppResult<File>;
    async fn files_by_user(&self, user_id: i64) -> AppResult<Vec<File>>;
    async fn create_file(&self, user_id: i64, data: &FileUpload) -> AppResult<File>;
    async fn delete_file(&self, id: i64) -> AppResult<()>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn comment_by_id(&self, id: i64) -> AppResult<Comment>;
    async fn comments_by_user(&self, user_id: i64) -> AppResult<Vec<Comment>>;
    async fn create_comment(&self, user_id: i64, data: &CommentMutation) -> AppResult<Comment>;
    async fn update_comment(&self, id: i64, data: &CommentMutation) -> AppResult<Comment>;
    async fn delete_comment(&self, id: i64) -> AppResult<()>;
}

/// The set of repositories handed to the authorization core and handlers.
#[derive(Clone)]
pub struct Repositories {
    pub roles: Arc<dyn RoleRepository>,
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub files: Arc<dyn FileRepository>,
    pub comments: Arc<dyn CommentRepository>,
}

impl Repositories {
    pub fn sqlite(pool: SqlitePool) -> Self {
        let repo = Arc::new(SqliteRepository::new(pool));
        Self {
            roles: repo.clone(),
            users: repo.clone(),
            posts: repo.clone(),
            files: repo.clone(),
            comments: repo,
        }
    }
}
