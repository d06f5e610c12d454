use async_trait::async_trait;
use sqlx::SqlitePool;

use super::{CommentRepository, FileRepository, PostRepository, RoleRepository, UserRepository};
use crate::errors::{AppError, AppResult};
use crate::models::content::{Comment, CommentMutation, File, FileUpload, Post, PostMutation};
use crate::models::role::{ActionValue, DbPermission, Permission, Role, RoleMutation};
use crate::models::user::{DbUser, User};

const USER_COLUMNS: &str = "id, username, display_name, email, password_hash, provider, provider_id, provider_avatar, avatar_image_url, active";

#[derive(Debug, Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn role_ids(&self, user_id: i64) -> AppResult<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT role_id FROM user_roles WHERE user_id = ? ORDER BY role_id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn db_user_by_username(&self, username: &str) -> AppResult<Option<DbUser>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?");
        let user = sqlx::query_as::<_, DbUser>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

// =============================================================================
// ROLES & PERMISSIONS
// =============================================================================

#[async_trait]
impl RoleRepository for SqliteRepository {
    async fn all_roles(&self) -> AppResult<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>("SELECT id, name, description, root FROM roles ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(roles)
    }

    async fn all_permissions(&self) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, DbPermission>("SELECT role_id, action, value FROM permissions ORDER BY role_id, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Permission::from).collect())
    }

    async fn role_by_id(&self, id: i64) -> AppResult<Role> {
        sqlx::query_as::<_, Role>("SELECT id, name, description, root FROM roles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("role not found"))
    }

    async fn save_role(&self, id: Option<i64>, data: &RoleMutation) -> AppResult<Role> {
        let id = match id {
            Some(id) => {
                let result = sqlx::query("UPDATE roles SET name = ?, description = ?, root = ? WHERE id = ?")
                    .bind(&data.name)
                    .bind(&data.description)
                    .bind(data.root)
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
                if result.rows_affected() == 0 {
                    return Err(AppError::not_found("role not found"));
                }
                id
            }
            None => {
                let exists: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM roles WHERE name = ?")
                    .bind(&data.name)
                    .fetch_one(&self.pool)
                    .await?;
                if exists > 0 {
                    return Err(AppError::conflict("role name already exists"));
                }

                sqlx::query("INSERT INTO roles (name, description, root) VALUES (?, ?, ?)")
                    .bind(&data.name)
                    .bind(&data.description)
                    .bind(data.root)
                    .execute(&self.pool)
                    .await?
                    .last_insert_rowid()
            }
        };

        self.role_by_id(id).await
    }

    async fn set_permissions(&self, role_id: i64, permissions: &[ActionValue]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM permissions WHERE role_id = ?")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        for permission in permissions {
            sqlx::query("INSERT INTO permissions (role_id, action, value) VALUES (?, ?, ?)")
                .bind(role_id)
                .bind(&permission.action)
                .bind(permission.value.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn seed_permissions(&self, role_id: i64, permissions: &[ActionValue]) -> AppResult<u64> {
        let mut written = 0;
        for permission in permissions {
            written += sqlx::query("INSERT OR IGNORE INTO permissions (role_id, action, value) VALUES (?, ?, ?)")
                .bind(role_id)
                .bind(&permission.action)
                .bind(permission.value.as_str())
                .execute(&self.pool)
                .await?
                .rows_affected();
        }
        Ok(written)
    }

    async fn delete_role(&self, id: i64) -> AppResult<()> {
        let in_use: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM user_roles WHERE role_id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        if in_use > 0 {
            return Err(AppError::conflict("role is assigned to users"));
        }

        let result = sqlx::query("DELETE FROM roles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("role not found"));
        }
        Ok(())
    }
}

// =============================================================================
// USERS
// =============================================================================

#[async_trait]
impl UserRepository for SqliteRepository {
    async fn by_username(&self, username: &str) -> AppResult<User> {
        let db_user = self
            .db_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found("user not found"))?;
        let role_ids = self.role_ids(db_user.id).await?;
        Ok(db_user.into_user(role_ids))
    }

    async fn credentials(&self, username: &str) -> AppResult<Option<(User, String)>> {
        let Some(db_user) = self.db_user_by_username(username).await? else {
            return Ok(None);
        };
        let role_ids = self.role_ids(db_user.id).await?;
        let password_hash = db_user.password_hash.clone();
        Ok(Some((db_user.into_user(role_ids), password_hash)))
    }

    async fn create_local_user(&self, username: &str, password_hash: &str, role_ids: &[i64]) -> AppResult<User> {
        if self.db_user_by_username(username).await?.is_some() {
            return Err(AppError::conflict("username already exists"));
        }

        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            "INSERT INTO users (username, display_name, password_hash, provider, active) VALUES (?, ?, ?, 'local', 1)",
        )
        .bind(username)
        .bind(username)
        .bind(password_hash)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for role_id in role_ids {
            sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES (?, ?)")
                .bind(id)
                .bind(role_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        self.by_username(username).await
    }
}

// =============================================================================
// CONTENT
// =============================================================================

#[async_trait]
impl PostRepository for SqliteRepository {
    async fn post_by_id(&self, id: i64) -> AppResult<Post> {
        sqlx::query_as::<_, Post>("SELECT id, user_id, name, content FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("post not found"))
    }

    async fn posts_by_user(&self, user_id: i64) -> AppResult<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>("SELECT id, user_id, name, content FROM posts WHERE user_id = ? ORDER BY id DESC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn create_post(&self, user_id: i64, data: &PostMutation) -> AppResult<Post> {
        let id = sqlx::query("INSERT INTO posts (user_id, name, content) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(&data.name)
            .bind(&data.content)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();
        self.post_by_id(id).await
    }

    async fn update_post(&self, id: i64, data: &PostMutation) -> AppResult<Post> {
        sqlx::query("UPDATE posts SET name = ?, content = ? WHERE id = ?")
            .bind(&data.name)
            .bind(&data.content)
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.post_by_id(id).await
    }

    async fn delete_post(&self, id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl FileRepository for SqliteRepository {
    async fn file_by_id(&self, id: i64) -> AppResult<File> {
        sqlx::query_as::<_, File>("SELECT id, user_id, path, type FROM files WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("file not found"))
    }

    async fn files_by_user(&self, user_id: i64) -> AppResult<Vec<File>> {
        let files = sqlx::query_as::<_, File>("SELECT id, user_id, path, type FROM files WHERE user_id = ? ORDER BY id DESC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(files)
    }

    async fn create_file(&self, user_id: i64, data: &FileUpload) -> AppResult<File> {
        let id = sqlx::query("INSERT INTO files (user_id, path, type) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(&data.path)
            .bind(&data.file_type)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();
        self.file_by_id(id).await
    }

    async fn delete_file(&self, id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for SqliteRepository {
    async fn comment_by_id(&self, id: i64) -> AppResult<Comment> {
        sqlx::query_as::<_, Comment>("SELECT id, post_id, user_id, content FROM comments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("comment not found"))
    }

    async fn comments_by_user(&self, user_id: i64) -> AppResult<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>("SELECT id, post_id, user_id, content FROM comments WHERE user_id = ? ORDER BY id DESC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(comments)
    }

    async fn create_comment(&self, user_id: i64, data: &CommentMutation) -> AppResult<Comment> {
        let id = sqlx::query("INSERT INTO comments (post_id, user_id, content) VALUES (?, ?, ?)")
            .bind(data.post_id)
            .bind(user_id)
            .bind(&data.content)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();
        self.comment_by_id(id).await
    }

    async fn update_comment(&self, id: i64, data: &CommentMutation) -> AppResult<Comment> {
        sqlx::query("UPDATE comments SET content = ? WHERE id = ?")
            .bind(&data.content)
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.comment_by_id(id).await
    }

    async fn delete_comment(&self, id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
