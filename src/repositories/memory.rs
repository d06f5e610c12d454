//! In-memory repositories for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{CommentRepository, FileRepository, PostRepository, Repositories, RoleRepository, UserRepository};
use crate::errors::{AppError, AppResult};
use crate::models::content::{Comment, CommentMutation, File, FileUpload, Post, PostMutation};
use crate::models::role::{ActionValue, Permission, PermissionValue, Role, RoleMutation};
use crate::models::user::User;

#[derive(Debug, Default)]
pub struct MemoryRepository {
    roles: Mutex<Vec<Role>>,
    permissions: Mutex<Vec<Permission>>,
    users: Mutex<Vec<(User, String)>>,
    posts: Mutex<Vec<Post>>,
    files: Mutex<Vec<File>>,
    comments: Mutex<Vec<Comment>>,
    fail_roles: AtomicBool,
    fail_permissions: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn repositories(self: &Arc<Self>) -> Repositories {
        Repositories {
            roles: self.clone(),
            users: self.clone(),
            posts: self.clone(),
            files: self.clone(),
            comments: self.clone(),
        }
    }

    pub fn add_role(&self, id: i64, name: &str, root: bool) {
        self.roles.lock().push(Role {
            id,
            name: name.to_string(),
            description: None,
            root,
        });
    }

    pub fn set_permission(&self, role_id: i64, action: &str, value: PermissionValue) {
        let mut permissions = self.permissions.lock();
        permissions.retain(|p| !(p.role_id == role_id && p.action == action));
        permissions.push(Permission {
            role_id,
            action: action.to_string(),
            value,
        });
    }

    pub fn add_user(&self, user: User, password_hash: &str) {
        self.users.lock().push((user, password_hash.to_string()));
    }

    pub fn add_post(&self, id: i64, user_id: i64) {
        self.posts.lock().push(Post {
            id,
            user_id,
            name: format!("post {id}"),
            content: String::new(),
        });
    }

    pub fn add_file(&self, id: i64, user_id: i64) {
        self.files.lock().push(File {
            id,
            user_id,
            path: format!("/uploads/{id}.png"),
            file_type: "image/png".to_string(),
        });
    }

    pub fn add_comment(&self, id: i64, user_id: i64) {
        self.comments.lock().push(Comment {
            id,
            post_id: 1,
            user_id,
            content: "hi".to_string(),
        });
    }

    pub fn fail_role_reads(&self, fail: bool) {
        self.fail_roles.store(fail, Ordering::SeqCst);
    }

    pub fn fail_permission_reads(&self, fail: bool) {
        self.fail_permissions.store(fail, Ordering::SeqCst);
    }

    fn storage_error() -> AppError {
        AppError::Database(sqlx::Error::PoolTimedOut)
    }
}

#[async_trait]
impl RoleRepository for MemoryRepository {
    async fn all_roles(&self) -> AppResult<Vec<Role>> {
        if self.fail_roles.load(Ordering::SeqCst) {
            return Err(Self::storage_error());
        }
        Ok(self.roles.lock().clone())
    }

    async fn all_permissions(&self) -> AppResult<Vec<Permission>> {
        if self.fail_permissions.load(Ordering::SeqCst) {
            return Err(Self::storage_error());
        }
        Ok(self.permissions.lock().clone())
    }

    async fn role_by_id(&self, id: i64) -> AppResult<Role> {
        self.roles
            .lock()
            .iter()
            .find(|role| role.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("role not found"))
    }

    async fn save_role(&self, id: Option<i64>, data: &RoleMutation) -> AppResult<Role> {
        let mut roles = self.roles.lock();
        let id = id.unwrap_or_else(|| roles.iter().map(|r| r.id).max().unwrap_or(0) + 1);
        let role = Role {
            id,
            name: data.name.clone(),
            description: data.description.clone(),
            root: data.root,
        };
        roles.retain(|r| r.id != id);
        roles.push(role.clone());
        Ok(role)
    }

    async fn set_permissions(&self, role_id: i64, permissions: &[ActionValue]) -> AppResult<()> {
        let mut stored = self.permissions.lock();
        stored.retain(|p| p.role_id != role_id);
        stored.extend(permissions.iter().map(|p| Permission {
            role_id,
            action: p.action.clone(),
            value: p.value,
        }));
        Ok(())
    }

    async fn seed_permissions(&self, role_id: i64, permissions: &[ActionValue]) -> AppResult<u64> {
        let mut stored = self.permissions.lock();
        let mut written = 0;
        for permission in permissions {
            if !stored.iter().any(|p| p.role_id == role_id && p.action == permission.action) {
                stored.push(Permission {
                    role_id,
                    action: permission.action.clone(),
                    value: permission.value,
                });
                written += 1;
            }
        }
        Ok(written)
    }

    async fn delete_role(&self, id: i64) -> AppResult<()> {
        self.roles.lock().retain(|r| r.id != id);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryRepository {
    async fn by_username(&self, username: &str) -> AppResult<User> {
        self.users
            .lock()
            .iter()
            .find(|(user, _)| user.username == username)
            .map(|(user, _)| user.clone())
            .ok_or_else(|| AppError::not_found("user not found"))
    }

    async fn credentials(&self, username: &str) -> AppResult<Option<(User, String)>> {
        Ok(self
            .users
            .lock()
            .iter()
            .find(|(user, _)| user.username == username)
            .cloned())
    }

    async fn create_local_user(&self, username: &str, password_hash: &str, role_ids: &[i64]) -> AppResult<User> {
        let mut users = self.users.lock();
        if users.iter().any(|(user, _)| user.username == username) {
            return Err(AppError::conflict("username already exists"));
        }

        let user = User {
            id: users.iter().map(|(user, _)| user.id).max().unwrap_or(0) + 1,
            username: username.to_string(),
            display_name: username.to_string(),
            provider: "local".to_string(),
            role_ids: role_ids.to_vec(),
            active: true,
            ..User::default()
        };
        users.push((user.clone(), password_hash.to_string()));
        Ok(user)
    }
}

#[async_trait]
impl PostRepository for MemoryRepository {
    async fn post_by_id(&self, id: i64) -> AppResult<Post> {
        self.posts
            .lock()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("post not found"))
    }

    async fn posts_by_user(&self, user_id: i64) -> AppResult<Vec<Post>> {
        Ok(self.posts.lock().iter().filter(|p| p.user_id == user_id).cloned().collect())
    }

    async fn create_post(&self, user_id: i64, data: &PostMutation) -> AppResult<Post> {
        let mut posts = self.posts.lock();
        let post = Post {
            id: posts.iter().map(|p| p.id).max().unwrap_or(0) + 1,
            user_id,
            name: data.name.clone(),
            content: data.content.clone(),
        };
        posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, id: i64, data: &PostMutation) -> AppResult<Post> {
        let mut posts = self.posts.lock();
        let post = posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::not_found("post not found"))?;
        post.name = data.name.clone();
        post.content = data.content.clone();
        Ok(post.clone())
    }

    async fn delete_post(&self, id: i64) -> AppResult<()> {
        self.posts.lock().retain(|p| p.id != id);
        Ok(())
    }
}

#[async_trait]
impl FileRepository for MemoryRepository {
    async fn file_by_id(&self, id: i64) -> AppResult<File> {
        self.files
            .lock()
            .iter()
            .find(|f| f.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("file not found"))
    }

    async fn files_by_user(&self, user_id: i64) -> AppResult<Vec<File>> {
        Ok(self.files.lock().iter().filter(|f| f.user_id == user_id).cloned().collect())
    }

    async fn create_file(&self, user_id: i64, data: &FileUpload) -> AppResult<File> {
        let mut files = self.files.lock();
        let file = File {
            id: files.iter().map(|f| f.id).max().unwrap_or(0) + 1,
            user_id,
            path: data.path.clone(),
            file_type: data.file_type.clone(),
        };
        files.push(file.clone());
        Ok(file)
    }

    async fn delete_file(&self, id: i64) -> AppResult<()> {
        self.files.lock().retain(|f| f.id != id);
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for MemoryRepository {
    async fn comment_by_id(&self, id: i64) -> AppResult<Comment> {
        self.comments
            .lock()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("comment not found"))
    }

    async fn comments_by_user(&self, user_id: i64) -> AppResult<Vec<Comment>> {
        Ok(self.comments.lock().iter().filter(|c| c.user_id == user_id).cloned().collect())
    }

    async fn create_comment(&self, user_id: i64, data: &CommentMutation) -> AppResult<Comment> {
        let mut comments = self.comments.lock();
        let comment = Comment {
            id: comments.iter().map(|c| c.id).max().unwrap_or(0) + 1,
            post_id: data.post_id,
            user_id,
            content: data.content.clone(),
        };
        comments.push(comment.clone());
        Ok(comment)
    }

    async fn update_comment(&self, id: i64, data: &CommentMutation) -> AppResult<Comment> {
        let mut comments = self.comments.lock();
        let comment = comments
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::not_found("comment not found"))?;
        comment.content = data.content.clone();
        Ok(comment.clone())
    }

    async fn delete_comment(&self, id: i64) -> AppResult<()> {
        self.comments.lock().retain(|c| c.id != id);
        Ok(())
    }
}
