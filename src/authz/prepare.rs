use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::{AppError, AppResult};
use crate::models::content::{Comment, File, Post};
use crate::models::user::User;
use crate::repositories::Repositories;

/// What the `:id` path parameter of the current route points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceTarget {
    /// The route has no `:id` parameter.
    None,
    /// `:id` is `new`: a compose/create flow for a resource that does not exist yet.
    New,
    Id(i64),
    /// `:id` is present but not a usable id; loads as not found.
    Invalid(String),
}

impl ResourceTarget {
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            None => ResourceTarget::None,
            Some("new") => ResourceTarget::New,
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) if id > 0 => ResourceTarget::Id(id),
                _ => ResourceTarget::Invalid(raw.to_string()),
            },
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, ResourceTarget::New)
    }
}

/// A resource loaded by a Prepare step. Handed to the handler through the
/// request extensions once the check passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prepared {
    Post(Post),
    File(File),
    Comment(Comment),
}

impl Prepared {
    pub fn as_post(&self) -> Option<&Post> {
        match self {
            Prepared::Post(post) => Some(post),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&File> {
        match self {
            Prepared::File(file) => Some(file),
            _ => None,
        }
    }

    pub fn as_comment(&self) -> Option<&Comment> {
        match self {
            Prepared::Comment(comment) => Some(comment),
            _ => None,
        }
    }
}

/// Per-request view used by Prepare steps and ownership checks.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub user: Arc<User>,
    pub target: ResourceTarget,
    pub resource: Option<Prepared>,
}

impl AuthRequest {
    pub fn new(user: Arc<User>, target: ResourceTarget) -> Self {
        Self {
            user,
            target,
            resource: None,
        }
    }
}

/// Loads the target resource into the request before authorization.
///
/// Returning `AppError::NotFound` ends the request with a 404; any other
/// error is a server error.
#[async_trait]
pub trait ResourcePreparer: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    async fn prepare(&self, request: &mut AuthRequest, repos: &Repositories) -> AppResult<()>;
}

/// `Ok(None)` for a compose-new target, the id otherwise.
fn target_id(request: &AuthRequest, kind: &str) -> AppResult<Option<i64>> {
    match &request.target {
        ResourceTarget::New => Ok(None),
        ResourceTarget::Id(id) => Ok(Some(*id)),
        ResourceTarget::None | ResourceTarget::Invalid(_) => Err(AppError::not_found(format!("{kind} not found"))),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostPreparer;

#[async_trait]
impl ResourcePreparer for PostPreparer {
    fn name(&self) -> &'static str {
        "post"
    }

    async fn prepare(&self, request: &mut AuthRequest, repos: &Repositories) -> AppResult<()> {
        if let Some(id) = target_id(request, "post")? {
            let post = repos.posts.post_by_id(id).await?;
            request.resource = Some(Prepared::Post(post));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FilePreparer;

#[async_trait]
impl ResourcePreparer for FilePreparer {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn prepare(&self, request: &mut AuthRequest, repos: &Repositories) -> AppResult<()> {
        if let Some(id) = target_id(request, "file")? {
            let file = repos.files.file_by_id(id).await?;
            request.resource = Some(Prepared::File(file));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CommentPreparer;

#[async_trait]
impl ResourcePreparer for CommentPreparer {
    fn name(&self) -> &'static str {
        "comment"
    }

    async fn prepare(&self, request: &mut AuthRequest, repos: &Repositories) -> AppResult<()> {
        if let Some(id) = target_id(request, "comment")? {
            let comment = repos.comments.comment_by_id(id).await?;
            request.resource = Some(Prepared::Comment(comment));
        }
        Ok(())
    }
}
