use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Resources whose access can be delegated to an ownership check.
pub trait Owned {
    fn owner_id(&self) -> i64;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct File {
    pub id: i64,
    pub user_id: i64,
    pub path: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub file_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
}

impl Owned for Post {
    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

impl Owned for File {
    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

impl Owned for Comment {
    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PostMutation {
    pub name: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentMutation {
    pub post_id: i64,
    pub content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FileUpload {
    pub path: String,
    #[serde(rename = "type", default)]
    pub file_type: String,
}
