use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::models::role::Role;

/// An identity as seen by the authorization core.
///
/// `roles` is never stored or trusted from a token; it is resolved against
/// the permission cache from `role_ids`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub provider_id: String,
    #[serde(default)]
    pub provider_avatar: String,
    #[serde(default)]
    pub avatar_image_url: String,
    #[serde(default)]
    pub role_ids: Vec<i64>,
    #[serde(skip)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub active: bool,
}

impl User {
    /// Id 0 is reserved for the anonymous identity.
    pub fn is_anonymous(&self) -> bool {
        self.id == 0
    }

    pub fn is_root(&self) -> bool {
        self.roles.iter().any(|role| role.root)
    }

    pub fn name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.username
        } else {
            &self.display_name
        }
    }

    pub fn avatar(&self) -> &str {
        if self.provider_avatar.is_empty() {
            &self.avatar_image_url
        } else {
            &self.provider_avatar
        }
    }

    pub fn with_roles(mut self, roles: Vec<Role>) -> Self {
        self.roles = roles;
        self
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub password_hash: String,
    pub provider: String,
    pub provider_id: String,
    pub provider_avatar: String,
    pub avatar_image_url: String,
    pub active: bool,
}

impl DbUser {
    pub fn into_user(self, role_ids: Vec<i64>) -> User {
        User {
            id: self.id,
            username: self.username,
            display_name: self.display_name,
            email: self.email,
            provider: self.provider,
            provider_id: self.provider_id,
            provider_avatar: self.provider_avatar,
            avatar_image_url: self.avatar_image_url,
            role_ids,
            roles: Vec::new(),
            active: self.active,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "ada")]
    pub username: String,
    #[schema(example = "S3cureP@ssw0rd")]
    pub password: String,
    /// Path to return to after a successful login.
    #[serde(default)]
    pub back: Option<String>,
}

/// Public profile shape returned by `GET /u/:username`.
#[derive(Debug, Serialize, ToSchema)]
pub struct Profile {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub avatar: String,
}

impl From<&User> for Profile {
    fn from(user: &User) -> Self {
        Profile {
            id: user.id,
            username: user.username.clone(),
            name: user.name().to_string(),
            avatar: user.avatar().to_string(),
        }
    }
}
