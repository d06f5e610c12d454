use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

// =============================================================================
// PERMISSION VALUE
// =============================================================================

/// What a role may do on one action.
///
/// Anything other than `all` or `own` reads as `none`, both from storage and
/// from request payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PermissionValue {
    All,
    Own,
    #[default]
    None,
}

impl PermissionValue {
    pub fn parse(value: &str) -> Self {
        match value {
            "all" => PermissionValue::All,
            "own" => PermissionValue::Own,
            _ => PermissionValue::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionValue::All => "all",
            PermissionValue::Own => "own",
            PermissionValue::None => "none",
        }
    }
}

impl From<String> for PermissionValue {
    fn from(value: String) -> Self {
        PermissionValue::parse(&value)
    }
}

impl From<PermissionValue> for String {
    fn from(value: PermissionValue) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for PermissionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ROLE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Role {
    pub id: i64,
    #[schema(example = "Editor")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Root roles bypass every permission check.
    pub root: bool,
}

// =============================================================================
// PERMISSION
// =============================================================================

/// One stored `(role, action, value)` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Permission {
    pub role_id: i64,
    #[schema(example = "post.save")]
    pub action: String,
    #[schema(value_type = String, example = "own")]
    pub value: PermissionValue,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbPermission {
    pub role_id: i64,
    pub action: String,
    pub value: String,
}

impl From<DbPermission> for Permission {
    fn from(db: DbPermission) -> Self {
        Permission {
            role_id: db.role_id,
            action: db.action,
            value: PermissionValue::parse(&db.value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ActionValue {
    #[schema(example = "post.save")]
    pub action: String,
    #[schema(value_type = String, example = "own")]
    pub value: PermissionValue,
}

/// The full permission set of one role, as held by the permission cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct RolePermissions {
    pub role_id: i64,
    pub permissions: Vec<ActionValue>,
}

// =============================================================================
// ADMIN PAYLOADS
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RoleMutation {
    #[schema(example = "Editor")]
    pub name: String,
    #[schema(example = "Can edit every post")]
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub root: bool,
    #[serde(default)]
    pub permissions: Vec<ActionValue>,
}

/// A role as shown in the compose screen: every registered action appears
/// once, with the stored value or the action's default.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoleComposeView {
    pub role: Option<Role>,
    pub permissions: Vec<ActionValue>,
}
