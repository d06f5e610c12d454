//! Authorization module - action registry, permission cache and request checks
//!
//! Every request first gets an identity (`identity::assign_user`), then the
//! route's action is checked (`check::check`):
//! - routes without a registered action are public
//! - Prepare runs before anything else, so a missing resource is a 404 for everyone
//! - root roles bypass permission resolution
//! - inactive accounts are logged out
//! - the user's roles are tried in order; the first one granting `all`, or
//!   granting `own` with a passing ownership check, wins

pub mod cache;
pub mod check;
pub mod identity;
pub mod ownership;
pub mod prepare;
pub mod registry;

pub use cache::{PermissionCache, PermissionSnapshot};
pub use check::{authorize, check, Decision};
pub use identity::{assign_user, resolve_user, CurrentUser};
pub use ownership::{
    AllowAll, AllowLoggedInUser, AllowNone, CommentOwnerCheck, FileOwnerCheck, OwnershipCheck, PostOwnerCheck,
};
pub use prepare::{AuthRequest, CommentPreparer, FilePreparer, PostPreparer, Prepared, ResourcePreparer, ResourceTarget};
pub use registry::{ActionRegistry, ActionRegistryBuilder, AuthConfig};

use crate::models::role::Role;
use crate::models::user::User;

/// Well-known seed roles
pub mod roles {
    pub const ADMIN_ID: i64 = 1;
    pub const USER_ID: i64 = 2;
    pub const GUEST_ID: i64 = 3;

    /// Seed roles can be edited but never deleted.
    pub fn is_seed(role_id: i64) -> bool {
        role_id <= GUEST_ID
    }
}

/// Well-known action names
pub mod actions {
    pub const POST_VIEW: &str = "post.view";
    pub const POST_LIST: &str = "post.list";
    pub const POST_COMPOSE: &str = "post.compose";
    pub const POST_SAVE: &str = "post.save";
    pub const POST_DELETE: &str = "post.delete";

    pub const COMMENT_LIST: &str = "comment.list";
    pub const COMMENT_SAVE: &str = "comment.save";
    pub const COMMENT_DELETE: &str = "comment.delete";

    pub const FILE_LIST: &str = "file.list";
    pub const FILE_UPLOAD: &str = "file.upload";
    pub const FILE_DELETE: &str = "file.delete";

    pub const USER_PROFILE: &str = "user.profile";

    pub const MANAGE: &str = "manage";
    pub const MANAGE_ROLE_LIST: &str = "manage.role.list";
    pub const MANAGE_ROLE_COMPOSE: &str = "manage.role.compose";
    pub const MANAGE_ROLE_SAVE: &str = "manage.role.save";
    pub const MANAGE_ROLE_DELETE: &str = "manage.role.delete";
}

pub fn guest_role() -> Role {
    Role {
        id: roles::GUEST_ID,
        name: "Guest".to_string(),
        description: None,
        root: false,
    }
}

/// The anonymous identity used whenever no valid session is present.
pub fn guest_user() -> User {
    User {
        id: 0,
        username: "Guest".to_string(),
        role_ids: vec![roles::GUEST_ID],
        roles: vec![guest_role()],
        active: true,
        ..User::default()
    }
}
